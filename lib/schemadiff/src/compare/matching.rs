//! Index and foreign key matching between two tables.
//!
//! Matching works on multisets: every candidate can be claimed once, so two
//! identical anonymous indexes on one side need two on the other.

/// Outcome of looking for a counterpart among unclaimed candidates.
pub(crate) struct Claim {
    /// Position of the candidate that was claimed.
    pub position: Option<usize>,
    /// How many unclaimed candidates matched; more than one is ambiguous.
    pub candidates: usize,
}

impl Claim {
    pub fn is_ambiguous(&self) -> bool {
        self.candidates > 1
    }
}

/// Tracks which candidates of one side have already been paired up.
pub(crate) struct Claims<'a, T> {
    items: &'a [T],
    claimed: Vec<bool>,
}

impl<'a, T> Claims<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self {
            items,
            claimed: vec![false; items.len()],
        }
    }

    /// Claim the first unclaimed item accepted by `matches`.
    pub fn claim(&mut self, matches: impl Fn(&T) -> bool) -> Claim {
        let hits: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(i, item)| !self.claimed[*i] && matches(*item))
            .map(|(i, _)| i)
            .collect();

        let position = hits.first().copied();
        if let Some(i) = position {
            self.claimed[i] = true;
        }
        Claim {
            position,
            candidates: hits.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_candidate_is_claimed_once() {
        let items = ["x", "x", "y"];
        let mut claims = Claims::new(&items);

        let first = claims.claim(|i| *i == "x");
        assert_eq!(first.position, Some(0));
        assert!(first.is_ambiguous());

        let second = claims.claim(|i| *i == "x");
        assert_eq!(second.position, Some(1));
        assert!(!second.is_ambiguous());

        assert_eq!(claims.claim(|i| *i == "x").position, None);
    }
}
