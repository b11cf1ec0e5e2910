//! Shared builders for the integration tests.

#![allow(dead_code)]

use schemadiff::{
    CascadeAction, CaseSensitivity, Change, Column, Database, DenyAll, ForeignKey, Index, ModelComparator,
    PermitAll, PlatformInfo, PrimaryKeyChangeStyle, Table, TypeCode, type_or_size_changed,
};

pub fn id() -> Column {
    Column::new("id", TypeCode::Integer).primary_key()
}

pub fn int(name: &str) -> Column {
    Column::new(name, TypeCode::Integer)
}

pub fn varchar(name: &str, size: u32) -> Column {
    Column::new(name, TypeCode::Varchar).with_size(size)
}

pub fn decimal(name: &str, precision: u32, scale: u32) -> Column {
    Column::new(name, TypeCode::Decimal).with_precision(precision, scale)
}

pub fn table(name: &str, columns: Vec<Column>) -> Table {
    columns.into_iter().fold(Table::new(name), Table::with_column)
}

pub fn database(tables: Vec<Table>) -> Database {
    tables.into_iter().fold(Database::new("shop"), Database::with_table)
}

pub fn fk(name: &str, foreign_table: &str, references: &[(&str, &str)]) -> ForeignKey {
    ForeignKey::new(Some(name), foreign_table, references)
}

/// Apply `changes` in order to a copy of `source`.
pub fn replay(source: &Database, changes: &[Change], case: CaseSensitivity) -> Database {
    let mut model = source.clone();
    for change in changes {
        change
            .apply(&mut model, case)
            .unwrap_or_else(|e| panic!("'{}' does not apply: {}", change, e));
    }
    model
}

pub fn kinds(changes: &[Change]) -> Vec<&'static str> {
    changes.iter().map(Change::kind).collect()
}

pub fn position_of(changes: &[Change], predicate: impl Fn(&Change) -> bool) -> Option<usize> {
    changes.iter().position(predicate)
}

/// The comparator configurations every property is checked against.
pub fn comparators() -> Vec<(&'static str, ModelComparator)> {
    vec![
        ("default", ModelComparator::default()),
        ("permit_all", ModelComparator::default().with_policy(PermitAll)),
        ("deny_all", ModelComparator::default().with_policy(DenyAll)),
        (
            "remove_and_add",
            ModelComparator::default().primary_key_changes(PrimaryKeyChangeStyle::RemoveAndAdd),
        ),
        (
            "keep_primary_key_columns",
            ModelComparator::default().can_drop_primary_key_columns(false),
        ),
        (
            "rebuild_constraints",
            ModelComparator::new(PlatformInfo::postgres()).rebuild_constraints_when(type_or_size_changed),
        ),
        (
            "postgres_capabilities",
            ModelComparator::new(PlatformInfo::postgres())
                .with_policy(schemadiff::CapabilityPolicy::postgres())
                .rebuild_constraints_when(type_or_size_changed),
        ),
    ]
}

fn customers() -> Table {
    table(
        "customers",
        vec![id(), varchar("name", 100).required(), varchar("email", 255)],
    )
    .with_index(Index::unique("customers_email", &["email"]))
}

fn orders() -> Table {
    table(
        "orders",
        vec![
            id(),
            int("customer_id").required(),
            varchar("status", 20).with_default("'new'"),
            decimal("total", 10, 2),
            int("legacy_flag"),
        ],
    )
    .with_index(Index::non_unique("orders_status", &["status"]))
    .with_foreign_key(fk("orders_customer_fk", "customers", &[("customer_id", "id")]))
}

fn line_items() -> Table {
    table(
        "line_items",
        vec![
            int("order_id").primary_key(),
            int("line_no").primary_key(),
            varchar("sku", 20).required(),
        ],
    )
    .with_foreign_key(fk("line_items_order_fk", "orders", &[("order_id", "id")]))
}

/// Source and target models exercising every kind of change.
pub fn model_pairs() -> Vec<(&'static str, Database, Database)> {
    let shop = database(vec![customers(), orders(), line_items()]);

    vec![
        (
            "new_table_with_foreign_key",
            database(vec![table("a", vec![id()])]),
            database(vec![
                table("a", vec![id()]),
                table("b", vec![id(), int("a_id")]).with_foreign_key(fk("b_a_fk", "a", &[("a_id", "id")])),
            ]),
        ),
        (
            "dropped_table_with_foreign_key",
            database(vec![
                table("a", vec![id()]),
                table("b", vec![id(), int("a_id")]).with_foreign_key(fk("b_a_fk", "a", &[("a_id", "id")])),
            ]),
            database(vec![table("a", vec![id()])]),
        ),
        (
            "column_changes",
            shop.clone(),
            database(vec![
                customers(),
                table(
                    "orders",
                    vec![
                        id(),
                        varchar("status", 40),
                        int("customer_id").required(),
                        varchar("note", 200),
                        decimal("total", 12, 2),
                    ],
                )
                .with_index(Index::non_unique("orders_status", &["status"]))
                .with_foreign_key(fk("orders_customer_fk", "customers", &[("customer_id", "id")])),
                line_items(),
            ]),
        ),
        (
            "primary_key_changes",
            shop.clone(),
            database(vec![
                customers(),
                orders(),
                table(
                    "line_items",
                    vec![
                        int("order_id").primary_key(),
                        varchar("sku", 20).primary_key(),
                        int("line_no").required(),
                    ],
                )
                .with_foreign_key(fk("line_items_order_fk", "orders", &[("order_id", "id")])),
            ]),
        ),
        (
            "dropped_primary_key_column",
            shop.clone(),
            database(vec![
                customers(),
                orders(),
                table("line_items", vec![int("order_id").primary_key(), varchar("sku", 20).required()])
                    .with_foreign_key(fk("line_items_order_fk", "orders", &[("order_id", "id")])),
            ]),
        ),
        (
            "constraint_changes",
            shop.clone(),
            database(vec![
                table(
                    "customers",
                    vec![id(), varchar("name", 100).required(), varchar("email", 255)],
                )
                .with_index(Index::non_unique("customers_email", &["email"]))
                .with_index(Index::new(None, false, &["name", "email"])),
                orders(),
                table(
                    "line_items",
                    vec![
                        int("order_id").primary_key(),
                        int("line_no").primary_key(),
                        varchar("sku", 20).required(),
                    ],
                )
                .with_foreign_key(
                    fk("line_items_order_fk", "orders", &[("order_id", "id")]).on_delete(CascadeAction::Cascade),
                ),
            ]),
        ),
        (
            "widened_referenced_column",
            shop.clone(),
            database(vec![
                table(
                    "customers",
                    vec![
                        Column::new("id", TypeCode::BigInt).primary_key(),
                        varchar("name", 100).required(),
                        varchar("email", 255),
                    ],
                )
                .with_index(Index::unique("customers_email", &["email"])),
                table(
                    "orders",
                    vec![
                        id(),
                        Column::new("customer_id", TypeCode::BigInt).required(),
                        varchar("status", 20).with_default("'new'"),
                        decimal("total", 10, 2),
                        int("legacy_flag"),
                    ],
                )
                .with_index(Index::non_unique("orders_status", &["status"]))
                .with_foreign_key(fk("orders_customer_fk", "customers", &[("customer_id", "id")])),
                line_items(),
            ]),
        ),
        (
            "rebuilt_shop",
            shop,
            database(vec![
                table("products", vec![id(), varchar("sku", 20).required()])
                    .with_index(Index::unique("products_sku", &["sku"])),
                customers(),
                table(
                    "line_items",
                    vec![
                        int("product_id").primary_key(),
                        int("line_no").primary_key(),
                        int("quantity").required().with_default("1"),
                    ],
                )
                .with_foreign_key(fk("line_items_product_fk", "products", &[("product_id", "id")])),
            ]),
        ),
    ]
}

/// Models that must compare equal to themselves.
pub fn valid_models() -> Vec<(&'static str, Database)> {
    let mut models = vec![
        ("empty", Database::new("empty")),
        ("single_table", database(vec![table("a", vec![id()])])),
    ];
    models.extend(model_pairs().into_iter().flat_map(|(name, source, target)| [(name, source), (name, target)]));
    models
}
