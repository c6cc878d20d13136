//! Compile-time tests for write-model macros across related tables.
//!
//! These tests verify that the macro-generated code compiles correctly.
//! They do not run actual database operations. Nested-write decomposition
//! across related tables (parent-first insert, FK propagation to children)
//! is a runtime concern of the engine's write processor, not of these
//! per-table derive macros.

use dataway_pg::{FromRow, InsertModel, Model, UpdateModel};

// ============================================
// Test: Basic InsertModel
// ============================================

#[derive(Debug, FromRow, Model)]
#[orm(table = "orders")]
struct Order {
    #[orm(id)]
    id: i64,
    user_id: i64,
    total_cents: i64,
}

#[derive(Clone, InsertModel)]
#[orm(table = "order_items")]
struct NewOrderItem {
    order_id: i64,
    sku: String,
    qty: i32,
}

#[derive(InsertModel)]
#[orm(table = "orders")]
struct NewOrderBasic {
    user_id: i64,
    total_cents: i64,
}

#[test]
fn test_insert_model_basic_compiles() {
    let _order = NewOrderBasic {
        user_id: 1,
        total_cents: 1000,
    };

    assert_eq!(NewOrderBasic::TABLE, "orders");
    assert_eq!(NewOrderItem::TABLE, "order_items");
}

// ============================================
// Test: InsertModel with insert_returning
// ============================================

#[derive(Debug, FromRow, Model)]
#[orm(table = "users")]
struct User {
    #[orm(id)]
    id: i64,
    username: String,
}

#[derive(Clone, InsertModel)]
#[orm(table = "user_profiles")]
struct NewUserProfile {
    user_id: i64,
    bio: String,
}

#[derive(InsertModel)]
#[orm(table = "users", returning = "User")]
struct NewUserBasic {
    username: String,
}

#[test]
fn test_insert_model_user_basic_compiles() {
    let _user = NewUserBasic {
        username: "alice".into(),
    };

    assert_eq!(NewUserBasic::TABLE, "users");
}

// ============================================
// Test: default and skip_insert field attrs
// ============================================

#[derive(Clone, InsertModel)]
#[orm(table = "categories")]
struct NewCategory {
    name: String,
    #[orm(default)]
    sort_order: i32,
}

#[test]
fn test_insert_model_default_field_compiles() {
    let _category = NewCategory {
        name: "Electronics".into(),
        sort_order: 0,
    };

    assert_eq!(NewCategory::TABLE, "categories");
}

// ============================================
// Test: Model relation declarations (has_many / belongs_to)
// ============================================
//
// Relation metadata used by the engine's preload compiler and the nested
// write processor to propagate a parent's primary key to its children
// lives on the `Model` derive (feeding `model_descriptor()`), not on
// `InsertModel`/`UpdateModel`.

#[derive(Debug, Clone, FromRow, Model)]
#[orm(table = "customers")]
#[orm(has_many(CustomerOrder, foreign_key = "customer_id", as = "orders"))]
struct Customer {
    #[orm(id)]
    id: i64,
    name: String,
}

#[derive(Debug, Clone, FromRow, Model)]
#[orm(table = "customer_orders")]
#[orm(belongs_to(Customer, foreign_key = "customer_id", as = "customer"))]
struct CustomerOrder {
    #[orm(id)]
    id: i64,
    customer_id: i64,
    total_cents: i64,
}

#[test]
fn test_model_relation_declarations_compile() {
    let descriptor = Customer::model_descriptor();
    assert_eq!(descriptor.entity, "Customer");
    assert!(descriptor.relations.iter().any(|r| r.name == "orders"));

    let descriptor = CustomerOrder::model_descriptor();
    assert!(descriptor.relations.iter().any(|r| r.name == "customer"));
}

// ============================================
// Test: Basic UpdateModel (without graph)
// ============================================

#[derive(UpdateModel)]
#[orm(table = "orders", model = "Order", returning = "Order")]
struct OrderPatchBasic {
    total_cents: Option<i64>,
}

#[test]
fn test_update_model_basic_compiles() {
    let _patch = OrderPatchBasic {
        total_cents: Some(1500),
    };

    assert_eq!(OrderPatchBasic::TABLE, "orders");
}

// ============================================
// Test: UpdateModel for users
// ============================================

#[derive(UpdateModel)]
#[orm(table = "users", model = "User", returning = "User")]
struct UserPatchBasic {
    username: Option<String>,
}

#[test]
fn test_update_model_user_basic_compiles() {
    let _patch = UserPatchBasic {
        username: Some("new_name".into()),
    };

    assert_eq!(UserPatchBasic::TABLE, "users");
}
