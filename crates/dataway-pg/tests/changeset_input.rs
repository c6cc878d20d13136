//! Compile-time tests for `InsertModel`/`UpdateModel` on plain structs.
//!
//! Field-level input validation (string length, format, range checks) is a
//! request-option concern handled by the engine's column validator, not by
//! these per-table write derives.

#![allow(dead_code)]

use dataway_pg::{FromRow, InsertModel, Model, UpdateModel};

#[derive(InsertModel)]
#[orm(table = "users")]
struct NewUser {
    name: String,
    email: String,
    age: Option<i32>,
}

#[test]
fn insert_model_compiles() {
    let user = NewUser {
        name: "Alice".into(),
        email: "alice@example.com".into(),
        age: Some(42),
    };

    assert_eq!(user.name, "Alice");
    assert_eq!(NewUser::TABLE, "users");
}

#[derive(Debug, FromRow, Model)]
#[orm(table = "users")]
struct User {
    #[orm(id)]
    id: i64,
    username: String,
    email: String,
}

#[derive(UpdateModel)]
#[orm(table = "users", model = "User", returning = "User")]
struct UserPatch {
    username: Option<String>,
    email: Option<String>,
}

#[test]
fn update_model_compiles() {
    let patch = UserPatch {
        username: Some("alice".into()),
        email: Some("alice@example.com".into()),
    };

    assert_eq!(patch.username.as_deref(), Some("alice"));
    assert_eq!(UserPatch::TABLE, "users");
}
