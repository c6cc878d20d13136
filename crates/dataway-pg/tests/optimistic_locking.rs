//! Compile-time tests for `UpdateModel`'s generated method surface.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use dataway_pg::{FromRow, Model, UpdateModel};

#[derive(Debug, Model, FromRow)]
#[orm(table = "posts")]
struct Post {
    #[orm(id)]
    id: i64,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
}

#[derive(UpdateModel)]
#[orm(table = "posts", model = "Post", returning = "Post")]
struct PostPatch {
    title: Option<String>,
    content: Option<String>,
}

#[test]
fn test_patch_struct_compiles() {
    let _patch = PostPatch {
        title: Some("New Title".into()),
        content: None,
    };
}

#[test]
fn test_update_by_id_method_exists() {
    fn assert_update_by_id<T, I>(_patch: T)
    where
        T: UpdateByIdTrait<I>,
    {
    }

    trait UpdateByIdTrait<I> {
        fn update_by_id(
            self,
            conn: &impl dataway_pg::GenericClient,
            id: I,
        ) -> impl std::future::Future<Output = dataway_pg::PgResult<u64>>;
    }

    impl UpdateByIdTrait<i64> for PostPatch {
        fn update_by_id(
            self,
            conn: &impl dataway_pg::GenericClient,
            id: i64,
        ) -> impl std::future::Future<Output = dataway_pg::PgResult<u64>> {
            PostPatch::update_by_id(self, conn, id)
        }
    }

    let patch = PostPatch {
        title: Some("Test".into()),
        content: None,
    };
    assert_update_by_id::<PostPatch, i64>(patch);
}

#[test]
fn test_update_by_ids_method_exists() {
    fn assert_update_by_ids<T, I>(_patch: T)
    where
        T: UpdateByIdsTrait<I>,
    {
    }

    trait UpdateByIdsTrait<I> {
        fn update_by_ids(
            self,
            conn: &impl dataway_pg::GenericClient,
            ids: Vec<I>,
        ) -> impl std::future::Future<Output = dataway_pg::PgResult<u64>>;
    }

    impl UpdateByIdsTrait<i64> for PostPatch {
        fn update_by_ids(
            self,
            conn: &impl dataway_pg::GenericClient,
            ids: Vec<i64>,
        ) -> impl std::future::Future<Output = dataway_pg::PgResult<u64>> {
            PostPatch::update_by_ids(self, conn, ids)
        }
    }

    let patch = PostPatch {
        title: Some("Test".into()),
        content: None,
    };
    assert_update_by_ids::<PostPatch, i64>(patch);
}

#[test]
fn test_update_by_id_returning_method_exists() {
    fn assert_returning_method<T, I, R>(_patch: T)
    where
        T: UpdateByIdReturningTrait<I, R>,
    {
    }

    trait UpdateByIdReturningTrait<I, R> {
        fn update_by_id_returning(
            self,
            conn: &impl dataway_pg::GenericClient,
            id: I,
        ) -> impl std::future::Future<Output = dataway_pg::PgResult<R>>;
    }

    impl UpdateByIdReturningTrait<i64, Post> for PostPatch {
        fn update_by_id_returning(
            self,
            conn: &impl dataway_pg::GenericClient,
            id: i64,
        ) -> impl std::future::Future<Output = dataway_pg::PgResult<Post>> {
            PostPatch::update_by_id_returning(self, conn, id)
        }
    }

    let patch = PostPatch {
        title: Some("Test".into()),
        content: None,
    };
    assert_returning_method::<PostPatch, i64, Post>(patch);
}

#[test]
fn test_update_by_ids_returning_method_exists() {
    fn assert_returning_method<T, I, R>(_patch: T)
    where
        T: UpdateByIdsReturningTrait<I, R>,
    {
    }

    trait UpdateByIdsReturningTrait<I, R> {
        fn update_by_ids_returning(
            self,
            conn: &impl dataway_pg::GenericClient,
            ids: Vec<I>,
        ) -> impl std::future::Future<Output = dataway_pg::PgResult<Vec<R>>>;
    }

    impl UpdateByIdsReturningTrait<i64, Post> for PostPatch {
        fn update_by_ids_returning(
            self,
            conn: &impl dataway_pg::GenericClient,
            ids: Vec<i64>,
        ) -> impl std::future::Future<Output = dataway_pg::PgResult<Vec<Post>>> {
            PostPatch::update_by_ids_returning(self, conn, ids)
        }
    }

    let patch = PostPatch {
        title: Some("Test".into()),
        content: None,
    };
    assert_returning_method::<PostPatch, i64, Post>(patch);
}

// Test: id_column attr without a `model`/`returning` type
#[derive(UpdateModel)]
#[orm(table = "items", id_column = "id")]
struct ItemPatch {
    name: Option<String>,
}

#[test]
fn test_update_model_with_id_column_compiles() {
    let _patch = ItemPatch {
        name: Some("Test".into()),
    };
    assert_eq!(ItemPatch::TABLE, "items");
}

// Test: column remapping on a patch field
#[derive(UpdateModel)]
#[orm(table = "versioned_items", id_column = "id")]
struct VersionedItemPatch {
    name: Option<String>,
    #[orm(column = "row_version")]
    version: i32,
}

#[test]
fn test_update_model_with_column_remap_compiles() {
    let _patch = VersionedItemPatch {
        name: Some("Test".into()),
        version: 1,
    };
}

// Test: UpdateModel with no optional fields set still compiles (all skipped at runtime)
#[derive(UpdateModel)]
#[orm(table = "simple_items", id_column = "id")]
struct SimpleItemPatch {
    name: Option<String>,
}

#[test]
fn test_update_model_minimal_compiles() {
    let _patch = SimpleItemPatch {
        name: Some("Test".into()),
    };
}
