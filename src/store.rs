use async_trait::async_trait;

use crate::{models::Document, object_id::ObjectId};

/// Which documents an operation addresses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Filter {
    All,
    Id(ObjectId),
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),

    #[error("stored document {id} is corrupt: {source}")]
    Corrupt { id: String, source: serde_json::Error },

    #[error("stored document {0} is not a JSON object")]
    NotAnObject(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The narrow document-store surface the HTTP handlers consume.
///
/// Every method is a single atomic store operation; callers never compose a
/// read and a write themselves.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_many(&self, filter: Filter) -> StoreResult<Vec<Document>>;

    async fn find_one(&self, filter: Filter) -> StoreResult<Option<Document>>;

    /// Stores `document` under a freshly assigned id and returns it with `_id`.
    async fn insert_one(&self, document: Document) -> StoreResult<Document>;

    /// Applies `patch` with `$set` semantics and returns the updated document.
    async fn find_one_and_update(
        &self,
        filter: Filter,
        patch: Document,
    ) -> StoreResult<Option<Document>>;

    async fn delete_one(&self, filter: Filter) -> StoreResult<DeleteResult>;
}
