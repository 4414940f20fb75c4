//! Persistence ports for the three collections.
//!
//! Each collection is independent: there is no foreign-key enforcement and no
//! multi-document transaction. Every method maps to a single store call.

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};

use crate::schemas::{Expense, ExpensePatch, Group, User};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store query failed: {0}")]
    Query(String),

    #[error("document could not be encoded: {0}")]
    Encode(String),

    /// A unique field already holds this value.
    #[error("duplicate key: {0}")]
    Duplicate(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the email or mobile number is
    /// already registered.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user(&self, id: ObjectId) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_mobile_number(
        &self,
        mobile_number: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Any user whose email or mobile number matches.
    async fn find_user_by_email_or_mobile_number(
        &self,
        email: &str,
        mobile_number: &str,
    ) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn insert_group(&self, group: &Group) -> Result<(), StoreError>;

    async fn find_group(&self, id: ObjectId) -> Result<Option<Group>, StoreError>;

    /// Groups whose member list contains `user_id`.
    async fn find_groups_with_member(&self, user_id: ObjectId) -> Result<Vec<Group>, StoreError>;
}

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn insert_expense(&self, expense: &Expense) -> Result<(), StoreError>;

    async fn find_expense(&self, id: ObjectId) -> Result<Option<Expense>, StoreError>;

    /// Merges `patch` into the stored expense and raises `modifiedAt` to
    /// `modified_at` unless it is already later. Returns whether a document matched.
    async fn update_expense(
        &self,
        id: ObjectId,
        patch: &ExpensePatch,
        modified_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Succeeds whether or not a document was removed.
    async fn delete_expense(&self, id: ObjectId) -> Result<(), StoreError>;

    async fn find_expenses_by_group(&self, group_id: ObjectId) -> Result<Vec<Expense>, StoreError>;

    /// Includes documents that record their creator under the legacy `userId` key.
    async fn find_expenses_by_creator(&self, user_id: ObjectId) -> Result<Vec<Expense>, StoreError>;
}

/// Convenience bound for adapters that serve all three collections.
pub trait Store: UserStore + GroupStore + ExpenseStore {}

impl<T: UserStore + GroupStore + ExpenseStore> Store for T {}
