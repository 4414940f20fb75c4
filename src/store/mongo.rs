use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Collection, Database, IndexModel,
};

use super::{ExpenseStore, GroupStore, StoreError, UserStore};
use crate::schemas::{Expense, ExpensePatch, Group, User};

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

impl From<bson::ser::Error> for StoreError {
    fn from(err: bson::ser::Error) -> Self {
        StoreError::Encode(err.to_string())
    }
}

/// MongoDB-backed store using the `users`, `groups` and `expenses` collections.
#[derive(Clone, Debug)]
pub struct MongoStore {
    users: Collection<User>,
    groups: Collection<Group>,
    expenses: Collection<Expense>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(database);
        database.run_command(doc! { "ping": 1 }, None).await?;
        let store = Self::new(&database);
        store.ensure_indexes().await?;
        Ok(store)
    }

    pub fn new(database: &Database) -> Self {
        Self {
            users: database.collection("users"),
            groups: database.collection("groups"),
            expenses: database.collection("expenses"),
        }
    }

    /// Email and mobile number are unique across `users`.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique = |field: &str| {
            let mut keys = Document::new();
            keys.insert(field, 1);
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };
        self.users
            .create_indexes([unique("email"), unique("mobileNumber")], None)
            .await?;
        tracing::debug!("user indexes ready");
        Ok(())
    }

    async fn find_expenses(&self, filter: Document) -> Result<Vec<Expense>, StoreError> {
        let cursor = self.expenses.find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        match self.users.insert_one(user, None).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(StoreError::Duplicate(err.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_user(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! { "email": email }, None).await?)
    }

    async fn find_user_by_mobile_number(
        &self,
        mobile_number: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .find_one(doc! { "mobileNumber": mobile_number }, None)
            .await?)
    }

    async fn find_user_by_email_or_mobile_number(
        &self,
        email: &str,
        mobile_number: &str,
    ) -> Result<Option<User>, StoreError> {
        let filter = doc! {
            "$or": [
                { "email": email },
                { "mobileNumber": mobile_number },
            ]
        };
        Ok(self.users.find_one(filter, None).await?)
    }
}

#[async_trait]
impl GroupStore for MongoStore {
    async fn insert_group(&self, group: &Group) -> Result<(), StoreError> {
        self.groups.insert_one(group, None).await?;
        Ok(())
    }

    async fn find_group(&self, id: ObjectId) -> Result<Option<Group>, StoreError> {
        Ok(self.groups.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_groups_with_member(&self, user_id: ObjectId) -> Result<Vec<Group>, StoreError> {
        let cursor = self
            .groups
            .find(doc! { "users": { "$in": [user_id] } }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl ExpenseStore for MongoStore {
    async fn insert_expense(&self, expense: &Expense) -> Result<(), StoreError> {
        self.expenses.insert_one(expense, None).await?;
        Ok(())
    }

    async fn find_expense(&self, id: ObjectId) -> Result<Option<Expense>, StoreError> {
        Ok(self.expenses.find_one(doc! { "_id": id }, None).await?)
    }

    async fn update_expense(
        &self,
        id: ObjectId,
        patch: &ExpensePatch,
        modified_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let update = update_document(patch, modified_at)?;
        let result = self
            .expenses
            .update_one(doc! { "_id": id }, update, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_expense(&self, id: ObjectId) -> Result<(), StoreError> {
        self.expenses.delete_one(doc! { "_id": id }, None).await?;
        Ok(())
    }

    async fn find_expenses_by_group(&self, group_id: ObjectId) -> Result<Vec<Expense>, StoreError> {
        self.find_expenses(doc! { "groupId": group_id }).await
    }

    async fn find_expenses_by_creator(
        &self,
        user_id: ObjectId,
    ) -> Result<Vec<Expense>, StoreError> {
        self.find_expenses(creator_filter(user_id)).await
    }
}

/// Builds the `update_one` document for an expense patch.
fn update_document(
    patch: &ExpensePatch,
    modified_at: DateTime<Utc>,
) -> Result<Document, StoreError> {
    // $max keeps modifiedAt monotonic; an empty $set is rejected by the server.
    let mut update = doc! {
        "$max": { "modifiedAt": bson::DateTime::from_chrono(modified_at) }
    };
    let fields = bson::to_document(patch)?;
    if !fields.is_empty() {
        update.insert("$set", fields);
    }
    Ok(update)
}

/// Older expenses stored their creator under `userId`.
fn creator_filter(user_id: ObjectId) -> Document {
    doc! {
        "$or": [
            { "createdBy": user_id },
            { "userId": user_id },
        ]
    }
}
