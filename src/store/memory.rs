use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{ExpenseStore, GroupStore, StoreError, UserStore};
use crate::schemas::{Expense, ExpensePatch, Group, User};

/// In-process store with the same filter semantics as [`super::MongoStore`].
///
/// Used by the test suite and for running the server without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    groups: RwLock<Vec<Group>>,
    expenses: RwLock<Vec<Expense>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if let Some(existing) = users.iter().find(|existing| {
            existing.email == user.email || existing.mobile_number == user.mobile_number
        }) {
            let field = if existing.email == user.email {
                "email"
            } else {
                "mobileNumber"
            };
            return Err(StoreError::Duplicate(field.to_string()));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_user(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|user| user.email == email).cloned())
    }

    async fn find_user_by_mobile_number(
        &self,
        mobile_number: &str,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|user| user.mobile_number == mobile_number)
            .cloned())
    }

    async fn find_user_by_email_or_mobile_number(
        &self,
        email: &str,
        mobile_number: &str,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|user| user.email == email || user.mobile_number == mobile_number)
            .cloned())
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn insert_group(&self, group: &Group) -> Result<(), StoreError> {
        self.groups.write().await.push(group.clone());
        Ok(())
    }

    async fn find_group(&self, id: ObjectId) -> Result<Option<Group>, StoreError> {
        let groups = self.groups.read().await;
        Ok(groups.iter().find(|group| group.id == id).cloned())
    }

    async fn find_groups_with_member(&self, user_id: ObjectId) -> Result<Vec<Group>, StoreError> {
        let groups = self.groups.read().await;
        Ok(groups
            .iter()
            .filter(|group| group.has_member(&user_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ExpenseStore for MemoryStore {
    async fn insert_expense(&self, expense: &Expense) -> Result<(), StoreError> {
        self.expenses.write().await.push(expense.clone());
        Ok(())
    }

    async fn find_expense(&self, id: ObjectId) -> Result<Option<Expense>, StoreError> {
        let expenses = self.expenses.read().await;
        Ok(expenses.iter().find(|expense| expense.id == id).cloned())
    }

    async fn update_expense(
        &self,
        id: ObjectId,
        patch: &ExpensePatch,
        modified_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut expenses = self.expenses.write().await;
        let Some(expense) = expenses.iter_mut().find(|expense| expense.id == id) else {
            return Ok(false);
        };
        expense.merge(patch);
        expense.modified_at = expense.modified_at.max(modified_at);
        Ok(true)
    }

    async fn delete_expense(&self, id: ObjectId) -> Result<(), StoreError> {
        self.expenses.write().await.retain(|expense| expense.id != id);
        Ok(())
    }

    async fn find_expenses_by_group(&self, group_id: ObjectId) -> Result<Vec<Expense>, StoreError> {
        let expenses = self.expenses.read().await;
        Ok(expenses
            .iter()
            .filter(|expense| expense.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn find_expenses_by_creator(
        &self,
        user_id: ObjectId,
    ) -> Result<Vec<Expense>, StoreError> {
        let expenses = self.expenses.read().await;
        Ok(expenses
            .iter()
            .filter(|expense| expense.created_by == user_id)
            .cloned()
            .collect())
    }
}
