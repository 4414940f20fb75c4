use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user as stored in the `users` collection.
///
/// `password` always holds the Argon2 PHC string, never the plaintext.
/// Group membership is owned by [`Group::users`] and is looked up on demand.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub mobile_number: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub users: Vec<ObjectId>,
    pub creator: ObjectId,
}

impl Group {
    /// Builds a group whose member list always contains `creator` exactly once
    /// and never repeats an id. The creator comes first, then members in the
    /// order they were given.
    pub fn new(
        name: String,
        creator: ObjectId,
        members: impl IntoIterator<Item = ObjectId>,
    ) -> Self {
        let mut users = vec![creator];
        for member in members {
            if !users.contains(&member) {
                users.push(member);
            }
        }
        Self {
            id: ObjectId::new(),
            name,
            users,
            creator,
        }
    }

    pub fn has_member(&self, user_id: &ObjectId) -> bool {
        self.users.contains(user_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSplit {
    pub user_id: ObjectId,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub group_id: ObjectId,
    pub paid_by: ObjectId,
    pub amount: f64,
    pub description: String,
    pub split: Vec<ExpenseSplit>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub modified_at: DateTime<Utc>,
    // Older documents were written with the creator under `userId`.
    #[serde(alias = "userId")]
    pub created_by: ObjectId,
}

impl Expense {
    pub fn split_total(&self) -> f64 {
        self.split.iter().map(|share| share.amount).sum()
    }

    /// Applies every field present in `patch`, leaving the others untouched.
    /// Does not touch `modified_at`; the store owns that timestamp.
    pub fn merge(&mut self, patch: &ExpensePatch) {
        if let Some(group_id) = patch.group_id {
            self.group_id = group_id;
        }
        if let Some(paid_by) = patch.paid_by {
            self.paid_by = paid_by;
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(split) = &patch.split {
            self.split.clone_from(split);
        }
    }
}

/// The caller-controlled part of an expense. Identifier and timestamps are
/// assigned when it is persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct NewExpense {
    pub group_id: ObjectId,
    pub paid_by: ObjectId,
    pub created_by: ObjectId,
    pub amount: f64,
    pub description: String,
    pub split: Vec<ExpenseSplit>,
}

impl NewExpense {
    pub fn into_expense(self, now: DateTime<Utc>) -> Expense {
        Expense {
            id: ObjectId::new(),
            group_id: self.group_id,
            paid_by: self.paid_by,
            amount: self.amount,
            description: self.description,
            split: self.split,
            created_at: now,
            modified_at: now,
            created_by: self.created_by,
        }
    }
}

/// Field-level update for an expense. Serializes to the `$set` document,
/// so absent fields are skipped rather than cleared.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_by: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split: Option<Vec<ExpenseSplit>>,
}

impl ExpensePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
