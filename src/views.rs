//! JSON shapes returned to clients. Ids are rendered as 24-character hex
//! strings and password hashes never leave the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::groups::GroupCreation;
use crate::schemas::{Expense, ExpenseSplit, Group, User};
use crate::signin::SignIn;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile_number: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_hex(),
            name: user.name,
            email: user.email,
            mobile_number: user.mobile_number,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupView {
    pub id: String,
    pub name: String,
    pub users: Vec<String>,
    pub creator: String,
}

impl From<Group> for GroupView {
    fn from(group: Group) -> Self {
        Self {
            id: group.id.to_hex(),
            name: group.name,
            users: group.users.iter().map(|id| id.to_hex()).collect(),
            creator: group.creator.to_hex(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCreatedView {
    #[serde(flatten)]
    pub group: GroupView,
    pub skipped_emails: Vec<String>,
}

impl From<GroupCreation> for GroupCreatedView {
    fn from(creation: GroupCreation) -> Self {
        Self {
            group: creation.group.into(),
            skipped_emails: creation.skipped_emails,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitView {
    pub user_id: String,
    pub amount: f64,
}

impl From<ExpenseSplit> for SplitView {
    fn from(share: ExpenseSplit) -> Self {
        Self {
            user_id: share.user_id.to_hex(),
            amount: share.amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseView {
    pub id: String,
    pub group_id: String,
    pub paid_by: String,
    pub amount: f64,
    pub description: String,
    pub split: Vec<SplitView>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub created_by: String,
}

impl From<Expense> for ExpenseView {
    fn from(expense: Expense) -> Self {
        Self {
            id: expense.id.to_hex(),
            group_id: expense.group_id.to_hex(),
            paid_by: expense.paid_by.to_hex(),
            amount: expense.amount,
            description: expense.description,
            split: expense.split.into_iter().map(SplitView::from).collect(),
            created_at: expense.created_at,
            modified_at: expense.modified_at,
            created_by: expense.created_by.to_hex(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInView {
    pub token: String,
    pub groups: Vec<GroupView>,
    pub expenses: Vec<ExpenseView>,
    pub users_in_groups: Vec<UserView>,
}

impl From<SignIn> for SignInView {
    fn from(sign_in: SignIn) -> Self {
        let overview = sign_in.overview;
        Self {
            token: sign_in.token,
            groups: overview.groups.into_iter().map(GroupView::from).collect(),
            expenses: overview.expenses.into_iter().map(ExpenseView::from).collect(),
            users_in_groups: overview
                .co_members
                .resolved
                .into_iter()
                .map(UserView::from)
                .collect(),
        }
    }
}
