//! Sign-in: verify credentials, then assemble the user's groups, the expenses
//! they logged and the people they share groups with.
//!
//! The three reads are independent and not snapshot-consistent with each
//! other. A store failure in any of them aborts sign-in before a token is
//! issued.

use std::sync::Arc;

use bson::oid::ObjectId;

use crate::auth::SessionIssuer;
use crate::error::AppResult;
use crate::identity::IdentityService;
use crate::resolution::Resolution;
use crate::schemas::{Expense, Group, User};
use crate::store::{ExpenseStore, GroupStore, UserStore};

#[derive(Clone, Debug)]
pub struct SignIn {
    pub token: String,
    pub user: User,
    pub overview: Overview,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Overview {
    /// Groups listing the user as a member.
    pub groups: Vec<Group>,
    /// Expenses whose `createdBy` is the user. Being the payer or appearing in
    /// a split does not count.
    pub expenses: Vec<Expense>,
    /// Everyone sharing a group with the user, each once. Ids that no longer
    /// resolve to a user end up in `skipped`.
    pub co_members: Resolution<User, ObjectId>,
}

/// Distinct member ids across `groups`, excluding `user_id`, in first-seen order.
pub fn co_member_ids(groups: &[Group], user_id: ObjectId) -> Vec<ObjectId> {
    let mut ids = Vec::new();
    for member in groups.iter().flat_map(|group| group.users.iter().copied()) {
        if member != user_id && !ids.contains(&member) {
            ids.push(member);
        }
    }
    ids
}

#[derive(Clone)]
pub struct SignInService {
    identity: IdentityService,
    users: Arc<dyn UserStore>,
    groups: Arc<dyn GroupStore>,
    expenses: Arc<dyn ExpenseStore>,
    sessions: SessionIssuer,
}

impl SignInService {
    pub fn new(
        identity: IdentityService,
        users: Arc<dyn UserStore>,
        groups: Arc<dyn GroupStore>,
        expenses: Arc<dyn ExpenseStore>,
        sessions: SessionIssuer,
    ) -> Self {
        Self {
            identity,
            users,
            groups,
            expenses,
            sessions,
        }
    }

    #[tracing::instrument(skip_all, fields(email = %email))]
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<SignIn> {
        let user = self.identity.verify_credentials(email, password).await?;
        let overview = self.overview(&user).await?;
        let token = self.sessions.issue(user.id)?;

        tracing::info!(
            user_id = %user.id,
            groups = overview.groups.len(),
            expenses = overview.expenses.len(),
            co_members = overview.co_members.resolved.len(),
            "signed in"
        );
        Ok(SignIn {
            token,
            user,
            overview,
        })
    }

    pub async fn overview(&self, user: &User) -> AppResult<Overview> {
        let groups = self.groups.find_groups_with_member(user.id).await?;
        let expenses = self.expenses.find_expenses_by_creator(user.id).await?;
        let co_members = self.resolve_users(co_member_ids(&groups, user.id)).await;

        if !co_members.is_complete() {
            tracing::warn!(
                skipped = ?co_members.skipped,
                "skipping co-members with no user record"
            );
        }
        Ok(Overview {
            groups,
            expenses,
            co_members,
        })
    }

    /// Lookup failures are treated like dangling references.
    async fn resolve_users(&self, ids: Vec<ObjectId>) -> Resolution<User, ObjectId> {
        let mut resolution = Resolution::default();
        for id in ids {
            let user = match self.users.find_user(id).await {
                Ok(user) => user,
                Err(e) => {
                    tracing::warn!(user_id = %id, error = %e, "co-member lookup failed");
                    None
                }
            };
            resolution.push(id, user);
        }
        resolution
    }
}
