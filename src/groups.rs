//! Group creation and member resolution.

use std::sync::Arc;

use bson::oid::ObjectId;

use crate::error::{AppError, AppResult};
use crate::resolution::Resolution;
use crate::schemas::Group;
use crate::store::{GroupStore, UserStore};

#[derive(Clone, Debug)]
pub struct NewGroup {
    pub name: String,
    pub creator_email: String,
    pub member_emails: Vec<String>,
}

/// A persisted group plus the member emails that matched no user.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupCreation {
    pub group: Group,
    pub skipped_emails: Vec<String>,
}

#[derive(Clone)]
pub struct GroupService {
    users: Arc<dyn UserStore>,
    groups: Arc<dyn GroupStore>,
}

impl GroupService {
    pub fn new(users: Arc<dyn UserStore>, groups: Arc<dyn GroupStore>) -> Self {
        Self { users, groups }
    }

    /// Creates a group from email addresses.
    ///
    /// The creator must resolve or the call fails with `InvalidCreator`.
    /// Member emails that do not resolve are dropped and reported in
    /// [`GroupCreation::skipped_emails`]. The creator is always a member and
    /// no id appears twice.
    #[tracing::instrument(skip_all, fields(name = %request.name, creator = %request.creator_email))]
    pub async fn create_group(&self, request: NewGroup) -> AppResult<GroupCreation> {
        if request.creator_email.trim().is_empty() {
            return Err(AppError::InvalidInput("Creator must be specified".to_string()));
        }

        let creator = self
            .users
            .find_user_by_email(&request.creator_email)
            .await?
            .ok_or(AppError::InvalidCreator)?;

        let members = self.resolve_emails(request.member_emails).await?;
        if !members.is_complete() {
            tracing::warn!(
                skipped = ?members.skipped,
                "dropping member emails with no matching user"
            );
        }

        let group = Group::new(request.name, creator.id, members.resolved);
        self.groups.insert_group(&group).await?;
        tracing::info!(group_id = %group.id, members = group.users.len(), "created group");

        Ok(GroupCreation {
            group,
            skipped_emails: members.skipped,
        })
    }

    async fn resolve_emails(&self, emails: Vec<String>) -> AppResult<Resolution<ObjectId, String>> {
        let mut resolution = Resolution::default();
        for email in emails {
            let user = self.users.find_user_by_email(&email).await?;
            resolution.push(email, user.map(|user| user.id));
        }
        Ok(resolution)
    }
}
