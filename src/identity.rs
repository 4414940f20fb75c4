//! Registration, lookup and credential checks for users.

use std::sync::Arc;

use bson::oid::ObjectId;

use crate::auth::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::schemas::User;
use crate::store::{StoreError, UserStore};

const DUPLICATE_USER: &str = "User with the given email or mobile number already exists";

/// Registration input. `password` is plaintext and only lives until hashed.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub mobile_number: String,
    pub password: String,
}

impl NewUser {
    fn validate(&self) -> AppResult<()> {
        let required = [
            ("name", &self.name),
            ("email", &self.email),
            ("mobileNumber", &self.mobile_number),
            ("password", &self.password),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(AppError::InvalidInput(format!("{field} must not be empty"))),
            None => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserStore>,
}

impl IdentityService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Creates a user unless another one already holds the email or the
    /// mobile number.
    #[tracing::instrument(skip_all, fields(email = %candidate.email))]
    pub async fn register(&self, candidate: NewUser) -> AppResult<User> {
        candidate.validate()?;

        if self
            .users
            .find_user_by_email_or_mobile_number(&candidate.email, &candidate.mobile_number)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(DUPLICATE_USER.to_string()));
        }

        let password =
            hash_password(&candidate.password).map_err(|e| AppError::Internal(e.to_string()))?;
        let user = User {
            id: ObjectId::new(),
            name: candidate.name,
            mobile_number: candidate.mobile_number,
            email: candidate.email,
            password,
        };
        // A concurrent registration can pass the check above; the store has the last word.
        match self.users.insert_user(&user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(detail)) => {
                tracing::info!(%detail, "registration lost a uniqueness race");
                return Err(AppError::Conflict(DUPLICATE_USER.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(user_id = %user.id, "registered user");
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<User> {
        self.users
            .find_user_by_email(email)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    pub async fn find_by_mobile_number(&self, mobile_number: &str) -> AppResult<User> {
        self.users
            .find_user_by_mobile_number(mobile_number)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    /// Unknown email and wrong password fail identically.
    #[tracing::instrument(skip_all, fields(email = %email))]
    pub async fn verify_credentials(&self, email: &str, password: &str) -> AppResult<User> {
        let Some(user) = self.users.find_user_by_email(email).await? else {
            return Err(AppError::Unauthorized);
        };
        match verify_password(password, &user.password) {
            Ok(true) => Ok(user),
            Ok(false) => Err(AppError::Unauthorized),
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "stored password hash is unusable");
                Err(AppError::Unauthorized)
            }
        }
    }
}
