use crate::entities::{normalize_email, User, UserId, UserPatch};
use crate::errors::DomainError;
use crate::repositories::UserRepository;
use std::sync::Arc;
use tracing::debug;

/// User Service - validates, normalizes and persists users while keeping
/// emails unique regardless of case.
///
/// The uniqueness check and the following write are separate repository
/// calls. Concurrent writers are kept apart by the store's unique email
/// index, which the repository reports as `DuplicateResource`.
pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(user_repository: Arc<dyn UserRepository>) -> Self {
        Self { user_repository }
    }

    pub async fn get_user_by_id(&self, id: UserId) -> Result<User, DomainError> {
        debug!("Getting user with id: {}", id);
        self.user_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::user_not_found("id", id))
    }

    pub async fn get_all_users(&self) -> Result<Vec<User>, DomainError> {
        debug!("Getting all users");
        self.user_repository.find_all().await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<User, DomainError> {
        if email.trim().is_empty() {
            return Err(DomainError::bad_request("Email cannot be empty"));
        }

        debug!("Getting user with email: {}", email);
        self.user_repository
            .find_by_email_ignore_case(email.trim())
            .await?
            .ok_or_else(|| DomainError::user_not_found("email", email))
    }

    pub async fn exists_by_email(&self, email: &str) -> Result<bool, DomainError> {
        if email.trim().is_empty() {
            return Ok(false);
        }
        self.user_repository
            .exists_by_email_ignore_case(email.trim())
            .await
    }

    /// Returns false if another user already holds `email`, ignoring case.
    ///
    /// Blank emails count as unique so the "required" rule reports them. An
    /// `exclude_id` that does not parse is ignored and every user is considered.
    pub async fn is_email_unique(
        &self,
        email: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, DomainError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Ok(true);
        }

        let exclude = exclude_id
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| raw.parse::<UserId>().ok());

        let taken = self
            .user_repository
            .exists_by_email_excluding(&email, exclude)
            .await?;
        Ok(!taken)
    }

    pub async fn create_user(&self, user: Option<User>) -> Result<User, DomainError> {
        let mut user = user.ok_or_else(|| DomainError::bad_request("User cannot be null"))?;
        user.validate()?;

        let email = user.email().unwrap_or_default().to_string();
        debug!("Creating new user with email: {}", email);

        if !self.is_email_unique(&email, None).await? {
            return Err(DomainError::duplicate_email(email));
        }

        user.set_id(UserId::new());
        self.user_repository.save(&user).await
    }

    /// Full replace of the user stored under `id`. Any id carried by the
    /// replacement is overwritten.
    pub async fn update_user(&self, id: UserId, user: Option<User>) -> Result<User, DomainError> {
        let mut user = user.ok_or_else(|| DomainError::bad_request("User cannot be null"))?;
        user.validate()?;

        debug!("Updating user with id: {}", id);
        let existing = self.get_user_by_id(id).await?;

        let email = user.email().unwrap_or_default().to_string();
        let exclude_id = id.to_string();
        if !same_email(existing.email(), &email)
            && !self.is_email_unique(&email, Some(exclude_id.as_str())).await?
        {
            return Err(DomainError::duplicate_email(email));
        }

        user.set_id(id);
        self.user_repository.save(&user).await
    }

    /// Applies the fields present in `patch` to the stored user.
    ///
    /// Either every field in the patch is applied or none is; the merged user
    /// must still pass full validation before it is written.
    pub async fn patch_user(
        &self,
        id: UserId,
        patch: Option<UserPatch>,
    ) -> Result<User, DomainError> {
        let patch = match patch {
            Some(patch) if !patch.is_empty() => patch,
            _ => return Err(DomainError::bad_request("No fields provided for update")),
        };

        debug!("Partially updating user with id: {}", id);
        let mut user = self.get_user_by_id(id).await?;

        if let Some(name) = patch.name {
            let name = name.ok_or_else(|| DomainError::bad_request("Name cannot be null"))?;
            if name.trim().is_empty() {
                return Err(DomainError::bad_request("Name cannot be empty"));
            }
            user.set_name(Some(name));
        }

        if let Some(email) = patch.email {
            let email = email.ok_or_else(|| DomainError::bad_request("Email cannot be null"))?;
            if email.trim().is_empty() {
                return Err(DomainError::bad_request("Email cannot be empty"));
            }
            let exclude_id = id.to_string();
            if !same_email(user.email(), &email)
                && !self.is_email_unique(&email, Some(exclude_id.as_str())).await?
            {
                return Err(DomainError::duplicate_email(normalize_email(&email)));
            }
            user.set_email(Some(email));
        }

        user.validate()?;
        self.user_repository.save(&user).await
    }

    pub async fn delete_user(&self, id: UserId) -> Result<(), DomainError> {
        debug!("Deleting user with id: {}", id);
        if !self.user_repository.exists_by_id(id).await? {
            return Err(DomainError::user_not_found("id", id));
        }
        self.user_repository.delete_by_id(id).await
    }
}

fn same_email(current: Option<&str>, candidate: &str) -> bool {
    current.map(normalize_email) == Some(normalize_email(candidate))
}
