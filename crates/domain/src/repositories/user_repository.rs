use crate::entities::{User, UserId};
use crate::errors::DomainError;
use async_trait::async_trait;

/// Repository trait - defines what we need from the persistence layer.
///
/// Case-insensitive lookups compare case-folded values for equality; the
/// candidate email is always a literal, never a pattern.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError>;
    async fn find_all(&self) -> Result<Vec<User>, DomainError>;
    async fn find_by_email_ignore_case(&self, email: &str) -> Result<Option<User>, DomainError>;
    async fn exists_by_email_ignore_case(&self, email: &str) -> Result<bool, DomainError>;
    async fn find_by_exact_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// True if any user other than `exclude` has this email, ignoring case.
    async fn exists_by_email_excluding(
        &self,
        email: &str,
        exclude: Option<UserId>,
    ) -> Result<bool, DomainError>;

    async fn exists_by_id(&self, id: UserId) -> Result<bool, DomainError>;

    /// Inserts, or fully replaces the record with the same id.
    async fn save(&self, user: &User) -> Result<User, DomainError>;
    async fn delete_by_id(&self, id: UserId) -> Result<(), DomainError>;
}
