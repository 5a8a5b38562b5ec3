use std::fmt;
use thiserror::Error;

/// A single field-level rule a `User` failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    NameRequired,
    NameLength,
    EmailRequired,
    EmailInvalid,
}

impl ValidationError {
    pub fn message(&self) -> &'static str {
        match self {
            ValidationError::NameRequired => "name required",
            ValidationError::NameLength => "name length",
            ValidationError::EmailRequired => "email required",
            ValidationError::EmailInvalid => "email invalid",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Coarse classification the HTTP boundary maps to a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Conflict,
    Internal,
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation failed: {}", join_violations(.0))]
    Validation(Vec<ValidationError>),

    #[error("{resource} not found with {field}: '{value}'")]
    NotFound {
        resource: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{resource} already exists with {field}: '{value}'")]
    DuplicateResource {
        resource: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Repository error: {0}")]
    RepositoryError(String),
}

impl DomainError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        DomainError::BadRequest(message.into())
    }

    pub fn user_not_found(field: &'static str, value: impl fmt::Display) -> Self {
        DomainError::NotFound {
            resource: "User",
            field,
            value: value.to_string(),
        }
    }

    pub fn duplicate_email(email: impl fmt::Display) -> Self {
        DomainError::DuplicateResource {
            resource: "User",
            field: "email",
            value: email.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::BadRequest(_) | DomainError::Validation(_) => ErrorKind::BadRequest,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::DuplicateResource { .. } => ErrorKind::Conflict,
            DomainError::RepositoryError(_) => ErrorKind::Internal,
        }
    }

    /// Individual rule violations, empty for every other kind of error.
    pub fn violations(&self) -> &[ValidationError] {
        match self {
            DomainError::Validation(violations) => violations,
            _ => &[],
        }
    }
}

fn join_violations(violations: &[ValidationError]) -> String {
    violations
        .iter()
        .map(ValidationError::message)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_follow_resource_field_value_shape() {
        let err = DomainError::user_not_found("id", "abc");
        assert_eq!(err.to_string(), "User not found with id: 'abc'");

        let err = DomainError::duplicate_email("john@x.com");
        assert_eq!(err.to_string(), "User already exists with email: 'john@x.com'");
    }

    #[test]
    fn validation_is_a_bad_request() {
        let err = DomainError::Validation(vec![
            ValidationError::NameRequired,
            ValidationError::NameLength,
        ]);
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.to_string(), "Validation failed: name required, name length");
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn kinds_are_distinguishable() {
        assert_eq!(DomainError::bad_request("x").kind(), ErrorKind::BadRequest);
        assert_eq!(DomainError::user_not_found("id", 1).kind(), ErrorKind::NotFound);
        assert_eq!(DomainError::duplicate_email("a@b.co").kind(), ErrorKind::Conflict);
        assert_eq!(
            DomainError::RepositoryError("io".into()).kind(),
            ErrorKind::Internal
        );
    }
}
