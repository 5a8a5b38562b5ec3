use crate::errors::{DomainError, ValidationError};
use email_address::EmailAddress;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const NAME_MIN_LEN: usize = 4;
pub const NAME_MAX_LEN: usize = 30;

/// Opaque identifier assigned to a user on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for UserId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| DomainError::bad_request(format!("Invalid user id: '{}'", s)))
    }
}

/// Core User entity.
///
/// `name` and `email` are only reachable through the setters so the stored
/// values are always normalized: names trimmed, emails trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: Option<UserId>, // None until persisted
    name: Option<String>,
    email: Option<String>,
}

impl User {
    pub fn new(name: Option<String>, email: Option<String>) -> Self {
        let mut user = Self {
            id: None,
            name: None,
            email: None,
        };
        user.set_name(name);
        user.set_email(email);
        user
    }

    pub fn with_id(id: UserId, name: String, email: String) -> Self {
        let mut user = Self::new(Some(name), Some(email));
        user.id = Some(id);
        user
    }

    pub fn id(&self) -> Option<UserId> {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn set_id(&mut self, id: UserId) {
        self.id = Some(id);
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name.map(|n| normalize_name(&n));
    }

    pub fn set_email(&mut self, email: Option<String>) {
        self.email = email.map(|e| normalize_email(&e));
    }

    /// Checks every field rule and reports all violations at once.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut violations = Vec::new();

        // An absent name is only "required"; a present one is also size-checked.
        match self.name.as_deref() {
            None => violations.push(ValidationError::NameRequired),
            Some(name) => {
                if name.is_empty() {
                    violations.push(ValidationError::NameRequired);
                }
                if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&name_length(name)) {
                    violations.push(ValidationError::NameLength);
                }
            }
        }

        match self.email.as_deref() {
            None | Some("") => violations.push(ValidationError::EmailRequired),
            Some(email) if !EmailAddress::is_valid(email) => {
                violations.push(ValidationError::EmailInvalid)
            }
            Some(_) => {}
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(violations))
        }
    }
}

/// Length in UTF-16 code units, so characters outside the BMP count twice.
pub fn name_length(name: &str) -> usize {
    name.encode_utf16().count()
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_string()
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Sparse change set for a partial update.
///
/// The outer `Option` tracks whether the field was sent at all, the inner one
/// whether it was sent as an explicit null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<Option<String>>,
    pub email: Option<Option<String>>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, email: &str) -> User {
        User::new(Some(name.to_string()), Some(email.to_string()))
    }

    #[test]
    fn name_is_trimmed_on_construction() {
        let u = user("   John Doe  ", "john@example.com");
        assert_eq!(u.name(), Some("John Doe"));
    }

    #[test]
    fn email_is_trimmed_and_lowercased_on_every_assignment() {
        let mut u = user("John Doe", "  JOHN@Example.COM ");
        assert_eq!(u.email(), Some("john@example.com"));

        u.set_email(Some(" Other@X.Com".to_string()));
        assert_eq!(u.email(), Some("other@x.com"));
    }

    #[test]
    fn absent_fields_stay_absent() {
        let u = User::new(None, None);
        assert_eq!(u.name(), None);
        assert_eq!(u.email(), None);
        assert_eq!(u.id(), None);
    }

    #[test]
    fn valid_user_passes() {
        assert!(user("John Doe", "john@example.com").validate().is_ok());
        assert!(user("Abcd", "a@b.co").validate().is_ok());
        assert!(user(&"x".repeat(30), "a@b.co").validate().is_ok());
    }

    #[test]
    fn blank_fields_report_every_violation() {
        let err = user("   ", "  ").validate().unwrap_err();
        assert_eq!(
            err.violations(),
            &[
                ValidationError::NameRequired,
                ValidationError::NameLength,
                ValidationError::EmailRequired,
            ]
        );
    }

    #[test]
    fn name_length_bounds_apply_after_trim() {
        let err = user("  abc  ", "a@b.co").validate().unwrap_err();
        assert_eq!(err.violations(), &[ValidationError::NameLength]);

        let err = user(&"x".repeat(31), "a@b.co").validate().unwrap_err();
        assert_eq!(err.violations(), &[ValidationError::NameLength]);
    }

    #[test]
    fn malformed_email_is_rejected() {
        let err = user("John Doe", "not-an-email").validate().unwrap_err();
        assert_eq!(err.violations(), &[ValidationError::EmailInvalid]);
    }

    #[test]
    fn missing_fields_are_only_required() {
        let err = User::new(None, None).validate().unwrap_err();
        assert_eq!(
            err.violations(),
            &[ValidationError::NameRequired, ValidationError::EmailRequired]
        );

        let err = User::new(None, Some("a@b.co".into())).validate().unwrap_err();
        assert_eq!(err.violations(), &[ValidationError::NameRequired]);
    }

    #[test]
    fn name_length_counts_utf16_units() {
        // Each emoji is a surrogate pair: two of them make four units.
        assert_eq!(name_length("\u{1F600}\u{1F600}"), 4);
        assert!(user("\u{1F600}\u{1F600}", "a@b.co").validate().is_ok());

        let err = user(&"\u{1F600}".repeat(16), "a@b.co").validate().unwrap_err();
        assert_eq!(err.violations(), &[ValidationError::NameLength]);
    }

    #[test]
    fn user_id_round_trips_through_text() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<UserId>().is_err());
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(UserPatch::default().is_empty());
        let patch = UserPatch {
            name: Some(None),
            email: None,
        };
        assert!(!patch.is_empty());
    }

    mod normalization_props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Surrounding whitespace never survives assignment of a name.
            #[test]
            fn prop_name_is_stored_trimmed(name in "\\PC{0,40}") {
                let u = User::new(Some(format!("  {}  ", name)), None);
                prop_assert_eq!(u.name(), Some(name.trim()));
            }

            /// Stored email is always the trimmed, lower-cased input.
            #[test]
            fn prop_email_is_stored_canonical(email in "\\PC{0,40}") {
                let mut u = User::new(None, Some(email.clone()));
                let expected = email.trim().to_lowercase();
                prop_assert_eq!(u.email(), Some(expected.as_str()));

                u.set_email(Some(format!(" {} ", email.to_uppercase())));
                prop_assert_eq!(u.email().map(str::to_string), Some(normalize_email(&email.to_uppercase())));
            }

            /// Any trimmed name of 4..=30 ASCII letters passes with a valid email.
            #[test]
            fn prop_name_within_bounds_is_valid(name in "[A-Za-z]{4,30}", pad in " {0,5}") {
                let u = user(&format!("{}{}{}", pad, name, pad), "john@example.com");
                prop_assert!(u.validate().is_ok());
            }
        }
    }
}
