use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::record::{require_email, Validate, ValidationError};

string_enum! {
    pub enum Role {
        Admin => "admin",
        Manager => "manager",
        User => "user",
    }
}

impl Role {
    pub fn from_email(email: &str) -> Self {
        let email = email.to_ascii_lowercase();
        if email.contains("admin") {
            Role::Admin
        } else if email.contains("manager") {
            Role::Manager
        } else {
            Role::User
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: Uuid,
    pub email: String,
    pub role: Role,
    pub login_time: DateTime<Utc>,
    pub remember_me: bool,
}

impl Session {
    /// Remember-me sessions never expire; others live for `ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.remember_me && now.signed_duration_since(self.login_time) >= ttl
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub email: String,
    pub password: String,
}

impl Credential {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Demo accounts accepted by the stock credential directory.
    pub fn demo_accounts() -> Vec<Credential> {
        vec![
            Credential::new("admin@erpcrm.com", "admin123"),
            Credential::new("manager@erpcrm.com", "manager123"),
            Credential::new("user@erpcrm.com", "user123"),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

impl Validate for LoginForm {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        require_email(&mut errors, "email", &self.email, "Email address is required");
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        } else if self.password.chars().count() < 6 {
            errors.add("password", "Password must be at least 6 characters");
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_follows_email_local_part() {
        assert_eq!(Role::from_email("admin@erpcrm.com"), Role::Admin);
        assert_eq!(Role::from_email("Manager@erpcrm.com"), Role::Manager);
        assert_eq!(Role::from_email("ops@erpcrm.com"), Role::User);
    }

    #[test]
    fn session_expires_after_ttl_unless_remembered() {
        let login_time: DateTime<Utc> =
            "2024-03-01T08:00:00Z".parse().expect("timestamp should parse");
        let mut session = Session {
            token: Uuid::new_v4(),
            email: "user@erpcrm.com".to_string(),
            role: Role::User,
            login_time,
            remember_me: false,
        };
        let ttl = Duration::hours(24);

        assert!(!session.is_expired(login_time + Duration::hours(23), ttl));
        assert!(session.is_expired(login_time + Duration::hours(24), ttl));

        session.remember_me = true;
        assert!(!session.is_expired(login_time + Duration::days(30), ttl));
    }

    #[test]
    fn login_form_checks_password_length() {
        let form = LoginForm {
            email: "user@erpcrm.com".to_string(),
            password: "123".to_string(),
            remember_me: false,
        };

        let errors = form.validate().expect_err("short password should fail");

        assert_eq!(errors.get("password"), Some("Password must be at least 6 characters"));
    }
}
