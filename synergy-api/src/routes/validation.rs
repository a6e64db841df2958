//! Field rules shared by request bodies.
//!
//! Used through `#[validate(custom(function = ...))]`. Each rule reports at
//! most one message per field: "required" wins over format checks.

use std::borrow::Cow;
use validator::{ValidateEmail, ValidationError};

/// Shortest accepted project or task name, after trimming
pub const MIN_NAME_LENGTH: usize = 3;

/// Shortest accepted password
pub const MIN_PASSWORD_LENGTH: usize = 6;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn required(value: &str, message: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("required", message));
    }
    Ok(())
}

pub fn signup_email(value: &str) -> Result<(), ValidationError> {
    required(value, "Email is required")?;
    if !is_valid_email(value) {
        return Err(error("email", "Please provide a valid email address"));
    }
    Ok(())
}

pub fn signup_password(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(error("required", "Password is required"));
    }
    if value.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(error("length", "Password must be at least 6 characters long"));
    }
    Ok(())
}

pub fn login_email(value: &str) -> Result<(), ValidationError> {
    required(value, "Email is required")
}

pub fn login_password(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(error("required", "Password is required"));
    }
    Ok(())
}

pub fn first_name(value: &str) -> Result<(), ValidationError> {
    required(value, "First name is required")
}

pub fn last_name(value: &str) -> Result<(), ValidationError> {
    required(value, "Last name is required")
}

pub fn project_name(value: &str) -> Result<(), ValidationError> {
    required(value, "Project name is required")?;
    if value.trim().chars().count() < MIN_NAME_LENGTH {
        return Err(error("length", "Project name must be at least 3 characters long"));
    }
    Ok(())
}

pub fn task_name(value: &str) -> Result<(), ValidationError> {
    required(value, "Task name is required")?;
    if value.trim().chars().count() < MIN_NAME_LENGTH {
        return Err(error("length", "Task name must be at least 3 characters long"));
    }
    Ok(())
}

/// HTML5 address rules plus a dotted domain, so `ada@localhost` is rejected.
pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if !value.validate_email() {
        return false;
    }

    value
        .rsplit_once('@')
        .map(|(_, domain)| {
            let labels: Vec<&str> = domain.split('.').collect();
            labels.len() > 1 && labels.iter().all(|label| !label.is_empty())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<(), ValidationError>) -> String {
        result.unwrap_err().message.unwrap().to_string()
    }

    #[test]
    fn test_required_wins_over_format() {
        assert_eq!(message(signup_email("  ")), "Email is required");
        assert_eq!(message(signup_email("not-an-email")), "Please provide a valid email address");
        assert!(signup_email("ada@example.com").is_ok());
    }

    #[test]
    fn test_password_rules() {
        assert_eq!(message(signup_password("")), "Password is required");
        assert_eq!(message(signup_password("12345")), "Password must be at least 6 characters long");
        assert!(signup_password("123456").is_ok());
        assert!(login_password("1").is_ok());
    }

    #[test]
    fn test_names_are_trimmed() {
        assert_eq!(message(project_name("   ")), "Project name is required");
        assert_eq!(message(project_name("  ab  ")), "Project name must be at least 3 characters long");
        assert!(project_name(" abc ").is_ok());
        assert_eq!(message(task_name("x")), "Task name must be at least 3 characters long");
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email(" grace@example.com "));
        assert!(!is_valid_email("grace@"));
        assert!(!is_valid_email("grace@localhost"));
        assert!(!is_valid_email("grace@example."));
        assert!(is_valid_email("grace@mail.example.co.uk"));
        assert_eq!(
            message(signup_email("grace@localhost")),
            "Please provide a valid email address"
        );
    }
}
