//! Form schemas
//!
//! Request bodies for the action endpoints. Fields missing from the JSON
//! deserialize as empty strings so they fail validation with a field error
//! instead of being rejected as malformed.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// A field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as sent by the client
    pub path: Vec<String>,
    pub message: String,
}

/// Validate a form, flattening failures into field errors sorted by field
pub fn check<T: Validate>(form: &T) -> Result<(), Vec<FieldError>> {
    form.validate().map_err(|errors| field_errors(&errors))
}

fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errors)| {
            let path = camel_case(&field);
            errors.iter().map(move |error| FieldError {
                path: vec![path.clone()],
                message: error
                    .message
                    .as_deref()
                    .unwrap_or(&error.code)
                    .to_string(),
            })
        })
        .collect()
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Length check in characters with separate too-short and too-long messages
fn bounded(
    value: &str,
    min: usize,
    max: usize,
    too_short: &'static str,
    too_long: &'static str,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min {
        Err(ValidationError::new("too_small").with_message(too_short.into()))
    } else if len > max {
        Err(ValidationError::new("too_big").with_message(too_long.into()))
    } else {
        Ok(())
    }
}

fn name(value: &str) -> Result<(), ValidationError> {
    bounded(
        value,
        2,
        50,
        "Name must be at least 2 characters",
        "Name must be less than 50 characters",
    )
}

fn first_name(value: &str) -> Result<(), ValidationError> {
    bounded(
        value,
        2,
        50,
        "First name must be at least 2 characters",
        "First name too long",
    )
}

fn last_name(value: &str) -> Result<(), ValidationError> {
    bounded(
        value,
        2,
        50,
        "Last name must be at least 2 characters",
        "Last name too long",
    )
}

fn subject(value: &str) -> Result<(), ValidationError> {
    bounded(
        value,
        5,
        100,
        "Subject must be at least 5 characters",
        "Subject must be less than 100 characters",
    )
}

fn message(value: &str) -> Result<(), ValidationError> {
    bounded(
        value,
        10,
        1000,
        "Message must be at least 10 characters",
        "Message must be less than 1000 characters",
    )
}

fn password(value: &str) -> Result<(), ValidationError> {
    bounded(
        value,
        6,
        usize::MAX,
        "Password must be at least 6 characters",
        "",
    )
}

fn page_path(value: &str) -> Result<(), ValidationError> {
    if !value.starts_with('/') {
        return Err(ValidationError::new("path").with_message("Path must start with /".into()));
    }
    bounded(value, 1, 2048, "", "Path too long")
}

// =============================================================================
// Schemas
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(custom(function = "password"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct SignupForm {
    #[validate(custom(function = "name"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(custom(function = "password"))]
    pub password: String,
    #[validate(
        custom(function = "password"),
        must_match(other = "password", message = "Passwords do not match")
    )]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ContactForm {
    #[validate(custom(function = "name"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(custom(function = "subject"))]
    pub subject: String,
    #[validate(custom(function = "message"))]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct NewsletterForm {
    #[validate(custom(function = "first_name"))]
    pub first_name: String,
    #[validate(custom(function = "last_name"))]
    pub last_name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct PageViewForm {
    #[validate(custom(function = "page_path"))]
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.path[0].as_str()).collect()
    }

    #[test]
    fn test_valid_contact() {
        let form = ContactForm {
            name: "Jane".into(),
            email: "jane@example.com".into(),
            subject: "Hello there".into(),
            message: "I would like to talk.".into(),
        };
        assert!(check(&form).is_ok());
    }

    #[test]
    fn test_contact_errors_sorted_by_field() {
        let form = ContactForm {
            name: "J".into(),
            email: "not-an-email".into(),
            subject: "Hi".into(),
            message: "short".into(),
        };
        let errors = check(&form).unwrap_err();

        assert_eq!(paths(&errors), ["email", "message", "name", "subject"]);
        assert_eq!(errors[2].message, "Name must be at least 2 characters");
        assert_eq!(errors[0].message, "Please enter a valid email address");
    }

    #[test]
    fn test_upper_bounds() {
        let form = ContactForm {
            name: "x".repeat(51),
            email: "jane@example.com".into(),
            subject: "x".repeat(101),
            message: "x".repeat(1001),
        };
        let errors = check(&form).unwrap_err();

        assert_eq!(
            errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>(),
            [
                "Message must be less than 1000 characters",
                "Name must be less than 50 characters",
                "Subject must be less than 100 characters",
            ]
        );
    }

    #[test]
    fn test_length_counts_characters() {
        assert!(name("Zo").is_ok());
        assert!(name("Ž").is_err());
        assert!(name(&"é".repeat(50)).is_ok());
    }

    #[test]
    fn test_missing_fields_fail_validation() {
        let form: NewsletterForm = serde_json::from_value(json!({"email": "a@b.co"})).unwrap();
        let errors = check(&form).unwrap_err();

        assert_eq!(paths(&errors), ["firstName", "lastName"]);
        assert_eq!(errors[0].message, "First name must be at least 2 characters");
    }

    #[test]
    fn test_newsletter_camel_case_fields() {
        let form: NewsletterForm = serde_json::from_value(json!({
            "firstName": "Jane",
            "lastName": "Doe",
            "email": "jane@example.com",
        }))
        .unwrap();
        assert_eq!(form.first_name, "Jane");
        assert!(check(&form).is_ok());
    }

    #[test]
    fn test_signup_password_mismatch() {
        let form: SignupForm = serde_json::from_value(json!({
            "name": "Jane",
            "email": "jane@example.com",
            "password": "secret1",
            "confirmPassword": "secret2",
        }))
        .unwrap();
        let errors = check(&form).unwrap_err();

        assert_eq!(
            errors,
            [FieldError {
                path: vec!["confirmPassword".into()],
                message: "Passwords do not match".into(),
            }]
        );
    }

    #[test]
    fn test_login_password_length() {
        let form = LoginForm {
            email: "jane@example.com".into(),
            password: "12345".into(),
        };
        let errors = check(&form).unwrap_err();
        assert_eq!(errors[0].message, "Password must be at least 6 characters");
    }

    #[test]
    fn test_page_path() {
        assert!(page_path("/blog/hello").is_ok());
        assert!(page_path("blog").is_err());
        assert!(page_path(&format!("/{}", "a".repeat(2048))).is_err());
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("confirm_password"), "confirmPassword");
        assert_eq!(camel_case("firstName"), "firstName");
        assert_eq!(camel_case("email"), "email");
    }
}
