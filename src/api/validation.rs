//! Input validation for API requests.
//!
//! Every check is pure and stops at the first violation, returning the
//! message the client sees. Handlers wrap the message in a `BadRequest`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::{
    CreateTodoRequest, Credentials, LoginRequest, NewTodo, NewUser, RegisterRequest, TodoPatch,
    TodoStatus, UpdateTodoRequest,
};

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MIN_FULL_NAME_LENGTH: usize = 3;
pub const TITLE_LENGTH: (usize, usize) = (5, 30);
pub const DESCRIPTION_LENGTH: (usize, usize) = (10, 500);

lazy_static! {
    /// Regex for validating email addresses (local part, @, dotted domain with a TLD)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.[A-Za-z]{2,}$"
    ).unwrap();
}

/// Treat `None` and `""` the same way: not supplied
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

// -------------------------------------------------------------------------
// Credentials
// -------------------------------------------------------------------------

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.len() > 254 || !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    let local = email.split('@').next().unwrap_or_default();
    if local.len() > 64 || local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password strength: at least 6 characters with a lowercase letter,
/// an uppercase letter, a digit and a symbol
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    let long_enough = char_len(password) >= MIN_PASSWORD_LENGTH;
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_alphanumeric());

    if long_enough && has_lowercase && has_uppercase && has_digit && has_symbol {
        Ok(())
    } else {
        Err("Provide strong password".to_string())
    }
}

/// Validate a full name: 3+ characters once trimmed, letters and spaces only
pub fn validate_full_name(full_name: &str) -> Result<(), String> {
    if char_len(full_name.trim()) < MIN_FULL_NAME_LENGTH {
        return Err(format!(
            "Full name must be at least {} characters long",
            MIN_FULL_NAME_LENGTH
        ));
    }

    let without_spaces = full_name.replace(' ', "");
    if !without_spaces.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err("Full name must contain only letters and spaces".to_string());
    }

    Ok(())
}

/// Validate a registration request and normalize it
pub fn validate_registration(req: &RegisterRequest) -> Result<NewUser, String> {
    let (Some(full_name), Some(email), Some(password)) = (
        present(&req.full_name),
        present(&req.email),
        present(&req.password),
    ) else {
        return Err("All fields are required".to_string());
    };

    let email = email.trim();
    validate_email(email)?;
    validate_password_strength(password)?;
    validate_full_name(full_name)?;

    Ok(NewUser {
        full_name: full_name.trim().to_string(),
        email: email.to_lowercase(),
        password: password.to_string(),
    })
}

/// Validate a login request. Password strength is not checked here.
pub fn validate_login(req: &LoginRequest) -> Result<Credentials, String> {
    let (Some(email), Some(password)) = (present(&req.email), present(&req.password)) else {
        return Err("Email and password are required".to_string());
    };

    let email = email.trim();
    validate_email(email)?;

    Ok(Credentials {
        email: email.to_lowercase(),
        password: password.to_string(),
    })
}

// -------------------------------------------------------------------------
// Todos
// -------------------------------------------------------------------------

/// Validate a (trimmed) todo title length
pub fn validate_title(title: &str) -> Result<(), String> {
    let (min, max) = TITLE_LENGTH;
    let len = char_len(title);
    if len < min || len > max {
        return Err(format!("Title must be between {} and {} characters", min, max));
    }
    Ok(())
}

/// Validate a (trimmed) todo description length
pub fn validate_description(description: &str) -> Result<(), String> {
    let (min, max) = DESCRIPTION_LENGTH;
    let len = char_len(description);
    if len < min || len > max {
        return Err(format!(
            "Description must be between {} and {} characters",
            min, max
        ));
    }
    Ok(())
}

/// Parse a todo status value
pub fn validate_status(status: &str) -> Result<TodoStatus, String> {
    status
        .parse()
        .map_err(|_| "Status must be either completed or incompleted".to_string())
}

/// Validate a create request. A missing status defaults to `incompleted`.
pub fn validate_new_todo(req: &CreateTodoRequest) -> Result<NewTodo, String> {
    let title = req.title.as_deref().map(str::trim).unwrap_or_default();
    let description = req.description.as_deref().map(str::trim).unwrap_or_default();

    if title.is_empty() || description.is_empty() {
        return Err("Title and description are required".to_string());
    }

    validate_title(title)?;
    validate_description(description)?;

    let status = match &req.status {
        Some(status) => validate_status(status)?,
        None => TodoStatus::default(),
    };

    Ok(NewTodo {
        title: title.to_string(),
        description: description.to_string(),
        status,
    })
}

/// Validate a partial update. Only supplied fields are checked; a supplied
/// field that is blank once trimmed is rejected before its length is.
pub fn validate_todo_patch(req: &UpdateTodoRequest) -> Result<TodoPatch, String> {
    let title = match req.title.as_deref().map(str::trim) {
        Some("") => return Err("Title cannot be empty".to_string()),
        Some(title) => {
            validate_title(title)?;
            Some(title.to_string())
        }
        None => None,
    };

    let description = match req.description.as_deref().map(str::trim) {
        Some("") => return Err("Description cannot be empty".to_string()),
        Some(description) => {
            validate_description(description)?;
            Some(description.to_string())
        }
        None => None,
    };

    let status = req.status.as_deref().map(validate_status).transpose()?;

    Ok(TodoPatch {
        title,
        description,
        status,
    })
}

/// Validate a UUID string
pub fn validate_uuid(id: &str, field_name: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{} is required", field_name));
    }

    if uuid::Uuid::parse_str(id).is_err() {
        return Err(format!("Invalid {} format", field_name));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(full_name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            full_name: Some(full_name.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    fn create(title: &str, description: &str, status: Option<&str>) -> CreateTodoRequest {
        CreateTodoRequest {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("first.last+tag@mail.example.co.uk").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("user@localhost").is_err());
        assert!(validate_email("user@@example.com").is_err());
        assert!(validate_email("user name@example.com").is_err());
        assert!(validate_email(".user@example.com").is_err());
        assert!(validate_email("us..er@example.com").is_err());
    }

    #[test]
    fn test_validate_password_strength() {
        assert!(validate_password_strength("Abcde1!").is_ok());
        assert!(validate_password_strength("S3cure#pass").is_ok());

        // Each one misses exactly one rule
        assert!(validate_password_strength("abcdef1").is_err()); // no symbol, no uppercase
        assert!(validate_password_strength("Abcdef1").is_err()); // no symbol
        assert!(validate_password_strength("abcde1!").is_err()); // no uppercase
        assert!(validate_password_strength("ABCDE1!").is_err()); // no lowercase
        assert!(validate_password_strength("Abcdef!").is_err()); // no digit
        assert!(validate_password_strength("Ab1!x").is_err()); // too short
    }

    #[test]
    fn test_validate_full_name() {
        assert!(validate_full_name("Ada").is_ok());
        assert!(validate_full_name("  Ada Lovelace  ").is_ok());

        assert_eq!(
            validate_full_name(" Al "),
            Err("Full name must be at least 3 characters long".to_string())
        );
        assert_eq!(
            validate_full_name("Agent 007"),
            Err("Full name must contain only letters and spaces".to_string())
        );
        assert!(validate_full_name("Jean-Luc").is_err());
    }

    #[test]
    fn test_validate_registration_normalizes() {
        let user = validate_registration(&registration(
            "  Ada Lovelace ",
            " Ada@Example.COM ",
            "Abcde1!",
        ))
        .unwrap();

        assert_eq!(user.full_name, "Ada Lovelace");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.password, "Abcde1!");
    }

    #[test]
    fn test_validate_registration_short_circuits_in_order() {
        let missing = RegisterRequest {
            email: Some("ada@example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(
            validate_registration(&missing),
            Err("All fields are required".to_string())
        );

        // Every field is bad: the email error wins
        assert_eq!(
            validate_registration(&registration("A1", "bad", "weak")),
            Err("Invalid email format".to_string())
        );
        assert_eq!(
            validate_registration(&registration("A1", "ada@example.com", "weak")),
            Err("Provide strong password".to_string())
        );
        assert_eq!(
            validate_registration(&registration("", "ada@example.com", "Abcde1!")),
            Err("All fields are required".to_string())
        );
    }

    #[test]
    fn test_validate_login() {
        let creds = validate_login(&LoginRequest {
            email: Some("  ADA@example.com\t".to_string()),
            password: Some("whatever".to_string()),
        })
        .unwrap();
        assert_eq!(creds.email, "ada@example.com");

        assert_eq!(
            validate_login(&LoginRequest::default()),
            Err("Email and password are required".to_string())
        );
        assert_eq!(
            validate_login(&LoginRequest {
                email: Some("nope".to_string()),
                password: Some("x".to_string()),
            }),
            Err("Invalid email format".to_string())
        );
        assert_eq!(
            validate_login(&LoginRequest {
                email: Some("   ".to_string()),
                password: Some("x".to_string()),
            }),
            Err("Invalid email format".to_string())
        );
    }

    #[test]
    fn test_title_length_boundaries() {
        let description = "A long enough description";
        assert!(validate_new_todo(&create("Four", description, None)).is_err());
        assert!(validate_new_todo(&create("Fives", description, None)).is_ok());
        assert!(validate_new_todo(&create(&"x".repeat(30), description, None)).is_ok());
        assert!(validate_new_todo(&create(&"x".repeat(31), description, None)).is_err());

        // Length is measured after trimming
        assert!(validate_new_todo(&create("  Four  ", description, None)).is_err());
    }

    #[test]
    fn test_description_length_boundaries() {
        assert!(validate_new_todo(&create("Title", "123456789", None)).is_err());
        assert!(validate_new_todo(&create("Title", "1234567890", None)).is_ok());
        assert!(validate_new_todo(&create("Title", &"d".repeat(500), None)).is_ok());
        assert!(validate_new_todo(&create("Title", &"d".repeat(501), None)).is_err());
    }

    #[test]
    fn test_validate_new_todo() {
        let todo = validate_new_todo(&create(
            "  Write report ",
            " Finish quarterly report draft ",
            None,
        ))
        .unwrap();
        assert_eq!(todo.title, "Write report");
        assert_eq!(todo.description, "Finish quarterly report draft");
        assert_eq!(todo.status, TodoStatus::Incompleted);

        let done = validate_new_todo(&create("Write report", "Finish the draft", Some("completed")))
            .unwrap();
        assert_eq!(done.status, TodoStatus::Completed);

        assert_eq!(
            validate_new_todo(&create("Write report", "Finish the draft", Some("done"))),
            Err("Status must be either completed or incompleted".to_string())
        );
        assert_eq!(
            validate_new_todo(&CreateTodoRequest {
                title: Some("Write report".to_string()),
                ..Default::default()
            }),
            Err("Title and description are required".to_string())
        );
    }

    #[test]
    fn test_validate_todo_patch() {
        let patch = validate_todo_patch(&UpdateTodoRequest {
            status: Some("completed".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            patch,
            TodoPatch {
                status: Some(TodoStatus::Completed),
                ..Default::default()
            }
        );

        assert_eq!(
            validate_todo_patch(&UpdateTodoRequest::default()),
            Ok(TodoPatch::default())
        );
    }

    #[test]
    fn test_patch_blank_is_distinct_from_short() {
        let blank = UpdateTodoRequest {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(validate_todo_patch(&blank), Err("Title cannot be empty".to_string()));

        let short = UpdateTodoRequest {
            title: Some("Tiny".to_string()),
            ..Default::default()
        };
        assert_eq!(
            validate_todo_patch(&short),
            Err("Title must be between 5 and 30 characters".to_string())
        );

        let blank_description = UpdateTodoRequest {
            description: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            validate_todo_patch(&blank_description),
            Err("Description cannot be empty".to_string())
        );
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000", "todo ID").is_ok());
        assert_eq!(validate_uuid("", "todo ID"), Err("todo ID is required".to_string()));
        assert_eq!(
            validate_uuid("not-a-uuid", "todo ID"),
            Err("Invalid todo ID format".to_string())
        );
    }
}
