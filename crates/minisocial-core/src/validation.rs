//! Form validation.
//!
//! Field validators are pure and synchronous. Forms run every validator for
//! their fields and collect all failures so the UI can show a message next to
//! each field at once. The `general` slot is reserved for submission-time
//! failures reported by the services.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

pub const PASSWORD_MIN_CHARS: usize = 6;
pub const TITLE_MAX_CHARS: usize = 100;
pub const CONTENT_MAX_CHARS: usize = 5000;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex pattern"));

/// Result of a single field check: `Err` carries the message to display.
pub type FieldResult = Result<(), &'static str>;

/// Checks the `local@domain.tld` shape.
pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn validate_password(password: &str) -> FieldResult {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err("Password must be at least 6 characters long");
    }
    Ok(())
}

/// Title must be non-blank; the length bound applies to the raw input.
pub fn validate_post_title(title: &str) -> FieldResult {
    if title.trim().is_empty() {
        return Err("Title is required");
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err("Title must be at most 100 characters");
    }
    Ok(())
}

pub fn validate_post_content(content: &str) -> FieldResult {
    if content.trim().is_empty() {
        return Err("Content is required");
    }
    if content.chars().count() > CONTENT_MAX_CHARS {
        return Err("Content must be at most 5000 characters");
    }
    Ok(())
}

/// Input fields across the login, register and post forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Email,
    Password,
    ConfirmPassword,
    Title,
    Content,
}

impl FormField {
    pub fn label(self) -> &'static str {
        match self {
            FormField::Email => "Email",
            FormField::Password => "Password",
            FormField::ConfirmPassword => "Confirm Password",
            FormField::Title => "Title",
            FormField::Content => "Content",
        }
    }
}

/// Aggregated form errors: per-field messages plus one general slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: Vec<(FormField, &'static str)>,
    pub general: Option<String>,
}

impl FormErrors {
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            fields: Vec::new(),
            general: Some(message.into()),
        }
    }

    fn check(&mut self, field: FormField, result: FieldResult) {
        if let Err(message) = result {
            self.fields.push((field, message));
        }
    }

    pub fn field(&self, field: FormField) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, message)| *message)
    }

    pub fn fields(&self) -> &[(FormField, &'static str)] {
        &self.fields
    }

    pub fn has_field_errors(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.general.is_none()
    }

    fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if let Some(general) = &self.general {
            write!(f, "{general}")?;
            first = false;
        }
        for (field, message) in &self.fields {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {message}", field.label())?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

fn check_email(errors: &mut FormErrors, email: &str) {
    let result = if email.trim().is_empty() {
        Err("Email is required")
    } else if validate_email(email) {
        Ok(())
    } else {
        Err("Invalid email address")
    };
    errors.check(FormField::Email, result);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    /// # Errors
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        check_email(&mut errors, &self.email);
        if self.password.is_empty() {
            errors.check(FormField::Password, Err("Password is required"));
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    /// # Errors
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        check_email(&mut errors, &self.email);

        let password = if self.password.is_empty() {
            Err("Password is required")
        } else {
            validate_password(&self.password)
        };
        errors.check(FormField::Password, password);

        let confirm = if self.confirm_password.is_empty() {
            Err("Please confirm your password")
        } else if self.confirm_password == self.password {
            Ok(())
        } else {
            Err("Passwords do not match")
        };
        errors.check(FormField::ConfirmPassword, confirm);

        errors.into_result()
    }
}

/// Transient title/content pair used while composing or editing a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

impl PostDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// # Errors
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        errors.check(FormField::Title, validate_post_title(&self.title));
        errors.check(FormField::Content, validate_post_content(&self.content));
        errors.into_result()
    }
}
