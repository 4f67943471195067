use minisocial_core::validation::{FormErrors, FormField, LoginForm, RegisterForm};

use crate::common::TextField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

impl AuthMode {
    pub fn fields(self) -> &'static [FormField] {
        match self {
            AuthMode::Login => &[FormField::Email, FormField::Password],
            AuthMode::Register => &[
                FormField::Email,
                FormField::Password,
                FormField::ConfirmPassword,
            ],
        }
    }
}

/// Form state for the login and register screens.
#[derive(Debug, Clone)]
pub struct AuthFormState {
    pub mode: AuthMode,
    pub email: TextField,
    pub password: TextField,
    pub confirm_password: TextField,
    pub focus: FormField,
    /// Field errors from the last submit plus the general error slot,
    /// which holds service failures until the next submit.
    pub errors: FormErrors,
}

impl AuthFormState {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            email: TextField::new(),
            password: TextField::masked(),
            confirm_password: TextField::masked(),
            focus: FormField::Email,
            errors: FormErrors::default(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.mode);
    }

    pub fn field(&self, field: FormField) -> &TextField {
        match field {
            FormField::Password => &self.password,
            FormField::ConfirmPassword => &self.confirm_password,
            _ => &self.email,
        }
    }

    pub fn focused_mut(&mut self) -> &mut TextField {
        match self.focus {
            FormField::Password => &mut self.password,
            FormField::ConfirmPassword => &mut self.confirm_password,
            _ => &mut self.email,
        }
    }

    fn focus_index(&self) -> usize {
        self.mode
            .fields()
            .iter()
            .position(|f| *f == self.focus)
            .unwrap_or_default()
    }

    pub fn is_last_field(&self) -> bool {
        self.focus_index() + 1 == self.mode.fields().len()
    }

    pub fn focus_next(&mut self) {
        let fields = self.mode.fields();
        self.focus = fields[(self.focus_index() + 1) % fields.len()];
    }

    pub fn focus_prev(&mut self) {
        let fields = self.mode.fields();
        self.focus = fields[(self.focus_index() + fields.len() - 1) % fields.len()];
    }

    /// # Errors
    /// Returns every failing field for the current mode.
    pub fn validate(&self) -> Result<(), FormErrors> {
        match self.mode {
            AuthMode::Login => LoginForm {
                email: self.email.value.clone(),
                password: self.password.value.clone(),
            }
            .validate(),
            AuthMode::Register => RegisterForm {
                email: self.email.value.clone(),
                password: self.password.value.clone(),
                confirm_password: self.confirm_password.value.clone(),
            }
            .validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_cycles_through_mode_fields() {
        let mut login = AuthFormState::new(AuthMode::Login);
        login.focus_next();
        assert_eq!(login.focus, FormField::Password);
        assert!(login.is_last_field());
        login.focus_next();
        assert_eq!(login.focus, FormField::Email);

        let mut register = AuthFormState::new(AuthMode::Register);
        register.focus_prev();
        assert_eq!(register.focus, FormField::ConfirmPassword);
    }

    #[test]
    fn test_register_validation_checks_confirmation() {
        let mut form = AuthFormState::new(AuthMode::Register);
        form.email.value = "me@example.com".to_string();
        form.password.value = "secret1".to_string();
        form.confirm_password.value = "secret2".to_string();

        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.field(FormField::ConfirmPassword),
            Some("Passwords do not match")
        );
        assert!(errors.field(FormField::Password).is_none());
    }
}
