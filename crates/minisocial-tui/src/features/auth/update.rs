use crossterm::event::{KeyCode, KeyEvent};
use minisocial_core::messages::{LOGIN_SUCCESS, REGISTER_SUCCESS};
use minisocial_core::routes::Route;
use minisocial_core::validation::FormErrors;

use super::{AuthFormState, AuthMode};
use crate::effects::UiEffect;
use crate::mutations::StateMutation;

/// Handles a key on the login or register screen. `submitting` is true
/// while a previous submit is still in flight.
pub fn handle_auth_key(
    form: &mut AuthFormState,
    submitting: bool,
    key: KeyEvent,
) -> (Vec<UiEffect>, Vec<StateMutation>) {
    match key.code {
        KeyCode::Esc => (vec![], vec![StateMutation::Back]),
        KeyCode::Tab | KeyCode::Down => {
            form.focus_next();
            (vec![], vec![])
        }
        KeyCode::BackTab | KeyCode::Up => {
            form.focus_prev();
            (vec![], vec![])
        }
        KeyCode::Enter if !form.is_last_field() => {
            form.focus_next();
            (vec![], vec![])
        }
        KeyCode::Enter => (submit(form, submitting), vec![]),
        _ => {
            form.focused_mut().handle_key(key);
            (vec![], vec![])
        }
    }
}

pub fn handle_auth_paste(form: &mut AuthFormState, text: &str) {
    form.focused_mut().paste(text);
}

fn submit(form: &mut AuthFormState, submitting: bool) -> Vec<UiEffect> {
    if submitting {
        return vec![];
    }
    form.errors = FormErrors::default();
    if let Err(errors) = form.validate() {
        form.errors = errors;
        return vec![];
    }

    let email = form.email.value.clone();
    let password = form.password.value.clone();
    match form.mode {
        AuthMode::Login => vec![UiEffect::Login {
            task: None,
            email,
            password,
        }],
        AuthMode::Register => vec![UiEffect::Register {
            task: None,
            email,
            password,
        }],
    }
}

/// Applies the outcome of a login or register call. Success clears the
/// form and heads home; failure fills the general error slot.
pub fn handle_auth_result(
    form: &mut AuthFormState,
    result: Result<(), String>,
) -> Vec<StateMutation> {
    match result {
        Ok(()) => {
            let message = match form.mode {
                AuthMode::Login => LOGIN_SUCCESS,
                AuthMode::Register => REGISTER_SUCCESS,
            };
            form.reset();
            vec![
                StateMutation::success(message),
                StateMutation::Navigate(Route::Home),
            ]
        }
        Err(message) => {
            form.errors = FormErrors::general(message);
            vec![]
        }
    }
}
