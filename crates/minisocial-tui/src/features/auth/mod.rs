//! Login and register screens.

mod render;
mod state;
mod update;

pub use render::render_auth_form;
pub use state::{AuthFormState, AuthMode};
pub use update::{handle_auth_key, handle_auth_paste, handle_auth_result};
