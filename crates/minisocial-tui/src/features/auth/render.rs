//! Login/register view.

use minisocial_core::messages::APP_NAME;
use minisocial_core::validation::FormField;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::{AuthFormState, AuthMode};
use crate::overlays::render_utils::{
    FieldView, InputHint, calculate_overlay_area, field_lines, general_error_line, hint_spans,
};

const CARD_WIDTH: u16 = 56;

fn copy(mode: AuthMode) -> (&'static str, &'static str, &'static str) {
    match mode {
        AuthMode::Login => (
            "Sign in to share your thoughts with the community",
            "Login to Your Account",
            "Don't have an account?",
        ),
        AuthMode::Register => (
            "Create an account to start sharing your thoughts",
            "Create Your Account",
            "Already have an account?",
        ),
    }
}

fn placeholder(field: FormField) -> &'static str {
    match field {
        FormField::Email => "Enter your email",
        FormField::Password => "Enter your password",
        FormField::ConfirmPassword => "Confirm your password",
        FormField::Title | FormField::Content => "",
    }
}

pub fn render_auth_form(frame: &mut Frame, form: &AuthFormState, submitting: bool, area: Rect) {
    let (tagline, card_title, switch_prompt) = copy(form.mode);
    let inner_width = CARD_WIDTH.saturating_sub(4);

    let mut body = Vec::new();
    if let Some(general) = &form.errors.general {
        body.push(general_error_line(general));
        body.push(Line::default());
    }
    for field in form.mode.fields() {
        body.extend(field_lines(
            &FieldView {
                label: field.label(),
                field: form.field(*field),
                placeholder: placeholder(*field),
                focused: form.focus == *field,
                error: form.errors.field(*field),
                max_rows: 1,
            },
            inner_width,
        ));
        body.push(Line::default());
    }

    let submit_label = match (form.mode, submitting) {
        (AuthMode::Login, false) => "Enter Login",
        (AuthMode::Login, true) => "Logging in...",
        (AuthMode::Register, false) => "Enter Register",
        (AuthMode::Register, true) => "Creating account...",
    };
    body.push(Line::from(Span::styled(
        submit_label,
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )));
    let (switch_key, switch_action) = match form.mode {
        AuthMode::Login => ("Ctrl+N", "Register here"),
        AuthMode::Register => ("Ctrl+L", "Login here"),
    };
    let mut switch = vec![Span::styled(
        format!("{switch_prompt} "),
        Style::default().fg(Color::DarkGray),
    )];
    switch.extend(hint_spans(
        &[InputHint::new(switch_key, switch_action)],
        Color::Cyan,
    ));
    body.push(Line::from(switch));

    let heading_height = 3;
    let card_height = body.len() as u16 + 2;
    let total = calculate_overlay_area(area, CARD_WIDTH, heading_height + card_height);

    let heading = vec![
        Line::from(Span::styled(
            format!("Welcome to {APP_NAME}"),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(tagline, Style::default().fg(Color::DarkGray))),
    ];
    frame.render_widget(
        Paragraph::new(heading).alignment(Alignment::Center),
        Rect::new(total.x, total.y, total.width, heading_height.min(total.height)),
    );

    let card = Rect::new(
        total.x,
        total.y + heading_height.min(total.height),
        total.width,
        total.height.saturating_sub(heading_height),
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {card_title} "))
        .title_style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(Paragraph::new(body).block(block), card);
}
