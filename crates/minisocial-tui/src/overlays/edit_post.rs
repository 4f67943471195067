//! Edit overlay for an owned post.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use minisocial_core::messages::{POST_UPDATE_ERROR, POST_UPDATED};
use minisocial_core::post::Post;
use minisocial_core::posts::PostError;
use minisocial_core::validation::{FormErrors, FormField, PostDraft};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use super::render_utils::{
    FieldView, InputHint, OverlayConfig, field_lines, general_error_line, render_overlay,
};
use super::{Overlay, OverlayUpdate};
use crate::common::{TaskKind, Tasks, TextField};
use crate::effects::UiEffect;
use crate::features::home::ComposeField;
use crate::mutations::StateMutation;
use crate::state::TuiState;

const OVERLAY_WIDTH: u16 = 64;
const CONTENT_ROWS: usize = 6;

#[derive(Debug, Clone)]
pub struct EditPostState {
    pub post_id: String,
    pub title: TextField,
    pub content: TextField,
    pub focus: ComposeField,
    pub errors: FormErrors,
}

impl EditPostState {
    /// Opens the form prefilled with the post's current title and content.
    pub fn open(post: &Post) -> Self {
        Self {
            post_id: post.id.clone(),
            title: TextField::new().with_value(&post.title),
            content: TextField::multiline().with_value(&post.content),
            focus: ComposeField::Title,
            errors: FormErrors::default(),
        }
    }

    fn focused_mut(&mut self) -> &mut TextField {
        match self.focus {
            ComposeField::Title => &mut self.title,
            ComposeField::Content => &mut self.content,
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            ComposeField::Title => ComposeField::Content,
            ComposeField::Content => ComposeField::Title,
        };
    }

    pub fn handle_paste(&mut self, text: &str) {
        self.focused_mut().paste(text);
    }

    pub fn handle_key(&mut self, tui: &TuiState, key: KeyEvent) -> OverlayUpdate {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => OverlayUpdate::close(),
            KeyCode::Tab | KeyCode::BackTab => {
                self.toggle_focus();
                OverlayUpdate::stay()
            }
            KeyCode::Enter if self.focus == ComposeField::Title => {
                self.focus = ComposeField::Content;
                OverlayUpdate::stay()
            }
            KeyCode::Enter | KeyCode::Char('s') if key.code == KeyCode::Enter || ctrl => {
                self.submit(&tui.tasks)
            }
            _ => {
                self.focused_mut().handle_key(key);
                OverlayUpdate::stay()
            }
        }
    }

    /// Validates and emits the update. The overlay stays open until the
    /// result arrives.
    fn submit(&mut self, tasks: &Tasks) -> OverlayUpdate {
        if tasks.state(TaskKind::UpdatePost).is_running() {
            return OverlayUpdate::stay();
        }
        let draft = PostDraft::new(self.title.value.clone(), self.content.value.clone());
        if let Err(errors) = draft.validate() {
            self.errors = errors;
            return OverlayUpdate::stay();
        }
        self.errors = FormErrors::default();
        OverlayUpdate::stay().with_ui_effects(vec![UiEffect::UpdatePost {
            task: None,
            id: self.post_id.clone(),
            draft,
        }])
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, tasks: &Tasks) {
        let saving = tasks.state(TaskKind::UpdatePost).is_running();
        let width = OVERLAY_WIDTH.saturating_sub(4);

        let mut body = Vec::new();
        if let Some(general) = &self.errors.general {
            body.push(general_error_line(general));
        }
        body.extend(field_lines(
            &FieldView {
                label: FormField::Title.label(),
                field: &self.title,
                placeholder: "Enter post title",
                focused: self.focus == ComposeField::Title,
                error: self.errors.field(FormField::Title),
                max_rows: 1,
            },
            width,
        ));
        body.push(Line::default());
        body.extend(field_lines(
            &FieldView {
                label: FormField::Content.label(),
                field: &self.content,
                placeholder: "Write your message here...",
                focused: self.focus == ComposeField::Content,
                error: self.errors.field(FormField::Content),
                max_rows: CONTENT_ROWS,
            },
            width,
        ));
        if saving {
            body.push(Line::from(Span::styled(
                "Saving...",
                Style::default().fg(Color::Yellow),
            )));
        }

        let hints = [
            InputHint::new("Tab", "switch field"),
            InputHint::new("Ctrl+S", "Save"),
            InputHint::new("Esc", "Cancel"),
        ];
        let layout = render_overlay(
            frame,
            area,
            &OverlayConfig {
                title: "Edit Post",
                border_color: Color::Cyan,
                width: OVERLAY_WIDTH,
                height: body.len() as u16 + 3,
                hints: &hints,
            },
        );
        frame.render_widget(Paragraph::new(body), layout.body);
    }
}

/// Applies an update result. Success closes the edit overlay; failures
/// stay in the form (if it is still open) and raise an error banner.
pub fn handle_update_result(
    overlay: &mut Option<Overlay>,
    result: Result<(), PostError>,
) -> Vec<StateMutation> {
    let editing = match overlay {
        Some(Overlay::EditPost(state)) => Some(state),
        _ => None,
    };
    match result {
        Ok(()) => {
            if editing.is_some() {
                *overlay = None;
            }
            vec![StateMutation::success(POST_UPDATED)]
        }
        Err(PostError::Invalid(errors)) => {
            if let Some(state) = editing {
                state.errors = errors;
            }
            vec![]
        }
        Err(err) => {
            let message = err.user_message(POST_UPDATE_ERROR);
            if let Some(state) = editing {
                state.errors = FormErrors::general(message.clone());
            }
            vec![StateMutation::error(message)]
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use minisocial_core::messages::PERMISSION_DENIED;
    use minisocial_core::services::ServiceError;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn post() -> Post {
        Post {
            id: "p1".to_string(),
            title: "Old".to_string(),
            content: "Body".to_string(),
            author: "me@example.com".to_string(),
            author_id: "me".to_string(),
            created_at: DateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_submit_validates_then_emits() {
        let tasks = Tasks::default();
        let mut state = EditPostState::open(&post());
        state.title.clear();

        let update = state.submit(&tasks);
        assert!(update.effects.is_empty());
        assert_eq!(state.errors.field(FormField::Title), Some("Title is required"));

        state.title.value = "New".to_string();
        let update = state.submit(&tasks);
        assert!(matches!(update.transition, crate::overlays::OverlayTransition::Stay));
        assert_eq!(
            update.effects,
            vec![UiEffect::UpdatePost {
                task: None,
                id: "p1".to_string(),
                draft: PostDraft::new("New", "Body"),
            }]
        );
    }

    #[test]
    fn test_typing_goes_to_focused_field() {
        let mut state = EditPostState::open(&post());
        state.toggle_focus();
        state.focused_mut().handle_key(key(KeyCode::Char('!')));
        assert_eq!(state.content.value, "Body!");
        assert_eq!(state.title.value, "Old");
    }

    #[test]
    fn test_update_result_closes_or_reports() {
        let mut overlay = Some(Overlay::EditPost(EditPostState::open(&post())));
        let mutations = handle_update_result(
            &mut overlay,
            Err(PostError::Service(ServiceError::permission_denied("denied"))),
        );
        assert_eq!(mutations, vec![StateMutation::error(PERMISSION_DENIED)]);
        let Some(Overlay::EditPost(state)) = &overlay else {
            panic!("edit overlay should stay open");
        };
        assert_eq!(state.errors.general.as_deref(), Some(PERMISSION_DENIED));

        let mutations = handle_update_result(&mut overlay, Ok(()));
        assert_eq!(mutations, vec![StateMutation::success(POST_UPDATED)]);
        assert!(overlay.is_none());
    }
}
