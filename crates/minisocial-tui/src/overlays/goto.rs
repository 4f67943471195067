//! Path prompt for jumping to a screen.

use crossterm::event::{KeyCode, KeyEvent};
use minisocial_core::routes::Route;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::widgets::Paragraph;

use super::OverlayUpdate;
use super::render_utils::{FieldView, InputHint, OverlayConfig, field_lines, render_overlay};
use crate::common::TextField;
use crate::mutations::StateMutation;

#[derive(Debug, Clone, Default)]
pub struct GotoState {
    pub input: TextField,
}

impl GotoState {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> OverlayUpdate {
        match key.code {
            KeyCode::Esc => OverlayUpdate::close(),
            KeyCode::Enter => OverlayUpdate::close()
                .with_mutations(vec![StateMutation::Navigate(Route::parse(&self.input.value))]),
            _ => {
                self.input.handle_key(key);
                OverlayUpdate::stay()
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let width = 48;
        let hints = [InputHint::new("Enter", "go"), InputHint::new("Esc", "cancel")];
        let layout = render_overlay(
            frame,
            area,
            &OverlayConfig {
                title: "Go to",
                border_color: Color::Yellow,
                width,
                height: 5,
                hints: &hints,
            },
        );
        let lines = field_lines(
            &FieldView {
                label: "Path",
                field: &self.input,
                placeholder: "/login, /register, /",
                focused: true,
                error: None,
                max_rows: 1,
            },
            width.saturating_sub(4),
        );
        frame.render_widget(Paragraph::new(lines), layout.body);
    }
}
