//! Delete confirmation overlay.

use crossterm::event::{KeyCode, KeyEvent};
use minisocial_core::messages::DELETE_CONFIRM;
use minisocial_core::post::Post;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use super::OverlayUpdate;
use super::render_utils::{InputHint, OverlayConfig, render_overlay};
use crate::common::truncate_with_ellipsis;
use crate::effects::UiEffect;

#[derive(Debug, Clone)]
pub struct DeleteConfirmState {
    pub post: Post,
}

impl DeleteConfirmState {
    pub fn open(post: Post) -> Self {
        Self { post }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> OverlayUpdate {
        match key.code {
            KeyCode::Char('y' | 'Y') => {
                OverlayUpdate::close().with_ui_effects(vec![UiEffect::DeletePost {
                    task: None,
                    id: self.post.id.clone(),
                }])
            }
            KeyCode::Char('n' | 'N') | KeyCode::Esc => OverlayUpdate::close(),
            _ => OverlayUpdate::stay(),
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let width = 52;
        let hints = [
            InputHint::new("y", "Delete"),
            InputHint::new("n", "Cancel"),
        ];
        let layout = render_overlay(
            frame,
            area,
            &OverlayConfig {
                title: "Delete Post",
                border_color: Color::Red,
                width,
                height: 7,
                hints: &hints,
            },
        );
        let body = vec![
            Line::from(DELETE_CONFIRM),
            Line::default(),
            Line::from(Span::styled(
                truncate_with_ellipsis(&self.post.title, usize::from(width.saturating_sub(4))),
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ];
        frame.render_widget(
            Paragraph::new(body).wrap(Wrap { trim: true }),
            layout.body,
        );
    }
}
