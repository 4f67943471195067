//! Not-found screen for unknown paths.

use crossterm::event::{KeyCode, KeyEvent};
use minisocial_core::messages::{NOT_FOUND_HINT, NOT_FOUND_TITLE};
use minisocial_core::routes::Route;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::mutations::StateMutation;

pub fn handle_key(key: KeyEvent) -> Vec<StateMutation> {
    match key.code {
        KeyCode::Enter | KeyCode::Char('h') => vec![StateMutation::Navigate(Route::Home)],
        KeyCode::Esc => vec![StateMutation::Back],
        _ => vec![],
    }
}

pub fn render(frame: &mut Frame, path: &str, area: Rect) {
    let top = area.height.saturating_sub(7) / 2;
    let mut lines = vec![Line::default(); top as usize];
    lines.extend([
        Line::from(Span::styled(
            "404",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            NOT_FOUND_TITLE,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            NOT_FOUND_HINT,
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(path.to_string(), Style::default().fg(Color::DarkGray))),
        Line::default(),
        Line::from(vec![
            Span::styled("Enter", Style::default().fg(Color::Cyan)),
            Span::raw(" Go to Home"),
        ]),
    ]);
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}
