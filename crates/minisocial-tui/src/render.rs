//! Pure view/render functions for the TUI.
//!
//! Functions here take `&AppState`, draw to a ratatui Frame, and never
//! mutate state or return effects.

use chrono::{Datelike, Local};
use minisocial_core::messages::APP_NAME;
use minisocial_core::routes::{GuardDecision, Route, guard};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::common::TaskKind;
use crate::common::text::truncate_with_ellipsis;
use crate::features::auth::render_auth_form;
use crate::features::banner::render_banner;
use crate::features::home::{HomeView, render_home};
use crate::features::not_found;
use crate::overlays::OverlayExt;
use crate::overlays::render_utils::{InputHint, centered_rect, hint_spans};
use crate::state::{AppState, TuiState};

/// Spinner frames for loading indicators.
const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];

const HEADER_HEIGHT: u16 = 3;
const BANNER_HEIGHT: u16 = 1;
const FOOTER_HEIGHT: u16 = 1;

/// Horizontal padding around the body.
const BODY_MARGIN: u16 = 2;

pub fn spinner(tui: &TuiState) -> &'static str {
    SPINNER_FRAMES[(tui.spinner_frame / 4) % SPINNER_FRAMES.len()]
}

/// Renders the entire TUI to the frame.
pub fn render(app: &AppState, frame: &mut Frame) {
    let area = frame.area();
    let tui = &app.tui;
    let banner_height = if tui.banner.current.is_some() {
        BANNER_HEIGHT
    } else {
        0
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Length(banner_height),
            Constraint::Min(1),
            Constraint::Length(FOOTER_HEIGHT),
        ])
        .split(area);

    render_header(frame, tui, chunks[0]);
    if let Some(banner) = &tui.banner.current {
        render_banner(frame, banner, chunks[1]);
    }

    let body = Rect::new(
        chunks[2].x + BODY_MARGIN,
        chunks[2].y,
        chunks[2].width.saturating_sub(BODY_MARGIN * 2),
        chunks[2].height,
    );
    render_body(frame, tui, body);
    render_footer(frame, tui, chunks[3]);

    app.overlay.render(frame, area, &tui.tasks);
}

fn render_header(frame: &mut Frame, tui: &TuiState, area: Rect) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let title = Line::from(vec![
        Span::styled(
            APP_NAME,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", tui.current_route().title()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(
        Paragraph::new(title),
        Rect::new(inner.x + 1, inner.y, inner.width.saturating_sub(2), 1),
    );

    let right = if tui.session.loading {
        Line::from(Span::styled(
            spinner(tui),
            Style::default().fg(Color::DarkGray),
        ))
    } else if let Some(identity) = tui.identity() {
        let max = (inner.width / 2) as usize;
        let mut spans = vec![
            Span::raw(truncate_with_ellipsis(identity.display_name(), max)),
            Span::raw("  "),
        ];
        let label = if tui.tasks.state(TaskKind::Logout).is_running() {
            "logging out..."
        } else {
            "logout"
        };
        spans.extend(hint_spans(&[InputHint::new("Ctrl+O", label)], Color::Cyan));
        Line::from(spans)
    } else {
        Line::from(hint_spans(
            &[
                InputHint::new("Ctrl+L", "Login"),
                InputHint::new("Ctrl+N", "Register"),
            ],
            Color::Cyan,
        ))
    };
    frame.render_widget(
        Paragraph::new(right).alignment(Alignment::Right),
        Rect::new(inner.x + 1, inner.y, inner.width.saturating_sub(2), 1),
    );
}

fn render_body(frame: &mut Frame, tui: &TuiState, area: Rect) {
    let route = tui.current_route();
    match guard(route.access(), &tui.session) {
        GuardDecision::Wait => render_waiting(frame, tui, area),
        // Redirects are applied by the reducer before the next draw
        GuardDecision::Redirect(_) => {}
        GuardDecision::Render => match route {
            Route::Home => render_home(
                frame,
                &tui.home,
                &HomeView {
                    identity: tui.identity(),
                    tasks: &tui.tasks,
                    time_format: &tui.config.ui.time_format,
                    spinner: spinner(tui),
                },
                area,
            ),
            Route::Login => render_auth_form(
                frame,
                &tui.login,
                tui.tasks.state(TaskKind::Login).is_running(),
                area,
            ),
            Route::Register => render_auth_form(
                frame,
                &tui.register,
                tui.tasks.state(TaskKind::Register).is_running(),
                area,
            ),
            Route::NotFound(path) => not_found::render(frame, path, area),
        },
    }
}

fn render_waiting(frame: &mut Frame, tui: &TuiState, area: Rect) {
    let center = centered_rect(60, 20, area);
    let line = Line::from(Span::styled(
        format!("{} Loading...", spinner(tui)),
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), center);
}

fn render_footer(frame: &mut Frame, tui: &TuiState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(40)])
        .split(area);

    let year = Local::now().year();
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!(" © {year} {APP_NAME}. All rights reserved."),
            Style::default().fg(Color::DarkGray),
        ))),
        chunks[0],
    );

    let hints = match tui.current_route() {
        Route::Home if tui.home.compose.focus.is_none() => vec![
            InputHint::new("g", "go to"),
            InputHint::new("r", "refresh"),
            InputHint::new("q", "quit"),
        ],
        _ => vec![
            InputHint::new("Ctrl+G", "go to"),
            InputHint::new("Ctrl+C", "quit"),
        ],
    };
    frame.render_widget(
        Paragraph::new(Line::from(hint_spans(&hints, Color::Cyan))).alignment(Alignment::Right),
        chunks[1],
    );
}
