//! Home view: heading, compose form, and the post list.

use minisocial_core::feed::FeedPhase;
use minisocial_core::messages::{EMPTY_FEED_HINT, EMPTY_FEED_TITLE, LOADING_POSTS};
use minisocial_core::post::{Identity, Post};
use minisocial_core::validation::FormField;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::{ComposeField, HomeState};
use crate::common::text::wrap_lines;
use crate::common::{TaskKind, Tasks};
use crate::overlays::render_utils::{
    FieldView, InputHint, field_lines, general_error_line, hint_spans,
};

/// Rows the content field may grow to in the compose form.
const COMPOSE_CONTENT_ROWS: usize = 4;

pub struct HomeView<'a> {
    pub identity: Option<&'a Identity>,
    pub tasks: &'a Tasks,
    pub time_format: &'a str,
    pub spinner: &'a str,
}

pub fn render_home(frame: &mut Frame, home: &HomeState, view: &HomeView<'_>, area: Rect) {
    let heading = vec![
        Line::from(Span::styled(
            "Welcome to Mini Social",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            if view.identity.is_some() {
                "Share your thoughts with the community"
            } else {
                "View posts from the community"
            },
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let compose_lines = if view.identity.is_some() {
        compose_lines(home, view, area.width.saturating_sub(4))
    } else {
        Vec::new()
    };
    let compose_height = if compose_lines.is_empty() {
        0
    } else {
        compose_lines.len() as u16 + 2
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(compose_height),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(area);

    frame.render_widget(Paragraph::new(heading), chunks[0]);

    if !compose_lines.is_empty() {
        let focused = home.compose.focus.is_some();
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused {
                Color::Cyan
            } else {
                Color::DarkGray
            }))
            .title(" Create a New Post ");
        frame.render_widget(Paragraph::new(compose_lines).block(block), chunks[1]);
    }

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "All Posts",
            Style::default().add_modifier(Modifier::BOLD),
        ))),
        chunks[2],
    );
    render_feed(frame, home, view, chunks[3]);
}

fn compose_lines(home: &HomeState, view: &HomeView<'_>, width: u16) -> Vec<Line<'static>> {
    let compose = &home.compose;
    if compose.focus.is_none() {
        let mut spans = vec![Span::styled(
            "Press ",
            Style::default().fg(Color::DarkGray),
        )];
        spans.extend(hint_spans(&[InputHint::new("c", "to write a post")], Color::Cyan));
        let mut lines = Vec::new();
        if let Some(general) = &compose.errors.general {
            lines.push(general_error_line(general));
        }
        lines.push(Line::from(spans));
        return lines;
    }

    let mut lines = Vec::new();
    if let Some(general) = &compose.errors.general {
        lines.push(general_error_line(general));
    }
    lines.extend(field_lines(
        &FieldView {
            label: FormField::Title.label(),
            field: &compose.title,
            placeholder: "Enter post title",
            focused: compose.focus == Some(ComposeField::Title),
            error: compose.errors.field(FormField::Title),
            max_rows: 1,
        },
        width,
    ));
    lines.extend(field_lines(
        &FieldView {
            label: FormField::Content.label(),
            field: &compose.content,
            placeholder: "Write your message here...",
            focused: compose.focus == Some(ComposeField::Content),
            error: compose.errors.field(FormField::Content),
            max_rows: COMPOSE_CONTENT_ROWS,
        },
        width,
    ));

    let hints = if view.tasks.state(TaskKind::CreatePost).is_running() {
        vec![Span::styled(
            "Saving...",
            Style::default().fg(Color::Yellow),
        )]
    } else {
        hint_spans(
            &[
                InputHint::new("Tab", "switch field"),
                InputHint::new("Ctrl+J", "newline"),
                InputHint::new("Ctrl+S", "Create Post"),
                InputHint::new("Esc", "done"),
            ],
            Color::Cyan,
        )
    };
    lines.push(Line::from(hints));
    lines
}

fn render_feed(frame: &mut Frame, home: &HomeState, view: &HomeView<'_>, area: Rect) {
    let feed = &home.feed;
    let mut header = Vec::new();

    if feed.is_loading() {
        header.push(Line::from(Span::styled(
            format!("{} {LOADING_POSTS}", view.spinner),
            Style::default().fg(Color::Yellow),
        )));
    } else if let Some(error) = &feed.error {
        header.push(Line::from(Span::styled(
            format!("✗ {error}"),
            Style::default().fg(Color::Red),
        )));
        header.push(Line::from(hint_spans(
            &[InputHint::new("r", "retry")],
            Color::Cyan,
        )));
    } else if feed.phase == FeedPhase::Ready && feed.posts.is_empty() {
        let lines = vec![
            Line::default(),
            Line::from(Span::styled(
                EMPTY_FEED_TITLE,
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                EMPTY_FEED_HINT,
                Style::default().fg(Color::DarkGray),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
        return;
    }

    if feed.is_loading() {
        frame.render_widget(Paragraph::new(header), area);
        return;
    }

    let width = area.width.saturating_sub(2) as usize;
    let mut lines = header;
    let mut selected_range = (0, 0);
    for (i, post) in feed.posts.iter().enumerate() {
        let selected = i == home.selected && home.compose.focus.is_none();
        let start = lines.len();
        lines.extend(post_card_lines(post, view, selected, width));
        selected_range = if i == home.selected {
            (start, lines.len())
        } else {
            selected_range
        };
        lines.push(Line::default());
    }

    let height = area.height as usize;
    let (start, end) = selected_range;
    let offset = end.saturating_sub(height).min(start);
    let visible: Vec<Line<'static>> = lines.into_iter().skip(offset).take(height).collect();
    frame.render_widget(Paragraph::new(visible), area);
}

fn post_card_lines(
    post: &Post,
    view: &HomeView<'_>,
    selected: bool,
    width: usize,
) -> Vec<Line<'static>> {
    let (gutter, gutter_style) = if selected {
        ("┃ ", Style::default().fg(Color::Cyan))
    } else {
        ("│ ", Style::default().fg(Color::DarkGray))
    };
    let row = |spans: Vec<Span<'static>>| {
        let mut all = vec![Span::styled(gutter, gutter_style)];
        all.extend(spans);
        Line::from(all)
    };

    let mut lines = vec![
        row(vec![Span::styled(
            post.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        row(vec![Span::styled(
            format!("By {}  •  {}", post.author, post.formatted_date(view.time_format)),
            Style::default().fg(Color::DarkGray),
        )]),
    ];
    for text in wrap_lines(&post.content, width.saturating_sub(2)) {
        lines.push(row(vec![Span::raw(text)]));
    }
    if post.is_owned_by(view.identity) {
        let color = if selected {
            Color::Cyan
        } else {
            Color::DarkGray
        };
        lines.push(row(hint_spans(
            &[InputHint::new("e", "Edit"), InputHint::new("d", "Delete")],
            color,
        )));
    }
    lines
}
