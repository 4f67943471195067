use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::common::{TextField, truncate_start_with_ellipsis, text::wrap_lines};

/// Calculates the area for an overlay, centered within `area`.
pub fn calculate_overlay_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));

    let overlay_x = area.x + (area.width.saturating_sub(width)) / 2;
    let overlay_y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(overlay_x, overlay_y, width, height)
}

/// Renders the base container for an overlay (clears background, draws border and title).
pub fn render_overlay_container(frame: &mut Frame, area: Rect, title: &str, border_color: Color) {
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {title} "))
        .title_style(
            Style::default()
                .fg(border_color)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(block, area);
}

pub struct OverlayConfig<'a> {
    pub title: &'a str,
    pub border_color: Color,
    pub width: u16,
    pub height: u16,
    pub hints: &'a [InputHint<'a>],
}

pub struct OverlayLayout {
    pub popup: Rect,
    pub body: Rect,
    pub footer: Rect,
}

/// Render a standard overlay container and return its layout.
pub fn render_overlay(frame: &mut Frame, area: Rect, config: &OverlayConfig<'_>) -> OverlayLayout {
    let popup = calculate_overlay_area(area, config.width, config.height);
    render_overlay_container(frame, popup, config.title, config.border_color);

    let inner = Rect::new(
        popup.x + 2,
        popup.y + 1,
        popup.width.saturating_sub(4),
        popup.height.saturating_sub(2),
    );

    if !config.hints.is_empty() {
        render_hints(frame, inner, config.hints, config.border_color);
    }

    let footer_height = u16::from(!config.hints.is_empty());
    let body_height = inner.height.saturating_sub(footer_height);
    let footer = Rect::new(inner.x, inner.y + body_height, inner.width, footer_height);
    let body = Rect::new(inner.x, inner.y, inner.width, body_height);

    OverlayLayout {
        popup,
        body,
        footer,
    }
}

/// Keyboard hint shown as `key action`.
pub struct InputHint<'a> {
    pub key: &'a str,
    pub action: &'a str,
}

impl<'a> InputHint<'a> {
    pub fn new(key: &'a str, action: &'a str) -> Self {
        Self { key, action }
    }
}

pub fn hint_spans(hints: &[InputHint<'_>], highlight_color: Color) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for (i, hint) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" • ", Style::default().fg(Color::DarkGray)));
        }
        spans.push(Span::styled(
            hint.key.to_string(),
            Style::default().fg(highlight_color),
        ));
        spans.push(Span::styled(
            format!(" {}", hint.action),
            Style::default().fg(Color::DarkGray),
        ));
    }
    spans
}

/// Renders a line of keyboard hints on the last row of `area`.
pub fn render_hints(frame: &mut Frame, area: Rect, hints: &[InputHint], highlight_color: Color) {
    let hints_y = area.y + area.height.saturating_sub(1);
    let hints_area = Rect::new(area.x, hints_y, area.width, 1);

    let para =
        Paragraph::new(Line::from(hint_spans(hints, highlight_color))).alignment(Alignment::Center);
    frame.render_widget(para, hints_area);
}

/// Returns a centered rectangle of the given percentage size within `r`.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// How a form field should be drawn.
pub struct FieldView<'a> {
    pub label: &'a str,
    pub field: &'a TextField,
    pub placeholder: &'a str,
    pub focused: bool,
    pub error: Option<&'a str>,
    /// Maximum rows for the value; single-line fields use 1.
    pub max_rows: usize,
}

/// Lines for a labelled input: label, value rows (`> text█`), and the
/// field error if any.
pub fn field_lines(view: &FieldView<'_>, width: u16) -> Vec<Line<'static>> {
    let accent = if view.focused {
        Color::Cyan
    } else {
        Color::Gray
    };
    let mut label_style = Style::default().fg(accent);
    if view.focused {
        label_style = label_style.add_modifier(Modifier::BOLD);
    }
    let mut lines = vec![Line::from(Span::styled(view.label.to_string(), label_style))];

    let text_width = width.saturating_sub(3) as usize;
    let prompt = Span::styled("> ", Style::default().fg(Color::DarkGray));
    let cursor = || Span::styled("█", Style::default().fg(Color::Cyan));

    if view.field.value.is_empty() {
        let mut spans = vec![prompt];
        if view.focused {
            spans.push(cursor());
        }
        spans.push(Span::styled(
            view.placeholder.to_string(),
            Style::default().fg(Color::DarkGray),
        ));
        lines.push(Line::from(spans));
    } else {
        let display = view.field.display();
        let rows = if view.max_rows > 1 {
            let wrapped = wrap_lines(&display, text_width);
            let skip = wrapped.len().saturating_sub(view.max_rows);
            wrapped.into_iter().skip(skip).collect()
        } else {
            vec![truncate_start_with_ellipsis(&display, text_width)]
        };
        let last = rows.len().saturating_sub(1);
        for (i, row) in rows.into_iter().enumerate() {
            let lead = if i == 0 {
                prompt.clone()
            } else {
                Span::raw("  ")
            };
            let mut spans = vec![lead, Span::raw(row)];
            if view.focused && i == last {
                spans.push(cursor());
            }
            lines.push(Line::from(spans));
        }
    }

    if let Some(error) = view.error {
        lines.push(Line::from(Span::styled(
            format!("  {error}"),
            Style::default().fg(Color::Red),
        )));
    }
    lines
}

/// A red line for a form's general error slot.
pub fn general_error_line(message: &str) -> Line<'static> {
    Line::from(Span::styled(
        format!("✗ {message}"),
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_area_is_centered_and_clamped() {
        let area = Rect::new(0, 0, 100, 40);
        assert_eq!(calculate_overlay_area(area, 60, 10), Rect::new(20, 15, 60, 10));
        assert_eq!(calculate_overlay_area(area, 200, 100), Rect::new(2, 1, 96, 38));
    }

    #[test]
    fn test_field_lines_show_error_and_mask() {
        let field = TextField::masked().with_value("abc");
        let lines = field_lines(
            &FieldView {
                label: "Password",
                field: &field,
                placeholder: "",
                focused: false,
                error: Some("Password is required"),
                max_rows: 1,
            },
            40,
        );
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].spans[1].content, "•••");
        assert_eq!(lines[2].spans[0].content, "  Password is required");
    }
}
