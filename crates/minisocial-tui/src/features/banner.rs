//! Transient success/error banner shown under the header.

use std::time::{Duration, Instant};

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::common::truncate_with_ellipsis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
    /// `None` keeps the banner until replaced.
    pub expires_at: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct BannerState {
    pub current: Option<Banner>,
    /// How long banners stay up; `None` disables auto-dismiss.
    pub duration: Option<Duration>,
}

impl BannerState {
    pub fn new(duration: Option<Duration>) -> Self {
        Self {
            current: None,
            duration,
        }
    }

    /// Shows `message`, replacing any current banner.
    pub fn show(&mut self, kind: BannerKind, message: impl Into<String>, now: Instant) {
        self.current = Some(Banner {
            kind,
            message: message.into(),
            expires_at: self.duration.map(|d| now + d),
        });
    }

    /// Drops the banner once its time is up.
    pub fn expire(&mut self, now: Instant) {
        if self
            .current
            .as_ref()
            .and_then(|banner| banner.expires_at)
            .is_some_and(|deadline| now >= deadline)
        {
            self.current = None;
        }
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

pub fn render_banner(frame: &mut Frame, banner: &Banner, area: Rect) {
    let (icon, color) = match banner.kind {
        BannerKind::Success => ("✓", Color::Green),
        BannerKind::Error => ("✗", Color::Red),
    };
    let max = area.width.saturating_sub(4) as usize;
    let line = Line::from(vec![
        Span::styled(
            format!(" {icon} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            truncate_with_ellipsis(&banner.message, max),
            Style::default().fg(color),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_expires_after_duration() {
        let start = Instant::now();
        let mut state = BannerState::new(Some(Duration::from_secs(5)));
        state.show(BannerKind::Success, "Post created successfully!", start);

        state.expire(start + Duration::from_secs(4));
        assert!(state.current.is_some());

        state.expire(start + Duration::from_secs(5));
        assert!(state.current.is_none());
    }

    #[test]
    fn test_new_banner_restarts_timer() {
        let start = Instant::now();
        let mut state = BannerState::new(Some(Duration::from_secs(5)));
        state.show(BannerKind::Success, "first", start);
        state.show(BannerKind::Error, "second", start + Duration::from_secs(3));

        state.expire(start + Duration::from_secs(6));
        let banner = state.current.as_ref().unwrap();
        assert_eq!(banner.kind, BannerKind::Error);
        assert_eq!(banner.message, "second");
    }

    #[test]
    fn test_zero_duration_keeps_banner() {
        let start = Instant::now();
        let mut state = BannerState::new(None);
        state.show(BannerKind::Error, "sticky", start);
        state.expire(start + Duration::from_secs(3600));
        assert!(state.current.is_some());
    }
}
