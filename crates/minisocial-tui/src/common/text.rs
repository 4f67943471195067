//! Text utilities for TUI rendering.

use std::{iter, mem};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: char = '…';

/// Truncates a string with ellipsis if it exceeds `max_width` terminal
/// columns. Wide characters (CJK, emoji) count as two.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width <= 1 {
        return ELLIPSIS.to_string();
    }
    let mut truncated = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let next_width = width + ch.width().unwrap_or(0);
        if next_width + 1 > max_width {
            break;
        }
        truncated.push(ch);
        width = next_width;
    }
    truncated.push(ELLIPSIS);
    truncated
}

/// Like [`truncate_with_ellipsis`] but keeps the end of the string, which
/// is the part being typed in an input line.
pub fn truncate_start_with_ellipsis(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width <= 1 {
        return ELLIPSIS.to_string();
    }
    let mut kept = Vec::new();
    let mut width = 0;
    for ch in text.chars().rev() {
        let next_width = width + ch.width().unwrap_or(0);
        if next_width + 1 > max_width {
            break;
        }
        kept.push(ch);
        width = next_width;
    }
    iter::once(ELLIPSIS).chain(kept.into_iter().rev()).collect()
}

/// Hard-wraps `text` to `width` columns, honoring embedded newlines.
/// Breaks on spaces when possible.
pub fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for raw in text.split('\n') {
        let raw = raw.replace('\t', "    ");
        let mut line = String::new();
        let mut line_width = 0;
        for word in raw.split_inclusive(' ') {
            let word_width = word.width();
            if line_width + word_width > width && !line.is_empty() {
                lines.push(line.trim_end().to_string());
                line.clear();
                line_width = 0;
            }
            if word_width > width {
                for ch in word.chars() {
                    let ch_width = ch.width().unwrap_or(0);
                    if line_width + ch_width > width {
                        lines.push(mem::take(&mut line));
                        line_width = 0;
                    }
                    line.push(ch);
                    line_width += ch_width;
                }
            } else {
                line.push_str(word);
                line_width += word_width;
            }
        }
        lines.push(line.trim_end().to_string());
    }
    lines
}
