//! Overlay modules for the TUI.
//!
//! Overlays are modal UI components that temporarily take over keyboard input.
//! Each overlay is self-contained: it owns its state, key handler, and render function.
//!
//! ## Module Structure
//!
//! - `edit_post.rs`: Edit form for an owned post (`e` on the feed)
//! - `delete_confirm.rs`: Delete confirmation (`d` on the feed)
//! - `goto.rs`: Jump to a screen path (`g` or Ctrl+G)
//! - `render_utils.rs`: Shared rendering utilities for overlays and forms

pub mod delete_confirm;
pub mod edit_post;
pub mod goto;
pub mod render_utils;

use crossterm::event::KeyEvent;
pub use delete_confirm::DeleteConfirmState;
pub use edit_post::{EditPostState, handle_update_result};
pub use goto::GotoState;
use minisocial_core::post::Post;
use ratatui::Frame;
use ratatui::layout::Rect;

use crate::common::Tasks;
use crate::effects::UiEffect;
use crate::mutations::StateMutation;
use crate::state::TuiState;

// ============================================================================
// OverlayRequest / OverlayTransition / OverlayUpdate
// ============================================================================

/// Requests to open a new overlay.
#[derive(Debug)]
pub enum OverlayRequest {
    EditPost(Post),
    DeletePost(Post),
    Goto,
}

/// Transition returned by overlay key handlers.
#[derive(Debug)]
pub enum OverlayTransition {
    Stay,
    Close,
    Open(OverlayRequest),
}

/// Update returned by overlay key handlers.
#[derive(Debug)]
pub struct OverlayUpdate {
    pub transition: OverlayTransition,
    pub mutations: Vec<StateMutation>,
    pub effects: Vec<UiEffect>,
}

impl OverlayUpdate {
    fn new(transition: OverlayTransition) -> Self {
        Self {
            transition,
            mutations: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn stay() -> Self {
        Self::new(OverlayTransition::Stay)
    }

    pub fn close() -> Self {
        Self::new(OverlayTransition::Close)
    }

    pub fn open(request: OverlayRequest) -> Self {
        Self::new(OverlayTransition::Open(request))
    }

    #[must_use]
    pub fn with_mutations(mut self, mutations: Vec<StateMutation>) -> Self {
        self.mutations = mutations;
        self
    }

    #[must_use]
    pub fn with_ui_effects(mut self, effects: Vec<UiEffect>) -> Self {
        self.effects = effects;
        self
    }
}

// ============================================================================
// Overlay
// ============================================================================

#[derive(Debug)]
pub enum Overlay {
    EditPost(EditPostState),
    DeleteConfirm(DeleteConfirmState),
    Goto(GotoState),
}

impl Overlay {
    pub fn open(request: OverlayRequest) -> Self {
        match request {
            OverlayRequest::EditPost(post) => Overlay::EditPost(EditPostState::open(&post)),
            OverlayRequest::DeletePost(post) => {
                Overlay::DeleteConfirm(DeleteConfirmState::open(post))
            }
            OverlayRequest::Goto => Overlay::Goto(GotoState::open()),
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, tasks: &Tasks) {
        match self {
            Overlay::EditPost(e) => e.render(frame, area, tasks),
            Overlay::DeleteConfirm(d) => d.render(frame, area),
            Overlay::Goto(g) => g.render(frame, area),
        }
    }

    pub fn handle_key(&mut self, tui: &TuiState, key: KeyEvent) -> OverlayUpdate {
        match self {
            Overlay::EditPost(e) => e.handle_key(tui, key),
            Overlay::DeleteConfirm(d) => d.handle_key(key),
            Overlay::Goto(g) => g.handle_key(key),
        }
    }

    pub fn handle_paste(&mut self, text: &str) {
        match self {
            Overlay::EditPost(e) => e.handle_paste(text),
            Overlay::Goto(g) => g.input.paste(text),
            Overlay::DeleteConfirm(_) => {}
        }
    }
}

// ============================================================================
// OverlayExt - Extension trait for Option<Overlay>
// ============================================================================

/// Extension trait for `Option<Overlay>` covering the patterns the reducer uses.
pub trait OverlayExt {
    /// Renders the overlay if one is active.
    fn render(&self, frame: &mut Frame, area: Rect, tasks: &Tasks);

    /// Dispatches a key to the active overlay. `None` when no overlay is open.
    fn handle_key(&mut self, tui: &TuiState, key: KeyEvent) -> Option<OverlayUpdate>;
}

impl OverlayExt for Option<Overlay> {
    fn render(&self, frame: &mut Frame, area: Rect, tasks: &Tasks) {
        if let Some(overlay) = self {
            overlay.render(frame, area, tasks);
        }
    }

    fn handle_key(&mut self, tui: &TuiState, key: KeyEvent) -> Option<OverlayUpdate> {
        self.as_mut().map(|overlay| overlay.handle_key(tui, key))
    }
}

/// Handles a key event for the active overlay.
///
/// Returns `None` if no overlay was active, so the caller can route the key
/// to the current screen instead.
pub fn handle_overlay_key(
    tui: &TuiState,
    overlay: &mut Option<Overlay>,
    key: KeyEvent,
) -> Option<OverlayUpdate> {
    overlay.handle_key(tui, key)
}
