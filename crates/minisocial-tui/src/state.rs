//! Application state composition.
//!
//! ```text
//! AppState
//! ├── tui: TuiState
//! │   ├── session: SessionState  (latest auth session snapshot)
//! │   ├── nav: Navigator         (route history)
//! │   ├── home: HomeState        (feed, selection, compose form)
//! │   ├── login / register       (auth forms)
//! │   ├── banner: BannerState    (transient notification)
//! │   ├── task_seq: TaskSeq      (async task id generator)
//! │   └── tasks: Tasks           (task lifecycle state)
//! └── overlay: Option<Overlay>   (modal overlays)
//! ```
//!
//! State is split between `TuiState` and `Option<Overlay>` so overlay
//! handlers can take `&mut self` and `&TuiState` at the same time.

use minisocial_core::config::Config;
use minisocial_core::post::Identity;
use minisocial_core::routes::{Navigator, Route};
use minisocial_core::session::SessionState;

use crate::common::{TaskSeq, Tasks};
use crate::features::auth::{AuthFormState, AuthMode};
use crate::features::banner::BannerState;
use crate::features::home::HomeState;
use crate::overlays::Overlay;

/// Combined application state for the TUI.
pub struct AppState {
    pub tui: TuiState,
    pub overlay: Option<Overlay>,
}

impl AppState {
    pub fn new(config: Config, initial: Route) -> Self {
        Self {
            tui: TuiState::new(config, initial),
            overlay: None,
        }
    }
}

/// Non-overlay UI state.
pub struct TuiState {
    pub config: Config,
    pub session: SessionState,
    pub nav: Navigator,
    pub home: HomeState,
    pub login: AuthFormState,
    pub register: AuthFormState,
    pub banner: BannerState,
    pub task_seq: TaskSeq,
    pub tasks: Tasks,
    pub spinner_frame: usize,
    /// Route to show once the session reports signed out. Set when a
    /// sign-out completes before the session has caught up.
    pub after_sign_out: Option<Route>,
    pub should_quit: bool,
}

impl TuiState {
    pub fn new(config: Config, initial: Route) -> Self {
        let banner = BannerState::new(config.banner_duration());
        Self {
            config,
            session: SessionState::loading(),
            nav: Navigator::new(initial),
            home: HomeState::default(),
            login: AuthFormState::new(AuthMode::Login),
            register: AuthFormState::new(AuthMode::Register),
            banner,
            task_seq: TaskSeq::default(),
            tasks: Tasks::default(),
            spinner_frame: 0,
            after_sign_out: None,
            should_quit: false,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.identity.as_ref()
    }

    pub fn current_route(&self) -> &Route {
        self.nav.current()
    }

    /// Mutable access to the form shown on `route`, if any.
    pub fn auth_form_mut(&mut self, route: &Route) -> Option<&mut AuthFormState> {
        match route {
            Route::Login => Some(&mut self.login),
            Route::Register => Some(&mut self.register),
            Route::Home | Route::NotFound(_) => None,
        }
    }
}
