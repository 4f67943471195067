//! TUI reducer (update function).
//!
//! All state mutations happen here. The runtime calls `update(app, event)`
//! and executes the returned effects.

use std::mem;
use std::time::Instant;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use minisocial_core::messages::{LOGOUT_FAILED, LOGOUT_SUCCESS};
use minisocial_core::routes::{GuardDecision, Route};
use minisocial_core::session::SessionState;
use tracing::debug;

use crate::common::TaskKind;
use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::features::{auth, home, not_found};
use crate::mutations::StateMutation;
use crate::overlays::{self, Overlay, OverlayRequest, OverlayTransition, OverlayUpdate};
use crate::state::{AppState, TuiState};

/// The main reducer function.
///
/// Takes the current state and an event, mutates state, and returns effects
/// for the runtime to execute. After every event the current route is
/// re-checked against the session so guards and the feed lifecycle follow.
pub fn update(app: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    let mut effects = match event {
        UiEvent::Tick => {
            app.tui.spinner_frame = app.tui.spinner_frame.wrapping_add(1);
            app.tui.banner.expire(Instant::now());
            vec![]
        }
        UiEvent::Terminal(term_event) => handle_terminal_event(app, term_event),
        UiEvent::Session(session) => {
            handle_session(app, session);
            vec![]
        }
        UiEvent::Feed { sub, update } => {
            home::handle_feed_update(&mut app.tui.home, sub, update);
            vec![]
        }
        UiEvent::TaskStarted { kind, started } => {
            app.tui.tasks.state_mut(kind).on_started(&started);
            vec![]
        }
        UiEvent::TaskCompleted { kind, completed } => {
            if app.tui.tasks.state_mut(kind).finish_if_active(completed.id) {
                update(app, *completed.result)
            } else {
                vec![]
            }
        }
        UiEvent::LoginFinished(result) => {
            let mutations = auth::handle_auth_result(&mut app.tui.login, result);
            apply_mutations(&mut app.tui, mutations);
            vec![]
        }
        UiEvent::RegisterFinished(result) => {
            let mutations = auth::handle_auth_result(&mut app.tui.register, result);
            apply_mutations(&mut app.tui, mutations);
            vec![]
        }
        UiEvent::LogoutFinished(result) => {
            handle_logout_result(&mut app.tui, result);
            vec![]
        }
        UiEvent::PostCreated(result) => {
            let mutations = home::handle_create_result(&mut app.tui.home, result);
            apply_mutations(&mut app.tui, mutations);
            vec![]
        }
        UiEvent::PostUpdated(result) => {
            let mutations = overlays::handle_update_result(&mut app.overlay, result);
            apply_mutations(&mut app.tui, mutations);
            vec![]
        }
        UiEvent::PostDeleted(result) => {
            let mutations = home::handle_delete_result(result);
            apply_mutations(&mut app.tui, mutations);
            vec![]
        }
        UiEvent::FeedFetched(result) => {
            home::handle_fetch_result(&mut app.tui.home, result);
            vec![]
        }
    };

    effects.extend(sync_route(&mut app.tui));
    assign_task_ids(&mut app.tui, &mut effects);
    effects
}

// ============================================================================
// Session / Routing
// ============================================================================

fn handle_session(app: &mut AppState, session: SessionState) {
    debug!(
        loading = session.loading,
        signed_in = session.is_signed_in(),
        "Session changed"
    );
    app.tui.session = session;

    if !app.tui.session.loading && !app.tui.session.is_signed_in() {
        if let Some(route) = app.tui.after_sign_out.take() {
            app.tui.nav.push(route);
        }
        // Owner-only overlays make no sense once signed out.
        if matches!(
            app.overlay,
            Some(Overlay::EditPost(_) | Overlay::DeleteConfirm(_))
        ) {
            app.overlay = None;
        }
    }
}

fn handle_logout_result(tui: &mut TuiState, result: Result<(), String>) {
    match result {
        Ok(()) => {
            if tui.session.is_signed_in() {
                tui.after_sign_out = Some(Route::Login);
            } else {
                tui.nav.push(Route::Login);
            }
            apply_mutations(tui, vec![StateMutation::success(LOGOUT_SUCCESS)]);
        }
        Err(message) => {
            debug!(%message, "Logout failed");
            apply_mutations(tui, vec![StateMutation::error(LOGOUT_FAILED)]);
        }
    }
}

/// Applies the route guard and mounts or unmounts the feed to match the
/// screen that is actually shown.
fn sync_route(tui: &mut TuiState) -> Vec<UiEffect> {
    let mut decision = tui.nav.resolve(&tui.session);
    if matches!(decision, GuardDecision::Redirect(_)) {
        debug!(route = tui.nav.current().path(), "Guard redirected");
        decision = tui.nav.resolve(&tui.session);
    }
    let on_home = decision == GuardDecision::Render && *tui.nav.current() == Route::Home;
    let uid = tui.session.identity.as_ref().map(|identity| identity.uid.as_str());
    home::sync_feed(&mut tui.home, on_home, uid)
}

/// Gives every task effect emitted by this update a fresh id.
fn assign_task_ids(tui: &mut TuiState, effects: &mut [UiEffect]) {
    for effect in effects {
        if let Some(slot) = effect.task_slot()
            && slot.is_none()
        {
            *slot = Some(tui.task_seq.next_id());
        }
    }
}

// ============================================================================
// StateMutation Dispatcher
// ============================================================================

fn apply_mutations(tui: &mut TuiState, mutations: Vec<StateMutation>) {
    for mutation in mutations {
        match mutation {
            StateMutation::Navigate(route) => tui.nav.push(route),
            StateMutation::Back => {
                tui.nav.back();
            }
            StateMutation::ShowBanner { kind, message } => {
                tui.banner.show(kind, message, Instant::now());
            }
        }
    }
}

fn apply_overlay_update(app: &mut AppState, update: OverlayUpdate) -> Vec<UiEffect> {
    match update.transition {
        OverlayTransition::Stay => {}
        OverlayTransition::Close => app.overlay = None,
        OverlayTransition::Open(request) => open_overlay_request(app, request),
    }
    update.effects
}

fn open_overlay_request(app: &mut AppState, request: OverlayRequest) {
    app.overlay = Some(Overlay::open(request));
}

// ============================================================================
// Terminal Event Handlers
// ============================================================================

fn handle_terminal_event(app: &mut AppState, event: Event) -> Vec<UiEffect> {
    match event {
        Event::Key(key) => handle_key(app, key),
        Event::Paste(text) => {
            handle_paste(app, &text);
            vec![]
        }
        _ => vec![],
    }
}

fn handle_paste(app: &mut AppState, text: &str) {
    if let Some(overlay) = app.overlay.as_mut() {
        overlay.handle_paste(text);
        return;
    }
    match app.tui.nav.current().clone() {
        Route::Home => home::handle_home_paste(&mut app.tui.home, text),
        route => {
            if let Some(form) = app.tui.auth_form_mut(&route) {
                auth::handle_auth_paste(form, text);
            }
        }
    }
}

fn handle_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    if key.kind != KeyEventKind::Press {
        return vec![];
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return vec![UiEffect::Quit];
    }

    // Try to dispatch to the active overlay
    if let Some(mut update) = overlays::handle_overlay_key(&app.tui, &mut app.overlay, key) {
        apply_mutations(&mut app.tui, mem::take(&mut update.mutations));
        return apply_overlay_update(app, update);
    }

    if ctrl && let Some(effects) = handle_global_key(app, key.code) {
        return effects;
    }

    // Nothing but global keys while the session is still resolving.
    if app.tui.session.loading {
        return vec![];
    }

    match app.tui.nav.current().clone() {
        Route::Home => {
            let tui = &mut app.tui;
            let ctx = home::HomeContext {
                identity: tui.session.identity.as_ref(),
                tasks: &tui.tasks,
            };
            let (effects, mutations, request) = home::handle_home_key(&mut tui.home, &ctx, key);
            apply_mutations(&mut app.tui, mutations);
            if let Some(request) = request {
                open_overlay_request(app, request);
            }
            effects
        }
        Route::Login => {
            let submitting = app.tui.tasks.state(TaskKind::Login).is_running();
            let (effects, mutations) = auth::handle_auth_key(&mut app.tui.login, submitting, key);
            apply_mutations(&mut app.tui, mutations);
            effects
        }
        Route::Register => {
            let submitting = app.tui.tasks.state(TaskKind::Register).is_running();
            let (effects, mutations) =
                auth::handle_auth_key(&mut app.tui.register, submitting, key);
            apply_mutations(&mut app.tui, mutations);
            effects
        }
        Route::NotFound(_) => {
            apply_mutations(&mut app.tui, not_found::handle_key(key));
            vec![]
        }
    }
}

/// Ctrl shortcuts available on every screen. `None` when the key is not
/// one of them.
fn handle_global_key(app: &mut AppState, code: KeyCode) -> Option<Vec<UiEffect>> {
    match code {
        KeyCode::Char('l') => {
            apply_mutations(&mut app.tui, vec![StateMutation::Navigate(Route::Login)]);
            Some(vec![])
        }
        KeyCode::Char('n') => {
            apply_mutations(&mut app.tui, vec![StateMutation::Navigate(Route::Register)]);
            Some(vec![])
        }
        KeyCode::Char('o') => {
            if app.tui.session.is_signed_in()
                && !app.tui.tasks.state(TaskKind::Logout).is_running()
            {
                Some(vec![UiEffect::Logout { task: None }])
            } else {
                Some(vec![])
            }
        }
        KeyCode::Char('g') => {
            open_overlay_request(app, OverlayRequest::Goto);
            Some(vec![])
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use crossterm::event::KeyEventState;
    use minisocial_core::config::Config;
    use minisocial_core::messages::{LOGIN_SUCCESS, POST_UPDATED};
    use minisocial_core::post::{Identity, Post};
    use minisocial_core::posts::FeedUpdate;

    use super::*;
    use crate::common::{TaskCompleted, TaskId, TaskStarted};
    use crate::features::banner::BannerKind;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn ctrl(c: char) -> Event {
        Event::Key(KeyEvent {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn me() -> Identity {
        Identity::new("me", Some("me@example.com".to_string()))
    }

    fn post(id: &str, author_id: &str) -> Post {
        Post {
            id: id.to_string(),
            title: format!("title {id}"),
            content: "body".to_string(),
            author: format!("{author_id}@example.com"),
            author_id: author_id.to_string(),
            created_at: DateTime::UNIX_EPOCH,
        }
    }

    fn app_at(route: Route, identity: Option<Identity>) -> (AppState, Vec<UiEffect>) {
        let mut app = AppState::new(Config::default(), route);
        let effects = update(
            &mut app,
            UiEvent::Session(SessionState::resolved(identity)),
        );
        (app, effects)
    }

    fn open_sub(effects: &[UiEffect]) -> u64 {
        effects
            .iter()
            .find_map(|effect| match effect {
                UiEffect::OpenFeed { sub } => Some(*sub),
                _ => None,
            })
            .expect("feed should be opened")
    }

    /// Runs a task effect's lifecycle with `result` as its outcome.
    fn complete(app: &mut AppState, kind: TaskKind, id: TaskId, result: UiEvent) -> Vec<UiEffect> {
        update(app, UiEvent::TaskStarted {
            kind,
            started: TaskStarted { id },
        });
        update(app, UiEvent::TaskCompleted {
            kind,
            completed: TaskCompleted {
                id,
                result: Box::new(result),
            },
        })
    }

    #[test]
    fn test_nothing_mounts_while_session_loading() {
        let mut app = AppState::new(Config::default(), Route::Home);
        assert!(update(&mut app, UiEvent::Tick).is_empty());
        assert!(update(&mut app, UiEvent::Terminal(key(KeyCode::Char('j')))).is_empty());
        assert!(app.tui.home.subscription.active().is_none());
    }

    #[test]
    fn test_home_mounts_feed_once_resolved() {
        let (app, effects) = app_at(Route::Home, None);
        open_sub(&effects);
        assert!(app.tui.home.feed.is_loading());
    }

    #[test]
    fn test_login_route_redirects_when_signed_in() {
        let (app, effects) = app_at(Route::Login, Some(me()));
        assert_eq!(*app.tui.nav.current(), Route::Home);
        assert_eq!(app.tui.nav.history(), &[Route::Home]);
        open_sub(&effects);
    }

    #[test]
    fn test_leaving_home_closes_feed_and_drops_late_deliveries() {
        let (mut app, effects) = app_at(Route::Home, None);
        let sub = open_sub(&effects);

        let effects = update(&mut app, UiEvent::Terminal(ctrl('l')));
        assert_eq!(*app.tui.nav.current(), Route::Login);
        assert_eq!(effects, vec![UiEffect::CloseFeed]);

        update(&mut app, UiEvent::Feed {
            sub,
            update: FeedUpdate::Posts(vec![post("late", "x")]),
        });
        assert!(app.tui.home.feed.posts.is_empty());
    }

    #[test]
    fn test_login_success_navigates_home_with_banner() {
        let (mut app, _) = app_at(Route::Login, None);
        for c in "me@example.com".chars() {
            update(&mut app, UiEvent::Terminal(key(KeyCode::Char(c))));
        }
        update(&mut app, UiEvent::Terminal(key(KeyCode::Tab)));
        for c in "secret1".chars() {
            update(&mut app, UiEvent::Terminal(key(KeyCode::Char(c))));
        }
        let effects = update(&mut app, UiEvent::Terminal(key(KeyCode::Enter)));
        let [UiEffect::Login { task: Some(id), email, .. }] = effects.as_slice() else {
            panic!("expected a login task, got {effects:?}");
        };
        assert_eq!(email, "me@example.com");

        complete(&mut app, TaskKind::Login, *id, UiEvent::LoginFinished(Ok(())));
        assert_eq!(*app.tui.nav.current(), Route::Home);
        let banner = app.tui.banner.current.as_ref().expect("banner");
        assert_eq!(banner.kind, BannerKind::Success);
        assert_eq!(banner.message, LOGIN_SUCCESS);
        assert!(app.tui.login.email.value.is_empty());
    }

    #[test]
    fn test_stale_task_result_is_ignored() {
        let (mut app, _) = app_at(Route::Login, None);
        update(&mut app, UiEvent::TaskStarted {
            kind: TaskKind::Login,
            started: TaskStarted { id: TaskId(7) },
        });
        update(&mut app, UiEvent::TaskCompleted {
            kind: TaskKind::Login,
            completed: TaskCompleted {
                id: TaskId(3),
                result: Box::new(UiEvent::LoginFinished(Ok(()))),
            },
        });
        assert_eq!(*app.tui.nav.current(), Route::Login);
        assert!(app.tui.tasks.state(TaskKind::Login).is_running());
    }

    #[test]
    fn test_logout_waits_for_session_before_redirect() {
        let (mut app, _) = app_at(Route::Home, Some(me()));

        let effects = update(&mut app, UiEvent::Terminal(ctrl('o')));
        let [UiEffect::Logout { task: Some(id) }] = effects.as_slice() else {
            panic!("expected a logout task, got {effects:?}");
        };
        complete(&mut app, TaskKind::Logout, *id, UiEvent::LogoutFinished(Ok(())));
        // Session has not caught up yet; a login route now would bounce home.
        assert_eq!(*app.tui.nav.current(), Route::Home);

        update(&mut app, UiEvent::Session(SessionState::resolved(None)));
        assert_eq!(*app.tui.nav.current(), Route::Login);
    }

    #[test]
    fn test_edit_flow_closes_overlay_on_success() {
        let (mut app, effects) = app_at(Route::Home, Some(me()));
        let sub = open_sub(&effects);
        update(&mut app, UiEvent::Feed {
            sub,
            update: FeedUpdate::Posts(vec![post("p1", "me")]),
        });

        update(&mut app, UiEvent::Terminal(key(KeyCode::Char('e'))));
        assert!(matches!(app.overlay, Some(Overlay::EditPost(_))));

        update(&mut app, UiEvent::Terminal(key(KeyCode::Char('!'))));
        update(&mut app, UiEvent::Terminal(key(KeyCode::Enter)));
        let effects = update(&mut app, UiEvent::Terminal(key(KeyCode::Enter)));
        let [UiEffect::UpdatePost { task: Some(id), id: post_id, draft }] = effects.as_slice()
        else {
            panic!("expected an update task, got {effects:?}");
        };
        assert_eq!(post_id, "p1");
        assert_eq!(draft.title, "title p1!");

        complete(&mut app, TaskKind::UpdatePost, *id, UiEvent::PostUpdated(Ok(())));
        assert!(app.overlay.is_none());
        assert_eq!(
            app.tui.banner.current.as_ref().map(|b| b.message.as_str()),
            Some(POST_UPDATED)
        );
    }

    #[test]
    fn test_sign_out_closes_owner_overlays() {
        let (mut app, effects) = app_at(Route::Home, Some(me()));
        let sub = open_sub(&effects);
        update(&mut app, UiEvent::Feed {
            sub,
            update: FeedUpdate::Posts(vec![post("p1", "me")]),
        });
        update(&mut app, UiEvent::Terminal(key(KeyCode::Char('d'))));
        assert!(matches!(app.overlay, Some(Overlay::DeleteConfirm(_))));

        let effects = update(&mut app, UiEvent::Session(SessionState::resolved(None)));
        assert!(app.overlay.is_none());
        // Identity changed, so the feed is reopened without credentials.
        assert_eq!(effects[0], UiEffect::CloseFeed);
        open_sub(&effects);
    }

    #[test]
    fn test_goto_unknown_path_shows_not_found() {
        let (mut app, _) = app_at(Route::Home, None);
        update(&mut app, UiEvent::Terminal(key(KeyCode::Char('g'))));
        for c in "/missing".chars() {
            update(&mut app, UiEvent::Terminal(key(KeyCode::Char(c))));
        }
        let effects = update(&mut app, UiEvent::Terminal(key(KeyCode::Enter)));
        assert_eq!(effects, vec![UiEffect::CloseFeed]);
        assert_eq!(
            *app.tui.nav.current(),
            Route::NotFound("/missing".to_string())
        );

        update(&mut app, UiEvent::Terminal(key(KeyCode::Enter)));
        assert_eq!(*app.tui.nav.current(), Route::Home);
    }
}
