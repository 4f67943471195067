use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use minisocial_core::feed::FeedState;
use minisocial_core::messages::{POST_CREATE_ERROR, POST_CREATED, POST_DELETE_ERROR, POST_DELETED};
use minisocial_core::post::{Identity, Post};
use minisocial_core::posts::{FeedUpdate, PostError};
use minisocial_core::validation::FormErrors;
use tracing::debug;

use super::{ComposeField, FeedSubId, HomeState};
use crate::common::{TaskKind, Tasks};
use crate::effects::UiEffect;
use crate::mutations::StateMutation;
use crate::overlays::OverlayRequest;

/// What the home key handler needs to know about the rest of the app.
pub struct HomeContext<'a> {
    pub identity: Option<&'a Identity>,
    pub tasks: &'a Tasks,
}

/// Opens, reopens or closes the live feed so that it runs exactly while
/// the home screen is shown. A changed identity reopens it so the query
/// carries the current credentials.
pub fn sync_feed(home: &mut HomeState, on_home: bool, uid: Option<&str>) -> Vec<UiEffect> {
    if uid.is_none() {
        home.compose.focus = None;
    }

    match (on_home, home.subscription.active()) {
        (true, None) => {
            let sub = home.subscription.open(uid);
            home.feed.begin_loading();
            debug!(sub, "Mounting feed");
            vec![UiEffect::OpenFeed { sub }]
        }
        (true, Some(_)) if home.subscription.owner() != uid => {
            let sub = home.subscription.open(uid);
            home.feed.begin_loading();
            debug!(sub, "Identity changed, reopening feed");
            vec![UiEffect::CloseFeed, UiEffect::OpenFeed { sub }]
        }
        (false, Some(_)) => {
            home.subscription.close();
            home.feed = FeedState::default();
            home.selected = 0;
            home.compose.focus = None;
            debug!("Unmounting feed");
            vec![UiEffect::CloseFeed]
        }
        _ => vec![],
    }
}

pub fn handle_feed_update(home: &mut HomeState, sub: FeedSubId, update: FeedUpdate) {
    if !home.subscription.accepts(sub) {
        debug!(sub, "Dropping stale feed delivery");
        return;
    }
    home.feed.apply_update(update);
    home.clamp_selection();
}

/// Applies a manual refresh. Ignored once the feed is unmounted.
pub fn handle_fetch_result(home: &mut HomeState, result: Result<Vec<Post>, PostError>) {
    if home.subscription.active().is_none() {
        return;
    }
    home.feed.apply_fetch(result);
    home.clamp_selection();
}

pub fn handle_home_paste(home: &mut HomeState, text: &str) {
    if let Some(field) = home.compose.focused_mut() {
        field.paste(text);
    }
}

pub fn handle_home_key(
    home: &mut HomeState,
    ctx: &HomeContext<'_>,
    key: KeyEvent,
) -> (Vec<UiEffect>, Vec<StateMutation>, Option<OverlayRequest>) {
    if home.compose.focus.is_some() {
        return (handle_compose_key(home, ctx, key), vec![], None);
    }

    let owned = home
        .selected_post()
        .filter(|post| post.is_owned_by(ctx.identity))
        .cloned();

    match key.code {
        KeyCode::Down | KeyCode::Char('j') => {
            home.select_next();
            (vec![], vec![], None)
        }
        KeyCode::Up | KeyCode::Char('k') => {
            home.select_prev();
            (vec![], vec![], None)
        }
        KeyCode::Char('c' | 'n') if ctx.identity.is_some() => {
            home.compose.focus = Some(ComposeField::Title);
            (vec![], vec![], None)
        }
        KeyCode::Char('e') => (vec![], vec![], owned.map(OverlayRequest::EditPost)),
        KeyCode::Char('d') => (vec![], vec![], owned.map(OverlayRequest::DeletePost)),
        KeyCode::Char('r') if !ctx.tasks.state(TaskKind::RefreshFeed).is_running() => {
            home.feed.begin_loading();
            (vec![UiEffect::RefreshFeed { task: None }], vec![], None)
        }
        KeyCode::Char('g') => (vec![], vec![], Some(OverlayRequest::Goto)),
        KeyCode::Char('q') => (vec![UiEffect::Quit], vec![], None),
        KeyCode::Esc => (vec![], vec![StateMutation::Back], None),
        _ => (vec![], vec![], None),
    }
}

fn handle_compose_key(home: &mut HomeState, ctx: &HomeContext<'_>, key: KeyEvent) -> Vec<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let compose = &mut home.compose;
    match key.code {
        KeyCode::Esc => {
            compose.focus = None;
            vec![]
        }
        KeyCode::Tab | KeyCode::BackTab => {
            compose.focus = match compose.focus {
                Some(ComposeField::Title) => Some(ComposeField::Content),
                _ => Some(ComposeField::Title),
            };
            vec![]
        }
        KeyCode::Enter if compose.focus == Some(ComposeField::Title) => {
            compose.focus = Some(ComposeField::Content);
            vec![]
        }
        KeyCode::Enter | KeyCode::Char('s') if key.code == KeyCode::Enter || ctrl => {
            submit_compose(home, ctx)
        }
        _ => {
            if let Some(field) = compose.focused_mut() {
                field.handle_key(key);
            }
            vec![]
        }
    }
}

fn submit_compose(home: &mut HomeState, ctx: &HomeContext<'_>) -> Vec<UiEffect> {
    let Some(author) = ctx.identity else {
        return vec![];
    };
    if ctx.tasks.state(TaskKind::CreatePost).is_running() {
        return vec![];
    }
    let compose = &mut home.compose;
    compose.errors = FormErrors::default();
    let draft = compose.draft();
    if let Err(errors) = draft.validate() {
        compose.errors = errors;
        return vec![];
    }
    vec![UiEffect::CreatePost {
        task: None,
        draft,
        author: author.clone(),
    }]
}

/// The new post is not added locally; it arrives with the next delivery.
pub fn handle_create_result(
    home: &mut HomeState,
    result: Result<String, PostError>,
) -> Vec<StateMutation> {
    match result {
        Ok(_) => {
            home.compose.clear();
            vec![StateMutation::success(POST_CREATED)]
        }
        Err(PostError::Invalid(errors)) => {
            home.compose.errors = errors;
            vec![]
        }
        Err(err) => {
            let message = err.user_message(POST_CREATE_ERROR);
            home.compose.errors = FormErrors::general(message.clone());
            vec![StateMutation::error(message)]
        }
    }
}

pub fn handle_delete_result(result: Result<(), PostError>) -> Vec<StateMutation> {
    match result {
        Ok(()) => vec![StateMutation::success(POST_DELETED)],
        Err(err) => vec![StateMutation::error(err.user_message(POST_DELETE_ERROR))],
    }
}
