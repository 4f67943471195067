//! TUI runtime - owns terminal, runs event loop, executes effects.
//!
//! This is the "Elm runtime" boundary: all side effects happen here.
//! The reducer stays pure and produces effects; this module executes them.
//!
//! Async results (task outcomes, session changes, feed deliveries) are
//! sent to a single inbox channel that the loop drains every frame.
//!
//! Structure:
//! - `mod.rs`: Core runtime (TuiRuntime, event loop, effect dispatch)
//! - `inbox.rs`: Inbox channel types
//! - `handlers/`: Effect handler implementations

mod handlers;
mod inbox;

use std::future::Future;
use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use inbox::{UiEventReceiver, UiEventSender};
use minisocial_core::config::Config;
use minisocial_core::interrupt;
use minisocial_core::posts::PostService;
use minisocial_core::routes::Route;
use minisocial_core::services::Backend;
use minisocial_core::session::AuthSession;
use minisocial_core::subscription::Subscription;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::common::{TaskCompleted, TaskId, TaskKind, TaskStarted};
use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::AppState;
use crate::{render, terminal, update};

/// Frame interval while something is happening (~60fps).
pub const FRAME_DURATION: Duration = Duration::from_millis(16);

/// Poll duration when idle.
pub const IDLE_POLL_DURATION: Duration = Duration::from_millis(100);

/// Full-screen TUI runtime.
///
/// Owns the terminal, the state and the live registrations. Terminal state
/// is restored on drop, panic, or a second Ctrl+C.
pub struct TuiRuntime {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pub state: AppState,
    inbox_tx: UiEventSender,
    inbox_rx: UiEventReceiver,
    posts: PostService,
    session: Arc<AuthSession>,
    /// Live feed registration while the home screen is shown.
    feed: Option<Subscription>,
    session_forwarder: JoinHandle<()>,
    last_tick: Instant,
    last_terminal_event: Instant,
}

impl TuiRuntime {
    /// Creates the runtime and starts tracking the auth session.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be set up.
    pub fn new(config: Config, backend: Backend, initial: Route) -> Result<Self> {
        // Set up panic hook BEFORE entering alternate screen
        terminal::install_panic_hook();
        interrupt::set_restore_hook(|| {
            let _ = terminal::restore_terminal();
        });
        interrupt::reset();

        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        let session = Arc::new(AuthSession::start(Arc::clone(&backend.identity)));
        let session_forwarder =
            tokio::spawn(handlers::forward_session(session.reader(), inbox_tx.clone()));
        let posts = PostService::new(Arc::clone(&backend.store));
        tokio::spawn(async move { backend.restore_session().await });

        info!(route = initial.path(), "TUI started");
        let now = Instant::now();
        Ok(Self {
            terminal,
            state: AppState::new(config, initial),
            inbox_tx,
            inbox_rx,
            posts,
            session,
            feed: None,
            session_forwarder,
            last_tick: now,
            last_terminal_event: now,
        })
    }

    /// Runs the main event loop until the user quits.
    ///
    /// # Errors
    /// Returns an error if reading terminal events or drawing fails.
    pub fn run(&mut self) -> Result<()> {
        terminal::enable_input_features()?;
        let result = self.event_loop();
        let _ = terminal::disable_input_features();
        result
    }

    fn event_loop(&mut self) -> Result<()> {
        let mut dirty = true;

        while !self.state.tui.should_quit {
            if interrupt::is_interrupted() {
                self.state.tui.should_quit = true;
                break;
            }

            let events = self.collect_events()?;
            for event in events {
                if matches!(&event, UiEvent::Terminal(_)) {
                    self.last_terminal_event = Instant::now();
                }

                // Only Tick triggers render; other events batch to the next Tick
                let marks_dirty = matches!(&event, UiEvent::Tick);

                let effects = update::update(&mut self.state, event);
                if marks_dirty {
                    dirty = true;
                }
                self.execute_effects(effects);
            }

            if dirty {
                self.terminal.draw(|frame| {
                    render::render(&self.state, frame);
                })?;
                dirty = false;
            }
        }

        Ok(())
    }

    // ========================================================================
    // Event Collection
    // ========================================================================

    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();

        let recent_terminal_activity = self.last_terminal_event.elapsed() < IDLE_POLL_DURATION;
        let needs_fast_poll = self.state.tui.tasks.is_any_running()
            || self.state.tui.session.loading
            || self.state.tui.home.feed.is_loading()
            || recent_terminal_activity;
        let tick_interval = if needs_fast_poll {
            FRAME_DURATION
        } else {
            IDLE_POLL_DURATION
        };

        while let Ok(ev) = self.inbox_rx.try_recv() {
            events.push(ev);
        }

        // Block until the next tick only when there is nothing to process
        let poll_duration = if events.is_empty() {
            tick_interval.saturating_sub(self.last_tick.elapsed())
        } else {
            Duration::ZERO
        };

        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= tick_interval {
            events.push(UiEvent::Tick);
            self.last_tick = Instant::now();
        }

        Ok(events)
    }

    // ========================================================================
    // Effect Dispatch
    // ========================================================================

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    /// Spawns an async task with a uniform TaskStarted/TaskCompleted lifecycle.
    fn spawn_task<F, Fut>(&self, kind: TaskKind, id: TaskId, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = UiEvent> + Send + 'static,
    {
        let tx = self.inbox_tx.clone();
        let _ = tx.send(UiEvent::TaskStarted {
            kind,
            started: TaskStarted { id },
        });
        tokio::spawn(async move {
            let inner = f().await;
            let completed = TaskCompleted {
                id,
                result: Box::new(inner),
            };
            let _ = tx.send(UiEvent::TaskCompleted { kind, completed });
        });
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        match effect {
            UiEffect::Quit => {
                self.state.tui.should_quit = true;
            }

            // Feed lifecycle
            UiEffect::OpenFeed { sub } => {
                if let Some(previous) = self.feed.take() {
                    previous.dispose();
                }
                debug!(sub, "Opening live feed");
                self.feed = Some(handlers::open_feed(&self.posts, sub, self.inbox_tx.clone()));
            }
            UiEffect::CloseFeed => {
                if let Some(feed) = self.feed.take() {
                    debug!("Closing live feed");
                    feed.dispose();
                }
            }
            UiEffect::RefreshFeed { task } => {
                let Some(task) = task else {
                    return;
                };
                let posts = self.posts.clone();
                self.spawn_task(TaskKind::RefreshFeed, task, move || {
                    handlers::fetch_posts(posts)
                });
            }

            // Auth
            UiEffect::Login {
                task,
                email,
                password,
            } => {
                let Some(task) = task else {
                    return;
                };
                let session = Arc::clone(&self.session);
                self.spawn_task(TaskKind::Login, task, move || {
                    handlers::login(session, email, password)
                });
            }
            UiEffect::Register {
                task,
                email,
                password,
            } => {
                let Some(task) = task else {
                    return;
                };
                let session = Arc::clone(&self.session);
                self.spawn_task(TaskKind::Register, task, move || {
                    handlers::register(session, email, password)
                });
            }
            UiEffect::Logout { task } => {
                let Some(task) = task else {
                    return;
                };
                let session = Arc::clone(&self.session);
                self.spawn_task(TaskKind::Logout, task, move || handlers::logout(session));
            }

            // Posts
            UiEffect::CreatePost {
                task,
                draft,
                author,
            } => {
                let Some(task) = task else {
                    return;
                };
                let posts = self.posts.clone();
                self.spawn_task(TaskKind::CreatePost, task, move || {
                    handlers::create_post(posts, draft, author)
                });
            }
            UiEffect::UpdatePost { task, id, draft } => {
                let Some(task) = task else {
                    return;
                };
                let posts = self.posts.clone();
                self.spawn_task(TaskKind::UpdatePost, task, move || {
                    handlers::update_post(posts, id, draft)
                });
            }
            UiEffect::DeletePost { task, id } => {
                let Some(task) = task else {
                    return;
                };
                let posts = self.posts.clone();
                self.spawn_task(TaskKind::DeletePost, task, move || {
                    handlers::delete_post(posts, id)
                });
            }
        }
    }
}

impl Drop for TuiRuntime {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.dispose();
        }
        self.session_forwarder.abort();
        self.session.shutdown();
        let _ = terminal::restore_terminal();
    }
}
