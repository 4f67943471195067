//! Screen routes, the session guard, and navigation history.

use crate::session::SessionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    /// Any other path, kept verbatim for display.
    NotFound(String),
}

/// Who may see a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    RequiresAuth,
    /// Only visible while signed out (login, register).
    GuestOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still loading; show a waiting indicator.
    Wait,
    Render,
    Redirect(Route),
}

impl Route {
    /// Parses a screen path. Query strings, fragments and trailing slashes
    /// are ignored.
    pub fn parse(path: &str) -> Self {
        let path = path.trim();
        let path = path.split(['?', '#']).next().unwrap_or_default();
        match path.trim_end_matches('/') {
            "" => Route::Home,
            "/login" => Route::Login,
            "/register" => Route::Register,
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::NotFound(path) => path,
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Home | Route::NotFound(_) => Access::Public,
            Route::Login | Route::Register => Access::GuestOnly,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Login => "Login",
            Route::Register => "Register",
            Route::NotFound(_) => "Not Found",
        }
    }
}

pub fn guard(access: Access, session: &SessionState) -> GuardDecision {
    if session.loading {
        return GuardDecision::Wait;
    }
    match (access, session.is_signed_in()) {
        (Access::RequiresAuth, false) => GuardDecision::Redirect(Route::Login),
        (Access::GuestOnly, true) => GuardDecision::Redirect(Route::Home),
        _ => GuardDecision::Render,
    }
}

/// In-process navigation history.
#[derive(Debug, Clone)]
pub struct Navigator {
    history: Vec<Route>,
}

impl Navigator {
    pub fn new(initial: Route) -> Self {
        Self {
            history: vec![initial],
        }
    }

    pub fn current(&self) -> &Route {
        // history is never empty
        &self.history[self.history.len() - 1]
    }

    pub fn history(&self) -> &[Route] {
        &self.history
    }

    pub fn push(&mut self, route: Route) {
        if *self.current() != route {
            self.history.push(route);
        }
    }

    /// Swaps the current entry. Collapses into the previous entry when
    /// they would be equal.
    pub fn replace(&mut self, route: Route) {
        let last = self.history.len() - 1;
        if last > 0 && self.history[last - 1] == route {
            self.history.pop();
        } else {
            self.history[last] = route;
        }
    }

    /// Returns `false` when already at the first entry.
    pub fn back(&mut self) -> bool {
        if self.history.len() > 1 {
            self.history.pop();
            true
        } else {
            false
        }
    }

    /// Applies the guard to the current route. Redirects replace the
    /// current entry, so going back never lands on the guarded route.
    pub fn resolve(&mut self, session: &SessionState) -> GuardDecision {
        let decision = guard(self.current().access(), session);
        if let GuardDecision::Redirect(target) = &decision {
            self.replace(target.clone());
        }
        decision
    }
}
