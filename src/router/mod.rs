//! Path routing.
//!
//! The view shown for a path is a pure function of the path and of whether a
//! credential is present. Callers re-resolve after every state change instead
//! of issuing redirects themselves.

use url::Url;

/// A navigable location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    /// OAuth callback, carrying the full callback URL.
    AuthRedirect(String),
    Chat,
}

/// What gets rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Auth,
    AuthRedirect,
    Chat,
}

impl Route {
    /// Parse a path such as `/chat` or `/auth-redirect?token=t1`.
    /// Unknown paths fall back to `Home`.
    pub fn parse(path: &str) -> Self {
        let Ok(url) = Url::parse("http://localhost").and_then(|base| base.join(path)) else {
            return Route::Home;
        };
        match url.path().trim_end_matches('/') {
            "" => Route::Home,
            "/login" => Route::Login,
            "/auth-redirect" => Route::AuthRedirect(url.to_string()),
            "/chat" => Route::Chat,
            other => {
                tracing::debug!("Unknown route {}, showing home", other);
                Route::Home
            }
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::AuthRedirect(_) => "/auth-redirect",
            Route::Chat => "/chat",
        }
    }
}

/// Resolve the view for `route` given the current credential state.
pub fn resolve(route: &Route, has_credential: bool) -> View {
    match route {
        Route::Home => View::Home,
        Route::Login => View::Auth,
        Route::AuthRedirect(_) => View::AuthRedirect,
        Route::Chat if has_credential => View::Chat,
        Route::Chat => View::Auth,
    }
}
