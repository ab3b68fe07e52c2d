//! Authentication module for the CogniDoc backend
//!
//! Email/password login and registration post straight to the backend. Google
//! sign-in is a browser redirect: the backend sends the browser back to a local
//! callback with `?token=...`, which the redirect handler adopts.

pub mod login;
pub mod oauth;
pub mod tokens;

pub use login::{logout, status, AuthApi, AuthError, AuthMode};
pub use oauth::{handle_redirect, RedirectOutcome};
pub use tokens::{StoredToken, TokenStore};
