//! Data models for CogniDoc entities

mod message;
mod query;
mod session;
mod theme;

pub use message::*;
pub use query::*;
pub use session::*;
pub use theme::*;
