//! API client module for the CogniDoc backend

mod auth;
pub mod client;
mod documents;
mod error;

pub use auth::{AuthReply, Credentials};
pub use client::DocClient;
pub use documents::{FileUpload, UploadReceipt};
pub use error::{ApiError, ApiResult};
