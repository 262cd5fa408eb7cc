//! Typed client for the cineclub REST backend.
//!
//! Every resource module adds methods to [`ApiClient`]; all privileged
//! calls share one transport path that refreshes the access token when
//! needed and treats any 401 as "drop the session, re-authenticate".

pub mod client;
pub mod communities;
pub mod error;
pub mod events;
pub mod forum;
pub mod movies;
pub mod page;
pub mod poll;
pub mod responder;
pub mod users;

pub use client::ApiClient;
pub use error::{ApiError, FieldError};
pub use page::{Page, Pager};
pub use poll::ChatPoller;
