//! Data models for the Quarry Q&A dataset.
//!
//! Field names follow the public Stack Exchange API wire format (snake_case).

mod badge;
mod comment;
mod post;
mod revision;
mod site;
mod tag;
mod user;

pub use badge::*;
pub use comment::*;
pub use post::*;
pub use revision::*;
pub use site::*;
pub use tag::*;
pub use user::*;
