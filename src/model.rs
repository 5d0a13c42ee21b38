//! Typed payloads exchanged with the task tracker API.

pub mod history;
pub mod id;
pub mod secret;
pub mod task;
pub mod user;

pub use history::*;
pub use id::*;
pub use secret::*;
pub use task::*;
pub use user::*;
