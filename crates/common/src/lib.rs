//! Common types shared by the task tracking crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
