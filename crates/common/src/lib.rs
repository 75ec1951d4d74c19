//! Shared error definitions and the tool lifecycle event system used across
//! all reel crates.

pub mod error;
pub mod hooks;

pub use error::{Context, Error, FromMessage, ReelError, Result};
