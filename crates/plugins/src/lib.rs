//! Hook plugins for tool lifecycle events.
//!
//! Shell hooks are configured under `[[hooks.hooks]]` and run once per
//! subscribed event with the payload as JSON on stdin.

pub mod hooks;
pub mod shell_hook;

pub use {
    hooks::{ShellHookConfig, build_registry},
    shell_hook::ShellHookHandler,
};
