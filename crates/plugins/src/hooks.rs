//! Hook configuration: turns `[[hooks.hooks]]` entries into a ready registry.

use std::{collections::HashMap, sync::Arc};

use {
    reel_config::{HooksConfig, ShellHookConfigEntry},
    tracing::{info, warn},
};

pub use reel_common::hooks::{
    HookAction, HookEvent, HookHandler, HookPayload, HookRegistry, HookStats,
};

use crate::shell_hook::ShellHookHandler;

/// A shell hook entry with its event names resolved.
#[derive(Debug, Clone)]
pub struct ShellHookConfig {
    pub name: String,
    pub command: String,
    pub events: Vec<HookEvent>,
    pub timeout: u64,
    pub env: HashMap<String, String>,
}

impl ShellHookConfig {
    /// Resolve a config entry. Unknown event names are dropped with a warning.
    pub fn from_entry(entry: &ShellHookConfigEntry) -> Self {
        let events = entry
            .events
            .iter()
            .filter_map(|raw| match raw.parse::<HookEvent>() {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(hook = %entry.name, error = %e, "skipping unknown hook event");
                    None
                },
            })
            .collect();
        Self {
            name: entry.name.clone(),
            command: entry.command.clone(),
            events,
            timeout: entry.timeout,
            env: entry.env.clone(),
        }
    }
}

/// Build a registry holding one [`ShellHookHandler`] per configured hook.
///
/// Hooks with an empty command or no recognised events are skipped.
pub fn build_registry(config: Option<&HooksConfig>) -> HookRegistry {
    let mut registry = HookRegistry::new();
    for entry in config.map(|c| c.hooks.as_slice()).unwrap_or_default() {
        let hook = ShellHookConfig::from_entry(entry);
        if hook.command.trim().is_empty() {
            warn!(hook = %hook.name, "skipping hook with empty command");
            continue;
        }
        if hook.events.is_empty() {
            warn!(hook = %hook.name, "skipping hook without events");
            continue;
        }
        info!(hook = %hook.name, events = ?hook.events, "registering shell hook");
        registry.register(Arc::new(ShellHookHandler::from_config(&hook)));
    }
    registry
}
