//! Tool lifecycle events and the registry that dispatches them.
//!
//! Every tool invocation produces a `BeforeToolCall` event, followed by
//! exactly one of `AfterToolCall` (success) or `ToolError` (failure). Hosts
//! subscribe by registering [`HookHandler`]s; shell-command handlers live in
//! `reel-plugins`.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use {
    anyhow::Result,
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    serde_json::Value,
    tracing::{debug, info, warn},
};

// ── HookEvent ───────────────────────────────────────────────────────────────

/// Lifecycle events that hooks can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookEvent {
    /// Emitted before a tool validates its arguments ("pre").
    BeforeToolCall,
    /// Emitted after a tool produced a result ("post").
    AfterToolCall,
    /// Emitted when a tool call failed ("error").
    ToolError,
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::str::FromStr for HookEvent {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.to_string() == s)
            .ok_or_else(|| format!("unknown hook event '{s}'"))
    }
}

impl HookEvent {
    /// All variants, for iteration.
    pub const ALL: &'static [HookEvent] =
        &[Self::BeforeToolCall, Self::AfterToolCall, Self::ToolError];

    /// Returns true if this event is read-only and handlers can run in parallel.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::AfterToolCall | Self::ToolError)
    }
}

// ── HookPayload ─────────────────────────────────────────────────────────────

/// Typed payload carried with each hook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum HookPayload {
    BeforeToolCall {
        session_key: String,
        tool_name: String,
        arguments: Value,
    },
    AfterToolCall {
        session_key: String,
        tool_name: String,
        result: Value,
        duration_ms: u64,
    },
    ToolError {
        session_key: String,
        tool_name: String,
        message: String,
        /// Stable error classification, e.g. `InvalidInput` or `Download`.
        kind: String,
        duration_ms: u64,
    },
}

impl HookPayload {
    /// Returns the [`HookEvent`] variant that matches this payload.
    pub fn event(&self) -> HookEvent {
        match self {
            Self::BeforeToolCall { .. } => HookEvent::BeforeToolCall,
            Self::AfterToolCall { .. } => HookEvent::AfterToolCall,
            Self::ToolError { .. } => HookEvent::ToolError,
        }
    }

    pub fn tool_name(&self) -> &str {
        match self {
            Self::BeforeToolCall { tool_name, .. }
            | Self::AfterToolCall { tool_name, .. }
            | Self::ToolError { tool_name, .. } => tool_name,
        }
    }
}

// ── HookAction ──────────────────────────────────────────────────────────────

/// The outcome a hook handler returns.
#[derive(Debug, Default)]
pub enum HookAction {
    /// Let the event proceed normally.
    #[default]
    Continue,
    /// Replace the tool arguments (only honoured for `BeforeToolCall`).
    ModifyPayload(Value),
    /// Refuse the tool call, with a reason string.
    Block(String),
}

// ── HookHandler trait ───────────────────────────────────────────────────────

/// Trait implemented by native and shell hook handlers.
#[async_trait]
pub trait HookHandler: Send + Sync {
    /// A human-readable name for this handler.
    fn name(&self) -> &str;

    /// Which events this handler subscribes to.
    fn events(&self) -> &[HookEvent];

    /// Priority for ordering. Higher values run first. Default is 0.
    fn priority(&self) -> i32 {
        0
    }

    async fn handle(&self, event: HookEvent, payload: &HookPayload) -> Result<HookAction>;
}

// ── HookStats ───────────────────────────────────────────────────────────────

/// Per-handler health statistics for circuit breaker logic.
pub struct HookStats {
    pub call_count: AtomicU64,
    pub failure_count: AtomicU64,
    pub consecutive_failures: AtomicU64,
    pub total_latency_us: AtomicU64,
    pub disabled: AtomicBool,
    pub disabled_at: std::sync::Mutex<Option<Instant>>,
}

impl HookStats {
    pub fn new() -> Self {
        Self {
            call_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            consecutive_failures: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
            disabled: AtomicBool::new(false),
            disabled_at: std::sync::Mutex::new(None),
        }
    }

    fn record(&self, latency: Duration, ok: bool) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if ok {
            self.consecutive_failures.store(0, Ordering::Relaxed);
        } else {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
            self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_success(&self, latency: Duration) {
        self.record(latency, true);
    }

    pub fn record_failure(&self, latency: Duration) {
        self.record(latency, false);
    }

    pub fn avg_latency(&self) -> Duration {
        let calls = self.call_count.load(Ordering::Relaxed);
        if calls == 0 {
            return Duration::ZERO;
        }
        let total = self.total_latency_us.load(Ordering::Relaxed);
        Duration::from_micros(total / calls)
    }
}

impl Default for HookStats {
    fn default() -> Self {
        Self::new()
    }
}

// ── HookRegistry ────────────────────────────────────────────────────────────

struct HandlerEntry {
    handler: Arc<dyn HookHandler>,
    stats: Arc<HookStats>,
}

/// Registered hook handlers, keyed by the event they subscribe to.
pub struct HookRegistry {
    handlers: HashMap<HookEvent, Vec<HandlerEntry>>,
    /// Maximum consecutive failures before auto-disabling a handler.
    circuit_breaker_threshold: u64,
    /// Cooldown period before re-enabling a circuit-broken handler.
    circuit_breaker_cooldown: Duration,
    /// When true, Block/Modify results are logged but not applied.
    pub dry_run: bool,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            circuit_breaker_threshold: 3,
            circuit_breaker_cooldown: Duration::from_secs(60),
            dry_run: false,
        }
    }

    pub fn with_circuit_breaker(mut self, threshold: u64, cooldown: Duration) -> Self {
        self.circuit_breaker_threshold = threshold;
        self.circuit_breaker_cooldown = cooldown;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Register a handler for all events it subscribes to.
    /// Handlers are kept sorted by priority (descending) within each event.
    pub fn register(&mut self, handler: Arc<dyn HookHandler>) {
        let stats = Arc::new(HookStats::new());
        for &event in handler.events() {
            let handlers = self.handlers.entry(event).or_default();
            handlers.push(HandlerEntry {
                handler: Arc::clone(&handler),
                stats: Arc::clone(&stats),
            });
            handlers.sort_by_key(|h| std::cmp::Reverse(h.handler.priority()));
        }
        info!(handler = handler.name(), "hook handler registered");
    }

    pub fn has_handlers(&self, event: HookEvent) -> bool {
        self.handlers.get(&event).is_some_and(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.values().all(Vec::is_empty)
    }

    pub fn handler_stats(&self, name: &str) -> Option<Arc<HookStats>> {
        self.handlers
            .values()
            .flatten()
            .find(|e| e.handler.name() == name)
            .map(|e| Arc::clone(&e.stats))
    }

    /// All registered handler names, sorted and deduplicated.
    pub fn handler_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .values()
            .flatten()
            .map(|e| e.handler.name().to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Returns true when the handler should be skipped. Trips the breaker
    /// after too many consecutive failures and resets it after the cooldown.
    fn is_tripped(&self, entry: &HandlerEntry) -> bool {
        let stats = &entry.stats;
        if !stats.disabled.load(Ordering::Relaxed) {
            if stats.consecutive_failures.load(Ordering::Relaxed) < self.circuit_breaker_threshold
            {
                return false;
            }
            stats.disabled.store(true, Ordering::Relaxed);
            *stats.disabled_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
            warn!(
                handler = entry.handler.name(),
                threshold = self.circuit_breaker_threshold,
                "hook circuit breaker tripped"
            );
            return true;
        }

        let disabled_at = *stats.disabled_at.lock().unwrap_or_else(|e| e.into_inner());
        match disabled_at {
            Some(at) if at.elapsed() >= self.circuit_breaker_cooldown => {
                stats.disabled.store(false, Ordering::Relaxed);
                stats.consecutive_failures.store(0, Ordering::Relaxed);
                info!(
                    handler = entry.handler.name(),
                    "hook circuit breaker reset after cooldown"
                );
                false
            },
            _ => true,
        }
    }

    /// Dispatch an event to every subscribed handler.
    ///
    /// Read-only events (`AfterToolCall`, `ToolError`) run handlers in
    /// parallel and always resolve to [`HookAction::Continue`].
    /// `BeforeToolCall` runs handlers sequentially in priority order:
    /// the first [`HookAction::Block`] short-circuits, otherwise the last
    /// [`HookAction::ModifyPayload`] wins.
    pub async fn dispatch(&self, payload: &HookPayload) -> Result<HookAction> {
        let event = payload.event();
        let handlers = match self.handlers.get(&event) {
            Some(h) if !h.is_empty() => h,
            _ => return Ok(HookAction::Continue),
        };

        debug!(event = %event, count = handlers.len(), "dispatching hook event");

        if event.is_read_only() {
            self.dispatch_parallel(event, payload, handlers).await
        } else {
            self.dispatch_sequential(event, payload, handlers).await
        }
    }

    async fn dispatch_parallel(
        &self,
        event: HookEvent,
        payload: &HookPayload,
        handlers: &[HandlerEntry],
    ) -> Result<HookAction> {
        let calls = handlers
            .iter()
            .filter(|entry| !self.is_tripped(entry))
            .map(|entry| {
                let handler = Arc::clone(&entry.handler);
                let stats = Arc::clone(&entry.stats);
                async move {
                    let start = Instant::now();
                    let result = handler.handle(event, payload).await;
                    stats.record(start.elapsed(), result.is_ok());
                    (handler, result)
                }
            });

        for (handler, result) in futures::future::join_all(calls).await {
            match result {
                Ok(HookAction::Continue) => {},
                Ok(other) => {
                    debug!(handler = handler.name(), event = %event, action = ?other, "hook action on read-only event ignored");
                },
                Err(e) => {
                    warn!(handler = handler.name(), event = %event, error = %e, "hook handler failed");
                },
            }
        }

        Ok(HookAction::Continue)
    }

    async fn dispatch_sequential(
        &self,
        event: HookEvent,
        payload: &HookPayload,
        handlers: &[HandlerEntry],
    ) -> Result<HookAction> {
        let mut last_modify: Option<Value> = None;

        for entry in handlers {
            if self.is_tripped(entry) {
                continue;
            }

            let start = Instant::now();
            let result = entry.handler.handle(event, payload).await;
            entry.stats.record(start.elapsed(), result.is_ok());
            let name = entry.handler.name();

            match result {
                Ok(HookAction::Continue) => {},
                Ok(HookAction::ModifyPayload(v)) if self.dry_run => {
                    info!(handler = name, event = %event, modified = %v, "hook modify (dry-run, not applied)");
                },
                Ok(HookAction::ModifyPayload(v)) => {
                    debug!(handler = name, event = %event, "hook modified payload");
                    last_modify = Some(v);
                },
                Ok(HookAction::Block(reason)) if self.dry_run => {
                    info!(handler = name, event = %event, reason = %reason, "hook block (dry-run, not applied)");
                },
                Ok(HookAction::Block(reason)) => {
                    info!(handler = name, event = %event, reason = %reason, "hook blocked event");
                    return Ok(HookAction::Block(reason));
                },
                Err(e) => {
                    warn!(handler = name, event = %event, error = %e, "hook handler failed");
                },
            }
        }

        Ok(last_modify.map_or(HookAction::Continue, HookAction::ModifyPayload))
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Fixed {
        name: String,
        priority: i32,
        subscribed: Vec<HookEvent>,
        action: fn(&str) -> HookAction,
    }

    #[async_trait]
    impl HookHandler for Fixed {
        fn name(&self) -> &str {
            &self.name
        }

        fn events(&self) -> &[HookEvent] {
            &self.subscribed
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        async fn handle(&self, _event: HookEvent, _payload: &HookPayload) -> Result<HookAction> {
            Ok((self.action)(&self.name))
        }
    }

    fn fixed(name: &str, priority: i32, action: fn(&str) -> HookAction) -> Arc<Fixed> {
        Arc::new(Fixed {
            name: name.into(),
            priority,
            subscribed: vec![HookEvent::BeforeToolCall, HookEvent::AfterToolCall],
            action,
        })
    }

    struct Recorder {
        seen: Mutex<Vec<HookEvent>>,
    }

    #[async_trait]
    impl HookHandler for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn events(&self) -> &[HookEvent] {
            HookEvent::ALL
        }

        async fn handle(&self, event: HookEvent, _payload: &HookPayload) -> Result<HookAction> {
            self.seen.lock().unwrap().push(event);
            Ok(HookAction::Continue)
        }
    }

    struct Failing;

    #[async_trait]
    impl HookHandler for Failing {
        fn name(&self) -> &str {
            "failer"
        }

        fn events(&self) -> &[HookEvent] {
            &[HookEvent::BeforeToolCall]
        }

        async fn handle(&self, _event: HookEvent, _payload: &HookPayload) -> Result<HookAction> {
            anyhow::bail!("always fails")
        }
    }

    fn before() -> HookPayload {
        HookPayload::BeforeToolCall {
            session_key: "main".into(),
            tool_name: "youtube-dl".into(),
            arguments: serde_json::json!({"url": "https://youtube.com/watch?v=x"}),
        }
    }

    fn after() -> HookPayload {
        HookPayload::AfterToolCall {
            session_key: "main".into(),
            tool_name: "youtube-dl".into(),
            result: serde_json::json!({"path": "/tmp/audio.mp3"}),
            duration_ms: 12,
        }
    }

    #[tokio::test]
    async fn no_handlers_continue() {
        let registry = HookRegistry::new();
        assert!(registry.is_empty());
        let action = registry.dispatch(&before()).await.unwrap();
        assert!(matches!(action, HookAction::Continue));
    }

    #[test]
    fn handlers_sorted_by_priority() {
        let mut registry = HookRegistry::new();
        registry.register(fixed("low", -5, |_| HookAction::Continue));
        registry.register(fixed("high", 10, |_| HookAction::Continue));
        registry.register(fixed("mid", 0, |_| HookAction::Continue));

        let order: Vec<&str> = registry.handlers[&HookEvent::BeforeToolCall]
            .iter()
            .map(|e| e.handler.name())
            .collect();
        assert_eq!(order, ["high", "mid", "low"]);
        assert_eq!(registry.handler_names(), ["high", "low", "mid"]);
    }

    #[tokio::test]
    async fn higher_priority_block_wins() {
        let mut registry = HookRegistry::new();
        registry.register(fixed("low", 0, |n| HookAction::Block(n.into())));
        registry.register(fixed("high", 10, |n| HookAction::Block(n.into())));

        match registry.dispatch(&before()).await.unwrap() {
            HookAction::Block(reason) => assert_eq!(reason, "high"),
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn last_modify_wins() {
        let mut registry = HookRegistry::new();
        registry.register(fixed("first", 10, |_| {
            HookAction::ModifyPayload(serde_json::json!({"n": 1}))
        }));
        registry.register(fixed("second", 0, |_| {
            HookAction::ModifyPayload(serde_json::json!({"n": 2}))
        }));

        match registry.dispatch(&before()).await.unwrap() {
            HookAction::ModifyPayload(v) => assert_eq!(v["n"], 2),
            other => panic!("expected modify, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_only_events_ignore_block() {
        let mut registry = HookRegistry::new();
        registry.register(fixed("blocker", 0, |n| HookAction::Block(n.into())));
        let action = registry.dispatch(&after()).await.unwrap();
        assert!(matches!(action, HookAction::Continue));
    }

    #[tokio::test]
    async fn dry_run_does_not_block() {
        let mut registry = HookRegistry::new().with_dry_run(true);
        registry.register(fixed("blocker", 0, |n| HookAction::Block(n.into())));
        let action = registry.dispatch(&before()).await.unwrap();
        assert!(matches!(action, HookAction::Continue));
    }

    #[tokio::test]
    async fn recorder_sees_every_event() {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let mut registry = HookRegistry::new();
        registry.register(recorder.clone());

        registry.dispatch(&before()).await.unwrap();
        registry.dispatch(&after()).await.unwrap();
        registry
            .dispatch(&HookPayload::ToolError {
                session_key: "main".into(),
                tool_name: "youtube-dl".into(),
                message: "boom".into(),
                kind: "Download".into(),
                duration_ms: 3,
            })
            .await
            .unwrap();

        assert_eq!(*recorder.seen.lock().unwrap(), HookEvent::ALL);
    }

    #[tokio::test]
    async fn circuit_breaker_trips_and_resets() {
        let mut registry = HookRegistry::new().with_circuit_breaker(2, Duration::from_millis(100));
        registry.register(Arc::new(Failing));

        registry.dispatch(&before()).await.unwrap();
        registry.dispatch(&before()).await.unwrap();
        registry.dispatch(&before()).await.unwrap();
        let stats = registry.handler_stats("failer").unwrap();
        assert!(stats.disabled.load(Ordering::Relaxed));
        assert_eq!(stats.call_count.load(Ordering::Relaxed), 2);

        tokio::time::sleep(Duration::from_millis(150)).await;
        registry.dispatch(&before()).await.unwrap();
        assert!(!stats.disabled.load(Ordering::Relaxed));
    }

    #[test]
    fn hook_stats_tracking() {
        let stats = HookStats::new();
        stats.record_success(Duration::from_millis(10));
        stats.record_success(Duration::from_millis(20));
        stats.record_failure(Duration::from_millis(30));
        assert_eq!(stats.call_count.load(Ordering::Relaxed), 3);
        assert_eq!(stats.failure_count.load(Ordering::Relaxed), 1);
        assert_eq!(stats.consecutive_failures.load(Ordering::Relaxed), 1);
        assert_eq!(stats.avg_latency(), Duration::from_millis(20));
    }

    #[test]
    fn event_names_parse() {
        for event in HookEvent::ALL {
            assert_eq!(event.to_string().parse::<HookEvent>().unwrap(), *event);
        }
        assert!("SessionStart".parse::<HookEvent>().is_err());
    }

    #[test]
    fn read_only_classification() {
        assert!(!HookEvent::BeforeToolCall.is_read_only());
        assert!(HookEvent::AfterToolCall.is_read_only());
        assert!(HookEvent::ToolError.is_read_only());
    }

    #[test]
    fn payload_is_tagged_by_event() {
        let json = serde_json::to_value(after()).unwrap();
        assert_eq!(json["event"], "AfterToolCall");
        assert_eq!(json["tool_name"], "youtube-dl");
        let back: HookPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back.event(), HookEvent::AfterToolCall);
        assert_eq!(back.tool_name(), "youtube-dl");
    }
}
