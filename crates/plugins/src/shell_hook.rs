//! Hook handler that runs a shell command per event.
//!
//! The [`HookPayload`] is written to the command's stdin as JSON. The exit
//! status decides the outcome:
//!
//! - 0 with empty stdout: [`HookAction::Continue`]
//! - 0 with `{"action": "modify", "data": {...}}` on stdout: [`HookAction::ModifyPayload`]
//! - 1: [`HookAction::Block`], stderr is the reason
//! - anything else, or a timeout: error (logged and ignored by the registry)

use std::{collections::HashMap, process::Stdio, time::Duration};

use {
    anyhow::{Context, Result, bail},
    async_trait::async_trait,
    serde::Deserialize,
    serde_json::Value,
    tokio::{io::AsyncWriteExt, process::Command},
    tracing::{debug, warn},
};

use crate::hooks::{HookAction, HookEvent, HookHandler, HookPayload, ShellHookConfig};

#[derive(Debug, Deserialize)]
struct ShellHookResponse {
    action: String,
    #[serde(default)]
    data: Option<Value>,
}

pub struct ShellHookHandler {
    hook_name: String,
    command: String,
    subscribed_events: Vec<HookEvent>,
    timeout: Duration,
    env: HashMap<String, String>,
}

impl ShellHookHandler {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        events: Vec<HookEvent>,
        timeout: Duration,
        env: HashMap<String, String>,
    ) -> Self {
        Self {
            hook_name: name.into(),
            command: command.into(),
            subscribed_events: events,
            timeout,
            env,
        }
    }

    pub fn from_config(config: &ShellHookConfig) -> Self {
        Self::new(
            config.name.clone(),
            config.command.clone(),
            config.events.clone(),
            Duration::from_secs(config.timeout),
            config.env.clone(),
        )
    }

    /// Map a finished command to a hook outcome.
    fn interpret(&self, exit_code: i32, stdout: &str, stderr: &str) -> Result<HookAction> {
        match exit_code {
            0 => {},
            1 => {
                let reason = stderr.trim();
                return Ok(HookAction::Block(if reason.is_empty() {
                    format!("hook '{}' blocked the call", self.hook_name)
                } else {
                    reason.to_string()
                }));
            },
            code => bail!(
                "hook '{}' exited with code {code}: {}",
                self.hook_name,
                stderr.trim()
            ),
        }

        let stdout = stdout.trim();
        if stdout.is_empty() {
            return Ok(HookAction::Continue);
        }

        match serde_json::from_str::<ShellHookResponse>(stdout) {
            Ok(ShellHookResponse {
                action,
                data: Some(data),
            }) if action == "modify" => Ok(HookAction::ModifyPayload(data)),
            Ok(ShellHookResponse { action, data: None }) if action == "modify" => {
                warn!(hook = %self.hook_name, "modify response without data, continuing");
                Ok(HookAction::Continue)
            },
            Ok(_) => Ok(HookAction::Continue),
            Err(e) => {
                warn!(hook = %self.hook_name, error = %e, "hook stdout is not a JSON response, continuing");
                Ok(HookAction::Continue)
            },
        }
    }
}

#[async_trait]
impl HookHandler for ShellHookHandler {
    fn name(&self) -> &str {
        &self.hook_name
    }

    fn events(&self) -> &[HookEvent] {
        &self.subscribed_events
    }

    async fn handle(&self, event: HookEvent, payload: &HookPayload) -> Result<HookAction> {
        let payload_json =
            serde_json::to_vec(payload).context("failed to serialize hook payload")?;

        debug!(
            hook = %self.hook_name,
            %event,
            tool = payload.tool_name(),
            payload_len = payload_json.len(),
            "running shell hook"
        );

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .envs(&self.env)
            .env("REEL_HOOK_EVENT", event.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn hook '{}'", self.hook_name))?;

        // The timeout covers the stdin write too: a command that never reads
        // stdin blocks the write once the payload outgrows the pipe buffer.
        let exchange = async move {
            // The command may exit without reading stdin.
            if let Some(mut stdin) = child.stdin.take()
                && let Err(e) = stdin.write_all(&payload_json).await
                && e.kind() != std::io::ErrorKind::BrokenPipe
            {
                return Err(anyhow::Error::from(e));
            }
            child
                .wait_with_output()
                .await
                .with_context(|| format!("hook '{}' failed to complete", self.hook_name))
        };

        let output = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "hook '{}' timed out after {}s",
                    self.hook_name,
                    self.timeout.as_secs_f32()
                )
            })??;

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(hook = %self.hook_name, exit_code, "shell hook finished");

        self.interpret(exit_code, &stdout, &stderr)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(all(test, unix))]
mod tests {
    use {super::*, serde_json::json};

    fn before_call() -> HookPayload {
        HookPayload::BeforeToolCall {
            session_key: "sess-42".into(),
            tool_name: "youtube-dl".into(),
            arguments: json!({ "url": "https://youtu.be/abc", "audio_only": true }),
        }
    }

    fn handler(command: &str) -> ShellHookHandler {
        ShellHookHandler::new(
            "test",
            command,
            vec![HookEvent::BeforeToolCall],
            Duration::from_secs(5),
            HashMap::new(),
        )
    }

    async fn run(handler: &ShellHookHandler) -> Result<HookAction> {
        handler.handle(HookEvent::BeforeToolCall, &before_call()).await
    }

    #[tokio::test]
    async fn exit_zero_continues() {
        assert!(matches!(run(&handler("exit 0")).await.unwrap(), HookAction::Continue));
    }

    #[tokio::test]
    async fn exit_one_blocks_with_stderr() {
        let action = run(&handler("echo 'quota exceeded' >&2; exit 1"))
            .await
            .unwrap();
        match action {
            HookAction::Block(reason) => assert_eq!(reason, "quota exceeded"),
            other => panic!("expected Block, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exit_one_without_stderr_has_default_reason() {
        match run(&handler("exit 1")).await.unwrap() {
            HookAction::Block(reason) => assert_eq!(reason, "hook 'test' blocked the call"),
            other => panic!("expected Block, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn modify_response_replaces_arguments() {
        let action = run(&handler(
            r#"echo '{"action":"modify","data":{"url":"https://youtu.be/xyz","audio_only":false}}'"#,
        ))
        .await
        .unwrap();
        match action {
            HookAction::ModifyPayload(v) => {
                assert_eq!(v["url"], "https://youtu.be/xyz");
                assert_eq!(v["audio_only"], false);
            },
            other => panic!("expected ModifyPayload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn payload_arrives_on_stdin() {
        // Echo the tool name back out of the JSON payload.
        let action = run(&handler(
            r#"NAME=$(grep -o '"tool_name":"[^"]*"' | cut -d'"' -f4); echo "{\"action\":\"modify\",\"data\":{\"seen\":\"$NAME\"}}""#,
        ))
        .await
        .unwrap();
        match action {
            HookAction::ModifyPayload(v) => assert_eq!(v["seen"], "youtube-dl"),
            other => panic!("expected ModifyPayload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn event_and_env_are_exported() {
        let mut env = HashMap::new();
        env.insert("AUDIT_TAG".into(), "nightly".into());
        let handler = ShellHookHandler::new(
            "env",
            r#"echo "{\"action\":\"modify\",\"data\":{\"tag\":\"$AUDIT_TAG\",\"event\":\"$REEL_HOOK_EVENT\"}}""#,
            vec![HookEvent::BeforeToolCall],
            Duration::from_secs(5),
            env,
        );
        match run(&handler).await.unwrap() {
            HookAction::ModifyPayload(v) => {
                assert_eq!(v["tag"], "nightly");
                assert_eq!(v["event"], "BeforeToolCall");
            },
            other => panic!("expected ModifyPayload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_exit_codes_are_errors() {
        let err = run(&handler("echo broken >&2; exit 3")).await.unwrap_err();
        assert!(err.to_string().contains("exited with code 3: broken"));
    }

    #[tokio::test]
    async fn timeout_is_an_error() {
        let handler = ShellHookHandler::new(
            "slow",
            "sleep 30",
            vec![HookEvent::BeforeToolCall],
            Duration::from_millis(100),
            HashMap::new(),
        );
        let err = run(&handler).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn timeout_covers_unread_stdin() {
        let handler = ShellHookHandler::new(
            "deaf",
            "sleep 30",
            vec![HookEvent::BeforeToolCall],
            Duration::from_millis(200),
            HashMap::new(),
        );
        // Far larger than a pipe buffer, so the write cannot complete.
        let payload = HookPayload::BeforeToolCall {
            session_key: "sess-42".into(),
            tool_name: "youtube-dl".into(),
            arguments: json!({ "url": "x".repeat(1024 * 1024) }),
        };

        let started = std::time::Instant::now();
        let err = handler
            .handle(HookEvent::BeforeToolCall, &payload)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn non_json_stdout_continues() {
        assert!(matches!(
            run(&handler("echo 'download approved'")).await.unwrap(),
            HookAction::Continue
        ));
    }

    #[tokio::test]
    async fn modify_without_data_continues() {
        assert!(matches!(
            run(&handler(r#"echo '{"action":"modify"}'"#)).await.unwrap(),
            HookAction::Continue
        ));
    }

    #[test]
    fn from_config_copies_settings() {
        let config = ShellHookConfig {
            name: "audit".into(),
            command: "./audit.sh".into(),
            events: vec![HookEvent::AfterToolCall, HookEvent::ToolError],
            timeout: 3,
            env: HashMap::new(),
        };
        let handler = ShellHookHandler::from_config(&config);
        assert_eq!(handler.name(), "audit");
        assert_eq!(
            handler.events(),
            &[HookEvent::AfterToolCall, HookEvent::ToolError]
        );
        assert_eq!(handler.timeout, Duration::from_secs(3));
    }
}
