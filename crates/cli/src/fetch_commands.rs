use std::sync::Arc;

use {
    anyhow::Result,
    clap::Args,
    reel_agents::ToolRegistry,
    reel_config::ReelConfig,
    reel_metrics::{MetricsHandle, MetricsRecorderConfig},
    reel_tools::{TOOL_NAME, YoutubeDlTool},
    serde_json::{Map, Value, json},
    tracing::debug,
};

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Video URL or local file path.
    pub source: String,
    /// Download the full video.
    #[arg(long, conflicts_with = "audio")]
    pub video: bool,
    /// Download audio only.
    #[arg(long)]
    pub audio: bool,
    /// File name to store the download under.
    #[arg(long)]
    pub output_filename: Option<String>,
    /// Re-download even if the file already exists.
    #[arg(long)]
    pub no_cache: bool,
    /// Capture a frame at this position (HH:MM:SS, MM:SS or seconds).
    #[arg(long, value_name = "TIMESTAMP")]
    pub screenshot_at: Option<String>,
    /// Output directory (overrides config).
    #[arg(long)]
    pub output_dir: Option<String>,
    /// Print the metrics snapshot to stderr afterwards.
    #[arg(long)]
    pub print_metrics: bool,
}

impl FetchArgs {
    /// Tool parameters for this invocation. Unset flags are omitted so the
    /// tool's own defaults apply.
    pub fn to_params(&self) -> Value {
        let mut params = Map::new();
        params.insert("url".into(), json!(self.source));
        if self.video {
            params.insert("audio_only".into(), json!(false));
        } else if self.audio {
            params.insert("audio_only".into(), json!(true));
        }
        if let Some(name) = &self.output_filename {
            params.insert("output_filename".into(), json!(name));
        }
        if self.no_cache {
            params.insert("use_cache".into(), json!(false));
        }
        if let Some(ts) = &self.screenshot_at {
            params.insert("capture_screenshot".into(), json!(true));
            params.insert("screenshot_time".into(), json!(ts));
        }
        params.insert("_session_key".into(), json!("cli"));
        Value::Object(params)
    }
}

/// Build the registry of tools available from the command line.
pub fn build_tools(config: &ReelConfig) -> Result<ToolRegistry> {
    let hooks = Arc::new(reel_plugins::build_registry(config.hooks.as_ref()));
    let tool = YoutubeDlTool::from_config(config)?.with_hooks(hooks);

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(tool));
    Ok(registry)
}

/// Registry for listing tool schemas. Nothing is created on disk.
fn describe_tools(config: &ReelConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(YoutubeDlTool::describe(config)));
    registry
}

fn init_metrics(config: &ReelConfig) -> Result<MetricsHandle> {
    reel_metrics::init_metrics(MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        global_labels: config
            .metrics
            .labels
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    })
}

pub async fn handle_fetch(args: FetchArgs, mut config: ReelConfig) -> Result<()> {
    if let Some(dir) = &args.output_dir {
        config.youtube_dl.output_dir = dir.clone();
    }
    if args.print_metrics {
        config.metrics.enabled = true;
    }
    let metrics = init_metrics(&config)?;

    let tools = build_tools(&config)?;
    let params = args.to_params();
    debug!(%params, "invoking tool");

    let outcome = tools.call(TOOL_NAME, params).await;

    if args.print_metrics {
        eprintln!("{}", metrics.render());
    }

    let result = outcome?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub fn handle_tools(config: &ReelConfig, as_json: bool) -> Result<()> {
    let tools = describe_tools(config);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&tools.list_schemas())?);
        return Ok(());
    }
    for schema in tools.list_schemas() {
        let name = schema["name"].as_str().unwrap_or_default();
        let description = schema["description"].as_str().unwrap_or_default();
        println!("{name}\n  {description}");
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, clap::Parser};

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        fetch: FetchArgs,
    }

    fn parse(args: &[&str]) -> FetchArgs {
        TestCli::try_parse_from(std::iter::once("reel").chain(args.iter().copied()))
            .unwrap()
            .fetch
    }

    #[test]
    fn minimal_params_leave_defaults_to_tool() {
        let params = parse(&["https://youtu.be/abc"]).to_params();
        assert_eq!(
            params,
            json!({"url": "https://youtu.be/abc", "_session_key": "cli"})
        );
    }

    #[test]
    fn flags_map_to_params() {
        let params = parse(&[
            "https://youtu.be/abc",
            "--video",
            "--output-filename",
            "talk.mp4",
            "--no-cache",
            "--screenshot-at",
            "00:01:00",
        ])
        .to_params();
        assert_eq!(params["audio_only"], false);
        assert_eq!(params["output_filename"], "talk.mp4");
        assert_eq!(params["use_cache"], false);
        assert_eq!(params["capture_screenshot"], true);
        assert_eq!(params["screenshot_time"], "00:01:00");
    }

    #[test]
    fn audio_and_video_conflict() {
        let parsed = TestCli::try_parse_from(["reel", "x", "--audio", "--video"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn tools_registry_has_youtube_dl() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ReelConfig::default();
        config.youtube_dl.output_dir = dir.path().join("out").display().to_string();

        let tools = build_tools(&config).unwrap();
        assert_eq!(tools.tool_names(), vec!["youtube-dl"]);
        assert!(dir.path().join("out").is_dir());
    }

    #[test]
    fn listing_tools_does_not_create_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ReelConfig::default();
        config.youtube_dl.output_dir = dir.path().join("out").display().to_string();

        assert_eq!(describe_tools(&config).tool_names(), vec!["youtube-dl"]);
        handle_tools(&config, true).unwrap();
        assert!(!dir.path().join("out").exists());
    }
}
