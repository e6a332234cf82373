//! widget-sync: drive one widget refresh from the command line.
//!
//! Usage: `widget-sync [refresh|force|clear|show] [--config PATH] [--records PATH]`
//!
//! `refresh` honours the 30-minute window, picking it up from the snapshot
//! the previous run published; `force` bypasses it. `clear` publishes the
//! signed-out snapshot and `show` prints what the widget currently reads.
//! Results go to stdout as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use serde_json::json;

use esim_widget_sync::config::{config_path, load_config_from};
use esim_widget_sync::platform::select_bridge;
use esim_widget_sync::{
    JsonFileSource, RefreshController, SystemClock, WidgetPlatform, WidgetSyncConfig,
    REFRESH_INTERVAL_MINUTES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Refresh,
    Force,
    Clear,
    Show,
}

#[derive(Debug)]
struct Args {
    command: Command,
    config: Option<PathBuf>,
    records: Option<PathBuf>,
}

fn parse_args(mut argv: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut args = Args {
        command: Command::Refresh,
        config: None,
        records: None,
    };
    let mut command_seen = false;

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--config" => {
                let path = argv.next().ok_or_else(|| anyhow!("--config needs a path"))?;
                args.config = Some(PathBuf::from(path));
            }
            "--records" => {
                let path = argv.next().ok_or_else(|| anyhow!("--records needs a path"))?;
                args.records = Some(PathBuf::from(path));
            }
            other if !command_seen => {
                args.command = match other {
                    "refresh" => Command::Refresh,
                    "force" => Command::Force,
                    "clear" => Command::Clear,
                    "show" => Command::Show,
                    _ => bail!("unknown command '{}'", other),
                };
                command_seen = true;
            }
            other => bail!("unexpected argument '{}'", other),
        }
    }
    Ok(args)
}

fn default_records_path() -> anyhow::Result<PathBuf> {
    let config = config_path()?;
    let dir = config
        .parent()
        .ok_or_else(|| anyhow!("config path has no parent"))?;
    Ok(dir.join("subscriptions.json"))
}

/// Refresh only when the window carried over from the last run has elapsed.
async fn refresh_if_due(controller: &RefreshController) -> anyhow::Result<serde_json::Value> {
    if !controller.should_refresh() {
        log::info!(
            "Widget refresh: last refresh at {}, inside the {}-minute window",
            controller.last_update_time(),
            REFRESH_INTERVAL_MINUTES
        );
        return Ok(json!({
            "kind": "throttled",
            "lastUpdated": controller.last_update_time(),
        }));
    }
    Ok(serde_json::to_value(controller.refresh().await?)?)
}

fn build_controller(config: &WidgetSyncConfig, records: PathBuf) -> RefreshController {
    let clock = Arc::new(SystemClock);
    let bridge = select_bridge(config, None, clock.clone());
    RefreshController::new(Arc::new(JsonFileSource::new(records)), bridge, clock)
        .with_app_version(config.app_version.clone())
        .resume_from_bridge()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = parse_args(std::env::args().skip(1))?;
    let config_file = match args.config {
        Some(path) => path,
        None => config_path()?,
    };
    let config = load_config_from(&config_file)
        .map_err(|e| anyhow!("Failed to load widget config: {e}"))?;
    let records = match args.records {
        Some(path) => path,
        None => default_records_path()?,
    };
    let controller = build_controller(&config, records);

    let output = match args.command {
        Command::Refresh => refresh_if_due(&controller).await?,
        Command::Force => serde_json::to_value(controller.force_refresh().await?)?,
        Command::Clear => serde_json::to_value(controller.clear().await?)?,
        Command::Show => serde_json::to_value(controller.bridge().read_current()?)?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
