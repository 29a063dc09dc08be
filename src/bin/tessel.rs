use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tessel_wm::actor::window_manager::WindowManager;
use tessel_wm::common::config::{Config, config_file};
use tessel_wm::common::log;
use tessel_wm::model::{ScreenSet, find_matching_screen_set};
use tessel_wm::sys::backend::WindowId;
use tessel_wm::sys::geometry::Bounds;
use tessel_wm::sys::snapshot::{Snapshot, SnapshotBackend};

#[derive(Parser)]
#[command(about = "Declarative tiling layouts for a launcher's window manager")]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the configuration file and report every issue found.
    Validate,
    /// Run one reconciliation pass against a recorded desktop and print
    /// where every window would go.
    Plan {
        /// JSON dump of monitors, windows and the focused application.
        #[arg(long, value_name = "FILE")]
        snapshot: PathBuf,
        /// Named layout to apply instead of the first one matching the
        /// snapshot's monitors.
        #[arg(long)]
        layout: Option<String>,
    },
    /// List the configured layouts.
    Layouts {
        /// Mark which layouts match the monitors in this snapshot.
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct PlannedWindow {
    id: WindowId,
    application: String,
    title: String,
    bounds: Bounds,
    moved: bool,
}

fn main() {
    let opt = Cli::parse();
    log::init_logging();

    let code = match run(opt) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            1
        }
    };
    process::exit(code);
}

fn run(opt: Cli) -> anyhow::Result<i32> {
    let config_path = opt.config.clone().unwrap_or_else(config_file);
    match opt.command {
        Commands::Validate => {
            let config = Config::read(&config_path)?;
            let issues = config.validate();
            if issues.is_empty() {
                println!("Config validation passed");
                return Ok(0);
            }
            for issue in issues {
                eprintln!("{issue}");
            }
            Ok(1)
        }
        Commands::Plan { snapshot, layout } => {
            let config = load_config(&config_path)?;
            plan(&config, &snapshot, layout.as_deref())?;
            Ok(0)
        }
        Commands::Layouts { snapshot } => {
            let config = load_config(&config_path)?;
            let monitors = match &snapshot {
                Some(path) => Some(Snapshot::read(path)?.monitors),
                None => None,
            };
            for (name, set) in &config.layouts {
                let default = config.settings.default_layout.as_deref() == Some(name.as_str());
                let marker = if default { "*" } else { " " };
                let keys: Vec<String> = set.iter().map(|(key, _)| key.to_string()).collect();
                match &monitors {
                    Some(monitors) => {
                        let fits = if set.matches(monitors) { "matches" } else { "missing screens" };
                        println!("{marker} {name} [{}] {fits}", keys.join(", "));
                    }
                    None => println!("{marker} {name} [{}]", keys.join(", ")),
                }
            }
            Ok(0)
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if path.exists() { Config::read(path) } else { Ok(Config::default()) }
}

fn pick_layout(config: &Config, snapshot: &Snapshot, name: Option<&str>) -> anyhow::Result<Option<ScreenSet>> {
    if let Some(name) = name {
        let Some(set) = config.layouts.get(name) else {
            bail!("no layout named `{name}`");
        };
        return Ok(Some(set.clone()));
    }
    if let Some(set) = config.default_layout()
        && set.matches(&snapshot.monitors)
    {
        return Ok(Some(set.clone()));
    }
    Ok(find_matching_screen_set(config.layouts.values(), &snapshot.monitors).cloned())
}

fn plan(config: &Config, snapshot_path: &Path, layout: Option<&str>) -> anyhow::Result<()> {
    let snapshot = Snapshot::read(snapshot_path)?;
    let screen_set = pick_layout(config, &snapshot, layout)?;
    let before = snapshot.windows.clone();
    let backend = Arc::new(SnapshotBackend::new(snapshot));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("building runtime")?;

    runtime.block_on(async {
        let wm = WindowManager::new(backend.clone(), config);
        wm.refresh().await?;
        if let Some(set) = screen_set {
            wm.set_layout(set);
        } else {
            wm.reconcile();
        }
        wm.flush_pending().await;
        wm.stop();
        anyhow::Ok(())
    })?;

    let planned: Vec<PlannedWindow> = backend
        .windows()
        .into_iter()
        .map(|window| PlannedWindow {
            moved: before.iter().any(|w| w.id == window.id && w.bounds != window.bounds),
            id: window.id,
            application: window.application,
            title: window.title,
            bounds: window.bounds,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&planned)?);
    Ok(())
}
