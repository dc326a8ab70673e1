use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info, warn};

mod catalog;
mod convert;
mod engine;
mod env;
mod i18n;
mod networking;
mod storage;
mod ui;
mod util;

use crate::catalog::Catalog;
use crate::convert::{
    ConversionBackend, Converter, RetryPolicy, ScriptQueueBackend, SimulatedBackend,
};
use crate::engine::models::ConversionMode;
use crate::engine::state::AppListKind;
use crate::engine::{AppManager, ManagerEngine};
use crate::i18n::Language;
use crate::networking::{NetworkClient, WebrootSource};
use crate::storage::StorageManager;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// Random latency and occasional failure; nothing leaves the process.
    Simulated,
    /// Append hand-off records to the host script's queue file.
    Script,
}

#[derive(Parser, Debug)]
#[command(
    name = "OukaroManager",
    author,
    version,
    about = "Convert user apps into system or priv-app apps via a privileged host script"
)]
struct Cli {
    /// Print manager version and exit without starting the UI.
    #[arg(long)]
    version_only: bool,

    /// Directory or http(s) URL holding applist.json, systemlist.json and locales/.
    #[arg(long)]
    webroot: Option<String>,

    /// Where local storage and the conversion queue live.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Force the UI language (en, zh).
    #[arg(long)]
    language: Option<String>,

    #[arg(long, value_enum, default_value_t = BackendKind::Simulated)]
    backend: BackendKind,

    /// Attempts per app for the script backend.
    #[arg(long, default_value_t = 3)]
    retries: u32,

    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Seed for the simulated backend.
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the user, system or converted app list.
    List {
        #[arg(long, value_enum, default_value_t = ListKind::User)]
        kind: ListKind,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Convert the given packages.
    Convert {
        #[arg(required = true)]
        packages: Vec<String>,
        #[arg(long, default_value = "system", value_parser = parse_mode)]
        mode: ConversionMode,
    },
    /// Revert converted packages back to user apps.
    Revert {
        packages: Vec<String>,
        #[arg(long, conflicts_with = "packages")]
        all: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ListKind {
    User,
    System,
    Converted,
}

fn parse_mode(value: &str) -> Result<ConversionMode, String> {
    ConversionMode::parse(value).ok_or_else(|| format!("unknown conversion mode `{value}`"))
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.version_only {
        println!("OukaroManager {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let language = cli.language.as_deref().and_then(|code| {
        let parsed = Language::from_code(code);
        if parsed.is_none() {
            warn!("ignoring unsupported --language {code}");
        }
        parsed
    });
    let engine = build_engine(&cli);

    if let Some(command) = cli.command {
        if let Err(err) = run_headless(engine, command, language) {
            error!("{err}");
            std::process::exit(1);
        }
        return Ok(());
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_title("OukaroManager")
            .with_inner_size(eframe::egui::vec2(1100.0, 760.0)),
        ..Default::default()
    };
    eframe::run_native(
        "OukaroManager",
        options,
        Box::new(move |cc| Ok(Box::new(ui::ManagerApp::new(cc, engine, language)))),
    )
}

fn build_engine(cli: &Cli) -> ManagerEngine {
    let data_dir = cli.data_dir.clone().unwrap_or_else(env::default_app_dir);
    let webroot = WebrootSource::parse(
        cli.webroot
            .as_deref()
            .unwrap_or(&env::default_webroot()),
    );
    info!(
        "webroot {}, data dir {}",
        webroot.describe(),
        data_dir.display()
    );

    let timeout = Duration::from_secs(cli.timeout_secs.max(1));
    let converter = match cli.backend {
        BackendKind::Simulated => {
            let backend = match cli.seed {
                Some(seed) => SimulatedBackend::new(0.9, 500..1500, Some(seed)),
                None => SimulatedBackend::default(),
            };
            Converter::new(
                ConversionBackend::Simulated(backend),
                RetryPolicy::single(timeout),
            )
        }
        BackendKind::Script => Converter::new(
            ConversionBackend::ScriptQueue(ScriptQueueBackend::new(
                env::conversion_queue_file(&data_dir),
            )),
            RetryPolicy {
                attempts: cli.retries.max(1),
                timeout,
                ..RetryPolicy::default()
            },
        ),
    };

    let storage = StorageManager::new(&data_dir);
    info!("local storage at {}", storage.path().display());
    ManagerEngine::new(Catalog::new(NetworkClient::new(webroot)), storage, converter)
}

fn run_headless(
    engine: ManagerEngine,
    command: Command,
    language: Option<Language>,
) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to create runtime: {e}"))?;
    runtime.block_on(async move {
        let mut manager = AppManager::new(engine);
        manager.start().await;
        if let Some(language) = language {
            manager.set_language(language.code()).await;
        }
        match command {
            Command::List { kind, search } => print_list(&manager, kind, &search),
            Command::Convert { packages, mode } => {
                for package in &packages {
                    let known = manager
                        .model()
                        .user_apps
                        .iter()
                        .any(|app| &app.package_name == package);
                    if !known {
                        warn!("{package} is not a known user app; skipping");
                        continue;
                    }
                    manager.toggle_selection(package, true).await;
                }
                let Some(summary) = manager.convert_selected(mode).await else {
                    return Err("no known user apps selected".into());
                };
                println!(
                    "converted {} app(s) to {}",
                    summary.succeeded,
                    mode.target_dir()
                );
                for err in &summary.errors {
                    println!("failed: {err}");
                }
                info!(
                    "converted apps saved to {}",
                    manager.storage().path().display()
                );
                if summary.succeeded == 0 {
                    return Err("no app was converted".into());
                }
                Ok(())
            }
            Command::Revert { packages, all } => {
                if all {
                    let count = manager.revert_all().await;
                    println!("reverted {count} app(s)");
                    return Ok(());
                }
                for package in &packages {
                    if manager.revert_single(package).await {
                        println!("reverted {package}");
                    } else {
                        warn!("{package} is not a converted app");
                    }
                }
                Ok(())
            }
        }
    })
}

fn print_list(manager: &AppManager, kind: ListKind, search: &str) -> Result<(), String> {
    let model = manager.model();
    let unknown = "-".to_owned();
    match kind {
        ListKind::User | ListKind::System => {
            let list = if kind == ListKind::User {
                AppListKind::User
            } else {
                AppListKind::System
            };
            for app in model.filter(list, search) {
                println!(
                    "{}\t{}\t{}\t{}",
                    app.package_name,
                    app.name,
                    app.version.as_ref().unwrap_or(&unknown),
                    app.size.as_ref().unwrap_or(&unknown)
                );
            }
        }
        ListKind::Converted => {
            for record in &model.converted_apps {
                println!(
                    "{}\t{}\t{}\t{}",
                    record.package_name(),
                    record.name(),
                    record.conversion_mode.as_str(),
                    record.converted_at.to_rfc3339()
                );
            }
        }
    }
    Ok(())
}
