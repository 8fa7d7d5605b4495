use std::path::PathBuf;
use std::sync::Arc;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use socialai_common::models::{ActivityEntry, ActivitySource, InboundEvent, Platform};
use socialai_core::eventbus::OrchestratorEvent;
use socialai_core::settings::JsonFileSettingsStore;
use socialai_core::sources::ScriptedEventSource;
use socialai_core::{Orchestrator, OrchestratorConfig};

mod console;
mod simulated;

use simulated::SimulatedTransport;

#[derive(Parser, Debug, Clone)]
#[command(name = "socialai")]
#[command(author, version, about = "SocialAI - automation assistant for WhatsApp and Instagram accounts")]
struct Args {
    /// Where the feature toggles are stored. Defaults to the user config dir.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Optional JSON file overriding timeouts, contact pool, rules, ...
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fixed seed for reply and contact selection.
    #[arg(long)]
    seed: Option<u64>,

    /// Platforms to link on startup (repeatable).
    #[arg(long, value_name = "PLATFORM")]
    connect: Vec<Platform>,

    /// Run a short scripted session instead of the interactive console.
    #[arg(long, default_value_t = false)]
    demo: bool,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("socialai=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).with_writer(std::io::stderr).finish();
    if let Err(e) = tracing::subscriber::set_global_default(sub) {
        eprintln!("Failed to set global subscriber: {}", e);
    }
}

fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("socialai")
        .join("settings.json")
}

pub(crate) fn render_entry(entry: &ActivityEntry) -> String {
    let source = match entry.source {
        ActivitySource::User => "you",
        ActivitySource::Automation => "auto",
        ActivitySource::System => "system",
    };
    format!(
        "{} [{:>6}] {}",
        entry.timestamp.with_timezone(&chrono::Local).format("%H:%M:%S"),
        source,
        entry.text
    )
}

/// Prints every activity entry and notice as it is published.
fn spawn_printer(orch: &Orchestrator) -> tokio::task::JoinHandle<()> {
    let mut rx = orch.subscribe();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                OrchestratorEvent::Activity(entry) => println!("{}", render_entry(&entry)),
                OrchestratorEvent::Notice { message } => println!("! {}", message),
                other => tracing::debug!("presentation event: {}", other.event_type()),
            }
        }
    })
}

async fn build_orchestrator(args: &Args) -> anyhow::Result<Arc<Orchestrator>> {
    let mut config = match &args.config {
        Some(path) => OrchestratorConfig::from_json_file(path).await?,
        None => OrchestratorConfig::default(),
    };
    if args.seed.is_some() {
        config.rng_seed = args.seed;
    }

    let settings_path = args.settings.clone().unwrap_or_else(default_settings_path);
    info!("settings file: {}", settings_path.display());

    let orch = Orchestrator::builder(Arc::new(SimulatedTransport::new()))
        .settings(Arc::new(JsonFileSettingsStore::new(settings_path)))
        .config(config)
        .build();
    Ok(Arc::new(orch))
}

async fn run_demo(orch: Arc<Orchestrator>) -> anyhow::Result<()> {
    for platform in Platform::ALL {
        if let Err(e) = orch.connect(platform).await {
            warn!("[{}] demo connect failed: {}", platform, e);
        }
    }

    let source = ScriptedEventSource::new(vec![
        InboundEvent::group(Platform::WhatsApp, "Family Chat", "Mom", "When are you coming home?"),
        InboundEvent::PostCreated { platform: Platform::Instagram, post_id: Some("demo-post".into()) },
        InboundEvent::direct("Hi! Can you recover deleted messages?"),
        InboundEvent::direct("What are you doing with my status updates?"),
    ]);
    let handled = orch.spawn_pump(source).await??;
    info!("demo handled {} events", handled);

    // leave the status viewer a couple of periods
    tokio::time::sleep(orch.config().status_view_interval() * 2).await;
    orch.flush_all().await?;

    if let Err(e) = orch.save_settings().await {
        error!("demo could not save settings: {}", e);
    }
    for platform in Platform::ALL {
        orch.disconnect(platform).await;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    info!("SocialAI starting. demo={}, connect={:?}", args.demo, args.connect);

    let orch = build_orchestrator(&args).await?;
    let printer = spawn_printer(&orch);

    if let Err(e) = orch.load_settings().await {
        warn!("continuing with default feature settings: {}", e);
    }
    for platform in &args.connect {
        if let Err(e) = orch.connect(*platform).await {
            error!("[{}] could not connect: {}", platform, e);
        }
    }

    let result = if args.demo {
        run_demo(orch.clone()).await
    } else {
        console::run(orch.clone()).await
    };

    orch.shutdown();
    let _ = printer.await;
    info!("SocialAI stopped");
    result
}
