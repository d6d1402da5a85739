// crates/hubcli/src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hubcore::{Endpoint, ParamValue, SessionEvent, MASTER_HUB};
use hubmodules::standard_registry;
use hubsession::{LocalSession, SessionConfig, SessionControl};
use hubworkflow::{Script, WorkflowManager};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "hubflow")]
#[command(about = "Capture and replay distributed hub workflows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a workflow script
    Check {
        /// Path to the workflow script
        file: PathBuf,
    },

    /// Replay a workflow script into a local session
    Replay {
        /// Path to the workflow script
        file: PathBuf,

        /// Number of slave hubs to attach while the script runs
        #[arg(long, default_value_t = 0)]
        slaves: usize,

        /// Delay before each slave hub attaches
        #[arg(long, default_value_t = 200)]
        attach_delay_ms: u64,

        /// Give up waiting for slave hubs after this long
        #[arg(long)]
        hub_timeout_ms: Option<u64>,

        /// Save the replayed workflow to this file
        #[arg(long)]
        save: Option<PathBuf>,

        /// Print the resulting snapshot as JSON
        #[arg(long)]
        json: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Create an example workflow spanning a master and a slave hub
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.vsl")]
        output: PathBuf,
    },

    /// List available module types
    Modules,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { file } => {
            check_workflow(file)?;
        }

        Commands::Replay {
            file,
            slaves,
            attach_delay_ms,
            hub_timeout_ms,
            save,
            json,
            verbose,
        } => {
            init_logging(verbose);
            let options = ReplayOptions {
                slaves,
                attach_delay: Duration::from_millis(attach_delay_ms),
                hub_timeout: hub_timeout_ms.map(Duration::from_millis),
                save,
                json,
            };
            replay_workflow(file, options).await?;
        }

        Commands::Init { output } => {
            init_logging(false);
            create_example_workflow(output).await?;
        }

        Commands::Modules => {
            list_modules();
        }
    }

    Ok(())
}

fn check_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Checking workflow: {}", file.display());

    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("reading {}", file.display()))?;
    let script = Script::parse(&text)?;
    let summary = script.validate()?;

    println!("✅ Workflow is valid:");
    println!("   Statements: {}", script.len());
    println!("   Local modules: {}", summary.local_spawns);
    println!("   Remote modules: {}", summary.remote_spawns);
    println!("   Slave hubs: {}", summary.slave_hubs);
    println!("   Parameters: {}", summary.parameter_sets);
    println!("   Connections: {}", summary.connections);

    Ok(())
}

struct ReplayOptions {
    slaves: usize,
    attach_delay: Duration,
    hub_timeout: Option<Duration>,
    save: Option<PathBuf>,
    json: bool,
}

async fn replay_workflow(file: PathBuf, options: ReplayOptions) -> Result<()> {
    println!("🚀 Replaying workflow from: {}", file.display());

    let mut config = SessionConfig::from_env();
    if let Some(timeout) = options.hub_timeout {
        config = config.with_hub_wait_timeout(timeout);
    }
    let session = Arc::new(LocalSession::new(config, Arc::new(standard_registry())));

    // Subscribe to events for real-time output
    let mut events = session.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::HubAttached { hub, role, .. } => {
                    println!("  🔌 {} hub {} attached", role, hub);
                }
                SessionEvent::ModuleSpawned {
                    module,
                    type_name,
                    hub,
                    ..
                } => {
                    println!("  ⚡ Spawned {} ({}) on hub {}", module, type_name, hub);
                }
                SessionEvent::SpawnFailed {
                    type_name,
                    hub,
                    error,
                    ..
                } => {
                    println!("  ❌ Spawning {} on hub {} failed: {}", type_name, hub, error);
                }
                SessionEvent::ModuleKilled { module, .. } => {
                    println!("  🗑️  Killed {}", module);
                }
                SessionEvent::Barrier { .. } => {
                    println!("  ⏸️  Barrier");
                }
                _ => {}
            }
        }
    });

    // Slaves show up while the script is already running
    let attacher = session.clone();
    let slaves = options.slaves;
    let attach_delay = options.attach_delay;
    let attach_task = tokio::spawn(async move {
        for _ in 0..slaves {
            tokio::time::sleep(attach_delay).await;
            attacher.attach_slave(Arc::new(standard_registry())).await;
        }
    });

    let mut manager = WorkflowManager::new(session.clone());
    let result = manager.load(Some(file.as_path())).await;
    attach_task.await?;

    // Wait for events to finish printing
    tokio::time::sleep(Duration::from_millis(100)).await;
    event_task.abort();

    let report = result.with_context(|| format!("replaying {}", file.display()))?;
    let snapshot = manager.capture().await?;

    println!();
    if options.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("📊 Replay Summary:");
        println!("   Modules: {}", report.modules.len());
        println!("   Parameters: {}", report.parameters);
        println!("   Connections: {}", report.connections);
        println!("   Slave hubs: {:?}", report.slave_hubs);
        println!();
        print!("{}", snapshot);
    }

    if let Some(output) = options.save {
        let saved = manager.save(Some(output.as_path())).await?;
        println!();
        println!("💾 Saved workflow to {}", saved.display());
    }

    Ok(())
}

fn list_modules() {
    println!("📦 Available Module Types:");
    println!();

    let registry = standard_registry();

    for type_name in registry.list_module_types() {
        if let Some(metadata) = registry.get_metadata(&type_name) {
            println!("  • {} ({})", type_name, metadata.category);
            println!("    {}", metadata.description);
        } else {
            println!("  • {}", type_name);
        }
    }
}

async fn create_example_workflow(output: PathBuf) -> Result<()> {
    let session = Arc::new(LocalSession::new(
        SessionConfig::default(),
        Arc::new(standard_registry()),
    ));

    let reader = session.spawn(MASTER_HUB, "Reader").await?;
    let iso = session.spawn(MASTER_HUB, "IsoSurface").await?;
    let slave = session.attach_slave(Arc::new(standard_registry())).await;
    let renderer = session.spawn(slave, "Renderer").await?;

    session
        .set_parameter(reader, "filename", ParamValue::from("data/example.vtk"), true)
        .await?;
    session.apply_parameters(reader).await?;
    session
        .set_parameter(iso, "isovalue", ParamValue::Float(0.5), false)
        .await?;

    session
        .connect(&Endpoint::new(reader, "data_out"), &Endpoint::new(iso, "data_in"))
        .await?;
    session
        .connect(&Endpoint::new(iso, "data_out"), &Endpoint::new(renderer, "data_in"))
        .await?;

    let mut manager = WorkflowManager::new(session);
    let saved = manager.save(Some(output.as_path())).await?;

    println!("✨ Created example workflow: {}", saved.display());
    println!();
    println!("Replay it with:");
    println!("  hubflow replay {} --slaves 1", saved.display());

    Ok(())
}
