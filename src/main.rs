use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;

use reqflow::domain::model::{Collection, Environment};
use reqflow::{
    parse_flow, validate_flow, DiagnosticLevel, EngineConfig, Flow, FlowFormat, FlowRunner,
    InMemoryRepository, RunStatus,
};

#[derive(Parser)]
#[command(name = "reqflow", about = "Run and validate request flows")]
enum Cli {
    /// Execute a flow and print its timeline
    Run {
        /// Flow document (.json, .yaml, .yml or .toml)
        flow: PathBuf,
        /// JSON file with `collections` and `environments` arrays
        #[arg(long)]
        data: Option<PathBuf>,
        /// Wall-clock limit in seconds (0 = unlimited)
        #[arg(long, default_value_t = 0)]
        timeout: u64,
        /// Node executions per run (0 = unlimited)
        #[arg(long, default_value_t = 0)]
        max_steps: usize,
        /// Print the final snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report structural problems in a flow
    Validate {
        flow: PathBuf,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WorkspaceData {
    collections: Vec<Collection>,
    environments: Vec<Environment>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse() {
        Cli::Run {
            flow,
            data,
            timeout,
            max_steps,
            json,
        } => run(&flow, data.as_deref(), timeout, max_steps, json).await,
        Cli::Validate { flow } => validate(&flow),
    }
}

fn load_flow(path: &Path) -> Result<Flow, Box<dyn Error>> {
    let format = FlowFormat::from_path(path)
        .ok_or_else(|| format!("unsupported flow file extension: {}", path.display()))?;
    let content = std::fs::read_to_string(path)?;
    Ok(parse_flow(&content, format)?)
}

fn load_repository(path: Option<&Path>) -> Result<InMemoryRepository, Box<dyn Error>> {
    let data: WorkspaceData = match path {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => WorkspaceData::default(),
    };
    let repository = InMemoryRepository::new();
    for collection in data.collections {
        repository.insert_collection(collection);
    }
    for environment in data.environments {
        repository.insert_environment(environment);
    }
    Ok(repository)
}

async fn run(
    path: &Path,
    data: Option<&Path>,
    timeout: u64,
    max_steps: usize,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let flow = load_flow(path)?;
    let runner = FlowRunner::builder()
        .repository(Arc::new(load_repository(data)?))
        .config(EngineConfig {
            max_steps,
            max_execution_time_secs: timeout,
            ..EngineConfig::default()
        })
        .build()?;

    let handle = runner.start(&flow)?;
    {
        let tracker = runner.tracker().clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracker.stop();
            }
        });
    }
    let _ = handle.join().await;
    let snapshot = runner.tracker().snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("=== {} ({}) ===", flow.name, flow.id);
        for event in &snapshot.timeline {
            println!("  [{}] {}", event.ts, event.message);
        }
        println!("\n--- flow variables ---");
        let mut vars: Vec<_> = snapshot.context.flow_vars.iter().collect();
        vars.sort_by(|a, b| a.0.cmp(b.0));
        for (k, v) in vars {
            println!("  {} = {}", k, v);
        }
        println!("\n=== {:?} ===", snapshot.status);
        if let Some(error) = &snapshot.error {
            println!("{}", error);
        }
    }

    if snapshot.status == RunStatus::Success {
        Ok(())
    } else {
        std::process::exit(1)
    }
}

fn validate(path: &Path) -> Result<(), Box<dyn Error>> {
    let flow = load_flow(path)?;
    let report = validate_flow(&flow);
    for d in &report.diagnostics {
        let level = match d.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
        };
        let location = d.node_id.as_deref().or(d.edge_id.as_deref()).unwrap_or("-");
        println!("{} {} [{}] {}", level, d.code, location, d.message);
    }
    if report.is_valid {
        println!("[OK] {} nodes, {} edges", flow.nodes.len(), flow.edges.len());
        Ok(())
    } else {
        std::process::exit(1)
    }
}
