// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use edge_processor::bus::LocalBus;
use edge_processor::config::{load_and_validate_config, ServiceConfig};
use edge_processor::errors::ProcessorError;
use edge_processor::message::msg_pack;
use edge_processor::runtime::{Client, EventDrivenProcessor, Processor};

/// Event-driven message processor for the edge agent
#[derive(Parser)]
#[command(name = "edge-processor")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Host the service until Ctrl-C
    Run {
        /// Service configuration (YAML, or TOML by extension)
        config: PathBuf,
    },
    /// Host the service in-process, send one request and print the reply
    Call {
        config: PathBuf,

        #[arg(long)]
        handler: String,

        #[arg(long)]
        workflow: Option<String>,

        /// Reply timeout in seconds; defaults to the configured client timeout
        #[arg(long)]
        timeout: Option<f64>,

        /// Positional arguments; JSON if they parse, strings otherwise
        #[arg(long = "arg")]
        args: Vec<String>,

        /// Keyword arguments as key=value
        kwargs: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let config = load(&config)?;
            init_logging(&config);
            run(config).await
        }
        Commands::Call {
            config,
            handler,
            workflow,
            timeout,
            args,
            kwargs,
        } => {
            let config = load(&config)?;
            init_logging(&config);
            let reply = call(config, handler, workflow, timeout, args, kwargs).await?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
            Ok(())
        }
    }
}

fn load(path: &Path) -> Result<ServiceConfig> {
    load_and_validate_config(path)
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("loading {}", path.display()))
}

fn init_logging(config: &ServiceConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Demo handlers every hosted service gets.
fn register_demo_handlers(processor: &Processor) {
    let hooks = processor.hooks();
    hooks.register_handler("echo", |call| Ok(Value::Object(call.kwargs().clone())));
    hooks.register_handler("ping", |_| Ok(json!("pong")));
    hooks.register_handler("sleep", |call| {
        let seconds = call
            .kwarg("seconds")
            .or_else(|| call.arg(0))
            .and_then(Value::as_f64)
            .unwrap_or(1.0);
        let nap = Duration::try_from_secs_f64(seconds)
            .map_err(|e| ProcessorError::handler(format!("invalid sleep duration: {}", e)))?;
        std::thread::sleep(nap);
        Ok(json!({ "slept": seconds }))
    });
}

fn start_service(config: &ServiceConfig, bus: &LocalBus) -> Result<Arc<EventDrivenProcessor>> {
    let processor = Processor::new();
    register_demo_handlers(&processor);

    let service = EventDrivenProcessor::new(&config.namespace, processor, Arc::new(bus.clone()))
        .with_poll_interval(config.bus.poll_interval());
    service
        .init(&config.workers, &config.reactors)
        .context("initializing service")?;
    Ok(Arc::new(service))
}

async fn run(config: ServiceConfig) -> Result<()> {
    let bus = LocalBus::new();
    let service = start_service(&config, &bus)?;
    info!(namespace = %config.namespace, workers = config.workers.len(), "Hosting service");

    let runner = Arc::clone(&service);
    let loop_task = tokio::task::spawn_blocking(move || runner.run());

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    let killed = service.close();
    info!(killed = killed.len(), "Shutting down");

    loop_task.await.context("event loop panicked")??;
    Ok(())
}

async fn call(
    config: ServiceConfig,
    handler: String,
    workflow: Option<String>,
    timeout: Option<f64>,
    args: Vec<String>,
    kwargs: Vec<String>,
) -> Result<Value> {
    let mut routed = vec![("_handler".to_string(), json!(handler))];
    if let Some(workflow) = workflow {
        routed.push(("_workflow".to_string(), json!(workflow)));
    }
    for pair in &kwargs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected key=value, got '{}'", pair))?;
        routed.push((key.to_string(), parse_value(value)));
    }
    let message = msg_pack(args.iter().map(|arg| parse_value(arg)), routed);

    let timeout = match timeout {
        Some(seconds) => Duration::try_from_secs_f64(seconds).context("invalid --timeout")?,
        None => config.client.timeout(),
    };

    let bus = LocalBus::new();
    let service = start_service(&config, &bus)?;
    let runner = Arc::clone(&service);
    let loop_task = tokio::task::spawn_blocking(move || runner.run());

    let client = Client::connect(&config.namespace, Arc::new(bus)).context("connecting client")?;
    let reply = tokio::task::spawn_blocking(move || client.send_sync(&message, timeout))
        .await
        .context("client panicked")?;

    service.close();
    loop_task.await.context("event loop panicked")??;
    Ok(reply?)
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
