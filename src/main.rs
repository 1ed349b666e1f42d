// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use labop_engine::config::consts::DEFAULT_AGENT;
use labop_engine::config::{load_and_validate_config, EngineConfig, RuntimeBuilder};
use labop_engine::demos::{self, Demo};
use labop_engine::engine::ExecutionRequest;
use labop_engine::graph::{inline_subprotocols, validate_graph, ActivityGraph, Value};
use labop_engine::observability::messages::validation::ConfigLoaded;
use labop_engine::observability::messages::StructuredLog;
use labop_engine::primitives::PrimitiveRegistry;
use labop_engine::record::TimeMode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "labop-engine", version, about = "Execute laboratory protocols")]
struct Cli {
    /// Engine configuration (YAML); built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a built-in protocol and print its execution record as JSON
    Run {
        protocol: String,
        #[arg(long)]
        execution_id: Option<String>,
        #[arg(long, default_value = DEFAULT_AGENT)]
        agent: String,
        /// Protocol parameter as `name=value`; `100uL` and `600nm` are quantities
        #[arg(short = 'p', long = "param", value_parser = parse_parameter)]
        parameters: Vec<(String, Value)>,
        /// Force ordinal timestamps regardless of the configuration
        #[arg(long)]
        ordinal: bool,
        /// Keep independent branches running after a failure
        #[arg(long)]
        failsafe: bool,
        /// Print the artifact of this specialization instead of the record
        #[arg(long)]
        artifact: Option<String>,
    },
    /// Check a built-in protocol, optionally after flattening its sub-protocol calls
    Validate {
        protocol: String,
        #[arg(long)]
        inline: bool,
    },
    /// Print a built-in protocol with every sub-protocol call expanded
    Inline { protocol: String },
    /// List the standard primitive library as JSON
    Primitives,
    /// List the built-in protocols
    Demos,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => load_and_validate_config(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };

    // RUST_LOG wins over the configured filter; logs go to stderr so stdout stays JSON
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.logging.get_filter()))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    if let Some(path) = &cli.config {
        ConfigLoaded {
            path: &path.display().to_string(),
            specializations: config.specializations.len(),
        }
        .log();
    }

    let registry = Arc::new(PrimitiveRegistry::standard());

    match cli.command {
        Command::Run {
            protocol,
            execution_id,
            agent,
            parameters,
            ordinal,
            failsafe,
            artifact,
        } => {
            if ordinal {
                config.time_mode = TimeMode::OrdinalTime;
            }
            config.failsafe |= failsafe;
            let graph = Arc::new(build_demo(&protocol, &registry)?);
            let executor = RuntimeBuilder::from_config(&config, Arc::clone(&registry))?;

            let mut request = ExecutionRequest::new(
                execution_id.unwrap_or_else(|| format!("{}-run", protocol)),
                agent,
            );
            for (name, value) in parameters {
                request = request.with_parameter(name, value);
            }

            let (record, failure) = match executor.execute(graph, request).await {
                Ok(record) => (record, None),
                Err(failure) => (failure.record, Some(failure.error)),
            };
            match artifact {
                Some(name) => {
                    let rendered = record
                        .artifact(&name)
                        .ok_or_else(|| anyhow!("no artifact from specialization '{}'", name))?;
                    print!("{}", rendered);
                }
                None => println!("{}", record.to_json()?),
            }
            if let Some(error) = failure {
                return Err(anyhow::Error::new(error).context(format!("protocol '{}' aborted", protocol)));
            }
        }
        Command::Validate { protocol, inline } => {
            let mut graph = build_demo(&protocol, &registry)?;
            if inline {
                graph = inline_subprotocols(&graph);
            }
            match validate_graph(&graph, &registry) {
                Ok(()) => println!("✅ '{}' is valid ({} nodes)", protocol, graph.len()),
                Err(malformed) => {
                    for problem in &malformed.errors {
                        eprintln!("❌ {}", problem);
                    }
                    return Err(anyhow!("'{}' is malformed", protocol));
                }
            }
        }
        Command::Inline { protocol } => {
            let graph = inline_subprotocols(&build_demo(&protocol, &registry)?);
            print_graph(&graph);
        }
        Command::Primitives => {
            let signatures: Vec<_> = registry.signatures().map(|s| s.as_ref()).collect();
            println!("{}", serde_json::to_string_pretty(&signatures)?);
        }
        Command::Demos => {
            for Demo {
                name, description, ..
            } in demos::catalog()
            {
                println!("{:<22} {}", name, description);
            }
        }
    }
    Ok(())
}

fn build_demo(name: &str, registry: &PrimitiveRegistry) -> Result<ActivityGraph> {
    let demo = demos::find(name).ok_or_else(|| {
        let known: Vec<&str> = demos::catalog().iter().map(|demo| demo.name).collect();
        anyhow!("unknown protocol '{}' (known: {})", name, known.join(", "))
    })?;
    Ok((demo.build)(registry)?)
}

fn print_graph(graph: &ActivityGraph) {
    println!("protocol {} ({} nodes)", graph.name(), graph.len());
    for node in graph.nodes() {
        let successors: Vec<String> = graph
            .successors(node.id)
            .iter()
            .map(|id| graph.node_name(*id).to_string())
            .collect();
        println!(
            "  {:>3}  {:<32} {:<12} -> {}",
            node.id.0,
            node.name,
            format!("{:?}", node.kind.activity_kind()),
            successors.join(", ")
        );
    }
    for (name, pin) in graph.outputs() {
        println!("  output {} <- {}.{}", name, graph.node_name(pin.node), pin.pin);
    }
}

/// `name=value`: `100uL` and `600nm` become quantities, numbers floats, anything else text.
fn parse_parameter(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let value = value.trim();
    let parsed = if let Some(amount) = value.strip_suffix("uL") {
        Value::microliters(parse_number(amount)?)
    } else if let Some(amount) = value.strip_suffix("nm") {
        Value::nanometers(parse_number(amount)?)
    } else if let Ok(number) = value.parse::<f64>() {
        Value::Float(number)
    } else {
        Value::text(value)
    };
    Ok((name.trim().to_string(), parsed))
}

fn parse_number(amount: &str) -> Result<f64, String> {
    amount
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid quantity '{}': {}", amount, e))
}
