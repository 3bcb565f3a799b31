//! ToneSoul CLI - run sentences through the pipeline and inspect the engines
//!
//! Every invocation starts from a fresh runtime, so engine state only spans
//! the sentences passed to a single command.

mod render;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tonesoul_core::TraceId;
use tonesoul_runtime::{ToneSoulConfig, ToneSoulRuntime};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tonesoul", about = "ToneSoul intent pipeline with self-monitoring engines")]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true, default_value = "tonesoul.toml")]
    config: PathBuf,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one or more sentences in order
    Process {
        sentences: Vec<String>,
        /// Trace id for the first sentence
        #[arg(short, long)]
        trace_id: Option<String>,
        /// User satisfaction score in [0, 1]
        #[arg(short, long)]
        satisfaction: Option<f64>,
    },
    /// Process sentences, then list the commitments they created
    Vows {
        sentences: Vec<String>,
        /// Fulfill every created commitment afterwards
        #[arg(long)]
        fulfill: bool,
    },
    /// Process sentences, then print the engine summaries
    Evolution { sentences: Vec<String> },
    /// Show modules, routing table and engine status
    Status,
    /// Force one metacognitive reflection cycle
    Reflect,
    /// Print the effective configuration as TOML
    Config,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tonesoul=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ToneSoulConfig::load(&cli.config);

    match cli.command {
        Commands::Process {
            sentences,
            trace_id,
            satisfaction,
        } => {
            let runtime = ToneSoulRuntime::new(config);
            let mut trace_id = trace_id.map(TraceId::from);
            for sentence in &sentences {
                let result = runtime
                    .process_with_feedback(sentence, trace_id.take(), satisfaction)
                    .await;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    println!("{}", render::process_result(&result));
                }
            }
        }

        Commands::Vows { sentences, fulfill } => {
            let runtime = ToneSoulRuntime::new(config);
            for sentence in &sentences {
                let result = runtime.process(sentence, None).await;
                if result.vow.is_none() {
                    eprintln!("No commitment in {:?}", sentence);
                }
            }
            if fulfill {
                for vow in runtime.list_vows() {
                    if let Err(e) = runtime.fulfill_vow(&vow.id) {
                        eprintln!("Could not fulfill {}: {}", vow.id, e);
                    }
                }
            }
            let vows = runtime.list_vows();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&vows)?);
            } else {
                for vow in &vows {
                    println!("{}", render::vow_line(vow));
                }
                println!("{} commitment(s)", vows.len());
            }
        }

        Commands::Evolution { sentences } => {
            let runtime = ToneSoulRuntime::new(config);
            for sentence in &sentences {
                runtime.process(sentence, None).await;
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&runtime.evolution_overview().await)?);
            } else {
                let learning = runtime.get_learning_insights().await;
                let cognitive = runtime.get_cognitive_summary().await;
                let knowledge = runtime.get_knowledge_summary().await;
                print!("{}", render::evolution(&learning, &cognitive, &knowledge));
            }
        }

        Commands::Status => {
            let runtime = ToneSoulRuntime::new(config);
            let modules = runtime.list_modules();
            if cli.json {
                let status = serde_json::json!({
                    "modules": modules,
                    "evolution": runtime.status().await,
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("ToneSoul v{} ({})", env!("CARGO_PKG_VERSION"), tonesoul_runtime::SYSTEM_VERSION);
                println!("Responders: {}", modules.available_modules.join(", "));
                println!("Routing table:");
                for (tone, target) in &modules.routing_table {
                    println!("  {:<22} -> {}", tone, target);
                }
                println!("Evolution modules: {}", modules.evolution_modules.join(", "));
            }
        }

        Commands::Reflect => {
            let runtime = ToneSoulRuntime::new(config);
            let report = runtime.trigger_reflection(None).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let result = &report.reflection_results;
                println!(
                    "state {}  confidence {:.2}  reflected {}",
                    result.cognitive_state, result.decision_confidence, report.reflection_triggered
                );
                for insight in &result.metacognitive_insights {
                    println!("  {}", insight.message);
                }
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml());
        }

        Commands::Version => {
            println!("tonesoul v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
