//! `agora` command-line runner.

mod config;

use agora_orchestrator::{
    default_profiles, default_roster, CommunicationHub, Orchestrator, OrchestratorResult,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agora", about = "Agora — task coordination hub for cooperating agents")]
struct Cli {
    /// Path to config file (defaults to ./agora.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the demo audit workflow and print the collaboration report
    Run {
        /// Target to audit (overrides config)
        #[arg(long)]
        target: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List the demo agents
    Agents,
    /// Print the task graph without running it
    Plan {
        /// Target to plan for (overrides config)
        #[arg(long)]
        target: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so `--format json` output stays parseable.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let cwd = std::env::current_dir()?;
    let (config, source) = config::resolve_config(cli.config.as_deref(), &cwd)?;
    match &source {
        Some(path) => info!(path = %path.display(), "Config loaded"),
        None => info!("No config file, using defaults"),
    }

    match cli.command {
        Commands::Run { target, format } => {
            let target = target.unwrap_or_else(|| config.target.clone());
            let hub = CommunicationHub::new(config.hub.clone());
            for agent in default_roster(&config.simulation) {
                hub.register_agent(agent);
            }

            let orchestrator = Orchestrator::new(hub.clone(), config.orchestrator.clone());
            let result = orchestrator.run(&target).await?;
            let report = hub.generate_collaboration_report();

            match format {
                OutputFormat::Json => {
                    let out = serde_json::json!({
                        "result": result,
                        "report": report.to_json(),
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
                OutputFormat::Text => {
                    print_result(&result);
                    println!();
                    print!("{}", report.render_text());
                }
            }

            if !result.is_success() {
                anyhow::bail!("{}", result.summary);
            }
        }
        Commands::Agents => {
            println!("Demo agents:");
            for profile in default_profiles() {
                println!(
                    "  {:<14} {:<26} [{}]",
                    profile.id,
                    profile.role,
                    profile.expertise.join(", ")
                );
            }
        }
        Commands::Plan { target } => {
            let target = target.unwrap_or_else(|| config.target.clone());
            let orchestrator =
                Orchestrator::new(CommunicationHub::new(config.hub.clone()), config.orchestrator.clone());
            let plan = orchestrator.plan(&target);
            agora_orchestrator::validate(&plan)?;

            println!("Task graph for {target}:");
            for task in &plan {
                let deps = if task.dependencies.is_empty() {
                    "-".to_string()
                } else {
                    task.dependencies.join(", ")
                };
                println!("  {:<20} -> {:<14} after: {deps}", task.id, task.assigned_to);
            }
        }
    }

    Ok(())
}

fn print_result(result: &OrchestratorResult) {
    println!("{}", result.summary);
    println!("Finished in {} ms", result.duration_ms);
    for task in &result.tasks {
        println!("  {:<20} {:<14} {}", task.id, task.assigned_to, task.status);
    }
}
