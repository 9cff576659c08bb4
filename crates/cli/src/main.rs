use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use seedbed_kernel::{RunCtx, Settings};

#[derive(Debug, Parser)]
#[command(name = "seedbed-cli", version, about = "Provision accounts and load fixtures into MongoDB")]
struct Cli {
    /// Connection string; overrides `database.uri`
    #[arg(long, global = true)]
    uri: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create accounts, then load fixtures
    Run,
    /// Create accounts only
    Accounts,
    /// Load fixtures and build indexes only
    Fixtures,
    /// Check the bootstrapped state without writing
    Verify {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the ordered steps without connecting
    Plan,
}

fn print_plan() {
    for (position, (stage, step)) in seedbed_app::registry().plan().into_iter().enumerate() {
        println!("{:>2}. [{}] {}: {}", position + 1, stage, step.database, step.action);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Command::Plan = cli.command {
        print_plan();
        return Ok(());
    }

    let mut settings = Settings::load().with_context(|| "failed to load seedbed settings")?;
    if let Some(uri) = cli.uri {
        settings.database.uri = uri;
    }
    seedbed_telemetry::init(&settings.telemetry)?;

    tracing::info!(env = ?settings.environment, command = ?cli.command, "seedbed-cli starting");

    let store = seedbed_app::connect(&settings).await?;
    let registry = seedbed_app::registry();
    let ctx = RunCtx::new(&store);

    match cli.command {
        Command::Run => registry.run_all(&ctx).await?,
        Command::Accounts => registry.run_one("accounts", &ctx).await?,
        Command::Fixtures => registry.run_one("fixtures", &ctx).await?,
        Command::Verify { json } => {
            let report = seedbed_app::verify::verify(&store).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for check in &report.checks {
                    let mark = if check.passed { "ok" } else { "FAILED" };
                    println!("{:<6} {:<22} {}", mark, check.name, check.detail);
                }
            }
            if !report.is_success() {
                let failed = report.failures().count();
                return Err(anyhow!("{} verification checks failed", failed));
            }
        }
        Command::Plan => print_plan(),
    }

    Ok(())
}
