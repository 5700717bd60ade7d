mod audit_cmd;
mod config;
mod plan_cmd;
mod profiles_cmd;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use adplan_db::pool;

use config::AdplanConfig;

#[derive(Parser)]
#[command(name = "adplan", about = "Budget-constrained advertising inventory planner")]
struct Cli {
    /// Database URL (overrides ADPLAN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write an adplan config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/adplan")]
        db_url: String,
        /// Generator backend: http or claude-cli
        #[arg(long, default_value = "http")]
        generator: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the adplan database (requires config file or env vars)
    DbInit,
    /// List the available strategy profiles
    Profiles {
        /// Extra profiles to load from a TOML file
        #[arg(long)]
        profile_file: Option<PathBuf>,
        /// Show constraints and weights for each profile
        #[arg(long)]
        verbose: bool,
    },
    /// Run one planning request
    Plan {
        /// Campaign request JSON file
        #[arg(long)]
        request: PathBuf,
        /// Extra profiles to load from a TOML file
        #[arg(long)]
        profile_file: Option<PathBuf>,
        /// Read publications from a JSON file instead of the database
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Append audit documents to this JSONL file (with --catalog)
        #[arg(long)]
        audit_log: Option<PathBuf>,
        /// Write the result here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Read planning audit records
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },
    /// Print a shell completion script
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Show one audit record
    Show {
        /// Request ID
        request_id: String,
    },
    /// List recent audit records
    List {
        /// Only this hub
        #[arg(long)]
        hub: Option<String>,
        /// Maximum number of records
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

/// Execute the `adplan init` command: write config file.
fn cmd_init(db_url: &str, generator: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        generator: config::GeneratorSection {
            kind: generator.parse()?,
            ..config::GeneratorSection::default()
        },
        engine: adplan_core::EngineConfig::default(),
    };

    config::save_config_to(&path, &cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  generator.kind = {generator}");
    println!("  generator.api_key_env = {}", cfg.generator.api_key_env);
    println!();
    println!("Next: run `adplan db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `adplan db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = AdplanConfig::resolve(cli_db_url)?;

    println!("Initializing adplan database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("adplan db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            generator,
            force,
        } => {
            cmd_init(&db_url, &generator, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Profiles {
            profile_file,
            verbose,
        } => {
            profiles_cmd::run_profiles(profile_file.as_deref(), verbose)?;
        }
        Commands::Plan {
            request,
            profile_file,
            catalog,
            audit_log,
            output,
        } => {
            let resolved = AdplanConfig::resolve(cli.database_url.as_deref())?;
            let args = plan_cmd::PlanArgs {
                request,
                profile_file,
                catalog,
                audit_log,
                output,
            };
            plan_cmd::run_plan(&resolved, &args).await?;
        }
        Commands::Audit { command } => {
            let resolved = AdplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = audit_cmd::run_audit_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "adplan", &mut std::io::stdout());
        }
    }

    Ok(())
}
