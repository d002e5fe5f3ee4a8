mod config;
mod generate_cmd;
mod plan_cmds;
mod serve_cmd;

#[cfg(test)]
mod test_util;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use fitplan_core::webhook::WebhookVerifier;
use fitplan_db::config::DbConfig;
use fitplan_db::pool;

use config::FitplanConfig;
use generate_cmd::GenerateArgs;

#[derive(Parser)]
#[command(name = "fitplan", about = "Fitness plan generator and plan store")]
struct Cli {
    /// Database URL (overrides FITPLAN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a fitplan config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// AI provider: openai, gemini, or none
        #[arg(long)]
        ai_provider: Option<String>,
        /// API key for the AI provider
        #[arg(long)]
        api_key: Option<String>,
        /// Identity webhook signing secret (whsec_...)
        #[arg(long)]
        webhook_secret: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the fitplan database (requires config file or env vars)
    DbInit,
    /// Run the HTTP server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
    /// Generate a plan and store it as the user's active plan
    Generate(GenerateArgs),
    /// Plan management
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// List a user's plans, newest first
    List {
        /// User ID
        user_id: String,
    },
    /// Show a user's active plan
    Active {
        /// User ID
        user_id: String,
    },
    /// Show one plan in full
    Show {
        /// Plan ID
        plan_id: String,
    },
    /// Make a plan the user's active plan
    Activate {
        /// User ID
        user_id: String,
        /// Plan ID to activate
        plan_id: String,
    },
    /// Rename a plan
    Rename {
        /// Plan ID
        plan_id: String,
        /// New name
        name: String,
    },
    /// Delete a plan (no other plan is activated in its place)
    Delete {
        /// Plan ID
        plan_id: String,
    },
}

/// Show only the ends of a secret.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Execute the `fitplan init` command: write config file.
fn cmd_init(
    db_url: &str,
    ai_provider: Option<String>,
    api_key: Option<String>,
    webhook_secret: Option<String>,
    force: bool,
) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    if let Some(secret) = webhook_secret.as_deref() {
        WebhookVerifier::new(secret).context("invalid --webhook-secret")?;
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        ai: config::AiSection {
            provider: ai_provider.map(|p| p.trim().to_ascii_lowercase()),
            api_key,
        },
        webhook: config::WebhookSection {
            secret: webhook_secret,
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!(
        "  ai.provider = {}",
        cfg.ai.provider.as_deref().unwrap_or(config::DEFAULT_PROVIDER)
    );
    if let Some(key) = cfg.ai.api_key.as_deref() {
        println!("  ai.api_key = {}", mask(key));
    }
    if let Some(secret) = cfg.webhook.secret.as_deref() {
        println!("  webhook.secret = {}", mask(secret));
    }
    println!();
    println!("Next: run `fitplan db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `fitplan db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = FitplanConfig::resolve(cli_db_url)?;

    println!("Initializing fitplan database...");

    // 1. Create the database if it does not exist.
    pool::ensure_database_exists(&resolved.db_config).await?;

    // 2. Connect to the target database.
    let db_pool = pool::create_pool(&resolved.db_config).await?;

    // 3. Run migrations.
    pool::run_migrations(&db_pool).await?;

    // 4. Print success with table counts.
    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("fitplan db-init complete.");
    Ok(())
}

/// Execute the `fitplan serve` command.
async fn cmd_serve(cli_db_url: Option<&str>, bind: &str, port: u16) -> anyhow::Result<()> {
    let resolved = FitplanConfig::resolve(cli_db_url)?;
    let generator = resolved.build_generator()?;
    let webhook = resolved.webhook_verifier()?;
    tracing::info!(
        provider = generator.provider_name().unwrap_or("none"),
        webhook = webhook.is_some(),
        "starting fitplan server"
    );

    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let state = serve_cmd::AppState {
        pool: db_pool.clone(),
        generator: Arc::new(generator),
        webhook,
    };
    let result = serve_cmd::run_serve(state, bind, port).await;
    db_pool.close().await;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            ai_provider,
            api_key,
            webhook_secret,
            force,
        } => {
            cmd_init(&db_url, ai_provider, api_key, webhook_secret, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            cmd_serve(cli.database_url.as_deref(), &bind, port).await?;
        }
        Commands::Generate(args) => {
            let resolved = FitplanConfig::resolve(cli.database_url.as_deref())?;
            let generator = resolved.build_generator()?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = generate_cmd::run_generate(&db_pool, generator, &args).await;
            db_pool.close().await;
            result?;
        }
        Commands::Plan { command } => {
            let resolved = FitplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = plan_cmds::run_plan_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn database_url_is_global() {
        let cli = Cli::parse_from([
            "fitplan",
            "plan",
            "list",
            "user_1",
            "--database-url",
            "postgresql://cli/db",
        ]);
        assert_eq!(cli.database_url.as_deref(), Some("postgresql://cli/db"));
        assert!(matches!(
            cli.command,
            Commands::Plan {
                command: PlanCommands::List { ref user_id }
            } if user_id == "user_1"
        ));
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::parse_from(["fitplan", "serve"]);
        assert!(matches!(
            cli.command,
            Commands::Serve { ref bind, port: 3000 } if bind == "127.0.0.1"
        ));
    }

    #[test]
    fn mask_hides_middle_of_secret() {
        assert_eq!(mask("sk-1234567890abcd"), "sk-1...abcd");
        assert_eq!(mask("short"), "*****");
    }

    #[test]
    fn init_rejects_bad_webhook_secret_before_writing() {
        let _lock = test_util::lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let result = cmd_init(
            DbConfig::DEFAULT_URL,
            None,
            None,
            Some("whsec_not base64!".to_string()),
            false,
        );
        let written = config::config_path().exists();

        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }

        assert!(result.is_err());
        assert!(!written, "config file should not be written");
    }

    #[test]
    fn init_writes_config_and_refuses_overwrite() {
        let _lock = test_util::lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let first = cmd_init(
            "postgresql://db:5432/fitplan",
            Some(" Gemini ".to_string()),
            Some("g-key-123456789".to_string()),
            None,
            false,
        );
        let loaded = config::load_config();
        let second = cmd_init(DbConfig::DEFAULT_URL, None, None, None, false);

        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }

        first.unwrap();
        let loaded = loaded.unwrap();
        assert_eq!(loaded.database.url, "postgresql://db:5432/fitplan");
        assert_eq!(loaded.ai.provider.as_deref(), Some("gemini"));
        assert_eq!(loaded.ai.api_key.as_deref(), Some("g-key-123456789"));
        assert!(second.unwrap_err().to_string().contains("already exists"));
    }
}
