use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tally_core::{time::today_in, Budget, Cadence, Locale, RecurringRule, Session, Store};
use tally_finance::{Enricher, Ledger};
use tally_ingest::{parse_on, LocalExtractor};

mod auth;
mod chat;
mod config;
mod llm;
mod llm_stream;
mod orchestrator;
mod quota;
mod state;

use llm::RemoteClient;
use orchestrator::Orchestrator;
use quota::QuotaClient;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TALLY_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "tally", version = VERSION, about = "Capture transactions from plain text")]
struct Cli {
    /// Debug logging on stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract transactions locally and print the result as JSON
    Parse {
        text: String,

        /// Locale tag, e.g. en, ru, de-AT (default: chat.locale)
        #[arg(long)]
        locale: Option<String>,
    },

    /// Interactive capture: local extraction first, the remote service otherwise
    Chat {
        #[arg(long)]
        locale: Option<String>,
    },

    /// Manage ~/.tally/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },

    /// Budget folders and recurring rules in the local ledger
    Ledger {
        #[command(subcommand)]
        command: LedgerCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Store an access token and user id in ~/.tally/auth.json
    PasteToken,
}

#[derive(Subcommand, Debug)]
enum LedgerCommand {
    /// Add a budget folder
    AddBudget { id: String, name: String },

    /// List budget folders
    Budgets,

    /// Add a recurring rule
    AddRule {
        /// Title as it appears on statements, e.g. "Netflix"
        pattern: String,

        #[arg(long)]
        amount: f64,

        /// weekly or monthly
        #[arg(long, default_value = "monthly")]
        cadence: String,

        #[arg(long)]
        next_due: NaiveDate,

        /// Budget folder id
        #[arg(long)]
        budget: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Parse { text, locale } => {
            let cfg = config::load_config()?;
            let locale = locale.as_deref().map(Locale::from_tag).unwrap_or(cfg.chat.locale);
            let today = today_in(&cfg.chat.timezone).context("chat.timezone")?;
            let outcome = parse_on(&text, locale, today);
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Command::Chat { locale } => {
            chat(locale.as_deref().map(Locale::from_tag)).await?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
        },

        Command::Auth { command } => match command {
            AuthCommand::PasteToken => auth::paste_token()?,
        },

        Command::Ledger { command } => ledger(command).await?,
    }

    Ok(())
}

fn open_ledger() -> Result<Arc<Ledger>> {
    let dir = state::ledger_dir()?;
    let ledger = Ledger::open(&dir).with_context(|| format!("open ledger at {}", dir.display()))?;
    Ok(Arc::new(ledger))
}

async fn chat(locale: Option<Locale>) -> Result<()> {
    let cfg = config::load_config()?;
    let creds = auth::load_auth()?.credentials()?;
    let session_cfg = cfg.session_config(&creds.user_id, locale)?;
    let ledger = open_ledger()?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("tally/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(cfg.remote.timeout())
        .build()
        .context("build HTTP client")?;
    let remote = Arc::new(RemoteClient::new(
        http.clone(),
        cfg.remote.url(&cfg.remote.chat_path),
        &creds.token,
    ));
    let quota = Arc::new(QuotaClient::new(
        http,
        cfg.remote.url(&cfg.remote.quota_path),
        &creds.token,
    ));
    let store: Arc<dyn Store> = ledger.clone();
    let enricher = Arc::new(Enricher::new(store, &creds.user_id, cfg.chat.history_limit));

    let session = Session::new(session_cfg, LocalExtractor);
    let (orch, rx) = Orchestrator::new(session, remote, quota, enricher, cfg.remote.timeout());
    chat::run(orch, rx, ledger).await
}

async fn ledger(command: LedgerCommand) -> Result<()> {
    let creds = auth::load_auth()?.credentials()?;
    let ledger = open_ledger()?;

    match command {
        LedgerCommand::AddBudget { id, name } => {
            ledger.add_budget(&creds.user_id, &Budget::new(id, name)).await?;
            println!("Added budget.");
        }
        LedgerCommand::Budgets => {
            let budgets = ledger.budget_folders(&creds.user_id).await?;
            if budgets.is_empty() {
                println!("No budgets. Add one with: tally ledger add-budget <ID> <NAME>");
            }
            for b in budgets {
                println!("{}\t{}", b.id, b.name);
            }
        }
        LedgerCommand::AddRule {
            pattern,
            amount,
            cadence,
            next_due,
            budget,
        } => {
            let cadence = match cadence.to_lowercase().as_str() {
                "weekly" => Cadence::Weekly,
                "monthly" => Cadence::Monthly,
                other => bail!("unknown cadence: {} (use weekly or monthly)", other),
            };
            if !(amount.is_finite() && amount > 0.0) {
                bail!("amount must be positive");
            }
            let rule = RecurringRule {
                title_pattern: pattern,
                budget_folder_id: budget,
                avg_amount: amount,
                cadence,
                next_due_date: next_due,
                active: true,
            };
            ledger.add_recurring_rule(&creds.user_id, &rule).await?;
            println!("Added recurring rule.");
        }
    }
    Ok(())
}
