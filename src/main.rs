use miette::IntoDiagnostic;
use clap::{Parser, Subcommand};
use qtap::application::funding::{FundingOutcome, FundingReconciler};
use qtap::application::payment::PaymentOrchestrator;
use qtap::application::scanner::{ScanOutcome, scan_first_code};
use qtap::config::{Config, ConfigError, parse_api_url};
use qtap::domain::effect::Effect;
use qtap::domain::money::Amount;
use qtap::domain::ports::{FundingIntentStoreBox, SessionPort, SessionRef, TransactionApi, TransactionApiRef};
use qtap::domain::session::{Credential, Session};
use qtap::error::{Result, ValidationError};
use qtap::infrastructure::http::HttpTransactionApi;
use qtap::infrastructure::in_memory::{InMemoryFundingStore, SessionHandle};
use qtap::infrastructure::manual_entry::ManualEntryDecoder;
#[cfg(feature = "storage-rocksdb")]
use qtap::infrastructure::rocksdb::RocksDBFundingStore;
use qtap::interfaces::console::EffectWriter;
use qtap::interfaces::redirect::parse_redirect;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Backend base URL. Overrides QTAP_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Path to persistent checkpoint database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<std::path::PathBuf>,

    /// Bearer token. Overrides QTAP_TOKEN.
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pay a driver. Reads the driver ID from stdin when --code is omitted.
    Pay {
        #[arg(long)]
        code: Option<String>,
    },
    /// Request a wallet funding link.
    Fund { amount: String },
    /// Resolve a gateway redirect (full callback URL or its query string).
    Callback { url: String },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    run(cli).await.into_diagnostic()?;
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(raw) = cli.api_url.as_deref() {
        config.api_url = parse_api_url(raw)
            .map_err(|e| ConfigError::InvalidValue("--api-url".to_string(), e))?;
    }
    if cli.token.is_some() {
        config.token = cli.token.clone();
    }
    if cli.db_path.is_some() {
        config.db_path = cli.db_path.clone();
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let session: SessionRef = match config.token.clone() {
        Some(token) => Arc::new(SessionHandle::new(Session::new(
            config.subject.clone(),
            config.role,
            Credential::new(token),
        ))),
        None => Arc::new(SessionHandle::anonymous()),
    };
    let api: TransactionApiRef = Arc::new(HttpTransactionApi::new(config.api_url.clone()));
    info!(api = %config.api_url, "client configured");

    let stdout = io::stdout();
    let mut writer = EffectWriter::new(stdout.lock());

    match cli.command {
        Commands::Pay { code } => {
            let orchestrator = PaymentOrchestrator::new(Arc::clone(&api), Arc::clone(&session));
            let code = match code {
                Some(code) => code,
                None => {
                    eprintln!("Enter driver ID (e.g., DRV-123456):");
                    match scan_first_code(&ManualEntryDecoder::stdin()).await {
                        ScanOutcome::Decoded(code) => code,
                        ScanOutcome::Unavailable(reason) => {
                            warn!(%reason, "no driver code read");
                            return Err(ValidationError::MissingDriverCode.into());
                        }
                    }
                }
            };
            let scanned = orchestrator.on_scan_result(&code).await?;
            writer.write_effects(&scanned)?;

            let effects = orchestrator.confirm().await?;
            writer.write_effects(&effects)?;
            refresh_if_requested(&effects, api.as_ref(), session.as_ref(), &mut writer).await?;

            let attempt = orchestrator.attempt().await;
            writer.write_line("status", format!("{:?}", attempt.status()))?;
        }
        Commands::Fund { amount } => {
            let amount = Amount::parse(&amount)?;
            let reconciler = FundingReconciler::new(api.clone(), session.clone(), build_store(config.db_path.as_deref())?);
            let outcome = reconciler.initiate(amount.value()).await?;
            report(&outcome, api.as_ref(), session.as_ref(), &mut writer).await?;
        }
        Commands::Callback { url } => {
            let params = parse_redirect(&url)?;
            let reconciler = FundingReconciler::new(api.clone(), session.clone(), build_store(config.db_path.as_deref())?);
            let outcome = reconciler.resume(params).await;
            report(&outcome, api.as_ref(), session.as_ref(), &mut writer).await?;
        }
    }

    Ok(())
}

fn build_store(db_path: Option<&Path>) -> Result<FundingIntentStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Box::new(RocksDBFundingStore::open(path)?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryFundingStore::new()))
        }
        None => Ok(Box::new(InMemoryFundingStore::new())),
    }
}

async fn report<W: Write>(
    outcome: &FundingOutcome,
    api: &dyn TransactionApi,
    session: &dyn SessionPort,
    writer: &mut EffectWriter<W>,
) -> Result<()> {
    writer.write_effects(&outcome.effects)?;
    refresh_if_requested(&outcome.effects, api, session, writer).await?;
    if let Some(intent) = outcome.intent.as_ref() {
        if let Some(reference) = intent.reference.as_ref() {
            writer.write_line("tx_ref", reference)?;
        }
        writer.write_line("status", intent.status)?;
    }
    Ok(())
}

/// Executes a wallet refresh effect by reading the balance once.
async fn refresh_if_requested<W: Write>(
    effects: &[Effect],
    api: &dyn TransactionApi,
    session: &dyn SessionPort,
    writer: &mut EffectWriter<W>,
) -> Result<()> {
    if !effects.contains(&Effect::RefreshWallet) {
        return Ok(());
    }
    let Some(current) = session.current().await else {
        return Ok(());
    };
    match api.wallet(&current.credential).await {
        Ok(snapshot) => writer.write_line("balance", snapshot.balance)?,
        Err(e) => warn!(error = %e, "failed to refresh wallet"),
    }
    Ok(())
}
