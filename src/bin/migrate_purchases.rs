//! Converts legacy single-factory purchases into orders.
//!
//! ```text
//! migrate-purchases --dry-run
//! ```

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use factory_infohub as api;
use api::notifications::{LogMailer, Mailer};
use api::services::purchases::PurchaseService;

#[derive(Parser, Debug)]
#[command(
    name = "migrate-purchases",
    about = "Migrate legacy factory purchases into orders, payments and purchase history",
    version
)]
struct Cli {
    /// Run every conversion and roll it back instead of committing
    #[arg(long)]
    dry_run: bool,

    /// Overrides the configured database URL
    #[arg(long)]
    database_url: Option<String>,

    /// Apply pending schema migrations first
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }

    let db = api::db::establish_connection_from_app_config(&cfg).await?;
    if cli.migrate || cfg.auto_migrate {
        api::db::run_migrations(&db).await?;
    }

    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let events = tokio::spawn(api::events::process_events(event_rx));
    let event_sender = Arc::new(api::events::EventSender::new(event_tx));
    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);

    let service = PurchaseService::new(Arc::new(db), event_sender, mailer);
    if cli.dry_run {
        warn!("Dry run: no changes will be committed");
    }
    let report = service.migrate_purchases(cli.dry_run).await?;

    for (purchase_id, order_number) in &report.migrated {
        info!(purchase_id = %purchase_id, order_number = %order_number, "Migrated");
    }
    for (purchase_id, reason) in &report.failed {
        error!(purchase_id = %purchase_id, reason = %reason, "Migration failed");
    }
    println!(
        "{} {} purchase(s), {} failed",
        if report.dry_run { "Would migrate" } else { "Migrated" },
        report.migrated.len(),
        report.failed.len()
    );

    // Dropping the last sender lets the event loop drain and exit
    drop(service);
    let _ = events.await;

    if report.failed.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} purchase(s) could not be migrated", report.failed.len())
    }
}
