use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use backend_client::BackendClient;
use catedra_audit::analysis::ClaudeAnalyzer;
use catedra_audit::dashboard::{self, DashboardSummary};
use catedra_audit::pipeline::{AuditConfig, AuditPipeline};
use catedra_audit::store::StateStore;
use catedra_common::Config;

#[derive(Parser)]
#[command(name = "catedra-audit", about = "Cátedra reputation monitor: store views and AI audit")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Counts shown on the dashboard header
    Summary,
    /// List departments, optionally filtered by name, titular or code
    Departments { query: Option<String> },
    /// Recommendations, newest first
    Recommendations,
    /// Analyze every unprocessed post and record matches
    Audit,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("catedra=info".parse()?)
                .add_directive("backend_client=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.log_redacted();

    let client = BackendClient::new(&config.api_url).with_max_pages(config.max_pages);
    let mut store = StateStore::default();
    store
        .load_all(&client)
        .await
        .context("Failed to load backend collections")?;

    match cli.command {
        Command::Summary => {
            print!("{}", DashboardSummary::from_store(&store));
        }
        Command::Departments { query } => {
            let query = query.unwrap_or_default();
            for dept in dashboard::filter_departments(store.departments(), &query) {
                println!(
                    "{:<8} {:<40} {:<30} {:>4}",
                    dept.code, dept.name, dept.lead_instructor, dept.mentions
                );
            }
        }
        Command::Recommendations => print_feed(&store),
        Command::Audit => run_audit(&config, &mut store).await?,
    }

    Ok(())
}

async fn run_audit(config: &Config, store: &mut StateStore) -> Result<()> {
    let api_key = config
        .anthropic_api_key
        .clone()
        .context("ANTHROPIC_API_KEY is required for the audit command")?;
    let analyzer = ClaudeAnalyzer::new(api_key, config.model.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let pipeline = AuditPipeline::new(Arc::new(analyzer), AuditConfig::from(config))
        .with_progress(tx);

    let progress = tokio::spawn(async move {
        while let Some(status) = rx.recv().await {
            info!("{status}");
        }
    });

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current post");
            on_ctrl_c.cancel();
        }
    });

    let stats = pipeline.run(store, &cancel).await?;
    drop(pipeline);
    let _ = progress.await;

    print!("{stats}");
    if stats.matched > 0 {
        println!();
        print_feed(store);
    }
    Ok(())
}

fn print_feed(store: &StateStore) {
    for entry in dashboard::recommendation_feed(store) {
        let rec = entry.recommendation;
        println!(
            "#{:<4} {:<30} {:<9} {:.2}  {}",
            rec.id,
            entry.department_name,
            rec.sentiment.to_string(),
            rec.confidence,
            rec.text
        );
    }
}
