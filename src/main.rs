mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use profsync::config::Config;
use profsync::hash::{body_digest, digest};
use profsync::output::{SyncEvent, SyncSummary};
use profsync::{LogLevel, ReplicaStore, StoreRouter, SyncAction, SyncEngine, SyncResult};
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, EnvFilter};

type Engine = SyncEngine<StoreRouter, StoreRouter>;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().as_str()));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    // Validate arguments
    cli.validate()?;

    // Load config file, then apply CLI overrides
    let mut config = Config::load()?;
    cli.apply_to(&mut config);
    config.validate()?;

    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.data_dir.display()
        )
    })?;

    let strategy = cli.strategy().unwrap_or(config.strategy);
    tracing::debug!(
        "Local replica: {}, remote: {:?}, strategy: {}",
        config.data_dir.display(),
        config.remote,
        strategy
    );

    let engine = SyncEngine::new(StoreRouter::local(&config), StoreRouter::remote(&config))
        .with_log_capacity(config.log_capacity)
        .with_workers(config.workers);

    let outcome = match &cli.command {
        Command::Sync { id, .. } => run_sync(&engine, &cli, id, strategy.as_str()).await,
        Command::SyncAll { .. } => run_sync_all(&engine, &cli, strategy.as_str()).await,
        Command::List { remote } => run_list(&engine, &cli, *remote).await,
        Command::Digest { id, remote } => run_digest(&engine, &cli, id, *remote).await,
    };

    if let Some(limit) = cli.show_log {
        print_log(&engine, &cli, limit);
    }

    outcome
}

async fn run_sync(engine: &Engine, cli: &Cli, id: &str, strategy: &str) -> Result<()> {
    let result = engine.sync(id, strategy).await;

    if cli.json {
        SyncEvent::Result(&result).emit();
    } else if !cli.quiet {
        print_result(&result);
    }

    if result.is_error() {
        anyhow::bail!("Profile '{}' not found on either replica", id);
    }
    Ok(())
}

async fn run_sync_all(engine: &Engine, cli: &Cli, strategy: &str) -> Result<()> {
    let start = Instant::now();

    // Create progress spinner (only if not quiet)
    let pb = if cli.quiet || cli.json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {pos} profiles {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    let results = engine
        .sync_all_with(strategy, |result| {
            pb.inc(1);
            pb.set_message(result.profile_id.clone());
            if cli.json {
                SyncEvent::Result(result).emit();
            } else if !cli.quiet {
                pb.suspend(|| print_result(result));
            }
        })
        .await;

    pb.finish_and_clear();

    let summary = SyncSummary::from_results(&results, start.elapsed());
    if cli.json {
        SyncEvent::Summary(&summary).emit();
    } else if !cli.quiet {
        print_summary(&summary);
    }

    Ok(())
}

async fn run_list(engine: &Engine, cli: &Cli, remote: bool) -> Result<()> {
    let store = if remote { engine.remote() } else { engine.local() };
    let ids = store.list_ids().await?;

    if cli.json {
        SyncEvent::Ids {
            replica: store.name(),
            ids: &ids,
        }
        .emit();
    } else {
        for id in &ids {
            println!("{}", id);
        }
    }
    Ok(())
}

async fn run_digest(engine: &Engine, cli: &Cli, id: &str, remote: bool) -> Result<()> {
    let store = if remote { engine.remote() } else { engine.local() };
    let profile = store
        .read(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Profile '{}' not found on {} replica", id, store.name()))?;

    let body_hash = body_digest(&profile).to_hex();
    let hash = digest(&profile).to_hex();

    if cli.json {
        SyncEvent::Digest {
            profile_id: id,
            replica: store.name(),
            body_hash,
            hash,
        }
        .emit();
    } else {
        println!("body  {}", body_hash);
        println!("full  {}", hash);
    }
    Ok(())
}

fn print_result(result: &SyncResult) {
    let outcome = match result.action {
        SyncAction::UploadedToCloud => "uploaded to cloud".green(),
        SyncAction::DownloadedFromCloud => "downloaded from cloud".cyan(),
        SyncAction::AlreadySynced => "already synced".bright_black(),
        SyncAction::ConflictResolved => format!(
            "conflict resolved ({})",
            result.strategy.as_deref().unwrap_or_default()
        )
        .yellow(),
        SyncAction::ProfileNotFound => "not found on either replica".red(),
    };
    let mark = if result.is_error() {
        "✗".red().bold()
    } else {
        "✓".green().bold()
    };
    println!("{} {}: {}", mark, result.profile_id.bold(), outcome);
}

fn print_summary(summary: &SyncSummary) {
    println!("\n{}\n", "✓ Sync complete".green().bold());
    println!("  Profiles:          {}", summary.total.to_string().blue());
    println!("  Uploaded:          {}", summary.uploaded.to_string().green());
    println!("  Downloaded:        {}", summary.downloaded.to_string().cyan());
    println!("  Already synced:    {}", summary.already_synced.to_string().bright_black());
    println!("  Conflicts:         {}", summary.conflicts_resolved.to_string().yellow());
    if summary.not_found > 0 {
        println!("  Not found:         {}", summary.not_found.to_string().red());
    }
    println!(
        "  Duration:          {}",
        format_duration(Duration::from_secs_f64(summary.duration_secs)).cyan()
    );
}

fn print_log(engine: &Engine, cli: &Cli, limit: usize) {
    let entries = engine.get_log(limit);
    if cli.json {
        for entry in &entries {
            SyncEvent::Log(entry).emit();
        }
        return;
    }

    if !entries.is_empty() {
        println!();
    }
    for entry in &entries {
        let level = format!("{:>7}", entry.level.as_str());
        let level = match entry.level {
            LogLevel::Info => level.blue(),
            LogLevel::Success => level.green(),
            LogLevel::Error => level.red(),
        };
        println!("{} {} {}", entry.timestamp.bright_black(), level, entry.message);
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs >= 60 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}
