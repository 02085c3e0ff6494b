//! CLI module for the CareerLens match engine
//!
//! Subcommands:
//! - `search`: run one match search and print ranked results
//! - `check`: probe the job source and report the vector store backend
//! - `domains`: list the industry domains usable with `--domains`

pub mod check;
pub mod domains;
pub mod search;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// CareerLens - match a candidate profile against live job postings
#[derive(Parser)]
#[command(name = "careerlens")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Search jobs and rank them against a profile
    Search(search::SearchArgs),

    /// Check the job source and vector store
    Check,

    /// List industry domains for filtering
    Domains,
}

/// Load `.env`, configuration and logging
fn bootstrap() -> AppConfig {
    dotenvy::dotenv().ok();

    let (config, load_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    logging::init_logging(&config.logging);

    if let Some(e) = load_error {
        tracing::warn!(error = %e, "Configuration unreadable, using defaults");
    }
    config
}
