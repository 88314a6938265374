use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use warden_core::WardenConfig;
use warden_mask::{MaskFamily, Masker};
use warden_policy::{rule_for, Disposition};
use warden_verdict::ThreatCategory;

mod audit;

use audit::{describe_modes, run_audit};

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Warden - cross-phase security enforcement for agent runtimes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Validate a configuration file and print the resolved modes
    Check {
        #[arg(short, long, default_value = "config/warden.toml")]
        config: PathBuf,
        /// Print the effective configuration as TOML
        #[arg(long)]
        dump: bool,
    },
    /// Audit configuration and environment
    Audit {
        #[arg(short, long, default_value = "config/warden.toml")]
        config: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List the threat category vocabulary and its enforcement rules
    Categories {
        #[arg(long)]
        json: bool,
    },
    /// Mask sensitive spans in text (reads stdin when TEXT is omitted)
    Mask {
        /// Comma-separated families; all when omitted
        #[arg(short, long, value_delimiter = ',')]
        families: Vec<MaskFamily>,
        text: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config, dump } => {
            let loaded = WardenConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let modes = loaded.validate()?;
            info!(path = %config.display(), "Configuration valid");
            println!("{}", describe_modes(&modes));
            if dump {
                println!("\n{}", loaded.to_toml()?);
            }
        }
        Commands::Audit { config, json } => {
            let report = run_audit(&config, |var| std::env::var(var).ok());
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.render());
            }
            if !report.is_ok() {
                bail!("audit failed");
            }
        }
        Commands::Categories { json } => {
            let rows = category_rows();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("{}", render_categories(&rows));
            }
        }
        Commands::Mask { families, text } => {
            let input = match text {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("reading stdin")?;
                    buf
                }
            };
            let masker = if families.is_empty() {
                Masker::all()
            } else {
                Masker::new(&families)
            };
            print!("{}", masker.mask(&input));
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct CategoryRow {
    name: String,
    label: &'static str,
    disposition: Disposition,
    tools: &'static [&'static str],
}

fn category_rows() -> Vec<CategoryRow> {
    ThreatCategory::vocabulary()
        .into_iter()
        .map(|category| {
            let rule = rule_for(&category);
            CategoryRow {
                name: category.canonical_name(),
                label: rule.label,
                disposition: rule.disposition,
                tools: rule.tools,
            }
        })
        .collect()
}

fn render_categories(rows: &[CategoryRow]) -> String {
    rows.iter()
        .map(|row| {
            let disposition = match row.disposition {
                Disposition::Maskable => "maskable",
                Disposition::AlwaysBlock => "always-block",
                Disposition::Neutral => "-",
            };
            let tools = if row.tools.is_empty() {
                "-".to_string()
            } else {
                row.tools.join(",")
            };
            format!(
                "{:<34} {:<24} {:<13} {}",
                row.name, row.label, disposition, tools
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
