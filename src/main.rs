//! mtiers CLI: certification history to membership-tier conversion.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use membership_tiers::batch::{self, BatchRunner};
use membership_tiers::config::TierConfig;
use membership_tiers::convert::Converter;
use membership_tiers::error::ValidationError;
use membership_tiers::intake;
use membership_tiers::rules::RuleRegistry;

#[derive(Parser)]
#[command(name = "mtiers", version, about = "Convert certification histories into membership tiers")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reference date for past/future checks (yyyy-MM-dd). Overrides the config.
    #[arg(long, global = true)]
    as_of: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and convert one profile, printing the result as JSON.
    Convert {
        /// Path to the profile JSON file.
        #[arg(long)]
        file: PathBuf,

        /// Also print per-stage bracket counts to stderr.
        #[arg(long)]
        trace: bool,
    },

    /// Validate one profile and print the repairs or the issues found.
    Validate {
        /// Path to the profile JSON file.
        #[arg(long)]
        file: PathBuf,
    },

    /// Convert every profile in a directory.
    Batch {
        /// Directory of `<id>.json` profile files.
        #[arg(long)]
        dir: PathBuf,

        /// Write the full report as JSON to this file.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the resolved rule registry as JSON.
    Rules {
        /// Print only the rule for this tier slug or certificate code.
        #[arg(long)]
        tier: Option<String>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TierConfig::load(path)?,
        None => TierConfig::default(),
    };
    if cli.as_of.is_some() {
        config.conversion.as_of = cli.as_of;
    }
    let converter = Converter::new(config.conversion.clone());

    match cli.command {
        Commands::Convert { file, trace } => {
            let raw = batch::load_profile(&file)?;
            let (normalized, conversion) = converter.convert_raw(&raw)?;
            for transform in &normalized.transforms {
                tracing::info!(%transform, "repaired profile");
            }
            if trace {
                for report in &conversion.trace {
                    eprintln!(
                        "  {:<16} {:>3} -> {:>3}",
                        report.stage, report.brackets_in, report.brackets_out
                    );
                }
            }
            tracing::info!(brackets = conversion.professional.len(), "profile converted");
            let json = serde_json::to_string_pretty(&conversion).into_diagnostic()?;
            println!("{json}");
        }

        Commands::Validate { file } => {
            let raw = batch::load_profile(&file)?;
            match intake::normalize(&raw) {
                Ok(normalized) => {
                    println!("Profile is valid.");
                    if normalized.transforms.is_empty() {
                        println!("No repairs needed.");
                    } else {
                        println!("Repairs ({}):", normalized.transforms.len());
                        for transform in &normalized.transforms {
                            println!("  {transform}");
                        }
                    }
                }
                Err(ValidationError::Invalid { issues }) => {
                    println!("Profile is invalid ({} issue(s)):", issues.len());
                    for issue in &issues {
                        println!("  [{}] {}", issue.path.join("."), issue.message);
                    }
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Batch { dir, out } => {
            let runner = BatchRunner::new(converter, config.batch.clone());
            let report = runner.run_dir(&dir)?;
            let stats = &report.stats;

            println!("Batch results for {}:", dir.display());
            println!(
                "  member parse errors:         {} ({:.2}%)",
                stats.member_parse_errors,
                rate(stats.member_parse_errors, stats.member_count)
            );
            println!(
                "  member conversion errors:    {} ({:.2}%)",
                stats.member_conversion_errors,
                rate(stats.member_conversion_errors, stats.member_count)
            );
            println!(
                "  nonmember parse errors:      {} ({:.2}%)",
                stats.nonmember_parse_errors,
                rate(stats.nonmember_parse_errors, stats.nonmember_count)
            );
            println!(
                "  nonmember conversion errors: {} ({:.2}%)",
                stats.nonmember_conversion_errors,
                rate(stats.nonmember_conversion_errors, stats.nonmember_count)
            );
            println!("  members:          {}", stats.member_count);
            println!("  non-members:      {}", stats.nonmember_count);
            println!("  active members:   {}", stats.active_member_count);
            println!("  inactive members: {}", stats.inactive_member_count);
            println!("  skipped:          {}", stats.skipped);
            println!("  unreadable:       {}", stats.unreadable);
            println!("  membership rows:  {}", report.memberships.len());

            if let Some(out) = out {
                report.write_json(&out)?;
                println!("Report written to {}", out.display());
            }
        }

        Commands::Rules { tier: Some(name) } => {
            let registry = RuleRegistry::builtin();
            let Some(rule) = registry.lookup(&name) else {
                miette::bail!("no rule for tier or certificate {name:?}");
            };
            let json = serde_json::to_string_pretty(rule).into_diagnostic()?;
            println!("{json}");
        }

        Commands::Rules { tier: None } => {
            let registry = RuleRegistry::builtin();
            let problems = registry.audit();
            for problem in &problems {
                tracing::warn!(%problem, "rule table problem");
            }
            let json = serde_json::to_string_pretty(&registry).into_diagnostic()?;
            println!("{json}");
            if !problems.is_empty() {
                miette::bail!("rule table has {} problem(s)", problems.len());
            }
        }
    }

    Ok(())
}

/// Percentage of `part` in `total`, zero when `total` is zero.
fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}
