// audit.rs — Audit subcommands: verify, tail.

use clap::Subcommand;
use fie_audit::{AuditError, AuditLog};

use super::Session;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Verify the audit log hash chain integrity.
    Verify {
        /// Path to audit log (defaults to .fie/audit.jsonl).
        #[arg(long)]
        log: Option<String>,
    },
    /// Show recent audit events.
    Tail {
        /// Path to audit log (defaults to .fie/audit.jsonl).
        #[arg(long)]
        log: Option<String>,
        /// Only events for this principal.
        #[arg(long)]
        principal: Option<String>,
        /// Number of events to show.
        #[arg(short, default_value = "10")]
        n: usize,
    },
}

pub fn execute(cmd: &AuditCommands, session: &Session) -> anyhow::Result<()> {
    match cmd {
        AuditCommands::Verify { log } => {
            let path = log
                .as_ref()
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|| session.config.audit_log.clone());

            if !path.exists() {
                println!("No audit log found at {}", path.display());
                return Ok(());
            }

            match AuditLog::verify_chain(&path) {
                Ok(count) => {
                    println!("Audit log verified: {} event(s), hash chain intact.", count);
                }
                Err(AuditError::IntegrityViolation {
                    line,
                    expected,
                    actual,
                }) => {
                    println!("INTEGRITY VIOLATION at line {}:", line);
                    println!("  Expected previous_hash: {}", expected);
                    println!("  Actual previous_hash:   {}", actual);
                    println!();
                    println!("The audit log may have been tampered with.");
                    anyhow::bail!("Audit log integrity check failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        AuditCommands::Tail { log, principal, n } => {
            let path = log
                .as_ref()
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|| session.config.audit_log.clone());

            if !path.exists() {
                println!("No audit log found at {}", path.display());
                return Ok(());
            }

            let events = match principal {
                Some(p) => AuditLog::read_for_principal(&path, p)?,
                None => AuditLog::read_all(&path)?,
            };
            let start = events.len().saturating_sub(*n);
            let recent = &events[start..];

            if recent.is_empty() {
                println!("No audit events.");
                return Ok(());
            }

            println!(
                "{:<20} {:<14} {:<14} {:<20} DETAILS",
                "TIMESTAMP", "ACTOR", "PRINCIPAL", "ACTION"
            );
            println!("{}", "-".repeat(90));

            for event in recent {
                let details = if event.metadata.is_null() {
                    "-".to_string()
                } else {
                    event.metadata.to_string()
                };
                println!(
                    "{:<20} {:<14} {:<14} {:<20} {}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.actor,
                    event.principal,
                    serde_json::to_value(event.action)?
                        .as_str()
                        .unwrap_or("-"),
                    details,
                );
            }
        }
    }

    Ok(())
}
