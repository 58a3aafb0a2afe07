// exec.rs — Execution subcommands: activate, action, license, fund,
// distribute, sunset-request, log.
//
// Corpus resolution runs outside this tool; its answer is passed in with
// `--confidence` and `--cite` and replayed through a StaticResolver.

use clap::{Args, Subcommand};
use fie_execution::{ActionRecord, CorpusRef, LicenseTerms, SideEffect, StaticResolver};
use fie_types::{Amount, AssetId, Identity};

use super::Session;

/// The resolver's answer for this request.
#[derive(Args)]
pub struct ResolutionArgs {
    /// Goal description evaluated against the corpus.
    #[arg(long)]
    goal: String,
    /// Frozen corpus snapshot the goal was resolved against.
    #[arg(long)]
    corpus: String,
    /// Resolver confidence, 0-100. 95 or more authorizes.
    #[arg(long)]
    confidence: u8,
    /// Corpus citation supporting the answer (repeatable).
    #[arg(long = "cite")]
    citations: Vec<String>,
}

impl ResolutionArgs {
    fn resolver(&self) -> StaticResolver {
        StaticResolver::new(self.confidence, self.citations.clone())
    }

    fn corpus(&self) -> CorpusRef {
        CorpusRef(self.corpus.clone())
    }
}

#[derive(Subcommand)]
pub enum ExecCommands {
    /// Activate execution for a triggered estate.
    Activate { principal: Identity },
    /// Submit a free-form action.
    Action {
        principal: Identity,
        /// Action category (e.g. "publish", "archive").
        #[arg(long = "type")]
        action_type: String,
        #[command(flatten)]
        resolution: ResolutionArgs,
    },
    /// Issue a license on a registered asset.
    License {
        principal: Identity,
        #[arg(long)]
        asset: String,
        #[arg(long)]
        licensee: Identity,
        /// Royalty in basis points (10000 = 100%).
        #[arg(long)]
        royalty_bps: u16,
        #[arg(long)]
        duration_secs: u64,
        #[command(flatten)]
        resolution: ResolutionArgs,
    },
    /// Fund a project from the estate.
    Fund {
        principal: Identity,
        #[arg(long)]
        recipient: Identity,
        #[arg(long)]
        amount: Amount,
        #[command(flatten)]
        resolution: ResolutionArgs,
    },
    /// Distribute revenue to a beneficiary.
    Distribute {
        principal: Identity,
        #[arg(long)]
        recipient: Identity,
        #[arg(long)]
        amount: Amount,
        #[command(flatten)]
        resolution: ResolutionArgs,
    },
    /// Hand the estate over to the sunset protocol once the horizon passes.
    SunsetRequest { principal: Identity },
    /// Show the action log.
    Log {
        principal: Identity,
        /// Number of records to show.
        #[arg(short, default_value = "20")]
        n: usize,
    },
}

pub fn execute(cmd: &ExecCommands, session: &Session) -> anyhow::Result<()> {
    let mut executor = session.executor()?;

    match cmd {
        ExecCommands::Activate { principal } => {
            let caller = session.caller()?;
            executor.activate_execution(&caller, principal)?;
            println!("Execution active for {}.", principal);
        }

        ExecCommands::Action {
            principal,
            action_type,
            resolution,
        } => {
            let caller = session.caller()?;
            let record = executor.execute_action(
                &caller,
                principal,
                action_type,
                &resolution.goal,
                &resolution.corpus(),
                &resolution.resolver(),
            )?;
            print_record(&record);
        }

        ExecCommands::License {
            principal,
            asset,
            licensee,
            royalty_bps,
            duration_secs,
            resolution,
        } => {
            let caller = session.caller()?;
            let terms = LicenseTerms {
                asset_id: AssetId(asset.clone()),
                licensee: licensee.clone(),
                royalty_bps: *royalty_bps,
                duration_secs: *duration_secs,
            };
            let record = executor.issue_license(
                &caller,
                principal,
                terms,
                &resolution.goal,
                &resolution.corpus(),
                &resolution.resolver(),
            )?;
            print_record(&record);
        }

        ExecCommands::Fund {
            principal,
            recipient,
            amount,
            resolution,
        } => {
            let caller = session.caller()?;
            let record = executor.fund_project(
                &caller,
                principal,
                recipient.clone(),
                *amount,
                &resolution.goal,
                &resolution.corpus(),
                &resolution.resolver(),
            )?;
            print_record(&record);
        }

        ExecCommands::Distribute {
            principal,
            recipient,
            amount,
            resolution,
        } => {
            let caller = session.caller()?;
            let record = executor.distribute_revenue(
                &caller,
                principal,
                recipient.clone(),
                *amount,
                &resolution.goal,
                &resolution.corpus(),
                &resolution.resolver(),
            )?;
            print_record(&record);
        }

        ExecCommands::SunsetRequest { principal } => {
            let caller = session.caller()?;
            executor.activate_sunset(&caller, principal)?;
            println!("Execution for {} handed over to sunset.", principal);
        }

        ExecCommands::Log { principal, n } => {
            let Some(estate) = executor.estate(principal) else {
                println!("No estate for {}.", principal);
                return Ok(());
            };
            let log = estate.execution.action_log();
            println!(
                "Phase: {}  Distributed: {}  Records: {}",
                estate.execution.phase(),
                estate.execution.total_distributed(),
                log.len()
            );
            let start = log.len().saturating_sub(*n);
            let recent = &log[start..];
            if recent.is_empty() {
                return Ok(());
            }

            println!(
                "{:<24} {:<20} {:<5} {:<10} DESCRIPTION",
                "TIMESTAMP", "ACTION", "CONF", "AUTHORIZED"
            );
            println!("{}", "-".repeat(80));
            for record in recent {
                println!(
                    "{:<24} {:<20} {:<5} {:<10} {}",
                    record.timestamp.to_string(),
                    record.action_type(),
                    record.confidence_score,
                    if record.authorized { "yes" } else { "no" },
                    record.description,
                );
            }
        }
    }

    Ok(())
}

fn print_record(record: &ActionRecord) {
    let verdict = if record.authorized {
        "AUTHORIZED"
    } else {
        "NOT AUTHORIZED"
    };
    println!(
        "{} {} (confidence {}, outcome {:?})",
        verdict,
        record.action_type(),
        record.confidence_score,
        record.outcome
    );
    for citation in &record.citation_refs {
        println!("  cites {}", citation);
    }
    match &record.side_effect {
        Some(SideEffect::LicensePending) => println!("  license pending; registry outcome unknown"),
        Some(SideEffect::LicenseIssued { license_id }) => println!("  license {}", license_id),
        Some(SideEffect::Disbursed { recipient, amount }) => {
            println!("  disbursed {} to {}", amount, recipient)
        }
        Some(SideEffect::RegistryFailed { reason }) => println!("  registry call failed: {}", reason),
        None => {}
    }
}
