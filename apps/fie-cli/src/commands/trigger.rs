// trigger.rs — Trigger subcommands: configure, check-in, sign, verdict, fire, status.

use clap::Subcommand;
use fie_trigger::{TriggerConfig, TriggerParams, TriggerProgress};
use fie_types::{Identity, SECONDS_PER_DAY};

use super::Session;

#[derive(Subcommand)]
pub enum TriggerCommands {
    /// Fire after the principal stops checking in (principal only).
    ConfigureDeadman {
        principal: Identity,
        /// Check-in interval in days.
        #[arg(long, conflicts_with = "interval_secs", required_unless_present = "interval_secs")]
        interval_days: Option<u64>,
        /// Check-in interval in seconds.
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Fire once THRESHOLD distinct signers have signed (principal only).
    ConfigureQuorum {
        principal: Identity,
        /// Registered signer (repeatable).
        #[arg(long = "signer", required = true)]
        signers: Vec<Identity>,
        #[arg(long)]
        threshold: u32,
    },
    /// Fire once a majority of oracles report positively (principal only).
    ConfigureOracle {
        principal: Identity,
        /// Registered oracle (repeatable).
        #[arg(long = "oracle", required = true)]
        oracles: Vec<Identity>,
    },
    /// Reset the deadman timer (principal only).
    CheckIn { principal: Identity },
    /// Sign as a quorum member (`--as` is the signer).
    Sign { principal: Identity },
    /// Report an oracle verdict (`--as` is the oracle).
    Verdict {
        principal: Identity,
        /// Report a negative verdict instead of a positive one.
        #[arg(long)]
        negative: bool,
    },
    /// Fire a lapsed deadman switch. Anyone may call this.
    Fire { principal: Identity },
    /// Show the trigger state of an estate.
    Status { principal: Identity },
}

pub fn execute(cmd: &TriggerCommands, session: &Session) -> anyhow::Result<()> {
    let mut executor = session.executor()?;

    match cmd {
        TriggerCommands::ConfigureDeadman {
            principal,
            interval_days,
            interval_secs,
        } => {
            let interval_seconds = match (interval_days, interval_secs) {
                (Some(days), _) => days
                    .checked_mul(SECONDS_PER_DAY)
                    .ok_or_else(|| anyhow::anyhow!("--interval-days {} is too large", days))?,
                (None, Some(secs)) => *secs,
                (None, None) => anyhow::bail!("pass --interval-days or --interval-secs"),
            };
            let caller = session.caller_or(principal);
            let mode = executor.configure_trigger(
                &caller,
                principal,
                TriggerParams::Deadman { interval_seconds },
            )?;
            println!("Configured {} trigger for {}.", mode, principal);
            if let Some(due) = executor.estate(principal).and_then(|e| e.trigger.deadman_due_at()) {
                println!("Fires if no check-in by {}.", due);
            }
        }

        TriggerCommands::ConfigureQuorum {
            principal,
            signers,
            threshold,
        } => {
            let caller = session.caller_or(principal);
            let mode = executor.configure_trigger(
                &caller,
                principal,
                TriggerParams::Quorum {
                    signers: signers.clone(),
                    threshold: *threshold,
                },
            )?;
            println!(
                "Configured {} trigger for {}: {} of {} signers.",
                mode,
                principal,
                threshold,
                signers.len()
            );
        }

        TriggerCommands::ConfigureOracle { principal, oracles } => {
            let caller = session.caller_or(principal);
            let mode = executor.configure_trigger(
                &caller,
                principal,
                TriggerParams::Oracle {
                    oracles: oracles.clone(),
                },
            )?;
            println!(
                "Configured {} trigger for {} with {} oracle(s).",
                mode,
                principal,
                oracles.len()
            );
        }

        TriggerCommands::CheckIn { principal } => {
            let caller = session.caller_or(principal);
            executor.check_in(&caller, principal)?;
            if let Some(due) = executor.estate(principal).and_then(|e| e.trigger.deadman_due_at()) {
                println!("Checked in. Next deadline: {}.", due);
            }
        }

        TriggerCommands::Sign { principal } => {
            let signer = session.caller()?;
            let progress = executor.submit_signature(&signer, principal)?;
            print_progress(principal, progress);
        }

        TriggerCommands::Verdict {
            principal,
            negative,
        } => {
            let oracle = session.caller()?;
            let progress = executor.submit_oracle_verdict(&oracle, principal, !negative)?;
            print_progress(principal, progress);
        }

        TriggerCommands::Fire { principal } => {
            let caller = session.caller()?;
            let at = executor.execute_deadman_switch(&caller, principal)?;
            println!("Estate {} triggered at {}.", principal, at);
        }

        TriggerCommands::Status { principal } => {
            let Some(estate) = executor.estate(principal) else {
                println!("No estate for {}.", principal);
                return Ok(());
            };
            let trigger = &estate.trigger;
            println!("Principal: {}", principal);
            println!("State:     {}", trigger.state());
            println!("Mode:      {}", trigger.mode());
            match trigger.config() {
                Some(TriggerConfig::Deadman(d)) => {
                    println!("Interval:  {}s", d.interval_seconds);
                    println!("Last seen: {}", d.last_check_in);
                }
                Some(TriggerConfig::Quorum(q)) => {
                    println!(
                        "Signed:    {}/{} (of {} signers)",
                        q.collected.len(),
                        q.threshold,
                        q.signers.len()
                    );
                }
                Some(TriggerConfig::Oracle(o)) => {
                    println!(
                        "Verdicts:  {} positive, {} needed, {} reported",
                        o.positive_verdicts(),
                        o.required_verdicts(),
                        o.verdicts.len()
                    );
                }
                None => {}
            }
            if let Some(due) = trigger.deadman_due_at() {
                println!("Fires at:  {}", due);
            }
            if let Some(at) = trigger.trigger_timestamp() {
                println!("Triggered: {}", at);
            }
        }
    }

    Ok(())
}

fn print_progress(principal: &Identity, progress: TriggerProgress) {
    match progress {
        TriggerProgress::Pending { have, need } => {
            println!("Accepted for {}: {}/{}.", principal, have, need)
        }
        TriggerProgress::Triggered { at } => {
            println!("Accepted. Estate {} triggered at {}.", principal, at)
        }
    }
}
