// sunset.rs — Sunset subcommands: initiate, archive, transition, cluster,
// complete, emergency, due, status.

use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};
use fie_audit::hasher::hash_file;
use fie_sunset::{sunset_due_at, PostSunsetLicense};
use fie_types::{AssetId, Identity};

use super::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LicenseArg {
    /// CC0 1.0, public domain dedication.
    Cc0,
    /// CC BY 4.0.
    CcBy,
    /// CC BY-SA 4.0.
    CcBySa,
}

impl From<LicenseArg> for PostSunsetLicense {
    fn from(arg: LicenseArg) -> Self {
        match arg {
            LicenseArg::Cc0 => PostSunsetLicense::PublicDomain,
            LicenseArg::CcBy => PostSunsetLicense::Attribution,
            LicenseArg::CcBySa => PostSunsetLicense::AttributionShareAlike,
        }
    }
}

#[derive(Subcommand)]
pub enum SunsetCommands {
    /// Start the sunset once the 20-year horizon has passed.
    Initiate { principal: Identity },
    /// Archive the estate's assets in one batch.
    Archive {
        principal: Identity,
        /// Asset id (repeatable, in order).
        #[arg(long = "asset")]
        assets: Vec<String>,
        /// Archive URI for each asset (repeatable, in order).
        #[arg(long = "uri")]
        uris: Vec<String>,
        /// Content hash for each asset (repeatable, in order).
        #[arg(long = "hash", conflicts_with = "files")]
        hashes: Vec<String>,
        /// Hash these files instead of passing --hash (repeatable, in order).
        #[arg(long = "file")]
        files: Vec<PathBuf>,
    },
    /// Record the post-sunset license.
    Transition {
        principal: Identity,
        #[arg(long, value_enum, default_value = "cc0")]
        license: LicenseArg,
    },
    /// Attach the estate to a legacy cluster.
    Cluster { principal: Identity, cluster_id: String },
    /// Finish the sunset.
    Complete { principal: Identity },
    /// Start the sunset on anyone's behalf; forces a public-domain license.
    Emergency { principal: Identity },
    /// Report whether the sunset horizon has passed.
    Due { principal: Identity },
    /// Show the sunset state of an estate.
    Status { principal: Identity },
}

pub fn execute(cmd: &SunsetCommands, session: &Session) -> anyhow::Result<()> {
    let mut executor = session.executor()?;

    match cmd {
        SunsetCommands::Initiate { principal } => {
            let caller = session.caller()?;
            executor.initiate_sunset(&caller, principal)?;
            println!("Sunset initiated for {}.", principal);
        }

        SunsetCommands::Archive {
            principal,
            assets,
            uris,
            hashes,
            files,
        } => {
            let caller = session.caller()?;
            let content_hashes = if files.is_empty() {
                hashes.clone()
            } else {
                files
                    .iter()
                    .map(|f| hash_file(f))
                    .collect::<Result<Vec<_>, _>>()?
            };
            let asset_ids = assets.iter().cloned().map(AssetId).collect();
            executor.archive_assets(&caller, principal, asset_ids, uris.clone(), content_hashes)?;
            println!("Archived {} asset(s) for {}.", assets.len(), principal);
        }

        SunsetCommands::Transition { principal, license } => {
            let caller = session.caller()?;
            let requested = PostSunsetLicense::from(*license);
            let applied = executor.transition_ip(&caller, principal, requested)?;
            if applied != requested {
                println!(
                    "Requested {} but emergency sunset locks the license to {}.",
                    requested, applied
                );
            }
            println!(
                "IP for {} transitioned under {} (code {}).",
                principal,
                applied,
                applied.code()
            );
        }

        SunsetCommands::Cluster {
            principal,
            cluster_id,
        } => {
            let caller = session.caller()?;
            executor.cluster_legacy(&caller, principal, cluster_id)?;
            println!("Legacy of {} clustered into {}.", principal, cluster_id);
        }

        SunsetCommands::Complete { principal } => {
            let caller = session.caller()?;
            executor.complete_sunset(&caller, principal)?;
            println!("Sunset complete for {}.", principal);
        }

        SunsetCommands::Emergency { principal } => {
            let caller = session.caller()?;
            executor.emergency_sunset(&caller, principal)?;
            println!(
                "Emergency sunset initiated for {} by {}; license locked to public domain.",
                principal, caller
            );
        }

        SunsetCommands::Due { principal } => {
            let due = executor.is_sunset_due(principal)?;
            let horizon = executor
                .estate(principal)
                .and_then(|e| e.trigger_timestamp())
                .map(sunset_due_at);
            match (due, horizon) {
                (true, _) => println!("Sunset is due for {}.", principal),
                (false, Some(at)) => println!("Sunset for {} is due at {}.", principal, at),
                (false, None) => println!("{} has not been triggered.", principal),
            }
        }

        SunsetCommands::Status { principal } => {
            let Some(estate) = executor.estate(principal) else {
                println!("No estate for {}.", principal);
                return Ok(());
            };
            let sunset = &estate.sunset;
            let [initiated, archived, transitioned, clustered, completed] = sunset.flags();
            println!("Principal:    {}", principal);
            println!("Stage:        {}", sunset.stage());
            println!("Initiated:    {}", initiated);
            println!("Archived:     {} ({} assets)", archived, sunset.archived().len());
            println!("Transitioned: {}", transitioned);
            println!("Clustered:    {}", clustered);
            println!("Completed:    {}", completed);
            println!(
                "License:      {} (code {})",
                sunset.post_sunset_license(),
                sunset.post_sunset_license().code()
            );
            if let Some(at) = sunset.sunset_timestamp() {
                println!("Sunset at:    {}", at);
            }
            if let Some(cluster) = sunset.cluster_id() {
                println!("Cluster:      {}", cluster);
            }
            if let Some(caller) = sunset.emergency_caller() {
                println!("Emergency by: {}", caller);
            }
        }
    }

    Ok(())
}
