// mod.rs — Shared plumbing for subcommands.

pub mod audit;
pub mod exec;
pub mod sunset;
pub mod trigger;

use std::sync::Arc;

use anyhow::Context;
use fie_audit::AuditLog;
use fie_estate::{EstateStore, EventDispatcher, Executor, ExecutorConfig, LogSink};
use fie_execution::LoggingRegistry;
use fie_types::{Clock, Identity};

/// Everything a subcommand needs: where state lives, what time it is, and
/// who is calling.
pub struct Session {
    pub config: ExecutorConfig,
    clock: Arc<dyn Clock>,
    caller: Option<Identity>,
}

impl Session {
    pub fn new(
        config: ExecutorConfig,
        clock: Arc<dyn Clock>,
        caller: Option<String>,
    ) -> anyhow::Result<Self> {
        let caller = caller
            .map(|c| Identity::new(c).context("--as must not be empty"))
            .transpose()?;
        Ok(Self {
            config,
            clock,
            caller,
        })
    }

    /// The `--as` identity; required for calls that have no natural default.
    pub fn caller(&self) -> anyhow::Result<Identity> {
        self.caller
            .clone()
            .context("no caller identity: pass --as or set [cli] default_caller in .fie/config.toml")
    }

    /// The `--as` identity, or `fallback` when none was given.
    pub fn caller_or(&self, fallback: &Identity) -> Identity {
        self.caller.clone().unwrap_or_else(|| fallback.clone())
    }

    /// Open an executor over the project's `.fie/` state.
    pub fn executor(&self) -> anyhow::Result<Executor<LoggingRegistry>> {
        let store = EstateStore::new(&self.config.estates_dir)?;
        let audit = AuditLog::open(&self.config.audit_log)?;
        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_sink(Box::new(LogSink::new(&self.config.events_log)));

        Ok(Executor::new(self.clock.clone(), LoggingRegistry)
            .with_store(store)?
            .with_audit_log(audit)
            .with_dispatcher(dispatcher))
    }
}
