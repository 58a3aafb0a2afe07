//! # fie-estate
//!
//! Ties the trigger, execution and sunset state machines of each estate
//! together behind one [`Executor`].
//!
//! The executor keeps one [`Estate`] per principal, reads its injected
//! clock once per call, and after every accepted call persists the estate
//! ([`EstateStore`]), appends to the hash-chained audit log
//! (`fie_audit::AuditLog`) and notifies subscribers ([`EventDispatcher`]).
//!
//! ## Quick Example
//!
//! ```rust
//! use std::sync::Arc;
//! use fie_estate::Executor;
//! use fie_execution::InMemoryRegistry;
//! use fie_trigger::TriggerParams;
//! use fie_types::{Identity, ManualClock, Timestamp, SECONDS_PER_DAY};
//!
//! let clock = Arc::new(ManualClock::new(Timestamp::from_secs(0)));
//! let mut executor = Executor::new(clock.clone(), InMemoryRegistry::new());
//! let alice = Identity::new("alice").unwrap();
//!
//! executor
//!     .configure_trigger(&alice, &alice, TriggerParams::Deadman { interval_seconds: 30 * SECONDS_PER_DAY })
//!     .unwrap();
//! clock.advance(31 * SECONDS_PER_DAY);
//! executor.execute_deadman_switch(&Identity::new("anyone").unwrap(), &alice).unwrap();
//! assert!(executor.estate(&alice).unwrap().trigger.is_triggered());
//! ```

pub mod config;
pub mod error;
pub mod estate;
pub mod events;
pub mod executor;
pub mod store;

pub use config::{CliConfig, ExecutorConfig, FileConfig, LoggingConfig};
pub use error::EstateError;
pub use estate::Estate;
pub use events::{EstateEvent, EventDispatcher, LogSink, NotificationSink};
pub use executor::Executor;
pub use store::EstateStore;
