//! Event-to-alert decision engine
//!
//! This crate decides which controller events become notifications:
//!
//! - [`Classifier`] applies the status rule and the per-class
//!   [`ValueRule`]s against the tracked node state
//! - [`SuppressionTracker`] swallows repeated notification states for a
//!   while after they were reported
//! - [`AlertEngine`] subscribes to the event bus and feeds the classifier,
//!   handing alerts to the notifier

mod classifier;
mod directory;
mod dispatcher;
pub mod rules;
mod suppression;

pub use classifier::Classifier;
pub use directory::{NodeDirectory, NodeRegistry};
pub use dispatcher::{AlertEngine, STARTED_MESSAGE, STOPPED_MESSAGE};
pub use rules::{default_rules, AlertPolicy, Finding, RuleContext, ValueRule, IDLE};
pub use suppression::{SuppressionTracker, DEFAULT_WINDOW_TTL};
