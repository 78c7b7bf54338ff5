//! Tunnel lifecycle: start, stop, stop-all, cleanup and listing.
//!
//! [`TunnelManager`] owns the registry and drives the collaborators from
//! [`crate::backend`] and [`crate::kube`]. Operations are split across
//! submodules by concern:
//!
//! - `lifecycle` creates, holds and tears down tunnels
//! - `cleanup` reconciles the registry against the cluster
//! - `listing` reports live status

mod builder;
mod cleanup;
mod core;
mod interrupt;
mod lifecycle;
mod listing;

pub use builder::TunnelManagerBuilder;
pub use cleanup::CleanupReport;
pub use core::{ReadyHook, StartOptions, TunnelManager};
pub use lifecycle::{StopOutcome, TeardownReport};
pub use listing::TunnelStatus;
