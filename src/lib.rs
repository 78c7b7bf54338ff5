#![allow(unused_assignments)]

//! # Tunnel Manager
//!
//! Opens temporary TCP tunnels from a developer machine to private backends
//! (databases, caches, message brokers, search clusters) that are only
//! reachable from inside a Kubernetes cluster.
//!
//! Each tunnel is a short-lived relay pod running `socat`, plus a
//! `kubectl port-forward` session bridging a fixed local port to it. Active
//! tunnels are tracked in a small JSON registry so other invocations can list,
//! stop and reconcile them.
//!
//! ## Features
//!
//! - **Idempotent start**: at most one tunnel per `(service, environment)`
//! - **Clean teardown**: the pod and the registry entry are removed exactly
//!   once when the session ends or is interrupted
//! - **Reconciliation**: `cleanup` drops entries whose pod has disappeared
//! - **Pluggable backends**: context switching, endpoint resolution, port
//!   allocation and identity are traits with config-backed defaults
//!
//! ## Quick Start
//!
//! ```no_run
//! use tunnel_manager::{Parser, StartOptions, TunnelManager};
//!
//! # async fn example() -> Result<(), tunnel_manager::Error> {
//! let config = Parser::new().load(None)?;
//! let manager = TunnelManager::from_config(config)?;
//!
//! // Blocks until Ctrl+C; the relay pod and the registry entry are removed.
//! let record = manager.start("db", "dev", StartOptions::default()).await?;
//! println!("closed {}", record.id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! One process per command invocation, each with its own tokio runtime:
//! - The registry is guarded by an in-process read/write lock and written
//!   through to disk on every mutation
//! - The forwarding session ends on Ctrl+C/SIGTERM via a `CancellationToken`
//! - The registry file has no cross-process lock; concurrent writers from
//!   separate invocations can lose updates

pub mod backend;
pub mod config;
pub mod error;
pub mod kube;
pub mod manager;
pub mod registry;
pub mod tunnel;

// Re-export commonly used types
pub use config::{Config, Parser};
pub use error::{Error, Result};
pub use manager::{StartOptions, StopOutcome, TunnelManager};
pub use registry::TunnelRegistry;
pub use tunnel::{ServiceKind, TunnelRecord};
