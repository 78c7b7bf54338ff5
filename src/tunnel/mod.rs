//! Tunnel identity: supported service kinds, environments, keys and records.

mod kind;
mod naming;
mod record;

pub use kind::ServiceKind;
pub use naming::{generate_pod_name, sanitize_identity};
pub use record::{tunnel_id, Environment, TunnelKey, TunnelRecord, TunnelState};
