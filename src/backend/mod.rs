//! Collaborators the lifecycle manager consumes through narrow traits.
//!
//! - [`ContextSwitcher`]: point kubectl at the environment's cluster
//! - [`EndpointResolver`]: backend host/port for a service in an environment
//! - [`PortAllocator`]: fixed local port for a service in an environment
//! - [`IdentityProvider`]: short caller name for pod names and labels
//!
//! The default implementations read the YAML config and shell out to kubectl.
//! Tests substitute in-memory fakes.

mod context;
mod endpoint;
mod identity;
mod ports;

pub use context::{ContextSwitcher, KubectlContextSwitcher};
pub use endpoint::{ConfigEndpointResolver, Endpoint, EndpointOptions, EndpointResolver};
pub use identity::{EnvIdentity, IdentityProvider};
pub use ports::{ConfigPortAllocator, PortAllocator};
