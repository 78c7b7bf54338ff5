//! Kubernetes access through the kubectl CLI.
//!
//! Provides the shared [`KubectlClient`], its structured [`KubectlError`], and
//! the relay pod controller built on top of them.

pub mod client;
pub mod error;
pub mod pod;

pub use client::{KubectlClient, DEFAULT_KUBECTL_TIMEOUT};
pub use error::KubectlError;
pub use pod::{KubectlPodController, PodPhase, RelayPodController, RelayPodSpec, DEFAULT_RELAY_IMAGE};
