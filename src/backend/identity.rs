use crate::tunnel::sanitize_identity;

/// Who is opening tunnels; used in pod names and ownership labels.
pub trait IdentityProvider: Send + Sync {
    /// Short, lower-case ASCII name safe for pod names and label values.
    fn current_identity(&self) -> String;
}

/// Identity from the login environment (`USER`, `USERNAME`, `LOGNAME`).
#[derive(Debug, Clone, Default)]
pub struct EnvIdentity;

impl IdentityProvider for EnvIdentity {
    fn current_identity(&self) -> String {
        let raw = ["USER", "USERNAME", "LOGNAME"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
            .unwrap_or_default();
        sanitize_identity(&raw)
    }
}
