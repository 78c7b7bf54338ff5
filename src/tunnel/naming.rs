use super::ServiceKind;

/// Longest identity fragment kept in pod names and labels.
const MAX_IDENTITY_LEN: usize = 20;

/// Reduce a user name to a DNS-1123 / label-value safe fragment.
///
/// Lower-cases, maps anything outside `[a-z0-9]` to `-`, collapses runs of
/// `-`, trims them from both ends, and truncates. Falls back to `"unknown"`.
pub fn sanitize_identity(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let mut out: String = out.trim_matches('-').chars().take(MAX_IDENTITY_LEN).collect();
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        "unknown".to_string()
    } else {
        out
    }
}

/// Generate a relay pod name: `relay-<identity>-<service>-<6 hex>`.
///
/// The random suffix keeps concurrent sessions of the same user apart.
pub fn generate_pod_name(identity: &str, service: ServiceKind) -> String {
    use rand::Rng;

    let suffix: u32 = rand::thread_rng().gen_range(0..0x0100_0000);
    format!(
        "relay-{}-{}-{:06x}",
        sanitize_identity(identity),
        service.name(),
        suffix
    )
}
