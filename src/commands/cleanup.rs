use crate::output::UserOutput;
use tunnel_manager::TunnelManager;

pub async fn run_cleanup(manager: &TunnelManager, out: &dyn UserOutput) -> anyhow::Result<()> {
    let report = manager.cleanup_stale().await?;

    for (id, e) in &report.warnings {
        out.warning(&format!("Warning: could not probe {}: {}", id, e));
    }
    for record in &report.removed {
        out.status(&format!("  Removed {} (pod {})", record.id, record.pod_name));
    }

    if report.removed.is_empty() {
        out.success(&format!("No stale tunnels ({} active)", report.kept));
    } else {
        out.success(&format!(
            "Removed {} stale tunnel(s), {} still active",
            report.removed.len(),
            report.kept
        ));
    }
    Ok(())
}
