use crate::output::UserOutput;
use tunnel_manager::{StopOutcome, TunnelManager};

pub async fn run_stop(
    manager: &TunnelManager,
    service: &str,
    environment: &str,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    match manager.stop(service, environment).await? {
        StopOutcome::NotFound => {
            out.status(&format!("No tunnel for {} in {}", service, environment));
        }
        StopOutcome::Stopped { record, warning } => {
            if let Some(e) = warning {
                out.warning(&format!(
                    "Warning: failed to delete relay pod {}: {}",
                    record.pod_name, e
                ));
            }
            out.success(&format!("Stopped tunnel {}", record.id));
        }
    }
    Ok(())
}

pub async fn run_stop_all(manager: &TunnelManager, out: &dyn UserOutput) -> anyhow::Result<()> {
    if manager.registry().is_empty() {
        out.status("No active tunnels");
        return Ok(());
    }

    out.status("Stopping all tunnels...");
    let report = manager.stop_all().await?;
    for record in &report.stopped {
        out.status(&format!("  Stopped {}", record.id));
    }
    for (record, e) in &report.failed {
        out.warning(&format!(
            "  Warning: failed to delete relay pod {} for {}: {}",
            record.pod_name, record.id, e
        ));
    }

    out.success(&format!(
        "Stopped {} tunnel(s)",
        report.stopped.len() + report.failed.len()
    ));
    Ok(())
}
