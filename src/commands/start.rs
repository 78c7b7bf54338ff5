use crate::output::UserOutput;
use std::sync::Arc;
use tunnel_manager::backend::EndpointOptions;
use tunnel_manager::config::parse_duration_field;
use tunnel_manager::{StartOptions, TunnelManager};

pub async fn run_start(
    manager: &TunnelManager,
    service: &str,
    environment: &str,
    endpoint: EndpointOptions,
    timeout: Option<String>,
    out: Arc<dyn UserOutput>,
) -> anyhow::Result<()> {
    let mut options = StartOptions::new(endpoint);
    if let Some(timeout) = timeout {
        options = options.ready_timeout(parse_duration_field("--timeout", &timeout)?);
    }

    let ready_out = out.clone();
    let options = options.on_ready(move |record| {
        ready_out.finish_progress(" ready");
        ready_out.success(&format!(
            "Tunnel {} open: localhost:{} -> {}:{} (pod {})",
            record.id, record.local_port, record.remote_host, record.remote_port, record.pod_name
        ));
        ready_out.status("Press Ctrl+C to close the tunnel");
    });

    out.progress(&format!(
        "Starting relay for {} in {}...",
        service, environment
    ));
    match manager.start(service, environment, options).await {
        Ok(record) => {
            out.status(&format!("Tunnel {} closed", record.id));
            Ok(())
        }
        Err(e) => {
            out.finish_progress(" failed");
            Err(e.into())
        }
    }
}
