use crate::error::{is_pid_alive, Result};
use crate::kube::PodPhase;
use crate::tunnel::TunnelRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::core::TunnelManager;

/// A registry entry together with what is currently true about it.
#[derive(Debug, Clone, Serialize)]
pub struct TunnelStatus {
    #[serde(flatten)]
    pub record: TunnelRecord,
    /// Live pod phase; `Unknown` when the probe failed
    pub phase: PodPhase,
    /// Whether the process holding the session is still running, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_alive: Option<bool>,
}

impl TunnelManager {
    /// Every record with a live probe of its pod, sorted by id.
    pub async fn list_entries(&self) -> Vec<TunnelStatus> {
        let mut entries = Vec::new();
        for record in self.registry.list() {
            let phase = match self.probe_phase(&record).await {
                Ok(phase) => phase,
                Err(e) => {
                    tracing::debug!("probing {} failed: {}", record.pod_name, e);
                    PodPhase::Unknown
                }
            };
            let session_alive = record.pid.map(is_pid_alive);
            entries.push(TunnelStatus {
                record,
                phase,
                session_alive,
            });
        }
        entries
    }

    /// Human-readable table of active tunnels.
    pub async fn list(&self) -> Result<String> {
        let entries = self.list_entries().await;
        Ok(render_table(&entries, Utc::now()))
    }

    async fn probe_phase(&self, record: &TunnelRecord) -> Result<PodPhase> {
        self.contexts.ensure_context(&record.environment).await?;
        self.pods.phase(&record.pod_name).await
    }
}

const HEADERS: [&str; 7] = ["ID", "LOCAL", "REMOTE", "POD", "STATUS", "SESSION", "AGE"];

pub(crate) fn render_table(entries: &[TunnelStatus], now: DateTime<Utc>) -> String {
    if entries.is_empty() {
        return "No active tunnels".to_string();
    }

    let rows: Vec<[String; 7]> = entries
        .iter()
        .map(|entry| {
            let r = &entry.record;
            [
                r.id.clone(),
                format!("localhost:{}", r.local_port),
                format!("{}:{}", r.remote_host, r.remote_port),
                r.pod_name.clone(),
                entry.phase.to_string(),
                match entry.session_alive {
                    Some(true) => "alive".to_string(),
                    Some(false) => "dead".to_string(),
                    None => "-".to_string(),
                },
                format_age(now.signed_duration_since(r.started_at)),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: &[&str]| {
        let line = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    };

    push_row(&HEADERS);
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        push_row(&cells);
    }
    out.trim_end().to_string()
}

fn format_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h{}m", s / 3600, (s % 3600) / 60),
        s => format!("{}d{}h", s / 86_400, (s % 86_400) / 3600),
    }
}
