use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancels a token on SIGINT (Ctrl+C) or SIGTERM.
///
/// The listener task is aborted when the guard drops, so handlers installed
/// for one `start` never outlive it.
pub(super) struct InterruptListener {
    handle: JoinHandle<()>,
}

impl InterruptListener {
    pub(super) fn install(cancel: CancellationToken) -> Self {
        let handle = tokio::spawn(async move {
            wait_for_signal().await;
            tracing::info!("interrupt received, tearing down tunnel");
            cancel.cancel();
        });
        Self { handle }
    }
}

impl Drop for InterruptListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!("Failed to create SIGTERM handler: {}", e);
            None
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
        _ = async {
            if let Some(ref mut s) = sigterm {
                s.recv().await
            } else {
                std::future::pending::<Option<()>>().await
            }
        } => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
