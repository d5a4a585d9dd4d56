use tokio::signal;
use tokio::sync::watch;

pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

/// Fan-out flag for background loops; flips to `true` once and stays there.
#[derive(Clone)]
pub(crate) struct ShutdownFlag {
    rx: watch::Receiver<bool>,
}

pub(crate) struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

pub(crate) fn channel() -> (ShutdownTrigger, ShutdownFlag) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownFlag { rx })
}

impl ShutdownTrigger {
    pub(crate) fn fire(&self) {
        if self.tx.send(true).is_err() {
            tracing::warn!("No background task is listening for shutdown");
        }
    }
}

impl ShutdownFlag {
    pub(crate) fn is_set(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown was requested or the trigger was dropped.
    pub(crate) async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
