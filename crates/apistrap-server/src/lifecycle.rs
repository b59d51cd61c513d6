//! Startup/shutdown hooks and the shutdown signal.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use apistrap_core::error::Result;

use crate::app_state::AppState;

/// Application lifecycle hook. Both methods default to no-ops.
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    /// Runs before the listener starts serving. An error aborts startup.
    async fn on_startup(&self, _state: &AppState) -> Result<()> {
        Ok(())
    }

    /// Runs after the server stopped. Errors are logged; remaining hooks
    /// still run.
    async fn on_shutdown(&self, _state: &AppState) -> Result<()> {
        Ok(())
    }
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
    tracing::info!("signal received, starting graceful shutdown");
}

/// Waits for `signal`, flips readiness to `draining`, then keeps the
/// listener open for `hold`.
pub(crate) async fn drain<F>(state: AppState, signal: F, hold: Duration)
where
    F: Future<Output = ()>,
{
    signal.await;
    state.set_draining();
    tracing::info!(drain_secs = hold.as_secs(), "draining");
    tokio::time::sleep(hold).await;
}

pub(crate) async fn run_startup(hooks: &[Arc<dyn LifecycleHook>], state: &AppState) -> Result<()> {
    for hook in hooks {
        hook.on_startup(state).await?;
    }
    Ok(())
}

pub(crate) async fn run_shutdown(hooks: &[Arc<dyn LifecycleHook>], state: &AppState) {
    for hook in hooks {
        if let Err(e) = hook.on_shutdown(state).await {
            tracing::error!(error = %e, "shutdown hook failed");
        }
    }
}
