//! Pass scheduling
//!
//! A single trigger channel drives the reconciler. Startup pushes one initial
//! request; after that the only trigger is the requeue each pass returns.

use crate::reconciler::{reconcile, Context, ReconcileRequest};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Drive passes until `shutdown` resolves. Shutdown is only observed between passes.
pub async fn run<F>(ctx: Arc<Context>, ready: Arc<AtomicBool>, shutdown: F)
where
    F: Future<Output = ()>,
{
    let (tx, mut rx) = mpsc::channel::<ReconcileRequest>(1);

    // Kick off the first pass
    if tx.try_send(ReconcileRequest::Initial).is_err() {
        error!("Failed to enqueue initial reconcile request");
        return;
    }

    tokio::pin!(shutdown);

    loop {
        let request = tokio::select! {
            _ = &mut shutdown => {
                info!("Scheduler shutting down");
                break;
            }
            request = rx.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        let after = reconcile(request, ctx.clone()).await.after;
        ready.store(true, Ordering::SeqCst);

        debug!(after_secs = after.as_secs(), "Requeueing reconcile");
        let tx = tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(ReconcileRequest::Requeue).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ManagedResourceInstance, ResourceKind};
    use crate::listing::ResourceLister;
    use crate::providers::ProviderRegistry;
    use async_trait::async_trait;
    use cro_common::CroError;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingLister {
        calls: Mutex<Vec<(ResourceKind, tokio::time::Instant)>>,
    }

    #[async_trait]
    impl ResourceLister for CountingLister {
        async fn list(&self, kind: ResourceKind) -> cro_common::Result<Vec<ManagedResourceInstance>> {
            self.calls.lock().push((kind, tokio::time::Instant::now()));
            Err(CroError::list_failed(kind.as_str(), "unreachable"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_kick_then_fixed_cadence() {
        let lister = Arc::new(CountingLister::default());
        let ctx = Arc::new(
            Context::new(
                lister.clone(),
                ProviderRegistry::new(),
                Duration::from_secs(600),
                Duration::from_secs(5),
            )
            .unwrap(),
        );
        let ready = Arc::new(AtomicBool::new(false));
        let start = tokio::time::Instant::now();

        run(
            ctx,
            ready.clone(),
            tokio::time::sleep(Duration::from_secs(1250)),
        )
        .await;

        let calls = lister.calls.lock();
        // Passes at 0s, 600s and 1200s, each listing both kinds
        assert_eq!(calls.len(), 6);
        let pass_starts: Vec<u64> = calls
            .iter()
            .filter(|(kind, _)| *kind == ResourceKind::Redis)
            .map(|(_, at)| at.duration_since(start).as_secs())
            .collect();
        assert_eq!(pass_starts, vec![0, 600, 1200]);
        assert!(ready.load(Ordering::SeqCst));
    }
}
