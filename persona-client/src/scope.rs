use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Lifetime of a view that issues backend calls.
///
/// Calls run to completion on their own task, so the tracker still applies
/// whatever the backend confirmed. Once the scope is detached the view just
/// stops receiving results.
#[derive(Clone, Debug, Default)]
pub struct ViewScope {
    token: CancellationToken,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detach(&self) {
        self.token.cancel();
    }

    pub fn is_detached(&self) -> bool {
        self.token.is_cancelled()
    }

    /// `None` if the scope was detached before the call finished.
    pub async fn run<F, T>(&self, call: F) -> Option<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.is_detached() {
            return None;
        }
        let handle = tokio::spawn(call);
        tokio::select! {
            _ = self.token.cancelled() => {
                debug!("view detached, result of in-flight call will be ignored");
                None
            }
            joined = handle => match joined {
                Ok(value) if !self.is_detached() => Some(value),
                Ok(_) => None,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(_) => None,
            },
        }
    }
}
