//! Tokio runtime ownership plus a shared cancellation token.
//!
//! Caption resolution is cooperative and strictly sequential, so the default
//! flavor is a current-thread runtime. The token handed out by
//! [`FactlensHandle::cancellation`] is what every fetch attempt observes.
use anyhow::Result;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct FactlensHandle {
    inner: Handle,
    cancel: CancellationToken,
}

pub struct FactlensRuntime {
    runtime: Runtime,
    cancel: CancellationToken,
}

impl FactlensRuntime {
    /// Build the current-thread Tokio runtime the Factlens binary runs on.
    ///
    /// ```
    /// use factlens_runtime::FactlensRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = FactlensRuntime::build("doctest-runtime")
    ///     .expect("runtime builds");
    /// let value = runtime.block_on(async { 2 + 2 });
    /// assert_eq!(value, 4);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn build(thread_name: &str) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .thread_name(thread_name)
            .build()?;
        Ok(Self {
            runtime,
            cancel: CancellationToken::new(),
        })
    }

    /// Obtain a cloned handle for spawning tasks and sharing cancellation.
    ///
    /// ```
    /// use factlens_runtime::FactlensRuntime;
    ///
    /// let runtime = FactlensRuntime::build("handle-example").unwrap();
    /// let handle = runtime.handle();
    /// assert!(!handle.cancellation().is_cancelled());
    /// ```
    pub fn handle(&self) -> FactlensHandle {
        FactlensHandle {
            inner: self.runtime.handle().clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Run a future to completion on the runtime.
    pub fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Cancel outstanding work and shut the runtime down gracefully.
    pub fn shutdown(self, graceful: std::time::Duration) {
        self.cancel.cancel();
        self.runtime.shutdown_timeout(graceful);
    }
}

impl FactlensHandle {
    /// Spawn a future onto the shared runtime handle.
    ///
    /// ```
    /// use factlens_runtime::FactlensRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = FactlensRuntime::build("handle-doctest").unwrap();
    /// let handle = runtime.handle();
    /// let task = handle.spawn(async { 21 * 2 });
    /// let result = runtime.block_on(async move { task.await.unwrap() });
    /// assert_eq!(result, 42);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn spawn<F, T>(&self, fut: F) -> JoinHandle<T>
    where
        F: std::future::Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.inner.spawn(fut)
    }

    /// Clone the shared cancellation token to coordinate shutdown.
    ///
    /// ```
    /// use factlens_runtime::FactlensRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = FactlensRuntime::build("cancel-example").unwrap();
    /// let cancel = runtime.handle().cancellation();
    /// cancel.cancel();
    /// assert!(cancel.is_cancelled());
    /// runtime.shutdown(Duration::from_millis(5));
    /// ```
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the shared token when the process receives Ctrl-C.
    pub fn cancel_on_ctrl_c(&self) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        self.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                res = tokio::signal::ctrl_c() => {
                    if res.is_ok() {
                        cancel.cancel();
                    }
                }
            }
        })
    }
}
