//! Event-Loop Pool
//!
//! The shared set of I/O worker threads every listener runs its readers on.
//! Built once per process; listeners receive a cheap, cloneable
//! [`EventLoopHandle`] and never configure threads themselves.
//!
//! # Selector
//!
//! `native` binds one `SO_REUSEPORT` socket per worker thread so the kernel
//! spreads datagrams across readers. It is only load-balanced on Linux, so
//! `auto` and `native` resolve to `portable` (one socket) everywhere else.

use crate::EventLoopError;
use sluice_config::{BufferStrategy, EventLoopConfig, SelectorKind};
use std::future::Future;
use std::time::Duration;
use tokio::runtime::{Builder, EnterGuard, Handle, Runtime};
use tokio::task::JoinHandle;

const THREAD_NAME: &str = "sluice-io";

/// Selector after platform resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// One socket per listener
    Portable,
    /// One `SO_REUSEPORT` socket per worker thread
    Native,
}

impl Selector {
    /// Whether this platform load-balances `SO_REUSEPORT` UDP sockets
    pub const fn native_supported() -> bool {
        cfg!(any(target_os = "linux", target_os = "android"))
    }

    /// Resolve a configured selector against the platform
    pub const fn resolve(kind: SelectorKind) -> Self {
        match kind {
            SelectorKind::Portable => Self::Portable,
            SelectorKind::Auto | SelectorKind::Native => {
                if Self::native_supported() {
                    Self::Native
                } else {
                    Self::Portable
                }
            }
        }
    }
}

/// Process-wide pool of I/O workers
///
/// Either owns a multi-threaded runtime ([`EventLoopPool::new`]) or wraps
/// the runtime the caller is already on ([`EventLoopPool::current`]).
pub struct EventLoopPool {
    runtime: Option<Runtime>,
    handle: EventLoopHandle,
}

impl EventLoopPool {
    /// Build a pool with its own worker threads
    pub fn new(config: &EventLoopConfig) -> Result<Self, EventLoopError> {
        if config.worker_threads == 0 {
            return Err(EventLoopError::NoWorkers);
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .thread_name(THREAD_NAME)
            .enable_all()
            .build()
            .map_err(EventLoopError::Runtime)?;

        let handle = EventLoopHandle::new(runtime.handle().clone(), config);

        tracing::info!(
            worker_threads = handle.worker_threads,
            selector = ?handle.selector,
            buffer_strategy = ?handle.buffer_strategy,
            "Event loop pool started"
        );

        Ok(Self {
            runtime: Some(runtime),
            handle,
        })
    }

    /// Wrap the runtime of the calling thread
    ///
    /// The pool does not own these threads; `shutdown` leaves them running.
    pub fn current(config: &EventLoopConfig) -> Result<Self, EventLoopError> {
        if config.worker_threads == 0 {
            return Err(EventLoopError::NoWorkers);
        }
        let runtime = Handle::try_current().map_err(|_| EventLoopError::NoRuntime)?;

        Ok(Self {
            runtime: None,
            handle: EventLoopHandle::new(runtime, config),
        })
    }

    /// Handle for listeners
    pub fn handle(&self) -> EventLoopHandle {
        self.handle.clone()
    }

    /// Whether `shutdown` will stop worker threads
    pub fn owns_runtime(&self) -> bool {
        self.runtime.is_some()
    }

    /// Drive `future` to completion on the pool
    ///
    /// Panics (inside tokio) when called from an async context.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        match &self.runtime {
            Some(runtime) => runtime.block_on(future),
            None => self.handle.runtime.block_on(future),
        }
    }

    /// Stop the worker threads, waiting up to `timeout` for running tasks
    pub fn shutdown(self, timeout: Duration) {
        if let Some(runtime) = self.runtime {
            runtime.shutdown_timeout(timeout);
            tracing::info!("Event loop pool stopped");
        }
    }
}

/// Cloneable reference to the pool
#[derive(Debug, Clone)]
pub struct EventLoopHandle {
    runtime: Handle,
    worker_threads: usize,
    selector: Selector,
    buffer_strategy: BufferStrategy,
}

impl EventLoopHandle {
    fn new(runtime: Handle, config: &EventLoopConfig) -> Self {
        Self {
            runtime,
            worker_threads: config.worker_threads,
            selector: Selector::resolve(config.selector),
            buffer_strategy: config.buffer_strategy,
        }
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn selector(&self) -> Selector {
        self.selector
    }

    pub fn buffer_strategy(&self) -> BufferStrategy {
        self.buffer_strategy
    }

    /// Sockets a listener binds per launch
    pub fn socket_count(&self) -> usize {
        match self.selector {
            Selector::Native => self.worker_threads,
            Selector::Portable => 1,
        }
    }

    /// Whether listener sockets set `SO_REUSEPORT`
    pub fn reuse_port(&self) -> bool {
        self.selector == Selector::Native
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }

    /// Enter the runtime context so sockets can register with its reactor
    pub fn enter(&self) -> EnterGuard<'_> {
        self.runtime.enter()
    }
}

#[cfg(test)]
#[path = "event_loop_test.rs"]
mod event_loop_test;
