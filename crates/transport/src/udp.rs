//! UDP Listener
//!
//! Binds one or more UDP sockets on the shared event-loop pool and runs
//! every received datagram through the listener's pipeline.
//!
//! # Architecture
//!
//! ```text
//!                     ┌─ socket 0 (SO_REUSEPORT) ──→ reader 0 ──→ pipeline 0 ─┐
//! UDP :port ─kernel──→├─ socket 1 (SO_REUSEPORT) ──→ reader 1 ──→ pipeline 1 ─┼─→ MessageConsumer
//!                     └─ socket N (SO_REUSEPORT) ──→ reader N ──→ pipeline N ─┘
//! ```
//!
//! The `portable` selector binds a single socket; `native` binds one per
//! worker thread and lets the kernel balance between them. A native
//! listener also claims its address for the process, so a second listener
//! cannot join the port through `SO_REUSEPORT`.
//!
//! # Lifecycle
//!
//! `Created` ─launch→ `Launched` ─stop→ `Stopped`. Launch happens once and
//! a stopped listener is not restarted. The listener holds the only strong
//! reference to each socket, so `stop` closes them before it returns and the
//! port can be bound again right away.

use crate::event_loop::EventLoopHandle;
use crate::port_claim::PortClaim;
use crate::reader::{Reader, run_ticker};
use crate::recv_buffer::{BootstrapOptions, OversizeBehavior, RecvBufferPolicy};
use crate::{ListenerError, ListenerState};
use parking_lot::Mutex;
use sluice_config::{DEFAULT_RECV_BUFFER_SIZE, LogLevel, UdpListenerConfig};
use sluice_metrics::{ListenerMetricsProvider, MetricSet, MetricSnapshot, ThroughputCounter};
use sluice_pipeline::{
    BaseStages, ListenerIdentity, MessageConsumer, PipelineBuilder, StageOverrides,
};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, OnceLock};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Level;

// =============================================================================
// Configuration
// =============================================================================

/// Per-listener settings
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Bind address; empty means all interfaces
    pub address: String,
    /// Bind port; 0 picks an ephemeral port
    pub port: u16,
    /// Receive buffer and maximum payload size in bytes
    pub recv_buffer_size: usize,
    /// Log every datagram before accounting
    pub log_datagrams: bool,
    /// Level for datagram logging
    pub datagram_log_level: Level,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: 0,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            log_datagrams: false,
            datagram_log_level: Level::INFO,
        }
    }
}

impl From<&UdpListenerConfig> for ListenerConfig {
    fn from(config: &UdpListenerConfig) -> Self {
        Self {
            address: config.address.clone(),
            port: config.port,
            recv_buffer_size: config.recv_buffer_size,
            log_datagrams: config.log_datagrams,
            datagram_log_level: tracing_level(config.datagram_log_level),
        }
    }
}

fn tracing_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

impl ListenerConfig {
    /// Resolve `address` and `port` into the address the first socket binds to
    pub fn bind_address(&self) -> Result<SocketAddr, ListenerError> {
        let address = self.address.trim();
        let ip = if address.is_empty() {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            address
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<IpAddr>()
                .map_err(|e| {
                    ListenerError::config(format!("invalid bind address '{}': {}", address, e))
                })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Cloneable view of a listener's counters for the metrics reporter
#[derive(Clone)]
pub struct ListenerMetricsHandle {
    identity: Arc<OnceLock<ListenerIdentity>>,
    throughput: Arc<ThroughputCounter>,
}

impl ListenerMetricsProvider for ListenerMetricsHandle {
    fn listener_id(&self) -> &str {
        self.identity.get().map(|i| i.id()).unwrap_or_default()
    }

    fn listener_name(&self) -> &str {
        self.identity.get().map(|i| i.name()).unwrap_or_default()
    }

    fn snapshot(&self) -> MetricSnapshot {
        self.throughput.snapshot()
    }
}

// =============================================================================
// Listener
// =============================================================================

enum Lifecycle {
    Created,
    Launched(Running),
    Stopped,
}

impl Lifecycle {
    fn state(&self) -> ListenerState {
        match self {
            Self::Created => ListenerState::Created,
            Self::Launched(_) => ListenerState::Launched,
            Self::Stopped => ListenerState::Stopped,
        }
    }
}

struct Running {
    local: SocketAddr,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    sockets: Vec<Arc<UdpSocket>>,
    _claim: Option<PortClaim>,
}

impl Running {
    /// Stop the tasks and close every socket
    fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            task.abort();
        }
        for socket in self.sockets {
            close(socket);
        }
    }
}

/// Drop the last strong reference to `socket`
///
/// Readers upgrade their weak reference only for the length of one poll, so
/// a competing reference is released almost at once.
fn close(mut socket: Arc<UdpSocket>) {
    loop {
        match Arc::try_unwrap(socket) {
            Ok(socket) => {
                drop(socket);
                return;
            }
            Err(shared) => {
                socket = shared;
                std::thread::yield_now();
            }
        }
    }
}

/// Builder for listeners that need more than the defaults
pub struct UdpListenerBuilder {
    config: ListenerConfig,
    event_loop: EventLoopHandle,
    consumer: Arc<dyn MessageConsumer>,
    overrides: StageOverrides,
    oversize: OversizeBehavior,
}

impl UdpListenerBuilder {
    /// Stage overrides applied on top of the base pipeline
    pub fn overrides(mut self, overrides: StageOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Oversize handling; defaults to the platform's
    pub fn oversize(mut self, oversize: OversizeBehavior) -> Self {
        self.oversize = oversize;
        self
    }

    /// Validate and build; nothing is bound until `launch`
    pub fn build(self) -> Result<UdpListener, ListenerError> {
        let policy = RecvBufferPolicy::new(self.config.recv_buffer_size)?
            .with_oversize(self.oversize);
        let bind_address = self.config.bind_address()?;

        let options = BootstrapOptions {
            recv_buffer_size: policy.socket_option(),
            allocator: policy.allocator(),
            oversize: policy.oversize(),
            bind_address,
            socket_count: self.event_loop.socket_count(),
            reuse_port: self.event_loop.reuse_port(),
            buffer_strategy: self.event_loop.buffer_strategy(),
        };

        Ok(UdpListener {
            config: self.config,
            event_loop: self.event_loop,
            consumer: self.consumer,
            overrides: self.overrides,
            policy,
            options,
            throughput: Arc::new(ThroughputCounter::new()),
            identity: Arc::new(OnceLock::new()),
            state: Mutex::new(Lifecycle::Created),
        })
    }
}

/// UDP datagram listener
pub struct UdpListener {
    config: ListenerConfig,
    event_loop: EventLoopHandle,
    consumer: Arc<dyn MessageConsumer>,
    overrides: StageOverrides,
    policy: RecvBufferPolicy,
    options: BootstrapOptions,
    throughput: Arc<ThroughputCounter>,
    identity: Arc<OnceLock<ListenerIdentity>>,
    state: Mutex<Lifecycle>,
}

impl UdpListener {
    /// Listener with the base pipeline and the platform's oversize handling
    pub fn new(
        config: ListenerConfig,
        event_loop: EventLoopHandle,
        consumer: Arc<dyn MessageConsumer>,
    ) -> Result<Self, ListenerError> {
        Self::builder(config, event_loop, consumer).build()
    }

    pub fn builder(
        config: ListenerConfig,
        event_loop: EventLoopHandle,
        consumer: Arc<dyn MessageConsumer>,
    ) -> UdpListenerBuilder {
        UdpListenerBuilder {
            config,
            event_loop,
            consumer,
            overrides: StageOverrides::new(),
            oversize: OversizeBehavior::platform(),
        }
    }

    /// Options applied on launch, available before binding
    pub fn bootstrap_options(&self) -> &BootstrapOptions {
        &self.options
    }

    /// This listener's metric set; the same `Arc` for its whole life
    pub fn metric_set(&self) -> &Arc<MetricSet> {
        self.throughput.metric_set()
    }

    pub fn throughput(&self) -> &Arc<ThroughputCounter> {
        &self.throughput
    }

    pub fn metrics_handle(&self) -> ListenerMetricsHandle {
        ListenerMetricsHandle {
            identity: Arc::clone(&self.identity),
            throughput: Arc::clone(&self.throughput),
        }
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Identity supplied at launch
    pub fn identity(&self) -> Option<&ListenerIdentity> {
        self.identity.get()
    }

    pub fn state(&self) -> ListenerState {
        self.state.lock().state()
    }

    /// Bound address while launched
    pub fn local_address(&self) -> Option<SocketAddr> {
        match &*self.state.lock() {
            Lifecycle::Launched(running) => Some(running.local),
            _ => None,
        }
    }

    /// Bind the sockets and start reading
    ///
    /// On error nothing stays bound and the listener remains `Created`.
    pub fn launch(&self, identity: ListenerIdentity) -> Result<(), ListenerError> {
        let mut state = self.state.lock();
        if !matches!(*state, Lifecycle::Created) {
            return Err(ListenerError::Lifecycle {
                operation: "launch",
                state: state.state(),
            });
        }

        let logging = self.config.log_datagrams.then_some(self.config.datagram_log_level);
        let template = PipelineBuilder::base(BaseStages {
            logging,
            throughput: Arc::clone(&self.throughput),
            consumer: Arc::clone(&self.consumer),
        })
        .overrides(self.overrides.clone())
        .resolve()?;

        let (bound, claim) = bind_sockets(&self.options)?;
        let local = bound[0].1;

        // Registering with the reactor needs the pool's runtime context
        let sockets = {
            let _guard = self.event_loop.enter();
            bound
                .into_iter()
                .map(|(socket, addr)| {
                    UdpSocket::from_std(socket)
                        .map(Arc::new)
                        .map_err(|e| ListenerError::bind(addr, e))
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let cancel = CancellationToken::new();
        let mut tasks = Vec::with_capacity(sockets.len() + 1);

        for (index, socket) in sockets.iter().enumerate() {
            let reader = Reader {
                listener_id: identity.shared_id(),
                index,
                socket: Arc::downgrade(socket),
                local,
                pipeline: template.build(&identity),
                policy: self.policy,
                strategy: self.options.buffer_strategy,
                throughput: Arc::clone(&self.throughput),
                cancel: cancel.child_token(),
            };
            tasks.push(self.event_loop.spawn(reader.run()));
        }
        tasks.push(
            self.event_loop
                .spawn(run_ticker(Arc::clone(&self.throughput), cancel.child_token())),
        );

        tracing::info!(
            listener_id = %identity.id(),
            listener_name = %identity.name(),
            address = %local,
            sockets = self.options.socket_count,
            recv_buffer_size = self.options.recv_buffer_size,
            pipeline = ?template.names().collect::<Vec<_>>(),
            "UDP listener started"
        );

        // Launch is one-shot, so the cell is always empty here
        let _ = self.identity.set(identity);
        *state = Lifecycle::Launched(Running {
            local,
            cancel,
            tasks,
            sockets,
            _claim: claim,
        });
        Ok(())
    }

    /// Stop reading and close the sockets
    ///
    /// Idempotent. Before launch this does nothing.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if !matches!(*state, Lifecycle::Launched(_)) {
            return;
        }

        if let Lifecycle::Launched(running) = std::mem::replace(&mut *state, Lifecycle::Stopped) {
            let local = running.local;
            running.shutdown();
            tracing::info!(
                listener_id = self.identity.get().map(|i| i.id()).unwrap_or_default(),
                address = %local,
                "UDP listener stopped"
            );
        }
    }
}

impl Drop for UdpListener {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Sockets
// =============================================================================

type BoundSockets = (Vec<(std::net::UdpSocket, SocketAddr)>, Option<PortClaim>);

/// Bind every socket the options call for
///
/// The first socket takes the configured (possibly ephemeral) port; the
/// rest join it on the port it actually got. Shared ports are claimed
/// before a fixed port is bound, or right after an ephemeral one is.
fn bind_sockets(options: &BootstrapOptions) -> Result<BoundSockets, ListenerError> {
    let count = options.socket_count.max(1);
    let mut sockets = Vec::with_capacity(count);
    let requested = options.bind_address;

    let mut claim = if options.reuse_port && requested.port() != 0 {
        Some(PortClaim::acquire(requested).map_err(|e| ListenerError::bind(requested, e))?)
    } else {
        None
    };

    let first = create_socket(requested, options)?;
    let bound = first
        .local_addr()
        .map_err(|e| ListenerError::bind(requested, e))?;
    sockets.push((first, bound));

    if options.reuse_port && claim.is_none() {
        claim = Some(PortClaim::acquire(bound).map_err(|e| ListenerError::bind(bound, e))?);
    }

    for _ in 1..count {
        let socket = create_socket(bound, options)?;
        sockets.push((socket, bound));
    }

    Ok((sockets, claim))
}

/// Create one UDP socket with the listener's socket options
fn create_socket(
    addr: SocketAddr,
    options: &BootstrapOptions,
) -> Result<std::net::UdpSocket, ListenerError> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| ListenerError::bind(addr, e))?;

    if options.reuse_port {
        socket
            .set_reuse_address(true)
            .map_err(|e| ListenerError::bind(addr, e))?;

        #[cfg(unix)]
        socket
            .set_reuse_port(true)
            .map_err(|e| ListenerError::bind(addr, e))?;
    }

    if let Err(e) = socket.set_recv_buffer_size(options.recv_buffer_size) {
        tracing::warn!(
            error = %e,
            requested_size = options.recv_buffer_size,
            "Failed to set UDP SO_RCVBUF"
        );
    }

    socket
        .bind(&addr.into())
        .map_err(|e| ListenerError::bind(addr, e))?;
    socket
        .set_nonblocking(true)
        .map_err(|e| ListenerError::bind(addr, e))?;

    Ok(socket.into())
}

#[cfg(test)]
#[path = "udp_test.rs"]
mod udp_test;
