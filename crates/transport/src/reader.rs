//! Socket reader task
//!
//! One reader per bound socket: read a datagram, apply the receive-buffer
//! policy, run the pipeline, repeat until cancelled.

use crate::recv_buffer::{ReadOutcome, RecvBufferPolicy};
use bytes::{Bytes, BytesMut};
use sluice_config::BufferStrategy;
use sluice_metrics::ThroughputCounter;
use sluice_pipeline::{Datagram, Pipeline};
use std::future::poll_fn;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::task::Poll;
use std::time::Duration;
use tokio::io::ReadBuf;
use tokio::net::UdpSocket;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Slab size pooled payloads are carved from
const POOL_CHUNK: usize = 64 * 1024;

/// `WSAEMSGSIZE`: the datagram did not fit the read buffer
const WSAEMSGSIZE: i32 = 10040;

/// Rolling-rate window
pub(crate) const TICK_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// Read buffers
// =============================================================================

/// Read buffers for one reader
///
/// Every read lands in one reused scratch buffer of exactly the read length.
/// The payload is then copied out: `Pooled` carves it from a shared slab
/// that is recycled once its payloads are dropped, `Unpooled` gives it an
/// allocation of its own. Either way a payload only pins memory of its own
/// order, never a full read buffer.
pub(crate) struct ReadBuffer {
    strategy: BufferStrategy,
    scratch: Box<[u8]>,
    slab: BytesMut,
}

impl ReadBuffer {
    pub(crate) fn new(strategy: BufferStrategy, read_len: usize) -> Self {
        let slab = match strategy {
            BufferStrategy::Pooled => BytesMut::with_capacity(POOL_CHUNK),
            BufferStrategy::Unpooled => BytesMut::new(),
        };
        Self {
            strategy,
            scratch: vec![0; read_len].into_boxed_slice(),
            slab,
        }
    }

    /// Destination for the next read, exactly `read_len` bytes
    pub(crate) fn prepare(&mut self) -> &mut [u8] {
        &mut self.scratch
    }

    /// Copy out the first `len` bytes of the last read
    pub(crate) fn take(&mut self, len: usize) -> Bytes {
        let data = &self.scratch[..len.min(self.scratch.len())];
        match self.strategy {
            BufferStrategy::Unpooled => Bytes::copy_from_slice(data),
            BufferStrategy::Pooled => {
                if self.slab.capacity() < data.len() {
                    self.slab.reserve(data.len().max(POOL_CHUNK));
                }
                self.slab.extend_from_slice(data);
                self.slab.split().freeze()
            }
        }
    }
}

/// Receive one datagram into `dst`
///
/// The socket is only held for the length of a poll. `None` once the
/// listener has closed it.
async fn recv_from(
    socket: &Weak<UdpSocket>,
    dst: &mut [u8],
) -> Option<io::Result<(usize, SocketAddr)>> {
    let mut buf = ReadBuf::new(dst);
    let result = poll_fn(|cx| match socket.upgrade() {
        Some(socket) => socket.poll_recv_from(cx, &mut buf).map(Some),
        None => Poll::Ready(None),
    })
    .await?;
    Some(result.map(|remote| (buf.filled().len(), remote)))
}

// =============================================================================
// Reader
// =============================================================================

pub(crate) struct Reader {
    pub(crate) listener_id: Arc<str>,
    pub(crate) index: usize,
    pub(crate) socket: Weak<UdpSocket>,
    pub(crate) local: SocketAddr,
    pub(crate) pipeline: Pipeline,
    pub(crate) policy: RecvBufferPolicy,
    pub(crate) strategy: BufferStrategy,
    pub(crate) throughput: Arc<ThroughputCounter>,
    pub(crate) cancel: CancellationToken,
}

impl Reader {
    pub(crate) async fn run(self) {
        tracing::debug!(
            listener_id = %self.listener_id,
            reader = self.index,
            address = %self.local,
            "UDP reader started"
        );

        let mut buffer = ReadBuffer::new(self.strategy, self.policy.read_len());
        let mut prediction = self.policy.allocator().handle();

        loop {
            let received = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => None,

                received = recv_from(&self.socket, buffer.prepare()) => received,
            };

            let (len, remote) = match received {
                None => break,
                Some(Ok(read)) => read,
                Some(Err(e)) if cfg!(windows) && e.raw_os_error() == Some(WSAEMSGSIZE) => {
                    self.throughput.record_discarded();
                    continue;
                }
                Some(Err(e)) => {
                    tracing::debug!(
                        listener_id = %self.listener_id,
                        error = %e,
                        "UDP recv error"
                    );
                    continue;
                }
            };
            prediction.record_last_read(len);

            let payload = match self.policy.apply(len) {
                ReadOutcome::Deliver(n) => buffer.take(n),
                ReadOutcome::Truncated(n) => {
                    self.throughput.record_truncated();
                    buffer.take(n)
                }
                ReadOutcome::Discarded => {
                    self.throughput.record_discarded();
                    tracing::trace!(
                        listener_id = %self.listener_id,
                        peer = %remote,
                        limit = prediction.guess(),
                        "Discarded datagram larger than receive buffer"
                    );
                    continue;
                }
            };

            if let Some(leftover) = self.pipeline.handle(Datagram {
                payload,
                remote,
                local: self.local,
            }) {
                tracing::trace!(
                    listener_id = %self.listener_id,
                    bytes = leftover.payload_len(),
                    "Pipeline ended without consuming datagram"
                );
            }
        }

        tracing::debug!(
            listener_id = %self.listener_id,
            reader = self.index,
            "UDP reader stopped"
        );
    }
}

/// Roll the per-second rates until cancelled
pub(crate) async fn run_ticker(throughput: Arc<ThroughputCounter>, cancel: CancellationToken) {
    let mut ticker = interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = ticker.tick() => throughput.tick(),
        }
    }
}
