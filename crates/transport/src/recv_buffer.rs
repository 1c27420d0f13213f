//! Receive-Buffer Policy
//!
//! One configured byte count `N` drives both the socket receive buffer
//! (`SO_RCVBUF`) and the fixed read size: no datagram delivers more than
//! `N` payload bytes.
//!
//! # Design
//!
//! - **One value, stored once**: the socket option and the read allocator
//!   both come from `RecvBufferPolicy::size()`
//! - **Fixed prediction**: the allocator always asks for `N` bytes, no
//!   matter how large previous datagrams were
//! - **Platform capability flag**: what happens to a datagram larger than
//!   `N` differs by kernel family. BSD-derived kernels drop it, Windows
//!   fails the read with `WSAEMSGSIZE`, everyone else truncates it.
//!   `OversizeBehavior::platform()` resolves this once from the compile
//!   target and `apply()` is the only place it is acted on
//! - **Guard byte**: readers read `N + 1` bytes so an oversize datagram is
//!   visible without `MSG_TRUNC`; the extra byte is never delivered

use crate::ListenerError;
use sluice_config::{BufferStrategy, MAX_RECV_BUFFER_SIZE};
use std::net::SocketAddr;

// =============================================================================
// Oversize behavior
// =============================================================================

/// What happens to a datagram whose wire size exceeds the receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OversizeBehavior {
    /// Deliver the first `N` bytes
    Truncate,
    /// Deliver nothing
    Discard,
}

impl OversizeBehavior {
    /// Behavior of the kernel this binary was compiled for
    pub const fn platform() -> Self {
        if cfg!(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "dragonfly",
            windows,
        )) {
            Self::Discard
        } else {
            Self::Truncate
        }
    }
}

/// Result of applying the policy to one read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Fits: deliver all `n` bytes
    Deliver(usize),
    /// Too large: deliver the first `n` bytes
    Truncated(usize),
    /// Too large: deliver nothing
    Discarded,
}

// =============================================================================
// Fixed allocator
// =============================================================================

/// Read-size predictor that always predicts the configured size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRecvAllocator {
    size: usize,
}

impl FixedRecvAllocator {
    pub const fn new(size: usize) -> Self {
        Self { size }
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    /// Per-reader prediction handle
    pub const fn handle(&self) -> FixedRecvHandle {
        FixedRecvHandle { size: self.size }
    }
}

/// Prediction state of one reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRecvHandle {
    size: usize,
}

impl FixedRecvHandle {
    /// Bytes to request for the next read
    #[inline]
    pub const fn guess(&self) -> usize {
        self.size
    }

    /// Feedback from the last read; a fixed predictor ignores it
    #[inline]
    pub fn record_last_read(&mut self, _bytes: usize) {}
}

// =============================================================================
// Policy
// =============================================================================

/// Validated receive-buffer size plus oversize behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvBufferPolicy {
    size: usize,
    oversize: OversizeBehavior,
}

impl RecvBufferPolicy {
    /// Validate `size` and pair it with the platform's oversize behavior
    pub fn new(size: usize) -> Result<Self, ListenerError> {
        if size == 0 {
            return Err(ListenerError::config(
                "recv_buffer_size must be greater than zero",
            ));
        }
        if size > MAX_RECV_BUFFER_SIZE {
            return Err(ListenerError::config(format!(
                "recv_buffer_size {} exceeds the socket option limit {}",
                size, MAX_RECV_BUFFER_SIZE
            )));
        }

        Ok(Self {
            size,
            oversize: OversizeBehavior::platform(),
        })
    }

    /// Replace the oversize behavior
    pub fn with_oversize(mut self, oversize: OversizeBehavior) -> Self {
        self.oversize = oversize;
        self
    }

    /// The configured size `N`
    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Value for `SO_RCVBUF`
    #[inline]
    pub const fn socket_option(&self) -> usize {
        self.size
    }

    #[inline]
    pub const fn allocator(&self) -> FixedRecvAllocator {
        FixedRecvAllocator::new(self.size)
    }

    #[inline]
    pub const fn oversize(&self) -> OversizeBehavior {
        self.oversize
    }

    /// Bytes a reader asks the socket for: the allocator guess plus the guard byte
    #[inline]
    pub const fn read_len(&self) -> usize {
        self.size + 1
    }

    /// Decide what to deliver for a read of `received` bytes
    #[inline]
    pub const fn apply(&self, received: usize) -> ReadOutcome {
        apply(received, self.size, self.oversize)
    }
}

/// Decide what to deliver for a read of `received` bytes against limit `size`
#[inline]
pub const fn apply(received: usize, size: usize, oversize: OversizeBehavior) -> ReadOutcome {
    if received <= size {
        return ReadOutcome::Deliver(received);
    }
    match oversize {
        OversizeBehavior::Truncate => ReadOutcome::Truncated(size),
        OversizeBehavior::Discard => ReadOutcome::Discarded,
    }
}

// =============================================================================
// Bootstrap options
// =============================================================================

/// Everything a listener will apply when it binds, computed without binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOptions {
    /// `SO_RCVBUF` and maximum delivered payload
    pub recv_buffer_size: usize,
    /// Read-size predictor
    pub allocator: FixedRecvAllocator,
    /// What happens to datagrams larger than `recv_buffer_size`
    pub oversize: OversizeBehavior,
    /// Address the first socket binds to
    pub bind_address: SocketAddr,
    /// Sockets bound on launch
    pub socket_count: usize,
    /// Whether `SO_REUSEPORT` is set
    pub reuse_port: bool,
    /// How readers obtain buffers
    pub buffer_strategy: BufferStrategy,
}
