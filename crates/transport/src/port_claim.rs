//! Process-wide claims on ports served with `SO_REUSEPORT`
//!
//! Native fan-out sockets allow the kernel to share their port, so two
//! listeners would otherwise both bind it and split its traffic. A claim is
//! taken before the first native socket binds and released on drop.

use parking_lot::Mutex;
use std::io;
use std::net::SocketAddr;

static CLAIMED: Mutex<Vec<SocketAddr>> = parking_lot::const_mutex(Vec::new());

/// Exclusive hold on an address for one listener
#[derive(Debug)]
pub(crate) struct PortClaim {
    addr: SocketAddr,
}

impl PortClaim {
    /// Claim `addr`, failing with `AddrInUse` if a live claim overlaps it
    pub(crate) fn acquire(addr: SocketAddr) -> io::Result<Self> {
        let mut claimed = CLAIMED.lock();
        if let Some(holder) = claimed.iter().find(|held| overlaps(held, &addr)) {
            return Err(io::Error::new(
                io::ErrorKind::AddrInUse,
                format!("port {} is already served by a listener on {}", addr.port(), holder),
            ));
        }
        claimed.push(addr);
        Ok(Self { addr })
    }
}

impl Drop for PortClaim {
    fn drop(&mut self) {
        let mut claimed = CLAIMED.lock();
        if let Some(i) = claimed.iter().position(|held| *held == self.addr) {
            claimed.swap_remove(i);
        }
    }
}

/// Same port, and the same IP or a wildcard on either side
fn overlaps(a: &SocketAddr, b: &SocketAddr) -> bool {
    a.port() == b.port()
        && (a.ip() == b.ip() || a.ip().is_unspecified() || b.ip().is_unspecified())
}
