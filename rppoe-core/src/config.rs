//! Client configuration and protocol limits

use std::time::Duration;

/// Largest Service-Name the client will accept from a setter.
pub const MAX_SERVICE_NAME_SIZE: usize = 255;

/// Largest Host-Uniq the client will accept from a setter.
pub const MAX_HOST_UNIQ_SIZE: usize = 255;

/// Cache bound for a peer-supplied AC-Name tag; larger tags drop the
/// whole packet.
pub const MAX_AC_NAME_SIZE: usize = 96;

/// Cache bound for a peer-supplied AC-Cookie tag.
pub const MAX_AC_COOKIE_SIZE: usize = 64;

/// Cache bound for a Relay-Session-Id tag. RFC2516 limits the tag to
/// 12 octets.
pub const MAX_RELAY_SESSION_ID_SIZE: usize = 12;

/// Retransmission parameters for one discovery phase (PADI or PADR).
///
/// `initial_timeout` is expressed in timer ticks; each retransmission
/// doubles the wait per RFC2516 section 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryParams {
    /// Ticks before the first retransmission
    pub initial_timeout: u32,
    /// Total number of transmissions before the attempt fails
    pub count: u32,
}

impl Default for RetryParams {
    fn default() -> Self {
        Self {
            initial_timeout: 1,
            count: 5,
        }
    }
}

/// PPPoE client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// PADI retransmission parameters
    pub padi: RetryParams,
    /// PADR retransmission parameters
    pub padr: RetryParams,
    /// Period of the worker's retry timer tick
    pub tick_period: Duration,
    /// Capacity of transmit buffers requested from the frame pool
    pub frame_capacity: usize,
    /// Depth of the inbound frame queue between the link receiver and
    /// the worker
    pub inbound_queue_depth: usize,
    /// Depth of the queue delivering received session payloads to the
    /// upper layer
    pub session_queue_depth: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            padi: RetryParams::default(),
            padr: RetryParams::default(),
            tick_period: Duration::from_secs(1),
            frame_capacity: 1514,
            inbound_queue_depth: 32,
            session_queue_depth: 32,
        }
    }
}

impl ClientConfig {
    pub fn with_padi(mut self, params: RetryParams) -> Self {
        self.padi = params;
        self
    }

    pub fn with_padr(mut self, params: RetryParams) -> Self {
        self.padr = params;
        self
    }

    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }
}
