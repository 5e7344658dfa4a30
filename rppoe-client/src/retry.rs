//! Retransmission supervisor for the discovery handshake
//!
//! Implements the RFC2516 doubling schedule: the first retransmission
//! fires `initial_timeout` ticks after the original send, and every
//! subsequent wait doubles. With `count = C` transmissions configured,
//! the attempt is declared dead `initial_timeout * (2^C - 1)` ticks
//! after the first send.
//!
//! The timer is a passive countdown; the worker drives it with one
//! [`RetryTimer::tick`] call per timer period and acts on the returned
//! [`TickAction`].

use rppoe_core::RetryParams;

/// Which discovery packet the armed timer retransmits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryPhase {
    Padi,
    Padr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickAction {
    /// Timer not armed
    Idle,
    /// Armed, countdown still running
    Waiting,
    /// Countdown expired with retransmissions left: resend now
    Resend(RetryPhase),
    /// Countdown expired with no retransmissions left; the timer has
    /// disarmed itself
    Exhausted(RetryPhase),
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    phase: RetryPhase,
    params: RetryParams,
    /// Retransmissions still allowed after the current countdown
    remaining: u32,
    /// Ticks until the current countdown expires
    countdown: u32,
}

#[derive(Debug, Default)]
pub(crate) struct RetryTimer {
    armed: Option<Armed>,
}

impl RetryTimer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Arm for a phase whose first transmission just happened (or is
    /// about to). Replaces any previous arming.
    pub(crate) fn arm(&mut self, phase: RetryPhase, params: RetryParams) {
        self.armed = Some(Armed {
            phase,
            params,
            remaining: params.count.saturating_sub(1),
            countdown: params.initial_timeout,
        });
    }

    pub(crate) fn disarm(&mut self) {
        self.armed = None;
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Advance by one tick.
    pub(crate) fn tick(&mut self) -> TickAction {
        let Some(armed) = self.armed.as_mut() else {
            return TickAction::Idle;
        };

        armed.countdown = armed.countdown.saturating_sub(1);
        if armed.countdown > 0 {
            return TickAction::Waiting;
        }

        if armed.remaining == 0 {
            let phase = armed.phase;
            self.armed = None;
            return TickAction::Exhausted(phase);
        }

        // Doubling schedule: the (n+1)-th wait is initial_timeout << n.
        let used = armed.params.count - armed.remaining;
        armed.countdown = armed.params.initial_timeout.saturating_shl(used);
        armed.remaining -= 1;
        TickAction::Resend(armed.phase)
    }
}

trait SaturatingShl {
    fn saturating_shl(self, shift: u32) -> Self;
}

impl SaturatingShl for u32 {
    fn saturating_shl(self, shift: u32) -> Self {
        if shift >= 32 {
            u32::MAX
        } else {
            self.checked_shl(shift).unwrap_or(u32::MAX)
        }
    }
}
