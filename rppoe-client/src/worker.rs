//! Worker task: the single driver of the discovery state machine
//!
//! One task per client, multiplexing three inputs with `select!`: the
//! bounded inbound frame queue, the retry timer tick and the control
//! channel from the public handle. All context mutation happens here
//! or under short lock sections in the handle; frames built under the
//! lock are transmitted after it is released.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rppoe_core::{LinkSender, RawFrame};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crate::context::ClientContext;

/// Control messages from the public handle to the worker.
#[derive(Debug)]
pub(crate) enum Command {
    /// A connect caller stopped waiting; tear down an in-flight
    /// discovery attempt
    AbandonConnect,
    Shutdown,
}

/// Producer half of the inbound frame queue, handed to whatever owns
/// the receive side of the link (a capture thread, a test harness).
///
/// Delivery is non-blocking: when the queue is full the frame is
/// dropped, trading loss for a bounded worker backlog. Discovery
/// recovers through retransmission, session loss is the upper layer's
/// problem, as on any lossy link.
#[derive(Clone)]
pub struct FrameInjector {
    tx: mpsc::Sender<RawFrame>,
}

impl FrameInjector {
    pub(crate) fn new(tx: mpsc::Sender<RawFrame>) -> Self {
        Self { tx }
    }

    /// Queue one inbound frame. Returns `false` once the client is
    /// gone, so a capture loop knows to stop.
    pub fn inject(&self, frame: RawFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("inbound queue full, dropping frame");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

pub(crate) async fn run(
    ctx: Arc<Mutex<ClientContext>>,
    sender: Arc<dyn LinkSender>,
    mut frames: mpsc::Receiver<RawFrame>,
    mut commands: mpsc::Receiver<Command>,
    tick_period: Duration,
) {
    let mut ticker = time::interval(tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // An interval's first tick completes immediately; the retry timer
    // must not see it.
    ticker.tick().await;

    debug!("pppoe worker started");

    loop {
        let outbound = tokio::select! {
            frame = frames.recv() => match frame {
                Some(raw) => ctx.lock().handle_frame(&raw),
                None => break,
            },
            _ = ticker.tick() => ctx.lock().handle_tick(),
            command = commands.recv() => match command {
                Some(Command::AbandonConnect) => {
                    ctx.lock().abandon_connect();
                    None
                }
                Some(Command::Shutdown) | None => break,
            },
        };

        if let Some(out) = outbound {
            if let Err(e) = sender.send_frame(out.frame, out.dst, out.kind).await {
                // Discovery sends are recovered by retransmission.
                warn!(error = %e, "link send failed");
            }
        }
    }

    // Anyone still waiting on connect sees the channel close.
    let mut guard = ctx.lock();
    guard.waiter = None;
    guard.reset();
    debug!("pppoe worker stopped");
}
