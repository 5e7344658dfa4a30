//! Network interface access via `pnet_datalink`

use std::fmt;
use std::sync::Arc;
use std::thread;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use pnet_datalink::{self, Channel, DataLinkSender};
use rppoe_packet::{EtherType, EthernetHeader, MacAddr};
use tracing::{debug, warn};

use crate::link::{LinkSender, RawFrame, SendKind};
use crate::{Error, Result};

/// Network interface
#[derive(Debug, Clone)]
pub struct Interface {
    /// Interface name (e.g., "eth0", "en0")
    pub name: String,
    /// Interface index
    pub index: u32,
    /// MAC address
    pub mac_address: MacAddr,
    /// MTU (Maximum Transmission Unit)
    pub mtu: u32,
    /// Is interface up?
    pub is_up: bool,
}

impl Interface {
    /// Get interface by name
    pub fn by_name(name: &str) -> Result<Self> {
        let interfaces = pnet_datalink::interfaces();
        let iface = interfaces
            .into_iter()
            .find(|i| i.name == name)
            .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))?;

        let mac_bytes = if let Some(mac) = iface.mac {
            [mac.0, mac.1, mac.2, mac.3, mac.4, mac.5]
        } else {
            [0, 0, 0, 0, 0, 0]
        };

        Ok(Self {
            name: iface.name.clone(),
            index: iface.index,
            mac_address: MacAddr(mac_bytes),
            mtu: 1500, // pnet doesn't expose MTU directly
            is_up: iface.is_up(),
        })
    }

    /// List all available interfaces
    pub fn list_all() -> Vec<Self> {
        pnet_datalink::interfaces()
            .into_iter()
            .map(|iface| {
                let mac_bytes = if let Some(mac) = iface.mac {
                    [mac.0, mac.1, mac.2, mac.3, mac.4, mac.5]
                } else {
                    [0, 0, 0, 0, 0, 0]
                };

                Self {
                    name: iface.name.clone(),
                    index: iface.index,
                    mac_address: MacAddr(mac_bytes),
                    mtu: 1500,
                    is_up: iface.is_up(),
                }
            })
            .collect()
    }

    /// Open a persistent sender on this interface.
    pub fn open_sender(&self) -> Result<PnetLinkSender> {
        let interfaces = pnet_datalink::interfaces();
        let interface = interfaces
            .into_iter()
            .find(|iface| iface.name == self.name)
            .ok_or_else(|| Error::InterfaceNotFound(self.name.clone()))?;

        let (tx, _) = match pnet_datalink::channel(&interface, Default::default()) {
            Ok(Channel::Ethernet(tx, rx)) => (tx, rx),
            Ok(_) => return Err(Error::interface("Unsupported channel type")),
            Err(e) => return Err(Error::Interface(format!("Failed to create channel: {}", e))),
        };

        Ok(PnetLinkSender {
            tx: Arc::new(Mutex::new(tx)),
        })
    }

    /// Spawn a blocking receiver thread delivering PPPoE frames
    /// (ethertypes 0x8863/0x8864) to `deliver`.
    ///
    /// The thread runs until the channel errors out or `deliver`
    /// returns `false` (the client side is gone). `deliver` must be
    /// cheap and non-blocking; it is the producer half of the client's
    /// inbound queue.
    pub fn spawn_receiver<F>(&self, deliver: F) -> Result<thread::JoinHandle<()>>
    where
        F: Fn(RawFrame) -> bool + Send + 'static,
    {
        let interfaces = pnet_datalink::interfaces();
        let interface = interfaces
            .into_iter()
            .find(|iface| iface.name == self.name)
            .ok_or_else(|| Error::InterfaceNotFound(self.name.clone()))?;

        let (_, mut rx) = match pnet_datalink::channel(&interface, Default::default()) {
            Ok(Channel::Ethernet(tx, rx)) => (tx, rx),
            Ok(_) => return Err(Error::interface("Unsupported channel type")),
            Err(e) => return Err(Error::Interface(format!("Failed to create channel: {}", e))),
        };

        let name = self.name.clone();
        let handle = thread::Builder::new()
            .name(format!("rppoe-rx-{name}"))
            .spawn(move || loop {
                match rx.next() {
                    Ok(frame) => {
                        let Some(header) = EthernetHeader::parse(frame) else {
                            continue;
                        };
                        match header.ethertype {
                            EtherType::Discovery | EtherType::Session => {}
                            EtherType::Other(_) => continue,
                        }
                        let raw = RawFrame::new(Bytes::copy_from_slice(frame));
                        if !deliver(raw) {
                            debug!(interface = %name, "receiver stopping: client gone");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(interface = %name, error = %e, "receive error, stopping");
                        break;
                    }
                }
            })?;

        Ok(handle)
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}), MTU: {}", self.name, self.mac_address, self.mtu)
    }
}

/// [`LinkSender`] backed by a persistent `pnet_datalink` channel.
pub struct PnetLinkSender {
    tx: Arc<Mutex<Box<dyn DataLinkSender>>>,
}

#[async_trait]
impl LinkSender for PnetLinkSender {
    async fn send_frame(&self, frame: Bytes, _dst: MacAddr, _kind: SendKind) -> Result<()> {
        let mut tx = self.tx.lock();
        tx.send_to(&frame, None)
            .ok_or_else(|| Error::interface("Failed to send packet"))?
            .map_err(|e| Error::Interface(format!("Send error: {}", e)))?;
        Ok(())
    }
}
