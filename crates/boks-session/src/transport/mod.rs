//! The device transport boundary.
//!
//! A [`Transport`] is whatever actually talks to the box: a BLE stack binding
//! in a host application, or the scripted [`mock::MockTransport`] in tests
//! and capture replay.  The session never touches GATT directly.
//!
//! # Contract
//!
//! - `connect` establishes the link, subscribes to the notify characteristic,
//!   and returns a channel on which every notification arrives as one
//!   [`TransportEvent::Notification`] in device order.
//! - A link drop is reported as [`TransportEvent::Disconnected`] (or by
//!   closing the channel).  Either way the session treats it as final for
//!   that connection.
//! - `write` sends one complete frame to the write characteristic.
//! - `read_characteristic` reads any characteristic by UUID (battery, Device
//!   Information).

pub mod mock;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

pub use crate::error::TransportError;

/// Something the transport reports on its event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Raw bytes received on the notify characteristic.
    Notification(Vec<u8>),
    /// The link dropped.
    Disconnected,
}

/// Abstract connect / write / read / disconnect capability supplied by the host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens the link and returns the notification stream.
    async fn connect(&self) -> Result<mpsc::Receiver<TransportEvent>, TransportError>;

    /// Writes one frame to the write characteristic.
    async fn write(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// Reads a characteristic value.
    async fn read_characteristic(&self, uuid: Uuid) -> Result<Vec<u8>, TransportError>;

    /// Closes the link.  Closing an already closed link is not an error.
    async fn disconnect(&self) -> Result<(), TransportError>;
}
