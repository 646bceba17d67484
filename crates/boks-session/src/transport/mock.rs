//! Scripted in-memory transport.
//!
//! Lets tests and the capture replayer drive a [`crate::BoksSession`]
//! without a radio.  Notifications are injected by hand or produced by a
//! responder closure that plays the part of the box firmware; every written
//! frame is recorded for assertions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{Transport, TransportError, TransportEvent};

/// Capacity of the notification channel handed out by `connect`.
const CHANNEL_CAPACITY: usize = 256;

/// Produces the notifications the box would send in answer to a written frame.
pub type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>> + Send>;

#[derive(Default)]
struct MockState {
    sender: Option<mpsc::Sender<TransportEvent>>,
    written: Vec<Vec<u8>>,
    characteristics: HashMap<Uuid, Vec<u8>>,
    responder: Option<Responder>,
    fail_writes: bool,
    connect_calls: usize,
}

/// A [`Transport`] backed by channels and a recording buffer.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    /// Creates a transport with no characteristics and no responder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a readable characteristic value.
    pub fn with_characteristic(self, uuid: Uuid, value: impl Into<Vec<u8>>) -> Self {
        self.lock().characteristics.insert(uuid, value.into());
        self
    }

    /// Installs a closure that answers every written frame.
    pub fn with_responder<F>(self, responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
    {
        self.lock().responder = Some(Box::new(responder));
        self
    }

    /// Makes every subsequent `write` fail with an I/O error.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Every frame written so far, in order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.lock().written.clone()
    }

    /// How many times `connect` has been called.
    pub fn connect_calls(&self) -> usize {
        self.lock().connect_calls
    }

    pub fn is_connected(&self) -> bool {
        self.lock().sender.is_some()
    }

    /// Delivers raw bytes as if the box had sent a notification.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] before `connect`, or
    /// [`TransportError::Disconnected`] if the session stopped listening.
    pub async fn inject(&self, raw: impl Into<Vec<u8>>) -> Result<(), TransportError> {
        let sender = self.lock().sender.clone().ok_or(TransportError::NotConnected)?;
        sender
            .send(TransportEvent::Notification(raw.into()))
            .await
            .map_err(|_| TransportError::Disconnected)
    }

    /// Simulates the box going out of range.
    pub async fn drop_link(&self) {
        let sender = self.lock().sender.take();
        if let Some(sender) = sender {
            // The receiver may already be gone; the link is down either way
            let _ = sender.send(TransportEvent::Disconnected).await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<mpsc::Receiver<TransportEvent>, TransportError> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut state = self.lock();
        state.sender = Some(tx);
        state.connect_calls += 1;
        Ok(rx)
    }

    async fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        let (sender, replies) = {
            let mut state = self.lock();
            let sender = state.sender.clone().ok_or(TransportError::NotConnected)?;
            if state.fail_writes {
                return Err(TransportError::Io("injected write failure".to_string()));
            }
            state.written.push(frame.to_vec());
            let replies = match state.responder.as_mut() {
                Some(responder) => responder(frame),
                None => Vec::new(),
            };
            (sender, replies)
        };

        for reply in replies {
            sender
                .send(TransportEvent::Notification(reply))
                .await
                .map_err(|_| TransportError::Disconnected)?;
        }
        Ok(())
    }

    async fn read_characteristic(&self, uuid: Uuid) -> Result<Vec<u8>, TransportError> {
        let state = self.lock();
        if state.sender.is_none() {
            return Err(TransportError::NotConnected);
        }
        state
            .characteristics
            .get(&uuid)
            .cloned()
            .ok_or_else(|| TransportError::Io(format!("characteristic {uuid} not found")))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.lock().sender = None;
        Ok(())
    }
}
