//! The protocol session: connection lifecycle, command sequencing, and reply matching.
//!
//! # How replies are matched (for beginners)
//!
//! Boks frames carry no request id.  When the controller writes a command,
//! the box answers with a notification of a known *kind* (a door status, a
//! code-operation result, …), possibly interleaved with unrelated traffic
//! such as the logs count the firmware volunteers after almost every command.
//! The session therefore keeps a FIFO of *expectations*, one per command
//! sent, and resolves the oldest expectation whose kind matches each
//! incoming event.  Everything is also broadcast to subscribers, matched or
//! not.
//!
//! Error frames carry no opcode of the command they refuse; they fail the
//! most recently registered expectation, since the firmware answers the last
//! write first.  A wrong door code is answered by `0x82` alone and resolves
//! the pending `OPEN_DOOR`.  Dropping a [`PendingReply`] withdraws its
//! expectation.
//!
//! # Log chaining
//!
//! When the box reports `LogsCount { count > 0 }` the session requests the
//! history itself, then collects every history entry until `END_HISTORY`.
//! The automatic request is tracked like any other command, so a rejection
//! fails the download instead of an unrelated caller.
//! Callers who want the entries use [`BoksSession::fetch_history`] or attach
//! to the next download with [`BoksSession::await_history`].
//!
//! # Connection generations
//!
//! Each successful `connect` starts one reader task tagged with a generation
//! number.  `disconnect` and reconnects bump the generation, so a reader from
//! an old link can never tear down a newer one.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use boks_core::device_info::{DeviceInfoField, BATTERY_CHAR_UUID, BATTERY_LEVEL_CHAR_UUID};
use boks_core::protocol::{format_hex, opcodes};
use boks_core::{
    decode_battery, decode_notification, name_of, BatteryChemistry, BatteryHealth,
    BatteryReading, BoksEvent, CodeType, Command, DeviceInfo, Frame, HistoryEntry, ReplyKind,
};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{SessionError, TransportError};
use crate::transport::{Transport, TransportEvent};

// ── Public types ──────────────────────────────────────────────────────────────

/// Where the session is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connecting,
    /// Linked, with no command waiting for its reply.
    Connected,
    /// Linked, with at least one command waiting for its reply.
    AwaitingResponse,
}

impl SessionState {
    /// Whether commands can be sent in this state.
    pub fn is_connected(self) -> bool {
        matches!(self, SessionState::Connected | SessionState::AwaitingResponse)
    }
}

type ReplySender = oneshot::Sender<Result<BoksEvent, SessionError>>;
type HistorySender = oneshot::Sender<Result<Vec<HistoryEntry>, SessionError>>;

/// The reply to one command.  Await it, or drop it to fire and forget.
///
/// Dropping an unresolved reply withdraws it from the session, so a later
/// notification of the same kind goes to the next caller.
#[derive(Debug)]
pub struct PendingReply {
    id: u64,
    kind: ReplyKind,
    rx: oneshot::Receiver<Result<BoksEvent, SessionError>>,
    shared: Weak<Shared>,
}

impl PendingReply {
    /// The notification kind that will resolve this reply.
    pub fn kind(&self) -> ReplyKind {
        self.kind
    }
}

impl Future for PendingReply {
    type Output = Result<BoksEvent, SessionError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(SessionError::ConnectionLost)))
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.cancel_expectation(self.id);
        }
    }
}

/// A history download in progress.  Resolves with the entries in arrival order.
#[derive(Debug)]
pub struct HistoryRetrieval {
    rx: oneshot::Receiver<Result<Vec<HistoryEntry>, SessionError>>,
}

impl Future for HistoryRetrieval {
    type Output = Result<Vec<HistoryEntry>, SessionError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(SessionError::ConnectionLost)))
    }
}

// ── Shared state ──────────────────────────────────────────────────────────────

/// Who is told when an expectation resolves.
enum Waiter {
    Caller(ReplySender),
    /// The automatic history request; the history waiters get its outcome.
    History,
}

struct Expectation {
    id: u64,
    /// Opcode of the command that registered it.
    opcode: u8,
    kind: ReplyKind,
    waiter: Waiter,
}

impl Expectation {
    fn accepts(&self, event: &BoksEvent) -> bool {
        match event {
            BoksEvent::OpenCodeResult { valid: false } => self.opcode == opcodes::OPEN_DOOR,
            _ => event.reply_kind() == Some(self.kind),
        }
    }

    /// A caller expectation whose [`PendingReply`] is gone.
    fn is_abandoned(&self) -> bool {
        matches!(&self.waiter, Waiter::Caller(reply) if reply.is_closed())
    }

    fn resolve(self, result: Result<BoksEvent, SessionError>) {
        if let Waiter::Caller(reply) = self.waiter {
            let _ = reply.send(result);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryPhase {
    Idle,
    /// `REQUEST_LOGS` was written; no entry has arrived yet.
    Requested,
    Streaming,
}

/// Outstanding replies and the history download, guarded together.
struct Book {
    expectations: VecDeque<Expectation>,
    next_id: u64,
    phase: HistoryPhase,
    entries: Vec<HistoryEntry>,
    history_waiters: Vec<HistorySender>,
}

impl Book {
    fn new() -> Self {
        Self {
            expectations: VecDeque::new(),
            next_id: 0,
            phase: HistoryPhase::Idle,
            entries: Vec::new(),
            history_waiters: Vec::new(),
        }
    }

    fn register(&mut self, opcode: u8, kind: ReplyKind, waiter: Waiter) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.expectations.push_back(Expectation {
            id,
            opcode,
            kind,
            waiter,
        });
        id
    }

    /// Drops expectations and history waiters nobody listens to any more.
    fn prune(&mut self) {
        self.expectations.retain(|e| !e.is_abandoned());
        self.history_waiters.retain(|w| !w.is_closed());
    }

    fn resolve_history(&mut self, result: Result<Vec<HistoryEntry>, SessionError>) {
        for waiter in self.history_waiters.drain(..) {
            let _ = waiter.send(result.clone());
        }
    }

    /// Abandons the current download and fails everyone waiting for it.
    fn fail_history(&mut self, error: SessionError) {
        self.phase = HistoryPhase::Idle;
        self.entries.clear();
        self.resolve_history(Err(error));
    }
}

struct Shared {
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    events: broadcast::Sender<BoksEvent>,
    state: watch::Sender<SessionState>,
    write_lock: tokio::sync::Mutex<()>,
    book: Mutex<Book>,
    generation: AtomicU64,
}

impl Shared {
    fn lock_book(&self) -> MutexGuard<'_, Book> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_state(&self) -> SessionState {
        *self.state.borrow()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Moves between `Connected` and `AwaitingResponse` to reflect the book.
    fn refresh_state(&self, book: &mut Book) {
        book.prune();
        self.state.send_if_modified(|state| {
            if !state.is_connected() {
                return false;
            }
            let next = if book.expectations.is_empty() {
                SessionState::Connected
            } else {
                SessionState::AwaitingResponse
            };
            let changed = *state != next;
            *state = next;
            changed
        });
    }

    fn expect_reply(&self, opcode: u8, kind: ReplyKind, reply: ReplySender) -> u64 {
        let mut book = self.lock_book();
        let id = book.register(opcode, kind, Waiter::Caller(reply));
        self.refresh_state(&mut book);
        id
    }

    fn cancel_expectation(&self, id: u64) {
        let mut book = self.lock_book();
        book.expectations.retain(|e| e.id != id);
        self.refresh_state(&mut book);
    }

    async fn write_frame(&self, frame: &Frame) -> Result<(), SessionError> {
        let bytes = frame.to_bytes();
        let _guard = self.write_lock.lock().await;
        if !self.current_state().is_connected() {
            return Err(SessionError::NotConnected);
        }
        debug!("TX {} [{}]", name_of(frame.opcode()), format_hex(&bytes));
        self.transport.write(&bytes).await.map_err(|e| {
            warn!("write of {} failed: {e}", name_of(frame.opcode()));
            SessionError::from(e)
        })
    }

    async fn write_command(&self, command: &Command) -> Result<(), SessionError> {
        let frame = command.to_frame()?;
        self.write_frame(&frame).await
    }

    /// Fails everything in flight and marks the session disconnected.
    fn teardown(&self) {
        let mut book = self.lock_book();
        for expectation in book.expectations.drain(..) {
            expectation.resolve(Err(SessionError::ConnectionLost));
        }
        book.resolve_history(Err(SessionError::ConnectionLost));
        book.entries.clear();
        book.phase = HistoryPhase::Idle;
        self.state.send_replace(SessionState::Disconnected);
    }

    fn handle_notification(self: &Arc<Self>, raw: &[u8]) {
        let event = decode_notification(raw);
        match raw.first() {
            Some(&opcode) => debug!("RX {} [{}]", name_of(opcode), format_hex(raw)),
            None => debug!("RX empty notification"),
        }
        if let BoksEvent::Malformed { opcode, reason, .. } = &event {
            let name = opcode.map_or_else(|| "?".into(), name_of);
            warn!("malformed frame from {name}: {reason}");
        }

        let auto_request = self.dispatch(&event);

        // Sending only fails when nobody is subscribed
        let _ = self.events.send(event);

        if let Some(id) = auto_request {
            let shared = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = shared.write_command(&Command::RequestLogs).await {
                    warn!("automatic history request failed: {e}");
                    let mut book = shared.lock_book();
                    book.expectations.retain(|x| x.id != id);
                    book.fail_history(e);
                    shared.refresh_state(&mut book);
                }
            });
        }
    }

    /// Applies one event to the book.
    ///
    /// Returns the expectation id of an automatic history request the caller
    /// must now write.
    fn dispatch(&self, event: &BoksEvent) -> Option<u64> {
        let mut book = self.lock_book();
        book.prune();
        let mut auto_request = None;

        match event {
            BoksEvent::History(entry) => {
                book.phase = HistoryPhase::Streaming;
                book.entries.push(entry.clone());
            }
            BoksEvent::EndOfHistory => {
                book.phase = HistoryPhase::Idle;
                let entries = std::mem::take(&mut book.entries);
                info!("history download complete: {} entries", entries.len());
                book.resolve_history(Ok(entries));
                // One download answers every outstanding history request
                let (done, pending): (VecDeque<_>, VecDeque<_>) =
                    std::mem::take(&mut book.expectations)
                        .into_iter()
                        .partition(|e| e.kind == ReplyKind::EndOfHistory);
                book.expectations = pending;
                for expectation in done {
                    expectation.resolve(Ok(event.clone()));
                }
            }
            BoksEvent::LogsCount { count } => {
                if book.phase == HistoryPhase::Idle {
                    if *count == 0 {
                        book.resolve_history(Ok(Vec::new()));
                    } else if self.config.auto_request_logs || !book.history_waiters.is_empty() {
                        info!("device reports {count} pending log entries; requesting history");
                        book.phase = HistoryPhase::Requested;
                        auto_request = Some(book.register(
                            opcodes::REQUEST_LOGS,
                            ReplyKind::EndOfHistory,
                            Waiter::History,
                        ));
                    }
                }
            }
            BoksEvent::CommandRejected { opcode, reason } => {
                warn!("device rejected a command with {}: {reason}", name_of(*opcode));
                let error = SessionError::Rejected { reason: *reason };
                match book.expectations.pop_back() {
                    Some(expectation) => {
                        debug!("rejection fails the pending {}", name_of(expectation.opcode));
                        if expectation.kind == ReplyKind::EndOfHistory {
                            book.fail_history(error.clone());
                        }
                        expectation.resolve(Err(error));
                    }
                    None => debug!("rejection with no command awaiting a reply"),
                }
            }
            _ => {}
        }

        let matched = book.expectations.iter().position(|e| e.accepts(event));
        if let Some(expectation) = matched.and_then(|idx| book.expectations.remove(idx)) {
            expectation.resolve(Ok(event.clone()));
        }

        self.refresh_state(&mut book);
        auto_request
    }
}

async fn read_loop(
    shared: Arc<Shared>,
    generation: u64,
    mut events: mpsc::Receiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        if !shared.is_current(generation) {
            debug!("reader for connection {generation} is stale; exiting");
            return;
        }
        match event {
            TransportEvent::Notification(raw) => shared.handle_notification(&raw),
            TransportEvent::Disconnected => break,
        }
    }

    if shared.is_current(generation) {
        warn!("link to Boks lost");
        shared.teardown();
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// One controller session with one box.
///
/// Cloning is cheap and every clone drives the same connection.
#[derive(Clone)]
pub struct BoksSession {
    shared: Arc<Shared>,
}

impl BoksSession {
    /// Creates a disconnected session over `transport`.
    pub fn new(transport: Arc<dyn Transport>, config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                transport,
                config,
                events,
                state,
                write_lock: tokio::sync::Mutex::new(()),
                book: Mutex::new(Book::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn state(&self) -> SessionState {
        self.shared.current_state()
    }

    /// A receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Subscribes to decoded events.  Only events after this call are delivered.
    pub fn subscribe(&self) -> broadcast::Receiver<BoksEvent> {
        self.shared.events.subscribe()
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Opens the link and starts dispatching notifications.
    ///
    /// Connecting an already connected session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyConnecting`] while another `connect` is
    /// in flight, or the transport error if the link cannot be opened.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let start = self.shared.state.send_if_modified(|state| {
            if *state == SessionState::Disconnected {
                *state = SessionState::Connecting;
                true
            } else {
                false
            }
        });
        if !start {
            return match self.state() {
                SessionState::Connecting => Err(SessionError::AlreadyConnecting),
                _ => Ok(()),
            };
        }

        info!("connecting to Boks");
        let events = match self.shared.transport.connect().await {
            Ok(events) => events,
            Err(e) => {
                warn!("connection failed: {e}");
                self.shared.state.send_replace(SessionState::Disconnected);
                return Err(e.into());
            }
        };

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.state.send_replace(SessionState::Connected);
        tokio::spawn(read_loop(Arc::clone(&self.shared), generation, events));
        info!("connected (connection {generation})");
        Ok(())
    }

    /// Closes the link.  Every pending reply fails with [`SessionError::ConnectionLost`].
    ///
    /// The session can be connected again afterwards.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        let result = self.shared.transport.disconnect().await;
        self.shared.teardown();
        info!("disconnected");
        result.map_err(SessionError::from)
    }

    fn ensure_connected(&self) -> Result<(), SessionError> {
        if self.state().is_connected() {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Sends a command and returns a handle on its reply.
    ///
    /// # Errors
    ///
    /// [`SessionError::Encode`] if the command is malformed (nothing is sent),
    /// [`SessionError::NotConnected`] without a link, or the transport error
    /// if the write fails.
    pub async fn send(&self, command: Command) -> Result<PendingReply, SessionError> {
        let frame = command.to_frame()?;
        self.ensure_connected()?;

        let kind = command.expected_reply();
        let (tx, rx) = oneshot::channel();
        let id = self.shared.expect_reply(frame.opcode(), kind, tx);
        let starts_download = matches!(command, Command::RequestLogs) && {
            let mut book = self.shared.lock_book();
            let idle = book.phase == HistoryPhase::Idle;
            if idle {
                book.phase = HistoryPhase::Requested;
            }
            idle
        };

        let reply = PendingReply {
            id,
            kind,
            rx,
            shared: Arc::downgrade(&self.shared),
        };
        // On failure `reply` is dropped, which withdraws the expectation
        if let Err(e) = self.shared.write_frame(&frame).await {
            if starts_download {
                self.shared.lock_book().fail_history(e.clone());
            }
            return Err(e);
        }
        Ok(reply)
    }

    pub async fn open_door(&self, code: impl Into<String>) -> Result<PendingReply, SessionError> {
        self.send(Command::OpenDoor { code: code.into() }).await
    }

    pub async fn ask_door_status(&self) -> Result<PendingReply, SessionError> {
        self.send(Command::AskDoorStatus).await
    }

    /// Stores a code.  `index` is the slot and is required for master codes.
    pub async fn create_code(
        &self,
        config_key: impl Into<String>,
        code: impl Into<String>,
        code_type: CodeType,
        index: Option<u8>,
    ) -> Result<PendingReply, SessionError> {
        self.send(Command::CreateCode {
            config_key: config_key.into(),
            code: code.into(),
            code_type,
            index,
        })
        .await
    }

    pub async fn delete_master_code(
        &self,
        config_key: impl Into<String>,
        index: u8,
    ) -> Result<PendingReply, SessionError> {
        self.send(Command::DeleteMasterCode {
            config_key: config_key.into(),
            index,
        })
        .await
    }

    pub async fn set_configuration(
        &self,
        config_key: impl Into<String>,
        option_id: u8,
        value: u8,
    ) -> Result<PendingReply, SessionError> {
        self.send(Command::SetConfiguration {
            config_key: config_key.into(),
            option_id,
            value,
        })
        .await
    }

    pub async fn set_vigik(
        &self,
        config_key: impl Into<String>,
        enabled: bool,
    ) -> Result<PendingReply, SessionError> {
        self.send(Command::set_vigik(config_key, enabled)).await
    }

    pub async fn get_logs_count(&self) -> Result<PendingReply, SessionError> {
        self.send(Command::GetLogsCount).await
    }

    pub async fn request_logs(&self) -> Result<PendingReply, SessionError> {
        self.send(Command::RequestLogs).await
    }

    pub async fn count_codes(&self) -> Result<PendingReply, SessionError> {
        self.send(Command::CountCodes).await
    }

    // ── History ───────────────────────────────────────────────────────────────

    /// Asks for the logs count and collects the download it triggers.
    ///
    /// Resolves with an empty list when the box has no logs.  The history is
    /// requested even when `auto_request_logs` is off, since a caller is
    /// waiting for it.
    ///
    /// # Errors
    ///
    /// Fails like [`BoksSession::send`]; the waiter is withdrawn, so a later
    /// logs count is handled as if this call never happened.
    pub async fn fetch_history(&self) -> Result<HistoryRetrieval, SessionError> {
        self.ensure_connected()?;
        let retrieval = self.await_history();
        if let Err(e) = self.send(Command::GetLogsCount).await {
            drop(retrieval);
            self.shared.lock_book().prune();
            return Err(e);
        }
        Ok(retrieval)
    }

    /// Attaches to the next history completion without sending anything.
    pub fn await_history(&self) -> HistoryRetrieval {
        let (tx, rx) = oneshot::channel();
        if self.state().is_connected() {
            self.shared.lock_book().history_waiters.push(tx);
        } else {
            let _ = tx.send(Err(SessionError::NotConnected));
        }
        HistoryRetrieval { rx }
    }

    // ── Maintenance ───────────────────────────────────────────────────────────

    /// Deletes every master slot (0–255) until the box reports none left.
    ///
    /// Each pass writes one delete per slot, paced by `wipe_step_delay_ms`,
    /// waits `wipe_settle_delay_ms`, then re-counts.  Deletions are not
    /// awaited individually; their results are only broadcast.  Returns the
    /// master count after the last pass.
    pub async fn wipe_master_codes(
        &self,
        config_key: &str,
        max_passes: u32,
    ) -> Result<u16, SessionError> {
        // Validate the key before touching the box
        Command::DeleteMasterCode {
            config_key: config_key.to_string(),
            index: 0,
        }
        .to_frame()?;

        let mut remaining = self.count_master_codes().await?;
        let mut pass = 0;
        while remaining > 0 && pass < max_passes {
            pass += 1;
            info!("wipe pass {pass}/{max_passes}: {remaining} master codes stored");
            for index in 0..=u8::MAX {
                let command = Command::DeleteMasterCode {
                    config_key: config_key.to_string(),
                    index,
                };
                self.shared.write_command(&command).await?;
                tokio::time::sleep(self.shared.config.wipe_step_delay()).await;
            }
            tokio::time::sleep(self.shared.config.wipe_settle_delay()).await;
            remaining = self.count_master_codes().await?;
        }

        info!("wipe finished after {pass} passes: {remaining} master codes remain");
        Ok(remaining)
    }

    async fn count_master_codes(&self) -> Result<u16, SessionError> {
        match self.count_codes().await?.await? {
            BoksEvent::CodesCount { master, .. } => Ok(master),
            other => Err(SessionError::UnexpectedReply(format!("{other:?}"))),
        }
    }

    // ── Characteristic reads ──────────────────────────────────────────────────

    /// Reads and decodes the vendor battery characteristic.
    pub async fn read_battery(&self) -> Result<BatteryReading, SessionError> {
        self.ensure_connected()?;
        let raw = self
            .shared
            .transport
            .read_characteristic(BATTERY_CHAR_UUID)
            .await?;
        debug!("battery characteristic [{}]", format_hex(&raw));
        Ok(decode_battery(&raw))
    }

    /// Reads the standard Battery Level characteristic, in percent.
    ///
    /// Returns `None` when the box answers with an empty value.
    pub async fn read_battery_level(&self) -> Result<Option<u8>, SessionError> {
        self.ensure_connected()?;
        let raw = self
            .shared
            .transport
            .read_characteristic(BATTERY_LEVEL_CHAR_UUID)
            .await?;
        Ok(raw.first().copied())
    }

    /// Reads the battery and classifies it.
    ///
    /// The chemistry comes from the configuration when set, otherwise from
    /// the hardware generation the firmware revision reveals.
    pub async fn read_battery_health(&self) -> Result<BatteryHealth, SessionError> {
        let chemistry = match self.shared.config.chemistry {
            Some(chemistry) => chemistry,
            None => self.infer_chemistry().await?,
        };
        let reading = self.read_battery().await?;
        let health = reading.health(chemistry);
        if let Some(message) = &health.message {
            warn!("battery {}: {message}", health.level);
        }
        Ok(health)
    }

    /// Battery chemistry of the connected box, from its firmware revision.
    ///
    /// Falls back to the default chemistry for unknown hardware.
    pub async fn infer_chemistry(&self) -> Result<BatteryChemistry, SessionError> {
        let profile = self.read_device_info().await?.hardware_profile();
        Ok(match profile.chemistry() {
            Some(chemistry) => chemistry,
            None => {
                let fallback = BatteryChemistry::default();
                warn!("unknown hardware generation; assuming {fallback} cells");
                fallback
            }
        })
    }

    /// Reads the Device Information strings.  Unreadable characteristics are left empty.
    pub async fn read_device_info(&self) -> Result<DeviceInfo, SessionError> {
        self.ensure_connected()?;
        let mut info = DeviceInfo::default();
        for field in DeviceInfoField::ALL {
            match self.shared.transport.read_characteristic(field.uuid()).await {
                Ok(raw) => info.set(field, &raw),
                Err(TransportError::Io(e)) => debug!("{field} unreadable: {e}"),
                Err(e) => return Err(e.into()),
            }
        }
        let profile = info.hardware_profile();
        info!(
            "device firmware {:?}, hardware {:?} (PCB {})",
            info.firmware_revision,
            profile,
            profile.pcb_version().unwrap_or("unknown")
        );
        Ok(info)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
