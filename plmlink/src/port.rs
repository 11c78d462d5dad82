//! Port orchestration
//!
//! A [`Port`] binds one transport to one reader task and one writer task and
//! implements the bus flow-control protocol: at most one unacknowledged send
//! outstanding at a time, NACK/timeout handled by retransmission, and every
//! inbound message fanned out to the listener registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, error, trace, warn};

use plmlink_core::constants::{ACK_TIMEOUT, RETRY_BACKOFF};
use plmlink_core::{Direction, LayoutTable, Message, MessageCodec};
use plmlink_transport::{Transport, TransportReader, TransportWriter};
use plmlink_types::ModemInfo;

use crate::error::{Error, Result};
use crate::listener::{ListenerRegistry, MsgListener};
use crate::modem::ModemBootstrap;

/// Flow-control state shared between the reader and writer tasks
///
/// The writer only consults this while one send is outstanding; there is no
/// idle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowState {
    /// Writer has sent and is waiting for the reply
    AwaitingAck,

    /// Reader saw the expected reply, positively acknowledged
    GotAck,

    /// Reader saw a negative acknowledgement (or the wait timed out)
    GotNack,
}

/// The single mutex/condvar pair shared between the two tasks
struct FlowControl {
    state: Mutex<FlowState>,
    notify: Notify,
}

impl FlowControl {
    fn new() -> Self {
        Self {
            state: Mutex::new(FlowState::GotAck),
            notify: Notify::new(),
        }
    }

    /// Called by the writer right before sending
    fn arm(&self) {
        *self.state.lock() = FlowState::AwaitingAck;
    }

    /// Called by the reader; only takes effect while the writer is waiting
    fn resolve(&self, outcome: FlowState) {
        let mut state = self.state.lock();
        if *state == FlowState::AwaitingAck {
            *state = outcome;
            self.notify.notify_one();
        }
    }

    /// Wait until the reader resolves the outstanding send, or the timeout
    /// elapses. Timing out is reported as a NACK so a silent modem becomes
    /// a retriable condition instead of a hang.
    async fn wait(&self, timeout: Duration) -> FlowState {
        let deadline = Instant::now() + timeout;
        loop {
            match *self.state.lock() {
                FlowState::AwaitingAck => {}
                resolved => return resolved,
            }

            if timeout_at(deadline, self.notify.notified()).await.is_err() {
                return FlowState::GotNack;
            }
        }
    }
}

/// Communication port bound to one physical bus
///
/// Owns the transport, an unbounded outbound queue, and the listener
/// registry. `start()` spawns the reader and writer tasks and kicks off
/// modem identification; `stop()` tears everything down. A stopped port
/// cannot be restarted; create a new instance per start/stop cycle.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use plmlink::Port;
/// use plmlink_core::defs::modem_layouts;
/// use plmlink_transport::SerialTransport;
///
/// #[tokio::main]
/// async fn main() -> plmlink::Result<()> {
///     let transport = SerialTransport::new("/dev/ttyUSB0");
///     let mut port = Port::new(Box::new(transport), Arc::new(modem_layouts()));
///
///     port.start().await?;
///     // ... register listeners, write messages ...
///     port.stop().await?;
///     Ok(())
/// }
/// ```
pub struct Port {
    transport: Box<dyn Transport>,
    table: Arc<dyn LayoutTable>,
    listeners: Arc<ListenerRegistry>,
    outbound_tx: mpsc::UnboundedSender<Message>,
    outbound_rx: Option<mpsc::UnboundedReceiver<Message>>,
    flow: Arc<FlowControl>,
    running: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    reader_handle: Option<JoinHandle<()>>,
    writer_handle: Option<JoinHandle<()>>,
    ack_timeout: Duration,
    modem_info_tx: watch::Sender<Option<ModemInfo>>,
    modem_info_rx: watch::Receiver<Option<ModemInfo>>,
}

impl Port {
    /// Create a port over the given transport and frame-layout table
    pub fn new(transport: Box<dyn Transport>, table: Arc<dyn LayoutTable>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);
        let (modem_info_tx, modem_info_rx) = watch::channel(None);

        Self {
            transport,
            table,
            listeners: Arc::new(ListenerRegistry::new()),
            outbound_tx,
            outbound_rx: Some(outbound_rx),
            flow: Arc::new(FlowControl::new()),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            reader_handle: None,
            writer_handle: None,
            ack_timeout: ACK_TIMEOUT,
            modem_info_tx,
            modem_info_rx,
        }
    }

    /// Set how long one send waits for its reply before retransmitting
    pub fn with_ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    /// Check if the port tasks are running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Identity of the local modem, once the bootstrap reply has arrived
    pub fn modem_info(&self) -> Option<ModemInfo> {
        *self.modem_info_rx.borrow()
    }

    /// Watch channel that resolves when the modem has been identified
    pub fn modem_info_updates(&self) -> watch::Receiver<Option<ModemInfo>> {
        self.modem_info_rx.clone()
    }

    /// Register a listener for inbound messages; idempotent
    pub fn add_listener(&self, listener: Arc<dyn MsgListener>) {
        self.listeners.add(listener);
    }

    /// Deregister a listener; idempotent
    pub fn remove_listener(&self, listener: &dyn MsgListener) {
        self.listeners.remove(listener);
    }

    /// Enqueue a message for transmission
    ///
    /// Fire-and-forget: success means the message was queued, not delivered.
    /// Replies and delivery status are observable only through listeners.
    ///
    /// # Errors
    ///
    /// Fails synchronously if the port is not running or the message is
    /// structurally invalid.
    pub fn write_message(&self, msg: Message) -> Result<()> {
        if !self.is_running() {
            return Err(Error::NotRunning);
        }
        if msg.raw().is_empty() {
            return Err(Error::InvalidMessage("no raw bytes".into()));
        }
        if msg.direction() != Direction::Outbound {
            return Err(Error::InvalidMessage("not an outbound message".into()));
        }

        self.outbound_tx.send(msg).map_err(|_| Error::NotRunning)
    }

    /// Open the transport and spawn the reader and writer tasks
    ///
    /// Fails fast, spawning nothing, if the transport cannot be opened.
    /// On success the modem identification request goes out as the first
    /// queued message.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(Error::AlreadyRunning);
        }
        let Some(outbound_rx) = self.outbound_rx.take() else {
            return Err(Error::NotRestartable);
        };

        let (rd, wr) = match self.transport.open().await {
            Ok(halves) => halves,
            Err(e) => {
                error!("Could not open transport {}: {}", self.transport.description(), e);
                self.outbound_rx = Some(outbound_rx);
                return Err(e.into());
            }
        };

        let source = self.transport.description();
        debug!("Starting port on {}", source);
        self.running.store(true, Ordering::Release);

        let reader = Reader {
            rd,
            codec: MessageCodec::new(self.table.clone()),
            listeners: self.listeners.clone(),
            flow: self.flow.clone(),
            shutdown: self.shutdown_tx.subscribe(),
            source: source.clone(),
        };
        let writer = Writer {
            wr,
            outbound_rx,
            flow: self.flow.clone(),
            shutdown: self.shutdown_tx.subscribe(),
            ack_timeout: self.ack_timeout,
            source,
        };
        self.reader_handle = Some(tokio::spawn(reader.run()));
        self.writer_handle = Some(tokio::spawn(writer.run()));

        // Bootstrap: identify the local modem, then the listener removes
        // itself
        let bootstrap = Arc::new(ModemBootstrap::new(
            self.listeners.clone(),
            self.modem_info_tx.clone(),
        ));
        self.listeners.add(bootstrap);
        self.write_message(ModemBootstrap::request())?;

        Ok(())
    }

    /// Stop the port: cancel both tasks, wait for them to exit, close the
    /// transport and clear the listener registry
    ///
    /// Safe to call on a port that is already stopped or never started.
    pub async fn stop(&mut self) -> Result<()> {
        if self.reader_handle.is_none() && self.writer_handle.is_none() {
            return Ok(());
        }

        debug!("Stopping port on {}", self.transport.description());
        self.running.store(false, Ordering::Release);
        let _ = self.shutdown_tx.send(true);

        if let Some(handle) = self.reader_handle.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.writer_handle.take() {
            let _ = handle.await;
        }

        self.transport.close().await?;
        self.listeners.clear();

        debug!("Port stopped");
        Ok(())
    }
}

/// Reader task: transport bytes -> codec -> dispatch + flow classification
struct Reader {
    rd: TransportReader,
    codec: MessageCodec,
    listeners: Arc<ListenerRegistry>,
    flow: Arc<FlowControl>,
    shutdown: watch::Receiver<bool>,
    source: String,
}

impl Reader {
    async fn run(mut self) {
        let mut buf = BytesMut::with_capacity(256);

        loop {
            let n = tokio::select! {
                _ = self.shutdown.changed() => break,
                res = self.rd.read_buf(&mut buf) => match res {
                    Ok(0) => {
                        debug!("Transport {} closed", self.source);
                        break;
                    }
                    Ok(n) => n,
                    Err(e) => {
                        error!("Read on {} failed: {}", self.source, e);
                        break;
                    }
                },
            };

            trace!("Read {} bytes: {:02X?}", n, &buf[..n.min(16)]);
            self.codec.add_data(&buf);
            buf.clear();

            loop {
                match self.codec.process_data() {
                    Ok(Some(msg)) => self.handle_message(&msg),
                    Ok(None) => break,
                    Err(e) => {
                        // Unclassifiable bytes: resynchronize and release a
                        // waiting writer rather than leave it to hang on a
                        // reply that may never be recognized
                        warn!("Parse fault on {}: {}; treating outstanding send as acked", self.source, e);
                        self.flow.resolve(FlowState::GotAck);
                    }
                }
            }
        }

        debug!("Reader task on {} exiting", self.source);
    }

    fn handle_message(&self, msg: &Message) {
        trace!("Received: {}", msg);

        // All traffic goes to the listeners, independent of flow control
        self.listeners.dispatch(msg, &self.source);

        if msg.is_pure_nack() {
            self.flow.resolve(FlowState::GotNack);
        } else if !msg.is_unsolicited() {
            // The reply to our outstanding send
            let outcome = if msg.is_reply_nack() {
                FlowState::GotNack
            } else {
                FlowState::GotAck
            };
            self.flow.resolve(outcome);
        }
        // Unsolicited traffic leaves the flow state untouched; the writer
        // keeps waiting for its own reply
    }
}

/// Writer task: outbound queue -> transport, one flow-control cycle per
/// message
struct Writer {
    wr: TransportWriter,
    outbound_rx: mpsc::UnboundedReceiver<Message>,
    flow: Arc<FlowControl>,
    shutdown: watch::Receiver<bool>,
    ack_timeout: Duration,
    source: String,
}

impl Writer {
    async fn run(mut self) {
        loop {
            let msg = tokio::select! {
                _ = self.shutdown.changed() => break,
                msg = self.outbound_rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };

            if !self.send_until_acked(&msg).await {
                break;
            }

            // Bus-level rate limiting after a completed send
            if msg.quiet_time() > Duration::ZERO {
                trace!("Quiet time: {:?}", msg.quiet_time());
                tokio::select! {
                    _ = self.shutdown.changed() => break,
                    _ = sleep(msg.quiet_time()) => {}
                }
            }
        }

        debug!("Writer task on {} exiting", self.source);
    }

    /// One flow-control cycle: send, await the classification, retransmit
    /// on NACK or timeout. Retries are unbounded; the loop ends only on
    /// ACK, cancellation or a transport fault. Returns false when the task
    /// should exit.
    async fn send_until_acked(&mut self, msg: &Message) -> bool {
        let mut attempt = 1u32;
        loop {
            self.flow.arm();

            trace!("Sending (attempt {}): {}", attempt, msg);
            if let Err(e) = self.wr.write_all(msg.raw()).await {
                error!("Write on {} failed: {}", self.source, e);
                return false;
            }
            if let Err(e) = self.wr.flush().await {
                error!("Flush on {} failed: {}", self.source, e);
                return false;
            }

            let outcome = tokio::select! {
                // Cancellation abandons the send without retry
                _ = self.shutdown.changed() => return false,
                outcome = self.flow.wait(self.ack_timeout) => outcome,
            };

            match outcome {
                FlowState::GotAck => return true,
                FlowState::GotNack => {
                    debug!("Send nacked or timed out (attempt {}), retransmitting {}", attempt, msg);
                    attempt += 1;
                    tokio::select! {
                        _ = self.shutdown.changed() => return false,
                        _ = sleep(RETRY_BACKOFF) => {}
                    }
                }
                // wait() only returns a resolved state
                FlowState::AwaitingAck => unreachable!(),
            }
        }
    }
}
