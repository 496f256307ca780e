//! Connection lifecycle shared by every vendor and transport.
//!
//! A [`Session`] owns one link to a PLC and runs two background threads:
//!
//! - a **reader** that reassembles reply frames and hands them to the
//!   waiting request ([`Correlator`])
//! - a **health monitor** that checks the link every second and reconnects
//!   when it dropped
//!
//! Both threads stop cooperatively: each holds a cancellation flag that is
//! polled between blocking calls of at most [`POLL_INTERVAL`].
//!
//! # State machine
//!
//! ```text
//! Disconnected --open/refresh--> Connecting --ok--> Connected
//!      ^                              |                 |
//!      +-------------fail-------------+----lost/close---+
//! ```
//!
//! Requests are half-duplex: [`Session::transact`] holds the communication
//! lock while it writes a frame and waits for its reply.

use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, trace, warn};

use crate::correlation::{Correlator, Reply};
use crate::error::{PlcError, Result};
use crate::packet::{ReceivingPacket, SendingPacket};
use crate::protocol::{Exchange, Protocol};
use crate::transport::{Connection, Connector, FrameAssembler, POLL_INTERVAL, READ_CHUNK};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No link.
    Disconnected,
    /// A link is being opened.
    Connecting,
    /// Link open and reader running.
    Connected,
}

/// Timing and retry options of a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// How long a request waits for its reply.
    pub response_timeout: Duration,
    /// Failed reconnects tolerated in a row; the next failure is fatal.
    /// 0 retries forever.
    pub reconnect_count: u16,
    /// Period of the health check.
    pub check_interval: Duration,
    /// Medium named in the fatal reconnect message ("LAN cable").
    pub cable_hint: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_millis(1000),
            reconnect_count: 0,
            check_interval: Duration::from_secs(1),
            cable_hint: "LAN cable".to_string(),
        }
    }
}

impl SessionOptions {
    /// Sets the response timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Sets the reconnect budget.
    pub fn with_reconnect_count(mut self, count: u16) -> Self {
        self.reconnect_count = count;
        self
    }

    /// Sets the health check period.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Sets the medium named in the fatal reconnect message.
    pub fn with_cable_hint(mut self, hint: impl Into<String>) -> Self {
        self.cable_hint = hint.into();
        self
    }
}

/// A background thread and its cancellation flag.
struct Worker {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn stop(self) {
        self.cancel.store(true, Ordering::Release);
        if self.handle.thread().id() != thread::current().id() {
            let _ = self.handle.join();
        }
    }
}

struct Shared<P: Protocol> {
    protocol: P,
    connector: Box<dyn Connector>,
    options: SessionOptions,
    state: Mutex<SessionState>,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
    reader: Mutex<Option<Worker>>,
    correlator: Correlator,
    comm: Mutex<()>,
    lifecycle: Mutex<()>,
    fatal: RwLock<Option<String>>,
    closed: AtomicBool,
}

/// One link to a PLC, generic over the vendor dialect.
pub struct Session<P: Protocol> {
    shared: Arc<Shared<P>>,
    health: Mutex<Option<Worker>>,
}

impl<P: Protocol> std::fmt::Debug for Session<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.shared.connector.endpoint())
            .field("state", &self.state())
            .finish()
    }
}

impl<P: Protocol> Session<P> {
    /// Opens the link and starts the background threads.
    pub fn open(protocol: P, connector: Box<dyn Connector>, options: SessionOptions) -> Result<Self> {
        let shared = Arc::new(Shared {
            protocol,
            connector,
            options,
            state: Mutex::new(SessionState::Disconnected),
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            correlator: Correlator::new(),
            comm: Mutex::new(()),
            lifecycle: Mutex::new(()),
            fatal: RwLock::new(None),
            closed: AtomicBool::new(false),
        });
        shared.relink()?;
        info!(endpoint = %shared.connector.endpoint(), "session opened");

        let health = match spawn_health(&shared) {
            Ok(worker) => worker,
            Err(err) => {
                shared.unlink();
                return Err(err);
            }
        };
        Ok(Self {
            shared,
            health: Mutex::new(Some(health)),
        })
    }

    /// Dialect this session speaks.
    pub fn protocol(&self) -> &P {
        &self.shared.protocol
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.shared.state.lock()
    }

    /// True while the link is up.
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Message of the reconnect failure that stopped the health monitor.
    pub fn fatal_error(&self) -> Option<String> {
        self.shared.fatal.read().clone()
    }

    /// Tears the link down and opens a new one with the same settings.
    pub fn refresh(&self) -> Result<()> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(PlcError::NotConnected);
        }
        self.shared.relink()?;
        // a fatal reconnect failure ended the monitor; start a new one
        if self.shared.fatal.write().take().is_some() {
            let mut health = self.health.lock();
            if let Some(old) = health.take() {
                old.stop();
            }
            *health = Some(spawn_health(&self.shared)?);
        }
        Ok(())
    }

    /// Stops the background threads and closes the link. Waiting requests
    /// fail with [`PlcError::SessionDisconnected`]. Idempotent.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // unblock waiters before joining anything
        self.shared.correlator.cancel_all();
        if let Some(worker) = self.health.lock().take() {
            worker.stop();
        }
        let _guard = self.shared.lifecycle.lock();
        self.shared.unlink();
        *self.shared.state.lock() = SessionState::Disconnected;
        info!(endpoint = %self.shared.connector.endpoint(), "session closed");
    }

    /// Writes each frame and waits for its reply; returns the decoded
    /// payloads in order.
    pub fn transact(&self, exchanges: &[Exchange]) -> Result<Vec<Vec<u8>>> {
        let _comm = self.shared.comm.lock();
        let mut payloads = Vec::with_capacity(exchanges.len());
        for exchange in exchanges {
            let reply = self.shared.round_trip(&exchange.frame)?;
            payloads.push(self.shared.protocol.decode_reply(exchange, &reply)?);
        }
        Ok(payloads)
    }

    /// Writes packets. Read packets are rejected.
    pub fn write(&self, packets: &[SendingPacket<P::Device>]) -> Result<()> {
        if packets.iter().any(SendingPacket::is_read) {
            return Err(PlcError::invalid_parameter("packet", "Wrong PLC message type"));
        }
        let exchanges = self.shared.protocol.encode_write(packets)?;
        self.transact(&exchanges)?;
        Ok(())
    }

    /// Reads packets. Write packets are rejected.
    pub fn read(&self, packets: &[SendingPacket<P::Device>]) -> Result<Vec<ReceivingPacket<P::Device>>> {
        if packets.iter().any(|p| !p.is_read()) {
            return Err(PlcError::invalid_parameter("packet", "Wrong PLC message type"));
        }
        let exchanges = self.shared.protocol.encode_read(packets)?;
        let payloads = self.transact(&exchanges)?;
        self.shared.protocol.unpack_read(packets, payloads)
    }
}

impl<P: Protocol> Drop for Session<P> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<P: Protocol> Shared<P> {
    /// Replaces the current link with a fresh one.
    fn relink(self: &Arc<Self>) -> Result<()> {
        let _guard = self.lifecycle.lock();
        self.unlink();
        *self.state.lock() = SessionState::Connecting;

        let Connection { reader, writer } = match self.connector.connect() {
            Ok(conn) => conn,
            Err(err) => {
                *self.state.lock() = SessionState::Disconnected;
                return Err(err);
            }
        };

        let cancel = Arc::new(AtomicBool::new(false));
        let spawned = {
            let shared = Arc::clone(self);
            let cancel = Arc::clone(&cancel);
            thread::Builder::new()
                .name("plc-reader".to_string())
                .spawn(move || read_loop(&shared, reader, &cancel))
        };
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                *self.state.lock() = SessionState::Disconnected;
                return Err(err.into());
            }
        };

        *self.writer.lock() = Some(writer);
        *self.reader.lock() = Some(Worker { cancel, handle });
        *self.state.lock() = SessionState::Connected;
        debug!(endpoint = %self.connector.endpoint(), "link up");
        Ok(())
    }

    /// Stops the reader, drops the writer and fails pending waiters.
    fn unlink(&self) {
        let worker = self.reader.lock().take();
        if let Some(worker) = worker {
            worker.stop();
        }
        *self.writer.lock() = None;
        self.correlator.cancel_all();
    }

    /// Marks the link identified by `cancel` as lost, unless it was
    /// already replaced or stopped.
    fn link_lost(&self, cancel: &AtomicBool, reason: &str) {
        if cancel.swap(true, Ordering::AcqRel) {
            return;
        }
        warn!(endpoint = %self.connector.endpoint(), reason, "link lost");
        *self.state.lock() = SessionState::Disconnected;
        *self.writer.lock() = None;
        self.correlator.cancel_all();
    }

    fn disconnected_error(&self) -> PlcError {
        match self.fatal.read().as_ref() {
            Some(reason) => PlcError::reconnect_failed(reason.clone()),
            None => PlcError::NotConnected,
        }
    }

    fn round_trip(&self, frame: &[u8]) -> Result<Vec<u8>> {
        if *self.state.lock() != SessionState::Connected {
            return Err(self.disconnected_error());
        }
        let rx = self.correlator.register();

        let written = match self.writer.lock().as_mut() {
            Some(w) => Some(w.write_all(frame).and_then(|()| w.flush())),
            None => None,
        };
        let Some(written) = written else {
            self.correlator.abandon();
            return Err(self.disconnected_error());
        };
        if let Err(err) = written {
            self.correlator.abandon();
            let token = self.reader.lock().as_ref().map(|w| Arc::clone(&w.cancel));
            if let Some(token) = token {
                self.link_lost(&token, &err.to_string());
            }
            return Err(err.into());
        }
        trace!(frame = %hex::encode_upper(frame), "sent");

        let deadline = Instant::now() + self.options.response_timeout;
        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(Reply::Frame(reply)) => {
                    trace!(frame = %hex::encode_upper(&reply), "received");
                    return Ok(reply);
                }
                Ok(Reply::Disconnected) | Err(RecvTimeoutError::Disconnected) => {
                    return Err(PlcError::SessionDisconnected);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.closed.load(Ordering::Acquire)
                        || *self.state.lock() != SessionState::Connected
                    {
                        self.correlator.abandon();
                        return Err(PlcError::SessionDisconnected);
                    }
                    if Instant::now() >= deadline {
                        self.correlator.abandon();
                        debug!(timeout = ?self.options.response_timeout, "no reply");
                        return Err(PlcError::Timeout);
                    }
                }
            }
        }
    }
}

fn spawn_health<P: Protocol>(shared: &Arc<Shared<P>>) -> Result<Worker> {
    let cancel = Arc::new(AtomicBool::new(false));
    let handle = {
        let shared = Arc::clone(shared);
        let cancel = Arc::clone(&cancel);
        thread::Builder::new()
            .name("plc-health".to_string())
            .spawn(move || health_loop(&shared, &cancel))?
    };
    Ok(Worker { cancel, handle })
}

fn read_loop<P: Protocol>(shared: &Shared<P>, mut reader: Box<dyn Read + Send>, cancel: &AtomicBool) {
    let mut assembler = FrameAssembler::new(shared.protocol.framing());
    let mut buf = [0u8; READ_CHUNK];
    while !cancel.load(Ordering::Acquire) {
        match reader.read(&mut buf) {
            Ok(0) => {
                shared.link_lost(cancel, "connection closed by peer");
                break;
            }
            Ok(n) => {
                for frame in assembler.push(&buf[..n], READ_CHUNK) {
                    shared.correlator.complete(frame);
                }
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                if let Some(frame) = assembler.idle() {
                    shared.correlator.complete(frame);
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => {
                shared.link_lost(cancel, &err.to_string());
                break;
            }
        }
    }
    trace!("reader stopped");
}

/// Sleeps `total` in [`POLL_INTERVAL`] slices; false when cancelled.
fn nap(cancel: &AtomicBool, total: Duration) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if cancel.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn health_loop<P: Protocol>(shared: &Arc<Shared<P>>, cancel: &AtomicBool) {
    let limit = shared.options.reconnect_count;
    'monitor: while nap(cancel, shared.options.check_interval) {
        if *shared.state.lock() == SessionState::Connected {
            continue;
        }
        let mut failures: u16 = 0;
        loop {
            if cancel.load(Ordering::Acquire) {
                break 'monitor;
            }
            match shared.relink() {
                Ok(()) => {
                    info!(endpoint = %shared.connector.endpoint(), failures, "reconnected");
                    continue 'monitor;
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    warn!(endpoint = %shared.connector.endpoint(), attempt = failures, %err, "reconnect failed");
                    // reconnect_count == 0 retries forever; otherwise
                    // give up once the budget is exceeded
                    if limit != 0 && failures > limit {
                        let message = format!(
                            "{err}\nPlease check {} or PLC power.",
                            shared.options.cable_hint
                        );
                        error!(endpoint = %shared.connector.endpoint(), "{}", PlcError::reconnect_failed(message.clone()));
                        *shared.fatal.write() = Some(message);
                        break 'monitor;
                    }
                    if !nap(cancel, POLL_INTERVAL) {
                        break 'monitor;
                    }
                }
            }
        }
    }
    trace!("health monitor stopped");
}
