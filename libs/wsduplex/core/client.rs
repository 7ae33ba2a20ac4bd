//! Connection lifecycle management
//!
//! # Architecture
//!
//! After `start`, three contexts run concurrently: the caller, the read
//! loop and the write loop. Each loop owns one half of the split stream.
//!
//! ```text
//! ┌────────────┐  outbound   ┌────────────┐
//! │   caller   │────────────>│ write loop │──> SplitSink ──> wire
//! │            │             └────────────┘
//! │            │  inbound    ┌────────────┐
//! │            │<────────────│ read loop  │<── SplitStream <── wire
//! └────────────┘   errors    └────────────┘
//! ```
//!
//! # Shutdown
//!
//! `stop` flips the one-shot watch signal, which both loops select on at
//! every suspension point. The write loop reacts by attempting the close
//! handshake under a bounded deadline before it exits; the read loop just
//! exits. `stop` then awaits both join handles, so the channel senders
//! (which live only inside the loops) drop strictly after both loops are
//! gone: nothing can ever send on a closed channel. The inbound and error
//! receivers also observe the signal and yield end-of-stream from the
//! moment it is set, so nothing is observable after `stop` returns.
//!
//! An I/O failure is classified only *after* it is observed: if the stop
//! signal is already set the failure was caused by the teardown and is
//! absorbed, otherwise it is delivered exactly once on the error channel.

use crate::core::message::{data_message, Message};
use crate::error::{Result, WsDuplexError};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, tungstenite::Message>;
type WsSource = SplitStream<WsStream>;

/// Grace period for the close handshake during shutdown. Sending the close
/// frame is a courtesy to the peer, not required for correctness.
const CLOSE_GRACE: Duration = Duration::from_millis(250);

/// Channel capacity. A single slot gives rendezvous-style handoff: a
/// producer blocks until the consumer takes the previous value, so consumer
/// backpressure propagates all the way to the wire.
const CHANNEL_CAPACITY: usize = 1;

/// Receiving end of the inbound and error channels
///
/// Behaves like a plain mpsc receiver until the stop signal is set; from
/// then on it yields end-of-stream, even for a value that was parked in
/// the buffer slot when the signal arrived.
pub struct ChannelReceiver<T> {
    rx: mpsc::Receiver<T>,
    stop_rx: watch::Receiver<bool>,
}

impl<T> ChannelReceiver<T> {
    /// Receive the next value, or `None` at end-of-stream
    ///
    /// End-of-stream is reached when the sending loop has exited or the
    /// stop signal has been set, whichever comes first.
    pub async fn recv(&mut self) -> Option<T> {
        if *self.stop_rx.borrow() {
            return None;
        }

        tokio::select! {
            biased;
            _ = self.stop_rx.wait_for(|stopped| *stopped) => None,
            value = self.rx.recv() => value,
        }
    }
}

/// WebSocket connection manager
///
/// Owns the connection and multiplexes one send path and one receive path
/// onto independent tokio tasks. The caller talks to the loops through
/// three unidirectional channels:
///
/// - `outbound`: text payloads to write to the wire ([`Client::outbound`])
/// - `inbound`: data frames read off the wire ([`Client::take_inbound`])
/// - `errors`: at most one unexpected transport failure
///   ([`Client::take_errors`])
///
/// Lifecycle: idle after [`Client::new`], running after a successful
/// [`Client::start`], terminal after [`Client::stop`]. The client is not
/// reusable once stopped.
pub struct Client {
    endpoint: String,
    outbound_tx: mpsc::Sender<String>,
    outbound_rx: Option<mpsc::Receiver<String>>,
    inbound_tx: Option<mpsc::Sender<Message>>,
    inbound_rx: Option<ChannelReceiver<Message>>,
    errors_tx: Option<mpsc::Sender<WsDuplexError>>,
    errors_rx: Option<ChannelReceiver<WsDuplexError>>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    read_handle: Option<JoinHandle<()>>,
    write_handle: Option<JoinHandle<()>>,
}

impl Client {
    /// Create a new client for `endpoint`
    ///
    /// Pure allocation: all channels are open, the stop signal is unset and
    /// no I/O happens until [`Client::start`].
    pub fn new(endpoint: impl Into<String>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (errors_tx, errors_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = watch::channel(false);

        Self {
            endpoint: endpoint.into(),
            outbound_tx,
            outbound_rx: Some(outbound_rx),
            inbound_tx: Some(inbound_tx),
            inbound_rx: Some(ChannelReceiver {
                rx: inbound_rx,
                stop_rx: stop_rx.clone(),
            }),
            errors_tx: Some(errors_tx),
            errors_rx: Some(ChannelReceiver {
                rx: errors_rx,
                stop_rx: stop_rx.clone(),
            }),
            stop_tx,
            stop_rx,
            read_handle: None,
            write_handle: None,
        }
    }

    /// The endpoint this client was created for
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Dial the endpoint and launch the read and write loops
    ///
    /// Dials synchronously; on success the loops start running concurrently
    /// with the caller and control returns immediately. On a dial failure
    /// nothing is launched: the error is returned, the client stays idle
    /// and may be discarded (or `start` retried).
    pub async fn start(&mut self) -> Result<()> {
        if self.read_handle.is_some() || self.write_handle.is_some() {
            return Err(WsDuplexError::AlreadyStarted);
        }

        let (stream, _) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|e| WsDuplexError::Connect(e.to_string()))?;
        info!("connected to {}", self.endpoint);

        // Channel endpoints move into the loops only after a successful
        // dial, so a failed start leaves the client intact.
        let outbound_rx = self.outbound_rx.take().ok_or(WsDuplexError::AlreadyStarted)?;
        let inbound_tx = self.inbound_tx.take().ok_or(WsDuplexError::AlreadyStarted)?;
        let errors_tx = self.errors_tx.take().ok_or(WsDuplexError::AlreadyStarted)?;

        let (write, read) = stream.split();

        self.read_handle = Some(tokio::spawn(read_loop(
            read,
            inbound_tx,
            errors_tx.clone(),
            self.stop_rx.clone(),
        )));
        self.write_handle = Some(tokio::spawn(write_loop(
            write,
            outbound_rx,
            errors_tx,
            self.stop_rx.clone(),
        )));

        Ok(())
    }

    /// Sender for outbound text payloads
    ///
    /// Payloads are written to the wire in submission order. Sends fail
    /// once the write loop has exited.
    pub fn outbound(&self) -> mpsc::Sender<String> {
        self.outbound_tx.clone()
    }

    /// Take the receiver for inbound data frames
    ///
    /// Frames are delivered in the order they were read off the wire; the
    /// receiver yields end-of-stream once the client is stopping. Returns
    /// `None` if already taken.
    pub fn take_inbound(&mut self) -> Option<ChannelReceiver<Message>> {
        self.inbound_rx.take()
    }

    /// Take the receiver for transport failures
    ///
    /// At most one error is ever delivered; the loop that hit it exits, the
    /// sibling loop keeps running until [`Client::stop`] is called. The
    /// receiver yields end-of-stream once the client is stopping. Returns
    /// `None` if already taken.
    pub fn take_errors(&mut self) -> Option<ChannelReceiver<WsDuplexError>> {
        self.errors_rx.take()
    }

    /// Check whether a shutdown has been signaled (non-blocking)
    pub fn is_stopping(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Shut the client down
    ///
    /// No-op when `start` never succeeded, and on repeated calls. Otherwise:
    ///
    /// 1. the stop signal is set exactly once; both loops treat transport
    ///    failures after this point as expected, and the inbound and error
    ///    receivers yield end-of-stream from here on (a frame or error
    ///    still parked in a buffer slot is discarded, never delivered);
    /// 2. the write loop attempts the close handshake with a bounded
    ///    deadline, then exits; the read loop exits at its next suspension
    ///    point;
    /// 3. both join handles are awaited, so when `stop` returns no loop is
    ///    running and all channel senders have dropped.
    ///
    /// Every suspension point in the loops selects on the stop signal and
    /// the close handshake runs under a deadline, so `stop` completes in
    /// bounded time even against an unresponsive peer.
    pub async fn stop(&mut self) {
        let (read_handle, write_handle) =
            match (self.read_handle.take(), self.write_handle.take()) {
                (Some(r), Some(w)) => (r, w),
                // Never started, or already stopped
                _ => return,
            };

        debug!("stopping client");
        let _ = self.stop_tx.send(true);

        let _ = write_handle.await;
        let _ = read_handle.await;
        info!("client stopped");
    }
}

/// Receive path: read one frame per iteration and hand it to the caller
///
/// A single failure is terminal for this loop; reads are never retried.
async fn read_loop(
    mut read: WsSource,
    inbound_tx: mpsc::Sender<Message>,
    errors_tx: mpsc::Sender<WsDuplexError>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        // biased: once the stop signal is set, nothing more is delivered
        let frame = tokio::select! {
            biased;
            _ = stop_rx.wait_for(|stopped| *stopped) => {
                debug!("read loop exiting: stop requested");
                return;
            }
            frame = read.next() => frame,
        };

        match frame {
            Some(Ok(frame)) => {
                // Control frames are the transport's business
                let Some(message) = data_message(frame) else {
                    continue;
                };

                // Blocking delivery: consumer backpressure propagates to
                // the wire. The stop signal still unparks us here.
                tokio::select! {
                    biased;
                    _ = stop_rx.wait_for(|stopped| *stopped) => {
                        debug!("read loop exiting: stop requested during delivery");
                        return;
                    }
                    sent = inbound_tx.send(message) => {
                        if sent.is_err() {
                            debug!("read loop exiting: inbound receiver dropped");
                            return;
                        }
                    }
                }
            }
            Some(Err(e)) => {
                report(&errors_tx, &mut stop_rx, WsDuplexError::Read(e.to_string())).await;
                return;
            }
            None => {
                report(
                    &errors_tx,
                    &mut stop_rx,
                    WsDuplexError::ConnectionClosed("stream ended".to_string()),
                )
                .await;
                return;
            }
        }
    }
}

/// Send path: wait for a payload or the stop signal, whichever comes first
///
/// On stop, performs the close handshake before exiting; no payload I/O
/// happens after the signal. A single write failure is terminal.
async fn write_loop(
    mut write: WsSink,
    mut outbound_rx: mpsc::Receiver<String>,
    errors_tx: mpsc::Sender<WsDuplexError>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        let payload = tokio::select! {
            biased;
            _ = stop_rx.wait_for(|stopped| *stopped) => None,
            payload = outbound_rx.recv() => payload,
        };

        // None: stop requested, or every outbound sender dropped
        let Some(payload) = payload else {
            break;
        };

        // The write itself also selects on the stop signal, so a send
        // parked on transport backpressure cannot outlive a stop request.
        let written = tokio::select! {
            biased;
            _ = stop_rx.wait_for(|stopped| *stopped) => None,
            result = write.send(tungstenite::Message::Text(payload)) => Some(result),
        };

        match written {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                report(&errors_tx, &mut stop_rx, WsDuplexError::Write(e.to_string())).await;
                return;
            }
            // Teardown interrupted a parked write
            None => break,
        }
    }

    // Park until the signal is set (instant when already stopping), then
    // run the close handshake; both close attempts carry their own
    // deadline, so the exit stays bounded.
    let _ = stop_rx.wait_for(|stopped| *stopped).await;
    close_connection(&mut write).await;
    debug!("write loop exiting");
}

/// Classify an I/O failure as expected or unexpected and act accordingly
///
/// The stop signal is checked only once the failure has been observed: a
/// failure strictly after the signal was caused by the teardown and is
/// absorbed, a failure strictly before it is a real transport error and is
/// delivered exactly once. Checking before the I/O instead would leave a
/// window where a real error landing one instant ahead of the signal gets
/// misclassified.
async fn report(
    errors_tx: &mpsc::Sender<WsDuplexError>,
    stop_rx: &mut watch::Receiver<bool>,
    error: WsDuplexError,
) {
    if *stop_rx.borrow() {
        debug!("absorbing transport failure during shutdown: {error}");
        return;
    }

    warn!("transport failure: {error}");
    tokio::select! {
        _ = stop_rx.wait_for(|stopped| *stopped) => {}
        _ = errors_tx.send(error) => {}
    }
}

/// Best-effort close handshake with a bounded deadline
///
/// Failures are ignored; an unresponsive peer cannot hold up shutdown for
/// more than two grace periods.
async fn close_connection(write: &mut WsSink) {
    let close = tungstenite::Message::Close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "".into(),
    }));

    if timeout(CLOSE_GRACE, write.send(close)).await.is_err() {
        debug!("close frame not flushed within grace period");
    }
    let _ = timeout(CLOSE_GRACE, write.close()).await;
}
