//! Common test utilities for wsduplex integration tests
//!
//! This module provides a configurable mock WebSocket server for testing
//! the client lifecycle, including fault injection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// How the mock server treats an accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerBehavior {
    /// Echo every text/binary frame back to the client
    Echo,
    /// Send this many numbered text frames (`frame-0`, `frame-1`, ...),
    /// then keep serving like `Echo`
    TextBurst(usize),
    /// Send this many one-byte binary frames, then keep serving like `Echo`
    BinaryBurst(usize),
    /// Complete the handshake, then drop the TCP stream without a close
    /// frame; the client sees an unexpected read failure
    AbortAfterHandshake,
    /// Complete the handshake, then never read from the socket. With a
    /// client that keeps writing, TCP flow control eventually parks the
    /// client's in-flight write.
    NeverRead,
    /// Send two text frames, read a single frame from the client, then
    /// drop the TCP stream without a close frame; a client that keeps
    /// writing sees an unexpected write failure
    AbortAfterFirstRead,
}

/// A mock WebSocket server for testing
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    close_frames: Arc<AtomicUsize>,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start(behavior: ServerBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let shutdown_clone = shutdown.clone();
        let close_frames = Arc::new(AtomicUsize::new(0));
        let close_frames_clone = close_frames.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let shutdown = shutdown_clone.clone();
                                let close_frames = close_frames_clone.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, behavior, shutdown, close_frames).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown,
            close_frames,
        }
    }

    async fn handle_connection(
        stream: TcpStream,
        behavior: ServerBehavior,
        shutdown: Arc<Notify>,
        close_frames: Arc<AtomicUsize>,
    ) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::accept_async;
        use tokio_tungstenite::tungstenite::Message;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        if behavior == ServerBehavior::AbortAfterHandshake {
            // Tear down the TCP stream with no close handshake
            drop(ws_stream);
            return;
        }

        if behavior == ServerBehavior::NeverRead {
            // Hold the socket open but never read from it, so the peer's
            // send buffer fills up and its writes park
            shutdown.notified().await;
            drop(ws_stream);
            return;
        }

        let (mut write, mut read) = ws_stream.split();

        if behavior == ServerBehavior::AbortAfterFirstRead {
            for i in 0..2 {
                if write.send(Message::Text(format!("frame-{i}"))).await.is_err() {
                    return;
                }
            }
            loop {
                match read.next().await {
                    Some(Ok(msg)) if msg.is_text() || msg.is_binary() => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) | None => return,
                }
            }
            // Tear down the TCP stream with no close handshake
            return;
        }

        match behavior {
            ServerBehavior::TextBurst(count) => {
                for i in 0..count {
                    if write.send(Message::Text(format!("frame-{i}"))).await.is_err() {
                        return;
                    }
                }
            }
            ServerBehavior::BinaryBurst(count) => {
                for i in 0..count {
                    let byte = u8::try_from(i % 256).unwrap();
                    if write.send(Message::Binary(vec![byte])).await.is_err() {
                        return;
                    }
                }
            }
            ServerBehavior::Echo
            | ServerBehavior::AbortAfterHandshake
            | ServerBehavior::NeverRead
            | ServerBehavior::AbortAfterFirstRead => {}
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(msg)) => {
                            if msg.is_text() || msg.is_binary() {
                                // Echo the message back
                                if write.send(msg).await.is_err() {
                                    break;
                                }
                            } else if msg.is_ping() {
                                let pong = Message::Pong(msg.into_data());
                                if write.send(pong).await.is_err() {
                                    break;
                                }
                            } else if msg.is_close() {
                                close_frames.fetch_add(1, Ordering::SeqCst);
                                break;
                            }
                        }
                        Some(Err(_)) | None => break,
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Number of close frames received from clients so far
    pub fn close_frames(&self) -> usize {
        self.close_frames.load(Ordering::SeqCst)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
