//! # wsduplex
//!
//! A small full-duplex WebSocket client core built on tokio and
//! tokio-tungstenite.
//!
//! The [`Client`] owns the connection and runs one task per traffic
//! direction:
//!
//! ```text
//! caller ──> outbound channel ──> write loop ──> wire
//! wire   ──> read loop ──> inbound channel ──> caller
//!                └────────> error channel ──> caller (at most one error)
//! ```
//!
//! Shutdown is two-phase: a one-shot stop signal tells both loops that
//! subsequent I/O failures are expected, then [`Client::stop`] waits for
//! both loops to exit before the channels close.
//!
//! ## Example
//!
//! ```rust,ignore
//! use wsduplex::Client;
//!
//! #[tokio::main]
//! async fn main() -> wsduplex::Result<()> {
//!     let mut client = Client::new("ws://echo.example.com");
//!     client.start().await?;
//!
//!     let outbound = client.outbound();
//!     let mut inbound = client.take_inbound().unwrap();
//!
//!     outbound.send("hello".to_string()).await.ok();
//!     if let Some(message) = inbound.recv().await {
//!         println!("{:?}", message);
//!     }
//!
//!     client.stop().await;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod error;

// Re-export core client functionality
pub use core::client::{ChannelReceiver, Client};
pub use core::message::{FrameKind, Message};
pub use error::{Result, WsDuplexError};
