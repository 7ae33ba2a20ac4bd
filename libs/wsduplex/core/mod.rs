pub mod client;
pub mod message;

// Re-export main types
pub use client::{ChannelReceiver, Client};
pub use message::{FrameKind, Message};
