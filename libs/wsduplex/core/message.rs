use tokio_tungstenite::tungstenite;

/// Discriminant of a received data frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Text,
    Binary,
}

/// One inbound data frame, as delivered on the inbound channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: FrameKind,
    pub payload: Vec<u8>,
}

impl Message {
    /// Get the payload as text, if this is a text frame
    pub fn as_text(&self) -> Option<&str> {
        match self.kind {
            FrameKind::Text => std::str::from_utf8(&self.payload).ok(),
            FrameKind::Binary => None,
        }
    }

    /// Check if this is a text frame
    pub fn is_text(&self) -> bool {
        self.kind == FrameKind::Text
    }

    /// Check if this is a binary frame
    pub fn is_binary(&self) -> bool {
        self.kind == FrameKind::Binary
    }
}

/// Convert a tungstenite message to a `Message`
///
/// Text and Binary frames map to `Some`; control frames (ping/pong/close)
/// are handled by the transport and map to `None`.
pub(crate) fn data_message(msg: tungstenite::Message) -> Option<Message> {
    match msg {
        tungstenite::Message::Text(text) => Some(Message {
            kind: FrameKind::Text,
            payload: text.into_bytes(),
        }),
        tungstenite::Message::Binary(data) => Some(Message {
            kind: FrameKind::Binary,
            payload: data,
        }),
        tungstenite::Message::Ping(_)
        | tungstenite::Message::Pong(_)
        | tungstenite::Message::Close(_)
        | tungstenite::Message::Frame(_) => None,
    }
}
