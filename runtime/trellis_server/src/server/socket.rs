use std::collections::VecDeque;

use http::Uri;
use trellis::transport::WebSocket;

/// A websocket connection that lives entirely in memory.
///
/// The frames the "peer" will send are queued upfront, with
/// [`incoming`](Self::incoming); the frames the handler sends are recorded
/// and can be inspected with [`sent`](Self::sent) once the handler returns.
#[derive(Debug, Clone)]
pub struct InMemorySocket {
    uri: Uri,
    query: Vec<(String, String)>,
    incoming: VecDeque<String>,
    sent: Vec<String>,
    state: SocketState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketState {
    Connecting,
    Open,
    Closed,
}

impl InMemorySocket {
    /// A connection opened against `uri`.
    pub fn new(uri: Uri) -> Self {
        let query = uri
            .query()
            .map(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();
        Self {
            uri,
            query,
            incoming: VecDeque::new(),
            sent: Vec::new(),
            state: SocketState::Connecting,
        }
    }

    /// Queue frames for the handler to receive, in order.
    pub fn incoming<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.incoming.extend(frames.into_iter().map(Into::into));
        self
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The text frames sent by the handler, in order.
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    pub fn is_accepted(&self) -> bool {
        self.state != SocketState::Connecting
    }

    pub fn is_closed(&self) -> bool {
        self.state == SocketState::Closed
    }
}

impl WebSocket for InMemorySocket {
    fn accept(&mut self) {
        if self.state == SocketState::Connecting {
            self.state = SocketState::Open;
        }
    }

    fn query_param(&self, name: &str) -> Option<String> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    fn send_text(&mut self, text: String) {
        if self.state != SocketState::Open {
            tracing::warn!(uri = %self.uri, "Dropped a frame sent on a websocket that isn't open");
            return;
        }
        self.sent.push(text);
    }

    fn receive_text(&mut self) -> Option<String> {
        if self.state != SocketState::Open {
            return None;
        }
        self.incoming.pop_front()
    }

    fn close(&mut self) {
        self.state = SocketState::Closed;
    }
}
