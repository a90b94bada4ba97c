//! Incremental decoding of watch responses.
//!
//! The API server streams one JSON document per line. Chunks from the HTTP
//! body do not align with lines, so bytes are buffered until a newline
//! completes a document.

use std::collections::VecDeque;

use argo_submit_types::WatchEvent;
use futures_util::{StreamExt, stream::BoxStream};

use crate::ApiError;

/// Body chunks of a watch response.
pub type ByteChunks = BoxStream<'static, Result<Vec<u8>, ApiError>>;

/// Splits a byte stream into newline-delimited JSON watch events.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Feed a chunk and return every event completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<WatchEvent, serde_json::Error>> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(end) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            if let Some(event) = decode_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Decode whatever is left once the body ends without a trailing newline.
    pub fn finish(&mut self) -> Option<Result<WatchEvent, serde_json::Error>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

fn decode_line(line: &[u8]) -> Option<Result<WatchEvent, serde_json::Error>> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_slice(trimmed))
}

/// A live watch session.
///
/// Dropping the underlying body closes the HTTP connection, which ends the
/// server-side watch. [`WatchStream::close`] does that eagerly and is
/// idempotent; dropping the stream closes it as well.
pub struct WatchStream {
    body: Option<ByteChunks>,
    decoder: LineDecoder,
    pending: VecDeque<Result<WatchEvent, ApiError>>,
}

impl WatchStream {
    pub fn from_chunks(body: ByteChunks) -> Self {
        Self {
            body: Some(body),
            decoder: LineDecoder::default(),
            pending: VecDeque::new(),
        }
    }

    /// Next event in delivery order, or `None` once the stream has ended or been closed.
    ///
    /// A transport error is yielded once and ends the stream.
    pub async fn next_event(&mut self) -> Option<Result<WatchEvent, ApiError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            let body = self.body.as_mut()?;
            match body.next().await {
                Some(Ok(chunk)) => {
                    let decoded = self.decoder.push(&chunk);
                    self.pending.extend(decoded.into_iter().map(|event| event.map_err(ApiError::from)));
                }
                Some(Err(err)) => {
                    self.body = None;
                    return Some(Err(err));
                }
                None => {
                    self.body = None;
                    return self.decoder.finish().map(|event| event.map_err(ApiError::from));
                }
            }
        }
    }

    /// Release the connection. Buffered but unread events are discarded.
    pub fn close(&mut self) {
        self.body = None;
        self.pending.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.body.is_none() && self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argo_submit_types::WatchEventType;
    use futures_util::stream;

    fn chunks(parts: Vec<&'static str>) -> ByteChunks {
        stream::iter(parts.into_iter().map(|part| Ok(part.as_bytes().to_vec()))).boxed()
    }

    #[test]
    fn decoder_reassembles_lines_split_across_chunks() {
        let mut decoder = LineDecoder::default();
        assert!(decoder.push(br#"{"type":"ADDED","obj"#).is_empty());
        let events = decoder.push(b"ect\":{}}\r\n\n{\"type\":\"MODIFIED\",\"object\":{}}\n{\"type\"");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap().event_type, WatchEventType::Added);
        assert_eq!(events[1].as_ref().unwrap().event_type, WatchEventType::Modified);
        assert!(decoder.finish().unwrap().is_err(), "truncated trailing document is a decode error");
    }

    #[tokio::test]
    async fn stream_yields_events_in_order_and_trailing_line() {
        let mut watch = WatchStream::from_chunks(chunks(vec![
            "{\"type\":\"ADDED\",\"object\":{\"n\":1}}\n{\"type\":\"MODI",
            "FIED\",\"object\":{\"n\":2}}\n",
            "{\"type\":\"DELETED\",\"object\":{\"n\":3}}",
        ]));

        let mut seen = Vec::new();
        while let Some(event) = watch.next_event().await {
            let event = event.unwrap();
            seen.push((event.event_type, event.object["n"].as_i64().unwrap()));
        }
        assert_eq!(
            seen,
            vec![
                (WatchEventType::Added, 1),
                (WatchEventType::Modified, 2),
                (WatchEventType::Deleted, 3)
            ]
        );
        assert!(watch.is_closed());
    }

    #[tokio::test]
    async fn close_discards_buffered_events() {
        let mut watch = WatchStream::from_chunks(chunks(vec![
            "{\"type\":\"ADDED\",\"object\":{}}\n{\"type\":\"MODIFIED\",\"object\":{}}\n",
        ]));
        assert!(watch.next_event().await.is_some());
        watch.close();
        watch.close();
        assert!(watch.is_closed());
        assert!(watch.next_event().await.is_none());
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream() {
        let body = stream::iter(vec![
            Ok(b"{\"type\":\"ADDED\",\"object\":{}}\n".to_vec()),
            Err(ApiError::Status {
                code: 500,
                status: Default::default(),
            }),
            Ok(b"{\"type\":\"MODIFIED\",\"object\":{}}\n".to_vec()),
        ])
        .boxed();
        let mut watch = WatchStream::from_chunks(body);
        assert!(watch.next_event().await.unwrap().is_ok());
        assert!(watch.next_event().await.unwrap().is_err());
        assert!(watch.next_event().await.is_none());
    }
}
