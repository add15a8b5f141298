use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use super::buffering::CircularLineBuffer;
use crate::error::{LlmError, Result};

/// Strategy pattern for parsing provider-specific SSE payloads
pub trait SseLineParser: Send {
    type Event: Send + 'static;

    /// Parse the payload of a `data:` line. `Ok(None)` skips the line.
    fn parse_data_line(&self, data: &str) -> Result<Option<Self::Event>>;

    /// Check if this line signals end of stream
    fn is_done_marker(&self, data: &str) -> bool {
        data == "[DONE]"
    }
}

/// Generic SSE stream parser using circular buffer
///
/// Every network read is raced against `cancel`. Once the token fires the
/// stream yields a single `LlmError::Aborted` and ends without reading
/// further bytes.
pub fn parse_sse_stream<S, B, E, P>(
    bytes: S,
    parser: P,
    cancel: CancellationToken,
) -> Pin<Box<dyn Stream<Item = Result<P::Event>> + Send>>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
    P: SseLineParser + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut buffer = CircularLineBuffer::with_capacity(4096);
        let mut ended = false;

        'read: while !ended {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                chunk = byte_chunks.next() => Some(chunk),
            };

            let chunk_result = match next {
                None => {
                    yield Err(LlmError::Aborted);
                    break 'read;
                }
                Some(None) => {
                    ended = true;
                    None
                }
                Some(Some(chunk_result)) => Some(chunk_result),
            };

            match chunk_result {
                Some(Ok(bytes)) => buffer.extend(bytes.as_ref()),
                Some(Err(e)) => {
                    yield Err(LlmError::Stream(e.to_string()));
                    break 'read;
                }
                None => {}
            }

            // Complete lines, then any unterminated tail once input is over
            while let Some(line_result) = buffer
                .next_line()
                .or_else(|| if ended { buffer.finish() } else { None })
            {
                let line = match line_result {
                    Ok(line) => line,
                    Err(e) => {
                        yield Err(e);
                        break 'read;
                    }
                };

                // Blank lines separate events; `event:` lines repeat the
                // type already present in the JSON payload
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim_start();

                if parser.is_done_marker(data) {
                    break 'read;
                }

                if cancel.is_cancelled() {
                    yield Err(LlmError::Aborted);
                    break 'read;
                }

                match parser.parse_data_line(data) {
                    Ok(Some(event)) => yield Ok(event),
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                        break 'read;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoParser;

    impl SseLineParser for EchoParser {
        type Event = String;

        fn parse_data_line(&self, data: &str) -> Result<Option<String>> {
            if data == "skip" {
                return Ok(None);
            }
            Ok(Some(data.to_string()))
        }
    }

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = std::result::Result<Vec<u8>, String>> {
        futures::stream::iter(
            parts
                .iter()
                .map(|p| Ok(p.as_bytes().to_vec()))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let stream = parse_sse_stream(
            chunks(&["event: x\nda", "ta: one\n\ndata: skip\n", "data: two\n\n"]),
            EchoParser,
            CancellationToken::new(),
        );

        let events: Vec<String> = stream.map(|e| e.unwrap()).collect().await;
        assert_eq!(events, vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test]
    async fn test_unterminated_last_line_is_parsed() {
        let stream = parse_sse_stream(
            chunks(&["data: one\n\n", "data: tail"]),
            EchoParser,
            CancellationToken::new(),
        );

        let events: Vec<String> = stream.map(|e| e.unwrap()).collect().await;
        assert_eq!(events, vec!["one".to_string(), "tail".to_string()]);
    }

    #[tokio::test]
    async fn test_done_marker_ends_stream() {
        let stream = parse_sse_stream(
            chunks(&["data: one\n", "data: [DONE]\n", "data: late\n"]),
            EchoParser,
            CancellationToken::new(),
        );

        let events: Vec<String> = stream.map(|e| e.unwrap()).collect().await;
        assert_eq!(events, vec!["one".to_string()]);
    }

    #[tokio::test]
    async fn test_transport_error_is_reported() {
        let bytes = futures::stream::iter(vec![
            Ok(b"data: one\n".to_vec()),
            Err("connection reset".to_string()),
        ]);
        let mut stream = parse_sse_stream(bytes, EchoParser, CancellationToken::new());

        assert_eq!(stream.next().await.unwrap().unwrap(), "one");
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, LlmError::Stream(ref msg) if msg.contains("connection reset")));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_bytes() {
        let cancel = CancellationToken::new();
        let bytes = chunks(&["data: one\n"]).chain(futures::stream::pending());
        let mut stream = parse_sse_stream(bytes, EchoParser, cancel.clone());

        assert_eq!(stream.next().await.unwrap().unwrap(), "one");

        cancel.cancel();
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.is_abort());
        assert!(stream.next().await.is_none());
    }
}
