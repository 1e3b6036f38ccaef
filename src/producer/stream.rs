//! Token sequence → SSE event sequence

use futures::future::ready;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};

use crate::sse::{Event, STATUS_DONE, STATUS_STARTED};

/// Wrap a token sequence in the producer's event protocol
///
/// `status: started`, one `token` event per token, then `status: done`.
/// A token-source fault ends the sequence with a single `error` event;
/// tokens already emitted stay valid.
pub fn event_stream(tokens: BoxStream<'static, anyhow::Result<String>>) -> impl Stream<Item = Event> + Send {
    let started = stream::once(ready(Event::status(STATUS_STARTED)));

    let body = stream::unfold(Some(tokens), |state| async move {
        let Some(mut tokens) = state else {
            return None;
        };
        match tokens.next().await {
            Some(Ok(token)) => Some((Event::token(token), Some(tokens))),
            Some(Err(e)) => {
                tracing::warn!(error = %format!("{:#}", e), "Token source failed mid-stream");
                Some((Event::error(format!("error: {:#}", e)), None))
            }
            None => Some((Event::status(STATUS_DONE), None)),
        }
    });

    started.chain(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted(items: Vec<anyhow::Result<&'static str>>) -> BoxStream<'static, anyhow::Result<String>> {
        stream::iter(items.into_iter().map(|item| item.map(String::from))).boxed()
    }

    #[tokio::test]
    async fn test_event_stream_success() {
        let events: Vec<Event> = event_stream(scripted(vec![Ok("H"), Ok("i")])).collect().await;
        assert_eq!(
            events,
            vec![
                Event::status("started"),
                Event::token("H"),
                Event::token("i"),
                Event::status("done"),
            ]
        );
    }

    #[tokio::test]
    async fn test_event_stream_empty_source() {
        let events: Vec<Event> = event_stream(scripted(vec![])).collect().await;
        assert_eq!(events, vec![Event::status("started"), Event::status("done")]);
    }

    #[tokio::test]
    async fn test_event_stream_producer_fault() {
        let events: Vec<Event> = event_stream(scripted(vec![
            Ok("a"),
            Err(anyhow::anyhow!("model crashed")),
            Ok("never"),
        ]))
        .collect()
        .await;

        assert_eq!(
            events,
            vec![
                Event::status("started"),
                Event::token("a"),
                Event::error("error: model crashed"),
            ]
        );
    }
}
