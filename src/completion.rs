//! The completion seam between a chat session and a model provider.
//!
//! A [`CompletionProvider`] turns an ordered request payload into a lazy,
//! finite, non-restartable stream of text fragments. Concatenating the
//! fragments in order yields the full assistant reply.

use std::pin::Pin;

use futures::{Stream, StreamExt, stream};

use crate::client::Groq;
use crate::observability::STREAM_FRAGMENTS;
use crate::types::{ChatCompletionRequest, Message, Model, StreamEvent};
use crate::{Error, Result};

/// A boxed stream of reply fragments in emission order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Something that can stream a chat completion.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Start a streaming completion for `messages`.
    ///
    /// Errors returned here happened before any fragment was produced; errors
    /// yielded by the stream happened mid-reply.
    async fn stream_completion(&self, messages: &[Message]) -> Result<FragmentStream>;
}

/// Reduce a stream of decoded events to the text fragments they carry.
///
/// The fragment stream ends cleanly only at `[DONE]`. A body that ends without
/// it yields a streaming error, and nothing follows the first error.
/// Bookkeeping chunks without text are dropped.
pub fn fragments<S>(events: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = Result<StreamEvent>> + Send,
{
    stream::unfold(Some(Box::pin(events)), |state| async move {
        let mut events = state?;
        loop {
            match events.next().await {
                Some(Ok(StreamEvent::Done)) => return None,
                Some(Ok(event)) => {
                    if let Some(text) = event.text_delta() {
                        STREAM_FRAGMENTS.click();
                        return Some((Ok(text.to_string()), Some(events)));
                    }
                }
                Some(Err(err)) => return Some((Err(err), None)),
                None => {
                    let err = Error::streaming("stream ended before [DONE]", None);
                    return Some((Err(err), None));
                }
            }
        }
    })
}

/// A [`CompletionProvider`] backed by the Groq client with a fixed model.
#[derive(Debug, Clone)]
pub struct GroqCompletion {
    client: Groq,
    model: Model,
}

impl GroqCompletion {
    /// Bind `client` to `model`.
    pub fn new(client: Groq, model: Model) -> Self {
        Self { client, model }
    }

    /// The model every request is sent to.
    pub fn model(&self) -> &Model {
        &self.model
    }
}

#[async_trait::async_trait]
impl CompletionProvider for GroqCompletion {
    async fn stream_completion(&self, messages: &[Message]) -> Result<FragmentStream> {
        let request = ChatCompletionRequest::new_streaming(self.model.clone(), messages.to_vec());
        let events = self.client.stream(request).await?;
        Ok(Box::pin(fragments(events)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatCompletionChunk, ChunkChoice, ChunkDelta};

    fn chunk(text: &str) -> Result<StreamEvent> {
        Ok(StreamEvent::Chunk(ChatCompletionChunk {
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta {
                    role: None,
                    content: Some(text.to_string()),
                },
                finish_reason: None,
            }],
            ..Default::default()
        }))
    }

    async fn collect(events: Vec<Result<StreamEvent>>) -> Vec<Result<String>> {
        fragments(stream::iter(events)).collect().await
    }

    #[tokio::test]
    async fn fragments_in_order_until_done() {
        let out = collect(vec![
            chunk(""),
            chunk("Use "),
            chunk("reversed()"),
            Ok(StreamEvent::Done),
            chunk("ignored"),
        ])
        .await;
        let texts: Vec<String> = out.into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(texts, vec!["Use ".to_string(), "reversed()".to_string()]);
    }

    #[tokio::test]
    async fn stops_after_first_error() {
        let out = collect(vec![
            chunk("partial"),
            Err(Error::streaming("connection reset", None)),
            chunk("after"),
        ])
        .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap(), "partial");
        assert!(out[1].as_ref().unwrap_err().is_streaming());
    }

    #[tokio::test]
    async fn end_of_body_without_done_is_an_error() {
        let out = collect(vec![chunk("a"), chunk("b")]).await;
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].as_ref().unwrap(), "a");
        assert_eq!(out[1].as_ref().unwrap(), "b");
        let err = out[2].as_ref().unwrap_err();
        assert!(err.is_streaming());
        assert!(err.is_provider());
    }

    #[tokio::test]
    async fn empty_body_is_an_error() {
        let out = collect(vec![]).await;
        assert_eq!(out.len(), 1);
        assert!(out[0].as_ref().unwrap_err().is_streaming());
    }
}
