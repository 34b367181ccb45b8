//! Integration tests for the techbuddy library.
//!
//! Most tests replay recorded SSE bodies through the real decoder, so no
//! network is needed. The live test requires GROQ_API_KEY and skips otherwise.

use bytes::Bytes;
use futures::stream;
use tokio_test::{assert_err, assert_ok};

use techbuddy::chat::{ChatConfig, ChatSession, PrimingPolicy, TurnOutcome, TurnState};
use techbuddy::completion::fragments;
use techbuddy::secrets::MapProvider;
use techbuddy::sse::process_sse;
use techbuddy::{
    BufferRenderer, CompletionProvider, FragmentStream, Groq, GroqCompletion, Message, Model,
    Result, SecretLoader,
};

/// Serves a fixed SSE body, split into network chunks, for every request.
struct RecordedProvider {
    chunks: Vec<&'static [u8]>,
}

#[async_trait::async_trait]
impl CompletionProvider for RecordedProvider {
    async fn stream_completion(&self, _messages: &[Message]) -> Result<FragmentStream> {
        let body: Vec<std::result::Result<Bytes, std::io::Error>> = self
            .chunks
            .iter()
            .map(|chunk| Ok(Bytes::from_static(chunk)))
            .collect();
        Ok(Box::pin(fragments(process_sse(stream::iter(body)))))
    }
}

const GREETING_BODY: &[u8] = b"data: {\"id\":\"chatcmpl-1\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"llama-3.1-8b-instant\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"},\"finish_reason\":null}]}\n\n\
data: {\"id\":\"chatcmpl-1\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"llama-3.1-8b-instant\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Use \"},\"finish_reason\":null}]}\n\n\
data: {\"id\":\"chatcmpl-1\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"llama-3.1-8b-instant\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"`list.reverse()`\"},\"finish_reason\":null}]}\n\n\
data: {\"id\":\"chatcmpl-1\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"llama-3.1-8b-instant\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n\
data: [DONE]\n\n";

#[tokio::test]
async fn recorded_stream_commits_reply() {
    let (head, tail) = GREETING_BODY.split_at(200);
    let provider = RecordedProvider {
        chunks: vec![head, tail],
    };
    let mut session = ChatSession::new(provider, ChatConfig::default());
    let mut renderer = BufferRenderer::new();

    let outcome = assert_ok!(session.submit("How do I reverse a list?", &mut renderer).await);
    assert_eq!(
        outcome,
        TurnOutcome::Committed("Use `list.reverse()`".to_string())
    );
    assert_eq!(
        session.history(),
        &[
            Message::assistant("Hello!"),
            Message::user("How do I reverse a list?"),
            Message::assistant("Use `list.reverse()`"),
        ]
    );
    assert_eq!(renderer.streamed_text(), "Use `list.reverse()`");
}

#[tokio::test]
async fn in_band_error_rolls_back_to_idle() {
    let provider = RecordedProvider {
        chunks: vec![
            &b"data: {\"id\":\"c\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Par\"},\"finish_reason\":null}]}\n\n"[..],
            &b"data: {\"error\":{\"message\":\"model overloaded\",\"type\":\"server_error\"}}\n\n"[..],
        ],
    };
    let mut session = ChatSession::new(provider, ChatConfig::default());
    let mut renderer = BufferRenderer::new();

    let err = assert_err!(session.submit("hi", &mut renderer).await);
    assert!(err.is_provider());
    assert!(err.to_string().contains("model overloaded"));
    assert_eq!(session.state(), TurnState::Idle);
    assert_eq!(
        session.history(),
        &[Message::assistant("Hello!"), Message::user("hi")]
    );
}

#[tokio::test]
async fn cut_off_body_is_not_committed() {
    let provider = RecordedProvider {
        chunks: vec![
            &b"data: {\"id\":\"c\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Use list.rev\"},\"finish_reason\":null}]}\n\n"[..],
        ],
    };
    let mut session = ChatSession::new(provider, ChatConfig::default());
    let mut renderer = BufferRenderer::new();

    let err = assert_err!(session.submit("How do I reverse a list?", &mut renderer).await);
    assert!(err.is_streaming());
    assert!(err.is_provider());
    assert_eq!(renderer.streamed_text(), "Use list.rev");
    assert_eq!(session.state(), TurnState::Idle);
    assert_eq!(
        session.history(),
        &[
            Message::assistant("Hello!"),
            Message::user("How do I reverse a list?"),
        ]
    );
}

#[tokio::test]
async fn body_without_text_is_an_error() {
    let provider = RecordedProvider {
        chunks: vec![&b": keep-alive\n\ndata: [DONE]\n\n"[..]],
    };
    let mut session = ChatSession::new(provider, ChatConfig::default());
    let mut renderer = BufferRenderer::new();

    let err = assert_err!(session.submit("hi", &mut renderer).await);
    assert!(err.is_streaming());
    assert_eq!(session.message_count(), 2);
}

#[tokio::test]
async fn secrets_flow_into_session() {
    let loader = SecretLoader::new()
        .with_provider(MapProvider::new("dotenv", [("INITIAL_RESPONSE", "ignored")]))
        .with_provider(MapProvider::new(
            "store",
            [
                ("GROQ_API_KEY", "gsk_test"),
                ("INITIAL_RESPONSE", "Howdy!"),
                ("CHAT_CONTEXT", "You teach Rust."),
            ],
        ));
    let secrets = assert_ok!(loader.resolve());
    assert_eq!(secrets.api_key, "gsk_test");

    let config = ChatConfig::default()
        .with_secrets(&secrets)
        .with_priming(PrimingPolicy::Omit);
    let provider = RecordedProvider { chunks: vec![] };
    let session = ChatSession::new(provider, config);

    assert_eq!(session.history(), &[Message::assistant("Howdy!")]);
    assert_eq!(
        session.request_payload(),
        vec![
            Message::system("You teach Rust."),
            Message::assistant("Howdy!"),
        ]
    );
}

#[test]
fn missing_key_is_configuration_error() {
    let loader = SecretLoader::new().with_provider(MapProvider::new(
        "dotenv",
        [("CHAT_CONTEXT", "anything")],
    ));
    let err = assert_err!(loader.resolve());
    assert!(err.is_configuration());
    assert!(!err.is_provider());
    assert!(err.to_string().contains("GROQ_API_KEY"));
}

#[tokio::test]
async fn live_streaming_turn() {
    let api_key = std::env::var("GROQ_API_KEY").ok();
    let Some(api_key) = api_key else {
        eprintln!("Skipping test: GROQ_API_KEY not set");
        return;
    };
    let client = Groq::new(api_key).expect("Failed to create client");
    let provider = GroqCompletion::new(client, Model::default());
    let mut session = ChatSession::new(provider, ChatConfig::default());
    let mut renderer = BufferRenderer::new();

    let outcome = session
        .submit("Reply with the single word: pong", &mut renderer)
        .await
        .expect("Streaming turn should succeed with valid API key");
    match outcome {
        TurnOutcome::Committed(reply) => assert!(!reply.is_empty()),
        TurnOutcome::Ignored => panic!("non-empty input must not be ignored"),
    }
    assert_eq!(session.message_count(), 3);
}
