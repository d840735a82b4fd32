use std::sync::Arc;

use futures::StreamExt;

use tabletalk::chat::Message;
use tabletalk::db::DatabaseError;
use tabletalk::session::{InMemorySessionStore, SessionStore, SessionStoreError};
use tabletalk::{ChunkStream, LlmError};

use crate::agent::Agent;
use crate::prompts::Prompts;
use crate::strategy::REFUSAL_MESSAGE;
use crate::test_utils::mocks::{MockDb, MockProvider, MockStore};

fn test_prompts() -> Prompts {
    Prompts::from_parts(
        "You are a helpful assistant.",
        "classify",
        "You write SQL.",
        "{{ system_prompt }}\n{{ table_info }}\n{{ user_input }}",
        "Question: {{ question }}\nData: {{ data }}",
    )
}

/// A router provider that always classifies to `label`.
fn routing_to(label: &str) -> MockProvider {
    let mut provider = MockProvider::new();
    let label = label.to_string();
    provider.expect_chat().returning(move |_| Ok(label.clone()));
    provider
}

/// A chat provider whose stream yields the given chunks.
fn streaming(parts: &[&str]) -> MockProvider {
    let parts: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
    let mut provider = MockProvider::new();
    provider.expect_chat_stream().returning(move |_| {
        let chunks: Vec<Result<String, LlmError>> = parts.iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(chunks)) as ChunkStream)
    });
    provider
}

/// Assembles an agent over a real in-memory store, returning the store too so
/// tests can observe what was persisted.
fn agent_with(
    router: MockProvider,
    chat: MockProvider,
    builder: MockProvider,
    db: MockDb,
) -> (Agent, Arc<InMemorySessionStore>) {
    let store = Arc::new(InMemorySessionStore::default());
    let agent = Agent::new(
        Arc::new(router),
        Arc::new(chat),
        Arc::new(builder),
        Arc::new(db),
        store.clone(),
        test_prompts(),
    );
    (agent, store)
}

#[tokio::test]
async fn chat_turn_appends_human_and_ai_to_history() {
    let (agent, _store) = agent_with(
        routing_to("chat"),
        streaming(&["Hello", " there!"]),
        MockProvider::new(),
        MockDb::new(),
    );

    let chunks: Vec<String> = agent
        .process_turn("hi".to_string(), "s1".to_string())
        .collect()
        .await;
    assert_eq!(chunks.join(""), "Hello there!");

    let history = agent.history("s1").await;
    assert_eq!(history.len(), 3);
    assert_eq!(history[0], Message::system("You are a helpful assistant."));
    assert_eq!(history[1], Message::human("hi"));
    assert_eq!(history[2], Message::ai("Hello there!"));
}

#[tokio::test]
async fn offside_turn_records_the_refusal() {
    // No chat expectations beyond the router: reaching the chat provider or
    // the database would fail the test.
    let (agent, _store) = agent_with(
        routing_to("offside"),
        MockProvider::new(),
        MockProvider::new(),
        MockDb::new(),
    );

    let chunks: Vec<String> = agent
        .process_turn("who won the league?".to_string(), "s1".to_string())
        .collect()
        .await;
    assert_eq!(chunks.join(""), REFUSAL_MESSAGE);

    let history = agent.history("s1").await;
    assert_eq!(history.len(), 3);
    assert_eq!(history[2], Message::ai(REFUSAL_MESSAGE));
}

#[tokio::test]
async fn sql_turn_records_the_interpreted_summary() {
    let mut builder = MockProvider::new();
    builder
        .expect_chat()
        .return_once(|_| Ok("SELECT count(*) FROM persons".to_string()));

    let mut db = MockDb::new();
    db.expect_describe_schema()
        .returning(|| Ok("Table persons:\n  id (integer)\n".to_string()));
    db.expect_run()
        .withf(|sql: &str| sql == "SELECT count(*) FROM persons")
        .return_once(|_| Ok("(42)".to_string()));

    let (agent, _store) = agent_with(
        routing_to("sql"),
        streaming(&["There are ", "42 persons."]),
        builder,
        db,
    );

    let chunks: Vec<String> = agent
        .process_turn("how many persons?".to_string(), "s1".to_string())
        .collect()
        .await;
    assert_eq!(chunks.join(""), "There are 42 persons.");

    let history = agent.history("s1").await;
    assert_eq!(history.len(), 3);
    assert_eq!(history[1], Message::human("how many persons?"));
    // Only the summary survives; the SQL text and raw rows are transient.
    assert_eq!(history[2], Message::ai("There are 42 persons."));
}

#[tokio::test]
async fn sql_pipeline_failure_becomes_a_spoken_error() {
    let mut builder = MockProvider::new();
    builder
        .expect_chat()
        .return_once(|_| Ok("SELECT boom FROM persons".to_string()));

    let mut db = MockDb::new();
    db.expect_describe_schema()
        .returning(|| Ok("Table persons:\n  id (integer)\n".to_string()));
    db.expect_run()
        .return_once(|_| Err(DatabaseError::Query("column \"boom\" does not exist".into())));

    let (agent, _store) = agent_with(
        routing_to("sql"),
        MockProvider::new(),
        builder,
        db,
    );

    let chunks: Vec<String> = agent
        .process_turn("how many?".to_string(), "s1".to_string())
        .collect()
        .await;
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].starts_with("Sorry, there was an error while answering your question"));
    assert!(chunks[0].contains("boom"));

    // The failure text is recorded as the turn's AI message.
    let history = agent.history("s1").await;
    assert_eq!(history[2].content(), chunks[0]);
}

#[tokio::test]
async fn mid_stream_chat_failure_is_recorded_as_the_ai_message() {
    let mut chat = MockProvider::new();
    chat.expect_chat_stream().return_once(|_| {
        let chunks: Vec<Result<String, LlmError>> = vec![
            Ok("partial".to_string()),
            Err(LlmError::ProviderError("connection reset".into())),
        ];
        Ok(Box::pin(futures::stream::iter(chunks)) as ChunkStream)
    });

    let (agent, _store) = agent_with(routing_to("chat"), chat, MockProvider::new(), MockDb::new());

    let chunks: Vec<String> = agent
        .process_turn("hi".to_string(), "s1".to_string())
        .collect()
        .await;
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], "partial");
    assert!(chunks[1].starts_with("Sorry, there was an error while processing your message"));

    // The durable record holds the error text, not the partial output.
    let history = agent.history("s1").await;
    assert_eq!(history.len(), 3);
    assert!(history[2].content().contains("connection reset"));
}

#[tokio::test]
async fn first_access_seeds_and_persists_the_session() {
    let (agent, store) = agent_with(
        MockProvider::new(),
        MockProvider::new(),
        MockProvider::new(),
        MockDb::new(),
    );

    let history = agent.history("fresh").await;
    assert_eq!(history, vec![Message::system("You are a helpful assistant.")]);

    // Seeding writes through immediately, before any turn completes.
    let blob = store.load("fresh").await.unwrap();
    assert!(blob.is_some());
}

#[tokio::test]
async fn clear_history_resets_to_the_system_message() {
    let (agent, _store) = agent_with(
        routing_to("chat"),
        streaming(&["hello"]),
        MockProvider::new(),
        MockDb::new(),
    );

    let _: Vec<String> = agent
        .process_turn("hi".to_string(), "s1".to_string())
        .collect()
        .await;
    assert_eq!(agent.history("s1").await.len(), 3);

    agent.clear_history("s1").await;
    assert_eq!(
        agent.history("s1").await,
        vec![Message::system("You are a helpful assistant.")]
    );
}

#[tokio::test]
async fn sessions_are_isolated_from_each_other() {
    let (agent, _store) = agent_with(
        routing_to("chat"),
        streaming(&["hello"]),
        MockProvider::new(),
        MockDb::new(),
    );

    let _: Vec<String> = agent
        .process_turn("hi".to_string(), "a".to_string())
        .collect()
        .await;

    assert_eq!(agent.history("a").await.len(), 3);
    assert_eq!(agent.history("b").await.len(), 1);
}

#[tokio::test]
async fn store_failure_degrades_to_a_fresh_history() {
    let mut store = MockStore::new();
    store
        .expect_load()
        .returning(|_| Err(SessionStoreError::Backend("store offline".into())));
    store
        .expect_save()
        .returning(|_, _| Err(SessionStoreError::Backend("store offline".into())));

    let mut chat = MockProvider::new();
    chat.expect_chat_stream().return_once(|_| {
        Ok(Box::pin(futures::stream::iter(vec![Ok("still here".to_string())])) as ChunkStream)
    });

    let agent = Agent::new(
        Arc::new(routing_to("chat")),
        Arc::new(chat),
        Arc::new(MockProvider::new()),
        Arc::new(MockDb::new()),
        Arc::new(store),
        test_prompts(),
    );

    // The turn completes despite both load and save failing.
    let chunks: Vec<String> = agent
        .process_turn("hi".to_string(), "s1".to_string())
        .collect()
        .await;
    assert_eq!(chunks.join(""), "still here");
}

#[tokio::test]
async fn corrupt_stored_history_starts_fresh_without_clobbering() {
    let store = Arc::new(InMemorySessionStore::default());
    store
        .save("s1", "not json at all".to_string())
        .await
        .unwrap();

    let agent = Agent::new(
        Arc::new(MockProvider::new()),
        Arc::new(MockProvider::new()),
        Arc::new(MockProvider::new()),
        Arc::new(MockDb::new()),
        store.clone(),
        test_prompts(),
    );

    let history = agent.history("s1").await;
    assert_eq!(history, vec![Message::system("You are a helpful assistant.")]);

    // The corrupt blob is left in place until the next completed turn.
    assert_eq!(store.load("s1").await.unwrap().unwrap(), "not json at all");
}
