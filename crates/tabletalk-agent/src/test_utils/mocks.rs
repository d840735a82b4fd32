use async_trait::async_trait;
use mockall::mock;

use tabletalk::chat::{ChatProvider, ChunkStream, Message};
use tabletalk::db::{Database, DatabaseError};
use tabletalk::error::LlmError;
use tabletalk::session::{SessionStore, SessionStoreError};

mock! {
    pub Provider {}

    #[async_trait]
    impl ChatProvider for Provider {
        async fn chat(&self, messages: &[Message]) -> Result<String, LlmError>;
        async fn chat_stream(&self, messages: &[Message]) -> Result<ChunkStream, LlmError>;
    }
}

mock! {
    pub Db {}

    #[async_trait]
    impl Database for Db {
        async fn describe_schema(&self) -> Result<String, DatabaseError>;
        async fn run(&self, sql: &str) -> Result<String, DatabaseError>;
    }
}

mock! {
    pub Store {}

    #[async_trait]
    impl SessionStore for Store {
        async fn load(&self, session_id: &str) -> Result<Option<String>, SessionStoreError>;
        async fn save(&self, session_id: &str, blob: String) -> Result<(), SessionStoreError>;
        async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError>;
    }
}
