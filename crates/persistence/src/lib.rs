//! Persistence layer for the lead qualification agent
//!
//! Provides storage for:
//! - Conversation turns and per-session lead summaries (ScyllaDB or in-memory)
//! - Recorded and synthesized audio clips (filesystem)

pub mod audio;
pub mod client;
pub mod conversations;
pub mod error;
pub mod memory;
pub mod schema;

use std::sync::Arc;

use lead_agent_config::{PersistenceBackend, PersistenceConfig};
use lead_agent_core::ConversationStore;

pub use audio::{AudioKind, AudioStore};
pub use client::{ScyllaClient, ScyllaConfig};
pub use conversations::ScyllaConversationStore;
pub use error::PersistenceError;
pub use memory::InMemoryConversationStore;

/// Initialize the persistence layer selected in `config`
///
/// The ScyllaDB backend connects and ensures the schema before returning.
pub async fn init(config: &PersistenceConfig) -> Result<PersistenceLayer, PersistenceError> {
    let conversations: Arc<dyn ConversationStore> = match config.backend {
        PersistenceBackend::Memory => {
            tracing::info!("Using in-memory conversation store");
            Arc::new(InMemoryConversationStore::new())
        }
        PersistenceBackend::Scylla => {
            let client = ScyllaClient::connect(ScyllaConfig::from(config)).await?;
            client.ensure_schema().await?;
            Arc::new(ScyllaConversationStore::new(client))
        }
    };

    Ok(PersistenceLayer {
        conversations,
        audio: AudioStore::new(&config.audio_dir),
    })
}

/// Combined persistence layer
#[derive(Clone)]
pub struct PersistenceLayer {
    pub conversations: Arc<dyn ConversationStore>,
    pub audio: AudioStore,
}

impl PersistenceLayer {
    /// In-memory conversations with audio under `audio_dir`
    pub fn in_memory(audio_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            conversations: Arc::new(InMemoryConversationStore::new()),
            audio: AudioStore::new(audio_dir),
        }
    }
}
