//! Persistence layer wiring against the in-memory backend

use lead_agent_config::{PersistenceBackend, PersistenceConfig};
use lead_agent_core::{Language, LeadRecord, TurnRecord};
use lead_agent_persistence::{init, AudioKind};

#[tokio::test]
async fn test_init_memory_backend() {
    let dir = tempfile::tempdir().unwrap();
    let config = PersistenceConfig {
        backend: PersistenceBackend::Memory,
        audio_dir: dir.path().join("audio").to_string_lossy().into_owned(),
        ..Default::default()
    };

    let layer = init(&config).await.unwrap();
    assert!(layer.conversations.health_check().await);

    let input_key = layer
        .audio
        .save("session-a", b"RIFF....WAVE", AudioKind::Input)
        .await
        .unwrap();

    let mut turn = TurnRecord::new("session-a", 1);
    turn.transcript = "hello".into();
    turn.response = "Hi!".into();
    turn.language = Language::Tamil;
    turn.audio_input_key = Some(input_key.clone());
    layer.conversations.append(&turn).await.unwrap();

    let prior = layer.conversations.load_latest("session-a").await.unwrap().unwrap();
    assert_eq!(prior.turn_count, 1);
    assert_eq!(prior.language, Language::Tamil);
    assert_eq!(prior.lead, LeadRecord::default());

    let stored = layer.conversations.turns("session-a").await.unwrap();
    assert_eq!(stored[0].audio_input_key.as_deref(), Some(input_key.as_str()));
    assert_eq!(
        layer.audio.get(&input_key).await.unwrap(),
        Some(b"RIFF....WAVE".to_vec())
    );
}
