//! ScyllaDB schema creation

use scylla::Session;

use crate::error::PersistenceError;

/// Create the keyspace if it doesn't exist
pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create keyspace: {}", e)))?;

    Ok(())
}

/// Create all required tables
pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    // One row per turn, newest first within a session
    let conversations_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.conversations (
            session_id TEXT,
            turn_number INT,
            id UUID,
            transcript TEXT,
            response TEXT,
            language TEXT,
            intent TEXT,
            confidence FLOAT,
            lead_json TEXT,
            stage TEXT,
            audio_input_key TEXT,
            audio_output_key TEXT,
            tokens_used INT,
            cost_usd DOUBLE,
            latency_ms BIGINT,
            created_at TIMESTAMP,
            PRIMARY KEY ((session_id), turn_number)
        ) WITH CLUSTERING ORDER BY (turn_number DESC)
    "#,
        keyspace
    );

    session
        .query_unpaged(conversations_table, &[])
        .await
        .map_err(|e| {
            PersistenceError::SchemaError(format!("Failed to create conversations table: {}", e))
        })?;

    // Aggregated lead view, one row per session
    let summaries_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.lead_summaries (
            session_id TEXT,
            lead_json TEXT,
            language TEXT,
            total_turns INT,
            total_tokens BIGINT,
            total_cost_usd DOUBLE,
            avg_confidence FLOAT,
            confidence_samples INT,
            status TEXT,
            created_at TIMESTAMP,
            updated_at TIMESTAMP,
            PRIMARY KEY (session_id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(summaries_table, &[])
        .await
        .map_err(|e| {
            PersistenceError::SchemaError(format!("Failed to create lead_summaries table: {}", e))
        })?;

    Ok(())
}
