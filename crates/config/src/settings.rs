//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{AgentConfig, ConfigError, LlmSettings, MessageCatalog};

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub rag: RagConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Canned per-language replies
    #[serde(default)]
    pub messages: MessageCatalog,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_agent()?;
        self.validate_llm()?;
        self.validate_rag()?;
        self.validate_persistence()?;
        self.messages.validate()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;
        if server.port == 0 {
            return Err(ConfigError::invalid("server.port", "Port cannot be 0"));
        }
        if server.max_sessions == 0 {
            return Err(ConfigError::invalid(
                "server.max_sessions",
                "Must allow at least one session",
            ));
        }
        if server.timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "server.timeout_seconds",
                "Timeout cannot be 0",
            ));
        }
        if self.environment.is_production()
            && server.cors_enabled
            && server.cors_origins.iter().any(|o| o == "*")
        {
            return Err(ConfigError::invalid(
                "server.cors_origins",
                "Wildcard origin is not allowed in production",
            ));
        }
        Ok(())
    }

    fn validate_agent(&self) -> Result<(), ConfigError> {
        if self.agent.llm_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "agent.llm_timeout_ms",
                "Timeout cannot be 0",
            ));
        }
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            return Err(ConfigError::invalid(
                "agent.temperature",
                format!("Must be between 0.0 and 2.0, got {}", self.agent.temperature),
            ));
        }
        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;
        if llm.model.trim().is_empty() {
            return Err(ConfigError::invalid("llm.model", "Model name cannot be empty"));
        }
        if llm.endpoint.trim().is_empty() {
            return Err(ConfigError::invalid("llm.endpoint", "Endpoint cannot be empty"));
        }
        if llm.timeout_ms == 0 {
            return Err(ConfigError::invalid("llm.timeout_ms", "Timeout cannot be 0"));
        }
        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::invalid(
                "llm.temperature",
                format!("Must be between 0.0 and 2.0, got {}", llm.temperature),
            ));
        }
        if llm.prompt_cost_per_1k < 0.0 || llm.completion_cost_per_1k < 0.0 {
            return Err(ConfigError::invalid("llm.cost", "Token prices cannot be negative"));
        }
        Ok(())
    }

    fn validate_rag(&self) -> Result<(), ConfigError> {
        if self.rag.context_top_k == 0 {
            return Err(ConfigError::invalid(
                "rag.context_top_k",
                "Must retrieve at least one document",
            ));
        }
        if self.rag.fallback_count == 0 {
            return Err(ConfigError::invalid(
                "rag.fallback_count",
                "Fallback must return at least one document",
            ));
        }
        Ok(())
    }

    fn validate_persistence(&self) -> Result<(), ConfigError> {
        let p = &self.persistence;
        if p.backend == PersistenceBackend::Scylla {
            if p.scylla_hosts.is_empty() {
                return Err(ConfigError::invalid(
                    "persistence.scylla_hosts",
                    "At least one host is required",
                ));
            }
            if p.keyspace.trim().is_empty() {
                return Err(ConfigError::MissingField("persistence.keyspace".to_string()));
            }
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Idle time after which a session is evicted from the registry
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Largest decoded audio payload accepted by the voice endpoint
    #[serde(default = "default_max_audio_bytes")]
    pub max_audio_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

fn default_max_sessions() -> usize {
    1000
}

fn default_session_timeout_secs() -> u64 {
    3600
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

fn default_max_audio_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout_seconds(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            max_sessions: default_max_sessions(),
            session_timeout_secs: default_session_timeout_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            max_audio_bytes: default_max_audio_bytes(),
        }
    }
}

/// Knowledge retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// File or directory holding knowledge documents (YAML/JSON)
    #[serde(default = "default_knowledge_path")]
    pub knowledge_path: String,

    /// Documents joined into the prompt context
    #[serde(default = "default_context_top_k")]
    pub context_top_k: usize,

    /// Documents returned when no keyword matches
    #[serde(default = "default_fallback_count")]
    pub fallback_count: usize,
}

fn default_knowledge_path() -> String {
    "knowledge".to_string()
}

fn default_context_top_k() -> usize {
    2
}

fn default_fallback_count() -> usize {
    3
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            knowledge_path: default_knowledge_path(),
            context_top_k: default_context_top_k(),
            fallback_count: default_fallback_count(),
        }
    }
}

/// Speech service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Transcription service base URL
    #[serde(default = "default_stt_url")]
    pub stt_url: String,

    /// Synthesis service base URL
    #[serde(default = "default_tts_url")]
    pub tts_url: String,

    #[serde(default = "default_speech_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_stt_url() -> String {
    "http://127.0.0.1:8091".to_string()
}

fn default_tts_url() -> String {
    "http://127.0.0.1:8092".to_string()
}

fn default_speech_timeout_ms() -> u64 {
    60_000
}

fn default_sample_rate() -> u32 {
    16000
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            stt_url: default_stt_url(),
            tts_url: default_tts_url(),
            timeout_ms: default_speech_timeout_ms(),
            sample_rate: default_sample_rate(),
        }
    }
}

/// Where conversation turns are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    #[default]
    Memory,
    Scylla,
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub backend: PersistenceBackend,

    /// ScyllaDB host addresses
    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,

    /// ScyllaDB keyspace name
    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,

    /// ScyllaDB replication factor
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,

    /// Root directory for recorded and synthesized audio
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,
}

fn default_scylla_hosts() -> Vec<String> {
    std::env::var("SCYLLA_HOSTS")
        .map(|s| s.split(',').map(|h| h.trim().to_string()).collect())
        .unwrap_or_else(|_| vec!["127.0.0.1:9042".to_string()])
}

fn default_scylla_keyspace() -> String {
    std::env::var("SCYLLA_KEYSPACE").unwrap_or_else(|_| "lead_agent".to_string())
}

fn default_replication_factor() -> u8 {
    1
}

fn default_audio_dir() -> String {
    "audio_storage".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::default(),
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            replication_factor: default_replication_factor(),
            audio_dir: default_audio_dir(),
        }
    }
}

/// Logging and metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from `config/default`, `config/{env}` and the environment
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("LEAD_AGENT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        environment = ?settings.environment,
        provider = ?settings.llm.provider,
        classifier = ?settings.agent.classifier,
        "Settings loaded"
    );

    Ok(settings)
}
