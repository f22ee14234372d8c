//! Application state shared by all handlers

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use lead_agent_agent::ConversationService;
use lead_agent_config::Settings;
use lead_agent_core::{LanguageModel, Synthesizer, Transcriber};
use lead_agent_persistence::AudioStore;
use lead_agent_pipeline::SpeechServices;

use crate::session::SessionManager;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub service: Arc<ConversationService>,
    pub sessions: Arc<SessionManager>,
    pub llm: Arc<dyn LanguageModel>,
    pub transcriber: Arc<dyn Transcriber>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub audio: AudioStore,
    /// `None` when metrics are disabled or the recorder is owned elsewhere
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        service: Arc<ConversationService>,
        llm: Arc<dyn LanguageModel>,
        speech: SpeechServices,
        audio: AudioStore,
    ) -> Self {
        let sessions = Arc::new(SessionManager::from_config(&settings.server));
        Self {
            settings: Arc::new(settings),
            service,
            sessions,
            llm,
            transcriber: speech.transcriber,
            synthesizer: speech.synthesizer,
            audio,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }

    pub fn max_audio_bytes(&self) -> usize {
        self.settings.server.max_audio_bytes
    }
}
