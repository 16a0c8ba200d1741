use std::sync::Arc;

use reqwest::Client;

use crate::config::ServerConfig;
use crate::core::bridge::{BridgeServices, SessionTemplate};
use crate::core::context_store::CallContextStore;
use crate::core::lookup::{
    ApplicationStatusLookup, AssistantsConfig, AssistantsKnowledgeBase, ZohoConfig, ZohoCrm,
};
use crate::core::realtime::{OpenAIRealtimeConnector, RealtimeConfig};
use crate::core::tools::ToolDispatcher;

/// Application state shared across all handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub services: Arc<BridgeServices>,
}

impl AppState {
    /// Build the production collaborators from configuration.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let client = Client::builder()
            .timeout(config.lookup_timeout())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to build configured HTTP client, using defaults");
                Client::new()
            });

        let crm = ZohoCrm::new(client.clone(), ZohoConfig::from_server_config(&config));
        if !crm.is_configured() {
            tracing::warn!("Zoho credentials not configured, status lookups will find nothing");
        }
        if config.openai_api_key.as_deref().is_none_or(str::is_empty) {
            tracing::warn!("OPENAI_API_KEY not set, calls cannot be bridged");
        }

        let knowledge_base =
            AssistantsKnowledgeBase::new(client, AssistantsConfig::from_server_config(&config));
        let connector = OpenAIRealtimeConnector::new(RealtimeConfig {
            api_key: config.openai_api_key.clone(),
            endpoint: config.openai_realtime_url.clone(),
            model: config.openai_realtime_model.clone(),
        });

        let services = BridgeServices {
            connector: Arc::new(connector),
            contexts: Arc::new(CallContextStore::new(config.call_context_ttl())),
            tools: ToolDispatcher::new(Arc::new(crm), Arc::new(knowledge_base)),
            session_template: SessionTemplate::from_config(&config),
        };

        Self::with_services(config, services)
    }

    /// State over caller-supplied collaborators.
    pub fn with_services(config: ServerConfig, services: BridgeServices) -> Arc<Self> {
        Arc::new(Self {
            config,
            services: Arc::new(services),
        })
    }

    pub fn contexts(&self) -> &Arc<CallContextStore> {
        &self.services.contexts
    }

    pub fn status_lookup(&self) -> &ApplicationStatusLookup {
        self.services.tools.status_lookup()
    }
}
