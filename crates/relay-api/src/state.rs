//! Application state wiring the relay together.
//!
//! The orchestrator is generic over its collaborators; AppState pins it to
//! the concrete infra implementations.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use relay_core::conversation::ConversationStore;
use relay_core::orchestrator::SessionOrchestrator;
use relay_infra::config::Credentials;
use relay_infra::line::LineClient;
use relay_infra::llm::openai_compat::OpenAiCompatGateway;
use relay_types::config::RelayConfig;

/// Orchestrator pinned to the OpenAI-compatible gateway and the LINE client.
pub type ConcreteOrchestrator = SessionOrchestrator<OpenAiCompatGateway, LineClient, LineClient>;

/// Connect timeout for all outbound HTTP.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub channel_secret: Arc<SecretString>,
}

impl AppState {
    /// Build the store, gateway and platform client from configuration.
    pub fn build(config: &RelayConfig, credentials: Credentials) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("line-relay/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        let store = Arc::new(ConversationStore::new(
            config.conversation.system_prompt.clone(),
            config.conversation.max_history_turns,
        ));
        let gateway = OpenAiCompatGateway::new(
            client.clone(),
            credentials.openai_api_key,
            &config.completion,
        );
        let line = LineClient::new(client, credentials.channel_token, &config.line);

        let orchestrator = SessionOrchestrator::new(store, gateway, line.clone(), line);

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            channel_secret: Arc::new(credentials.channel_secret),
        })
    }
}
