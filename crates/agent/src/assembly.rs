//! Builds the production agent from loaded configuration. Shared by the server and the CLI.

use std::sync::Arc;

use chrono::Duration;
use clarity_core::config::{AgentConfig, AppConfig, EnrichmentConfig};
use clarity_core::{ApplicationError, EnrichmentError, FieldEnricher, FieldMappings};
use clarity_crm::{CampaignSource, SalesforceCampaignSource};
use thiserror::Error;
use tracing::info;

use crate::conversation::{ConversationResolver, InMemoryConversationStore};
use crate::description::{DescriptionError, LlmDescriptionGenerator};
use crate::llm::LlmError;
use crate::openai::OpenAiChatClient;
use crate::runtime::CampaignAgent;
use crate::tools::campaign_tools;

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("llm client setup failed: {0}")]
    Llm(#[from] LlmError),
    #[error("salesforce client setup failed: {0}")]
    Crm(#[from] ApplicationError),
    #[error(transparent)]
    Mappings(#[from] EnrichmentError),
    #[error("description templates failed to load: {0}")]
    Templates(#[from] DescriptionError),
    #[error("conversation patterns failed to compile: {0}")]
    Patterns(#[from] regex::Error),
}

pub fn field_enricher(config: &EnrichmentConfig) -> Result<FieldEnricher, AssemblyError> {
    let mappings = match &config.field_mappings_path {
        Some(path) => {
            let mappings = FieldMappings::load(path)?;
            info!(
                event_name = "system.bootstrap.field_mappings_loaded",
                path = %path.display(),
                entries = mappings.entries().len(),
                "loaded field mappings file"
            );
            mappings
        }
        None => FieldMappings::builtin(),
    };
    Ok(FieldEnricher::new(mappings))
}

pub fn conversation_store(config: &AgentConfig) -> InMemoryConversationStore {
    let ttl = config
        .conversation_ttl_secs
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(Duration::try_seconds);
    match ttl {
        Some(ttl) => InMemoryConversationStore::with_ttl(ttl),
        None => InMemoryConversationStore::new(),
    }
}

pub fn conversation_resolver(config: &AgentConfig) -> Result<ConversationResolver, AssemblyError> {
    Ok(ConversationResolver::new(Arc::new(conversation_store(config)))?)
}

pub fn build_campaign_agent(config: &AppConfig) -> Result<CampaignAgent, AssemblyError> {
    let source = SalesforceCampaignSource::from_config(&config.salesforce)?;
    build_campaign_agent_with_source(config, Arc::new(source))
}

/// Same wiring as [`build_campaign_agent`] with the CRM side supplied by the caller.
pub fn build_campaign_agent_with_source(
    config: &AppConfig,
    source: Arc<dyn CampaignSource>,
) -> Result<CampaignAgent, AssemblyError> {
    let llm = Arc::new(OpenAiChatClient::from_config(&config.llm)?);
    let generator = LlmDescriptionGenerator::new(llm.clone())?;
    let tools = campaign_tools(source, field_enricher(&config.enrichment)?, Arc::new(generator));

    info!(
        event_name = "system.bootstrap.agent_ready",
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        endpoint = llm.endpoint(),
        max_iterations = config.agent.max_iterations,
        "campaign agent assembled"
    );
    Ok(CampaignAgent::new(llm, tools, config.agent.max_iterations))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;

    use clarity_core::config::{AgentConfig, AppConfig, EnrichmentConfig};
    use clarity_core::CampaignRecord;
    use clarity_crm::InMemoryCampaignSource;
    use tempfile::TempDir;

    use super::{
        build_campaign_agent_with_source, conversation_resolver, conversation_store,
        field_enricher, AssemblyError,
    };
    use crate::conversation::ConversationStore;

    #[test]
    fn enricher_defaults_to_builtin_table() {
        let enricher = field_enricher(&EnrichmentConfig::default()).expect("builtin mappings");
        let record = CampaignRecord::new(
            [("Name".to_owned(), "Spring Webinar".to_owned())].into_iter().collect(),
        );

        assert!(enricher.enrich(&record).starts_with("Campaign: Spring Webinar"));
    }

    #[test]
    fn enricher_reads_mapping_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("mappings.json");
        fs::write(
            &path,
            r#"[{"field": "Channel__c", "label": "Route", "values": {"EM": "Email blast"}}]"#,
        )
        .expect("write mappings");

        let enricher = field_enricher(&EnrichmentConfig { field_mappings_path: Some(path.clone()) })
            .expect("mappings load");
        let record = CampaignRecord::new(
            [
                ("Name".to_owned(), "Blast".to_owned()),
                ("Channel__c".to_owned(), "EM".to_owned()),
            ]
            .into_iter()
            .collect(),
        );

        assert!(enricher.enrich(&record).contains("Route: EM (Email blast)"));
    }

    #[test]
    fn missing_mapping_file_is_an_error() {
        let result = field_enricher(&EnrichmentConfig {
            field_mappings_path: Some(PathBuf::from("/nonexistent/clarity/mappings.json")),
        });

        assert!(matches!(result, Err(AssemblyError::Mappings(_))));
    }

    #[test]
    fn store_ttl_follows_agent_config() {
        let id = clarity_core::CampaignId::parse("701Hr000001L82yIAC").expect("valid id");
        let store = conversation_store(&AgentConfig {
            max_iterations: 10,
            conversation_ttl_secs: Some(3_600),
        });
        store.remember("g1", &id);

        assert_eq!(store.last_campaign("g1"), Some(id));
    }

    #[test]
    fn resolver_uses_configured_store() {
        let resolver = conversation_resolver(&AgentConfig {
            max_iterations: 10,
            conversation_ttl_secs: None,
        })
        .expect("patterns compile");

        let first = resolver.resolve("g1", "summary of 701Hr000001L82yIAC").expect("resolves");
        let follow_up = resolver.resolve("g1", "explain it").expect("follow-up resolves");
        assert_eq!(follow_up.campaign_id, first.campaign_id);
    }

    #[test]
    fn agent_takes_iteration_cap_from_config() {
        let mut config = AppConfig::default();
        config.agent.max_iterations = 4;

        let agent =
            build_campaign_agent_with_source(&config, Arc::new(InMemoryCampaignSource::new()))
                .expect("agent assembles");

        assert_eq!(agent.max_iterations(), 4);
    }
}
