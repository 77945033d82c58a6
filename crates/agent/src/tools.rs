use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use clarity_core::domain::campaign::RECORD_WRAPPER_KEY;
use clarity_core::{ApplicationError, CampaignId, CampaignRecord, FieldEnricher};
use clarity_crm::CampaignSource;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::description::DescriptionGenerator;
use crate::llm::ToolDeclaration;

pub const GET_CAMPAIGN_DATA: &str = "get_campaign_data";
pub const ENRICH_CAMPAIGN_CONTEXT: &str = "enrich_campaign_context";
pub const GENERATE_CAMPAIGN_DESCRIPTION: &str = "generate_campaign_description";

/// A model-invocable function. `execute` never fails: every outcome is a JSON object with a
/// boolean `success`, and failures carry an `error` string.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn declaration(&self) -> ToolDeclaration;
    async fn execute(&self, input: Value) -> Value;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    order: Vec<&'static str>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        let name = tool.name();
        if self.tools.insert(name.to_string(), Box::new(tool)).is_none() {
            self.order.push(name);
        }
    }

    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(*name))
            .map(|tool| tool.declaration())
            .collect()
    }

    /// Runs the named tool on raw model arguments.
    pub async fn invoke(&self, name: &str, arguments: &str) -> Value {
        let Some(tool) = self.tools.get(name) else {
            return failure(format!("Unknown tool: {name}"));
        };

        let input = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            match serde_json::from_str::<Value>(arguments) {
                Ok(input) => input,
                Err(error) => return failure(format!("Invalid arguments for {name}: {error}")),
            }
        };

        let output = tool.execute(input).await;
        let success = output.get("success").and_then(Value::as_bool).unwrap_or(false);
        info!(
            event_name = "agent.tool.executed",
            tool = name,
            success,
            "tool executed"
        );
        output
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Registry with the three campaign tools in their usual call order.
pub fn campaign_tools(
    source: Arc<dyn CampaignSource>,
    enricher: FieldEnricher,
    generator: Arc<dyn DescriptionGenerator>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::default();
    registry.register(FetchCampaignTool::new(source));
    registry.register(EnrichContextTool::new(enricher));
    registry.register(GenerateDescriptionTool::new(generator));
    registry
}

fn failure(error: impl Into<String>) -> Value {
    json!({"success": false, "error": error.into()})
}

fn parse_request<T: DeserializeOwned>(name: &str, input: Value) -> Result<T, Value> {
    serde_json::from_value(input)
        .map_err(|error| failure(format!("Invalid arguments for {name}: {error}")))
}

#[derive(Debug, Deserialize)]
pub struct FetchCampaignRequest {
    pub campaign_id: String,
}

#[derive(Debug, Deserialize)]
pub struct EnrichCampaignRequest {
    #[serde(default)]
    pub campaign_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateDescriptionRequest {
    #[serde(default)]
    pub campaign_data: Option<Value>,
    #[serde(default)]
    pub enriched_context: String,
}

fn campaign_record(campaign_data: Option<&Value>) -> Result<CampaignRecord, String> {
    match campaign_data {
        None | Some(Value::Null) => Err("No campaign data provided".to_owned()),
        Some(value) => CampaignRecord::from_json(value).map_err(|error| error.to_string()),
    }
}

pub struct FetchCampaignTool {
    source: Arc<dyn CampaignSource>,
}

impl FetchCampaignTool {
    pub fn new(source: Arc<dyn CampaignSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for FetchCampaignTool {
    fn name(&self) -> &'static str {
        GET_CAMPAIGN_DATA
    }

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: GET_CAMPAIGN_DATA,
            description: "Fetch the full Salesforce record for one campaign, including every \
                          metadata field needed for analysis.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "campaign_id": {
                        "type": "string",
                        "description": "Salesforce campaign id (15 or 18 alphanumeric characters)"
                    }
                },
                "required": ["campaign_id"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, input: Value) -> Value {
        let request: FetchCampaignRequest = match parse_request(GET_CAMPAIGN_DATA, input) {
            Ok(request) => request,
            Err(output) => return output,
        };
        let raw_id = request.campaign_id.trim().to_owned();

        let campaign_id = match CampaignId::parse(&raw_id) {
            Ok(id) => id,
            Err(error) => return fetch_failure(ApplicationError::from(error), &raw_id),
        };

        match self.source.fetch_campaign(&campaign_id).await {
            Ok(record) => json!({
                "success": true,
                "campaign_id": campaign_id.as_str(),
                "campaign_name": record.name(),
                RECORD_WRAPPER_KEY: record.to_json(),
            }),
            Err(error) => fetch_failure(error, campaign_id.as_str()),
        }
    }
}

fn fetch_failure(error: ApplicationError, campaign_id: &str) -> Value {
    let message = match error {
        ApplicationError::NotFound(message) => message,
        ApplicationError::Domain(error) => error.to_string(),
        ApplicationError::Integration(message) | ApplicationError::Configuration(message) => {
            format!("Salesforce query failed: {message}")
        }
    };
    json!({"success": false, "error": message, "campaign_id": campaign_id})
}

pub struct EnrichContextTool {
    enricher: FieldEnricher,
}

impl EnrichContextTool {
    pub fn new(enricher: FieldEnricher) -> Self {
        Self { enricher }
    }
}

#[async_trait]
impl Tool for EnrichContextTool {
    fn name(&self) -> &'static str {
        ENRICH_CAMPAIGN_CONTEXT
    }

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: ENRICH_CAMPAIGN_CONTEXT,
            description: "Translate the raw campaign fields (Channel, Sub Channel, Type, BMID \
                          and so on) into plain-language context a sales rep can act on.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "campaign_data": {
                        "type": "object",
                        "description": "The flat `data` object returned by get_campaign_data",
                        "additionalProperties": true
                    }
                },
                "required": ["campaign_data"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, input: Value) -> Value {
        let request: EnrichCampaignRequest = match parse_request(ENRICH_CAMPAIGN_CONTEXT, input) {
            Ok(request) => request,
            Err(output) => return output,
        };

        let record = match campaign_record(request.campaign_data.as_ref()) {
            Ok(record) => record,
            Err(message) if request.campaign_data.is_none() => {
                return json!({"success": false, "error": message, "enriched_context": ""})
            }
            Err(message) => {
                return json!({
                    "success": false,
                    "error": format!("Context enrichment failed: {message}"),
                    "enriched_context": "",
                })
            }
        };

        let enriched_context = self.enricher.enrich(&record);
        json!({
            "success": true,
            "context_length": enriched_context.chars().count(),
            "enriched_context": enriched_context,
            "campaign_name": record.name(),
        })
    }
}

pub struct GenerateDescriptionTool {
    generator: Arc<dyn DescriptionGenerator>,
}

impl GenerateDescriptionTool {
    pub fn new(generator: Arc<dyn DescriptionGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Tool for GenerateDescriptionTool {
    fn name(&self) -> &'static str {
        GENERATE_CAMPAIGN_DESCRIPTION
    }

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: GENERATE_CAMPAIGN_DESCRIPTION,
            description: "Write a sales-facing campaign description. The prompt is chosen by \
                          campaign channel (email, events, webinar, partner referral, ...) and \
                          the result tells the rep how to approach the prospect.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "campaign_data": {
                        "type": "object",
                        "description": "The flat `data` object returned by get_campaign_data",
                        "additionalProperties": true
                    },
                    "enriched_context": {
                        "type": "string",
                        "description": "The enriched_context string returned by enrich_campaign_context"
                    }
                },
                "required": ["campaign_data", "enriched_context"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, input: Value) -> Value {
        let request: GenerateDescriptionRequest =
            match parse_request(GENERATE_CAMPAIGN_DESCRIPTION, input) {
                Ok(request) => request,
                Err(output) => return output,
            };

        let record = match campaign_record(request.campaign_data.as_ref()) {
            Ok(record) => record,
            Err(message) => {
                return json!({
                    "success": false,
                    "error": format!("AI description generation failed: {message}"),
                    "ai_description": "",
                })
            }
        };

        match self.generator.generate(&record, &request.enriched_context).await {
            Ok(description) => json!({
                "success": true,
                "description_length": description.text.chars().count(),
                "ai_description": description.text,
                "prompt_type": description.prompt_type.as_str(),
                "campaign_name": record.name(),
                "channel": record.channel(),
            }),
            Err(error) => json!({
                "success": false,
                "error": format!("AI description generation failed: {error}"),
                "ai_description": "",
                "campaign_name": record.name(),
                "channel": record.channel(),
            }),
        }
    }
}
