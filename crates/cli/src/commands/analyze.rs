use clarity_agent::{build_campaign_agent, AgentResponse, AgentRunner, CampaignAgent};
use clarity_core::config::{AppConfig, LoadOptions};
use clarity_core::{CampaignId, Intent};

use super::{
    CommandResult, EXIT_ANALYSIS_FAILED, EXIT_BOOTSTRAP, EXIT_CONFIG, EXIT_INVALID_INPUT,
};

pub fn run(raw_campaign_id: &str, intent: Option<Intent>) -> CommandResult {
    let campaign_id = match CampaignId::parse(raw_campaign_id) {
        Ok(campaign_id) => campaign_id,
        Err(error) => {
            return CommandResult::failure(
                "analyze",
                "invalid_campaign_id",
                error.to_string(),
                EXIT_INVALID_INPUT,
            )
        }
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "analyze",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };

    let agent = match build_campaign_agent(&config) {
        Ok(agent) => agent,
        Err(error) => {
            let message = error.to_string();
            return CommandResult::failure("analyze", "bootstrap", message, EXIT_BOOTSTRAP);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "analyze",
                "bootstrap",
                format!("failed to initialize async runtime: {error}"),
                EXIT_BOOTSTRAP,
            )
        }
    };

    render(runtime.block_on(analyze(&agent, &campaign_id, intent)))
}

/// Without an explicit intent the campaign gets the full analysis.
pub async fn analyze(
    agent: &CampaignAgent,
    campaign_id: &CampaignId,
    intent: Option<Intent>,
) -> AgentResponse {
    match intent {
        None => agent.analyze_campaign(campaign_id).await,
        Some(intent) => agent.run(&format!("Analyze campaign {campaign_id}"), intent).await,
    }
}

pub fn render(response: AgentResponse) -> CommandResult {
    let data = serde_json::to_value(&response).ok();
    if response.success {
        return CommandResult::success_with_data("analyze", response.response, data);
    }
    let message = response.error.unwrap_or(response.response);
    CommandResult::failure_with_data("analyze", "agent", message, EXIT_ANALYSIS_FAILED, data)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use clarity_agent::llm::{ChatMessage, LlmError, Planner, PlannerStep, ToolDeclaration};
    use clarity_agent::{AgentResponse, CampaignAgent, ToolRegistry};
    use clarity_core::{CampaignId, Intent};
    use serde_json::Value;

    use super::{analyze, render, run};

    struct EchoPlanner;

    #[async_trait]
    impl Planner for EchoPlanner {
        async fn next_step(
            &self,
            transcript: &[ChatMessage],
            _tools: &[ToolDeclaration],
        ) -> Result<PlannerStep, LlmError> {
            let system = transcript[0].content.clone().unwrap_or_default();
            let user = transcript[1].content.clone().unwrap_or_default();
            let basic = system.contains("Do not call generate_campaign_description");
            let workflow = if basic { "basic" } else { "other" };
            Ok(PlannerStep::FinalAnswer(format!("{workflow}: {user}")))
        }
    }

    fn agent() -> CampaignAgent {
        CampaignAgent::new(Arc::new(EchoPlanner), ToolRegistry::default(), 3)
    }

    #[test]
    fn invalid_campaign_id_fails_before_config() {
        let result = run("701-not-an-id", None);

        assert_eq!(result.exit_code, 2);
        let payload: Value = serde_json::from_str(&result.output).expect("json output");
        assert_eq!(payload["command"], "analyze");
        assert_eq!(payload["error_class"], "invalid_campaign_id");
    }

    #[tokio::test]
    async fn intent_selects_prompt_and_message() {
        let id = CampaignId::parse("701Hr000001L82yIAC").expect("valid id");

        let default = analyze(&agent(), &id, None).await;
        let basic = analyze(&agent(), &id, Some(Intent::BasicInfo)).await;

        assert_eq!(default.response, "other: Analyze campaign 701Hr000001L82yIAC");
        assert_eq!(basic.response, "basic: Analyze campaign 701Hr000001L82yIAC");
    }

    #[test]
    fn failed_analysis_maps_to_agent_error() {
        let result = render(AgentResponse {
            success: false,
            response: "I've reached the maximum number of processing steps. Please try again."
                .to_owned(),
            error: Some("Maximum iterations reached".to_owned()),
            iterations: 10,
        });

        assert_eq!(result.exit_code, 5);
        let payload: Value = serde_json::from_str(&result.output).expect("json output");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["message"], "Maximum iterations reached");
        assert_eq!(payload["data"]["iterations"], 10);
    }
}
