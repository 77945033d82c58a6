use std::sync::Arc;

use async_trait::async_trait;
use clarity_core::{CampaignId, Intent};
use serde::Serialize;
use tracing::{info, warn};

use crate::llm::{ChatMessage, Planner, PlannerStep};
use crate::prompts::system_instructions;
use crate::tools::ToolRegistry;

pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

const MAX_ITERATIONS_ERROR: &str = "Maximum iterations reached";
const MAX_ITERATIONS_RESPONSE: &str =
    "I've reached the maximum number of processing steps. Please try again.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentResponse {
    pub success: bool,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub iterations: u32,
}

impl AgentResponse {
    fn answer(response: String, iterations: u32) -> Self {
        Self { success: true, response, error: None, iterations }
    }

    fn failure(error: String, response: String, iterations: u32) -> Self {
        Self { success: false, response, error: Some(error), iterations }
    }
}

/// Anything that can answer a campaign question. The chat front end depends on this rather
/// than on [`CampaignAgent`] directly.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, user_message: &str, intent: Intent) -> AgentResponse;
}

pub struct CampaignAgent {
    planner: Arc<dyn Planner>,
    tools: ToolRegistry,
    max_iterations: u32,
}

impl CampaignAgent {
    pub fn new(planner: Arc<dyn Planner>, tools: ToolRegistry, max_iterations: u32) -> Self {
        Self { planner, tools, max_iterations }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub async fn analyze_campaign(&self, campaign_id: &CampaignId) -> AgentResponse {
        self.run(&format!("Analyze campaign {campaign_id}"), Intent::FullAnalysis).await
    }
}

#[async_trait]
impl AgentRunner for CampaignAgent {
    async fn run(&self, user_message: &str, intent: Intent) -> AgentResponse {
        let declarations = self.tools.declarations();
        let mut transcript =
            vec![ChatMessage::system(system_instructions(intent)), ChatMessage::user(user_message)];

        for iteration in 1..=self.max_iterations {
            let step = match self.planner.next_step(&transcript, &declarations).await {
                Ok(step) => step,
                Err(error) => {
                    warn!(
                        event_name = "agent.run.failed",
                        intent = intent.as_str(),
                        iteration,
                        error = %error,
                        "planner call failed"
                    );
                    return AgentResponse::failure(
                        format!("Agent execution failed: {error}"),
                        format!("I encountered an error: {error}"),
                        iteration,
                    );
                }
            };

            let invocations = match step {
                PlannerStep::FinalAnswer(text) => {
                    info!(
                        event_name = "agent.run.completed",
                        intent = intent.as_str(),
                        iterations = iteration,
                        "agent produced final answer"
                    );
                    return AgentResponse::answer(text, iteration);
                }
                PlannerStep::ToolInvocations(invocations) => invocations,
            };

            transcript.push(ChatMessage::assistant_tool_calls(invocations.clone()));
            for invocation in invocations {
                info!(
                    event_name = "agent.tool.requested",
                    intent = intent.as_str(),
                    iteration,
                    tool = %invocation.name,
                    "planner requested tool"
                );
                let output = self.tools.invoke(&invocation.name, &invocation.arguments).await;
                transcript.push(ChatMessage::tool_result(invocation.id, output.to_string()));
            }
        }

        warn!(
            event_name = "agent.run.exhausted",
            intent = intent.as_str(),
            max_iterations = self.max_iterations,
            "agent stopped at iteration cap"
        );
        AgentResponse::failure(
            MAX_ITERATIONS_ERROR.to_owned(),
            MAX_ITERATIONS_RESPONSE.to_owned(),
            self.max_iterations,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use clarity_core::{FieldEnricher, Intent};
    use clarity_crm::InMemoryCampaignSource;
    use tokio::sync::Mutex;

    use super::{AgentRunner, CampaignAgent, DEFAULT_MAX_ITERATIONS};
    use crate::description::{DescriptionError, DescriptionGenerator, GeneratedDescription};
    use crate::llm::{
        ChatMessage, LlmError, Planner, PlannerStep, Role, ToolDeclaration, ToolInvocation,
    };
    use crate::tools::campaign_tools;

    #[derive(Default)]
    struct ScriptedPlanner {
        steps: Mutex<VecDeque<Result<PlannerStep, LlmError>>>,
        transcripts: Mutex<Vec<Vec<ChatMessage>>>,
        loop_forever: bool,
    }

    impl ScriptedPlanner {
        fn with_steps(steps: Vec<Result<PlannerStep, LlmError>>) -> Self {
            Self { steps: Mutex::new(steps.into()), ..Self::default() }
        }

        fn always_calling_tools() -> Self {
            Self { loop_forever: true, ..Self::default() }
        }

        async fn calls(&self) -> usize {
            self.transcripts.lock().await.len()
        }
    }

    #[async_trait]
    impl Planner for ScriptedPlanner {
        async fn next_step(
            &self,
            transcript: &[ChatMessage],
            _tools: &[ToolDeclaration],
        ) -> Result<PlannerStep, LlmError> {
            let mut transcripts = self.transcripts.lock().await;
            transcripts.push(transcript.to_vec());
            if self.loop_forever {
                return Ok(PlannerStep::ToolInvocations(vec![ToolInvocation {
                    id: format!("call_{}", transcripts.len()),
                    name: "enrich_campaign_context".to_owned(),
                    arguments: r#"{"campaign_data": {"Name": "Loop"}}"#.to_owned(),
                }]));
            }
            self.steps
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Ok(PlannerStep::FinalAnswer("done".to_owned())))
        }
    }

    struct NoopGenerator;

    #[async_trait]
    impl DescriptionGenerator for NoopGenerator {
        async fn generate(
            &self,
            _record: &clarity_core::CampaignRecord,
            _enriched_context: &str,
        ) -> Result<GeneratedDescription, DescriptionError> {
            Err(DescriptionError::Empty)
        }
    }

    fn agent(planner: Arc<ScriptedPlanner>, max_iterations: u32) -> CampaignAgent {
        let tools = campaign_tools(
            Arc::new(InMemoryCampaignSource::new()),
            FieldEnricher::default(),
            Arc::new(NoopGenerator),
        );
        CampaignAgent::new(planner, tools, max_iterations)
    }

    #[tokio::test]
    async fn stops_at_iteration_cap() {
        let planner = Arc::new(ScriptedPlanner::always_calling_tools());
        let agent = agent(planner.clone(), DEFAULT_MAX_ITERATIONS);

        let response = agent.run("analyze 701Hr000001L82yIAC", Intent::AiDescription).await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Maximum iterations reached"));
        assert_eq!(
            response.response,
            "I've reached the maximum number of processing steps. Please try again."
        );
        assert_eq!(response.iterations, 10);
        assert_eq!(planner.calls().await, 10);
    }

    #[tokio::test]
    async fn iteration_cap_is_configurable() {
        let planner = Arc::new(ScriptedPlanner::always_calling_tools());
        let response = agent(planner.clone(), 3).run("x", Intent::BasicInfo).await;

        assert_eq!(response.iterations, 3);
        assert_eq!(planner.calls().await, 3);
    }

    #[tokio::test]
    async fn answer_on_last_allowed_iteration_succeeds() {
        let mut steps = (0..9)
            .map(|index| {
                Ok(PlannerStep::ToolInvocations(vec![ToolInvocation {
                    id: format!("call_{index}"),
                    name: "get_campaign_data".to_owned(),
                    arguments: r#"{"campaign_id": "bad"}"#.to_owned(),
                }]))
            })
            .collect::<Vec<_>>();
        steps.push(Ok(PlannerStep::FinalAnswer("finally".to_owned())));
        let planner = Arc::new(ScriptedPlanner::with_steps(steps));

        let response = agent(planner, DEFAULT_MAX_ITERATIONS).run("x", Intent::FullAnalysis).await;

        assert!(response.success);
        assert_eq!(response.response, "finally");
        assert_eq!(response.iterations, 10);
    }

    #[tokio::test]
    async fn planner_failure_becomes_failure_result() {
        let planner = Arc::new(ScriptedPlanner::with_steps(vec![Err(LlmError::RateLimited)]));

        let response = agent(planner, DEFAULT_MAX_ITERATIONS).run("x", Intent::AiDescription).await;

        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some("Agent execution failed: llm rate limit exceeded")
        );
        assert_eq!(response.response, "I encountered an error: llm rate limit exceeded");
        assert_eq!(response.iterations, 1);
    }

    #[tokio::test]
    async fn transcript_carries_intent_workflow_and_tool_results() {
        let planner = Arc::new(ScriptedPlanner::with_steps(vec![
            Ok(PlannerStep::ToolInvocations(vec![ToolInvocation {
                id: "call_a".to_owned(),
                name: "lookup_everything".to_owned(),
                arguments: "{}".to_owned(),
            }])),
            Ok(PlannerStep::FinalAnswer("ok".to_owned())),
        ]));

        let response = agent(planner.clone(), DEFAULT_MAX_ITERATIONS)
            .run("raw data for 701Hr000001L82yIAC", Intent::BasicInfo)
            .await;
        assert!(response.success);
        assert_eq!(response.iterations, 2);

        let transcripts = planner.transcripts.lock().await;
        let first = &transcripts[0];
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].role, Role::System);
        let system = first[0].content.as_deref().unwrap_or_default();
        assert!(system.contains("Do not call generate_campaign_description"));
        assert_eq!(first[1].content.as_deref(), Some("raw data for 701Hr000001L82yIAC"));

        let second = &transcripts[1];
        assert_eq!(second.len(), 4);
        assert_eq!(second[2].role, Role::Assistant);
        assert_eq!(second[3].tool_call_id.as_deref(), Some("call_a"));
        let tool_output = second[3]
            .content
            .as_deref()
            .and_then(|content| serde_json::from_str::<serde_json::Value>(content).ok());
        assert_eq!(
            tool_output,
            Some(serde_json::json!({"success": false, "error": "Unknown tool: lookup_everything"}))
        );
    }

    #[tokio::test]
    async fn analyze_campaign_requests_full_analysis() {
        let planner = Arc::new(ScriptedPlanner::with_steps(vec![]));
        let id = clarity_core::CampaignId::parse("701Hr000001L82yIAC").expect("valid id");

        let response = agent(planner.clone(), DEFAULT_MAX_ITERATIONS).analyze_campaign(&id).await;
        assert!(response.success);

        let transcripts = planner.transcripts.lock().await;
        assert_eq!(
            transcripts[0][1].content.as_deref(),
            Some("Analyze campaign 701Hr000001L82yIAC")
        );
        let system = transcripts[0][0].content.as_deref().unwrap_or_default();
        assert!(system.contains("**AI Sales Description**"));
    }
}
