use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use clarity_core::domain::campaign::{FIELD_CHANNEL, FIELD_SUB_CHANNEL, FIELD_TYPE};
use clarity_core::CampaignRecord;
use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::info;

use crate::llm::{LlmClient, LlmError};

const DESCRIPTION_TEMPLATE: &str = "campaign_description.txt";

const DESCRIPTION_SYSTEM_PROMPT: &str = "You write concise, factual briefings that help B2B \
sales reps understand why a lead entered a marketing campaign and how to follow up.";

/// Prompt strategy, picked from the campaign's channel, sub channel and type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    EmailNurture,
    Event,
    Webinar,
    PartnerReferral,
    ContentSyndication,
    PaidDigital,
    WebInbound,
    General,
}

impl PromptType {
    pub fn select(record: &CampaignRecord) -> Self {
        let signals = [FIELD_CHANNEL, FIELD_SUB_CHANNEL, FIELD_TYPE]
            .into_iter()
            .filter_map(|field| record.non_empty(field))
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>()
            .join(" ");
        let has = |needles: &[&str]| needles.iter().any(|needle| signals.contains(needle));

        if has(&["partner", "referral"]) {
            Self::PartnerReferral
        } else if has(&["webinar"]) {
            Self::Webinar
        } else if has(&["event", "tradeshow", "trade show", "conference"]) {
            Self::Event
        } else if has(&["syndication"]) {
            Self::ContentSyndication
        } else if has(&["paid", "display", "search", "social", "advertisement"]) {
            Self::PaidDigital
        } else if has(&["web", "contact us", "inbound", "free trial"]) {
            Self::WebInbound
        } else if has(&["email", "emsf", "nurture", "nurt", "newsletter"]) {
            Self::EmailNurture
        } else {
            Self::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailNurture => "email_nurture",
            Self::Event => "event",
            Self::Webinar => "webinar",
            Self::PartnerReferral => "partner_referral",
            Self::ContentSyndication => "content_syndication",
            Self::PaidDigital => "paid_digital",
            Self::WebInbound => "web_inbound",
            Self::General => "general",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::EmailNurture => "email nurture",
            Self::Event => "event",
            Self::Webinar => "webinar",
            Self::PartnerReferral => "partner referral",
            Self::ContentSyndication => "content syndication",
            Self::PaidDigital => "paid digital",
            Self::WebInbound => "web inbound",
            Self::General => "general",
        }
    }

    fn guidance(&self) -> &'static str {
        match self {
            Self::EmailNurture => {
                "Interest built slowly through email. Treat the lead as early stage: reference \
                 the topic they engaged with and offer something useful before asking for a meeting."
            }
            Self::Event => {
                "The prospect met the company in person. Mention the event by name, follow up \
                 quickly while the conversation is fresh and propose a concrete next meeting."
            }
            Self::Webinar => {
                "The prospect gave time to a specific topic. Tie the outreach to the webinar \
                 subject and distinguish attendees from registrants who did not show."
            }
            Self::PartnerReferral => {
                "A partner vouched for this prospect. Acknowledge the partner, coordinate with \
                 them before reaching out and expect a shorter evaluation."
            }
            Self::ContentSyndication => {
                "The lead downloaded content on a third-party site and may not know the brand. \
                 Qualify gently and lead with the content theme rather than the product."
            }
            Self::PaidDigital => {
                "The prospect clicked an ad. Intent is real but shallow; confirm the need and \
                 the product they were looking at before pitching."
            }
            Self::WebInbound => {
                "The prospect came to the website on their own. Treat it as a hand raise and \
                 respond fast with a direct offer of help."
            }
            Self::General => {
                "Summarize what the campaign was about and suggest a sensible first touch \
                 based on the fields available."
            }
        }
    }
}

impl fmt::Display for PromptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedDescription {
    pub text: String,
    pub prompt_type: PromptType,
}

#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("prompt rendering failed: {0}")]
    Template(String),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("the model returned an empty description")]
    Empty,
}

#[async_trait]
pub trait DescriptionGenerator: Send + Sync {
    async fn generate(
        &self,
        record: &CampaignRecord,
        enriched_context: &str,
    ) -> Result<GeneratedDescription, DescriptionError>;
}

#[derive(Serialize)]
struct PromptField<'a> {
    name: &'a str,
    value: &'a str,
}

pub struct LlmDescriptionGenerator {
    llm: Arc<dyn LlmClient>,
    templates: Tera,
}

impl LlmDescriptionGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Result<Self, DescriptionError> {
        let mut templates = Tera::default();
        templates
            .add_raw_template(
                DESCRIPTION_TEMPLATE,
                include_str!("../templates/campaign_description.txt"),
            )
            .map_err(|error| DescriptionError::Template(error.to_string()))?;
        Ok(Self { llm, templates })
    }

    pub fn render_prompt(
        &self,
        record: &CampaignRecord,
        enriched_context: &str,
        prompt_type: PromptType,
    ) -> Result<String, DescriptionError> {
        let fields = record
            .fields()
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(name, value)| PromptField { name, value })
            .collect::<Vec<_>>();

        let mut context = Context::new();
        context.insert("campaign_name", record.name());
        context.insert("channel", record.channel());
        context.insert("sub_channel", record.non_empty(FIELD_SUB_CHANNEL).unwrap_or_default());
        context.insert("campaign_type", record.non_empty(FIELD_TYPE).unwrap_or_default());
        context.insert("enriched_context", enriched_context);
        context.insert("fields", &fields);
        context.insert("prompt_label", prompt_type.label());
        context.insert("guidance", prompt_type.guidance());

        self.templates
            .render(DESCRIPTION_TEMPLATE, &context)
            .map_err(|error| DescriptionError::Template(error.to_string()))
    }
}

#[async_trait]
impl DescriptionGenerator for LlmDescriptionGenerator {
    async fn generate(
        &self,
        record: &CampaignRecord,
        enriched_context: &str,
    ) -> Result<GeneratedDescription, DescriptionError> {
        let prompt_type = PromptType::select(record);
        let prompt = self.render_prompt(record, enriched_context, prompt_type)?;
        let text = self.llm.complete(DESCRIPTION_SYSTEM_PROMPT, &prompt).await?;
        let text = text.trim().to_owned();
        if text.is_empty() {
            return Err(DescriptionError::Empty);
        }

        info!(
            event_name = "agent.description.generated",
            campaign_name = record.name(),
            prompt_type = prompt_type.as_str(),
            description_length = text.chars().count(),
            "campaign description generated"
        );
        Ok(GeneratedDescription { text, prompt_type })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use clarity_core::CampaignRecord;

    use super::{DescriptionError, DescriptionGenerator, LlmDescriptionGenerator, PromptType};
    use crate::llm::{LlmClient, LlmError};

    struct CannedLlm {
        reply: Result<String, LlmError>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedLlm {
        fn new(reply: Result<String, LlmError>) -> Self {
            Self { reply, prompts: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _system: &str, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().expect("prompt log").push(prompt.to_owned());
            self.reply.clone()
        }
    }

    fn record(pairs: &[(&str, &str)]) -> CampaignRecord {
        CampaignRecord::new(
            pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn selects_prompt_type_from_channel_signals() {
        let cases = [
            (record(&[("Channel__c", "Partner Referral")]), PromptType::PartnerReferral),
            (record(&[("Channel__c", "Webinar")]), PromptType::Webinar),
            (record(&[("Channel__c", "Tradeshow")]), PromptType::Event),
            (record(&[("Channel__c", "Content Syndication")]), PromptType::ContentSyndication),
            (record(&[("Channel__c", "Paid Social")]), PromptType::PaidDigital),
            (
                record(&[("Channel__c", "Website"), ("Sub_Channel__c", "Contact Us")]),
                PromptType::WebInbound,
            ),
            (record(&[("Channel__c", "EMSF"), ("Sub_Channel__c", "NURT")]), PromptType::EmailNurture),
            (record(&[("Channel__c", "Direct Mail")]), PromptType::General),
            (record(&[]), PromptType::General),
        ];

        for (index, (campaign, expected)) in cases.iter().enumerate() {
            assert_eq!(PromptType::select(campaign), *expected, "case {index}");
        }
    }

    #[test]
    fn prompt_includes_context_fields_and_guidance() {
        let generator = LlmDescriptionGenerator::new(Arc::new(CannedLlm::new(Ok(String::new()))))
            .expect("template");
        let campaign = record(&[
            ("Name", "Q3 Partner Push"),
            ("Channel__c", "Partner"),
            ("Vendor__c", ""),
            ("Type", "Partners"),
        ]);

        let prompt = generator
            .render_prompt(
                &campaign,
                "Channel: Partner (Lead was sourced by a channel partner)",
                PromptType::PartnerReferral,
            )
            .expect("prompt renders");

        assert!(prompt.contains("Campaign: Q3 Partner Push"));
        assert!(prompt.contains("Channel: Partner\nType: Partners"));
        assert!(prompt.contains("- Channel__c: Partner"));
        assert!(!prompt.contains("Vendor__c"));
        assert!(prompt.contains("Focus for this partner referral campaign:"));
        assert!(prompt.contains("Lead was sourced by a channel partner"));
    }

    #[tokio::test]
    async fn generate_returns_trimmed_text_and_prompt_type() {
        let llm = Arc::new(CannedLlm::new(Ok("  • Engagement: attended live\n".to_owned())));
        let generator = LlmDescriptionGenerator::new(llm.clone()).expect("template");

        let description = generator
            .generate(&record(&[("Name", "Live Demo"), ("Channel__c", "Webinar")]), "ctx")
            .await
            .expect("description");

        assert_eq!(description.text, "• Engagement: attended live");
        assert_eq!(description.prompt_type, PromptType::Webinar);
        assert_eq!(llm.prompts.lock().expect("prompt log").len(), 1);
    }

    #[tokio::test]
    async fn empty_and_failed_completions_are_errors() {
        let empty = LlmDescriptionGenerator::new(Arc::new(CannedLlm::new(Ok("   ".to_owned()))))
            .expect("template");
        assert!(matches!(empty.generate(&record(&[]), "").await, Err(DescriptionError::Empty)));

        let failing = LlmDescriptionGenerator::new(Arc::new(CannedLlm::new(Err(LlmError::Timeout))))
            .expect("template");
        assert!(matches!(
            failing.generate(&record(&[]), "").await,
            Err(DescriptionError::Llm(LlmError::Timeout))
        ));
    }
}
