//! Message-level rules for the chat front end: intent classification, campaign id
//! extraction and follow-up resolution against a per-conversation memory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use clarity_core::{CampaignId, Intent};
use regex::{NoExpand, Regex};

/// One classification rule. Rules are evaluated in order and the first match wins.
#[derive(Clone, Copy, Debug)]
pub struct IntentRule {
    pub intent: Intent,
    pub keywords: &'static [&'static str],
}

pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        intent: Intent::FullAnalysis,
        keywords: &[
            "full analysis",
            "complete analysis",
            "full contextual",
            "everything",
            "all information",
            "full details",
            "comprehensive",
            "detailed analysis",
        ],
    },
    IntentRule {
        intent: Intent::BasicInfo,
        keywords: &[
            "salesforce information",
            "salesforce data",
            "sfdc info",
            "sfdc metadata",
            "sfdc data",
            "campaign type",
            "channel",
            "enriched context",
            "basic info",
            "metadata",
            "campaign details",
            "raw data",
            "campaign data",
        ],
    },
    IntentRule {
        intent: Intent::AiDescription,
        keywords: &[
            "what can you tell me",
            "describe",
            "description",
            "summary",
            "quick summary",
            "enhance",
            "what is",
            "tell me about",
            "explain",
        ],
    },
];

const IDENTITY_PHRASES: &[&str] = &[
    "what are you",
    "who are you",
    "what do you do",
    "what is this bot",
    "what is campaign clarity",
    "tell me about yourself",
    "what can you help with",
    "what are your capabilities",
];

const HELP_PHRASES: &[&str] = &["help", "how to use", "how do i", "commands", "what can you do"];

pub fn classify_intent(text: &str) -> Intent {
    let lowered = text.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|rule| rule.intent)
        .unwrap_or_default()
}

pub fn is_identity_question(text: &str) -> bool {
    let lowered = text.to_lowercase();
    IDENTITY_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

pub fn is_help_request(text: &str) -> bool {
    let lowered = text.to_lowercase();
    HELP_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

/// Finds Salesforce campaign ids in free text.
#[derive(Clone, Debug)]
pub struct CampaignIdExtractor {
    patterns: Vec<Regex>,
}

impl CampaignIdExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: vec![
                Regex::new(r"\b(701[a-zA-Z0-9]{12,15})\b")?,
                Regex::new(r"\b([a-zA-Z0-9]{15})\b")?,
                Regex::new(r"\b([a-zA-Z0-9]{18})\b")?,
            ],
        })
    }

    /// First match, in pattern order, that is a well-formed 15 or 18 character id.
    pub fn extract(&self, text: &str) -> Option<CampaignId> {
        self.patterns.iter().find_map(|pattern| {
            pattern
                .captures_iter(text)
                .filter_map(|captures| captures.get(1))
                .find_map(|candidate| CampaignId::parse(candidate.as_str()).ok())
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Replacement {
    CampaignPhrase,
    BareId,
}

/// Detects anaphoric references ("that campaign", "it") and rewrites them to a literal id.
/// Phrases match whole words, case-insensitively. Longer phrases are rewritten first so a
/// phrase is never rewritten twice.
#[derive(Clone, Debug)]
pub struct FollowUpResolver {
    detector: Regex,
    rewrites: Vec<(Regex, Replacement)>,
}

impl FollowUpResolver {
    pub fn new() -> Result<Self, regex::Error> {
        let detector = Regex::new(
            r"(?i)\b(?:that campaign|this campaign|the campaign|same campaign|the same one|that one|this one|it|that|this)\b",
        )?;

        let rewrites = vec![
            (Regex::new(r"(?i)\bthe same one\b")?, Replacement::CampaignPhrase),
            (
                Regex::new(r"(?i)\b(?:that|this|the|same) campaign\b")?,
                Replacement::CampaignPhrase,
            ),
            (Regex::new(r"(?i)\b(?:that|this) one\b")?, Replacement::CampaignPhrase),
            (Regex::new(r"(?i)\bit\b")?, Replacement::CampaignPhrase),
            (Regex::new(r"(?i)\b(?:that|this)\b")?, Replacement::BareId),
        ];

        Ok(Self { detector, rewrites })
    }

    pub fn is_follow_up(&self, text: &str) -> bool {
        self.detector.is_match(text)
    }

    pub fn rewrite(&self, text: &str, campaign_id: &CampaignId) -> String {
        let campaign_phrase = format!("campaign {campaign_id}");
        let mut rewritten = text.to_owned();
        for (pattern, replacement) in &self.rewrites {
            let substitute = match replacement {
                Replacement::CampaignPhrase => campaign_phrase.as_str(),
                Replacement::BareId => campaign_id.as_str(),
            };
            rewritten = pattern.replace_all(&rewritten, NoExpand(substitute)).into_owned();
        }
        rewritten
    }
}

/// Last campaign discussed in each conversation.
pub trait ConversationStore: Send + Sync {
    fn last_campaign(&self, group_id: &str) -> Option<CampaignId>;
    fn remember(&self, group_id: &str, campaign_id: &CampaignId);
}

#[derive(Clone, Debug)]
struct StoredCampaign {
    campaign_id: CampaignId,
    updated_at: DateTime<Utc>,
}

/// Process-local store. Entries older than the TTL, when one is set, are treated as absent;
/// every write sweeps the expired ones.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    entries: Mutex<HashMap<String, StoredCampaign>>,
    ttl: Option<Duration>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { entries: Mutex::default(), ttl: Some(ttl) }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, StoredCampaign>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn last_campaign_at(&self, group_id: &str, now: DateTime<Utc>) -> Option<CampaignId> {
        let mut entries = self.entries();
        let entry = entries.get(group_id)?.clone();
        if let Some(ttl) = self.ttl {
            if now - entry.updated_at > ttl {
                entries.remove(group_id);
                return None;
            }
        }
        Some(entry.campaign_id)
    }

    fn remember_at(&self, group_id: &str, campaign_id: &CampaignId, now: DateTime<Utc>) {
        let mut entries = self.entries();
        if let Some(ttl) = self.ttl {
            entries.retain(|_, entry| now - entry.updated_at <= ttl);
        }
        entries.insert(
            group_id.to_owned(),
            StoredCampaign { campaign_id: campaign_id.clone(), updated_at: now },
        );
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn last_campaign(&self, group_id: &str) -> Option<CampaignId> {
        self.last_campaign_at(group_id, Utc::now())
    }

    fn remember(&self, group_id: &str, campaign_id: &CampaignId) {
        self.remember_at(group_id, campaign_id, Utc::now());
    }
}

/// What the agent should be asked for one chat message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub campaign_id: CampaignId,
    pub intent: Intent,
    pub message: String,
    pub follow_up: bool,
}

pub struct ConversationResolver {
    extractor: CampaignIdExtractor,
    follow_ups: FollowUpResolver,
    store: Arc<dyn ConversationStore>,
}

impl ConversationResolver {
    pub fn new(store: Arc<dyn ConversationStore>) -> Result<Self, regex::Error> {
        Ok(Self {
            extractor: CampaignIdExtractor::new()?,
            follow_ups: FollowUpResolver::new()?,
            store,
        })
    }

    /// Resolves the campaign a message is about and records it for the conversation.
    /// Returns `None` when the message names no campaign and cannot be read as a follow-up.
    pub fn resolve(&self, group_id: &str, text: &str) -> Option<ResolvedRequest> {
        let (campaign_id, follow_up) = match self.extractor.extract(text) {
            Some(id) => (id, false),
            None if self.follow_ups.is_follow_up(text) => {
                (self.store.last_campaign(group_id)?, true)
            }
            None => return None,
        };

        self.store.remember(group_id, &campaign_id);

        let intent = classify_intent(text);
        let message = if follow_up {
            self.follow_ups.rewrite(text, &campaign_id)
        } else {
            text.to_owned()
        };

        Some(ResolvedRequest { campaign_id, intent, message, follow_up })
    }
}
