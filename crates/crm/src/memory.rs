use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use clarity_core::{ApplicationError, CampaignId, CampaignRecord};

use crate::{not_found, CampaignSource};

/// Fixed set of campaign records keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryCampaignSource {
    records: HashMap<CampaignId, CampaignRecord>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl InMemoryCampaignSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, id: CampaignId, record: CampaignRecord) -> Self {
        self.records.insert(id, record);
        self
    }

    /// Every fetch fails with an integration error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { failure: Some(message.into()), ..Self::default() }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CampaignSource for InMemoryCampaignSource {
    async fn fetch_campaign(&self, id: &CampaignId) -> Result<CampaignRecord, ApplicationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            return Err(ApplicationError::Integration(message.clone()));
        }

        self.records.get(id).cloned().ok_or_else(|| not_found(id))
    }
}
