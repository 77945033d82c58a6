//! Campaign record sources.
//!
//! The agent only sees [`CampaignSource`]; the Salesforce REST adapter and the in-memory
//! source used by tests and the CLI both sit behind it.

pub mod memory;
pub mod salesforce;

use async_trait::async_trait;
use clarity_core::{ApplicationError, CampaignId, CampaignRecord};

pub use memory::InMemoryCampaignSource;
pub use salesforce::{SalesforceCampaignSource, CAMPAIGN_FIELDS};

#[async_trait]
pub trait CampaignSource: Send + Sync {
    /// Fetches one campaign. A missing record is `ApplicationError::NotFound` carrying the
    /// user-facing message; transport and API failures are `ApplicationError::Integration`.
    async fn fetch_campaign(&self, id: &CampaignId) -> Result<CampaignRecord, ApplicationError>;
}

pub(crate) fn not_found(id: &CampaignId) -> ApplicationError {
    ApplicationError::NotFound(format!("No campaign found with ID: {id}"))
}
