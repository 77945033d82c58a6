pub mod config;
pub mod domain;
pub mod enrichment;
pub mod errors;

pub use domain::campaign::{CampaignId, CampaignIdError, CampaignRecord, CampaignRecordError};
pub use domain::intent::Intent;
pub use enrichment::{EnrichmentError, FieldEnricher, FieldMapping, FieldMappings};
pub use errors::{ApplicationError, DomainError, InterfaceError};
