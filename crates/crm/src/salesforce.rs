use std::time::Duration;

use async_trait::async_trait;
use clarity_core::config::SalesforceConfig;
use clarity_core::{ApplicationError, CampaignId, CampaignRecord};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{info, warn};

use crate::{not_found, CampaignSource};

/// Campaign fields selected for analysis.
pub const CAMPAIGN_FIELDS: &[&str] = &[
    "Id",
    "Name",
    "Type",
    "Status",
    "IsActive",
    "StartDate",
    "EndDate",
    "Channel__c",
    "Sub_Channel__c",
    "Intended_Product__c",
    "Intended_Country__c",
    "TCP_Program__c",
    "TCP_Theme__c",
    "Vendor__c",
    "BMID__c",
    "Description",
];

pub struct SalesforceCampaignSource {
    client: Client,
    instance_url: String,
    api_version: String,
    access_token: SecretString,
}

impl SalesforceCampaignSource {
    pub fn from_config(config: &SalesforceConfig) -> Result<Self, ApplicationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| {
                ApplicationError::Configuration(format!("salesforce http client: {error}"))
            })?;

        Ok(Self {
            client,
            instance_url: config.instance_url.trim_end_matches('/').to_owned(),
            api_version: config.api_version.clone(),
            access_token: config.access_token.clone(),
        })
    }

    pub fn query_endpoint(&self) -> String {
        format!("{}/services/data/{}/query", self.instance_url, self.api_version)
    }
}

/// SOQL for a single campaign. The id is already validated as alphanumeric, so it can be
/// embedded in the literal without escaping.
pub fn campaign_query(id: &CampaignId) -> String {
    format!("SELECT {} FROM Campaign WHERE Id = '{}' LIMIT 1", CAMPAIGN_FIELDS.join(", "), id)
}

/// Turns a `/query` response body into a record, or `NotFound` when it holds no rows.
pub fn record_from_query_response(
    id: &CampaignId,
    body: &Value,
) -> Result<CampaignRecord, ApplicationError> {
    let records = body.get("records").and_then(Value::as_array).ok_or_else(|| {
        ApplicationError::Integration("salesforce query response has no `records` array".to_owned())
    })?;

    match records.first() {
        Some(Value::Object(row)) => Ok(CampaignRecord::from_crm_row(row)),
        Some(_) => Err(ApplicationError::Integration(
            "salesforce query returned a non-object record".to_owned(),
        )),
        None => Err(not_found(id)),
    }
}

/// Salesforce reports API errors as `[{"message": "...", "errorCode": "..."}]`.
fn api_error_message(body: &Value) -> Option<String> {
    let first = body.as_array()?.first()?;
    let message = first.get("message").and_then(Value::as_str)?;
    match first.get("errorCode").and_then(Value::as_str) {
        Some(code) => Some(format!("{code}: {message}")),
        None => Some(message.to_owned()),
    }
}

#[async_trait]
impl CampaignSource for SalesforceCampaignSource {
    async fn fetch_campaign(&self, id: &CampaignId) -> Result<CampaignRecord, ApplicationError> {
        let response = self
            .client
            .get(self.query_endpoint())
            .bearer_auth(self.access_token.expose_secret())
            .query(&[("q", campaign_query(id))])
            .send()
            .await
            .map_err(|error| {
                warn!(
                    event_name = "crm.campaign.request_failed",
                    campaign_id = %id,
                    error = %error,
                    "salesforce request failed"
                );
                ApplicationError::Integration(format!("salesforce request failed: {error}"))
            })?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|error| {
            ApplicationError::Integration(format!("failed to decode salesforce response: {error}"))
        })?;

        if !status.is_success() {
            let detail = api_error_message(&body).unwrap_or_else(|| status.to_string());
            warn!(
                event_name = "crm.campaign.rejected",
                campaign_id = %id,
                status = status.as_u16(),
                detail = %detail,
                "salesforce rejected campaign query"
            );
            return Err(ApplicationError::Integration(format!(
                "salesforce returned {status}: {detail}"
            )));
        }

        let record = record_from_query_response(id, &body)?;
        info!(
            event_name = "crm.campaign.fetched",
            campaign_id = %id,
            field_count = record.fields().len(),
            "campaign fetched from salesforce"
        );
        Ok(record)
    }
}
