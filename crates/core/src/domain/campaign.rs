use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const FIELD_ID: &str = "Id";
pub const FIELD_NAME: &str = "Name";
pub const FIELD_CHANNEL: &str = "Channel__c";
pub const FIELD_SUB_CHANNEL: &str = "Sub_Channel__c";
pub const FIELD_TYPE: &str = "Type";
pub const FIELD_DESCRIPTION: &str = "Description";

/// Key under which a fetch result carries its record.
pub const RECORD_WRAPPER_KEY: &str = "data";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CampaignIdError {
    #[error("Invalid campaign ID length: {0}. Must be 15 or 18 characters.")]
    InvalidLength(usize),
    #[error("Campaign ID must contain only alphanumeric characters")]
    NonAlphanumeric,
}

/// Salesforce campaign identifier: 15 or 18 ASCII alphanumerics, case-sensitive.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CampaignId(String);

impl CampaignId {
    pub fn parse(raw: &str) -> Result<Self, CampaignIdError> {
        let candidate = raw.trim();
        let length = candidate.chars().count();
        if length != 15 && length != 18 {
            return Err(CampaignIdError::InvalidLength(length));
        }
        if !candidate.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(CampaignIdError::NonAlphanumeric);
        }
        Ok(Self(candidate.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CampaignId {
    type Err = CampaignIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl<'de> Deserialize<'de> for CampaignId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CampaignRecordError {
    #[error("campaign_data must be a JSON object of field values")]
    NotAnObject,
    #[error(
        "campaign_data field `{0}` is nested; pass a flat record or the get_campaign_data result"
    )]
    NestedField(String),
}

/// Flat field map for one campaign. Every value is text; missing or null values are empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CampaignRecord {
    fields: BTreeMap<String, String>,
}

impl CampaignRecord {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    /// Builds a record from a CRM row. Nested values (lookups, the `attributes` envelope)
    /// are dropped.
    pub fn from_crm_row(row: &Map<String, Value>) -> Self {
        let fields = row
            .iter()
            .filter_map(|(key, value)| scalar_text(value).map(|text| (key.clone(), text)))
            .collect();
        Self { fields }
    }

    /// Builds a record from tool arguments. A fetch result wrapping the record under
    /// `data` is unwrapped; other nested values are rejected.
    pub fn from_json(value: &Value) -> Result<Self, CampaignRecordError> {
        let Value::Object(map) = value else {
            return Err(CampaignRecordError::NotAnObject);
        };
        if let Some(inner @ Value::Object(_)) = map.get(RECORD_WRAPPER_KEY) {
            return Self::from_json(inner);
        }

        let mut fields = BTreeMap::new();
        for (key, value) in map {
            let text =
                scalar_text(value).ok_or_else(|| CampaignRecordError::NestedField(key.clone()))?;
            fields.insert(key.clone(), text);
        }
        Ok(Self { fields })
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Value of `field`, or `None` when missing or blank.
    pub fn non_empty(&self, field: &str) -> Option<&str> {
        self.get(field).map(str::trim).filter(|value| !value.is_empty())
    }

    pub fn name(&self) -> &str {
        self.non_empty(FIELD_NAME).unwrap_or("Unknown")
    }

    pub fn channel(&self) -> &str {
        self.non_empty(FIELD_CHANNEL).unwrap_or("Unknown")
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields.iter().map(|(key, value)| (key.clone(), Value::String(value.clone()))).collect(),
        )
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CampaignId, CampaignIdError, CampaignRecord, CampaignRecordError};

    #[test]
    fn accepts_fifteen_and_eighteen_character_ids() {
        assert!(CampaignId::parse("701Hr000001L82y").is_ok());
        assert_eq!(
            CampaignId::parse(" 701Hr000001L82yIAC ").map(|id| id.to_string()),
            Ok("701Hr000001L82yIAC".to_owned())
        );
    }

    #[test]
    fn rejects_wrong_length_and_punctuation() {
        assert_eq!(CampaignId::parse("701Hr0001"), Err(CampaignIdError::InvalidLength(9)));
        assert_eq!(CampaignId::parse("701Hr000001L82yIA"), Err(CampaignIdError::InvalidLength(17)));
        assert_eq!(CampaignId::parse("701Hr000001L82-IAC"), Err(CampaignIdError::NonAlphanumeric));
        assert_eq!(CampaignId::parse("701Hr000001Lé2y"), Err(CampaignIdError::NonAlphanumeric));
    }

    #[test]
    fn id_is_case_sensitive() {
        let upper = CampaignId::parse("701HR000001L82YIAC").expect("valid");
        let mixed = CampaignId::parse("701Hr000001L82yIAC").expect("valid");
        assert_ne!(upper, mixed);
    }

    #[test]
    fn crm_row_normalizes_nulls_and_drops_nested_values() {
        let row = json!({
            "attributes": {"type": "Campaign"},
            "Id": "701Hr000001L82yIAC",
            "Name": "SMB_RingEX_Nurture",
            "Vendor__c": null,
            "NumberOfLeads": 42,
            "IsActive": true
        });
        let record = CampaignRecord::from_crm_row(row.as_object().expect("object"));

        assert_eq!(record.get("attributes"), None);
        assert_eq!(record.get("Vendor__c"), Some(""));
        assert_eq!(record.get("NumberOfLeads"), Some("42"));
        assert_eq!(record.get("IsActive"), Some("true"));
        assert_eq!(record.name(), "SMB_RingEX_Nurture");
        assert_eq!(record.channel(), "Unknown");
    }

    #[test]
    fn tool_payload_unwraps_fetch_result() {
        let wrapped = json!({
            "success": true,
            "campaign_id": "701Hr000001L82yIAC",
            "campaign_name": "X",
            "data": {"Name": "X", "Channel__c": "Email"}
        });
        let record = CampaignRecord::from_json(&wrapped).expect("wrapped record");

        assert_eq!(record.name(), "X");
        assert_eq!(record.get("Channel__c"), Some("Email"));
        assert_eq!(record.get("success"), None);
    }

    #[test]
    fn tool_payload_rejects_other_nested_values() {
        let nested = json!({"Name": "X", "Owner": {"Name": "Pat"}});
        assert_eq!(
            CampaignRecord::from_json(&nested),
            Err(CampaignRecordError::NestedField("Owner".to_owned()))
        );
        let scalar_data = json!({"Name": "X", "data": "plain"});
        let record = CampaignRecord::from_json(&scalar_data).expect("scalar data field");
        assert_eq!(record.get("data"), Some("plain"));
        assert_eq!(CampaignRecord::from_json(&json!("x")), Err(CampaignRecordError::NotAnObject));
    }
}
