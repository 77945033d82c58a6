//! Field enrichment: translates raw campaign field codes into sales-readable context.
//!
//! The lookup table is static. A deployment can replace it with a JSON file of the form
//! `[{"field": "Channel__c", "label": "Channel", "values": {"EMSF": "..."}}]`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::campaign::CampaignRecord;

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("could not read field mappings `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse field mappings `{path}`: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
    #[error("field mappings `{0}` contain no entries")]
    Empty(PathBuf),
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct FieldMapping {
    pub field: String,
    pub label: String,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl FieldMapping {
    fn meaning(&self, raw_value: &str) -> Option<&str> {
        let wanted = raw_value.trim();
        self.values
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(wanted))
            .map(|(_, meaning)| meaning.as_str())
    }
}

#[derive(Clone, Copy, Debug)]
struct MappingTemplate {
    field: &'static str,
    label: &'static str,
    values: &'static [(&'static str, &'static str)],
}

const BUILTIN_FIELD_MAPPINGS: &[MappingTemplate] = &[
    MappingTemplate {
        field: "Channel__c",
        label: "Channel",
        values: &[
            ("Email", "Prospect engaged with a marketing email"),
            ("EMSF", "Prospect engaged with a marketing email sent from Salesforce"),
            ("Events", "Prospect registered for or attended an in-person event"),
            ("Tradeshow", "Prospect visited a booth or was scanned at a trade show"),
            ("Webinar", "Prospect registered for or attended a webinar"),
            ("Partner", "Lead was sourced by a channel partner"),
            ("Partner Referral", "A partner referred this prospect directly to sales"),
            (
                "Content Syndication",
                "Prospect downloaded gated content hosted by a third-party publisher",
            ),
            ("Paid Search", "Prospect clicked a paid search ad"),
            ("Paid Social", "Prospect responded to a paid social media ad"),
            ("Display", "Prospect responded to a display advertising campaign"),
            ("Web", "Prospect converted on a company web property"),
            ("Website", "Prospect converted on a company web property"),
            ("Direct Mail", "Prospect responded to a physical mailer"),
            ("Outbound", "Sales or SDR outreach initiated the conversation"),
        ],
    },
    MappingTemplate {
        field: "Sub_Channel__c",
        label: "Sub Channel",
        values: &[
            ("Nurture", "Part of an automated nurture stream; interest is building over time"),
            ("NURT", "Part of an automated nurture stream; interest is building over time"),
            ("Newsletter", "Subscribed newsletter audience; low explicit buying signal"),
            ("Promotional", "Responded to a promotional offer"),
            ("Registration", "Registered but attendance is not confirmed"),
            ("Attended", "Attended live; expect higher engagement"),
            ("No Show", "Registered but did not attend"),
            ("Referral", "Warm introduction from a trusted party"),
            ("Download", "Downloaded an asset such as an ebook or report"),
            ("Contact Us", "Submitted a contact-us form; explicit hand raise"),
            ("Free Trial", "Started a product trial; evaluate usage before outreach"),
        ],
    },
    MappingTemplate {
        field: "Type",
        label: "Campaign Type",
        values: &[
            ("Email", "Email campaign"),
            ("Webinar", "Webinar campaign"),
            ("Conference", "Conference or field event"),
            ("Trade Show", "Trade show presence"),
            ("Advertisement", "Advertising campaign"),
            ("Partners", "Partner program campaign"),
            ("Referral Program", "Referral program campaign"),
            ("Direct Mail", "Direct mail campaign"),
            ("Content Syndication", "Syndicated content campaign"),
            ("Other", "General marketing campaign"),
        ],
    },
    MappingTemplate {
        field: "Intended_Product__c",
        label: "Intended Product",
        values: &[
            ("RingEX", "Unified communications: cloud phone, messaging and video"),
            ("RingCX", "AI-powered contact center"),
            ("Contact Center", "Enterprise contact center"),
            ("Video", "Video meetings"),
            ("Events", "Virtual and hybrid events platform"),
            ("Engage", "Digital customer engagement"),
        ],
    },
    MappingTemplate {
        field: "Intended_Country__c",
        label: "Intended Country",
        values: &[
            ("US", "United States"),
            ("CA", "Canada"),
            ("UK", "United Kingdom"),
            ("GB", "United Kingdom"),
            ("AU", "Australia"),
            ("DE", "Germany"),
            ("FR", "France"),
        ],
    },
    MappingTemplate { field: "TCP_Program__c", label: "TCP Program", values: &[] },
    MappingTemplate { field: "TCP_Theme__c", label: "TCP Theme", values: &[] },
    MappingTemplate { field: "Vendor__c", label: "Vendor", values: &[] },
    MappingTemplate { field: "BMID__c", label: "Buyer Motion ID", values: &[] },
    MappingTemplate { field: "Status", label: "Status", values: &[] },
    MappingTemplate { field: "Description", label: "Campaign Description", values: &[] },
];

/// Ordered field lookup table used by [`FieldEnricher`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMappings {
    entries: Vec<FieldMapping>,
}

impl Default for FieldMappings {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FieldMappings {
    pub fn builtin() -> Self {
        let entries = BUILTIN_FIELD_MAPPINGS
            .iter()
            .map(|template| FieldMapping {
                field: template.field.to_owned(),
                label: template.label.to_owned(),
                values: template
                    .values
                    .iter()
                    .map(|(code, meaning)| ((*code).to_owned(), (*meaning).to_owned()))
                    .collect(),
            })
            .collect();
        Self { entries }
    }

    pub fn from_entries(entries: Vec<FieldMapping>) -> Self {
        Self { entries }
    }

    pub fn load(path: &Path) -> Result<Self, EnrichmentError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| EnrichmentError::ReadFile { path: path.to_path_buf(), source })?;
        let entries = serde_json::from_str::<Vec<FieldMapping>>(&raw)
            .map_err(|source| EnrichmentError::ParseFile { path: path.to_path_buf(), source })?;
        if entries.is_empty() {
            return Err(EnrichmentError::Empty(path.to_path_buf()));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[FieldMapping] {
        &self.entries
    }
}

#[derive(Clone, Debug, Default)]
pub struct FieldEnricher {
    mappings: FieldMappings,
}

impl FieldEnricher {
    pub fn new(mappings: FieldMappings) -> Self {
        Self { mappings }
    }

    pub fn enrich(&self, record: &CampaignRecord) -> String {
        let mut lines = vec![format!("Campaign: {}", record.name())];

        for mapping in self.mappings.entries() {
            let Some(value) = record.non_empty(&mapping.field) else {
                continue;
            };
            match mapping.meaning(value) {
                Some(meaning) => lines.push(format!("{}: {value} ({meaning})", mapping.label)),
                None => lines.push(format!("{}: {value}", mapping.label)),
            }
        }

        if lines.len() == 1 {
            lines.push("No mapped campaign fields were populated.".to_owned());
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use tempfile::TempDir;

    use super::{EnrichmentError, FieldEnricher, FieldMappings};
    use crate::domain::campaign::CampaignRecord;

    fn record(pairs: &[(&str, &str)]) -> CampaignRecord {
        CampaignRecord::new(
            pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn decodes_known_codes_case_insensitively() {
        let enricher = FieldEnricher::default();
        let context = enricher.enrich(&record(&[
            ("Name", "SMB_RingEX_Nurture"),
            ("Channel__c", "emsf"),
            ("Sub_Channel__c", "NURT"),
            ("Vendor__c", ""),
            ("TCP_Theme__c", "Hybrid Work"),
        ]));

        assert!(context.starts_with("Campaign: SMB_RingEX_Nurture"));
        assert!(context.contains("Channel: emsf (Prospect engaged with a marketing email sent"));
        assert!(context.contains("Sub Channel: NURT (Part of an automated nurture stream"));
        assert!(context.contains("TCP Theme: Hybrid Work"));
        assert!(!context.contains("Vendor"));
    }

    #[test]
    fn enrichment_is_deterministic() {
        let enricher = FieldEnricher::default();
        let campaign = record(&[("Name", "A"), ("Type", "Webinar"), ("Status", "Active")]);
        assert_eq!(enricher.enrich(&campaign), enricher.enrich(&campaign));
    }

    #[test]
    fn empty_record_still_produces_context() {
        let context = FieldEnricher::default().enrich(&CampaignRecord::default());
        assert_eq!(context, "Campaign: Unknown\nNo mapped campaign fields were populated.");
    }

    #[test]
    fn loads_mapping_file() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        let path = dir.path().join("field_mappings.json");
        fs::write(
            &path,
            r#"[{"field": "Channel__c", "label": "Source", "values": {"X1": "Custom source"}}]"#,
        )
        .map_err(|err| err.to_string())?;

        let mappings = FieldMappings::load(&path).map_err(|err| err.to_string())?;
        let context = FieldEnricher::new(mappings)
            .enrich(&record(&[("Name", "N"), ("Channel__c", "X1"), ("Type", "Email")]));

        assert_eq!(context, "Campaign: N\nSource: X1 (Custom source)");
        Ok(())
    }

    #[test]
    fn empty_mapping_file_is_rejected() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        let path = dir.path().join("empty.json");
        fs::write(&path, "[]").map_err(|err| err.to_string())?;

        assert!(matches!(FieldMappings::load(&path), Err(EnrichmentError::Empty(_))));
        Ok(())
    }
}
