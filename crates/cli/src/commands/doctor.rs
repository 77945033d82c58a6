use clarity_agent::OpenAiChatClient;
use clarity_chat::RingCentralChatClient;
use clarity_core::config::{AppConfig, LoadOptions};
use clarity_core::FieldMappings;
use clarity_crm::SalesforceCampaignSource;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "skipped because configuration did not load".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DEPENDENT_CHECKS: [&str; 4] =
    ["field_mappings", "llm_client", "salesforce_client", "chat_client"];

/// Offline readiness checks: nothing here calls Salesforce, the model, or the chat API.
pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass("config_validation", "configuration loaded and validated"));
            checks.push(check_field_mappings(&config));
            checks.push(check_llm_client(&config));
            checks.push(check_salesforce_client(&config));
            checks.push(check_chat_client(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            checks.extend(DEPENDENT_CHECKS.into_iter().map(DoctorCheck::skipped));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_field_mappings(config: &AppConfig) -> DoctorCheck {
    let Some(path) = config.enrichment.field_mappings_path.as_deref() else {
        let count = FieldMappings::builtin().entries().len();
        return DoctorCheck::pass("field_mappings", format!("using {count} builtin field mappings"));
    };

    match FieldMappings::load(path) {
        Ok(mappings) => DoctorCheck::pass(
            "field_mappings",
            format!("loaded {} field mappings from `{}`", mappings.entries().len(), path.display()),
        ),
        Err(error) => DoctorCheck::fail("field_mappings", error.to_string()),
    }
}

fn check_llm_client(config: &AppConfig) -> DoctorCheck {
    match OpenAiChatClient::from_config(&config.llm) {
        Ok(client) => DoctorCheck::pass(
            "llm_client",
            format!(
                "{} model `{}` at `{}` (api key {})",
                config.llm.provider.as_str(),
                config.llm.model,
                client.endpoint(),
                if config.llm.api_key.is_some() { "set" } else { "not set" },
            ),
        ),
        Err(error) => DoctorCheck::fail("llm_client", error.to_string()),
    }
}

fn check_salesforce_client(config: &AppConfig) -> DoctorCheck {
    match SalesforceCampaignSource::from_config(&config.salesforce) {
        Ok(source) => DoctorCheck::pass(
            "salesforce_client",
            format!("queries go to `{}`", source.query_endpoint()),
        ),
        Err(error) => DoctorCheck::fail("salesforce_client", error.to_string()),
    }
}

fn check_chat_client(config: &AppConfig) -> DoctorCheck {
    match RingCentralChatClient::from_config(&config.chat) {
        Ok(_) => DoctorCheck::pass(
            "chat_client",
            format!("bot `{}` posts through `{}`", config.chat.bot_id, config.chat.api_base_url),
        ),
        Err(error) => DoctorCheck::fail("chat_client", error.to_string()),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
