use std::env;
use std::sync::{Mutex, OnceLock};

use clarity_cli::commands::{analyze, classify, config, doctor};
use serde_json::Value;

const VALID_ENV: [(&str, &str); 5] = [
    ("CLARITY_CHAT_BOT_ID", "123456789"),
    ("CLARITY_CHAT_BOT_TOKEN", "chat-token-value"),
    ("CLARITY_SALESFORCE_INSTANCE_URL", "https://example.my.salesforce.com"),
    ("CLARITY_SALESFORCE_ACCESS_TOKEN", "00Dxx0000001gPL!token"),
    ("CLARITY_LLM_API_KEY", "sk-test"),
];

#[test]
fn analyze_rejects_malformed_campaign_id() {
    with_env(&VALID_ENV, || {
        let result = analyze::run("campaign-42", None);
        assert_eq!(result.exit_code, 2, "expected invalid input code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "analyze");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_campaign_id");
    });
}

#[test]
fn analyze_returns_config_failure_without_credentials() {
    with_env(&[], || {
        let result = analyze::run("701Hr000001L82yIAC", None);
        assert_eq!(result.exit_code, 3, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "analyze");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn classify_needs_no_configuration() {
    with_env(&[], || {
        let result = classify::run("give me basic info on 701Hr000001L82y");
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "classify");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["route"], "analyze");
        assert_eq!(payload["data"]["intent"], "basic_info");
        assert_eq!(payload["data"]["campaign_id"], "701Hr000001L82y");
    });
}

#[test]
fn config_redacts_secrets_and_attributes_sources() {
    with_env(&VALID_ENV, || {
        let output = config::run();

        assert!(output.starts_with("effective config"));
        assert!(output.contains("- chat.bot_id = 123456789 (source: env (CLARITY_CHAT_BOT_ID))"));
        assert!(output.contains("- chat.bot_token = chat*** (source: env (CLARITY_CHAT_BOT_TOKEN))"));
        assert!(output.contains("- llm.api_key = <redacted> (source: env (CLARITY_LLM_API_KEY))"));
        assert!(output.contains("- agent.max_iterations = 10 (source: default)"));
        assert!(!output.contains("chat-token-value"));
        assert!(!output.contains("sk-test"));
    });
}

#[test]
fn config_reports_validation_failure() {
    with_env(&[], || {
        let output = config::run();
        assert!(output.starts_with("config validation failed:"), "got: {output}");
    });
}

#[test]
fn doctor_passes_offline_checks_with_valid_env() {
    with_env(&VALID_ENV, || {
        let payload = parse_payload(&doctor::run(true));

        assert_eq!(payload["overall_status"], "pass");
        let names: Vec<&str> = payload["checks"]
            .as_array()
            .expect("checks array")
            .iter()
            .filter_map(|check| check["name"].as_str())
            .collect();
        assert_eq!(
            names,
            ["config_validation", "field_mappings", "llm_client", "salesforce_client", "chat_client"]
        );
        let salesforce = &payload["checks"][3]["details"];
        assert!(salesforce
            .as_str()
            .is_some_and(|details| details.contains("example.my.salesforce.com/services/data/")));
    });
}

#[test]
fn doctor_skips_client_checks_when_config_invalid() {
    with_env(&[], || {
        let payload = parse_payload(&doctor::run(true));

        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][0]["status"], "fail");
        assert_eq!(payload["checks"][4]["status"], "skipped");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CLARITY_CHAT_BOT_ID",
        "CLARITY_CHAT_BOT_TOKEN",
        "CLARITY_CHAT_API_BASE_URL",
        "CLARITY_CHAT_VERIFICATION_TOKEN",
        "CLARITY_LLM_PROVIDER",
        "CLARITY_LLM_API_KEY",
        "OPENAI_API_KEY",
        "CLARITY_LLM_BASE_URL",
        "CLARITY_LLM_MODEL",
        "CLARITY_LLM_DESCRIPTION_MODEL",
        "CLARITY_LLM_TIMEOUT_SECS",
        "CLARITY_LLM_MAX_RETRIES",
        "CLARITY_SALESFORCE_INSTANCE_URL",
        "CLARITY_SALESFORCE_ACCESS_TOKEN",
        "CLARITY_SALESFORCE_API_VERSION",
        "CLARITY_SALESFORCE_TIMEOUT_SECS",
        "CLARITY_AGENT_MAX_ITERATIONS",
        "CLARITY_AGENT_CONVERSATION_TTL_SECS",
        "CLARITY_ENRICHMENT_FIELD_MAPPINGS_PATH",
        "CLARITY_SERVER_BIND_ADDRESS",
        "CLARITY_SERVER_PORT",
        "CLARITY_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "CLARITY_LOGGING_LEVEL",
        "CLARITY_LOGGING_FORMAT",
        "CLARITY_LOG_LEVEL",
        "CLARITY_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
