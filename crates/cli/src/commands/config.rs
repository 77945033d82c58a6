use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clarity_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct ConfigField {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<ConfigField> {
    let field = |key_path, env_keys, value: String| ConfigField { key_path, env_keys, value };
    let optional = |value: Option<String>| value.unwrap_or_else(|| "<unset>".to_string());

    vec![
        field("chat.bot_id", &["CLARITY_CHAT_BOT_ID"], config.chat.bot_id.clone()),
        field(
            "chat.bot_token",
            &["CLARITY_CHAT_BOT_TOKEN"],
            redact_token(config.chat.bot_token.expose_secret()),
        ),
        field("chat.api_base_url", &["CLARITY_CHAT_API_BASE_URL"], config.chat.api_base_url.clone()),
        field(
            "chat.verification_token",
            &["CLARITY_CHAT_VERIFICATION_TOKEN"],
            presence(config.chat.verification_token.is_some()),
        ),
        field("llm.provider", &["CLARITY_LLM_PROVIDER"], config.llm.provider.as_str().to_string()),
        field("llm.model", &["CLARITY_LLM_MODEL"], config.llm.model.clone()),
        field(
            "llm.description_model",
            &["CLARITY_LLM_DESCRIPTION_MODEL"],
            config.llm.effective_description_model().to_string(),
        ),
        field("llm.base_url", &["CLARITY_LLM_BASE_URL"], optional(config.llm.base_url.clone())),
        field(
            "llm.api_key",
            &["CLARITY_LLM_API_KEY", "OPENAI_API_KEY"],
            presence(config.llm.api_key.is_some()),
        ),
        field("llm.timeout_secs", &["CLARITY_LLM_TIMEOUT_SECS"], config.llm.timeout_secs.to_string()),
        field("llm.max_retries", &["CLARITY_LLM_MAX_RETRIES"], config.llm.max_retries.to_string()),
        field(
            "salesforce.instance_url",
            &["CLARITY_SALESFORCE_INSTANCE_URL"],
            config.salesforce.instance_url.clone(),
        ),
        field(
            "salesforce.access_token",
            &["CLARITY_SALESFORCE_ACCESS_TOKEN"],
            redact_token(config.salesforce.access_token.expose_secret()),
        ),
        field(
            "salesforce.api_version",
            &["CLARITY_SALESFORCE_API_VERSION"],
            config.salesforce.api_version.clone(),
        ),
        field(
            "salesforce.timeout_secs",
            &["CLARITY_SALESFORCE_TIMEOUT_SECS"],
            config.salesforce.timeout_secs.to_string(),
        ),
        field(
            "agent.max_iterations",
            &["CLARITY_AGENT_MAX_ITERATIONS"],
            config.agent.max_iterations.to_string(),
        ),
        field(
            "agent.conversation_ttl_secs",
            &["CLARITY_AGENT_CONVERSATION_TTL_SECS"],
            optional(config.agent.conversation_ttl_secs.map(|secs| secs.to_string())),
        ),
        field(
            "enrichment.field_mappings_path",
            &["CLARITY_ENRICHMENT_FIELD_MAPPINGS_PATH"],
            optional(
                config
                    .enrichment
                    .field_mappings_path
                    .as_ref()
                    .map(|path| path.display().to_string()),
            ),
        ),
        field(
            "server.bind_address",
            &["CLARITY_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        field("server.port", &["CLARITY_SERVER_PORT"], config.server.port.to_string()),
        field(
            "server.graceful_shutdown_secs",
            &["CLARITY_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs.to_string(),
        ),
        field(
            "logging.level",
            &["CLARITY_LOGGING_LEVEL", "CLARITY_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        field(
            "logging.format",
            &["CLARITY_LOGGING_FORMAT", "CLARITY_LOG_FORMAT"],
            format!("{:?}", config.logging.format).to_lowercase(),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["clarity.toml", "config/clarity.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn presence(is_set: bool) -> String {
    if is_set { "<redacted>" } else { "<unset>" }.to_string()
}

/// Keeps only the first four characters of a token.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    let prefix: String = trimmed.chars().take(4).collect();
    if prefix.len() == trimmed.len() {
        return "<redacted>".to_string();
    }
    format!("{prefix}***")
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_token};

    #[test]
    fn tokens_are_reduced_to_a_short_prefix() {
        assert_eq!(redact_token("00Dxx0000001gPL!AR8AQJXg"), "00Dx***");
        assert_eq!(redact_token("abc"), "<redacted>");
        assert_eq!(redact_token("  "), "<empty>");
    }

    #[test]
    fn nested_keys_are_found_in_config_document() {
        let doc: toml::Value =
            "[salesforce]\ninstance_url = \"https://x.my.salesforce.com\"".parse().expect("toml");

        assert!(contains_path(&doc, "salesforce.instance_url"));
        assert!(!contains_path(&doc, "salesforce.access_token"));
        assert!(!contains_path(&doc, "chat.bot_id"));
    }
}
