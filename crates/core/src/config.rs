use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub chat: ChatConfig,
    pub llm: LlmConfig,
    pub salesforce: SalesforceConfig,
    pub agent: AgentConfig,
    pub enrichment: EnrichmentConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub bot_id: String,
    pub bot_token: SecretString,
    pub api_base_url: String,
    pub verification_token: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub description_model: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl LlmConfig {
    pub fn effective_base_url(&self) -> &str {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/'),
            None => self.provider.default_base_url(),
        }
    }

    pub fn effective_description_model(&self) -> &str {
        self.description_model.as_deref().unwrap_or(&self.model)
    }
}

#[derive(Clone, Debug)]
pub struct SalesforceConfig {
    pub instance_url: String,
    pub access_token: SecretString,
    pub api_version: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub max_iterations: u32,
    pub conversation_ttl_secs: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct EnrichmentConfig {
    pub field_mappings_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434/v1",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub chat_bot_id: Option<String>,
    pub chat_bot_token: Option<String>,
    pub salesforce_instance_url: Option<String>,
    pub salesforce_access_token: Option<String>,
    pub agent_max_iterations: Option<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chat: ChatConfig {
                bot_id: String::new(),
                bot_token: String::new().into(),
                api_base_url: "https://platform.ringcentral.com".to_string(),
                verification_token: None,
            },
            llm: LlmConfig {
                provider: LlmProvider::OpenAi,
                api_key: None,
                base_url: None,
                model: "gpt-4o".to_string(),
                description_model: None,
                timeout_secs: 60,
                max_retries: 2,
            },
            salesforce: SalesforceConfig {
                instance_url: String::new(),
                access_token: String::new().into(),
                api_version: "v59.0".to_string(),
                timeout_secs: 30,
            },
            agent: AgentConfig { max_iterations: 10, conversation_ttl_secs: None },
            enrichment: EnrichmentConfig::default(),
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("clarity.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(chat) = patch.chat {
            if let Some(bot_id) = chat.bot_id {
                self.chat.bot_id = bot_id;
            }
            if let Some(chat_bot_token_value) = chat.bot_token {
                self.chat.bot_token = secret_value(chat_bot_token_value);
            }
            if let Some(api_base_url) = chat.api_base_url {
                self.chat.api_base_url = api_base_url;
            }
            if let Some(verification_token_value) = chat.verification_token {
                self.chat.verification_token = Some(secret_value(verification_token_value));
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(description_model) = llm.description_model {
                self.llm.description_model = Some(description_model);
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(salesforce) = patch.salesforce {
            if let Some(instance_url) = salesforce.instance_url {
                self.salesforce.instance_url = instance_url;
            }
            if let Some(access_token_value) = salesforce.access_token {
                self.salesforce.access_token = secret_value(access_token_value);
            }
            if let Some(api_version) = salesforce.api_version {
                self.salesforce.api_version = api_version;
            }
            if let Some(timeout_secs) = salesforce.timeout_secs {
                self.salesforce.timeout_secs = timeout_secs;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(max_iterations) = agent.max_iterations {
                self.agent.max_iterations = max_iterations;
            }
            if let Some(conversation_ttl_secs) = agent.conversation_ttl_secs {
                self.agent.conversation_ttl_secs = Some(conversation_ttl_secs);
            }
        }

        if let Some(enrichment) = patch.enrichment {
            if let Some(field_mappings_path) = enrichment.field_mappings_path {
                self.enrichment.field_mappings_path = Some(field_mappings_path);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CLARITY_CHAT_BOT_ID") {
            self.chat.bot_id = value;
        }
        if let Some(value) = read_env("CLARITY_CHAT_BOT_TOKEN") {
            self.chat.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("CLARITY_CHAT_API_BASE_URL") {
            self.chat.api_base_url = value;
        }
        if let Some(value) = read_env("CLARITY_CHAT_VERIFICATION_TOKEN") {
            self.chat.verification_token = Some(secret_value(value));
        }

        if let Some(value) = read_env("CLARITY_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        let llm_api_key = read_env("CLARITY_LLM_API_KEY").or_else(|| read_env("OPENAI_API_KEY"));
        if let Some(value) = llm_api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CLARITY_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("CLARITY_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("CLARITY_LLM_DESCRIPTION_MODEL") {
            self.llm.description_model = Some(value);
        }
        if let Some(value) = read_env("CLARITY_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("CLARITY_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CLARITY_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("CLARITY_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("CLARITY_SALESFORCE_INSTANCE_URL") {
            self.salesforce.instance_url = value;
        }
        if let Some(value) = read_env("CLARITY_SALESFORCE_ACCESS_TOKEN") {
            self.salesforce.access_token = secret_value(value);
        }
        if let Some(value) = read_env("CLARITY_SALESFORCE_API_VERSION") {
            self.salesforce.api_version = value;
        }
        if let Some(value) = read_env("CLARITY_SALESFORCE_TIMEOUT_SECS") {
            self.salesforce.timeout_secs = parse_u64("CLARITY_SALESFORCE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CLARITY_AGENT_MAX_ITERATIONS") {
            self.agent.max_iterations = parse_u32("CLARITY_AGENT_MAX_ITERATIONS", &value)?;
        }
        if let Some(value) = read_env("CLARITY_AGENT_CONVERSATION_TTL_SECS") {
            self.agent.conversation_ttl_secs =
                Some(parse_u64("CLARITY_AGENT_CONVERSATION_TTL_SECS", &value)?);
        }

        if let Some(value) = read_env("CLARITY_ENRICHMENT_FIELD_MAPPINGS_PATH") {
            self.enrichment.field_mappings_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("CLARITY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CLARITY_SERVER_PORT") {
            self.server.port = parse_u16("CLARITY_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("CLARITY_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("CLARITY_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("CLARITY_LOGGING_LEVEL").or_else(|| read_env("CLARITY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CLARITY_LOGGING_FORMAT").or_else(|| read_env("CLARITY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(chat_bot_id) = overrides.chat_bot_id {
            self.chat.bot_id = chat_bot_id;
        }
        if let Some(chat_bot_token) = overrides.chat_bot_token {
            self.chat.bot_token = secret_value(chat_bot_token);
        }
        if let Some(instance_url) = overrides.salesforce_instance_url {
            self.salesforce.instance_url = instance_url;
        }
        if let Some(access_token) = overrides.salesforce_access_token {
            self.salesforce.access_token = secret_value(access_token);
        }
        if let Some(max_iterations) = overrides.agent_max_iterations {
            self.agent.max_iterations = max_iterations;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_chat(&self.chat)?;
        validate_llm(&self.llm)?;
        validate_salesforce(&self.salesforce)?;
        validate_agent(&self.agent)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("clarity.toml"), PathBuf::from("config/clarity.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if chat.bot_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "chat.bot_id is required; it is the extension id the bot is mentioned by".to_string(),
        ));
    }
    if !chat.bot_id.trim().chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return Err(ConfigError::Validation("chat.bot_id must be alphanumeric".to_string()));
    }
    if chat.bot_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "chat.bot_token is required to post replies to the chat platform".to_string(),
        ));
    }
    if !is_http_url(&chat.api_base_url) {
        return Err(ConfigError::Validation(
            "chat.api_base_url must start with http:// or https://".to_string(),
        ));
    }
    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if llm.max_retries > 10 {
        return Err(ConfigError::Validation("llm.max_retries must be at most 10".to_string()));
    }
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    match llm.provider {
        LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for the openai provider".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {}
    }

    if let Some(base_url) = &llm.base_url {
        if !is_http_url(base_url) {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_salesforce(salesforce: &SalesforceConfig) -> Result<(), ConfigError> {
    if salesforce.instance_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "salesforce.instance_url is required (for example https://yourorg.my.salesforce.com)"
                .to_string(),
        ));
    }
    if !is_http_url(&salesforce.instance_url) {
        return Err(ConfigError::Validation(
            "salesforce.instance_url must start with http:// or https://".to_string(),
        ));
    }
    if salesforce.access_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "salesforce.access_token is required to query campaigns".to_string(),
        ));
    }
    let version = salesforce.api_version.trim();
    let numeric = version.strip_prefix('v').map(|rest| rest.parse::<f32>().is_ok());
    if numeric != Some(true) {
        return Err(ConfigError::Validation(
            "salesforce.api_version must look like `v59.0`".to_string(),
        ));
    }
    if salesforce.timeout_secs == 0 || salesforce.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "salesforce.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    if agent.max_iterations == 0 || agent.max_iterations > 50 {
        return Err(ConfigError::Validation(
            "agent.max_iterations must be in range 1..=50".to_string(),
        ));
    }
    if agent.conversation_ttl_secs == Some(0) {
        return Err(ConfigError::Validation(
            "agent.conversation_ttl_secs must be greater than zero when set".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    chat: Option<ChatPatch>,
    llm: Option<LlmPatch>,
    salesforce: Option<SalesforcePatch>,
    agent: Option<AgentPatch>,
    enrichment: Option<EnrichmentPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    bot_id: Option<String>,
    bot_token: Option<String>,
    api_base_url: Option<String>,
    verification_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    description_model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SalesforcePatch {
    instance_url: Option<String>,
    access_token: Option<String>,
    api_version: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    max_iterations: Option<u32>,
    conversation_ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EnrichmentPatch {
    field_mappings_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
