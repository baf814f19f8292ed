use crate::{
    bedrock::text_client::DEFAULT_CLASSIFIER_MODEL as BEDROCK_CLASSIFIER_MODEL,
    bedrock::image_client::DEFAULT_IMAGE_MODEL as BEDROCK_IMAGE_MODEL,
    error::{GraphiteError, Result},
    gemini::{
        client::DEFAULT_API_BASE,
        DEFAULT_CLASSIFIER_MODEL as GEMINI_CLASSIFIER_MODEL,
    },
    prompt::{PromptTemplate, DEFAULT_PRESET},
};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9002;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Gemini,
    Bedrock,
}

impl FromStr for BackendKind {
    type Err = GraphiteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(BackendKind::Gemini),
            "bedrock" | "aws" => Ok(BackendKind::Bedrock),
            other => Err(GraphiteError::ConfigError(format!(
                "unknown backend '{}', expected 'gemini' or 'bedrock'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub classifier_model: String,
    /// Unset unless `GRAPHITE_REQUEST_TIMEOUT_SECS` is given.
    pub timeout: Option<Duration>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            classifier_model: GEMINI_CLASSIFIER_MODEL.to_string(),
            timeout: None,
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = GeminiConfig {
            api_key: env::var("GEMINI_API_KEY")
                .or_else(|_| env::var("GOOGLE_API_KEY"))
                .ok()
                .filter(|k| !k.is_empty()),
            classifier_model: env::var("GRAPHITE_CLASSIFIER_MODEL")
                .unwrap_or(defaults.classifier_model),
            timeout: env::var("GRAPHITE_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|secs| secs.trim().parse().ok())
                .map(Duration::from_secs),
            api_base: defaults.api_base,
        };
        match env::var("GEMINI_API_BASE") {
            Ok(api_base) if !api_base.trim().is_empty() => config.with_api_base(api_base),
            _ => config,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub classifier_model: String,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        BedrockConfig {
            region: None,
            access_key: None,
            secret_key: None,
            classifier_model: BEDROCK_CLASSIFIER_MODEL.to_string(),
        }
    }
}

impl BedrockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        BedrockConfig {
            region: env::var("AWS_REGION")
                .or_else(|_| env::var("AWS_DEFAULT_REGION"))
                .ok(),
            access_key: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            classifier_model: env::var("GRAPHITE_CLASSIFIER_MODEL")
                .unwrap_or_else(|_| BEDROCK_CLASSIFIER_MODEL.to_string()),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: Option<u16>,
    pub backend: BackendKind,
    pub gemini: GeminiConfig,
    pub bedrock: BedrockConfig,
    pub prompt_preset: String,
    pub prompt_file: Option<PathBuf>,
    /// Overrides the model named by the prompt template.
    pub model: Option<String>,
    pub pre_validate: bool,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: DEFAULT_HOST.to_string(),
            port: None,
            backend: BackendKind::Gemini,
            gemini: GeminiConfig::default(),
            bedrock: BedrockConfig::default(),
            prompt_preset: DEFAULT_PRESET.to_string(),
            prompt_file: None,
            model: None,
            pre_validate: false,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name).ok().map_or(false, |val| {
        matches!(val.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
    })
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();
        let backend = match env::var("GRAPHITE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => BackendKind::Gemini,
        };
        let max_upload_bytes = match env::var("GRAPHITE_MAX_UPLOAD_BYTES") {
            Ok(value) => value.trim().parse().map_err(|_| {
                GraphiteError::ConfigError(format!(
                    "GRAPHITE_MAX_UPLOAD_BYTES must be a byte count, got '{}'",
                    value
                ))
            })?,
            Err(_) => defaults.max_upload_bytes,
        };

        Ok(Config {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT").ok().and_then(|port| port.parse().ok()),
            backend,
            gemini: GeminiConfig::from_env(),
            bedrock: BedrockConfig::from_env(),
            prompt_preset: env::var("GRAPHITE_PROMPT_PRESET").unwrap_or(defaults.prompt_preset),
            prompt_file: env::var("GRAPHITE_PROMPT_FILE").ok().map(PathBuf::from),
            model: env::var("GRAPHITE_MODEL").ok().filter(|m| !m.is_empty()),
            pre_validate: env_flag("GRAPHITE_PREVALIDATE"),
            max_upload_bytes,
        })
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self.backend = BackendKind::Gemini;
        self
    }

    pub fn with_bedrock(mut self, config: BedrockConfig) -> Self {
        self.bedrock = config;
        self.backend = BackendKind::Bedrock;
        self
    }

    pub fn with_prompt_preset(mut self, preset: impl Into<String>) -> Self {
        self.prompt_preset = preset.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_pre_validation(mut self, enabled: bool) -> Self {
        self.pre_validate = enabled;
        self
    }

    /// Prompt wording and model for this deployment: a JSON file wins over
    /// the named preset, and an explicit model wins over both. The Bedrock
    /// backend falls back to Titan because preset models target Gemini.
    pub fn prompt_template(&self) -> Result<PromptTemplate> {
        let template = match &self.prompt_file {
            Some(path) => PromptTemplate::from_json_file(path)?,
            None => PromptTemplate::preset(&self.prompt_preset).ok_or_else(|| {
                GraphiteError::ConfigError(format!(
                    "unknown prompt preset '{}', expected one of {:?}",
                    self.prompt_preset,
                    PromptTemplate::presets()
                ))
            })?,
        };

        let template = match (&self.model, self.backend) {
            (Some(model), _) => template.with_model(model.as_str()),
            (None, BackendKind::Bedrock) if self.prompt_file.is_none() => {
                template.with_model(BEDROCK_IMAGE_MODEL)
            }
            (None, _) => template,
        };
        template.check()?;
        Ok(template)
    }

    /// Fails when the selected backend has no credential to work with.
    pub fn validate(&self) -> Result<()> {
        if self.backend == BackendKind::Gemini && self.gemini.api_key.is_none() {
            return Err(GraphiteError::ConfigError(
                "GEMINI_API_KEY is not set".into(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(GraphiteError::ConfigError(
                "max upload size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("Gemini".parse::<BackendKind>().unwrap(), BackendKind::Gemini);
        assert_eq!(" bedrock ".parse::<BackendKind>().unwrap(), BackendKind::Bedrock);
        assert!("openai".parse::<BackendKind>().is_err());
    }

    #[test]
    fn gemini_backend_requires_an_api_key() {
        let config = Config::new();
        assert!(matches!(config.validate(), Err(GraphiteError::ConfigError(_))));

        let config = Config::new().with_gemini(GeminiConfig::new().with_api_key("secret"));
        assert!(config.validate().is_ok());
        assert_eq!(config.port(), DEFAULT_PORT);
    }

    #[test]
    fn gemini_defaults_have_no_timeout() {
        let config = GeminiConfig::new().with_api_base(" http://localhost:8080/v1beta/ ");
        assert!(config.timeout.is_none());
        assert_eq!(config.api_base, "http://localhost:8080/v1beta");
    }

    #[test]
    fn bedrock_backend_can_use_the_default_credential_chain() {
        let config = Config::new().with_bedrock(BedrockConfig::new().with_region("eu-west-1"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn resolves_prompt_template_and_model() {
        let template = Config::new().prompt_template().unwrap();
        assert_eq!(template.name, DEFAULT_PRESET);
        assert_eq!(template.model, crate::prompt::DEFAULT_IMAGE_MODEL);

        let template = Config::new()
            .with_prompt_preset("isometric")
            .with_model("gemini-3-pro-image")
            .prompt_template()
            .unwrap();
        assert_eq!(template.name, "isometric");
        assert_eq!(template.model, "gemini-3-pro-image");

        let template = Config::new()
            .with_bedrock(BedrockConfig::new())
            .prompt_template()
            .unwrap();
        assert_eq!(template.model, BEDROCK_IMAGE_MODEL);
    }

    #[test]
    fn unknown_preset_is_a_config_error() {
        let err = Config::new().with_prompt_preset("baroque").prompt_template();
        assert!(matches!(err, Err(GraphiteError::ConfigError(_))));
    }

    #[test]
    fn loads_custom_template_file() {
        let mut template = PromptTemplate::default();
        template.name = "studio".to_string();
        template.base_instruction = "Studio base".to_string();

        let path = std::env::temp_dir().join(format!("graphite-template-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, serde_json::to_string(&template).unwrap()).unwrap();

        let mut config = Config::new();
        config.prompt_file = Some(path.clone());
        let loaded = config.prompt_template().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.name, "studio");
        assert_eq!(loaded.base_instruction, "Studio base");
    }
}
