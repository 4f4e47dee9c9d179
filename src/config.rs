use crate::error::ExamerError;
use serde::{Deserialize, Serialize};
use std::{
    env,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ignore_patterns: Vec<String>,
    pub file_extensions: Vec<String>,
    /// Walked files larger than this many bytes are skipped. Unlimited when unset.
    pub max_file_size: Option<u64>,
    pub respect_gitignore: bool,
    pub llm: LLMConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f64,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LLMProvider {
    OpenAI,
    Ollama,
    Anthropic,
}

impl LLMProvider {
    /// Environment variable holding the credential, if the provider needs one.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LLMProvider::OpenAI => Some("OPENAI_API_KEY"),
            LLMProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            LLMProvider::Ollama => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub concurrency: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub include_decorators: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore_patterns: vec![".git".to_string(), "__pycache__".to_string()],
            file_extensions: vec!["py".to_string()],
            max_file_size: None,
            respect_gitignore: false,
            llm: LLMConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::OpenAI,
            api_key: None,
            base_url: None,
            model: "gpt-4-1106-preview".to_string(),
            max_tokens: 1024,
            temperature: 0.3,
            timeout_seconds: 120,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            max_retries: 0,
            retry_backoff_ms: 500,
            include_decorators: false,
        }
    }
}

impl Config {
    /// Get the default config file path (~/.patent-examer.toml)
    pub fn default_config_path() -> crate::Result<PathBuf> {
        let home_dir = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(PathBuf::from(home_dir).join(".patent-examer.toml"))
    }

    /// Load config from the default location, falling back to defaults if the file doesn't exist.
    /// The provider credential is read from the environment here and nowhere else.
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::default_config_path()?;

        let config = if config_path.exists() {
            tracing::info!("Loading configuration from {}", config_path.display());
            Self::from_file(&config_path)?
        } else {
            tracing::debug!("No config file at {}, using defaults", config_path.display());
            Self::default()
        };

        Ok(config.with_env_credentials())
    }

    /// Load config from a specific file path
    pub fn from_file(path: &PathBuf) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load an explicit config file and apply environment credentials.
    pub fn load_from(path: &PathBuf) -> crate::Result<Self> {
        Ok(Self::from_file(path)?.with_env_credentials())
    }

    fn with_env_credentials(mut self) -> Self {
        if self.llm.api_key.is_none() {
            self.llm.api_key = self
                .llm
                .provider
                .api_key_env()
                .and_then(|var| env::var(var).ok())
                .filter(|key| !key.trim().is_empty());
        }
        self
    }

    /// Write the commented default configuration to `path`, creating parent directories.
    pub fn write_documented(path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, Self::create_documented_config())?;
        Ok(())
    }

    /// Reject configurations that cannot complete a run. Called before any file is touched.
    pub fn validate(&self) -> Result<(), ExamerError> {
        if let Some(var) = self.llm.provider.api_key_env() {
            if self.llm.api_key.is_none() {
                return Err(ExamerError::Configuration(format!(
                    "{:?} requires an API key; set {} or llm.api_key",
                    self.llm.provider, var
                )));
            }
        }
        if self.analysis.concurrency == 0 {
            return Err(ExamerError::configuration("analysis.concurrency must be at least 1"));
        }
        if self.file_extensions.is_empty() {
            return Err(ExamerError::configuration("file_extensions must not be empty"));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ExamerError::configuration("llm.model must not be empty"));
        }
        Ok(())
    }

    /// Create a config file with all available options documented
    pub fn create_documented_config() -> String {
        r#"# Patent Examer Configuration File
# Controls which files are scanned and how each function is sent to the LLM

# Patterns to ignore during file discovery
ignore_patterns = [".git", "__pycache__"]

# File extensions to include (the extractor understands Python)
file_extensions = ["py"]

# Skip walked files larger than this many bytes (unset = no limit).
# A file named directly on the command line is always analyzed.
# max_file_size = 1048576

# Honour .gitignore files while walking directories
respect_gitignore = false

[llm]
# LLM Provider: "OpenAI", "Ollama", or "Anthropic"
provider = "OpenAI"

# API key for the provider (can also be set via environment variables)
# OpenAI: OPENAI_API_KEY
# Anthropic: ANTHROPIC_API_KEY
# api_key = "your-api-key-here"

# Endpoint override (Ollama instances, proxies)
# base_url = "http://localhost:11434"

# Model used for every function in the run
model = "gpt-4-1106-preview"

# Maximum tokens for each response
max_tokens = 1024

# Temperature (kept low so repeated runs stay close)
temperature = 0.3

# Request timeout in seconds
timeout_seconds = 120

[analysis]
# Functions analyzed at the same time (1 = strictly sequential)
concurrency = 1

# Extra attempts after a failed call, with linear backoff
max_retries = 0
retry_backoff_ms = 500

# Include decorator lines in each function's extracted code
include_decorators = false
"#
        .to_string()
    }
}
