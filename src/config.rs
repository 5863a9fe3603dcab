use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::constants::{
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_IGNORE_URL_PATTERNS, DEFAULT_MAX_HTML_REDIRECTS,
    DEFAULT_REMOVE_PARAM_PATTERNS, MAX_HTTP_REDIRECTS, RESOLVER_USER_AGENT,
};
use crate::keys::key_for_url;
use crate::policy::{AttachmentTarget, CleanPolicy, DestinationPolicy, IgnorePolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
    #[error("invalid regular expression in {name}: {source}")]
    Regex {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// Link resolution options.
///
/// Passed explicitly to the resolver and the stores. Implements every policy
/// trait, so one value configures a whole resolution.
#[derive(Debug, Clone)]
pub struct Config {
    // Policies
    pub ignore_url_patterns: Vec<Regex>,
    pub remove_param_patterns: Vec<Regex>,
    pub follow_html_redirects: bool,
    pub parse_html_meta: bool,
    pub download_attachments: bool,
    pub attachments_dir: Option<PathBuf>,
    pub max_html_redirects: usize,

    // HTTP
    pub http_timeout: Duration,
    pub user_agent: String,

    // Store
    pub store_dir: Option<PathBuf>,
    pub store_ttl: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore_url_patterns: compile_defaults(DEFAULT_IGNORE_URL_PATTERNS),
            remove_param_patterns: compile_defaults(DEFAULT_REMOVE_PARAM_PATTERNS),
            follow_html_redirects: true,
            parse_html_meta: true,
            download_attachments: false,
            attachments_dir: None,
            max_html_redirects: DEFAULT_MAX_HTML_REDIRECTS,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            user_agent: RESOLVER_USER_AGENT.to_string(),
            store_dir: None,
            store_ttl: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            // Policies
            ignore_url_patterns: parse_env_patterns(
                "LINK_IGNORE_URL_PATTERNS",
                defaults.ignore_url_patterns,
            )?,
            remove_param_patterns: parse_env_patterns(
                "LINK_REMOVE_PARAM_PATTERNS",
                defaults.remove_param_patterns,
            )?,
            follow_html_redirects: parse_env_bool("LINK_FOLLOW_HTML_REDIRECTS", true)?,
            parse_html_meta: parse_env_bool("LINK_PARSE_HTML_META", true)?,
            download_attachments: parse_env_bool("LINK_DOWNLOAD_ATTACHMENTS", false)?,
            attachments_dir: optional_env("LINK_ATTACHMENTS_DIR").map(PathBuf::from),
            max_html_redirects: parse_env_usize(
                "LINK_MAX_HTML_REDIRECTS",
                DEFAULT_MAX_HTML_REDIRECTS,
            )?,

            // HTTP
            http_timeout: Duration::from_secs(parse_env_u64(
                "LINK_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            user_agent: env_or_default("LINK_USER_AGENT", RESOLVER_USER_AGENT),

            // Store
            store_dir: optional_env("LINK_STORE_DIR").map(PathBuf::from),
            store_ttl: match optional_env("LINK_STORE_TTL_SECS") {
                Some(_) => Some(Duration::from_secs(parse_env_u64("LINK_STORE_TTL_SECS", 0)?)),
                None => None,
            },
        })
    }

    /// Defaults with a short HTTP timeout, for tests against local servers.
    #[doc(hidden)]
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            http_timeout: Duration::from_secs(5),
            ..Self::default()
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "LINK_HTTP_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.user_agent.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "LINK_USER_AGENT".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Build the HTTP client used to fetch links.
    ///
    /// HTTP-level redirects are followed by the client itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .user_agent(self.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(MAX_HTTP_REDIRECTS))
            .build()
    }

    /// Replace the ignore rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern is not a valid regular expression.
    pub fn with_ignore_patterns(mut self, patterns: &[&str]) -> Result<Self, ConfigError> {
        self.ignore_url_patterns = compile_patterns("ignore_url_patterns", patterns)?;
        Ok(self)
    }

    /// Replace the query parameter removal rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern is not a valid regular expression.
    pub fn with_remove_param_patterns(mut self, patterns: &[&str]) -> Result<Self, ConfigError> {
        self.remove_param_patterns = compile_patterns("remove_param_patterns", patterns)?;
        Ok(self)
    }
}

impl IgnorePolicy for Config {
    fn ignore_link(&self, url: &Url) -> Option<String> {
        let text = url.as_str();
        self.ignore_url_patterns
            .iter()
            .find(|re| re.is_match(text))
            .map(|re| format!("Matched Ignore Rule `{}`", re.as_str()))
    }
}

impl CleanPolicy for Config {
    fn remove_query_param(&self, _url: &Url, param_name: &str) -> Option<String> {
        self.remove_param_patterns
            .iter()
            .find(|re| re.is_match(param_name))
            .map(|re| format!("Matched cleaner rule `{}`", re.as_str()))
    }
}

impl DestinationPolicy for Config {
    fn follow_html_redirects(&self, _url: &Url) -> bool {
        self.follow_html_redirects
    }

    fn parse_html_meta(&self, _url: &Url) -> bool {
        self.parse_html_meta
    }

    fn download_attachment(&self, url: &Url) -> Option<AttachmentTarget> {
        if !self.download_attachments {
            return None;
        }
        Some(match &self.attachments_dir {
            Some(dir) => AttachmentTarget::Path(dir.join(key_for_url(url))),
            None => AttachmentTarget::TempFile,
        })
    }
}

fn compile_defaults(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("built-in pattern is valid"))
        .collect()
}

fn compile_patterns(name: &str, patterns: &[&str]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| ConfigError::Regex {
                name: name.to_string(),
                source: e,
            })
        })
        .collect()
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    optional_env(name).unwrap_or_else(|| default.to_string())
}

fn parse_env_patterns(name: &str, default: Vec<Regex>) -> Result<Vec<Regex>, ConfigError> {
    match optional_env(name) {
        Some(val) => {
            let patterns: Vec<&str> = val.split_whitespace().collect();
            compile_patterns(name, &patterns)
        }
        None => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}
