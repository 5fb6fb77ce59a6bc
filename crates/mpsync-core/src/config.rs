//! Engine configuration loaded from TOML.
//!
//! Every section is optional; a missing file yields [`EngineConfig::default`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub deals: DealsConfig,
    #[serde(default)]
    pub contacts: ContactsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Constants written onto every deal the engine creates or updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealsConfig {
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_pipeline")]
    pub pipeline: String,
    #[serde(default)]
    pub related_products: Option<String>,
    /// Supports `{addon}` and `{company}` placeholders.
    #[serde(default = "default_deal_name_template")]
    pub deal_name_template: String,
}

impl Default for DealsConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            pipeline: default_pipeline(),
            related_products: None,
            deal_name_template: default_deal_name_template(),
        }
    }
}

impl DealsConfig {
    #[must_use]
    pub fn deal_name(&self, addon_name: &str, company: &str) -> String {
        self.deal_name_template
            .replace("{addon}", addon_name)
            .replace("{company}", company)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactsConfig {
    #[serde(default)]
    pub partner_domains: Vec<String>,
}

impl ContactsConfig {
    #[must_use]
    pub fn partner_domains(&self) -> PartnerDomains {
        PartnerDomains::new(self.partner_domains.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Email domains whose contacts are classified as partners.
///
/// Domains are stored lowercased; lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartnerDomains(HashSet<String>);

impl PartnerDomains {
    pub fn new<'a>(domains: impl IntoIterator<Item = &'a str>) -> Self {
        Self(
            domains
                .into_iter()
                .map(|d| d.trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        )
    }

    #[must_use]
    pub fn contains_domain(&self, domain: &str) -> bool {
        self.0.contains(&domain.to_ascii_lowercase())
    }

    /// Whether the domain part of `email` is a partner domain.
    #[must_use]
    pub fn matches_email(&self, email: &str) -> bool {
        email
            .rsplit_once('@')
            .is_some_and(|(_, domain)| self.contains_domain(domain))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl EngineConfig {
    /// Parse a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid engine config.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str::<Self>(content)?)
    }
}

/// Load the engine config at `path`, falling back to defaults when absent.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
pub fn load_engine_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    if !path.exists() {
        return Ok(EngineConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    EngineConfig::from_toml_str(&content)
}

fn default_origin() -> String {
    "Marketplace".to_string()
}

fn default_pipeline() -> String {
    "Marketplace".to_string()
}

fn default_deal_name_template() -> String {
    "{addon} at {company}".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
