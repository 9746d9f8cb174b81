use std::{net::Ipv4Addr, time::Duration};

use serde::Deserialize;

/// Settings read from the process environment. Every field has a default, credentials are
/// optional and simply omitted from upstream calls when unset.
#[derive(Deserialize, Debug, Clone)]
pub struct EnvVars {
    #[serde(default = "default_listen_addr")]
    pub host: Ipv4Addr,
    #[serde(default = "default_port")]
    pub port: u16,

    pub together_api_key: Option<String>,
    pub huggingface_api_key: Option<String>,
    pub featherless_api_key: Option<String>,
    pub brave_api_key: Option<String>,

    #[serde(default = "default_together_base_url")]
    pub together_base_url: String,
    #[serde(default = "default_huggingface_base_url")]
    pub huggingface_base_url: String,
    #[serde(default = "default_featherless_base_url")]
    pub featherless_base_url: String,
    #[serde(default = "default_brave_base_url")]
    pub brave_base_url: String,

    #[serde(default = "default_completion_model")]
    pub completion_model: String,
    #[serde(default = "default_catalog_limit")]
    pub catalog_limit: u32,
    #[serde(default = "default_availability_ttl_secs")]
    pub availability_ttl_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub enrich_models: bool,
    #[serde(default = "default_true")]
    pub web_sources: bool,
}

fn default_listen_addr() -> Ipv4Addr {
    Ipv4Addr::LOCALHOST
}

fn default_port() -> u16 {
    8000
}

fn default_together_base_url() -> String {
    String::from("https://api.together.xyz")
}

fn default_huggingface_base_url() -> String {
    String::from("https://huggingface.co")
}

fn default_featherless_base_url() -> String {
    String::from("https://api.featherless.ai")
}

fn default_brave_base_url() -> String {
    String::from("https://api.search.brave.com")
}

fn default_completion_model() -> String {
    String::from("meta-llama/Llama-3.3-70B-Instruct-Turbo")
}

fn default_catalog_limit() -> u32 {
    5
}

fn default_availability_ttl_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl EnvVars {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Registry page size, kept within what the registry search is useful for.
    pub fn catalog_limit(&self) -> u32 {
        self.catalog_limit.clamp(3, 20)
    }

    /// `None` when the cache should never expire.
    pub fn availability_ttl(&self) -> Option<Duration> {
        match self.availability_ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
