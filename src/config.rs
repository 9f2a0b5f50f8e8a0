use anyhow::{anyhow, Context, Result};
use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub address: String,
    pub storage_root: String,
    /// Overrides the request-derived base of returned file URLs.
    #[serde(default)]
    pub base_url: Option<String>,
    pub max_request_bytes: usize,
    pub static_cache_entries: usize,
}

impl Settings {
    // Loads an optional "config" file, then UPLOAD_* environment variables on top
    pub fn new() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("UPLOAD")
                    .prefix_separator("_")
                    .separator("__"),
            );
        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder
            .set_default("address", "0.0.0.0:4000")?
            .set_default("storage_root", "uploads")?
            .set_default("max_request_bytes", 100 * 1024 * 1024_i64)?
            .set_default("static_cache_entries", 256_i64)?
            .build()
            .context("Failed to load settings")?;

        let mut settings: Settings = config.try_deserialize()?;
        settings.base_url = settings
            .base_url
            .take()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if let Some(base) = &self.base_url {
            let url = Url::parse(base).with_context(|| format!("Invalid base_url: {}", base))?;
            if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
                return Err(anyhow!("base_url must be an absolute http(s) URL: {}", base));
            }
        }
        Ok(())
    }
}
