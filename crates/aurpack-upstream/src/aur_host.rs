use std::time::Duration;

use anyhow::{Context, Result};
use aurpack_core::{AurError, ProbeStatus, RecipeHost};
use reqwest::blocking::Client;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for a cgit-fronted recipe repository.
#[derive(Debug, Clone)]
pub struct AurHost {
    base_url: String,
    client: Client,
}

impl AurHost {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("aurpack/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build recipe host HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_recipe(&self, name: &str) -> Result<reqwest::blocking::Response> {
        let url = recipe_url(&self.base_url, name);
        debug!("fetching recipe {url}");
        self.client.get(&url).send().map_err(|err| {
            AurError::Resolution {
                name: name.to_string(),
                reason: format!("recipe host request failed: {err}"),
            }
            .into()
        })
    }
}

impl RecipeHost for AurHost {
    fn fetch_recipe(&self, name: &str) -> Result<Option<String>> {
        let response = self.get_recipe(name)?;
        match classify_status(response.status().as_u16()) {
            ProbeStatus::Found => {}
            ProbeStatus::NotFound => return Ok(None),
            ProbeStatus::Unexpected(status) => {
                return Err(AurError::UnexpectedUpstreamResponse {
                    name: name.to_string(),
                    status,
                }
                .into())
            }
        }

        let text = response.text().map_err(|err| AurError::Resolution {
            name: name.to_string(),
            reason: format!("failed to read recipe body: {err}"),
        })?;
        Ok(Some(text))
    }

    fn probe(&self, name: &str) -> Result<ProbeStatus> {
        let response = self.get_recipe(name)?;
        Ok(classify_status(response.status().as_u16()))
    }

    fn snapshot_url(&self, name: &str) -> String {
        snapshot_url(&self.base_url, name)
    }
}

pub fn recipe_url(base_url: &str, name: &str) -> String {
    format!(
        "{}/cgit/aur.git/plain/PKGBUILD?h={name}",
        base_url.trim_end_matches('/')
    )
}

pub fn snapshot_url(base_url: &str, name: &str) -> String {
    format!(
        "{}/cgit/aur.git/snapshot/{name}.tar.gz",
        base_url.trim_end_matches('/')
    )
}

pub fn classify_status(status: u16) -> ProbeStatus {
    match status {
        200..=299 => ProbeStatus::Found,
        404 => ProbeStatus::NotFound,
        other => ProbeStatus::Unexpected(other),
    }
}
