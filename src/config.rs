use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub access_token: String,
    pub base_url: String,
    pub api_version: String,
    pub ad_account_id: Option<String>, // Optional default account for demos/tools
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            access_token: std::env::var("GRAPH_API_TOKEN")
                .map_err(|_| anyhow::anyhow!("GRAPH_API_TOKEN environment variable required"))
                .and_then(|token| {
                    if token.trim().is_empty() {
                        anyhow::bail!("GRAPH_API_TOKEN cannot be empty");
                    }
                    Ok(token)
                })?,
            base_url: std::env::var("GRAPH_API_BASE_URL")
                .unwrap_or_else(|_| "https://graph.facebook.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            api_version: std::env::var("GRAPH_API_VERSION")
                .unwrap_or_else(|_| "v19.0".to_string()),
            ad_account_id: std::env::var("GRAPH_AD_ACCOUNT_ID")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            anyhow::bail!("GRAPH_API_BASE_URL must start with http:// or https://");
        }
        if !is_valid_version(&config.api_version) {
            anyhow::bail!("GRAPH_API_VERSION must look like v19.0");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Graph API base URL: {}", config.base_url);
        tracing::debug!("Graph API version: {}", config.api_version);
        if let Some(ref account) = config.ad_account_id {
            tracing::debug!("Default ad account: {}", account);
        }

        Ok(config)
    }
}

/// Versions are `v<major>.<minor>`, e.g. `v19.0`.
fn is_valid_version(version: &str) -> bool {
    let Some(rest) = version.strip_prefix('v') else {
        return false;
    };
    let mut parts = rest.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(major), Some(minor), None) => {
            !major.is_empty()
                && !minor.is_empty()
                && major.chars().all(|c| c.is_ascii_digit())
                && minor.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_validation() {
        assert!(is_valid_version("v19.0"));
        assert!(is_valid_version("v21.0"));
        assert!(is_valid_version("v2.12"));

        assert!(!is_valid_version("19.0"));
        assert!(!is_valid_version("v19"));
        assert!(!is_valid_version("v19.0.1"));
        assert!(!is_valid_version("v.0"));
        assert!(!is_valid_version("vXX.0"));
        assert!(!is_valid_version(""));
    }
}
