use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Stored OAuth credentials for the YouTube/Drive scopes. The interactive
/// consent flow is out of scope; the token file must be provisioned with a
/// refresh token once, after which access tokens are refreshed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

pub fn load_token(path: &Path) -> anyhow::Result<StoredToken> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Token file {} not found; provision it before uploading", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid token file {}", path.display()))
}

/// Exchange the refresh token for a fresh access token and persist it.
pub async fn refresh_access_token(
    client: &reqwest::Client,
    token: &mut StoredToken,
    path: &Path,
) -> anyhow::Result<()> {
    info!("Refreshing Google OAuth access token");
    let resp = client
        .post(TOKEN_ENDPOINT)
        .form(&[
            ("client_id", token.client_id.as_str()),
            ("client_secret", token.client_secret.as_str()),
            ("refresh_token", token.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?
        .error_for_status()
        .context("OAuth token refresh rejected")?;
    let refreshed: RefreshResponse = resp.json().await?;
    token.access_token = refreshed.access_token;
    std::fs::write(path, serde_json::to_string_pretty(token)?)
        .with_context(|| format!("Failed to persist refreshed token to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_through_json() {
        let token = StoredToken {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
            access_token: String::new(),
        };
        let json = serde_json::to_string(&token).unwrap();
        let back: StoredToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back.refresh_token, "refresh");
    }

    #[test]
    fn access_token_defaults_when_missing() {
        let raw = r#"{"client_id":"a","client_secret":"b","refresh_token":"c"}"#;
        let token: StoredToken = serde_json::from_str(raw).unwrap();
        assert!(token.access_token.is_empty());
    }
}
