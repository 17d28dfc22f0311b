use std::path::Path;

use anyhow::Context;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::auth::StoredToken;

const YOUTUBE_UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const DRIVE_UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=resumable&fields=id,webViewLink";

pub fn youtube_metadata(title: &str, description: &str, tags: &[String], privacy: &str) -> Value {
    json!({
        "snippet": {
            "title": title.chars().take(100).collect::<String>(),
            "description": description,
            "tags": tags,
            "categoryId": "22"
        },
        "status": {
            "privacyStatus": privacy,
            "selfDeclaredMadeForKids": false
        }
    })
}

/// Two-step resumable upload: register the metadata, then PUT the bytes to
/// the session URL Google hands back. Returns the published video id.
pub async fn upload_to_youtube(
    client: &reqwest::Client,
    token: &StoredToken,
    video_path: &Path,
    title: &str,
    description: &str,
    tags: &[String],
    privacy: &str,
) -> anyhow::Result<String> {
    let metadata = youtube_metadata(title, description, tags, privacy);
    let session_url = begin_resumable(client, token, YOUTUBE_UPLOAD_URL, &metadata).await?;

    info!("Uploading {} to YouTube...", video_path.display());
    let bytes = std::fs::read(video_path)
        .with_context(|| format!("Could not read {}", video_path.display()))?;
    let resp = client
        .put(&session_url)
        .bearer_auth(&token.access_token)
        .header("Content-Type", "video/mp4")
        .body(bytes)
        .send()
        .await?
        .error_for_status()
        .context("YouTube upload rejected")?;
    let body: Value = resp.json().await?;
    let id = body
        .get("id")
        .and_then(Value::as_str)
        .context("YouTube response missing video id")?
        .to_string();
    info!("Upload complete! Video ID: {}", id);
    Ok(id)
}

/// Find a Drive folder by name or create it. Files land in this folder so
/// repeated runs don't litter the Drive root.
async fn drive_folder_id(
    client: &reqwest::Client,
    token: &StoredToken,
    folder_name: &str,
) -> anyhow::Result<String> {
    let query = format!(
        "mimeType='application/vnd.google-apps.folder' and name='{folder_name}' and trashed=false"
    );
    let resp = client
        .get(DRIVE_FILES_URL)
        .bearer_auth(&token.access_token)
        .query(&[("q", query.as_str()), ("fields", "files(id,name)")])
        .send()
        .await?
        .error_for_status()?;
    let body: Value = resp.json().await?;
    if let Some(id) = body
        .get("files")
        .and_then(|f| f.get(0))
        .and_then(|f| f.get("id"))
        .and_then(Value::as_str)
    {
        return Ok(id.to_string());
    }

    let resp = client
        .post(DRIVE_FILES_URL)
        .bearer_auth(&token.access_token)
        .json(&json!({
            "name": folder_name,
            "mimeType": "application/vnd.google-apps.folder"
        }))
        .send()
        .await?
        .error_for_status()?;
    let body: Value = resp.json().await?;
    let id = body
        .get("id")
        .and_then(Value::as_str)
        .context("Drive folder creation returned no id")?
        .to_string();
    info!("Created new Drive folder: {}", folder_name);
    Ok(id)
}

/// Backup the rendered video to Drive. Returns the shareable web view link.
pub async fn upload_to_drive(
    client: &reqwest::Client,
    token: &StoredToken,
    video_path: &Path,
    folder_name: &str,
) -> anyhow::Result<String> {
    let folder_id = match drive_folder_id(client, token, folder_name).await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("Could not resolve Drive folder '{}': {}", folder_name, e);
            None
        }
    };
    let file_name = video_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video.mp4".to_string());
    let mut metadata = json!({ "name": file_name });
    if let Some(id) = folder_id {
        metadata["parents"] = json!([id]);
    }

    let session_url = begin_resumable(client, token, DRIVE_UPLOAD_URL, &metadata).await?;
    info!("Uploading {} to Drive folder '{}'...", video_path.display(), folder_name);
    let bytes = std::fs::read(video_path)
        .with_context(|| format!("Could not read {}", video_path.display()))?;
    let resp = client
        .put(&session_url)
        .bearer_auth(&token.access_token)
        .header("Content-Type", "video/mp4")
        .body(bytes)
        .send()
        .await?
        .error_for_status()
        .context("Drive upload rejected")?;
    let body: Value = resp.json().await?;
    let link = body
        .get("webViewLink")
        .and_then(Value::as_str)
        .context("Drive response missing webViewLink")?
        .to_string();
    info!("Drive upload complete");
    Ok(link)
}

async fn begin_resumable(
    client: &reqwest::Client,
    token: &StoredToken,
    url: &str,
    metadata: &Value,
) -> anyhow::Result<String> {
    let resp = client
        .post(url)
        .bearer_auth(&token.access_token)
        .json(metadata)
        .send()
        .await?
        .error_for_status()
        .context("Resumable upload session rejected")?;
    resp.headers()
        .get("Location")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .context("Upload session response missing Location header")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn youtube_metadata_truncates_title() {
        let long_title = "x".repeat(150);
        let meta = youtube_metadata(&long_title, "desc", &[], "private");
        assert_eq!(meta["snippet"]["title"].as_str().unwrap().len(), 100);
        assert_eq!(meta["snippet"]["categoryId"], "22");
        assert_eq!(meta["status"]["privacyStatus"], "private");
    }
}
