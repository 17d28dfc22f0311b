use std::path::{Path, PathBuf};
use std::process::Command;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::{info, warn};

/// Background prompts kept deliberately generic so generated images contain
/// no rendered text competing with the captions.
pub const ABSTRACT_PROMPTS: &[&str] = &[
    "abstract gradient background, soft colors, inspirational atmosphere",
    "minimalist background, smooth gradients, calming colors",
    "cinematic lighting, abstract shapes, inspirational mood",
    "soft bokeh background, dreamy atmosphere, elegant composition",
    "abstract waves, flowing colors, peaceful ambiance",
];

pub fn abstract_prompt<R: Rng>(rng: &mut R) -> &'static str {
    ABSTRACT_PROMPTS.choose(rng).copied().unwrap_or(ABSTRACT_PROMPTS[0])
}

#[derive(Debug, Deserialize)]
struct PexelsSearch {
    #[serde(default)]
    videos: Vec<PexelsVideo>,
}

#[derive(Debug, Deserialize)]
pub struct PexelsVideo {
    pub id: u64,
    #[serde(default)]
    pub video_files: Vec<PexelsVideoFile>,
}

#[derive(Debug, Deserialize)]
pub struct PexelsVideoFile {
    pub link: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub file_type: String,
}

/// Highest-resolution mp4, falling back to the largest file of any type.
pub fn select_best_file(files: &[PexelsVideoFile]) -> Option<&PexelsVideoFile> {
    let mut sorted: Vec<&PexelsVideoFile> = files.iter().collect();
    sorted.sort_by_key(|f| std::cmp::Reverse(u64::from(f.width) * u64::from(f.height)));
    sorted
        .iter()
        .find(|f| f.file_type == "video/mp4")
        .or_else(|| sorted.first())
        .copied()
}

async fn pexels_search(
    client: &reqwest::Client,
    api_key: &str,
    query: &str,
    orientation: &str,
    per_page: usize,
) -> anyhow::Result<Vec<PexelsVideo>> {
    let url = format!(
        "https://api.pexels.com/videos/search?query={}&orientation={}&per_page={}&size=medium",
        urlencoding::encode(query),
        orientation,
        per_page
    );
    let resp = client
        .get(&url)
        .header("Authorization", api_key)
        .send()
        .await?
        .error_for_status()?;
    let search: PexelsSearch = resp.json().await?;
    Ok(search.videos)
}

/// Fetch one stock video matching the query. Returns `None` when no API key
/// is configured or the search comes back empty, so the caller can fall back
/// to image generation.
pub async fn fetch_video_background<R: Rng>(
    client: &reqwest::Client,
    query: &str,
    orientation: &str,
    out_dir: &Path,
    rng: &mut R,
) -> anyhow::Result<Option<PathBuf>> {
    let Ok(api_key) = std::env::var("PEXELS_API_KEY") else {
        warn!("PEXELS_API_KEY not set; skipping stock video search");
        return Ok(None);
    };
    let videos = pexels_search(client, &api_key, query, orientation, 5).await?;
    if videos.is_empty() {
        warn!("No stock videos found for query: {}", query);
        return Ok(None);
    }
    let video = videos.choose(rng).expect("non-empty video list");
    let Some(best) = select_best_file(&video.video_files) else {
        return Ok(None);
    };
    let path = out_dir.join(format!("bg_video_{}.mp4", video.id));
    info!("Downloading background video {} from Pexels", video.id);
    download(client, &best.link, &path).await?;
    Ok(Some(path))
}

/// Fetch several distinct stock videos for long-form background rotation.
pub async fn fetch_video_backgrounds<R: Rng>(
    client: &reqwest::Client,
    query: &str,
    orientation: &str,
    out_dir: &Path,
    count: usize,
    rng: &mut R,
) -> anyhow::Result<Vec<PathBuf>> {
    let Ok(api_key) = std::env::var("PEXELS_API_KEY") else {
        warn!("PEXELS_API_KEY not set; skipping stock video search");
        return Ok(Vec::new());
    };
    let mut videos = pexels_search(client, &api_key, query, orientation, count + 5).await?;
    videos.shuffle(rng);
    let mut paths = Vec::new();
    for video in videos.iter().take(count) {
        let Some(best) = select_best_file(&video.video_files) else {
            continue;
        };
        let path = out_dir.join(format!("bg_video_{}.mp4", video.id));
        info!("Downloading background video {} from Pexels", video.id);
        match download(client, &best.link, &path).await {
            Ok(()) => paths.push(path),
            Err(e) => warn!("Failed to download video {}: {}", video.id, e),
        }
    }
    Ok(paths)
}

/// Generate a background image via Pollinations.ai (free, no API key).
/// Returns `None` on failure so the caller can use the gradient fallback.
pub async fn generate_image<R: Rng>(
    client: &reqwest::Client,
    prompt: &str,
    out_dir: &Path,
    width: u32,
    height: u32,
    rng: &mut R,
) -> anyhow::Result<Option<PathBuf>> {
    let enhanced = format!(
        "{prompt}, abstract background, cinematic lighting, high quality, \
         NO TEXT, NO LETTERS, NO WORDS, NO WATERMARK, NO LOGO, plain background"
    );
    let url = format!(
        "https://image.pollinations.ai/prompt/{}?width={}&height={}&nologo=true",
        urlencoding::encode(&enhanced),
        width,
        height
    );
    info!("Generating image with Pollinations.ai: {}", prompt);
    let path = out_dir.join(format!("bg_image_{:04}.png", rng.gen_range(0..10_000)));
    match download(client, &url, &path).await {
        Ok(()) => Ok(Some(path)),
        Err(e) => {
            warn!("Pollinations.ai failed: {}", e);
            Ok(None)
        }
    }
}

/// Last-resort background: a two-color gradient rendered by ffmpeg's lavfi
/// `gradients` source, with hues drawn from the caller's RNG.
pub fn gradient_fallback<R: Rng>(
    out_dir: &Path,
    width: u32,
    height: u32,
    rng: &mut R,
) -> anyhow::Result<PathBuf> {
    let c0: u32 = rng.gen_range(0x101020..0x404060);
    let c1: u32 = rng.gen_range(0x405080..0x8090c0);
    let path = out_dir.join(format!("bg_fallback_{:04}.png", rng.gen_range(0..10_000)));
    info!("Generating gradient fallback background");
    let spec = format!("gradients=s={width}x{height}:c0=0x{c0:06x}:c1=0x{c1:06x}:n=2");
    let status = Command::new("ffmpeg")
        .args(["-y", "-f", "lavfi", "-i", &spec, "-frames:v", "1"])
        .arg(&path)
        .status()?;
    if !status.success() {
        anyhow::bail!("ffmpeg failed to render gradient fallback");
    }
    Ok(path)
}

pub async fn download(client: &reqwest::Client, url: &str, path: &Path) -> anyhow::Result<()> {
    let resp = client.get(url).send().await?.error_for_status()?;
    let bytes = resp.bytes().await?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(link: &str, w: u32, h: u32, ty: &str) -> PexelsVideoFile {
        PexelsVideoFile {
            link: link.to_string(),
            width: w,
            height: h,
            file_type: ty.to_string(),
        }
    }

    #[test]
    fn prefers_highest_resolution_mp4() {
        let files = vec![
            file("low.mp4", 640, 360, "video/mp4"),
            file("big.webm", 3840, 2160, "video/webm"),
            file("hd.mp4", 1920, 1080, "video/mp4"),
        ];
        assert_eq!(select_best_file(&files).unwrap().link, "hd.mp4");
    }

    #[test]
    fn falls_back_to_largest_when_no_mp4() {
        let files = vec![
            file("a.webm", 640, 360, "video/webm"),
            file("b.webm", 1920, 1080, "video/webm"),
        ];
        assert_eq!(select_best_file(&files).unwrap().link, "b.webm");
    }

    #[test]
    fn empty_file_list_yields_none() {
        assert!(select_best_file(&[]).is_none());
    }

    #[test]
    fn search_response_parses_with_missing_fields() {
        let raw = r#"{"videos":[{"id":42,"video_files":[{"link":"x.mp4","file_type":"video/mp4"}]}]}"#;
        let search: PexelsSearch = serde_json::from_str(raw).unwrap();
        assert_eq!(search.videos[0].id, 42);
        assert_eq!(search.videos[0].video_files[0].width, 0);
    }
}
