use std::path::Path;

use tracing::{info, warn};

use crate::visuals::download;

/// Direct links to CC0 / public-domain loops used to seed an empty music dir.
const MUSIC_URLS: &[&str] = &[
    "https://upload.wikimedia.org/wikipedia/commons/e/e8/Classical_music_loop_simple.ogg",
    "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3",
    "https://archive.org/download/Mythium/Mythium_vbr.mp3",
];

/// Make sure at least one background track exists, downloading the first
/// reachable default when the directory is empty. Failure is non-fatal: the
/// composer simply renders without music.
pub async fn ensure_music_assets(client: &reqwest::Client, music_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(music_dir)?;
    let has_tracks = std::fs::read_dir(music_dir)?.filter_map(|e| e.ok()).any(|e| {
        e.path()
            .extension()
            .is_some_and(|x| x.eq_ignore_ascii_case("mp3") || x.eq_ignore_ascii_case("ogg"))
    });
    if has_tracks {
        info!("Music assets found in {}", music_dir.display());
        return Ok(());
    }

    info!("No music found; downloading default assets");
    for (i, url) in MUSIC_URLS.iter().enumerate() {
        let ext = if url.ends_with(".ogg") { "ogg" } else { "mp3" };
        let path = music_dir.join(format!("music_loop_{}.{}", i + 1, ext));
        match download(client, url, &path).await {
            Ok(()) => {
                info!("Downloaded music track: {}", path.display());
                return Ok(());
            }
            Err(e) => warn!("Failed to download music from {}: {}", url, e),
        }
    }
    warn!("Could not fetch any default music; continuing without");
    Ok(())
}
