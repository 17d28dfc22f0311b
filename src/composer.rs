use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{error, info, warn};

/// Short clips get trailing silence and are clamped to the platform's
/// vertical-video sweet spot.
pub fn short_video_duration(voice: Duration) -> Duration {
    let base = (voice.as_secs_f64() + 3.0).max(8.0);
    Duration::from_secs_f64(base.min(40.0))
}

/// Long-form videos just pad the narration slightly.
pub fn long_video_duration(voice: Duration) -> Duration {
    voice + Duration::from_secs(2)
}

/// Path escaping for the ffmpeg `subtitles=` filter argument.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").replace(':', "\\:")
}

/// Escaping for inline `drawtext` payloads. Single quotes become typographic
/// apostrophes, which also reads better on screen.
pub fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\u{2019}")
        .replace('%', "\\%")
}

/// Greedy wrap for the static-text fallback, capped at five rows.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.len() > 5 {
        lines.truncate(5);
        if let Some(last) = lines.last_mut() {
            last.push_str("...");
        }
    }
    lines
}

/// What goes on top of the background visual.
#[derive(Debug, Clone)]
pub enum Overlay {
    /// Karaoke caption track burnt in via the `subtitles` filter.
    Captions(PathBuf),
    /// Static centered quote text for runs without timing data.
    StaticText(String),
    None,
}

#[derive(Debug, Clone)]
pub enum Background {
    Video(PathBuf),
    /// Several clips rotated via the concat demuxer (long form).
    Videos(Vec<PathBuf>),
    Image(PathBuf),
}

fn overlay_filter(overlay: &Overlay) -> String {
    match overlay {
        Overlay::Captions(path) => format!(",subtitles='{}'", escape_filter_path(path)),
        Overlay::StaticText(text) => {
            let wrapped = wrap_text(text, 25).join("\n");
            format!(
                ",drawtext=text='{}':fontsize=70:fontcolor=white:shadowcolor=black:\
                 shadowx=5:shadowy=5:x=(w-text_w)/2:y=(h-text_h)/2:line_spacing=15",
                escape_drawtext(&wrapped)
            )
        }
        Overlay::None => String::new(),
    }
}

/// 9:16 video chain: cover-scale and center-crop stock video, or slow
/// Ken Burns zoom over a still image.
fn short_video_chain(is_image: bool, duration: Duration, overlay: &Overlay) -> String {
    let frames = (duration.as_secs_f64() * 30.0) as u64;
    let base = if is_image {
        format!(
            "[0:v]scale=-1:1920,crop=1080:1920,zoompan=z='min(zoom+0.0005,1.1)':d={frames}:\
             x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':s=1080x1920"
        )
    } else {
        "[0:v]scale=1080:1920:force_original_aspect_ratio=increase,crop=1080:1920".to_string()
    };
    format!("{base}{}[vout]", overlay_filter(overlay))
}

/// 16:9 chain for long-form: cover-scale, crop, trim, vignette.
fn long_video_chain(duration: Duration, overlay: &Overlay) -> String {
    format!(
        "[0:v]scale=1920:1080:force_original_aspect_ratio=increase,crop=1920:1080,\
         trim=duration={:.3},vignette=angle=0.5{}[vout]",
        duration.as_secs_f64(),
        overlay_filter(overlay)
    )
}

/// Ducked, looped background music mixed under the narration. Without a
/// music input the narration passes through untouched.
fn audio_chain(has_music: bool, duration: Duration, music_volume: f64) -> String {
    if has_music {
        format!(
            "[2:a]volume={music_volume},aloop=loop=-1:size=2000000000,atrim=duration={d:.3}[bgm];\
             [1:a][bgm]amix=inputs=2:duration=longest,atrim=duration={d:.3}[aout]",
            d = duration.as_secs_f64()
        )
    } else {
        "[1:a]anull[aout]".to_string()
    }
}

/// Pick a random track from the music dir, if any exist.
pub fn pick_music<R: Rng>(music_dir: &Path, rng: &mut R) -> Option<PathBuf> {
    let entries = std::fs::read_dir(music_dir).ok()?;
    let tracks: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("mp3") || e.eq_ignore_ascii_case("ogg"))
        })
        .collect();
    if tracks.is_empty() {
        warn!("No music found in {}; proceeding without background music", music_dir.display());
        return None;
    }
    tracks.choose(rng).cloned()
}

fn run_ffmpeg(args: Vec<String>, output: &Path) -> anyhow::Result<PathBuf> {
    let status = Command::new("ffmpeg").args(&args).status()?;
    if !status.success() {
        error!("ffmpeg failed to produce {}", output.display());
        anyhow::bail!("ffmpeg render failed");
    }
    info!("Video created: {}", output.display());
    Ok(output.to_path_buf())
}

/// Render a 1080x1920 short. `background` is a stock clip or a generated
/// still; the narration is always input 1, music (if any) input 2.
pub fn render_short(
    background: &Background,
    voice_path: &Path,
    overlay: &Overlay,
    music_path: Option<&Path>,
    duration: Duration,
    output: &Path,
) -> anyhow::Result<PathBuf> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut args: Vec<String> = vec!["-y".into()];
    let is_image = match background {
        Background::Image(path) => {
            args.extend(["-loop".into(), "1".into(), "-t".into(), format!("{:.3}", duration.as_secs_f64())]);
            args.extend(["-i".into(), path.to_string_lossy().into_owned()]);
            true
        }
        Background::Video(path) => {
            args.extend(["-stream_loop".into(), "-1".into()]);
            args.extend(["-i".into(), path.to_string_lossy().into_owned()]);
            false
        }
        Background::Videos(_) => anyhow::bail!("Multi-clip backgrounds are for long-form renders"),
    };
    args.extend(["-i".into(), voice_path.to_string_lossy().into_owned()]);
    if let Some(music) = music_path {
        args.extend(["-i".into(), music.to_string_lossy().into_owned()]);
    }
    let graph = format!(
        "{};{}",
        short_video_chain(is_image, duration, overlay),
        audio_chain(music_path.is_some(), duration, 0.1)
    );
    args.extend(["-filter_complex".into(), graph]);
    args.extend(common_output_args(duration));
    args.push(output.to_string_lossy().into_owned());
    run_ffmpeg(args, output)
}

/// Render a 1920x1080 long-form video. Multiple background clips are looped
/// through the concat demuxer; the list file lives next to the output.
pub fn render_long(
    background: &Background,
    voice_path: &Path,
    overlay: &Overlay,
    music_path: Option<&Path>,
    duration: Duration,
    output: &Path,
) -> anyhow::Result<PathBuf> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut args: Vec<String> = vec!["-y".into()];
    match background {
        Background::Image(path) => {
            args.extend(["-loop".into(), "1".into(), "-t".into(), format!("{:.3}", duration.as_secs_f64())]);
            args.extend(["-i".into(), path.to_string_lossy().into_owned()]);
        }
        Background::Video(path) => {
            args.extend(["-stream_loop".into(), "-1".into()]);
            args.extend(["-i".into(), path.to_string_lossy().into_owned()]);
        }
        Background::Videos(paths) => {
            let list_path = output.with_extension("clips.txt");
            write_concat_list(&list_path, paths)?;
            args.extend(["-stream_loop".into(), "-1".into()]);
            args.extend(["-f".into(), "concat".into(), "-safe".into(), "0".into()]);
            args.extend(["-i".into(), list_path.to_string_lossy().into_owned()]);
        }
    }
    args.extend(["-i".into(), voice_path.to_string_lossy().into_owned()]);
    if let Some(music) = music_path {
        args.extend(["-i".into(), music.to_string_lossy().into_owned()]);
    }
    let graph = format!(
        "{};{}",
        long_video_chain(duration, overlay),
        audio_chain(music_path.is_some(), duration, 0.15)
    );
    args.extend(["-filter_complex".into(), graph]);
    args.extend(common_output_args(duration));
    args.push(output.to_string_lossy().into_owned());
    run_ffmpeg(args, output)
}

fn common_output_args(duration: Duration) -> Vec<String> {
    vec![
        "-map".into(), "[vout]".into(),
        "-map".into(), "[aout]".into(),
        "-c:v".into(), "libx264".into(),
        "-c:a".into(), "aac".into(),
        "-pix_fmt".into(), "yuv420p".into(),
        "-r".into(), "30".into(),
        "-t".into(), format!("{:.3}", duration.as_secs_f64()),
    ]
}

fn write_concat_list(list_path: &Path, clips: &[PathBuf]) -> anyhow::Result<()> {
    let mut f = File::create(list_path)?;
    for clip in clips {
        let absolute = std::fs::canonicalize(clip).unwrap_or_else(|_| clip.clone());
        writeln!(f, "file '{}'", absolute.to_string_lossy().replace('\'', "'\\''"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn short_duration_clamps() {
        assert_eq!(short_video_duration(secs(2.0)), secs(8.0));
        assert_eq!(short_video_duration(secs(10.0)), secs(13.0));
        assert_eq!(short_video_duration(secs(120.0)), secs(40.0));
    }

    #[test]
    fn subtitle_path_escaping() {
        let path = Path::new("C:\\tmp\\captions.ass");
        assert_eq!(escape_filter_path(path), "C\\:/tmp/captions.ass");
    }

    #[test]
    fn drawtext_escaping() {
        assert_eq!(escape_drawtext("it's 100%: go"), "it\u{2019}s 100\\%\\: go");
    }

    #[test]
    fn wrap_caps_at_five_lines() {
        let text = vec!["word"; 60].join(" ");
        let lines = wrap_text(&text, 25);
        assert_eq!(lines.len(), 5);
        assert!(lines[4].ends_with("..."));
    }

    #[test]
    fn short_chain_uses_zoompan_for_images() {
        let chain = short_video_chain(true, secs(10.0), &Overlay::None);
        assert!(chain.contains("zoompan"));
        assert!(chain.contains("d=300"));
        assert!(chain.ends_with("[vout]"));
    }

    #[test]
    fn short_chain_scales_video_to_cover() {
        let chain = short_video_chain(false, secs(10.0), &Overlay::None);
        assert!(chain.contains("scale=1080:1920:force_original_aspect_ratio=increase"));
        assert!(!chain.contains("zoompan"));
    }

    #[test]
    fn caption_overlay_is_escaped_into_chain() {
        let overlay = Overlay::Captions(PathBuf::from("tmp/captions.ass"));
        let chain = short_video_chain(false, secs(10.0), &overlay);
        assert!(chain.contains("subtitles='tmp/captions.ass'"));
    }

    #[test]
    fn static_text_overlay_wraps_and_centers() {
        let overlay = Overlay::StaticText("discipline beats motivation every day".to_string());
        let chain = short_video_chain(true, secs(8.0), &overlay);
        assert!(chain.contains("drawtext"));
        assert!(chain.contains("(w-text_w)/2"));
    }

    #[test]
    fn long_chain_has_vignette_and_trim() {
        let chain = long_video_chain(secs(90.0), &Overlay::None);
        assert!(chain.contains("vignette=angle=0.5"));
        assert!(chain.contains("trim=duration=90.000"));
        assert!(chain.contains("1920:1080"));
    }

    #[test]
    fn audio_chain_mixes_when_music_present() {
        let with = audio_chain(true, secs(20.0), 0.1);
        assert!(with.contains("volume=0.1"));
        assert!(with.contains("amix=inputs=2"));
        assert!(with.contains("atrim=duration=20.000"));
        let without = audio_chain(false, secs(20.0), 0.1);
        assert_eq!(without, "[1:a]anull[aout]");
    }
}
