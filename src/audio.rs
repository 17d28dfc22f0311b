use std::path::Path;
use std::process::Command;
use std::time::Duration;

use hound::WavReader;

/// Duration of any media file, preferring a direct WAV header read and
/// falling back to ffprobe for everything else (mp3 narration, stock video).
pub fn media_duration(path: &Path) -> anyhow::Result<Duration> {
    if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("wav")) {
        return wav_duration(path);
    }
    ffprobe_duration(path)
}

pub fn wav_duration(path: &Path) -> anyhow::Result<Duration> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples = reader.len();
    let frames = samples as f64 / spec.channels as f64;
    Ok(Duration::from_secs_f64(frames / spec.sample_rate as f64))
}

fn ffprobe_duration(path: &Path) -> anyhow::Result<Duration> {
    let output = Command::new("ffprobe")
        .args([
            "-v", "error",
            "-show_entries", "format=duration",
            "-of", "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()?;
    if !output.status.success() {
        anyhow::bail!("ffprobe failed for {}", path.display());
    }
    let seconds: f64 = String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Unparseable ffprobe duration for {}: {e}", path.display()))?;
    Ok(Duration::from_secs_f64(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    #[test]
    fn wav_duration_from_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..16_000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let dur = wav_duration(&path).unwrap();
        assert_eq!(dur, Duration::from_secs(1));
    }
}
