use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;
use tracing::{error, info};

use crate::captions::WordEvent;

/// Mature, narrator-style neural voices for edge-tts.
pub const NATURAL_VOICES: &[&str] = &[
    "en-US-GuyNeural",
    "en-GB-RyanNeural",
    "en-US-ChristopherNeural",
    "en-US-DavisNeural",
    "en-GB-LibbyNeural",
    "en-US-AriaNeural",
];

const MALE_MARKERS: &[&str] = &["Guy", "Ryan", "Christopher", "Davis"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceGender {
    Male,
    Female,
}

pub fn pick_voice<R: Rng>(rng: &mut R, gender: Option<VoiceGender>) -> &'static str {
    let pool: Vec<&'static str> = match gender {
        Some(VoiceGender::Male) => NATURAL_VOICES
            .iter()
            .filter(|v| MALE_MARKERS.iter().any(|m| v.contains(m)))
            .copied()
            .collect(),
        Some(VoiceGender::Female) => NATURAL_VOICES
            .iter()
            .filter(|v| !MALE_MARKERS.iter().any(|m| v.contains(m)))
            .copied()
            .collect(),
        None => NATURAL_VOICES.to_vec(),
    };
    pool.choose(rng).copied().unwrap_or("en-US-GuyNeural")
}

/// Prepare a short quote for narration: collapse whitespace, drop commentary
/// riders after a colon or dash, keep one sentence, cap the word count.
pub fn sanitize_for_tts(text: &str) -> anyhow::Result<String> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        anyhow::bail!("Empty text passed to TTS");
    }

    let forbidden = [
        "here is", "here's", "this quote", "remember", "this means", "because",
        "which shows", "this reminds", "consider this", "think about", "reflect on",
    ];
    let lowered = text.to_lowercase();
    let mut text = if forbidden.iter().any(|f| lowered.contains(f)) {
        let re = Regex::new(r"[:\-]").unwrap();
        re.split(&text).last().unwrap_or(&text).trim().to_string()
    } else {
        text
    };

    if let Some(idx) = text.find(['.', '!', '?']) {
        text.truncate(idx);
    }

    Ok(text.split_whitespace().take(25).collect::<Vec<_>>().join(" "))
}

/// Narration produced by one synthesis call. `events` is empty when the
/// engine reports no per-word timing; the caption normalizer then estimates
/// from the overall audio duration.
#[derive(Debug)]
pub struct SpeechOutput {
    pub audio_path: PathBuf,
    pub events: Vec<WordEvent>,
}

/// Closed set of synthesis backends, both driven as subprocesses.
#[derive(Debug, Clone)]
pub enum TtsEngine {
    /// edge-tts CLI: mp3 audio plus a word-level VTT timing track.
    Edge { voice: String },
    /// piper CLI: wav audio, no word timing.
    Piper { model: String },
}

impl TtsEngine {
    pub fn synthesize(&self, text: &str, out_dir: &Path, tag: &str) -> anyhow::Result<SpeechOutput> {
        std::fs::create_dir_all(out_dir)?;
        match self {
            TtsEngine::Edge { voice } => synthesize_edge(voice, text, out_dir, tag),
            TtsEngine::Piper { model } => synthesize_piper(model, text, out_dir, tag),
        }
    }
}

fn synthesize_edge(voice: &str, text: &str, out_dir: &Path, tag: &str) -> anyhow::Result<SpeechOutput> {
    let audio_path = out_dir.join(format!("voice_{tag}.mp3"));
    let vtt_path = out_dir.join(format!("voice_{tag}.vtt"));
    info!("Calling edge-tts with voice {}", voice);

    let status = Command::new("edge-tts")
        .args(["--voice", voice, "--text", text, "--words-in-cue", "1"])
        .arg("--write-media")
        .arg(&audio_path)
        .arg("--write-subtitles")
        .arg(&vtt_path)
        .status()?;
    if !status.success() {
        error!("edge-tts failed for {}", audio_path.display());
        anyhow::bail!("edge-tts returned non-zero status");
    }

    let events = match std::fs::read_to_string(&vtt_path) {
        Ok(vtt) => parse_word_vtt(&vtt),
        Err(e) => {
            error!("Could not read word timing track {}: {}", vtt_path.display(), e);
            Vec::new()
        }
    };
    info!(
        "edge-tts produced {} with {} word boundaries",
        audio_path.display(),
        events.len()
    );
    Ok(SpeechOutput { audio_path, events })
}

/// Text on stdin, wav on disk. Piper reports no word boundaries, so callers
/// rely on the caption estimation fallback.
fn synthesize_piper(model: &str, text: &str, out_dir: &Path, tag: &str) -> anyhow::Result<SpeechOutput> {
    let audio_path = out_dir.join(format!("voice_{tag}.wav"));
    info!("Calling piper for output file {}", audio_path.display());

    let mut child = Command::new("piper")
        .args(["--model", model, "--output_file"])
        .arg(&audio_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .spawn()?;
    {
        let stdin = child
            .stdin
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Failed to open piper stdin"))?;
        stdin.write_all(text.as_bytes())?;
    }
    let status = child.wait()?;
    if !status.success() {
        error!("piper failed for {}", audio_path.display());
        anyhow::bail!("piper returned non-zero status");
    }
    Ok(SpeechOutput { audio_path, events: Vec::new() })
}

/// Parse the one-word-per-cue WebVTT track edge-tts writes alongside the
/// audio. Cues that fail to parse are skipped rather than aborting the run.
pub fn parse_word_vtt(vtt: &str) -> Vec<WordEvent> {
    let mut events = Vec::new();
    let mut lines = vtt.lines().peekable();
    while let Some(line) = lines.next() {
        let Some((start_raw, end_raw)) = line.split_once("-->") else {
            continue;
        };
        let (Some(start), Some(end)) = (
            parse_vtt_timestamp(start_raw.trim()),
            parse_vtt_timestamp(end_raw.trim()),
        ) else {
            continue;
        };
        let mut text = String::new();
        while let Some(next) = lines.peek() {
            if next.trim().is_empty() || next.contains("-->") {
                break;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(lines.next().unwrap_or_default().trim());
        }
        if text.is_empty() {
            continue;
        }
        events.push(WordEvent {
            text,
            start,
            duration: end.saturating_sub(start),
        });
    }
    events
}

/// `HH:MM:SS.mmm` or `MM:SS.mmm`.
fn parse_vtt_timestamp(raw: &str) -> Option<Duration> {
    let (clock, millis_raw) = raw.split_once('.')?;
    let millis: u64 = millis_raw.parse().ok()?;
    let parts: Vec<&str> = clock.split(':').collect();
    let (h, m, s): (u64, u64, u64) = match parts.as_slice() {
        [h, m, s] => (h.parse().ok()?, m.parse().ok()?, s.parse().ok()?),
        [m, s] => (0, m.parse().ok()?, s.parse().ok()?),
        _ => return None,
    };
    Some(Duration::from_millis(((h * 60 + m) * 60 + s) * 1000 + millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn vtt_timestamps() {
        assert_eq!(parse_vtt_timestamp("00:00:01.500"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_vtt_timestamp("01:02.250"), Some(Duration::from_millis(62250)));
        assert_eq!(parse_vtt_timestamp("garbage"), None);
    }

    #[test]
    fn parses_word_cues() {
        let vtt = "WEBVTT\n\n00:00:00.100 --> 00:00:00.600\nSuccess\n\n00:00:00.700 --> 00:00:00.900\nis\n";
        let events = parse_word_vtt(vtt);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].text, "Success");
        assert_eq!(events[0].start, Duration::from_millis(100));
        assert_eq!(events[0].duration, Duration::from_millis(500));
        assert_eq!(events[1].text, "is");
    }

    #[test]
    fn skips_malformed_cues() {
        let vtt = "WEBVTT\n\nnot-a-time --> also-not\nBroken\n\n00:00:01.000 --> 00:00:01.400\nFine\n";
        let events = parse_word_vtt(vtt);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].text, "Fine");
    }

    #[test]
    fn sanitization_keeps_one_sentence_and_caps_words() {
        let out = sanitize_for_tts("Keep going. Never stop. Ever.").unwrap();
        assert_eq!(out, "Keep going");
        assert!(sanitize_for_tts("   ").is_err());
    }

    #[test]
    fn sanitization_drops_commentary_preamble() {
        let out = sanitize_for_tts("Here is a quote: courage wins").unwrap();
        assert_eq!(out, "courage wins");
    }

    #[test]
    fn voice_pools_respect_gender() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            let v = pick_voice(&mut rng, Some(VoiceGender::Male));
            assert!(MALE_MARKERS.iter().any(|m| v.contains(m)));
            let v = pick_voice(&mut rng, Some(VoiceGender::Female));
            assert!(!MALE_MARKERS.iter().any(|m| v.contains(m)));
        }
    }
}
