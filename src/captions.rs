use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::CaptionError;

/// Characters per visual row before wrapping.
pub const MAX_LINE_CHARS: usize = 25;
/// Characters of speech per cue in long-form mode before a new cue starts.
pub const MAX_CUE_CHARS: usize = 50;
/// Gap extension so adjacent cues don't flash between sub-threshold gaps.
pub const BRIDGE_PAD: Duration = Duration::from_millis(250);
/// Extra hold time on the last (or only) cue.
pub const TRAIL_PAD: Duration = Duration::from_millis(500);
/// Words longer than this (letters only) get emphasis styling.
const EMPHASIS_MIN_CHARS: usize = 7;

/// One spoken word as timed by the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordEvent {
    pub text: String,
    pub start: Duration,
    pub duration: Duration,
}

impl WordEvent {
    pub fn from_nanos(text: impl Into<String>, start_ns: u64, duration_ns: u64) -> Self {
        WordEvent {
            text: text.into(),
            start: Duration::from_nanos(start_ns),
            duration: Duration::from_nanos(duration_ns),
        }
    }

    pub fn end(&self) -> Duration {
        self.start + self.duration
    }
}

/// Overall utterance boundary, used when the synthesizer emitted no
/// per-word events.
#[derive(Debug, Clone, Copy)]
pub struct Utterance {
    pub start: Duration,
    pub duration: Duration,
}

/// Presentation mode. Short clips get a single cue with all lines on screen
/// throughout; long-form clips advance through multiple cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Short,
    Long,
}

impl Mode {
    /// Long-form strictly above the threshold, short-form at or below it.
    pub fn for_duration(total: Duration, threshold: Duration) -> Self {
        if total > threshold { Mode::Long } else { Mode::Short }
    }
}

/// Named style records declared in the document header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueStyle {
    Default,
    Highlight,
    Important,
}

impl CueStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            CueStyle::Default => "Default",
            CueStyle::Highlight => "Highlight",
            CueStyle::Important => "Important",
        }
    }
}

/// One visual row of words within a cue.
#[derive(Debug, Clone)]
pub struct Line {
    pub words: Vec<WordEvent>,
}

impl Line {
    /// Words plus inter-word spaces.
    pub fn char_len(&self) -> usize {
        joined_char_len(&self.words)
    }
}

fn joined_char_len(words: &[WordEvent]) -> usize {
    let chars: usize = words.iter().map(|w| w.text.chars().count()).sum();
    chars + words.len().saturating_sub(1)
}

/// One timed caption block.
#[derive(Debug, Clone)]
pub struct Cue {
    pub start: Duration,
    pub end: Duration,
    pub lines: Vec<Line>,
    pub style: CueStyle,
}

impl Cue {
    pub fn words(&self) -> impl Iterator<Item = &WordEvent> {
        self.lines.iter().flat_map(|l| l.words.iter())
    }
}

#[derive(Debug, Clone)]
pub struct CaptionDocument {
    pub play_res_x: u32,
    pub play_res_y: u32,
    pub cues: Vec<Cue>,
}

#[derive(Debug, Clone)]
pub struct CaptionOptions {
    pub mode: Mode,
    pub target_duration: Option<Duration>,
    pub play_res_x: u32,
    pub play_res_y: u32,
    pub keywords: Vec<String>,
}

impl Default for CaptionOptions {
    fn default() -> Self {
        CaptionOptions {
            mode: Mode::Short,
            target_duration: None,
            play_res_x: 1080,
            play_res_y: 1920,
            keywords: Vec::new(),
        }
    }
}

/// Guarantee a usable timing sequence: pass word events through when they
/// exist, otherwise estimate per-word timing from the utterance boundary by
/// distributing its duration proportionally to each word's character length.
/// This is a captioning heuristic, not lip-sync.
pub fn normalize_events(
    events: Vec<WordEvent>,
    full_text: &str,
    utterance: Option<Utterance>,
) -> Result<Vec<WordEvent>, CaptionError> {
    if !events.is_empty() {
        return Ok(events);
    }

    let Some(utt) = utterance else {
        return Err(CaptionError::NoTimingData);
    };

    let words: Vec<&str> = full_text.split_whitespace().collect();
    if words.is_empty() {
        return Err(CaptionError::EmptyInput);
    }

    debug!(
        "No word boundaries from synthesizer; estimating {} words over {:.2}s",
        words.len(),
        utt.duration.as_secs_f64()
    );

    let total_chars: u128 = words.iter().map(|w| w.chars().count() as u128).sum();
    let total_ns = utt.duration.as_nanos();
    let base_ns = utt.start.as_nanos();

    // Cumulative boundaries so durations sum exactly to the utterance and
    // offsets stay monotone regardless of integer division.
    let mut estimated = Vec::with_capacity(words.len());
    let mut chars_before: u128 = 0;
    for word in words {
        let chars_after = chars_before + word.chars().count() as u128;
        let start_ns = base_ns + total_ns * chars_before / total_chars;
        let end_ns = base_ns + total_ns * chars_after / total_chars;
        estimated.push(WordEvent {
            text: word.to_string(),
            start: Duration::from_nanos(start_ns as u64),
            duration: Duration::from_nanos((end_ns - start_ns) as u64),
        });
        chars_before = chars_after;
    }
    Ok(estimated)
}

/// Greedy left-to-right packing under a character budget. A single word
/// longer than the budget is placed alone; no word is split or dropped.
fn greedy_partition(words: &[WordEvent], budget: usize) -> Vec<Vec<WordEvent>> {
    let mut groups = Vec::new();
    let mut current: Vec<WordEvent> = Vec::new();

    for word in words {
        let word_len = word.text.chars().count();
        if !current.is_empty() && joined_char_len(&current) + 1 + word_len > budget {
            groups.push(std::mem::take(&mut current));
        }
        current.push(word.clone());
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

fn pack_lines(words: &[WordEvent], budget: usize) -> Vec<Line> {
    greedy_partition(words, budget)
        .into_iter()
        .map(|words| Line { words })
        .collect()
}

/// Compile normalized word events into a complete caption document.
/// Pure over its arguments; serialization happens separately.
pub fn compile(events: &[WordEvent], opts: &CaptionOptions) -> Result<CaptionDocument, CaptionError> {
    if events.is_empty() {
        return Err(CaptionError::EmptyInput);
    }

    let cues = match opts.mode {
        Mode::Short => vec![build_single_cue(events, opts.target_duration)],
        Mode::Long => build_segmented_cues(events, opts.target_duration, &opts.keywords),
    };

    let placed: usize = cues.iter().map(|c| c.words().count()).sum();
    debug!("Compiled {} cue(s) placing {} word events", cues.len(), placed);

    Ok(CaptionDocument {
        play_res_x: opts.play_res_x,
        play_res_y: opts.play_res_y,
        cues,
    })
}

/// Short-form: one cue spanning the whole utterance, all lines shown at once
/// and highlighted progressively.
fn build_single_cue(events: &[WordEvent], target_duration: Option<Duration>) -> Cue {
    let start = events[0].start;
    let raw_end = events.iter().map(|w| w.end()).max().unwrap_or(start);
    let mut end = target_duration.unwrap_or(raw_end + TRAIL_PAD);
    if end <= start {
        warn!(
            "Target duration {:.2}s does not cover caption start; extending",
            end.as_secs_f64()
        );
        end = raw_end + TRAIL_PAD;
    }
    Cue {
        start,
        end,
        lines: pack_lines(events, MAX_LINE_CHARS),
        style: CueStyle::Highlight,
    }
}

/// Long-form: successive groups bounded by a per-cue character budget, each
/// bridged into the next so sub-pad gaps don't flash. Cues that carry a
/// configured keyword use the Important style record.
fn build_segmented_cues(
    events: &[WordEvent],
    target_duration: Option<Duration>,
    keywords: &[String],
) -> Vec<Cue> {
    let groups = greedy_partition(events, MAX_CUE_CHARS);
    let mut cues = Vec::with_capacity(groups.len());

    for (i, group) in groups.iter().enumerate() {
        let start = group[0].start;
        let raw_end = group.iter().map(|w| w.end()).max().unwrap_or(start);
        let end = match groups.get(i + 1) {
            Some(next) => {
                let next_start = next[0].start;
                // Bridge the gap, but never overlap the next cue.
                (raw_end + BRIDGE_PAD)
                    .min(next_start)
                    .max(start + Duration::from_millis(10))
            }
            None => {
                let padded = raw_end + TRAIL_PAD;
                match target_duration {
                    Some(target) if target > padded => target,
                    _ => padded,
                }
            }
        };
        let style = if group.iter().any(|w| matches_keyword(&w.text, keywords)) {
            CueStyle::Important
        } else {
            CueStyle::Default
        };
        cues.push(Cue {
            start,
            end,
            lines: pack_lines(group, MAX_LINE_CHARS),
            style,
        });
    }
    cues
}

/// Karaoke timing for one word relative to its cue, in centiseconds.
/// Truncation, not rounding: rounding up accumulates drift that pushes the
/// highlight sweep past the cue's declared end.
pub fn karaoke_timing(cue_start: Duration, word: &WordEvent) -> (u64, u64) {
    let rel_start_cs = (word.start.saturating_sub(cue_start).as_millis() / 10) as u64;
    let duration_cs = (word.duration.as_millis() / 10) as u64;
    (rel_start_cs, duration_cs)
}

fn normalized_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn matches_keyword(word: &str, keywords: &[String]) -> bool {
    let clean = normalized_word(word);
    !clean.is_empty() && keywords.iter().any(|k| normalized_word(k) == clean)
}

/// Keyword or length-based emphasis, matched on the lowercased word with
/// punctuation stripped.
pub fn is_emphasized(word: &str, keywords: &[String]) -> bool {
    let clean = normalized_word(word);
    if clean.is_empty() {
        return false;
    }
    clean.chars().count() > EMPHASIS_MIN_CHARS || matches_keyword(word, keywords)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn event(text: &str, start_s: f64, dur_s: f64) -> WordEvent {
        WordEvent {
            text: text.to_string(),
            start: secs(start_s),
            duration: secs(dur_s),
        }
    }

    #[test]
    fn estimation_distributes_by_char_length() {
        let events = normalize_events(
            Vec::new(),
            "one two three",
            Some(Utterance { start: Duration::ZERO, duration: secs(10.0) }),
        )
        .unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].start, Duration::ZERO);

        // Durations sum exactly to the utterance.
        let total: Duration = events.iter().map(|w| w.duration).sum();
        assert_eq!(total, secs(10.0));

        // Monotone offsets, back to back.
        assert_eq!(events[0].end(), events[1].start);
        assert_eq!(events[1].end(), events[2].start);

        // Longer words get proportionally more time.
        assert!(events[2].duration >= events[1].duration);
        assert!(events[1].duration >= events[0].duration);
    }

    #[test]
    fn estimation_requires_some_timing() {
        let err = normalize_events(Vec::new(), "one two", None).unwrap_err();
        assert!(matches!(err, CaptionError::NoTimingData));
    }

    #[test]
    fn estimation_rejects_empty_text() {
        let err = normalize_events(
            Vec::new(),
            "   ",
            Some(Utterance { start: Duration::ZERO, duration: secs(5.0) }),
        )
        .unwrap_err();
        assert!(matches!(err, CaptionError::EmptyInput));
    }

    #[test]
    fn word_events_pass_through_unchanged() {
        let events = vec![event("hello", 0.0, 0.5)];
        let out = normalize_events(events.clone(), "hello", None).unwrap();
        assert_eq!(out, events);
    }

    #[test]
    fn lines_respect_budget() {
        let words: Vec<WordEvent> = (0..20)
            .map(|i| event("steady", i as f64 * 0.4, 0.3))
            .collect();
        let lines = pack_lines(&words, MAX_LINE_CHARS);
        for line in &lines {
            assert!(line.char_len() <= MAX_LINE_CHARS, "line too wide: {}", line.char_len());
        }
        let total: usize = lines.iter().map(|l| l.words.len()).sum();
        assert_eq!(total, 20);
    }

    #[test]
    fn oversized_word_gets_its_own_line() {
        let words = vec![
            event("a", 0.0, 0.1),
            event("supercalifragilisticexpialidocious", 0.2, 1.0),
            event("b", 1.3, 0.1),
        ];
        let lines = pack_lines(&words, 10);
        // The long word stays unsplit, alone on its own row; "b" starts the next.
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].words[0].text, "a");
        assert_eq!(lines[1].words.len(), 1);
        assert_eq!(lines[1].words[0].text, "supercalifragilisticexpialidocious");
        assert_eq!(lines[2].words[0].text, "b");
    }

    #[test]
    fn mode_threshold_resolves_long_strictly_above() {
        let threshold = secs(60.0);
        assert_eq!(Mode::for_duration(secs(60.0), threshold), Mode::Short);
        assert_eq!(Mode::for_duration(secs(60.001), threshold), Mode::Long);
        assert_eq!(Mode::for_duration(secs(3.0), threshold), Mode::Short);
    }

    #[test]
    fn short_clip_scenario() {
        // 5 words spanning 0-3.0s, target 8.0s: exactly one cue 0..8.
        let words: Vec<WordEvent> = ["stay", "hungry", "stay", "foolish", "always"]
            .iter()
            .enumerate()
            .map(|(i, w)| event(w, i as f64 * 0.6, 0.5))
            .collect();
        let opts = CaptionOptions {
            mode: Mode::Short,
            target_duration: Some(secs(8.0)),
            ..CaptionOptions::default()
        };
        let doc = compile(&words, &opts).unwrap();
        assert_eq!(doc.cues.len(), 1);
        let cue = &doc.cues[0];
        assert_eq!(cue.start, Duration::ZERO);
        assert_eq!(cue.end, secs(8.0));
        assert_eq!(cue.words().count(), 5);

        // Ascending relative highlight starts.
        let starts: Vec<u64> = cue
            .words()
            .map(|w| karaoke_timing(cue.start, w).0)
            .collect();
        for pair in starts.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn long_clip_scenario() {
        // 200 words spanning 0-150s: multiple cues, coverage, ordering.
        let words: Vec<WordEvent> = (0..200)
            .map(|i| event("perseverance", i as f64 * 0.75, 0.7))
            .collect();
        let opts = CaptionOptions {
            mode: Mode::Long,
            target_duration: None,
            ..CaptionOptions::default()
        };
        let doc = compile(&words, &opts).unwrap();
        assert!(doc.cues.len() > 1);
        assert_eq!(doc.cues[0].start, Duration::ZERO);
        assert!(doc.cues.last().unwrap().end >= secs(150.0));

        // Every word appears exactly once, in order.
        let total: usize = doc.cues.iter().map(|c| c.words().count()).sum();
        assert_eq!(total, 200);

        for cue in &doc.cues {
            assert!(cue.end > cue.start);
            let cue_chars: usize = cue.lines.iter().map(|l| l.char_len()).sum::<usize>()
                + cue.lines.len().saturating_sub(1);
            assert!(cue_chars <= MAX_CUE_CHARS, "cue too wide: {cue_chars}");
        }

        // Non-decreasing starts, no overlap beyond the bridge pad.
        for pair in doc.cues.windows(2) {
            assert!(pair[1].start >= pair[0].start);
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn long_form_cue_styles_follow_keywords() {
        let words: Vec<WordEvent> = [
            "every", "day", "brings", "chances", "discipline", "carries", "you", "forward",
        ]
        .iter()
        .enumerate()
        .map(|(i, w)| event(w, i as f64 * 0.75, 0.7))
        .collect();
        let opts = CaptionOptions {
            mode: Mode::Long,
            keywords: vec!["discipline".to_string()],
            ..CaptionOptions::default()
        };
        let doc = compile(&words, &opts).unwrap();
        assert_eq!(doc.cues.len(), 2);
        assert_eq!(doc.cues[0].style, CueStyle::Important);
        assert_eq!(doc.cues[1].style, CueStyle::Default);

        // Without keywords every cue stays on the default record.
        let plain = compile(&words, &CaptionOptions { keywords: Vec::new(), ..opts }).unwrap();
        assert!(plain.cues.iter().all(|c| c.style == CueStyle::Default));
    }

    #[test]
    fn karaoke_round_trip_within_truncation() {
        let cue_start = secs(12.0);
        let word = event("courage", 13.337, 0.458);
        let (rel_cs, dur_cs) = karaoke_timing(cue_start, &word);
        let rebuilt_start = cue_start + Duration::from_millis(rel_cs * 10);
        let delta = word.start.checked_sub(rebuilt_start).unwrap();
        assert!(delta <= Duration::from_millis(10));
        let dur_delta = word.duration - Duration::from_millis(dur_cs * 10);
        assert!(dur_delta <= Duration::from_millis(10));
    }

    #[test]
    fn zero_duration_word_yields_zero_tag() {
        let word = event("blip", 1.0, 0.0);
        let (_, dur_cs) = karaoke_timing(Duration::ZERO, &word);
        assert_eq!(dur_cs, 0);
    }

    #[test]
    fn tolerates_overlapping_events() {
        // Second word starts before the first ends; compiler must not panic
        // and must keep both words.
        let words = vec![event("over", 0.0, 1.0), event("lap", 0.5, 1.0)];
        let doc = compile(&words, &CaptionOptions::default()).unwrap();
        assert_eq!(doc.cues[0].words().count(), 2);
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = compile(&[], &CaptionOptions::default()).unwrap_err();
        assert!(matches!(err, CaptionError::EmptyInput));
    }

    #[test]
    fn emphasis_by_keyword_and_length() {
        let keywords = vec!["grit".to_string()];
        assert!(is_emphasized("Grit,", &keywords));
        assert!(is_emphasized("relentless", &[]));
        assert!(!is_emphasized("the", &keywords));
        assert!(!is_emphasized("...", &keywords));
    }
}
