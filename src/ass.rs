use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::info;

use crate::captions::{CaptionDocument, Cue, is_emphasized, karaoke_timing};
use crate::errors::CaptionError;

/// ASS timestamp `H:MM:SS.cc`, truncated to centiseconds.
pub fn format_timestamp(t: Duration) -> String {
    let total_cs = t.as_millis() / 10;
    let cs = total_cs % 100;
    let total_secs = total_cs / 100;
    let s = total_secs % 60;
    let m = (total_secs / 60) % 60;
    let h = total_secs / 3600;
    format!("{}:{:02}:{:02}.{:02}", h, m, s, cs)
}

/// Escape reserved ASS markup characters in spoken text. Backslash first so
/// the escapes themselves survive; newlines never reach the markup.
pub fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace(['\n', '\r'], " ")
}

fn header(play_res_x: u32, play_res_y: u32) -> String {
    format!(
        "[Script Info]\n\
         ScriptType: v4.00+\n\
         PlayResX: {play_res_x}\n\
         PlayResY: {play_res_y}\n\
         ScaledBorderAndShadow: yes\n\
         \n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: Default,Arial,90,&H00FFFFFF,&H0000FFFF,&H00000000,&H00000000,-1,0,0,0,100,100,0,0,1,4,2,5,10,10,10,1\n\
         Style: Highlight,Arial,110,&H0000FFFF,&H00FFFFFF,&H00000000,&H00000000,-1,0,0,0,100,100,0,0,1,5,3,5,10,10,10,1\n\
         Style: Important,Arial,120,&H0000FFFF,&H00FFFFFF,&H00000000,&H00000000,-1,0,0,0,100,100,0,0,1,6,4,5,10,10,10,1\n\
         \n\
         [Events]\n\
         Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n"
    )
}

/// Inline text payload for one cue: per-word karaoke tags joined by spaces
/// within a line, `\N` between lines. Gaps between the karaoke clock and a
/// word's real offset are absorbed by empty filler tags so the sweep stays
/// aligned with speech.
fn render_cue_text(cue: &Cue, keywords: &[String]) -> String {
    let mut rendered_lines = Vec::with_capacity(cue.lines.len());
    let mut clock_cs: u64 = 0;

    for line in &cue.lines {
        let mut fragments = Vec::with_capacity(line.words.len());
        for word in &line.words {
            let (rel_start_cs, duration_cs) = karaoke_timing(cue.start, word);
            let mut fragment = String::new();
            if rel_start_cs > clock_cs {
                fragment.push_str(&format!("{{\\k{}}}", rel_start_cs - clock_cs));
                clock_cs = rel_start_cs;
            }
            let text = escape_text(word.text.trim());
            if is_emphasized(&word.text, keywords) {
                fragment.push_str(&format!(
                    "{{\\k{duration_cs}\\fscx110\\fscy110}}{text}{{\\fscx100\\fscy100}}"
                ));
            } else {
                fragment.push_str(&format!("{{\\k{duration_cs}}}{text}"));
            }
            clock_cs += duration_cs;
            fragments.push(fragment);
        }
        rendered_lines.push(fragments.join(" "));
    }
    rendered_lines.join("\\N")
}

/// Serialize the whole document. Deterministic: identical input always
/// produces byte-identical output.
pub fn serialize(doc: &CaptionDocument, keywords: &[String]) -> String {
    let mut out = header(doc.play_res_x, doc.play_res_y);
    for cue in &doc.cues {
        out.push_str(&format!(
            "Dialogue: 0,{},{},{},,0,0,0,,{}\n",
            format_timestamp(cue.start),
            format_timestamp(cue.end),
            cue.style.as_str(),
            render_cue_text(cue, keywords),
        ));
    }
    out
}

/// Write the document next to its final path and atomically rename into
/// place, so a failed serialization never leaves a truncated file behind.
pub fn write_document(
    doc: &CaptionDocument,
    keywords: &[String],
    path: &Path,
) -> Result<(), CaptionError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(serialize(doc, keywords).as_bytes())?;
    tmp.persist(path).map_err(|e| CaptionError::Serialization(e.error))?;
    info!("Karaoke captions written to {}", path.display());
    Ok(())
}
