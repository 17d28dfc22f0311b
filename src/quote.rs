use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;
use tracing::{error, info, warn};

use crate::llm::LlmRouter;

pub const TOPICS: &[&str] = &[
    "success", "discipline", "mindset", "hustle", "courage",
    "fitness", "wisdom", "stoicism", "leadership", "focus",
    "ambition", "patience", "resilience", "gratitude", "strength",
    "learning", "growth", "purpose", "action", "confidence",
];

const MAX_QUOTE_WORDS: usize = 25;
const MIN_QUOTE_WORDS: usize = 5;
const MAX_ATTEMPTS: usize = 3;

pub fn pick_topic<R: Rng>(rng: &mut R) -> &'static str {
    TOPICS.choose(rng).copied().unwrap_or("inspiration")
}

type Rule = fn(&str) -> String;

/// Ordered normalization rules applied to raw LLM output. One pass, no
/// layered patching: each rule does one thing and has its own unit test.
const CLEANING_RULES: &[(&str, Rule)] = &[
    ("collapse_whitespace", collapse_whitespace),
    ("strip_conversational_opener", strip_conversational_opener),
    ("drop_preamble_before_colon", drop_preamble_before_colon),
    ("strip_quote_label", strip_quote_label),
    ("strip_quotation_marks", strip_quotation_marks),
    ("strip_author_attribution", strip_author_attribution),
    ("keep_first_sentence", keep_first_sentence),
    ("cap_word_count", cap_word_count),
    ("strip_ellipses", strip_ellipses),
];

pub fn clean_quote(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    for (_name, rule) in CLEANING_RULES {
        text = rule(&text);
    }
    text.trim().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_conversational_opener(text: &str) -> String {
    let re = Regex::new(r"(?i)^(sure|certainly|okay|ok|actually|of course)[!.,]?\s*").unwrap();
    re.replace(text, "").into_owned()
}

fn drop_preamble_before_colon(text: &str) -> String {
    match text.split_once(':') {
        Some((_, rest)) => rest.trim().to_string(),
        None => text.to_string(),
    }
}

fn strip_quote_label(text: &str) -> String {
    let re = Regex::new(r"(?i)^quote:\s*").unwrap();
    re.replace(text, "").into_owned()
}

fn strip_quotation_marks(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '"' | '\'' | '\u{201c}' | '\u{201d}' | '\u{2018}' | '\u{2019}'))
        .collect()
}

fn strip_author_attribution(text: &str) -> String {
    let dash = Regex::new(r"\s*[-\u{2014}]\s*[A-Z].*$").unwrap();
    let by = Regex::new(r"(?i)\s+by\s+[A-Z].*$").unwrap();
    by.replace(&dash.replace(text, ""), "").into_owned()
}

fn keep_first_sentence(text: &str) -> String {
    let re = Regex::new(r"^(.*?[.!?])").unwrap();
    match re.captures(text) {
        Some(cap) => cap[1].to_string(),
        None => text.to_string(),
    }
}

fn cap_word_count(text: &str) -> String {
    text.split_whitespace()
        .take(MAX_QUOTE_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_ellipses(text: &str) -> String {
    text.replace("...", "").replace('\u{2026}', "")
}

pub fn quote_prompt(topic: &str) -> String {
    format!(
        "Generate a concise, inspiring quote about {topic}. \
         Rules: 1) Max 25 words. 2) No author names. \
         3) No quotation marks. 4) No extra explanation. \
         5) Return only the quote text."
    )
}

/// Generate one short quote, retrying when the cleaned result is too short
/// to narrate.
pub async fn generate_quote(router: &LlmRouter, topic: &str) -> anyhow::Result<String> {
    let prompt = quote_prompt(topic);
    for attempt in 1..=MAX_ATTEMPTS {
        let (raw, provider) = match router.generate_with_fallback(&prompt).await {
            Ok(result) => result,
            Err(e) => {
                error!("All providers failed on attempt {}: {}", attempt, e);
                continue;
            }
        };
        let cleaned = clean_quote(&raw);
        let word_count = cleaned.split_whitespace().count();
        if word_count >= MIN_QUOTE_WORDS {
            info!("Quote generated by {} ({} words): {}", provider, word_count, cleaned);
            return Ok(cleaned);
        }
        warn!(
            "Quote too short ({} words) on attempt {}/{}; retrying",
            word_count, attempt, MAX_ATTEMPTS
        );
    }
    anyhow::bail!("Failed to generate a usable quote after {MAX_ATTEMPTS} attempts")
}

/// A long-form script: a short quote plus a few hundred words of
/// explanation, narrated back to back.
#[derive(Debug, Clone)]
pub struct Script {
    pub quote: String,
    pub explanation: String,
    pub full_text: String,
}

pub fn script_prompt(topic: &str) -> String {
    format!(
        "Generate a motivational video script about {topic}.\n\
         The script must have two parts:\n\
         1. QUOTE: A powerful, concise motivational quote (max 25 words).\n\
         2. EXPLANATION: A deep, meaningful explanation of the quote and how to apply it in life. \
         Length: approximately 300-400 words.\n\
         Format:\n[QUOTE]\n(the quote text)\n\n[EXPLANATION]\n(the explanation paragraphs)\n\
         Rules: no other labels or metadata, no quotation marks around the quote."
    )
}

/// Split an LLM response on the [QUOTE]/[EXPLANATION] markers.
pub fn parse_script(raw: &str) -> Option<Script> {
    let (quote_part, explanation_part) = raw.split_once("[EXPLANATION]")?;
    let quote = quote_part.replace("[QUOTE]", "").trim().to_string();
    let explanation = explanation_part.trim().to_string();
    if quote.is_empty() || explanation.is_empty() {
        return None;
    }
    let full_text = format!("{quote}\n\n{explanation}");
    Some(Script { quote, explanation, full_text })
}

pub async fn generate_script(router: &LlmRouter, topic: &str) -> anyhow::Result<Script> {
    let prompt = script_prompt(topic);
    for attempt in 1..=MAX_ATTEMPTS {
        let (raw, provider) = match router.generate_with_fallback(&prompt).await {
            Ok(result) => result,
            Err(e) => {
                error!("All providers failed on attempt {}: {}", attempt, e);
                continue;
            }
        };
        match parse_script(&raw) {
            Some(script) => {
                info!("Long-form script generated by {}", provider);
                return Ok(script);
            }
            None => warn!(
                "Response missing [QUOTE]/[EXPLANATION] markers on attempt {}/{}",
                attempt, MAX_ATTEMPTS
            ),
        }
    }
    anyhow::bail!("Failed to generate a long-form script after {MAX_ATTEMPTS} attempts")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn collapses_whitespace() {
        assert_eq!(collapse_whitespace("a \n b\t c"), "a b c");
    }

    #[test]
    fn strips_conversational_opener() {
        assert_eq!(strip_conversational_opener("Sure! Keep moving forward."), "Keep moving forward.");
        assert_eq!(strip_conversational_opener("Of course, act today."), "act today.");
        assert_eq!(strip_conversational_opener("Courage first."), "Courage first.");
    }

    #[test]
    fn drops_preamble_before_colon() {
        assert_eq!(
            drop_preamble_before_colon("Here is a quote about grit: Never yield."),
            "Never yield."
        );
        assert_eq!(drop_preamble_before_colon("No colon here"), "No colon here");
    }

    #[test]
    fn strips_quote_label() {
        assert_eq!(strip_quote_label("Quote: Dare greatly."), "Dare greatly.");
    }

    #[test]
    fn strips_quotation_marks() {
        assert_eq!(strip_quotation_marks("\u{201c}Dont quit\u{201d}"), "Dont quit");
        assert_eq!(strip_quotation_marks("\"it's\""), "its");
    }

    #[test]
    fn strips_author_attribution() {
        assert_eq!(strip_author_attribution("Fall seven times - Confucius"), "Fall seven times");
        assert_eq!(strip_author_attribution("Persist daily by Marcus"), "Persist daily");
    }

    #[test]
    fn keeps_first_sentence() {
        assert_eq!(keep_first_sentence("Act now. Tomorrow waits."), "Act now.");
        assert_eq!(keep_first_sentence("no terminator"), "no terminator");
    }

    #[test]
    fn caps_word_count() {
        let long = vec!["word"; 40].join(" ");
        assert_eq!(cap_word_count(&long).split_whitespace().count(), 25);
    }

    #[test]
    fn strips_ellipses() {
        assert_eq!(strip_ellipses("wait... for it\u{2026}"), "wait for it");
    }

    #[test]
    fn full_pipeline_on_messy_llm_output() {
        let raw = "Sure! Here is a quote:  \"Discipline beats motivation every single day.\" - Anonymous";
        assert_eq!(clean_quote(raw), "Discipline beats motivation every single day.");
    }

    #[test]
    fn script_parsing_round_trip() {
        let raw = "[QUOTE]\nGrowth lives outside comfort.\n\n[EXPLANATION]\nEvery day offers a choice.";
        let script = parse_script(raw).unwrap();
        assert_eq!(script.quote, "Growth lives outside comfort.");
        assert_eq!(script.explanation, "Every day offers a choice.");
        assert!(script.full_text.contains(&script.quote));
    }

    #[test]
    fn script_parsing_rejects_missing_markers() {
        assert!(parse_script("just some text").is_none());
        assert!(parse_script("[QUOTE]\nonly a quote").is_none());
    }

    #[test]
    fn topic_selection_is_deterministic_for_a_seed() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        assert_eq!(pick_topic(&mut a), pick_topic(&mut b));
    }
}
