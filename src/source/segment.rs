//! Cleaning and sentence splitting for article text.
//!
//! Splitting is deliberately simple: a sentence ends at a run of terminal
//! punctuation followed by whitespace. Abbreviations such as "ur." will
//! split a sentence early.

use std::sync::OnceLock;
use regex::Regex;

/// Parenthesised asides can nest; each pass removes the innermost level.
const MAX_PAREN_PASSES: usize = 4;

fn citation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(?:\d+|[a-z]|potrzebny przypis|citation needed)\]").expect("valid regex"))
}

fn paren_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\([^()]*\)").expect("valid regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([.!?…]+["'”»]*)\s+"#).expect("valid regex"))
}

/// Strips citation markers and parenthesised asides, collapses whitespace.
pub fn clean(text: &str) -> String {
    let mut cleaned = citation_re().replace_all(text, "").into_owned();
    for _ in 0..MAX_PAREN_PASSES {
        let next = paren_re().replace_all(&cleaned, "");
        if next == cleaned {
            break;
        }
        cleaned = next.into_owned();
    }
    whitespace_re().replace_all(&cleaned, " ").trim().to_string()
}

/// Splits cleaned text into trimmed, non-empty sentences in original order.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for caps in boundary_re().captures_iter(text) {
        let (Some(whole), Some(terminator)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_trimmed(&mut sentences, &text[start..terminator.end()]);
        start = whole.end();
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

/// `clean` followed by `split_sentences`
pub fn segment(text: &str) -> Vec<String> {
    split_sentences(&clean(text))
}

fn push_trimmed(out: &mut Vec<String>, fragment: &str) {
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        out.push(fragment.to_string());
    }
}
