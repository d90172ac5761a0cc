use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

const WORDS_PER_MINUTE: usize = 200;

// Word/character counts shown in the editor status bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub lines: usize,
    pub words: usize,
    pub characters: usize,
    pub characters_no_spaces: usize,
    pub paragraphs: usize,
    /// Minutes, never less than 1
    pub reading_time: usize,
}

fn paragraph_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("paragraph regex"))
}

impl DocumentStats {
    pub fn from_content(content: &str) -> Self {
        let words = content.split_whitespace().count();
        let paragraphs = paragraph_break()
            .split(content)
            .filter(|p| !p.trim().is_empty())
            .count();

        Self {
            lines: content.split('\n').count(),
            words,
            characters: content.chars().count(),
            characters_no_spaces: content.chars().filter(|c| !c.is_whitespace()).count(),
            paragraphs,
            reading_time: words.div_ceil(WORDS_PER_MINUTE).max(1),
        }
    }
}

// Zero-width no-break space is not whitespace to `char`
fn is_blank(line: &str) -> bool {
    line.chars().all(|c| c.is_whitespace() || c == '\u{FEFF}')
}

/// Name offered when saving a note that still has the default title.
///
/// Uses the text of a leading `# ` heading, else the first non-blank line
/// capped at 50 characters.
pub fn suggest_title(content: &str) -> String {
    let Some(first) = content.lines().map(str::trim).find(|line| !is_blank(line)) else {
        return "Untitled".to_string();
    };

    match first.strip_prefix("# ").map(str::trim) {
        Some(heading) if !is_blank(heading) => heading.to_string(),
        _ => first.chars().take(50).collect(),
    }
}

pub fn format_relative(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - timestamp).num_seconds();

    match seconds {
        s if s < 60 => "Just now".to_string(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s if s < 604_800 => format!("{}d ago", s / 86_400),
        _ => timestamp.format("%Y-%m-%d").to_string(),
    }
}
