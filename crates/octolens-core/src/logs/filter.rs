//! Selection of top-level steps by index or approximate name.

use super::LogNode;
use super::similarity::ratio;

/// Minimum similarity for a text token to select a step.
pub const STEP_NAME_MATCH_RATIO: u8 = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepToken {
    /// Selects the step whose name starts with `Step <n>`.
    Index(u32),
    /// Selects steps whose normalised name is similar to this fragment.
    Text(String),
}

impl StepToken {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match trimmed.parse::<u32>() {
            Ok(index) => StepToken::Index(index),
            Err(_) => StepToken::Text(trimmed.to_string()),
        })
    }
}

/// An empty filter selects every step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepFilter {
    tokens: Vec<StepToken>,
}

impl StepFilter {
    /// Filter that matches every step.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(tokens: Vec<StepToken>) -> Self {
        Self { tokens }
    }

    /// Build a filter from raw user input, dropping blank entries.
    pub fn parse<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tokens: raw
                .into_iter()
                .filter_map(|token| StepToken::parse(token.as_ref()))
                .collect(),
        }
    }

    pub fn tokens(&self) -> &[StepToken] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Whether a top-level step passes the filter.
pub fn step_matches(node: &LogNode, filter: &StepFilter) -> bool {
    if filter.is_empty() {
        return true;
    }

    let mut normalized_name: Option<String> = None;
    filter.tokens().iter().any(|token| match token {
        StepToken::Index(index) => node.name.starts_with(&format!("Step {index}")),
        StepToken::Text(text) => {
            let name = normalized_name.get_or_insert_with(|| normalize_step_name(&node.name));
            ratio(&normalize_step_name(text), name) >= STEP_NAME_MATCH_RATIO
        }
    })
}

/// Case-fold, turn punctuation into spaces, drop a leading `step <n>` label and
/// collapse whitespace.
pub fn normalize_step_name(name: &str) -> String {
    let folded: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let words: Vec<&str> = folded.split_whitespace().collect();

    let rest = match words.as_slice() {
        ["step", number, rest @ ..] if number.chars().all(|c| c.is_ascii_digit()) => rest,
        _ => words.as_slice(),
    };
    rest.join(" ")
}
