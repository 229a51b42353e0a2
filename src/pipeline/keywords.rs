//! Keyword gate for search-style sources.
//!
//! Candidates must mention at least one configured keyword as a whole word
//! (case-insensitive) in their title or summary. Candidates that match none
//! are marked seen so they are not evaluated again.

use regex::{Regex, RegexBuilder};

use crate::error::{AppError, Result};
use crate::models::Item;

/// Compiled keyword matchers for one source.
#[derive(Debug, Clone, Default)]
pub struct KeywordGate {
    patterns: Vec<(String, Regex)>,
}

impl KeywordGate {
    /// Compile the keywords. Blank keywords are ignored.
    pub fn new(keywords: &[String]) -> Result<Self> {
        let mut patterns = Vec::new();
        for keyword in keywords {
            let keyword = keyword.trim();
            if keyword.is_empty() || patterns.iter().any(|(k, _)| k == keyword) {
                continue;
            }
            let regex = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(keyword)))
                .case_insensitive(true)
                .build()
                .map_err(|e| AppError::validation(format!("keyword '{keyword}': {e}")))?;
            patterns.push((keyword.to_string(), regex));
        }
        Ok(Self { patterns })
    }

    /// Whether the gate lets everything through.
    pub fn is_open(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Keywords found in the item, in configuration order.
    pub fn matches(&self, item: &Item) -> Vec<String> {
        let text = format!("{} {}", item.title, item.summary);
        self.patterns
            .iter()
            .filter(|(_, re)| re.is_match(&text))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Split candidates into (matched, unmatched). Matched items carry their
    /// matched keywords as tags.
    pub fn split(&self, candidates: Vec<Item>) -> (Vec<Item>, Vec<Item>) {
        if self.is_open() {
            return (candidates, Vec::new());
        }

        let mut matched = Vec::new();
        let mut unmatched = Vec::new();
        for mut item in candidates {
            let found = self.matches(&item);
            if found.is_empty() {
                unmatched.push(item);
            } else {
                item.tags = found;
                matched.push(item);
            }
        }
        (matched, unmatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(id: &str, title: &str, summary: &str) -> Item {
        let mut item = Item::new(id, title);
        item.summary = summary.to_string();
        item
    }

    fn keywords(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_open_gate_passes_everything() {
        let gate = KeywordGate::new(&[]).unwrap();
        let (matched, unmatched) = gate.split(vec![paper("1", "x", "y")]);
        assert_eq!(matched.len(), 1);
        assert!(unmatched.is_empty());
        assert!(matched[0].tags.is_empty());
    }

    #[test]
    fn test_whole_word_case_insensitive() {
        let gate = KeywordGate::new(&keywords(&["LLM", "agent"])).unwrap();
        assert_eq!(
            gate.matches(&paper("1", "Scaling llm inference", "")),
            vec!["LLM".to_string()]
        );
        assert!(gate.matches(&paper("2", "LLMs everywhere", "")).is_empty());
        assert!(gate.matches(&paper("3", "", "an agentic system")).is_empty());
        assert_eq!(
            gate.matches(&paper("4", "An agent", "built on an LLM")),
            vec!["LLM".to_string(), "agent".to_string()]
        );
    }

    #[test]
    fn test_split_tags_matches() {
        let gate = KeywordGate::new(&keywords(&["diffusion", "diffusion", " "])).unwrap();
        let (matched, unmatched) = gate.split(vec![
            paper("1", "Latent diffusion models", ""),
            paper("2", "Graph networks", ""),
        ]);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].tags, vec!["diffusion".to_string()]);
        assert_eq!(unmatched[0].identity, "2");
    }

    #[test]
    fn test_keywords_with_symbols_compile() {
        let gate = KeywordGate::new(&keywords(&["node.js"])).unwrap();
        assert!(!gate.is_open());
        assert!(gate.matches(&paper("1", "Profiling node.js servers", "")).len() == 1);
        assert!(gate.matches(&paper("2", "Profiling nodeXjs servers", "")).is_empty());
    }
}
