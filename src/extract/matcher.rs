//! Ordered pattern matchers.
//!
//! Each field is located by trying a short list of patterns in priority
//! order. Rather than spelling those lists out inline as regex alternations,
//! every pattern is a named [`Matcher`] object and a priority list is a
//! [`MatcherChain`]. Each matcher can be unit-tested on its own and a chain can
//! be extended without touching the code that walks it.

use regex::{Captures, Regex};

/// One successful match, with its capture groups borrowed from the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch<'t> {
    /// Label of the matcher that produced this match.
    pub matcher: &'static str,
    /// Byte offset of the whole match.
    pub start: usize,
    pub end: usize,
    groups: Vec<Option<&'t str>>,
}

impl<'t> FieldMatch<'t> {
    fn from_captures(matcher: &'static str, caps: &Captures<'t>) -> Self {
        let whole = caps.get_match();
        Self {
            matcher,
            start: whole.start(),
            end: whole.end(),
            groups: (1..caps.len())
                .map(|i| caps.get(i).map(|m| m.as_str()))
                .collect(),
        }
    }

    /// Capture group `i` (1-based, like regex groups).
    pub fn group(&self, i: usize) -> Option<&'t str> {
        i.checked_sub(1)
            .and_then(|idx| self.groups.get(idx).copied().flatten())
    }

    /// Capture group `i`, trimmed; empty when the group did not participate.
    pub fn trimmed(&self, i: usize) -> &'t str {
        self.group(i).map(str::trim).unwrap_or("")
    }
}

/// Something that can locate a field in text.
pub trait Matcher: Send + Sync {
    /// Short stable name used in logs.
    fn label(&self) -> &'static str;

    /// All non-overlapping matches, leftmost first.
    fn find_iter<'a, 't>(&'a self, text: &'t str) -> Box<dyn Iterator<Item = FieldMatch<'t>> + 'a>
    where
        't: 'a;

    /// The leftmost match, if any.
    fn attempt<'t>(&self, text: &'t str) -> Option<FieldMatch<'t>> {
        self.find_iter(text).next()
    }
}

/// A [`Matcher`] backed by a compiled regex.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    label: &'static str,
    regex: Regex,
}

impl PatternMatcher {
    pub fn new(label: &'static str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            label,
            regex: Regex::new(pattern)?,
        })
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl Matcher for PatternMatcher {
    fn label(&self) -> &'static str {
        self.label
    }

    fn find_iter<'a, 't>(&'a self, text: &'t str) -> Box<dyn Iterator<Item = FieldMatch<'t>> + 'a>
    where
        't: 'a,
    {
        let label = self.label;
        Box::new(
            self.regex
                .captures_iter(text)
                .map(move |caps| FieldMatch::from_captures(label, &caps)),
        )
    }

    fn attempt<'t>(&self, text: &'t str) -> Option<FieldMatch<'t>> {
        self.regex
            .captures(text)
            .map(|caps| FieldMatch::from_captures(self.label, &caps))
    }
}

/// A priority-ordered list of matchers.
#[derive(Default)]
pub struct MatcherChain {
    matchers: Vec<Box<dyn Matcher>>,
}

impl std::fmt::Debug for MatcherChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.matchers.iter().map(|m| m.label()))
            .finish()
    }
}

impl MatcherChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(label, pattern)` pairs.
    ///
    /// Panics on an invalid pattern; chains are built from literals.
    pub fn from_patterns(patterns: &[(&'static str, &str)]) -> Self {
        let mut chain = Self::new();
        for &(label, pattern) in patterns {
            let m = PatternMatcher::new(label, pattern)
                .unwrap_or_else(|e| panic!("invalid pattern {label}: {e}"));
            chain.push(m);
        }
        chain
    }

    /// Append a lower-priority matcher.
    pub fn push(&mut self, matcher: impl Matcher + 'static) {
        self.matchers.push(Box::new(matcher));
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn matchers(&self) -> impl Iterator<Item = &dyn Matcher> {
        self.matchers.iter().map(|m| m.as_ref())
    }

    /// Leftmost match of the highest-priority matcher that matches at all.
    pub fn first<'t>(&self, text: &'t str) -> Option<FieldMatch<'t>> {
        self.matchers.iter().find_map(|m| m.attempt(text))
    }

    /// Every match of every matcher: all of matcher 1, then all of matcher 2, …
    pub fn all<'a, 't>(&'a self, text: &'t str) -> impl Iterator<Item = FieldMatch<'t>> + 'a
    where
        't: 'a,
    {
        self.matchers.iter().flat_map(move |m| m.find_iter(text))
    }

    /// First match, in priority order, that `accept` maps to a value.
    pub fn find_map<'t, T>(
        &self,
        text: &'t str,
        mut accept: impl FnMut(&FieldMatch<'t>) -> Option<T>,
    ) -> Option<T> {
        self.all(text).find_map(|m| accept(&m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> MatcherChain {
        MatcherChain::from_patterns(&[
            ("labelled", r"ID:\s*(\d+)"),
            ("bare", r"#(\d+)"),
        ])
    }

    #[test]
    fn pattern_matcher_attempt() {
        let m = PatternMatcher::new("digits", r"(\d+)-(\d+)?").unwrap();
        let hit = m.attempt("call 555- now").unwrap();
        assert_eq!(hit.matcher, "digits");
        assert_eq!(hit.group(1), Some("555"));
        assert_eq!(hit.group(2), None);
        assert_eq!(hit.trimmed(2), "");
        assert_eq!(hit.group(0), None);
        assert_eq!(&"call 555- now"[hit.start..hit.end], "555-");
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(PatternMatcher::new("bad", r"(unclosed").is_err());
    }

    #[test]
    fn chain_first_respects_priority() {
        let c = chain();
        let hit = c.first("#7 then ID: 42").unwrap();
        assert_eq!(hit.matcher, "labelled");
        assert_eq!(hit.group(1), Some("42"));
    }

    #[test]
    fn chain_all_orders_by_matcher_then_position() {
        let c = chain();
        let got: Vec<_> = c
            .all("#1 ID: 2 #3 ID: 4")
            .map(|m| (m.matcher, m.trimmed(1).to_string()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("labelled", "2".to_string()),
                ("labelled", "4".to_string()),
                ("bare", "1".to_string()),
                ("bare", "3".to_string()),
            ]
        );
    }

    #[test]
    fn chain_find_map_skips_rejected() {
        let c = chain();
        let even = c.find_map("ID: 3 ID: 8 #10", |m| {
            m.trimmed(1).parse::<u32>().ok().filter(|n| n % 2 == 0)
        });
        assert_eq!(even, Some(8));
    }

    #[test]
    fn chain_debug_lists_labels() {
        assert_eq!(format!("{:?}", chain()), r#"["labelled", "bare"]"#);
        assert_eq!(chain().len(), 2);
        assert!(MatcherChain::new().is_empty());
    }
}
