//! Textual event filters
//!
//! A filter query matches events by type name and argument values. Plain
//! strings compile to an unanchored, case-insensitive pattern (a literal
//! substring match when the string is not a valid pattern); the
//! `/body/flags` form compiles the body verbatim with flags drawn from
//! `{g, i, m}` (`g` has no meaning for matching and is accepted and
//! ignored).

use crate::QueryError;
use regex::Regex;
use tracedb_core::Event;

/// Compiled filter form.
#[derive(Debug)]
pub enum FilterKind {
    /// Match every event
    All,
    /// Literal substring over the match text
    Substring(String),
    /// Compiled pattern over the match text
    Pattern(Regex),
}

/// A compiled event filter.
#[derive(Debug)]
pub struct Filter {
    source: String,
    kind: FilterKind,
}

impl Filter {
    /// Compile a plain (non-`/`-delimited) filter string.
    ///
    /// The string is first compiled as a case-insensitive pattern, the way
    /// interactive trace consoles treat it; when it is not a valid pattern
    /// it degrades to a literal substring match.
    pub fn plain(source: &str) -> Filter {
        let trimmed = source.trim();
        let kind = if trimmed.is_empty() {
            FilterKind::All
        } else {
            match Regex::new(&format!("(?i){trimmed}")) {
                Ok(re) => FilterKind::Pattern(re),
                Err(_) => FilterKind::Substring(trimmed.to_lowercase()),
            }
        };
        Filter {
            source: source.to_string(),
            kind,
        }
    }

    /// Compile a `/body/flags` filter. Unparsable bodies are an error.
    pub fn regex(source: &str, body: &str, flags: &str) -> Result<Filter, QueryError> {
        let mut inline = String::new();
        for flag in flags.chars() {
            match flag {
                'i' | 'm' => inline.push(flag),
                // Global matching is meaningless for a boolean predicate
                'g' => {}
                other => return Err(QueryError::InvalidRegex(format!("unknown flag `{other}`"))),
            }
        }
        let pattern = if inline.is_empty() {
            body.to_string()
        } else {
            format!("(?{inline}){body}")
        };
        let re = Regex::new(&pattern).map_err(|e| QueryError::InvalidRegex(e.to_string()))?;
        Ok(Filter {
            source: source.to_string(),
            kind: FilterKind::Pattern(re),
        })
    }

    /// The original filter string
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled form
    pub fn kind(&self) -> &FilterKind {
        &self.kind
    }

    /// The evaluator: a pure predicate over events, or None meaning
    /// "match all".
    pub fn evaluator(&self) -> Option<impl Fn(&Event) -> bool + '_> {
        match &self.kind {
            FilterKind::All => None,
            _ => Some(move |event: &Event| self.matches(event)),
        }
    }

    fn matches(&self, event: &Event) -> bool {
        let hit = |text: &str| match &self.kind {
            FilterKind::All => true,
            FilterKind::Substring(needle) => text.to_lowercase().contains(needle),
            FilterKind::Pattern(re) => re.is_match(text),
        };
        if hit(event.event_type().name()) {
            return true;
        }
        event.args().iter().any(|arg| hit(&arg.to_display_string()))
    }
}
