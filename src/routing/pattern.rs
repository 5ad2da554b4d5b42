//! Route pattern compilation.
//!
//! A pattern is a `/`-delimited path. Segments starting with `:` are capture
//! slots; a slot may carry its own sub-pattern in parentheses, e.g.
//! `:id([0-9]+)`. Without one the slot matches one or more non-slash
//! characters. Literal segments match themselves exactly.

use std::fmt;

use regex::Regex;

use crate::error::ReinetError;
use crate::Result;

/// Marker that introduces a capture slot.
const SLOT_MARKER: char = ':';

/// Sub-pattern used when a slot declares none.
const DEFAULT_SLOT_EXPR: &str = "[^/]+";

/// A capture slot: declared name plus the regex group that holds its value.
#[derive(Debug, Clone)]
struct Slot {
    name: String,
    group: usize,
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
    slots: Vec<Slot>,
}

impl Pattern {
    /// Compile a route pattern.
    ///
    /// The resulting matcher is anchored at both ends, so it only accepts
    /// whole paths. A malformed sub-pattern is reported as
    /// [`ReinetError::InvalidPattern`].
    pub fn compile(pattern: &str) -> Result<Self> {
        let mut names = Vec::new();
        let mut expr = String::with_capacity(pattern.len() + 16);
        expr.push('^');

        for (i, segment) in pattern.split('/').enumerate() {
            if i > 0 {
                expr.push('/');
            }

            match segment.strip_prefix(SLOT_MARKER) {
                Some(slot) => {
                    let (name, sub) = match slot.find('(') {
                        Some(open) => (&slot[..open], &slot[open..]),
                        None => (slot, DEFAULT_SLOT_EXPR),
                    };
                    // Slots are named positionally so user names never
                    // need to be valid regex group identifiers.
                    expr.push_str(&format!("(?P<s{}>{})", names.len(), sub));
                    names.push(name.to_string());
                }
                None => expr.push_str(&regex::escape(segment)),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|source| ReinetError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let slots = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let group_name = format!("s{i}");
                let group = regex
                    .capture_names()
                    .position(|n| n == Some(group_name.as_str()))
                    .unwrap_or_default();
                Slot { name, group }
            })
            .collect();

        Ok(Self {
            source: pattern.to_string(),
            regex,
            slots,
        })
    }

    /// The pattern text as registered.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Declared parameter names, in capture order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.name.as_str())
    }

    /// Number of capture slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Check whether the whole path matches.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match the whole path and return the captured text for every slot,
    /// in declaration order.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.slots
                .iter()
                .map(|slot| {
                    caps.get(slot.group)
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default()
                })
                .collect(),
        )
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
