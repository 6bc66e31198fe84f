//! Reconciling extracted descriptors with user answers.
//!
//! Descriptors are grouped by literal, compared case-insensitively. Each
//! group keeps one slot per descriptor in descriptor order, answered or not,
//! so the n-th occurrence of a repeated literal in the document lines up with
//! the n-th descriptor for it.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::descriptor::{AnswerMap, PlaceholderDescriptor};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Slot {
    pub key: String,
    /// `None` when the user gave no answer; the literal is then left alone.
    pub answer: Option<String>,
}

/// All descriptors sharing one literal.
#[derive(Debug, Clone)]
pub struct LiteralGroup {
    literal: String,
    pattern: Regex,
    slots: Vec<Slot>,
}

impl LiteralGroup {
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Case-insensitive matcher for the escaped literal.
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Answered slot for `count` occurrences starting at slot `start`.
    ///
    /// The first answered slot among those wins. Once the slots are
    /// exhausted, the first answered slot of the whole group is reused.
    pub fn answer_for(&self, start: usize, count: usize) -> Option<&Slot> {
        let answered = |s: &&Slot| s.answer.is_some();
        if start >= self.slots.len() {
            return self.slots.iter().find(answered);
        }
        let end = start.saturating_add(count).min(self.slots.len());
        self.slots[start..end].iter().find(answered)
    }
}

/// Ordered literal groups, in order of each literal's first descriptor.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionPlan {
    groups: Vec<LiteralGroup>,
}

impl SubstitutionPlan {
    pub fn reconcile(descriptors: &[PlaceholderDescriptor], answers: &AnswerMap) -> Result<Self> {
        let mut groups: Vec<LiteralGroup> = Vec::new();
        let mut by_literal: HashMap<String, usize> = HashMap::new();

        for descriptor in descriptors {
            if descriptor.literal.is_empty() {
                warn!("Ignoring descriptor with an empty placeholder");
                continue;
            }
            let key = descriptor.effective_key().to_string();
            let answer = answers.get(&key).cloned();
            if answer.is_none() {
                debug!("No answer for '{}', leaving it untouched", key);
            }

            let folded = descriptor.literal.to_lowercase();
            let index = match by_literal.get(&folded) {
                Some(&index) => index,
                None => {
                    let pattern = RegexBuilder::new(&regex::escape(&descriptor.literal))
                        .case_insensitive(true)
                        .build()?;
                    groups.push(LiteralGroup {
                        literal: descriptor.literal.clone(),
                        pattern,
                        slots: Vec::new(),
                    });
                    by_literal.insert(folded, groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[index].slots.push(Slot { key, answer });
        }

        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[LiteralGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of slots with an answer.
    pub fn answered(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| g.slots.iter())
            .filter(|s| s.answer.is_some())
            .count()
    }
}
