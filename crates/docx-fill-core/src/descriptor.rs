//! Placeholder descriptors and the rules for reading them out of an
//! extraction reply.

use std::collections::HashMap;

use regex::RegexBuilder;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Answers keyed by descriptor key.
pub type AnswerMap = HashMap<String, String>;

/// One placeholder occurrence reported by the extractor, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderDescriptor {
    /// Literal placeholder text as it appears in the document.
    #[serde(rename = "placeholder", alias = "literal")]
    pub literal: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub key: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub question: String,
}

/// Extractors send `null` for fields they could not fill in.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl PlaceholderDescriptor {
    pub fn new(
        literal: impl Into<String>,
        key: impl Into<String>,
        question: impl Into<String>,
    ) -> Self {
        Self {
            literal: literal.into(),
            key: key.into(),
            question: question.into(),
        }
    }

    /// The key answers are looked up by: `key`, or the literal when the key is blank.
    pub fn effective_key(&self) -> &str {
        if self.key.trim().is_empty() {
            &self.literal
        } else {
            &self.key
        }
    }
}

/// Parse the free-form text returned by the extraction collaborator.
///
/// The JSON array is taken from the first `[` to the last `]`, so
/// explanatory prose around it is ignored. Typographic quotes are
/// normalized before parsing. A blank reply means no placeholders.
pub fn parse_extraction_reply(content: &str) -> Result<Vec<PlaceholderDescriptor>> {
    let content = content.trim();
    if content.is_empty() {
        debug!("Extraction reply is empty, no placeholders");
        return Ok(Vec::new());
    }

    let (Some(start), Some(end)) = (content.find('['), content.rfind(']')) else {
        return Err(Error::ExtractionProtocol(format!(
            "no JSON array found in reply: {}",
            content
        )));
    };
    if end < start {
        return Err(Error::ExtractionProtocol(format!(
            "no JSON array found in reply: {}",
            content
        )));
    }

    let array = content[start..=end]
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    let descriptors: Vec<PlaceholderDescriptor> = serde_json::from_str(&array)
        .map_err(|e| Error::ExtractionProtocol(format!("invalid JSON array ({}): {}", e, array)))?;

    let before = descriptors.len();
    let descriptors: Vec<_> = descriptors
        .into_iter()
        .filter(|d| !d.literal.trim().is_empty())
        .collect();
    if descriptors.len() < before {
        warn!(
            "Dropped {} descriptors with an empty placeholder",
            before - descriptors.len()
        );
    }
    Ok(descriptors)
}

/// Stably reorder descriptors by where they occur in `text`.
///
/// The k-th descriptor of a literal is placed at the k-th case-insensitive
/// occurrence of that literal. Descriptors whose occurrence cannot be found
/// keep their relative order after all located ones.
pub fn align_to_text(
    descriptors: Vec<PlaceholderDescriptor>,
    text: &str,
) -> Result<Vec<PlaceholderDescriptor>> {
    let mut positions: HashMap<String, Vec<usize>> = HashMap::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut keyed = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
        let folded = descriptor.literal.to_lowercase();
        if !positions.contains_key(&folded) {
            let pattern = RegexBuilder::new(&regex::escape(&descriptor.literal))
                .case_insensitive(true)
                .build()?;
            let found = pattern.find_iter(text).map(|m| m.start()).collect();
            positions.insert(folded.clone(), found);
        }
        let ordinal = seen.entry(folded.clone()).or_insert(0);
        let position = positions
            .get(&folded)
            .and_then(|p| p.get(*ordinal))
            .copied()
            .unwrap_or(usize::MAX);
        *ordinal += 1;
        if position == usize::MAX {
            warn!(
                "Placeholder '{}' (occurrence {}) not found in document text",
                descriptor.literal, ordinal
            );
        }
        keyed.push((position, descriptor));
    }

    keyed.sort_by_key(|(position, _)| *position);
    Ok(keyed.into_iter().map(|(_, d)| d).collect())
}

/// Give every descriptor with a blank key one derived from its literal and
/// position, so repeated literals get distinct keys.
pub fn synthesize_keys(descriptors: &mut [PlaceholderDescriptor]) {
    for (position, descriptor) in descriptors.iter_mut().enumerate() {
        if descriptor.key.trim().is_empty() {
            descriptor.key = format!("{}_{}", descriptor.literal, position);
        }
    }
}
