//! Substitution engine.
//!
//! Every paragraph of every region is flattened, rewritten group by group,
//! and collapsed into a single run holding the result. Text produced by a
//! substitution is never matched again within the same paragraph.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::model::{Document, RegionKind};
use crate::plan::{LiteralGroup, SubstitutionPlan};
use crate::text::flatten;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    /// Paragraphs collapsed into a single run.
    pub paragraphs_rewritten: usize,
    /// Paragraphs left alone because their runs could not be rebuilt.
    pub paragraphs_locked: usize,
    pub replacements: usize,
}

/// Apply `plan` to every paragraph of `document`.
pub fn fill(document: &mut Document, plan: &SubstitutionPlan) -> FillReport {
    let mut report = FillReport::default();
    let mut cursors = vec![0usize; plan.groups().len()];

    document.for_each_paragraph_mut(|kind, paragraph| {
        if paragraph.runs().is_empty() {
            return;
        }
        if paragraph.is_locked() {
            // Occurrences here still consume their slots so later
            // paragraphs stay aligned with their descriptors.
            let (_, skipped) = substitute(&flatten(paragraph), plan, &mut cursors);
            if skipped > 0 {
                warn!(
                    "Left {} placeholders in a {:?} paragraph with fields or embedded objects",
                    skipped, kind
                );
            }
            report.paragraphs_locked += 1;
            return;
        }

        let (text, replaced) = substitute(&flatten(paragraph), plan, &mut cursors);
        if replaced > 0 {
            debug!("{} replacements in {:?} paragraph", replaced, kind);
        }
        paragraph.replace_runs_with_text(text);
        report.paragraphs_rewritten += 1;
        report.replacements += replaced;
    });

    info!(
        "Filled document: {} paragraphs rewritten, {} locked, {} replacements",
        report.paragraphs_rewritten, report.paragraphs_locked, report.replacements
    );
    report
}

/// A piece of paragraph text: either original text still open to matching,
/// or an answer that was substituted in.
enum Segment {
    Open(String),
    Filled(String),
}

/// Rewrite one paragraph's text, advancing the per-group occurrence cursors.
pub(crate) fn substitute(
    text: &str,
    plan: &SubstitutionPlan,
    cursors: &mut [usize],
) -> (String, usize) {
    let mut segments = vec![Segment::Open(text.to_string())];
    let mut replaced = 0;

    for (group, cursor) in plan.groups().iter().zip(cursors.iter_mut()) {
        let hits: usize = segments
            .iter()
            .map(|s| match s {
                Segment::Open(t) => group.pattern().find_iter(t).count(),
                Segment::Filled(_) => 0,
            })
            .sum();
        if hits == 0 {
            continue;
        }

        let start = *cursor;
        *cursor += hits;
        let Some(slot) = group.answer_for(start, hits) else {
            continue;
        };
        let Some(answer) = slot.answer.as_deref() else {
            continue;
        };
        debug!("'{}' x{} filled from key '{}'", group.literal(), hits, slot.key);

        segments = replace_open(segments, group, answer);
        replaced += hits;
    }

    let text = segments
        .into_iter()
        .map(|s| match s {
            Segment::Open(t) | Segment::Filled(t) => t,
        })
        .collect();
    (text, replaced)
}

fn replace_open(segments: Vec<Segment>, group: &LiteralGroup, answer: &str) -> Vec<Segment> {
    let mut out = Vec::with_capacity(segments.len());
    for segment in segments {
        let text = match segment {
            Segment::Open(text) => text,
            filled => {
                out.push(filled);
                continue;
            }
        };
        let mut last = 0;
        for m in group.pattern().find_iter(&text) {
            if m.start() > last {
                out.push(Segment::Open(text[last..m.start()].to_string()));
            }
            out.push(Segment::Filled(answer.to_string()));
            last = m.end();
        }
        if last < text.len() {
            out.push(Segment::Open(text[last..].to_string()));
        }
    }
    out
}

/// Paragraph texts in traversal order, tagged with their region.
pub fn paragraph_texts(document: &Document) -> Vec<(RegionKind, String)> {
    document
        .regions()
        .iter()
        .flat_map(|r| r.paragraphs.iter().map(move |p| (r.kind, flatten(p))))
        .collect()
}
