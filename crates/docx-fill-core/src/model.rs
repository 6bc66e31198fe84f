//! In-memory document structure: regions of paragraphs made of runs.
//!
//! A `Document` is a body container plus header and footer containers.
//! Containers hold paragraphs and tables; every table cell is itself a
//! container, so tables nest to any depth.

use serde::Serialize;

use crate::package::{Anchor, Package};

/// Structural zone a paragraph belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Body,
    Table,
    Header,
    Footer,
}

/// A text fragment with formatting the engine does not interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    /// Raw run properties (`w:rPr`), written back verbatim.
    pub(crate) properties: Option<String>,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            properties: None,
        }
    }

    pub(crate) fn with_properties(text: String, properties: Option<String>) -> Self {
        Self { text, properties }
    }

    pub fn has_formatting(&self) -> bool {
        self.properties.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    runs: Vec<Run>,
    /// Set when the runs hold embedded objects or fields that cannot be
    /// rewritten as plain text.
    locked: bool,
    rewritten: bool,
    pub(crate) anchor: Option<Anchor>,
}

impl Paragraph {
    pub fn new(runs: Vec<Run>) -> Self {
        Self {
            runs,
            ..Default::default()
        }
    }

    pub(crate) fn from_package(runs: Vec<Run>, locked: bool, anchor: Option<Anchor>) -> Self {
        Self {
            runs,
            locked,
            rewritten: false,
            anchor,
        }
    }

    /// Paragraph whose runs could not be represented as plain text.
    pub fn locked(runs: Vec<Run>) -> Self {
        Self {
            runs,
            locked: true,
            ..Default::default()
        }
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether the runs were replaced since the document was opened.
    pub fn is_rewritten(&self) -> bool {
        self.rewritten
    }

    /// Replace every run with a single run holding `text`, formatted like
    /// the first run.
    pub fn replace_runs_with_text(&mut self, text: String) {
        let properties = self.runs.first().and_then(|r| r.properties.clone());
        self.runs.clear();
        self.runs.push(Run::with_properties(text, properties));
        self.rewritten = true;
    }
}

/// Anything that holds paragraphs: the body, a header, a footer, or a table cell.
#[derive(Debug, Clone, Default)]
pub struct Container {
    pub paragraphs: Vec<Paragraph>,
    pub tables: Vec<Table>,
}

impl Container {
    pub fn with_paragraphs(paragraphs: Vec<Paragraph>) -> Self {
        Self {
            paragraphs,
            tables: Vec::new(),
        }
    }

    pub fn add_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default)]
pub struct Row {
    pub cells: Vec<Container>,
}

/// A borrowed view of the paragraphs of one region.
#[derive(Debug, Clone, Copy)]
pub struct Region<'a> {
    pub kind: RegionKind,
    pub paragraphs: &'a [Paragraph],
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    pub body: Container,
    pub headers: Vec<Container>,
    pub footers: Vec<Container>,
    pub(crate) package: Option<Package>,
}

impl Document {
    /// Build a document in memory. It can be traversed and filled but not serialized.
    pub fn new(body: Container) -> Self {
        Self {
            body,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, header: Container) -> Self {
        self.headers.push(header);
        self
    }

    pub fn with_footer(mut self, footer: Container) -> Self {
        self.footers.push(footer);
        self
    }

    /// Regions in traversal order: body paragraphs, then every body table
    /// cell depth-first, then each header, then each footer.
    pub fn regions(&self) -> Vec<Region<'_>> {
        let mut out = Vec::new();
        collect_regions(&self.body, RegionKind::Body, &mut out);
        for header in &self.headers {
            collect_regions(header, RegionKind::Header, &mut out);
        }
        for footer in &self.footers {
            collect_regions(footer, RegionKind::Footer, &mut out);
        }
        out
    }

    /// Visit every paragraph mutably, in the same order as [`Document::regions`].
    pub fn for_each_paragraph_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(RegionKind, &mut Paragraph),
    {
        visit_mut(&mut self.body, RegionKind::Body, &mut f);
        for header in &mut self.headers {
            visit_mut(header, RegionKind::Header, &mut f);
        }
        for footer in &mut self.footers {
            visit_mut(footer, RegionKind::Footer, &mut f);
        }
    }

    pub fn paragraph_count(&self) -> usize {
        self.regions().iter().map(|r| r.paragraphs.len()).sum()
    }
}

fn collect_regions<'a>(container: &'a Container, kind: RegionKind, out: &mut Vec<Region<'a>>) {
    out.push(Region {
        kind,
        paragraphs: &container.paragraphs,
    });
    for table in &container.tables {
        for row in &table.rows {
            for cell in &row.cells {
                collect_regions(cell, RegionKind::Table, out);
            }
        }
    }
}

fn visit_mut<F>(container: &mut Container, kind: RegionKind, f: &mut F)
where
    F: FnMut(RegionKind, &mut Paragraph),
{
    for paragraph in &mut container.paragraphs {
        f(kind, paragraph);
    }
    for table in &mut container.tables {
        for row in &mut table.rows {
            for cell in &mut row.cells {
                visit_mut(cell, RegionKind::Table, f);
            }
        }
    }
}
