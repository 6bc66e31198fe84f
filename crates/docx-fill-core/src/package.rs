//! Reading and writing the `.docx` package.
//!
//! The zip entries are kept as-is. Only the XML parts that contain
//! rewritten paragraphs are spliced on serialize: each rewritten paragraph
//! has its content after `w:pPr` replaced, every other byte is copied through.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::ops::Range;

use roxmltree::Node;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::model::{Container, Document, Paragraph, Row, Run, Table};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// Where a paragraph's run content lives in its source part.
#[derive(Debug, Clone)]
pub(crate) struct Anchor {
    part: usize,
    content: Range<usize>,
    /// Namespace prefix used by the part, usually `w:`.
    prefix: String,
}

#[derive(Debug, Clone)]
pub(crate) struct Package {
    entries: Vec<Entry>,
    parts: Vec<XmlPart>,
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

#[derive(Debug, Clone)]
struct XmlPart {
    entry: usize,
    xml: String,
}

#[derive(Clone, Copy)]
struct PartCtx<'s> {
    part: usize,
    src: &'s str,
}

impl Document {
    /// Parse a `.docx` package.
    pub fn open(bytes: &[u8]) -> Result<Document> {
        let entries = read_entries(bytes)?;
        let index: HashMap<String, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();

        let main_name = resolve_main_part(&entries, &index)?;
        let main_entry = *index.get(&main_name).ok_or_else(|| {
            Error::MalformedDocument(format!("main document part '{}' not found", main_name))
        })?;

        let mut parts = Vec::new();

        let xml = part_text(&entries[main_entry])?;
        let body = parse_part(&xml, parts.len(), PartRoot::Body)?;
        parts.push(XmlPart {
            entry: main_entry,
            xml,
        });

        let mut headers = Vec::new();
        let mut footers = Vec::new();
        for rel in read_relationships(&entries, &index, &main_name)? {
            let root = match rel.kind {
                RelKind::Header => PartRoot::Header,
                RelKind::Footer => PartRoot::Footer,
                RelKind::Other => continue,
            };
            let Some(&entry) = index.get(&rel.target) else {
                warn!("Relationship target '{}' missing from package", rel.target);
                continue;
            };
            let xml = part_text(&entries[entry])?;
            let container = parse_part(&xml, parts.len(), root)?;
            parts.push(XmlPart { entry, xml });
            match root {
                PartRoot::Header => headers.push(container),
                _ => footers.push(container),
            }
        }

        debug!(
            "Opened package: {} entries, {} headers, {} footers",
            entries.len(),
            headers.len(),
            footers.len()
        );

        Ok(Document {
            body,
            headers,
            footers,
            package: Some(Package { entries, parts }),
        })
    }

    /// Write the document back to `.docx` bytes.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let package = self.package.as_ref().ok_or(Error::DetachedDocument)?;

        let mut edits: Vec<Vec<(Range<usize>, String)>> = vec![Vec::new(); package.parts.len()];
        for region in self.regions() {
            for paragraph in region.paragraphs {
                if !paragraph.is_rewritten() {
                    continue;
                }
                if let Some(anchor) = &paragraph.anchor {
                    edits[anchor.part].push((
                        anchor.content.clone(),
                        render_runs(paragraph.runs(), &anchor.prefix),
                    ));
                }
            }
        }

        let mut replaced: HashMap<usize, Vec<u8>> = HashMap::new();
        for (part, mut part_edits) in package.parts.iter().zip(edits) {
            if part_edits.is_empty() {
                continue;
            }
            // Splice back to front so earlier offsets stay valid.
            part_edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
            let mut xml = part.xml.clone();
            for (range, content) in part_edits {
                xml.replace_range(range, &content);
            }
            replaced.insert(part.entry, xml.into_bytes());
        }

        write_entries(&package.entries, &replaced)
    }
}

// ─── zip I/O ────────────────────────────────────────────────────────────────

fn read_entries(bytes: &[u8]) -> Result<Vec<Entry>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();
        let is_dir = file.is_dir();
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| Error::MalformedDocument(format!("failed to read '{}': {}", name, e)))?;
        entries.push(Entry { name, data, is_dir });
    }
    Ok(entries)
}

/// Media is stored, everything else deflated, matching what Word writes.
fn write_entries(entries: &[Entry], replaced: &HashMap<usize, Vec<u8>>) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for (i, entry) in entries.iter().enumerate() {
        let options = if entry.name.starts_with("word/media/") {
            stored
        } else {
            deflated
        };
        if entry.is_dir {
            zip.add_directory(entry.name.as_str(), options)?;
            continue;
        }
        zip.start_file(entry.name.as_str(), options)?;
        let data = replaced.get(&i).unwrap_or(&entry.data);
        zip.write_all(data)?;
    }

    Ok(zip.finish()?.into_inner())
}

fn part_text(entry: &Entry) -> Result<String> {
    let text = String::from_utf8(entry.data.clone())
        .map_err(|_| Error::MalformedDocument(format!("part '{}' is not UTF-8", entry.name)))?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

// ─── relationships ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelKind {
    Header,
    Footer,
    Other,
}

#[derive(Debug)]
struct Relationship {
    kind: RelKind,
    target: String,
}

fn resolve_main_part(entries: &[Entry], index: &HashMap<String, usize>) -> Result<String> {
    let Some(&rels) = index.get("_rels/.rels") else {
        return Ok(DEFAULT_MAIN_PART.to_string());
    };
    let xml = part_text(&entries[rels])?;
    let doc = roxmltree::Document::parse(&xml)?;
    let main = doc
        .descendants()
        .filter(|n| n.tag_name().name() == "Relationship")
        .find(|n| {
            n.attribute("Type")
                .is_some_and(|t| t.ends_with("/officeDocument"))
        })
        .and_then(|n| n.attribute("Target"))
        .map(|t| resolve_target("", t));
    Ok(main.unwrap_or_else(|| DEFAULT_MAIN_PART.to_string()))
}

/// Relationships of `part_name`, in document order.
fn read_relationships(
    entries: &[Entry],
    index: &HashMap<String, usize>,
    part_name: &str,
) -> Result<Vec<Relationship>> {
    let (dir, file) = match part_name.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", part_name),
    };
    let rels_name = if dir.is_empty() {
        format!("_rels/{}.rels", file)
    } else {
        format!("{}/_rels/{}.rels", dir, file)
    };
    let Some(&rels) = index.get(&rels_name) else {
        return Ok(Vec::new());
    };

    let xml = part_text(&entries[rels])?;
    let doc = roxmltree::Document::parse(&xml)?;
    let mut out = Vec::new();
    for node in doc.descendants() {
        if node.tag_name().name() != "Relationship" {
            continue;
        }
        if node.attribute("TargetMode") == Some("External") {
            continue;
        }
        let (Some(kind), Some(target)) = (node.attribute("Type"), node.attribute("Target")) else {
            continue;
        };
        let kind = if kind.ends_with("/header") {
            RelKind::Header
        } else if kind.ends_with("/footer") {
            RelKind::Footer
        } else {
            RelKind::Other
        };
        out.push(Relationship {
            kind,
            target: resolve_target(dir, target),
        });
    }
    Ok(out)
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

// ─── WordprocessingML ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartRoot {
    Body,
    Header,
    Footer,
}

fn parse_part(xml: &str, part: usize, root: PartRoot) -> Result<Container> {
    let doc = roxmltree::Document::parse(xml)?;
    let ctx = PartCtx { part, src: xml };
    let top = doc.root_element();

    let container_node = match root {
        PartRoot::Body => {
            if !is_w(top, "document") {
                return Err(Error::MalformedDocument(
                    "main part is not a w:document".to_string(),
                ));
            }
            top.children()
                .find(|n| is_w(*n, "body"))
                .ok_or_else(|| Error::MalformedDocument("document has no w:body".to_string()))?
        }
        PartRoot::Header if is_w(top, "hdr") => top,
        PartRoot::Footer if is_w(top, "ftr") => top,
        _ => {
            return Err(Error::MalformedDocument(format!(
                "unexpected root element '{}' in {:?} part",
                top.tag_name().name(),
                root
            )))
        }
    };

    Ok(read_container(container_node, ctx))
}

fn is_w(node: Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(W_NS)
}

/// Element children of a block container, looking through content controls
/// and custom XML wrappers.
fn block_children<'a, 'input>(node: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    let mut out = Vec::new();
    for child in node.children().filter(|n| n.is_element()) {
        if is_w(child, "sdt") {
            if let Some(content) = child.children().find(|n| is_w(*n, "sdtContent")) {
                out.extend(block_children(content));
            }
        } else if is_w(child, "customXml") {
            out.extend(block_children(child));
        } else {
            out.push(child);
        }
    }
    out
}

fn read_container(node: Node, ctx: PartCtx) -> Container {
    let mut container = Container::default();
    for child in block_children(node) {
        if is_w(child, "p") {
            container.paragraphs.push(read_paragraph(child, ctx));
        } else if is_w(child, "tbl") {
            container.tables.push(read_table(child, ctx));
        }
    }
    container
}

fn read_table(node: Node, ctx: PartCtx) -> Table {
    let rows = block_children(node)
        .into_iter()
        .filter(|n| is_w(*n, "tr"))
        .map(|tr| Row {
            cells: block_children(tr)
                .into_iter()
                .filter(|n| is_w(*n, "tc"))
                .map(|tc| read_container(tc, ctx))
                .collect(),
        })
        .collect();
    Table { rows }
}

fn read_paragraph(node: Node, ctx: PartCtx) -> Paragraph {
    let mut runs = Vec::new();
    let mut locked = false;
    collect_runs(node, ctx, &mut runs, &mut locked);
    let anchor = paragraph_anchor(node, ctx);
    if anchor.is_none() && !runs.is_empty() {
        locked = true;
    }
    Paragraph::from_package(runs, locked, anchor)
}

fn collect_runs(node: Node, ctx: PartCtx, runs: &mut Vec<Run>, locked: &mut bool) {
    for child in node.children().filter(|n| n.is_element()) {
        // Equations, alternate content and other foreign markup.
        if child.tag_name().namespace() != Some(W_NS) {
            *locked = true;
            continue;
        }
        match child.tag_name().name() {
            "r" => runs.push(read_run(child, ctx, locked)),
            "pPr" | "del" | "moveFrom" | "p" => {}
            "fldSimple" => {
                *locked = true;
                collect_runs(child, ctx, runs, locked);
            }
            _ => collect_runs(child, ctx, runs, locked),
        }
    }
}

fn read_run(node: Node, ctx: PartCtx, locked: &mut bool) -> Run {
    let mut text = String::new();
    let mut properties = None;
    for child in node.children().filter(|n| n.is_element()) {
        let plain = child.tag_name().namespace() == Some(W_NS);
        match child.tag_name().name() {
            "rPr" if plain => properties = Some(ctx.src[child.range()].to_string()),
            "t" if plain => text.push_str(child.text().unwrap_or_default()),
            "tab" if plain => text.push('\t'),
            "br" if plain && is_line_break(child) => text.push('\n'),
            "cr" if plain => text.push('\n'),
            "noBreakHyphen" if plain => text.push('-'),
            "softHyphen" | "lastRenderedPageBreak" if plain => {}
            // Drawings, fields, page breaks, note references and anything
            // unknown cannot be rebuilt from plain text.
            _ => *locked = true,
        }
    }
    Run::with_properties(text, properties)
}

/// Plain line breaks; page and column breaks lock the paragraph.
fn is_line_break(node: Node) -> bool {
    matches!(node.attribute((W_NS, "type")), None | Some("textWrapping"))
}

/// Locate the run content of a paragraph: after `w:pPr` (or the start tag)
/// up to the closing tag.
fn paragraph_anchor(node: Node, ctx: PartCtx) -> Option<Anchor> {
    let range = node.range();
    let tag = &ctx.src[range.clone()];

    let open_len = tag.find('>')? + 1;
    if tag[..open_len].ends_with("/>") {
        return None;
    }
    let close_start = range.start + tag.rfind("</")?;

    let content_start = node
        .children()
        .find(|n| is_w(*n, "pPr"))
        .map(|n| n.range().end)
        .unwrap_or(range.start + open_len);
    if content_start > close_start {
        return None;
    }

    let qname_len = tag[1..]
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(0);
    let prefix = tag[1..1 + qname_len]
        .strip_suffix('p')
        .unwrap_or_default()
        .to_string();

    Some(Anchor {
        part: ctx.part,
        content: content_start..close_start,
        prefix,
    })
}

fn render_runs(runs: &[Run], prefix: &str) -> String {
    let mut out = String::new();
    for run in runs {
        out.push_str(&format!("<{}r>", prefix));
        if let Some(props) = &run.properties {
            out.push_str(props);
        }
        let mut pending = String::new();
        for c in run.text.chars() {
            match c {
                '\t' | '\n' => {
                    flush_text(&mut out, &mut pending, prefix);
                    let element = if c == '\t' { "tab" } else { "br" };
                    out.push_str(&format!("<{}{}/>", prefix, element));
                }
                '&' => pending.push_str("&amp;"),
                '<' => pending.push_str("&lt;"),
                '>' => pending.push_str("&gt;"),
                c if is_xml_char(c) => pending.push(c),
                _ => {}
            }
        }
        flush_text(&mut out, &mut pending, prefix);
        out.push_str(&format!("</{}r>", prefix));
    }
    out
}

fn flush_text(out: &mut String, pending: &mut String, prefix: &str) {
    if pending.is_empty() {
        return;
    }
    out.push_str(&format!(
        "<{p}t xml:space=\"preserve\">{}</{p}t>",
        pending,
        p = prefix
    ));
    pending.clear();
}

fn is_xml_char(c: char) -> bool {
    !matches!(c, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{d}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}')
}
