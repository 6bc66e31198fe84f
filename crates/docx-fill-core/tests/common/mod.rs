use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Builds a minimal `.docx` from WordprocessingML fragments.
#[derive(Default)]
pub struct DocxFixture {
    body: String,
    headers: Vec<String>,
    footers: Vec<String>,
}

impl DocxFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, xml: &str) -> Self {
        self.body.push_str(xml);
        self
    }

    pub fn header(mut self, xml: &str) -> Self {
        self.headers.push(xml.to_string());
        self
    }

    pub fn footer(mut self, xml: &str) -> Self {
        self.footers.push(xml.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        let mut parts: Vec<(String, String)> = Vec::new();
        for (i, header) in self.headers.iter().enumerate() {
            let name = format!("header{}.xml", i + 1);
            rels.push_str(&format!(
                r#"<Relationship Id="rIdH{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="{}"/>"#,
                i, name
            ));
            parts.push((
                format!("word/{}", name),
                format!(r#"<w:hdr xmlns:w="{}">{}</w:hdr>"#, W_NS, header),
            ));
        }
        for (i, footer) in self.footers.iter().enumerate() {
            let name = format!("footer{}.xml", i + 1);
            rels.push_str(&format!(
                r#"<Relationship Id="rIdF{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer" Target="{}"/>"#,
                i, name
            ));
            parts.push((
                format!("word/{}", name),
                format!(r#"<w:ftr xmlns:w="{}">{}</w:ftr>"#, W_NS, footer),
            ));
        }
        rels.push_str("</Relationships>");

        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{}"><w:body>{}<w:sectPr/></w:body></w:document>"#,
            W_NS, self.body
        );

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut write = |name: &str, content: &str| {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        };
        write("[Content_Types].xml", CONTENT_TYPES);
        write("_rels/.rels", PACKAGE_RELS);
        write("word/document.xml", &document);
        write("word/_rels/document.xml.rels", &rels);
        for (name, content) in &parts {
            write(name, content);
        }
        zip.finish().unwrap().into_inner()
    }
}

/// Paragraph with one run per fragment.
pub fn p(fragments: &[&str]) -> String {
    let runs: String = fragments
        .iter()
        .map(|f| format!(r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#, f))
        .collect();
    format!("<w:p>{}</w:p>", runs)
}

/// Table from rows of cell contents (each cell content is raw block XML).
pub fn tbl(rows: &[&[String]]) -> String {
    let rows: String = rows
        .iter()
        .map(|cells| {
            let cells: String = cells.iter().map(|c| format!("<w:tc>{}</w:tc>", c)).collect();
            format!("<w:tr>{}</w:tr>", cells)
        })
        .collect();
    format!("<w:tbl>{}</w:tbl>", rows)
}

pub fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut xml = String::new();
    file.read_to_string(&mut xml).unwrap();
    xml
}

pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect()
}
