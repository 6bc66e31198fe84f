mod common;

use std::io::Cursor;

use common::{entry_names, p, read_part, tbl, DocxFixture};
use docx_fill_core::descriptor::{align_to_text, parse_extraction_reply, synthesize_keys};
use docx_fill_core::fill::paragraph_texts;
use docx_fill_core::text::{flatten, flatten_document};
use docx_fill_core::{
    fill, AnswerMap, Document, Error, PlaceholderDescriptor, RegionKind, SubstitutionPlan,
};
use pretty_assertions::assert_eq;
use rstest::*;

fn answers(pairs: &[(&str, &str)]) -> AnswerMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn descriptors(pairs: &[(&str, &str)]) -> Vec<PlaceholderDescriptor> {
    pairs
        .iter()
        .map(|(literal, key)| PlaceholderDescriptor::new(*literal, *key, ""))
        .collect()
}

/// Open, fill, serialize, and reopen.
fn fill_bytes(bytes: &[u8], descriptors: &[PlaceholderDescriptor], answers: &AnswerMap) -> Vec<u8> {
    let mut doc = Document::open(bytes).unwrap();
    let plan = SubstitutionPlan::reconcile(descriptors, answers).unwrap();
    fill(&mut doc, &plan);
    doc.serialize().unwrap()
}

fn texts(bytes: &[u8]) -> Vec<(RegionKind, String)> {
    paragraph_texts(&Document::open(bytes).unwrap())
}

#[fixture]
fn contract() -> Vec<u8> {
    let cell = |text: &str| p(&[text]);
    let inner = tbl(&[&[cell("Nested [Date]")]]);
    DocxFixture::new()
        .body(&p(&["Pay ", "$[", "____]", " by [Date]."]))
        .body(&tbl(&[
            &[cell("Amount"), cell("$[____]")],
            &[format!("{}{}", cell("Outer"), inner), cell("[date]")],
        ]))
        .body(&p(&["Plain closing line."]))
        .header(&p(&["Agreement dated [DATE]"]))
        .footer(&p(&["Page footer for [Company]"]))
        .build()
}

#[rstest]
fn test_fills_every_region(contract: Vec<u8>) {
    let out = fill_bytes(
        &contract,
        &descriptors(&[("$[____]", "amount"), ("[Date]", "date"), ("[Company]", "company")]),
        &answers(&[("amount", "100"), ("date", "May 1"), ("company", "Acme")]),
    );

    assert_eq!(
        texts(&out),
        vec![
            (RegionKind::Body, "Pay 100 by May 1.".to_string()),
            (RegionKind::Body, "Plain closing line.".to_string()),
            (RegionKind::Table, "Amount".to_string()),
            (RegionKind::Table, "100".to_string()),
            (RegionKind::Table, "Outer".to_string()),
            (RegionKind::Table, "Nested May 1".to_string()),
            (RegionKind::Table, "May 1".to_string()),
            (RegionKind::Header, "Agreement dated May 1".to_string()),
            (RegionKind::Footer, "Page footer for Acme".to_string()),
        ]
    );
}

#[rstest]
fn test_empty_plan_preserves_text_and_collapses_runs(contract: Vec<u8>) {
    let before = texts(&contract);
    let out = fill_bytes(&contract, &[], &AnswerMap::new());
    assert_eq!(texts(&out), before);

    let doc = Document::open(&out).unwrap();
    assert_eq!(doc.body.paragraphs[0].runs().len(), 1);
    assert!(doc.body.paragraphs[0].runs()[0].has_formatting());
    assert!(read_part(&out, "word/document.xml").contains(
        r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Pay $[____] by [Date].</w:t></w:r></w:p>"#
    ));
}

#[rstest]
fn test_fill_is_idempotent(contract: Vec<u8>) {
    let descriptors = descriptors(&[("$[____]", "amount"), ("[Date]", "date")]);
    let answers = answers(&[("amount", "100"), ("date", "May 1")]);

    let once = fill_bytes(&contract, &descriptors, &answers);
    let twice = fill_bytes(&once, &descriptors, &answers);

    assert_eq!(texts(&twice), texts(&once));
    assert_eq!(read_part(&twice, "word/document.xml"), read_part(&once, "word/document.xml"));
}

#[rstest]
fn test_missing_answers_leave_literals(contract: Vec<u8>) {
    let out = fill_bytes(
        &contract,
        &descriptors(&[("$[____]", "amount"), ("[Date]", "date")]),
        &answers(&[("date", "May 1")]),
    );
    let body = &texts(&out)[0].1;
    assert_eq!(body, "Pay $[____] by May 1.");
}

#[rstest]
fn test_untouched_parts_survive(contract: Vec<u8>) {
    let out = fill_bytes(&contract, &[], &AnswerMap::new());
    let mut before = entry_names(&contract);
    let mut after = entry_names(&out);
    before.sort();
    after.sort();
    assert_eq!(after, before);
    assert_eq!(
        read_part(&out, "word/_rels/document.xml.rels"),
        read_part(&contract, "word/_rels/document.xml.rels")
    );
}

#[test]
fn test_signature_blocks_resolve_by_position() {
    let bytes = DocxFixture::new()
        .body(&p(&["COMPANY"]))
        .body(&p(&["Name:[name] ", "Title:[title]"]))
        .body(&p(&["INVESTOR"]))
        .body(&p(&["Name:[name] Title:", "[title]"]))
        .build();

    let out = fill_bytes(
        &bytes,
        &descriptors(&[("[name]", "k1"), ("[title]", "k2"), ("[name]", "k3"), ("[title]", "k4")]),
        &answers(&[("k1", "Alice"), ("k2", "CEO"), ("k3", "Bob"), ("k4", "Investor")]),
    );

    let body: Vec<String> = texts(&out).into_iter().map(|(_, t)| t).collect();
    assert_eq!(
        body,
        vec!["COMPANY", "Name:Alice Title:CEO", "INVESTOR", "Name:Bob Title:Investor"]
    );
}

#[test]
fn test_locked_paragraph_keeps_xml_and_alignment() {
    let picture = r#"<w:p><w:r><w:t>[name]</w:t></w:r><w:r><w:drawing/></w:r></w:p>"#;
    let bytes = DocxFixture::new()
        .body(picture)
        .body(&p(&["Signed: [name]"]))
        .build();

    let out = fill_bytes(
        &bytes,
        &descriptors(&[("[name]", "k1"), ("[name]", "k2")]),
        &answers(&[("k1", "Alice"), ("k2", "Bob")]),
    );

    let xml = read_part(&out, "word/document.xml");
    assert!(xml.contains(picture));
    assert_eq!(texts(&out)[1].1, "Signed: Bob");
}

#[test]
fn test_paragraph_properties_are_kept() {
    let bytes = DocxFixture::new()
        .body(r#"<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>[Title]</w:t></w:r></w:p>"#)
        .build();
    let out = fill_bytes(
        &bytes,
        &descriptors(&[("[Title]", "t")]),
        &answers(&[("t", "Q&A <draft>")]),
    );
    let xml = read_part(&out, "word/document.xml");
    assert!(xml.contains(
        r#"<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t xml:space="preserve">Q&amp;A &lt;draft&gt;</w:t></w:r></w:p>"#
    ));
}

#[test]
fn test_content_controls_are_traversed() {
    let bytes = DocxFixture::new()
        .body(&format!(
            "<w:sdt><w:sdtPr/><w:sdtContent>{}</w:sdtContent></w:sdt>",
            p(&["Client: [client]"])
        ))
        .build();
    let out = fill_bytes(
        &bytes,
        &descriptors(&[("[client]", "")]),
        &answers(&[("[client]", "Initech")]),
    );
    assert_eq!(texts(&out)[0].1, "Client: Initech");
}

#[test]
fn test_flatten_document_feeds_extraction_order() {
    let bytes = DocxFixture::new()
        .body(&p(&["Pay $[____]", " on\n[Date]."]))
        .body(&tbl(&[&[p(&["Name:[name]"])]]))
        .header(&p(&["[Company]"]))
        .build();
    let doc = Document::open(&bytes).unwrap();
    let text = flatten_document(&doc);
    assert_eq!(text, "Pay $[____] on [Date]. Name:[name] [Company]");

    let reply = r#"Sure! [{"placeholder":"[Company]","question":"Company?"},{"placeholder":"$[____]","question":"Amount?"},{"placeholder":"[name]","question":"Name?"},{"placeholder":"[Date]","question":"Date?"}]"#;
    let mut found = align_to_text(parse_extraction_reply(reply).unwrap(), &text).unwrap();
    synthesize_keys(&mut found);

    let literals: Vec<&str> = found.iter().map(|d| d.literal.as_str()).collect();
    assert_eq!(literals, vec!["$[____]", "[Date]", "[name]", "[Company]"]);
    assert_eq!(found[0].key, "$[____]_0");
}

#[test]
fn test_non_breaking_space_literal_is_filled() {
    let bytes = DocxFixture::new()
        .body(&p(&["Party:  ", "[Company\u{a0}Name]"]))
        .build();
    let text = flatten_document(&Document::open(&bytes).unwrap());
    assert_eq!(text, "Party: [Company\u{a0}Name]");

    let reply = "[{\"placeholder\":\"[Company\u{a0}Name]\",\"question\":\"Company?\"}]";
    let mut found = align_to_text(parse_extraction_reply(reply).unwrap(), &text).unwrap();
    synthesize_keys(&mut found);

    let out = fill_bytes(&bytes, &found, &answers(&[(found[0].key.as_str(), "Acme")]));
    assert_eq!(texts(&out)[0].1, "Party:  Acme");
}

#[test]
fn test_footer_with_page_field_is_left_alone() {
    let footer = r#"<w:p><w:r><w:t xml:space="preserve">[Company] Page </w:t></w:r><w:fldSimple w:instr=" PAGE "><w:r><w:t>1</w:t></w:r></w:fldSimple></w:p>"#;
    let bytes = DocxFixture::new()
        .body(&p(&["Signed by [Company]"]))
        .footer(footer)
        .build();

    let mut doc = Document::open(&bytes).unwrap();
    let plan = SubstitutionPlan::reconcile(
        &descriptors(&[("[Company]", "c1"), ("[Company]", "c2")]),
        &answers(&[("c1", "Acme"), ("c2", "Acme")]),
    )
    .unwrap();
    let report = fill(&mut doc, &plan);
    assert_eq!(report.paragraphs_locked, 1);

    let out = doc.serialize().unwrap();
    assert_eq!(texts(&out)[0].1, "Signed by Acme");
    assert!(read_part(&out, "word/footer1.xml").contains(footer));
}

#[test]
fn test_open_rejects_garbage() {
    assert!(matches!(
        Document::open(b"PK\x03\x04 truncated"),
        Err(Error::MalformedDocument(_))
    ));
}

#[test]
fn test_detached_document_cannot_serialize() {
    let doc = Document::default();
    assert!(matches!(doc.serialize(), Err(Error::DetachedDocument)));
}

#[test]
fn test_docx_rs_document_round_trip() {
    use docx_rs::{Docx, Footer, Header, Paragraph, Run, Table, TableCell, TableRow};

    let mut buf = Vec::new();
    Docx::new()
        .header(Header::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("Ref [ref]"))))
        .footer(Footer::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("[Company] confidential"))))
        .add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text("Dear ").bold())
                .add_run(Run::new().add_text("[Name],")),
        )
        .add_table(Table::new(vec![TableRow::new(vec![
            TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("Amount: $[___]"))),
        ])]))
        .build()
        .pack(Cursor::new(&mut buf))
        .unwrap();

    let out = fill_bytes(
        &buf,
        &descriptors(&[("[ref]", "r"), ("[Name]", "n"), ("$[___]", "a"), ("[Company]", "c")]),
        &answers(&[("r", "X-1"), ("n", "Ada"), ("a", "5"), ("c", "Acme")]),
    );

    let doc = Document::open(&out).unwrap();
    let all = flatten_document(&doc);
    assert!(all.contains("Dear Ada,"), "{}", all);
    assert!(all.contains("Amount: 5"), "{}", all);
    assert!(all.contains("Ref X-1"), "{}", all);
    assert!(all.contains("Acme confidential"), "{}", all);
    assert!(doc
        .regions()
        .iter()
        .flat_map(|r| r.paragraphs.iter())
        .all(|p| !flatten(p).contains('[')));
}
