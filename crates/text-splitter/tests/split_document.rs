use docmentor_text_splitter::{Document, SplitterConfig, TextSplitter};
use tempfile::TempDir;

const HANDBOOK: &str = "\
Ownership

Each value in Rust has an owner. There can only be one owner at a time. When the owner goes out of scope, the value will be dropped.

Borrowing

References let you use a value without taking ownership of it. At any given time you can have either one mutable reference or any number of immutable references.
";

#[test]
fn file_segments_preserve_order_and_overlap() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("handbook.md");
    std::fs::write(&path, HANDBOOK).expect("write");

    let splitter = TextSplitter::new(SplitterConfig::new(80, 20)).expect("splitter");
    let doc = Document::from_file(&path, &splitter).expect("document");

    assert_eq!(doc.title, "handbook");
    assert!(doc.segments.len() > 3, "{:#?}", doc.segments);
    assert!(doc.segments[0].starts_with("Ownership"));
    assert!(doc.segments.last().unwrap().ends_with("immutable references."));
    for segment in &doc.segments {
        assert!(segment.chars().count() <= 80, "{segment:?}");
        assert_eq!(segment.trim(), segment);
    }

    let ownership = doc
        .segments
        .iter()
        .position(|s| s.contains("Each value"))
        .expect("ownership segment");
    let borrowing = doc
        .segments
        .iter()
        .position(|s| s.contains("References let you"))
        .expect("borrowing segment");
    assert!(ownership < borrowing);
}

#[test]
fn same_file_gets_same_id() {
    let splitter = TextSplitter::new(SplitterConfig::default()).expect("splitter");
    let a = Document::from_text("handbook", HANDBOOK, &splitter);
    let b = Document::from_text("handbook", HANDBOOK, &splitter);
    assert_eq!(a.id, b.id);
    assert_eq!(a.segments, b.segments);
    assert_eq!(a.segments.len(), 1);
}
