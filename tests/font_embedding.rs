use std::path::{Path, PathBuf};

use analisi_report::{
    Entry, FontFace, FontRegistry, LayoutMetrics, LayoutPolicy, PageGeometry, Section, SectionKind,
    StyleSpec, Typesetter, render_section,
};
use lopdf::content::Content;
use lopdf::{Document, Object};

const TITLE: &str = "Analisi di Prova";

/// Regular and bold TrueType faces installed on the machine, if any.
fn system_faces() -> Option<(PathBuf, PathBuf)> {
    let candidates = [
        (
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        ),
        (
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
        ),
        (
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
        ),
    ];
    candidates
        .iter()
        .map(|(r, b)| (Path::new(r), Path::new(b)))
        .find(|(r, b)| r.exists() && b.exists())
        .map(|(r, b)| (r.to_path_buf(), b.to_path_buf()))
}

fn load_system_fonts() -> Option<FontRegistry> {
    let Some((regular, bold)) = system_faces() else {
        eprintln!("No system TrueType fonts found, skipping");
        return None;
    };
    Some(FontRegistry::load(Some(&regular), Some(&bold)).unwrap())
}

fn section() -> Section {
    Section {
        kind: SectionKind::Demographics,
        subtitle: "Target demografico".into(),
        entries: vec![
            Entry::value("Età", "25-40 anni"),
            Entry::value("Area geografica", "Nord Italia, più città"),
        ],
        policy: LayoutPolicy::FixedGroups(vec![3]),
    }
}

/// Operands of every `Tj` in the document, in page order.
fn shown_strings(doc: &Document) -> Vec<Vec<u8>> {
    let mut shown = Vec::new();
    for id in doc.get_pages().values() {
        let content = Content::decode(&doc.get_page_content(*id).unwrap()).unwrap();
        for op in content.operations {
            if op.operator == "Tj" {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    shown.push(bytes.clone());
                }
            }
        }
    }
    shown
}

#[test]
fn truetype_metrics_replace_builtin_metrics() {
    let Some(fonts) = load_system_fonts() else {
        return;
    };
    let style = StyleSpec {
        face: FontFace::Regular,
        font_size: 24.0,
        color: [0, 0, 0],
    };
    let embedded = fonts.measure_width(TITLE, &style);
    let builtin = FontRegistry::builtin().measure_width(TITLE, &style);
    assert!(embedded > 0.0);
    assert!((embedded - builtin).abs() > 1.0, "{embedded} vs {builtin}");
}

#[test]
fn truetype_faces_are_embedded_as_subsetted_type0_fonts() {
    let Some(fonts) = load_system_fonts() else {
        return;
    };
    let metrics = LayoutMetrics::for_geometry(PageGeometry::Current);
    let container = render_section(&section(), &fonts, &metrics, TITLE);
    let bytes = container.to_pdf(&fonts).unwrap();
    let doc = Document::load_mem(&bytes).unwrap();

    let mut type0 = 0;
    let mut font_files = 0;
    for object in doc.objects.values() {
        let Ok(dict) = object.as_dict() else {
            continue;
        };
        let subtype = dict.get(b"Subtype").and_then(Object::as_name).ok();
        if subtype == Some(b"Type0".as_slice()) {
            assert!(dict.get(b"ToUnicode").is_ok(), "Type0 font without ToUnicode");
            let encoding = dict.get(b"Encoding").and_then(Object::as_name).unwrap();
            assert_eq!(encoding, b"Identity-H");
            type0 += 1;
        }
        if dict.get(b"FontFile2").is_ok() {
            font_files += 1;
        }
    }
    // regular for body text, bold for title and labels
    assert_eq!(type0, 2);
    assert_eq!(font_files, 2);

    // Identity-H shows two bytes per character
    let shown = shown_strings(&doc);
    assert!(!shown.is_empty());
    assert!(shown.iter().all(|s| s.len() % 2 == 0));
    assert_eq!(shown[0].len(), TITLE.chars().count() * 2);
}

#[test]
fn builtin_faces_stay_single_byte() {
    let fonts = FontRegistry::builtin();
    let metrics = LayoutMetrics::for_geometry(PageGeometry::Current);
    let bytes = render_section(&section(), &fonts, &metrics, TITLE)
        .to_pdf(&fonts)
        .unwrap();
    let doc = Document::load_mem(&bytes).unwrap();
    let shown = shown_strings(&doc);
    assert_eq!(shown[0], TITLE.as_bytes());
    assert!(shown.iter().any(|s| s.as_slice() == b"Et\xE0"));
}
