mod common;

use analisi_report::{
    Entry, FontRegistry, LayoutMetrics, LayoutPolicy, PageGeometry, ReportRecord, Section,
    SectionContainer, SectionKind, build_section, build_sections, render_section,
};

fn long_text(sentences: usize) -> String {
    vec!["Il cliente ha bisogno di una soluzione affidabile e conveniente."; sentences].join(" ")
}

fn render(section: &Section, geometry: PageGeometry) -> SectionContainer {
    let metrics = LayoutMetrics::for_geometry(geometry);
    render_section(section, &FontRegistry::builtin(), &metrics, "Analisi di Prova")
}

fn assert_within_margins(container: &SectionContainer, geometry: PageGeometry) {
    let metrics = LayoutMetrics::for_geometry(geometry);
    for (n, page) in container.pages().iter().enumerate() {
        for (x, y, text, _) in page.texts() {
            assert!(y >= metrics.bottom_margin, "page {n}: {text:?} drawn at y={y}");
            assert!(x >= metrics.margin);
        }
    }
}

#[test]
fn benefits_cap_two_per_page() {
    let record = ReportRecord::from_json_str(
        r#"{"data": {
            "benefici_prodotti": "A|B|C|D|E",
            "spiegazione_benefici_prodotti": "uno|due|tre|quattro|cinque"
        }}"#,
    )
    .unwrap();
    let section = build_section(&record, SectionKind::Benefits);
    assert_eq!(section.policy, LayoutPolicy::Capped(2));
    assert_eq!(render(&section, PageGeometry::Current).page_count(), 3);
}

#[test]
fn demographics_split_ignores_text_length() {
    let value = long_text(20);
    let json = serde_json::json!({
        "data": {
            "target_demografico": {
                "eta": value,
                "genere": value,
                "area_geografica": value,
                "reddito": value,
                "professione": value,
            }
        }
    });
    let record = ReportRecord::from_value(json).unwrap();
    let section = build_section(&record, SectionKind::Demographics);
    assert_eq!(section.entries.len(), 5);

    for geometry in [PageGeometry::Current, PageGeometry::Legacy] {
        let container = render(&section, geometry);
        assert_eq!(container.page_count(), 2);
        assert_within_margins(&container, geometry);
    }
}

#[test]
fn objections_with_long_text_are_clipped_not_spilled() {
    let text = long_text(40);
    let section = Section {
        kind: SectionKind::Objections,
        subtitle: "Obiezioni".into(),
        entries: ["Necessità", "Urgenza", "Fiducia", "Budget", "Concorrenza"]
            .into_iter()
            .map(|label| Entry::explained(label, text.clone()))
            .collect(),
        policy: LayoutPolicy::FixedGroups(vec![3]),
    };
    let container = render(&section, PageGeometry::Current);
    assert_eq!(container.page_count(), 2);
    assert_within_margins(&container, PageGeometry::Current);
    let last_line = container.pages()[0].texts().last().map(|(_, _, t, _)| t.to_string());
    assert!(last_line.is_some_and(|t| t.ends_with('…')));
}

#[test]
fn long_competitor_notes_flow_onto_more_pages() {
    let section = Section {
        kind: SectionKind::Competitors,
        subtitle: "Analisi dei concorrenti".into(),
        entries: vec![
            Entry::explained("Bianchi Srl", long_text(60)),
            Entry::explained("Verdi SpA", long_text(60)),
        ],
        policy: LayoutPolicy::Overflow,
    };
    for geometry in [PageGeometry::Current, PageGeometry::Legacy] {
        let container = render(&section, geometry);
        assert!(container.page_count() > 2);
        assert_within_margins(&container, geometry);
        for page in container.pages() {
            let header: Vec<&str> = page.texts().take(2).map(|(_, _, t, _)| t).collect();
            assert_eq!(header, vec!["Analisi di Prova", "Analisi dei concorrenti"]);
        }
    }
}

#[test]
fn mismatched_lists_leave_missing_explanations_empty() {
    let record = ReportRecord::from_json_str(
        r#"{"data": {"bisogni_principali": "A|B|C", "spiegazione_bisogni_principali": "x|y"}}"#,
    )
    .unwrap();
    let section = build_section(&record, SectionKind::CoreNeeds);
    assert_eq!(
        section.entries,
        vec![
            Entry::explained("A", "x"),
            Entry::explained("B", "y"),
            Entry::explained("C", ""),
        ]
    );
    let container = render(&section, PageGeometry::Current);
    let labels: Vec<String> = container
        .pages()
        .iter()
        .flat_map(|p| p.texts().map(|(_, _, t, _)| t.to_string()).collect::<Vec<_>>())
        .collect();
    assert!(labels.iter().any(|t| t == "C"));
}

#[test]
fn every_container_has_a_page() {
    let record = ReportRecord::from_json_str("{}").unwrap();
    for section in build_sections(&record) {
        let container = render(&section, PageGeometry::Current);
        assert_eq!(container.page_count(), 1, "{}", section.kind);
    }
}

#[test]
fn sample_record_page_counts() {
    let record = common::sample_record();
    let counts: Vec<(SectionKind, usize)> = build_sections(&record)
        .iter()
        .map(|s| (s.kind, render(s, PageGeometry::Current).page_count()))
        .collect();
    assert_eq!(
        counts,
        vec![
            (SectionKind::Benefits, 3),
            (SectionKind::CoreNeeds, 1),
            (SectionKind::Demographics, 2),
            (SectionKind::Objections, 2),
            (SectionKind::TechnicalQuestions, 1),
            (SectionKind::Competitors, 1),
            (SectionKind::DerivedNeeds, 1),
        ]
    );
}
