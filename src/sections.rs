//! Mapping from record fields to the report's named sections.
//!
//! This is the versioned part of the report: which keys feed which section,
//! the subtitles, and the layout policy each section is drawn with.

use crate::model::{Entry, LayoutPolicy, Section, SectionKind};
use crate::record::ReportRecord;

const DEMOGRAPHIC_FIELDS: [(&str, &str); 6] = [
    ("eta", "Età"),
    ("genere", "Genere"),
    ("area_geografica", "Area geografica"),
    ("reddito", "Reddito"),
    ("professione", "Professione"),
    ("interessi", "Interessi"),
];

const OBJECTION_FIELDS: [(&str, &str); 5] = [
    ("necessita", "Necessità"),
    ("urgenza", "Urgenza"),
    ("fiducia", "Fiducia"),
    ("budget", "Budget"),
    ("concorrenza", "Concorrenza"),
];

enum Source {
    /// Parallel pipe-delimited lists: items and their explanations.
    Paired {
        items: &'static str,
        explanations: &'static str,
    },
    /// Named fields under one object, drawn as label + value line.
    ValueFields {
        parent: &'static str,
        fields: &'static [(&'static str, &'static str)],
    },
    /// Named fields under one object, drawn as label + wrapped text.
    ExplainedFields {
        parent: &'static str,
        fields: &'static [(&'static str, &'static str)],
    },
}

fn source(kind: SectionKind) -> Source {
    match kind {
        SectionKind::Benefits => Source::Paired {
            items: "benefici_prodotti",
            explanations: "spiegazione_benefici_prodotti",
        },
        SectionKind::CoreNeeds => Source::Paired {
            items: "bisogni_principali",
            explanations: "spiegazione_bisogni_principali",
        },
        SectionKind::Demographics => Source::ValueFields {
            parent: "target_demografico",
            fields: &DEMOGRAPHIC_FIELDS,
        },
        SectionKind::Objections => Source::ExplainedFields {
            parent: "obiezioni",
            fields: &OBJECTION_FIELDS,
        },
        SectionKind::TechnicalQuestions => Source::Paired {
            items: "domande_tecniche",
            explanations: "risposte_domande_tecniche",
        },
        SectionKind::Competitors => Source::Paired {
            items: "concorrenti",
            explanations: "note_concorrenti",
        },
        SectionKind::DerivedNeeds => Source::Paired {
            items: "bisogni_derivati",
            explanations: "spiegazione_bisogni_derivati",
        },
    }
}

pub fn subtitle(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::Benefits => "Benefici dei prodotti",
        SectionKind::CoreNeeds => "Bisogni principali",
        SectionKind::Demographics => "Target demografico",
        SectionKind::Objections => "Obiezioni",
        SectionKind::TechnicalQuestions => "Domande tecniche",
        SectionKind::Competitors => "Analisi dei concorrenti",
        SectionKind::DerivedNeeds => "Bisogni derivati",
    }
}

pub fn default_policy(kind: SectionKind) -> LayoutPolicy {
    match kind {
        SectionKind::Benefits | SectionKind::CoreNeeds | SectionKind::DerivedNeeds => {
            LayoutPolicy::Capped(2)
        }
        SectionKind::TechnicalQuestions => LayoutPolicy::Capped(3),
        SectionKind::Demographics | SectionKind::Objections => LayoutPolicy::FixedGroups(vec![3]),
        SectionKind::Competitors => LayoutPolicy::Overflow,
    }
}

fn entries(record: &ReportRecord, kind: SectionKind) -> Vec<Entry> {
    match source(kind) {
        Source::Paired {
            items,
            explanations,
        } => record
            .paired_list(items, explanations)
            .into_iter()
            .map(|(item, explanation)| Entry::explained(item, explanation))
            .collect(),
        Source::ValueFields { parent, fields } => fields
            .iter()
            .map(|(key, label)| (label, record.text(&format!("{parent}.{key}"))))
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(label, value)| Entry::value(*label, value.trim()))
            .collect(),
        Source::ExplainedFields { parent, fields } => fields
            .iter()
            .map(|(key, label)| (label, record.text(&format!("{parent}.{key}"))))
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(label, text)| Entry::explained(*label, text.trim()))
            .collect(),
    }
}

pub fn build_section(record: &ReportRecord, kind: SectionKind) -> Section {
    Section {
        kind,
        subtitle: subtitle(kind).to_string(),
        entries: entries(record, kind),
        policy: default_policy(kind),
    }
}

/// Every named section, in report order.
pub fn build_sections(record: &ReportRecord) -> Vec<Section> {
    SectionKind::ALL
        .into_iter()
        .map(|kind| build_section(record, kind))
        .collect()
}

/// `Analisi di <client>` when the record names the client.
pub fn report_title(record: &ReportRecord, default_title: &str) -> String {
    let client = record.text("nome_cliente");
    let client = client.trim();
    if client.is_empty() {
        default_title.to_string()
    } else {
        format!("Analisi di {client}")
    }
}
