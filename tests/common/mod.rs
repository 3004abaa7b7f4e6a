#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use analisi_report::{ReportConfig, ReportRecord};
use lopdf::{Document, Object, Stream, dictionary};

/// Output directory: tests/output/<case>/
pub fn output_dir(case: &str) -> PathBuf {
    let dir = PathBuf::from("tests/output").join(case);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// A template of `pages` pages, each showing `TPL <n>` (1-based).
pub fn template_bytes(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let mut kids: Vec<Object> = Vec::with_capacity(pages);
    for i in 0..pages {
        let content = format!("BT /F1 48 Tf 100 400 Td (TPL {}) Tj ET", i + 1).into_bytes();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 1440.into(), 810.into()],
        });
        kids.push(page_id.into());
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

pub fn write_template(case: &str, pages: usize) -> PathBuf {
    let path = output_dir(case).join("template.pdf");
    fs::write(&path, template_bytes(pages)).unwrap();
    path
}

pub fn config_for(template: &Path) -> ReportConfig {
    ReportConfig {
        template_path: template.to_path_buf(),
        ..ReportConfig::default()
    }
}

pub fn sample_json() -> &'static str {
    r#"{
        "data": {
            "nome_cliente": "Rossi & Figli",
            "sito_web": "www.rossi-figli.it",
            "benefici_prodotti": "Risparmio|Qualità|Assistenza|Garanzia|Consegna rapida",
            "spiegazione_benefici_prodotti": "Costi ridotti del 20%|Materiali certificati|Supporto 7 giorni su 7|Due anni inclusi|Entro 48 ore",
            "bisogni_principali": "Affidabilità|Prezzo",
            "spiegazione_bisogni_principali": "Il cliente vuole un fornitore stabile|Budget limitato",
            "target_demografico": {
                "eta": "35-55",
                "genere": "Misto",
                "area_geografica": "Nord Italia",
                "reddito": "Medio-alto",
                "professione": "Imprenditori"
            },
            "obiezioni": {
                "necessita": "Non è chiaro perché serva adesso",
                "urgenza": "Il problema non sembra urgente",
                "fiducia": "Marchio poco conosciuto",
                "budget": "Prezzo percepito come alto",
                "concorrenza": "Il concorrente offre uno sconto"
            },
            "domande_tecniche": "Quanto dura?|Serve installazione?",
            "risposte_domande_tecniche": "Dieci anni|No, pronto all'uso",
            "concorrenti": "Bianchi Srl|Verdi SpA",
            "note_concorrenti": "Prezzi bassi ma qualità scarsa|Leader di mercato",
            "bisogni_derivati": "Formazione",
            "spiegazione_bisogni_derivati": "Corsi per il personale"
        }
    }"#
}

pub fn sample_record() -> ReportRecord {
    ReportRecord::from_json_str(sample_json()).unwrap()
}

pub fn page_count(pdf: &[u8]) -> usize {
    Document::load_mem(pdf).unwrap().get_pages().len()
}

/// Decompressed content stream of every page, in page order.
pub fn page_contents(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|id| String::from_utf8_lossy(&doc.get_page_content(*id).unwrap()).into_owned())
        .collect()
}

/// Template page number shown on each page, `None` for rendered pages.
pub fn template_markers(pdf: &[u8]) -> Vec<Option<usize>> {
    page_contents(pdf)
        .iter()
        .map(|content| {
            let start = content.find("(TPL ")? + 5;
            let end = start + content[start..].find(')')?;
            content[start..end].parse().ok()
        })
        .collect()
}
