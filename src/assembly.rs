use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use lopdf::{
    Dictionary, Document as LoDocument, Object as LoObject, ObjectId as LoObjectId, dictionary,
};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::SectionKind;

/// Version of the built-in plan, bumped whenever the template layout changes.
pub const BUILTIN_PLAN_VERSION: u32 = 3;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanToken {
    /// Template pages `start..end`, zero-based and end-exclusive.
    Template { start: usize, end: usize },
    Section(SectionKind),
}

impl fmt::Display for PlanToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanToken::Template { start, end } => write!(f, "template[{start}..{end}]"),
            PlanToken::Section(kind) => write!(f, "section {kind}"),
        }
    }
}

/// Where a run of output pages comes from, after clamping to the template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageSource {
    Template(Range<usize>),
    Section(SectionKind),
}

/// Ordered splice of template ranges and rendered sections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPlan")]
pub struct AssemblyPlan {
    version: u32,
    tokens: Vec<PlanToken>,
}

#[derive(Deserialize)]
struct RawPlan {
    #[serde(default)]
    version: u32,
    tokens: Vec<PlanToken>,
}

impl TryFrom<RawPlan> for AssemblyPlan {
    type Error = Error;

    fn try_from(raw: RawPlan) -> Result<Self, Self::Error> {
        AssemblyPlan::new(raw.version, raw.tokens)
    }
}

impl AssemblyPlan {
    /// Every section must appear exactly once; template ranges must be
    /// well-formed and must not overlap.
    pub fn new(version: u32, tokens: Vec<PlanToken>) -> Result<Self, Error> {
        let mut seen: BTreeMap<SectionKind, usize> = BTreeMap::new();
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for token in &tokens {
            match token {
                PlanToken::Section(kind) => *seen.entry(*kind).or_default() += 1,
                PlanToken::Template { start, end } => {
                    if start > end {
                        return Err(Error::InvalidPlan(format!("{token} has start after end")));
                    }
                    if start < end {
                        ranges.push((*start, *end));
                    }
                }
            }
        }
        for kind in SectionKind::ALL {
            match seen.get(&kind).copied().unwrap_or(0) {
                1 => {}
                0 => return Err(Error::InvalidPlan(format!("section {kind} is missing"))),
                n => return Err(Error::InvalidPlan(format!("section {kind} appears {n} times"))),
            }
        }
        ranges.sort_unstable();
        for pair in ranges.windows(2) {
            if pair[1].0 < pair[0].1 {
                return Err(Error::InvalidPlan(format!(
                    "template ranges {}..{} and {}..{} overlap",
                    pair[0].0, pair[0].1, pair[1].0, pair[1].1
                )));
            }
        }
        Ok(Self { version, tokens })
    }

    /// The plan for the 60-page strategy template.
    pub fn builtin() -> Self {
        use PlanToken::{Section, Template};
        Self {
            version: BUILTIN_PLAN_VERSION,
            tokens: vec![
                Template { start: 0, end: 6 },
                Section(SectionKind::Benefits),
                Section(SectionKind::CoreNeeds),
                Template { start: 6, end: 12 },
                Section(SectionKind::Demographics),
                Section(SectionKind::Objections),
                Template { start: 12, end: 20 },
                Section(SectionKind::TechnicalQuestions),
                Section(SectionKind::Competitors),
                Section(SectionKind::DerivedNeeds),
                Template { start: 20, end: 60 },
            ],
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, Error> {
        serde_json::from_str(s).map_err(|e| Error::InvalidPlan(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn tokens(&self) -> &[PlanToken] {
        &self.tokens
    }

    /// Clamp template ranges to a template of `page_count` pages.
    pub fn resolve(&self, page_count: usize) -> Vec<PageSource> {
        self.tokens
            .iter()
            .map(|token| match token {
                PlanToken::Template { start, end } => {
                    let clamped = (*start).min(page_count)..(*end).min(page_count);
                    if clamped.len() != end - start {
                        log::warn!(
                            "{token} clamped to {}..{} (template has {page_count} pages)",
                            clamped.start,
                            clamped.end
                        );
                    }
                    PageSource::Template(clamped)
                }
                PlanToken::Section(kind) => PageSource::Section(*kind),
            })
            .collect()
    }
}

/// A parsed template, loaded once and shared read-only between builds.
pub struct Template {
    path: PathBuf,
    doc: LoDocument,
    page_count: usize,
}

impl Template {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingTemplate {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(Error::Io(e)),
        };
        Self::from_bytes(path, &bytes)
    }

    /// Parse template bytes; `path` is only used in diagnostics.
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self, Error> {
        let corrupt = |page_count: Option<usize>, reason: String| Error::TemplateCorrupt {
            path: path.to_path_buf(),
            page_count,
            reason,
        };
        let doc = LoDocument::load_mem(bytes).map_err(|e| corrupt(None, e.to_string()))?;
        if doc.is_encrypted() {
            return Err(corrupt(None, "template is encrypted".into()));
        }
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(corrupt(Some(0), "no pages".into()));
        }
        for (n, (_, id)) in pages.iter().enumerate() {
            if let Err(e) = doc.get_dictionary(*id) {
                return Err(corrupt(Some(n), format!("page {}: {e}", n + 1)));
            }
        }
        log::info!("Template {}: {} pages", path.display(), pages.len());
        Ok(Self {
            path: path.to_path_buf(),
            page_count: pages.len(),
            doc,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }
}

/// The assembled report.
pub struct FinalDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl FinalDocument {
    pub fn write_to(&self, path: &Path) -> Result<(), Error> {
        std::fs::write(path, &self.bytes).map_err(Error::Io)
    }
}

fn lopdf_err(err: lopdf::Error) -> Error {
    Error::Assembly(err.to_string())
}

/// Move all objects of `src` into `dst` under fresh ids; returns the page ids
/// of `src` in page order.
fn import_document_objects(dst: &mut LoDocument, mut src: LoDocument) -> Vec<LoObjectId> {
    src.renumber_objects_with(dst.max_id + 1);
    let page_ids: Vec<LoObjectId> = src.get_pages().values().copied().collect();
    if src.max_id > dst.max_id {
        dst.max_id = src.max_id;
    }
    dst.objects.extend(src.objects);
    page_ids
}

fn inherited_attribute(doc: &LoDocument, page: &Dictionary, key: &[u8]) -> Option<LoObject> {
    let mut parent = page.get(b"Parent").and_then(LoObject::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(LoObject::as_reference).ok();
    }
    None
}

/// Copy inherited attributes onto the page itself so it can be moved to a
/// new parent, then reparent it.
fn adopt_page(doc: &mut LoDocument, page_id: LoObjectId, parent: LoObjectId) -> Result<(), Error> {
    let page = doc.get_dictionary(page_id).map_err(lopdf_err)?;
    let inherited: Vec<(&[u8], LoObject)> = INHERITABLE
        .into_iter()
        .filter(|key| !page.has(key))
        .filter_map(|key| inherited_attribute(doc, page, key).map(|value| (key, value)))
        .collect();
    let page = doc.get_dictionary_mut(page_id).map_err(lopdf_err)?;
    for (key, value) in inherited {
        page.set(key, value);
    }
    page.set("Parent", parent);
    Ok(())
}

/// Splice template pages and rendered section PDFs in plan order.
///
/// `sections` maps each section to its standalone PDF. The template itself
/// is not modified; its pages are copied into a new document.
pub fn assemble(
    template: &Template,
    sections: &BTreeMap<SectionKind, Vec<u8>>,
    plan: &AssemblyPlan,
) -> Result<FinalDocument, Error> {
    let t0 = std::time::Instant::now();
    let sources = plan.resolve(template.page_count());

    let mut composed = LoDocument::with_version("1.7");
    let template_pages = import_document_objects(&mut composed, template.doc.clone());

    let mut kids: Vec<LoObjectId> = Vec::new();
    for source in &sources {
        match source {
            PageSource::Template(range) => {
                kids.extend_from_slice(&template_pages[range.clone()]);
            }
            PageSource::Section(kind) => {
                let bytes = sections.get(kind).ok_or(Error::MissingSection(*kind))?;
                let src = LoDocument::load_mem(bytes)
                    .map_err(|e| Error::Rendering(format!("section {kind}: {e}")))?;
                let pages = import_document_objects(&mut composed, src);
                log::debug!("Spliced {kind}: {} page(s)", pages.len());
                kids.extend(pages);
            }
        }
    }
    let t_import = t0.elapsed();

    let pages_id = composed.new_object_id();
    for &page_id in &kids {
        adopt_page(&mut composed, page_id, pages_id)?;
    }
    let page_count = kids.len();
    composed.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.into_iter().map(LoObject::Reference).collect::<Vec<_>>(),
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = composed.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    composed.trailer.set("Root", catalog_id);
    composed.prune_objects();
    composed.renumber_objects();
    composed.compress();

    let mut bytes = Vec::new();
    composed.save_to(&mut bytes)?;
    let t_total = t0.elapsed();

    log::info!(
        "Assembly: plan v{}, {} pages, import={:.1}ms, write={:.1}ms (output {} bytes)",
        plan.version(),
        page_count,
        t_import.as_secs_f64() * 1000.0,
        (t_total - t_import).as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(FinalDocument { bytes, page_count })
}
