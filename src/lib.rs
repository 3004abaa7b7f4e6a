mod assembly;
mod builder;
mod config;
mod error;
mod fonts;
mod model;
mod pdf;
mod record;
mod sections;

pub use assembly::{AssemblyPlan, FinalDocument, PageSource, PlanToken, Template, assemble};
pub use builder::{BuildRun, BuildState, ReportBuilder, SectionRenderer};
pub use config::{
    DEFAULT_TEMPLATE_PATH, DEFAULT_TITLE, GradientStops, LayoutMetrics, PageGeometry, ReportConfig,
};
pub use error::Error;
pub use fonts::FontRegistry;
pub use model::{Entry, FontFace, LayoutPolicy, Rgb, Section, SectionKind, StyleSpec, TextStyle};
pub use pdf::layout::Typesetter;
pub use pdf::{DrawOp, Page, SectionContainer, render_section, write_pages};
pub use record::{ReportRecord, content_disposition, output_filename, slugify, split_pipes};
pub use sections::{build_section, build_sections, default_policy, report_title, subtitle};

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Outcome of [`generate_report`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedReport {
    pub path: PathBuf,
    /// Client slug, as used in the default file name and Content-Disposition.
    pub slug: String,
    pub page_count: usize,
}

/// Build the report for the record at `record_path` and write it to `output`,
/// or to `analisi_<slug>.pdf` in the working directory. Nothing is written
/// when the build fails.
pub fn generate_report(
    record_path: &Path,
    output: Option<&Path>,
    config: ReportConfig,
) -> Result<GeneratedReport, Error> {
    let t0 = Instant::now();

    let record = ReportRecord::from_reader(BufReader::new(File::open(record_path)?))?;
    let t_parse = t0.elapsed();

    let builder = ReportBuilder::new(config)?;
    let t_setup = t0.elapsed();

    let doc = builder.build(&record)?;
    let t_build = t0.elapsed();

    let out = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(record.output_filename()));
    doc.write_to(&out)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, setup={:.1}ms, build={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_parse.as_secs_f64() * 1000.0,
        (t_setup - t_parse).as_secs_f64() * 1000.0,
        (t_build - t_setup).as_secs_f64() * 1000.0,
        (t_total - t_build).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        doc.bytes.len(),
    );

    Ok(GeneratedReport {
        path: out,
        slug: record.slug(),
        page_count: doc.page_count,
    })
}
