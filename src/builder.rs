use std::collections::BTreeMap;
use std::sync::Arc;

use crate::assembly::{AssemblyPlan, FinalDocument, Template, assemble};
use crate::config::{LayoutMetrics, ReportConfig};
use crate::error::Error;
use crate::fonts::FontRegistry;
use crate::model::SectionKind;
use crate::pdf::{Page, SectionContainer, render_section, write_pages};
use crate::record::ReportRecord;
use crate::sections::{build_sections, report_title};

/// Lifecycle of a single report build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    RenderingSections,
    Assembling,
    Done,
    Failed,
}

impl BuildState {
    pub fn can_advance_to(self, next: BuildState) -> bool {
        use BuildState::*;
        matches!(
            (self, next),
            (Idle, RenderingSections)
                | (RenderingSections, Assembling)
                | (Assembling, Done)
                | (RenderingSections, Failed)
                | (Assembling, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BuildState::Done | BuildState::Failed)
    }
}

/// Tracks the state of one build and logs each transition.
#[derive(Debug)]
pub struct BuildRun {
    label: String,
    state: BuildState,
}

impl BuildRun {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: BuildState::Idle,
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn advance(&mut self, next: BuildState) -> Result<(), Error> {
        if !self.state.can_advance_to(next) {
            return Err(Error::Rendering(format!(
                "build {}: invalid transition {:?} -> {:?}",
                self.label, self.state, next
            )));
        }
        log::debug!("build {}: {:?} -> {:?}", self.label, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Record `err` and move to `Failed`, handing the error back.
    pub fn fail(&mut self, err: Error) -> Error {
        if self.state.can_advance_to(BuildState::Failed) {
            log::debug!("build {}: {:?} -> Failed ({err})", self.label, self.state);
            self.state = BuildState::Failed;
        }
        err
    }
}

/// Renders the named sections of a record into standalone containers.
pub struct SectionRenderer {
    metrics: LayoutMetrics,
    fonts: Arc<FontRegistry>,
    default_title: String,
}

impl SectionRenderer {
    pub fn new(
        metrics: LayoutMetrics,
        fonts: Arc<FontRegistry>,
        default_title: impl Into<String>,
    ) -> Self {
        Self {
            metrics,
            fonts,
            default_title: default_title.into(),
        }
    }

    /// Fonts from `config`; no template needed.
    pub fn from_config(config: &ReportConfig) -> Result<Self, Error> {
        let fonts =
            FontRegistry::load(config.font_regular.as_deref(), config.font_bold.as_deref())?;
        Ok(Self::new(config.metrics(), Arc::new(fonts), config.default_title.clone()))
    }

    pub fn containers(&self, record: &ReportRecord) -> Vec<SectionContainer> {
        let title = report_title(record, &self.default_title);
        build_sections(record)
            .iter()
            .map(|section| render_section(section, self.fonts.as_ref(), &self.metrics, &title))
            .collect()
    }

    /// Every section as its own PDF, keyed by section.
    pub fn render(&self, record: &ReportRecord) -> Result<BTreeMap<SectionKind, Vec<u8>>, Error> {
        self.containers(record)
            .into_iter()
            .map(|c| Ok((c.kind, c.to_pdf(&self.fonts)?)))
            .collect()
    }

    /// All sections in report order as one PDF.
    pub fn render_combined(&self, record: &ReportRecord) -> Result<Vec<u8>, Error> {
        self.render_selected(record, &SectionKind::ALL)
    }

    /// The sections in `kinds` as one PDF, kept in report order.
    pub fn render_selected(
        &self,
        record: &ReportRecord,
        kinds: &[SectionKind],
    ) -> Result<Vec<u8>, Error> {
        let pages: Vec<Page> = self
            .containers(record)
            .iter()
            .filter(|c| kinds.contains(&c.kind))
            .flat_map(|c| c.pages().iter().cloned())
            .collect();
        if pages.is_empty() {
            return Err(Error::Rendering("no sections selected".into()));
        }
        write_pages(&pages, &self.fonts)
    }
}

/// Builds reports against one template. Fonts and template are loaded once
/// and shared read-only, so one builder can serve builds on many threads.
pub struct ReportBuilder {
    renderer: SectionRenderer,
    template: Arc<Template>,
    plan: AssemblyPlan,
}

impl ReportBuilder {
    /// Load fonts and the template named by `config`.
    pub fn new(config: ReportConfig) -> Result<Self, Error> {
        let template = Template::open(&config.template_path)?;
        Self::with_template(config, Arc::new(template))
    }

    pub fn with_template(config: ReportConfig, template: Arc<Template>) -> Result<Self, Error> {
        let renderer = SectionRenderer::from_config(&config)?;
        log::debug!(
            "Builder ready: template {} ({} pages), plan v{}",
            template.path().display(),
            template.page_count(),
            config.plan.version(),
        );
        Ok(Self {
            renderer,
            template,
            plan: config.plan,
        })
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn plan(&self) -> &AssemblyPlan {
        &self.plan
    }

    pub fn build(&self, record: &ReportRecord) -> Result<FinalDocument, Error> {
        let t0 = std::time::Instant::now();
        let mut run = BuildRun::new(record.slug());

        run.advance(BuildState::RenderingSections)?;
        let sections = self.renderer.render(record).map_err(|e| run.fail(e))?;
        let t_render = t0.elapsed();

        run.advance(BuildState::Assembling)?;
        let doc = assemble(&self.template, &sections, &self.plan).map_err(|e| run.fail(e))?;
        run.advance(BuildState::Done)?;
        let t_total = t0.elapsed();

        log::info!(
            "Build phases: render={:.1}ms, assemble={:.1}ms, total={:.1}ms ({} pages)",
            t_render.as_secs_f64() * 1000.0,
            (t_total - t_render).as_secs_f64() * 1000.0,
            t_total.as_secs_f64() * 1000.0,
            doc.page_count,
        );
        Ok(doc)
    }

    /// All sections in report order, without the template.
    pub fn render_sections_only(&self, record: &ReportRecord) -> Result<Vec<u8>, Error> {
        self.renderer.render_combined(record)
    }
}
