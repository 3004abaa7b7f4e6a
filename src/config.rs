use std::path::PathBuf;
use std::str::FromStr;

use crate::assembly::AssemblyPlan;
use crate::model::{FontFace, Rgb, StyleSpec, TextStyle};

pub const DEFAULT_TEMPLATE_PATH: &str = "assets/template.pdf";
pub const DEFAULT_TITLE: &str = "Analisi strategica";

/// The two supported 16:9 page sizes. Chosen per deployment, not per request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PageGeometry {
    /// 1080 x 607.5 pt
    Legacy,
    /// 1440 x 810 pt
    #[default]
    Current,
}

impl FromStr for PageGeometry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" | "1080" => Ok(PageGeometry::Legacy),
            "current" | "1440" => Ok(PageGeometry::Current),
            other => Err(format!("unknown page geometry: {other} (expected legacy or current)")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStops {
    pub top: Rgb,
    pub middle: Rgb,
    pub bottom: Rgb,
}

/// All layout constants for one page geometry, in points.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutMetrics {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    /// Distance from the page top to the first content baseline.
    pub top_offset: f32,
    pub bottom_margin: f32,
    pub title_offset: f32,
    pub subtitle_offset: f32,
    pub label_line_height: f32,
    pub body_line_height: f32,
    pub entry_gap: f32,
    pub title_size: f32,
    pub subtitle_size: f32,
    pub label_size: f32,
    pub body_size: f32,
    pub gradient: GradientStops,
    pub title_color: Rgb,
    pub accent_color: Rgb,
    pub text_color: Rgb,
}

impl LayoutMetrics {
    pub fn for_geometry(geometry: PageGeometry) -> Self {
        let gradient = GradientStops {
            top: [0x0b, 0x1f, 0x3a],
            middle: [0x12, 0x3b, 0x6b],
            bottom: [0x1d, 0x5f, 0x9e],
        };
        match geometry {
            PageGeometry::Legacy => LayoutMetrics {
                page_width: 1080.0,
                page_height: 607.5,
                margin: 75.0,
                top_offset: 225.0,
                bottom_margin: 60.0,
                title_offset: 80.0,
                subtitle_offset: 135.0,
                label_line_height: 26.0,
                body_line_height: 24.0,
                entry_gap: 20.0,
                title_size: 34.0,
                subtitle_size: 24.0,
                label_size: 20.0,
                body_size: 18.0,
                gradient,
                title_color: [0xff, 0xff, 0xff],
                accent_color: [0xf5, 0xb7, 0x00],
                text_color: [0xf2, 0xf4, 0xf8],
            },
            PageGeometry::Current => LayoutMetrics {
                page_width: 1440.0,
                page_height: 810.0,
                margin: 100.0,
                top_offset: 300.0,
                bottom_margin: 60.0,
                title_offset: 110.0,
                subtitle_offset: 180.0,
                label_line_height: 36.0,
                body_line_height: 32.0,
                entry_gap: 30.0,
                title_size: 44.0,
                subtitle_size: 30.0,
                label_size: 26.0,
                body_size: 24.0,
                gradient,
                title_color: [0xff, 0xff, 0xff],
                accent_color: [0xf5, 0xb7, 0x00],
                text_color: [0xf2, 0xf4, 0xf8],
            },
        }
    }

    pub fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    /// Cursor position of the first content line on a fresh page.
    pub fn content_top(&self) -> f32 {
        self.page_height - self.top_offset
    }

    pub fn style(&self, style: TextStyle) -> StyleSpec {
        match style {
            TextStyle::Title => StyleSpec {
                face: FontFace::Bold,
                font_size: self.title_size,
                color: self.title_color,
            },
            TextStyle::Subtitle => StyleSpec {
                face: FontFace::Regular,
                font_size: self.subtitle_size,
                color: self.accent_color,
            },
            TextStyle::Label => StyleSpec {
                face: FontFace::Bold,
                font_size: self.label_size,
                color: self.title_color,
            },
            TextStyle::Body | TextStyle::Value => StyleSpec {
                face: FontFace::Regular,
                font_size: self.body_size,
                color: self.text_color,
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReportConfig {
    pub geometry: PageGeometry,
    pub template_path: PathBuf,
    pub font_regular: Option<PathBuf>,
    pub font_bold: Option<PathBuf>,
    pub plan: AssemblyPlan,
    /// Used when the record carries no client name.
    pub default_title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::default(),
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            font_regular: None,
            font_bold: None,
            plan: AssemblyPlan::builtin(),
            default_title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl ReportConfig {
    /// Defaults overridden by `ANALISI_TEMPLATE`, `ANALISI_FONT_REGULAR`,
    /// `ANALISI_FONT_BOLD` and `ANALISI_GEOMETRY`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = env_path("ANALISI_TEMPLATE") {
            config.template_path = path;
        }
        config.font_regular = env_path("ANALISI_FONT_REGULAR");
        config.font_bold = env_path("ANALISI_FONT_BOLD");
        if let Ok(val) = std::env::var("ANALISI_GEOMETRY") {
            match val.parse() {
                Ok(geometry) => config.geometry = geometry,
                Err(e) => log::warn!("Ignoring ANALISI_GEOMETRY: {e}"),
            }
        }
        config
    }

    pub fn metrics(&self) -> LayoutMetrics {
        LayoutMetrics::for_geometry(self.geometry)
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
