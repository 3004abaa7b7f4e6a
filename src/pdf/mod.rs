pub mod chrome;
pub(crate) mod flow;
pub mod gradient;
pub mod layout;

use std::collections::BTreeSet;

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str};

use crate::config::LayoutMetrics;
use crate::error::Error;
use crate::fonts::{EmbeddedFont, FontRegistry};
use crate::model::{FontFace, Rgb, Section, SectionKind, StyleSpec};

use flow::{FlowContext, flow_section};
use layout::Typesetter;

/// One drawing instruction, in PDF points with the origin at the bottom left.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    /// `y` is the text baseline.
    Text {
        x: f32,
        y: f32,
        text: String,
        style: StyleSpec,
    },
}

/// A laid-out page, kept as a display list until it is written.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    width: f32,
    height: f32,
    ops: Vec<DrawOp>,
}

impl Page {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn draw_text(&mut self, x: f32, y: f32, text: &str, style: StyleSpec) {
        self.ops.push(DrawOp::Text {
            x,
            y,
            text: text.to_string(),
            style,
        });
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        self.ops.push(DrawOp::FillRect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Text runs in drawing order, as `(x, baseline, text, style)`.
    pub fn texts(&self) -> impl Iterator<Item = (f32, f32, &str, &StyleSpec)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { x, y, text, style } => Some((*x, *y, text.as_str(), style)),
            DrawOp::FillRect { .. } => None,
        })
    }

    pub(crate) fn text_at_mut(&mut self, idx: usize) -> Option<(&mut String, &StyleSpec)> {
        match self.ops.get_mut(idx) {
            Some(DrawOp::Text { text, style, .. }) => Some((text, &*style)),
            _ => None,
        }
    }
}

/// The rendered pages of one section, before they are spliced into the template.
pub struct SectionContainer {
    pub kind: SectionKind,
    pages: Vec<Page>,
}

impl SectionContainer {
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Serialize the container as a standalone PDF.
    pub fn to_pdf(&self, fonts: &FontRegistry) -> Result<Vec<u8>, Error> {
        write_pages(&self.pages, fonts)
            .map_err(|e| Error::Rendering(format!("section {}: {e}", self.kind)))
    }
}

/// Lay out one section. The result always holds at least one page.
pub fn render_section<T: Typesetter + ?Sized>(
    section: &Section,
    ts: &T,
    metrics: &LayoutMetrics,
    title: &str,
) -> SectionContainer {
    let ctx = FlowContext {
        ts,
        metrics,
        title,
        subtitle: &section.subtitle,
    };
    let pages = flow_section(ctx, &section.entries, &section.policy);
    log::debug!(
        "Section {}: {} entries on {} page(s)",
        section.kind,
        section.entries.len(),
        pages.len()
    );
    SectionContainer {
        kind: section.kind,
        pages,
    }
}

fn font_resource_name(face: FontFace) -> &'static str {
    match face {
        FontFace::Regular => "F1",
        FontFace::Bold => "F2",
    }
}

fn rgb_f32(color: Rgb) -> (f32, f32, f32) {
    (
        color[0] as f32 / 255.0,
        color[1] as f32 / 255.0,
        color[2] as f32 / 255.0,
    )
}

/// Write pages to a standalone PDF. Fonts are embedded only for the faces
/// the pages use, subsetted to the characters drawn.
pub fn write_pages(pages: &[Page], fonts: &FontRegistry) -> Result<Vec<u8>, Error> {
    if pages.is_empty() {
        return Err(Error::Rendering("no pages to write".into()));
    }

    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();

    let mut used_regular: BTreeSet<char> = BTreeSet::new();
    let mut used_bold: BTreeSet<char> = BTreeSet::new();
    for (_, _, text, style) in pages.iter().flat_map(|p| p.texts()) {
        let set = match style.face {
            FontFace::Regular => &mut used_regular,
            FontFace::Bold => &mut used_bold,
        };
        set.extend(text.chars());
    }

    let mut embedded: Vec<(FontFace, EmbeddedFont)> = Vec::new();
    for (face, used) in [(FontFace::Regular, &used_regular), (FontFace::Bold, &used_bold)] {
        if used.is_empty() {
            continue;
        }
        let name = font_resource_name(face).to_string();
        embedded.push((face, fonts.embed(face, &mut pdf, name, used, &mut alloc)));
    }
    let font_for = |face: FontFace| embedded.iter().find(|(f, _)| *f == face).map(|(_, e)| e);

    let n = pages.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    for (i, page) in pages.iter().enumerate() {
        let mut content = Content::new();
        for op in page.ops() {
            match op {
                DrawOp::FillRect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => {
                    let (r, g, b) = rgb_f32(*color);
                    content.set_fill_rgb(r, g, b);
                    content.rect(*x, *y, *width, *height);
                    content.fill_nonzero();
                }
                DrawOp::Text { x, y, text, style } => {
                    let Some(font) = font_for(style.face) else {
                        continue;
                    };
                    let (r, g, b) = rgb_f32(style.color);
                    content.begin_text();
                    content.set_font(Name(font.pdf_name.as_bytes()), style.font_size);
                    content.set_fill_rgb(r, g, b);
                    content.next_line(*x, *y);
                    content.show(Str(&font.encode(text)));
                    content.end_text();
                }
            }
        }
        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    for (i, page) in pages.iter().enumerate() {
        let mut pdf_page = pdf.page(page_ids[i]);
        pdf_page
            .media_box(Rect::new(0.0, 0.0, page.width(), page.height()))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = pdf_page.resources();
        let mut font_dict = resources.fonts();
        for (_, font) in &embedded {
            font_dict.pair(Name(font.pdf_name.as_bytes()), font.font_ref);
        }
    }

    Ok(pdf.finish())
}
