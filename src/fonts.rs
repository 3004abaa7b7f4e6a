use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use memmap2::Mmap;
use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

use crate::error::Error;
use crate::model::{FontFace, StyleSpec};
use crate::pdf::layout::Typesetter;

/// Process-wide font resources, built once at startup and read-only afterwards.
pub struct FontRegistry {
    regular: LoadedFace,
    bold: LoadedFace,
}

enum FaceSource {
    /// Standard 14 font, WinAnsi encoded, never embedded.
    Builtin {
        base_font: &'static str,
        widths_1000: Vec<f32>,
    },
    TrueType {
        ps_name: String,
        data: Mmap,
        face_index: u32,
        units_per_em: f32,
        /// Advance widths for the Latin ranges, in 1000-units.
        char_widths_1000: HashMap<char, f32>,
    },
}

struct LoadedFace {
    source: FaceSource,
}

/// A face written into one PDF, with the glyph mapping used to encode text.
pub(crate) struct EmbeddedFont {
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    char_to_gid: Option<BTreeMap<char, u16>>,
}

impl EmbeddedFont {
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match &self.char_to_gid {
            Some(map) => encode_as_gids(text, map),
            None => to_winansi_bytes(text),
        }
    }
}

impl FontRegistry {
    /// Helvetica and Helvetica-Bold, no font files required.
    pub fn builtin() -> Self {
        Self {
            regular: LoadedFace::builtin(false),
            bold: LoadedFace::builtin(true),
        }
    }

    /// Load TrueType/OpenType files for the faces that have one configured;
    /// the rest use the built-in Helvetica faces. A configured file that is
    /// missing or unparsable is a startup error.
    pub fn load(regular: Option<&Path>, bold: Option<&Path>) -> Result<Self, Error> {
        let t0 = std::time::Instant::now();
        let regular = match regular {
            Some(path) => LoadedFace::truetype("regular", path)?,
            None => LoadedFace::builtin(false),
        };
        let bold = match bold {
            Some(path) => LoadedFace::truetype("bold", path)?,
            None => LoadedFace::builtin(true),
        };
        log::info!(
            "Font registry: regular={}, bold={} ({:.1}ms)",
            regular.describe(),
            bold.describe(),
            t0.elapsed().as_secs_f64() * 1000.0,
        );
        Ok(Self { regular, bold })
    }

    fn face(&self, face: FontFace) -> &LoadedFace {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
        }
    }

    /// Write `face` into `pdf`, subsetted to `used_chars` when it is a TrueType face.
    pub(crate) fn embed(
        &self,
        face: FontFace,
        pdf: &mut Pdf,
        pdf_name: String,
        used_chars: &BTreeSet<char>,
        alloc: &mut impl FnMut() -> Ref,
    ) -> EmbeddedFont {
        let font_ref = alloc();
        let loaded = self.face(face);
        let char_to_gid = match &loaded.source {
            FaceSource::Builtin { base_font, .. } => {
                pdf.type1_font(font_ref)
                    .base_font(Name(base_font.as_bytes()))
                    .encoding_predefined(Name(b"WinAnsiEncoding"));
                None
            }
            FaceSource::TrueType {
                ps_name,
                data,
                face_index,
                ..
            } => match embed_truetype(
                pdf,
                font_ref,
                ps_name,
                data,
                *face_index,
                used_chars,
                alloc,
            ) {
                Some(map) => Some(map),
                None => {
                    log::warn!("Embedding {ps_name} failed, using Helvetica");
                    pdf.type1_font(font_ref)
                        .base_font(Name(b"Helvetica"))
                        .encoding_predefined(Name(b"WinAnsiEncoding"));
                    None
                }
            },
        };
        EmbeddedFont {
            pdf_name,
            font_ref,
            char_to_gid,
        }
    }
}

impl Typesetter for FontRegistry {
    fn measure_width(&self, text: &str, style: &StyleSpec) -> f32 {
        let face = self.face(style.face);
        text.chars()
            .map(|ch| face.char_width_1000(ch) * style.font_size / 1000.0)
            .sum()
    }
}

impl LoadedFace {
    fn builtin(bold: bool) -> Self {
        let (base_font, widths_1000) = if bold {
            ("Helvetica-Bold", helvetica_bold_widths())
        } else {
            ("Helvetica", helvetica_widths())
        };
        Self {
            source: FaceSource::Builtin {
                base_font,
                widths_1000,
            },
        }
    }

    fn truetype(style: &'static str, path: &Path) -> Result<Self, Error> {
        let fail = |reason: String| Error::FontRegistration {
            style,
            path: path.to_path_buf(),
            reason,
        };
        let file = std::fs::File::open(path).map_err(|e| fail(e.to_string()))?;
        let data = unsafe { Mmap::map(&file) }.map_err(|e| fail(e.to_string()))?;

        let (ps_name, units_per_em, char_widths_1000) = {
            let face = Face::parse(&data, 0).map_err(|e| fail(e.to_string()))?;
            let units = face.units_per_em() as f32;
            let char_widths_1000: HashMap<char, f32> = latin_chars()
                .filter_map(|ch| {
                    let gid = face.glyph_index(ch)?;
                    let adv = face.glyph_hor_advance(gid)?;
                    Some((ch, adv as f32 / units * 1000.0))
                })
                .collect();
            if !char_widths_1000.contains_key(&' ') {
                return Err(fail("font has no glyph for U+0020".into()));
            }
            (postscript_name(&face, path), units, char_widths_1000)
        };

        Ok(Self {
            source: FaceSource::TrueType {
                ps_name,
                data,
                face_index: 0,
                units_per_em,
                char_widths_1000,
            },
        })
    }

    fn describe(&self) -> String {
        match &self.source {
            FaceSource::Builtin { base_font, .. } => base_font.to_string(),
            FaceSource::TrueType { ps_name, .. } => ps_name.clone(),
        }
    }

    /// Width of a single character in 1000-units.
    fn char_width_1000(&self, ch: char) -> f32 {
        match &self.source {
            FaceSource::Builtin { widths_1000, .. } => {
                // Unmappable chars are drawn as '?'
                let byte = match char_to_winansi(ch) {
                    0 => b'?',
                    b => b,
                };
                widths_1000[(byte - 32) as usize]
            }
            FaceSource::TrueType {
                data,
                face_index,
                units_per_em,
                char_widths_1000,
                ..
            } => {
                if let Some(&w) = char_widths_1000.get(&ch) {
                    return w;
                }
                Face::parse(data, *face_index)
                    .ok()
                    .and_then(|face| {
                        let gid = face.glyph_index(ch)?;
                        face.glyph_hor_advance(gid)
                    })
                    .map(|adv| adv as f32 / units_per_em * 1000.0)
                    .unwrap_or(0.0)
            }
        }
    }
}

fn latin_chars() -> impl Iterator<Item = char> {
    ('\u{20}'..='\u{24F}').chain('\u{2010}'..='\u{2044}').chain(['\u{20AC}'])
}

fn postscript_name(face: &Face, path: &Path) -> String {
    face.names()
        .into_iter()
        .find(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME && name.is_unicode())
        .and_then(|name| name.to_string())
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Font".to_string())
        })
        .replace(' ', "")
}

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007F => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes for PDF Str encoding.
/// Unmappable characters become `?`.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match char_to_winansi(c) {
            0 => b'?',
            b => b,
        })
        .collect()
}

/// Encode UTF-8 text as big-endian 2-byte glyph IDs for CIDFont content streams.
fn encode_as_gids(text: &str, char_to_gid: &BTreeMap<char, u16>) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
        out.extend_from_slice(&gid.to_be_bytes());
    }
    out
}

/// Approximate Helvetica widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,                          // space
            33..=47 => 333.0,                     // punctuation
            48..=57 => 556.0,                     // digits
            58..=64 => 333.0,                     // more punctuation
            73 | 74 => 278.0,                     // I J (narrow uppercase)
            77 => 833.0,                          // M (wide)
            65..=90 => 667.0,                     // uppercase A-Z (average)
            91..=96 => 333.0,                     // brackets etc.
            102 | 105 | 106 | 108 | 116 => 278.0, // narrow lowercase: f i j l t
            109 | 119 => 833.0,                   // m w (wide)
            97..=122 => 556.0,                    // lowercase a-z (average)
            0x85 => 1000.0,                       // ellipsis
            0xEC..=0xEF => 278.0,                 // ì í î ï
            _ => 556.0,
        })
        .collect()
}

/// Approximate Helvetica-Bold widths, same layout as `helvetica_widths`.
fn helvetica_bold_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,
            33..=47 => 333.0,
            48..=57 => 556.0,
            58..=64 => 333.0,
            73 => 278.0,
            74 => 556.0,
            77 => 833.0,
            65..=90 => 722.0,
            91..=96 => 333.0,
            105 | 106 | 108 => 278.0,
            102 | 116 => 333.0,
            109 => 889.0,
            119 => 778.0,
            97..=122 => 611.0,
            0x85 => 1000.0,
            0xEC..=0xEF => 278.0,
            _ => 611.0,
        })
        .collect()
}

/// Embed a TrueType/OpenType font as a CIDFont (Type0 composite) with Identity-H encoding,
/// subsetted to `used_chars`. Returns the char → new glyph id map used for encoding.
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    ps_name: &str,
    font_data: &[u8],
    face_index: u32,
    used_chars: &BTreeSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> Option<BTreeMap<char, u16>> {
    let face = Face::parse(font_data, face_index).ok()?;

    let units = face.units_per_em() as f32;
    let ascent = face.ascender() as f32 / units * 1000.0;
    let descent = face.descender() as f32 / units * 1000.0;
    let cap_height = face
        .capital_height()
        .map(|h| h as f32 / units * 1000.0)
        .unwrap_or(700.0);

    let bb = face.global_bounding_box();
    let bbox = Rect::new(
        bb.x_min as f32 / units * 1000.0,
        bb.y_min as f32 / units * 1000.0,
        bb.x_max as f32 / units * 1000.0,
        bb.y_max as f32 / units * 1000.0,
    );

    // Ordered iteration keeps glyph ids stable between builds
    let mut remapper = subsetter::GlyphRemapper::new();
    let mut char_to_gid = BTreeMap::new();
    let mut gid_widths: BTreeMap<u16, f32> = BTreeMap::new();
    for &ch in used_chars {
        if let Some(gid) = face.glyph_index(ch) {
            let new_gid = remapper.remap(gid.0);
            char_to_gid.insert(ch, new_gid);
            let w = face
                .glyph_hor_advance(gid)
                .map(|adv| adv as f32 / units * 1000.0)
                .unwrap_or(0.0);
            gid_widths.insert(new_gid, w);
        }
    }

    let subset_data = subsetter::subset(font_data, face_index, &remapper).unwrap_or_else(|e| {
        log::warn!("Font subsetting failed for {ps_name}: {e}, embedding full font");
        font_data.to_vec()
    });

    let descriptor_ref = alloc();
    let data_ref = alloc();
    let data_len = i32::try_from(subset_data.len()).ok()?;
    pdf.stream(data_ref, &subset_data)
        .pair(Name(b"Length1"), data_len);

    pdf.font_descriptor(descriptor_ref)
        .name(Name(ps_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(bbox)
        .italic_angle(0.0)
        .ascent(ascent)
        .descent(descent)
        .cap_height(cap_height)
        .stem_v(80.0)
        .font_file2(data_ref);

    let system_info = || pdf_writer::types::SystemInfo {
        registry: pdf_writer::Str(b"Adobe"),
        ordering: pdf_writer::Str(b"Identity"),
        supplement: 0,
    };

    let cid_font_ref = alloc();
    {
        let mut cid = pdf.cid_font(cid_font_ref);
        cid.subtype(pdf_writer::types::CidFontType::Type2);
        cid.base_font(Name(ps_name.as_bytes()));
        cid.system_info(system_info());
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        cid.cid_to_gid_map_predefined(Name(b"Identity"));
        if !gid_widths.is_empty() {
            let mut w = cid.widths();
            for (&gid, &width) in &gid_widths {
                w.consecutive(gid, [width]);
            }
        }
    }

    let tounicode_ref = alloc();
    let cmap_name = format!("{ps_name}-UTF16");
    let mut cmap = pdf_writer::types::UnicodeCmap::new(Name(cmap_name.as_bytes()), system_info());
    for (&ch, &new_gid) in &char_to_gid {
        cmap.pair(new_gid, ch);
    }
    let cmap_data = cmap.finish();
    pdf.stream(tounicode_ref, cmap_data.as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_font_ref)
        .to_unicode(tounicode_ref);

    Some(char_to_gid)
}
