//! Font descriptors, resolution and metrics.
//!
//! A descriptor string such as `"Lucida Sans Bold 12"` is parsed into a
//! family, weight, slant and size. The family is looked up in the platform
//! font database; TrueType faces are embedded, anything else falls back to
//! one of the standard PDF fonts.

use anyhow::{anyhow, Context, Result};
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use log::{debug, info, warn};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::fmt;
use ttf_parser::{Face, Permissions};

use super::document::SheetDocument;
use crate::config::{FontSettings, FontSpec};

/// First and last character codes covered by the width tables
pub const FIRST_CHAR: u8 = 32;
pub const LAST_CHAR: u8 = 126;

const GLYPH_COUNT: usize = (LAST_CHAR - FIRST_CHAR + 1) as usize;

/// Substituted for characters outside the printable ASCII range
const REPLACEMENT_CHAR: u8 = b'?';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slant {
    Upright,
    Italic,
    Oblique,
}

/// Family, weight, slant and size parsed from a descriptor string
#[derive(Debug, Clone, PartialEq)]
pub struct FontDescriptor {
    pub family: String,
    pub bold: bool,
    pub slant: Slant,
    pub size: f64,
}

impl FontDescriptor {
    /// Parse `"<family> [style words] <size>"`, e.g. `"Courier Bold 11.4"`.
    ///
    /// Style words are only recognised at the end of the family part.
    pub fn parse(text: &str) -> Result<Self> {
        let normalized = text.replace(',', " ");
        let mut tokens: Vec<&str> = normalized.split_whitespace().collect();

        let size_token = tokens
            .pop()
            .ok_or_else(|| anyhow!("Font descriptor is empty"))?;
        let size: f64 = size_token.parse().map_err(|_| {
            anyhow!("Font descriptor '{}' does not end with a point size", text)
        })?;
        if !size.is_finite() || size <= 0.0 {
            return Err(anyhow!("Font descriptor '{}' has invalid size {}", text, size));
        }

        let mut bold = false;
        let mut slant = Slant::Upright;
        while let Some(last) = tokens.last() {
            match last.to_ascii_lowercase().as_str() {
                "bold" => bold = true,
                "italic" => slant = Slant::Italic,
                "oblique" => slant = Slant::Oblique,
                "normal" | "regular" | "roman" | "book" | "medium" => {}
                _ => break,
            }
            tokens.pop();
        }

        if tokens.is_empty() {
            return Err(anyhow!("Font descriptor '{}' has no family name", text));
        }

        Ok(Self {
            family: tokens.join(" "),
            bold,
            slant,
            size,
        })
    }
}

impl fmt::Display for FontDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.family)?;
        if self.bold {
            write!(f, " Bold")?;
        }
        match self.slant {
            Slant::Upright => {}
            Slant::Italic => write!(f, " Italic")?,
            Slant::Oblique => write!(f, " Oblique")?,
        }
        write!(f, " {}", self.size)
    }
}

/// Glyph metrics in 1/1000 text space units
#[derive(Debug, Clone, PartialEq)]
pub struct FontMetrics {
    pub widths: [u16; GLYPH_COUNT],
    pub ascent: f64,
    pub descent: f64,
    pub cap_height: f64,
    pub bbox: [f64; 4],
    pub fixed_pitch: bool,
}

impl FontMetrics {
    /// Advance of a single encoded byte; bytes outside the table use `?`
    pub fn width(&self, code: u8) -> u16 {
        let code = if (FIRST_CHAR..=LAST_CHAR).contains(&code) {
            code
        } else {
            REPLACEMENT_CHAR
        };
        self.widths[(code - FIRST_CHAR) as usize]
    }
}

/// Standard PDF Type1 fonts used when no system face can be embedded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// Get the PDF BaseFont name for this font
    pub fn base_font_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    /// Pick the closest standard font: Courier for monospaced families,
    /// Helvetica for everything else.
    pub fn select(descriptor: &FontDescriptor) -> StandardFont {
        let family = descriptor.family.to_ascii_lowercase();
        let mono = family.contains("courier") || family.contains("mono");
        let slanted = descriptor.slant != Slant::Upright;
        match (mono, descriptor.bold, slanted) {
            (true, false, false) => StandardFont::Courier,
            (true, true, false) => StandardFont::CourierBold,
            (true, false, true) => StandardFont::CourierOblique,
            (true, true, true) => StandardFont::CourierBoldOblique,
            (false, false, false) => StandardFont::Helvetica,
            (false, true, false) => StandardFont::HelveticaBold,
            (false, false, true) => StandardFont::HelveticaOblique,
            (false, true, true) => StandardFont::HelveticaBoldOblique,
        }
    }

    pub fn metrics(&self) -> FontMetrics {
        match self {
            StandardFont::Helvetica | StandardFont::HelveticaOblique => FontMetrics {
                widths: HELVETICA_WIDTHS,
                ascent: 718.0,
                descent: -207.0,
                cap_height: 718.0,
                bbox: [-166.0, -225.0, 1000.0, 931.0],
                fixed_pitch: false,
            },
            StandardFont::HelveticaBold | StandardFont::HelveticaBoldOblique => FontMetrics {
                widths: HELVETICA_BOLD_WIDTHS,
                ascent: 718.0,
                descent: -207.0,
                cap_height: 718.0,
                bbox: [-170.0, -228.0, 1003.0, 962.0],
                fixed_pitch: false,
            },
            StandardFont::Courier | StandardFont::CourierOblique => FontMetrics {
                widths: [600; GLYPH_COUNT],
                ascent: 629.0,
                descent: -157.0,
                cap_height: 562.0,
                bbox: [-23.0, -250.0, 715.0, 805.0],
                fixed_pitch: true,
            },
            StandardFont::CourierBold | StandardFont::CourierBoldOblique => FontMetrics {
                widths: [600; GLYPH_COUNT],
                ascent: 629.0,
                descent: -157.0,
                cap_height: 562.0,
                bbox: [-113.0, -250.0, 749.0, 801.0],
                fixed_pitch: true,
            },
        }
    }
}

// WinAnsi codes 32..=126
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; GLYPH_COUNT] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; GLYPH_COUNT] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// A TrueType face loaded from the platform font database
pub struct EmbeddedFace {
    pub post_script_name: String,
    pub data: Vec<u8>,
    pub metrics: FontMetrics,
    pub italic: bool,
}

impl EmbeddedFace {
    /// Parse a face and collect the metrics needed for a simple TrueType font
    pub fn from_data(data: &[u8], index: u32, post_script_name: &str) -> Result<Self> {
        if data.starts_with(b"ttcf") {
            return Err(anyhow!("font collections cannot be embedded"));
        }

        let face = Face::parse(data, index)
            .with_context(|| format!("Failed to parse font face {}", post_script_name))?;

        if face.tables().glyf.is_none() {
            return Err(anyhow!("{} has no TrueType outlines", post_script_name));
        }
        if matches!(face.permissions(), Some(Permissions::Restricted)) {
            return Err(anyhow!("{} does not permit embedding", post_script_name));
        }

        let scale = 1000.0 / f64::from(face.units_per_em());
        let to_units = |value: i16| (f64::from(value) * scale).round();

        let missing = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .map(|a| (f64::from(a) * scale).round() as u16)
            .unwrap_or(500);
        let mut widths = [missing; GLYPH_COUNT];
        for (slot, code) in widths.iter_mut().zip(FIRST_CHAR..=LAST_CHAR) {
            if let Some(advance) = face
                .glyph_index(code as char)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
            {
                *slot = (f64::from(advance) * scale).round() as u16;
            }
        }

        let bbox = face.global_bounding_box();
        let ascent = to_units(face.ascender());
        let metrics = FontMetrics {
            widths,
            ascent,
            descent: to_units(face.descender()),
            cap_height: face.capital_height().map(to_units).unwrap_or(ascent),
            bbox: [
                to_units(bbox.x_min),
                to_units(bbox.y_min),
                to_units(bbox.x_max),
                to_units(bbox.y_max),
            ],
            fixed_pitch: face.is_monospaced(),
        };

        Ok(Self {
            post_script_name: post_script_name.replace(' ', "-"),
            data: data.to_vec(),
            metrics,
            italic: face.is_italic() || face.is_oblique(),
        })
    }
}

/// The face a font style renders with
pub enum FontFace {
    Standard(StandardFont),
    Embedded(Box<EmbeddedFace>),
}

impl FontFace {
    pub fn base_font_name(&self) -> &str {
        match self {
            FontFace::Standard(font) => font.base_font_name(),
            FontFace::Embedded(face) => &face.post_script_name,
        }
    }

    pub fn metrics(&self) -> FontMetrics {
        match self {
            FontFace::Standard(font) => font.metrics(),
            FontFace::Embedded(face) => face.metrics.clone(),
        }
    }
}

/// Create a font dictionary for `face` in the PDF document
pub fn create_font(doc: &mut Document, face: &FontFace) -> ObjectId {
    match face {
        FontFace::Standard(font) => {
            let mut font_dict = Dictionary::new();
            font_dict.set("Type", "Font");
            font_dict.set("Subtype", "Type1");
            font_dict.set("BaseFont", font.base_font_name());
            font_dict.set("Encoding", "WinAnsiEncoding");
            doc.add_object(Object::Dictionary(font_dict))
        }
        FontFace::Embedded(face) => embed_true_type_face(doc, face),
    }
}

/// Embed a TrueType face as a simple font with WinAnsi encoding
fn embed_true_type_face(doc: &mut Document, face: &EmbeddedFace) -> ObjectId {
    let metrics = &face.metrics;

    let mut font_stream_dict = Dictionary::new();
    font_stream_dict.set("Length1", face.data.len() as i64);
    let font_stream_id = doc.add_object(Stream::new(font_stream_dict, face.data.clone()));

    // FixedPitch = 1, Nonsymbolic = 32, Italic = 64
    let mut flags = 32_i64;
    if metrics.fixed_pitch {
        flags |= 1;
    }
    if face.italic {
        flags |= 64;
    }

    let mut font_descriptor = Dictionary::new();
    font_descriptor.set("Type", "FontDescriptor");
    font_descriptor.set("FontName", face.post_script_name.as_str());
    font_descriptor.set("Flags", flags);
    font_descriptor.set(
        "FontBBox",
        metrics.bbox.iter().map(|v| Object::Integer(*v as i64)).collect::<Vec<_>>(),
    );
    font_descriptor.set("ItalicAngle", if face.italic { -12_i64 } else { 0 });
    font_descriptor.set("Ascent", metrics.ascent as i64);
    font_descriptor.set("Descent", metrics.descent as i64);
    font_descriptor.set("CapHeight", metrics.cap_height as i64);
    font_descriptor.set("StemV", 80_i64);
    font_descriptor.set("FontFile2", Object::Reference(font_stream_id));
    let descriptor_id = doc.add_object(Object::Dictionary(font_descriptor));

    let mut font_dict = Dictionary::new();
    font_dict.set("Type", "Font");
    font_dict.set("Subtype", "TrueType");
    font_dict.set("BaseFont", face.post_script_name.as_str());
    font_dict.set("FirstChar", i64::from(FIRST_CHAR));
    font_dict.set("LastChar", i64::from(LAST_CHAR));
    font_dict.set(
        "Widths",
        metrics.widths.iter().map(|w| Object::Integer(i64::from(*w))).collect::<Vec<_>>(),
    );
    font_dict.set("Encoding", "WinAnsiEncoding");
    font_dict.set("FontDescriptor", Object::Reference(descriptor_id));
    doc.add_object(Object::Dictionary(font_dict))
}

/// Looks descriptors up in the platform font database
pub struct FontResolver {
    db: Option<Database>,
}

impl FontResolver {
    /// Resolver backed by the fonts installed on this machine
    pub fn system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        info!("Loaded {} system font faces", db.len());
        Self::with_database(db)
    }

    /// Resolver backed by an already populated font database
    pub fn with_database(db: Database) -> Self {
        Self { db: Some(db) }
    }

    /// Resolver that only uses the standard PDF fonts
    pub fn standard_only() -> Self {
        Self { db: None }
    }

    pub fn resolve(&self, descriptor: &FontDescriptor) -> FontFace {
        if let Some(db) = &self.db {
            match query_system_face(db, descriptor) {
                Some(Ok(face)) => {
                    info!("Resolved '{}' to {}", descriptor, face.post_script_name);
                    return FontFace::Embedded(Box::new(face));
                }
                Some(Err(e)) => warn!("Cannot embed system face for '{}': {:#}", descriptor, e),
                None => debug!("No system face for '{}'", descriptor),
            }
        }

        let standard = StandardFont::select(descriptor);
        info!("Using standard font {} for '{}'", standard.base_font_name(), descriptor);
        FontFace::Standard(standard)
    }
}

fn query_system_face(db: &Database, descriptor: &FontDescriptor) -> Option<Result<EmbeddedFace>> {
    let family = match descriptor.family.to_ascii_lowercase().as_str() {
        "sans" | "sans-serif" => Family::SansSerif,
        "serif" => Family::Serif,
        "mono" | "monospace" => Family::Monospace,
        _ => Family::Name(installed_family_name(db, &descriptor.family)?),
    };
    let query = Query {
        families: &[family],
        weight: if descriptor.bold { Weight::BOLD } else { Weight::NORMAL },
        stretch: Stretch::Normal,
        style: match descriptor.slant {
            Slant::Upright => Style::Normal,
            Slant::Italic => Style::Italic,
            Slant::Oblique => Style::Oblique,
        },
    };

    let id = db.query(&query)?;
    let info = db.face(id)?;
    if !face_matches(info.weight, info.style, descriptor) {
        warn!(
            "Closest system face for '{}' is {} (weight {}, {:?}); not embedding it",
            descriptor, info.post_script_name, info.weight.0, info.style
        );
        return None;
    }

    let post_script_name = info.post_script_name.clone();
    db.with_face_data(id, |data, index| {
        EmbeddedFace::from_data(data, index, &post_script_name)
    })
}

/// Installed family name equal to `requested` ignoring ASCII case
fn installed_family_name<'a>(db: &'a Database, requested: &str) -> Option<&'a str> {
    db.faces()
        .flat_map(|face| face.families.iter())
        .map(|(name, _)| name.as_str())
        .find(|name| name.eq_ignore_ascii_case(requested))
}

/// Whether a face's weight and slant agree with what was asked for.
///
/// Semibold and heavier count as bold; italic and oblique both count as
/// slanted.
fn face_matches(weight: Weight, style: Style, descriptor: &FontDescriptor) -> bool {
    let bold = weight.0 >= Weight::SEMIBOLD.0;
    let slanted = style != Style::Normal;
    bold == descriptor.bold && slanted == (descriptor.slant != Slant::Upright)
}

/// Width and height of a measured text run, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtents {
    pub width: f64,
    pub height: f64,
}

/// A resolved font at a fixed size, registered in the document
pub struct FontStyle {
    pub name: String,
    pub points: f64,
    pub descriptor: FontDescriptor,
    pub face: FontFace,
    metrics: FontMetrics,
    /// Resource name used in content streams, e.g. `F1`
    pub resource: String,
}

impl FontStyle {
    pub fn new(name: &str, descriptor: FontDescriptor, face: FontFace, resource: String) -> Self {
        let metrics = face.metrics();
        Self {
            name: name.to_string(),
            points: descriptor.size,
            descriptor,
            face,
            metrics,
            resource,
        }
    }

    /// Distance from the top of the line box to the baseline
    pub fn ascent(&self) -> f64 {
        self.metrics.ascent * self.points / 1000.0
    }

    pub fn measure(&self, text: &str) -> TextExtents {
        let units: u32 = encode_text(text)
            .iter()
            .map(|&code| u32::from(self.metrics.width(code)))
            .sum();
        TextExtents {
            width: f64::from(units) * self.points / 1000.0,
            height: (self.metrics.ascent - self.metrics.descent) * self.points / 1000.0,
        }
    }
}

/// Encode text as single-byte WinAnsi, replacing anything outside
/// printable ASCII.
pub fn encode_text(text: &str) -> Vec<u8> {
    let mut replaced = false;
    let bytes = text
        .chars()
        .map(|c| match u8::try_from(c) {
            Ok(code) if (FIRST_CHAR..=LAST_CHAR).contains(&code) => code,
            _ => {
                replaced = true;
                REPLACEMENT_CHAR
            }
        })
        .collect();
    if replaced {
        warn!("Replaced unsupported characters in {:?}", text);
    }
    bytes
}

/// The three styles printed on a card
pub struct CardFonts {
    pub display: FontStyle,
    pub body: FontStyle,
    pub mono: FontStyle,
}

/// Parse, resolve and register the display, body and mono fonts
pub fn load_font_styles(
    doc: &mut SheetDocument,
    resolver: &FontResolver,
    settings: &FontSettings,
) -> Result<CardFonts> {
    Ok(CardFonts {
        display: load_font_style(doc, resolver, &settings.display)?,
        body: load_font_style(doc, resolver, &settings.body)?,
        mono: load_font_style(doc, resolver, &settings.mono)?,
    })
}

fn load_font_style(
    doc: &mut SheetDocument,
    resolver: &FontResolver,
    spec: &FontSpec,
) -> Result<FontStyle> {
    let descriptor_string = spec.descriptor_string();
    let descriptor = FontDescriptor::parse(&descriptor_string)
        .with_context(|| format!("error setting up {}", descriptor_string))?;
    let face = resolver.resolve(&descriptor);
    let resource = doc.register_font(&face);
    Ok(FontStyle::new(&spec.family, descriptor, face, resource))
}
