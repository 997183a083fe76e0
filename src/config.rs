//! Card content and sheet geometry.
//!
//! This module handles:
//! - Unit conversion for dimensions (mm, cm, in, pt)
//! - The compiled-in card content, fonts and per-card offsets
//! - Sheet grid math (card origins, cards per page, fit checks)

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::str::FromStr;

/// Output file written into the working directory
pub const OUTPUT_FILE: &str = "cards.pdf";

/// Pre-rendered code image read from the working directory
pub const CODE_IMAGE_FILE: &str = "code-med-high.png";

/// Command suggested on stdout for viewing the result
pub const VIEWER_COMMAND: &str = "evince";

/// A length in points. Config values may be a bare number of points or a
/// string with a unit suffix such as `"3.5 in"` or `"89 mm"`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawDimension")]
pub struct Dimension(pub f64);

impl Dimension {
    pub const fn points(value: f64) -> Self {
        Dimension(value)
    }

    /// 1 inch = 72 points (PDF default unit)
    pub const fn inches(value: f64) -> Self {
        Dimension(value * 72.0)
    }

    pub fn as_points(&self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Point,
    Millimeter,
    Centimeter,
    Inch,
}

impl Unit {
    fn from_suffix(suffix: &str) -> Option<Unit> {
        match suffix.to_ascii_lowercase().as_str() {
            "" | "pt" | "point" | "points" => Some(Unit::Point),
            "mm" => Some(Unit::Millimeter),
            "cm" => Some(Unit::Centimeter),
            "in" | "inch" | "inches" => Some(Unit::Inch),
            _ => None,
        }
    }

    fn points_per_unit(self) -> f64 {
        match self {
            Unit::Point => 1.0,
            Unit::Millimeter => 72.0 / 25.4,
            Unit::Centimeter => 72.0 / 2.54,
            Unit::Inch => 72.0,
        }
    }
}

impl FromStr for Dimension {
    type Err = anyhow::Error;

    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        let number_end = text
            .find(|c: char| c.is_whitespace() || c.is_ascii_alphabetic())
            .unwrap_or(text.len());
        let (number, suffix) = text.split_at(number_end);

        let value: f64 = number
            .parse()
            .map_err(|_| anyhow!("invalid number in dimension '{}'", text))?;
        let unit = Unit::from_suffix(suffix.trim()).ok_or_else(|| {
            anyhow!("unknown unit '{}' in '{}' (expected mm, cm, in or pt)", suffix.trim(), text)
        })?;

        Ok(Dimension(value * unit.points_per_unit()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDimension {
    Points(f64),
    Text(String),
}

impl TryFrom<RawDimension> for Dimension {
    type Error = String;

    fn try_from(raw: RawDimension) -> Result<Self, String> {
        match raw {
            RawDimension::Points(points) => Ok(Dimension(points)),
            RawDimension::Text(text) => text.parse().map_err(|e: anyhow::Error| e.to_string()),
        }
    }
}

/// Horizontal placement of the name line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameAlignment {
    #[default]
    Left,
    Centered,
}

/// A font family plus point size, rendered as a descriptor string such as
/// `"Lucida Sans Bold 12"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub points: f64,
}

impl FontSpec {
    pub fn new(family: &str, points: f64) -> Self {
        Self {
            family: family.to_string(),
            points,
        }
    }

    pub fn descriptor_string(&self) -> String {
        format!("{} {}", self.family, self.points)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FontSettings {
    pub display: FontSpec,
    pub body: FontSpec,
    pub mono: FontSpec,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            display: FontSpec::new("Lucida Sans Bold", 12.0),
            body: FontSpec::new("Lucida Sans", 8.0),
            mono: FontSpec::new("Courier Bold", 11.4),
        }
    }
}

/// Position of a card cell on the sheet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardCell {
    pub row: usize,
    pub column: usize,
    pub x: f64,
    pub y: f64,
}

/// Page and grid geometry. Standard 3.5 x 2 inch cards, two across and five
/// down on US Letter:
///
/// - across: 0.75 + 2 * 3.5 + 0.75 = 8.5
/// - down: 0.5 + 5 * 2 + 0.5 = 11
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    pub page_width: Dimension,
    pub page_height: Dimension,
    pub card_width: Dimension,
    pub card_height: Dimension,
    pub left_margin: Dimension,
    pub top_margin: Dimension,
    pub rows: usize,
    pub columns: usize,
    pub border_width: Dimension,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            page_width: Dimension::inches(8.5),
            page_height: Dimension::inches(11.0),
            card_width: Dimension::inches(3.5),
            card_height: Dimension::inches(2.0),
            left_margin: Dimension::inches(0.75),
            top_margin: Dimension::inches(0.5),
            rows: 5,
            columns: 2,
            border_width: Dimension::points(2.0),
        }
    }
}

impl SheetLayout {
    pub fn cards_per_page(&self) -> usize {
        self.rows * self.columns
    }

    /// Top-left corner of a cell, in points from the top-left of the page
    pub fn card_origin(&self, row: usize, column: usize) -> (f64, f64) {
        (
            self.left_margin.as_points() + column as f64 * self.card_width.as_points(),
            self.top_margin.as_points() + row as f64 * self.card_height.as_points(),
        )
    }

    /// All cells in row-major order
    pub fn cells(&self) -> Vec<CardCell> {
        let mut cells = Vec::with_capacity(self.cards_per_page());
        for row in 0..self.rows {
            for column in 0..self.columns {
                let (x, y) = self.card_origin(row, column);
                cells.push(CardCell { row, column, x, y });
            }
        }
        cells
    }

    /// Check that the grid is non-empty and fits on the page
    pub fn validate(&self) -> Result<()> {
        if self.cards_per_page() == 0 {
            return Err(anyhow!(
                "Card grid is empty ({} rows x {} columns)",
                self.rows,
                self.columns
            ));
        }
        for (label, dim) in [
            ("page width", self.page_width),
            ("page height", self.page_height),
            ("card width", self.card_width),
            ("card height", self.card_height),
        ] {
            if dim.as_points().is_nan() || dim.as_points() <= 0.0 {
                return Err(anyhow!("{} must be positive, got {}pt", label, dim.as_points()));
            }
        }

        let used_width = self.left_margin.as_points()
            + self.columns as f64 * self.card_width.as_points();
        let used_height = self.top_margin.as_points()
            + self.rows as f64 * self.card_height.as_points();
        if used_width > self.page_width.as_points() || used_height > self.page_height.as_points() {
            return Err(anyhow!(
                "Card grid needs {}x{}pt but the page is {}x{}pt",
                used_width,
                used_height,
                self.page_width.as_points(),
                self.page_height.as_points()
            ));
        }
        Ok(())
    }
}

/// Offsets inside a card, in points from the card's top-left corner
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CardGeometry {
    pub text_left: Dimension,
    pub name_top: Dimension,
    pub email_advance: Dimension,
    pub address_advance: Dimension,
    pub address_line_advance: Dimension,
    /// Distance of the URL line's top from the card's bottom edge
    pub url_bottom_offset: Dimension,
    pub code_left: Dimension,
    pub code_top: Dimension,
    pub code_scale: f64,
}

impl Default for CardGeometry {
    fn default() -> Self {
        Self {
            text_left: Dimension::points(12.0),
            name_top: Dimension::points(15.0),
            email_advance: Dimension::points(22.0),
            address_advance: Dimension::points(50.0),
            address_line_advance: Dimension::points(15.0),
            url_bottom_offset: Dimension::points(25.0),
            code_left: Dimension::points(150.0),
            code_top: Dimension::points(10.0),
            code_scale: 0.1,
        }
    }
}

/// Everything printed on a sheet. `Default` is the compiled-in card.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    pub name: String,
    pub email: String,
    pub address_lines: Vec<String>,
    pub url: String,
    pub name_alignment: NameAlignment,
    pub fonts: FontSettings,
    pub layout: SheetLayout,
    pub geometry: CardGeometry,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            name: "Alex Willisson".to_string(),
            email: "atw@mit.edu".to_string(),
            address_lines: vec![
                "3 Ames Street".to_string(),
                "Cambridge, MA 02139".to_string(),
            ],
            url: "http://alex.willisson.org".to_string(),
            name_alignment: NameAlignment::Left,
            fonts: FontSettings::default(),
            layout: SheetLayout::default(),
            geometry: CardGeometry::default(),
        }
    }
}

impl CardConfig {
    pub fn cards_per_page(&self) -> usize {
        self.layout.cards_per_page()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dimension_from_number() {
        let dim: Dimension = serde_json::from_value(json!(252)).unwrap();
        assert_eq!(dim.as_points(), 252.0);
    }

    #[test]
    fn test_dimension_from_f64() {
        let dim: Dimension = serde_json::from_value(json!(11.4)).unwrap();
        assert_eq!(dim.as_points(), 11.4);
    }

    #[test]
    fn test_dimension_from_mm() {
        let dim: Dimension = serde_json::from_value(json!("100 mm")).unwrap();
        // 100 mm = 100 * 72 / 25.4 points ≈ 283.46
        assert!((dim.as_points() - 283.46).abs() < 0.01);
    }

    #[test]
    fn test_dimension_from_cm() {
        let dim: Dimension = serde_json::from_value(json!("10 cm")).unwrap();
        assert!((dim.as_points() - 283.46).abs() < 0.01);
    }

    #[test]
    fn test_dimension_from_inches() {
        for text in ["3.5 in", "3.5 inch", "3.5 inches", "3.5in"] {
            let dim: Dimension = serde_json::from_value(json!(text)).unwrap();
            assert_eq!(dim.as_points(), 252.0, "{}", text);
        }
    }

    #[test]
    fn test_dimension_from_pt() {
        let dim: Dimension = serde_json::from_value(json!("  25 PT ")).unwrap();
        assert_eq!(dim.as_points(), 25.0);
    }

    #[test]
    fn test_dimension_invalid_unit() {
        let result: Result<Dimension, _> = serde_json::from_value(json!("100 foo"));
        assert!(result.is_err());
    }

    #[test]
    fn test_dimension_from_str() {
        let dim: Dimension = "89mm".parse().unwrap();
        assert!((dim.as_points() - 252.28).abs() < 0.01);
        let err = "2 furlongs".parse::<Dimension>().unwrap_err();
        assert!(err.to_string().contains("unknown unit 'furlongs'"));
    }

    #[test]
    fn test_dimension_invalid_number() {
        let result: Result<Dimension, _> = serde_json::from_value(json!("abc mm"));
        assert!(result.is_err());
    }

    #[test]
    fn test_default_layout_is_letter_with_ten_cards() {
        let layout = SheetLayout::default();
        assert_eq!(layout.page_width.as_points(), 612.0);
        assert_eq!(layout.page_height.as_points(), 792.0);
        assert_eq!(layout.card_width.as_points(), 252.0);
        assert_eq!(layout.card_height.as_points(), 144.0);
        assert_eq!(layout.left_margin.as_points(), 54.0);
        assert_eq!(layout.top_margin.as_points(), 36.0);
        assert_eq!(layout.cards_per_page(), 10);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn test_card_origins_cover_grid() {
        let layout = SheetLayout::default();
        for row in 0..5 {
            for col in 0..2 {
                let (x, y) = layout.card_origin(row, col);
                assert_eq!(x, 54.0 + col as f64 * 252.0);
                assert_eq!(y, 36.0 + row as f64 * 144.0);
            }
        }
    }

    #[test]
    fn test_cells_are_row_major() {
        let cells = SheetLayout::default().cells();
        assert_eq!(cells.len(), 10);
        let order: Vec<(usize, usize)> = cells.iter().map(|c| (c.row, c.column)).collect();
        assert_eq!(order[..4], [(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_eq!(cells[9], CardCell { row: 4, column: 1, x: 306.0, y: 612.0 });
    }

    #[test]
    fn test_layout_that_overflows_page_is_rejected() {
        let layout: SheetLayout = serde_json::from_value(json!({ "rows": 6 })).unwrap();
        let err = layout.validate().unwrap_err();
        assert!(err.to_string().contains("page"));
    }

    #[test]
    fn test_empty_grid_is_rejected() {
        let layout: SheetLayout = serde_json::from_value(json!({ "columns": 0 })).unwrap();
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_default_fonts_descriptor_strings() {
        let fonts = FontSettings::default();
        assert_eq!(fonts.display.descriptor_string(), "Lucida Sans Bold 12");
        assert_eq!(fonts.body.descriptor_string(), "Lucida Sans 8");
        assert_eq!(fonts.mono.descriptor_string(), "Courier Bold 11.4");
    }

    #[test]
    fn test_card_config_partial_json() {
        let config: CardConfig = serde_json::from_value(json!({
            "name": "Test Person",
            "address_lines": ["1 Main St", "Springfield", "USA"],
            "name_alignment": "centered",
            "layout": { "rows": 2, "columns": 3, "card_width": "2 in" }
        }))
        .unwrap();
        assert_eq!(config.name, "Test Person");
        assert_eq!(config.email, "atw@mit.edu");
        assert_eq!(config.address_lines.len(), 3);
        assert_eq!(config.name_alignment, NameAlignment::Centered);
        assert_eq!(config.cards_per_page(), 6);
        assert_eq!(config.layout.card_width.as_points(), 144.0);
        assert_eq!(config.layout.card_height.as_points(), 144.0);
        assert_eq!(config.geometry.code_scale, 0.1);
    }
}
