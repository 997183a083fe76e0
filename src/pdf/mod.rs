//! PDF output: the sheet document, its drawing canvas, fonts and images.

pub mod bitmap;
pub mod canvas;
pub mod document;
pub mod fonts;
pub mod resources;

pub use bitmap::load_bitmap;
pub use canvas::{BitmapPattern, Canvas, Gray};
pub use document::initialize_document;
pub use fonts::{load_font_styles, CardFonts, FontResolver};
