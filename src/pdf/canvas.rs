//! Drawing context for the sheet's content stream.
//!
//! Coordinates are in points with the origin at the top-left of the page and
//! y growing downward. The stream starts with a flip so every operator below
//! works in that space directly.

use anyhow::{anyhow, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};
use std::ops::{Deref, DerefMut};

use super::fonts::{encode_text, FontStyle};

/// Gray level in percent: 0 is black, 100 is white
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gray(pub f64);

impl Gray {
    pub const BLACK: Gray = Gray(0.0);

    /// Value for the PDF `g`/`G` operators
    pub fn level(self) -> f64 {
        (self.0 / 100.0).clamp(0.0, 1.0)
    }
}

/// Affine transform `[a b c d e f]` in PDF matrix order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    pub fn translate(tx: f64, ty: f64) -> Self {
        Transform { e: tx, f: ty, ..Self::IDENTITY }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Transform { a: sx, d: sy, ..Self::IDENTITY }
    }

    /// `m × self`: `m` applies first, like the `cm` operator
    pub fn pre_concat(&self, m: &Transform) -> Transform {
        Transform {
            a: m.a * self.a + m.b * self.c,
            b: m.a * self.b + m.b * self.d,
            c: m.c * self.a + m.d * self.c,
            d: m.c * self.b + m.d * self.d,
            e: m.e * self.a + m.f * self.c + self.e,
            f: m.e * self.b + m.f * self.d + self.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    fn operands(&self) -> Vec<Object> {
        [self.a, self.b, self.c, self.d, self.e, self.f]
            .into_iter()
            .map(real)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct GraphicsState {
    transform: Transform,
    gray: Gray,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            transform: Transform::IDENTITY,
            gray: Gray::BLACK,
        }
    }
}

/// An image XObject registered in the document
#[derive(Debug, Clone, PartialEq)]
pub struct BitmapPattern {
    pub resource: String,
    pub width: u32,
    pub height: u32,
}

/// Records content operators while tracking transform and gray state
#[derive(Debug)]
pub struct Canvas {
    operations: Vec<Operation>,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
}

impl Canvas {
    pub fn new(page_height: f64) -> Self {
        let flip = Transform { d: -1.0, f: page_height, ..Transform::IDENTITY };
        Self {
            operations: vec![Operation::new("cm", flip.operands())],
            state: GraphicsState::default(),
            saved: Vec::new(),
        }
    }

    /// Save the drawing state; it is restored when the guard drops
    pub fn push_frame(&mut self) -> FrameGuard<'_> {
        self.saved.push(self.state);
        self.operations.push(Operation::new("q", vec![]));
        FrameGuard { canvas: self }
    }

    fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.state = state;
            self.operations.push(Operation::new("Q", vec![]));
        }
    }

    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.concat(Transform::translate(tx, ty));
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.concat(Transform::scale(sx, sy));
    }

    fn concat(&mut self, m: Transform) {
        self.state.transform = self.state.transform.pre_concat(&m);
        self.operations.push(Operation::new("cm", m.operands()));
    }

    /// Set both stroke and fill color
    pub fn set_gray(&mut self, gray: Gray) {
        self.state.gray = gray;
        self.operations.push(Operation::new("G", vec![real(gray.level())]));
        self.operations.push(Operation::new("g", vec![real(gray.level())]));
    }

    pub fn set_line_width(&mut self, width: f64) {
        self.operations.push(Operation::new("w", vec![real(width)]));
    }

    pub fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.operations.push(Operation::new(
            "re",
            vec![real(x), real(y), real(width), real(height)],
        ));
        self.operations.push(Operation::new("S", vec![]));
    }

    /// Draw `text` with the top-left of its line box at (x, y)
    pub fn draw_text(&mut self, font: &FontStyle, text: &str, x: f64, y: f64) {
        let baseline = y + font.ascent();
        self.operations.push(Operation::new("BT", vec![]));
        self.operations.push(Operation::new(
            "Tf",
            vec![Object::Name(font.resource.as_bytes().to_vec()), real(font.points)],
        ));
        // Flip glyphs back upright inside the y-down page space
        self.operations.push(Operation::new(
            "Tm",
            vec![real(1.0), real(0.0), real(0.0), real(-1.0), real(x), real(baseline)],
        ));
        self.operations.push(Operation::new(
            "Tj",
            vec![Object::String(encode_text(text), StringFormat::Literal)],
        ));
        self.operations.push(Operation::new("ET", vec![]));
    }

    /// Paint the image at its native pixel size with its top-left at the
    /// current origin.
    pub fn paint_image(&mut self, image: &BitmapPattern) {
        let width = f64::from(image.width);
        let height = f64::from(image.height);
        let placement = Transform { a: width, d: -height, f: height, ..Transform::IDENTITY };
        self.operations.push(Operation::new("q", vec![]));
        self.operations.push(Operation::new("cm", placement.operands()));
        self.operations.push(Operation::new(
            "Do",
            vec![Object::Name(image.resource.as_bytes().to_vec())],
        ));
        self.operations.push(Operation::new("Q", vec![]));
    }

    /// Current origin in page coordinates
    pub fn origin(&self) -> (f64, f64) {
        self.state.transform.apply(0.0, 0.0)
    }

    #[cfg(test)]
    pub fn transform(&self) -> Transform {
        self.state.transform
    }

    #[cfg(test)]
    pub fn gray(&self) -> Gray {
        self.state.gray
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Encode the recorded operators as a content stream
    pub fn into_content(self) -> Result<Vec<u8>> {
        if !self.saved.is_empty() {
            return Err(anyhow!("{} drawing frames were never restored", self.saved.len()));
        }
        let content = Content {
            operations: self.operations,
        };
        Ok(content.encode()?)
    }
}

/// Scoped drawing state; dropping it restores the state saved by
/// [`Canvas::push_frame`].
pub struct FrameGuard<'a> {
    canvas: &'a mut Canvas,
}

impl Deref for FrameGuard<'_> {
    type Target = Canvas;

    fn deref(&self) -> &Canvas {
        &*self.canvas
    }
}

impl DerefMut for FrameGuard<'_> {
    fn deref_mut(&mut self) -> &mut Canvas {
        &mut *self.canvas
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.canvas.restore();
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as _)
}
