//! Card and sheet rendering.

use log::debug;

use crate::config::{CardConfig, NameAlignment};
use crate::pdf::{BitmapPattern, Canvas, CardFonts, Gray};

/// Light gray for the cut border
pub const BORDER_GRAY: Gray = Gray(80.0);

/// Dark gray for the postal address
pub const ADDRESS_GRAY: Gray = Gray(30.0);

/// Shared, read-only inputs for every card on the sheet
pub struct RenderContext<'a> {
    pub config: &'a CardConfig,
    pub fonts: &'a CardFonts,
    pub code: &'a BitmapPattern,
}

/// Draw one card with its top-left corner at the canvas origin
pub fn render_card(ctx: &RenderContext<'_>, canvas: &mut Canvas) {
    let config = ctx.config;
    let geometry = &config.geometry;
    let card_width = config.layout.card_width.as_points();
    let card_height = config.layout.card_height.as_points();

    canvas.set_gray(BORDER_GRAY);
    canvas.set_line_width(config.layout.border_width.as_points());
    canvas.stroke_rect(0.0, 0.0, card_width, card_height);

    let curx = geometry.text_left.as_points();
    let mut cury = geometry.name_top.as_points();

    canvas.set_gray(Gray::BLACK);
    let name = ctx.fonts.display.measure(&config.name);
    debug!("Name run measures {:.1}x{:.1}pt", name.width, name.height);
    let name_x = match config.name_alignment {
        NameAlignment::Left => curx,
        NameAlignment::Centered => (card_width - name.width) / 2.0,
    };
    canvas.draw_text(&ctx.fonts.display, &config.name, name_x, cury);

    cury += geometry.email_advance.as_points();
    canvas.draw_text(&ctx.fonts.mono, &config.email, curx, cury);

    canvas.set_gray(ADDRESS_GRAY);
    cury += geometry.address_advance.as_points();
    for (i, line) in config.address_lines.iter().enumerate() {
        if i > 0 {
            cury += geometry.address_line_advance.as_points();
        }
        canvas.draw_text(&ctx.fonts.body, line, curx, cury);
    }

    canvas.set_gray(Gray::BLACK);
    cury = card_height - geometry.url_bottom_offset.as_points();
    canvas.draw_text(&ctx.fonts.mono, &config.url, curx, cury);

    let mut code = canvas.push_frame();
    code.translate(geometry.code_left.as_points(), geometry.code_top.as_points());
    code.scale(geometry.code_scale, geometry.code_scale);
    code.paint_image(ctx.code);
}

/// Draw every card of the grid, row by row
pub fn render_sheet(ctx: &RenderContext<'_>, canvas: &mut Canvas) {
    for cell in ctx.config.layout.cells() {
        let mut card = canvas.push_frame();
        card.translate(cell.x, cell.y);
        debug!("Card ({}, {}) at {:?}", cell.row, cell.column, card.origin());
        render_card(ctx, &mut card);
    }
}
