mod config;
mod pdf;
mod render;

use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};

use config::{CardConfig, CODE_IMAGE_FILE, OUTPUT_FILE, VIEWER_COMMAND};
use pdf::{initialize_document, load_bitmap, load_font_styles, FontResolver};
use render::{render_sheet, RenderContext};

/// Print a sheet of ten business cards to cards.pdf.
///
/// Takes no options or arguments; reads code-med-high.png from the current
/// directory.
#[derive(Parser, Debug)]
#[command(name = "bcard")]
#[command(about = "Print a sheet of ten business cards to cards.pdf.", long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Args {}

/// Render the sheet into `work_dir` and return the output path
fn run(config: &CardConfig, work_dir: &Path, resolver: &FontResolver) -> Result<PathBuf> {
    config.layout.validate()?;

    let output_path = work_dir.join(OUTPUT_FILE);
    let mut sheet = initialize_document(&output_path, &config.layout)?;

    let fonts = load_font_styles(&mut sheet, resolver, &config.fonts)?;
    for style in [&fonts.display, &fonts.body, &fonts.mono] {
        info!(
            "Font {} ('{}') -> {} at {}pt as /{}",
            style.name,
            style.descriptor,
            style.face.base_font_name(),
            style.points,
            style.resource
        );
    }

    let bitmap = load_bitmap(&work_dir.join(CODE_IMAGE_FILE))?;
    let code = sheet.register_image(&bitmap);

    let ctx = RenderContext {
        config,
        fonts: &fonts,
        code: &code,
    };
    let mut canvas = sheet.canvas();
    render_sheet(&ctx, &mut canvas);
    info!("Rendered {} cards into {:?}", config.cards_per_page(), sheet.path());

    sheet.finalize(canvas)?;
    Ok(output_path)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_micros()
        .init();

    if let Err(e) = Args::try_parse() {
        eprint!("{}", e);
        std::process::exit(1);
    }

    let config = CardConfig::default();
    let resolver = FontResolver::system();

    if let Err(e) = run(&config, Path::new("."), &resolver) {
        eprintln!("Error: {}", e);
        for cause in e.chain().skip(1) {
            eprintln!("Caused by: {}", cause);
        }
        std::process::exit(1);
    }

    println!("{} {}", VIEWER_COMMAND, OUTPUT_FILE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, GrayImage};
    use lopdf::Document;

    fn write_code_image(dir: &Path) {
        let img = GrayImage::from_fn(40, 40, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 { Luma([0]) } else { Luma([255]) }
        });
        img.save(dir.join(CODE_IMAGE_FILE)).unwrap();
    }

    #[test]
    fn test_run_writes_single_letter_page() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        write_code_image(dir.path());

        let path = run(&CardConfig::default(), dir.path(), &FontResolver::standard_only()).unwrap();
        assert_eq!(path, dir.path().join("cards.pdf"));

        let doc = Document::load(&path).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.values().next().unwrap();
        let media_box: Vec<f32> = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_float().unwrap())
            .collect();
        assert_eq!(media_box, vec![0.0, 0.0, 612.0, 792.0]);

        let content = doc.get_and_decode_page_content(page_id).unwrap();
        let draws = content.operations.iter().filter(|op| op.operator == "Do").count();
        let texts = content.operations.iter().filter(|op| op.operator == "Tj").count();
        assert_eq!(draws, 10);
        assert_eq!(texts, 50);
    }

    #[test]
    fn test_run_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        write_code_image(dir.path());
        let resolver = FontResolver::standard_only();

        let path = run(&CardConfig::default(), dir.path(), &resolver).unwrap();
        let first = std::fs::read(&path).unwrap();
        run(&CardConfig::default(), dir.path(), &resolver).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_fails_without_code_image() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&CardConfig::default(), dir.path(), &FontResolver::standard_only()).unwrap_err();
        assert!(err.to_string().contains(CODE_IMAGE_FILE));
    }

    #[test]
    fn test_run_rejects_bad_font_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        write_code_image(dir.path());
        let mut config = CardConfig::default();
        config.fonts.body.points = 0.0;
        let err = run(&config, dir.path(), &FontResolver::standard_only()).unwrap_err();
        assert!(err.to_string().contains("error setting up Lucida Sans 0"));
    }

    #[test]
    fn test_run_rejects_oversized_grid_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        write_code_image(dir.path());
        let mut config = CardConfig::default();
        config.layout.columns = 3;
        assert!(run(&config, dir.path(), &FontResolver::standard_only()).is_err());
        assert!(!dir.path().join(OUTPUT_FILE).exists());
    }

    #[test]
    fn test_args_reject_anything() {
        assert!(Args::try_parse_from(["bcard"]).is_ok());
        assert!(Args::try_parse_from(["bcard", "extra.pdf"]).is_err());
        assert!(Args::try_parse_from(["bcard", "-x"]).is_err());
        assert!(Args::try_parse_from(["bcard", "--help"]).is_err());
    }
}
