use anyhow::{Context, Result};
use log::{debug, info};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::bitmap::BitmapResource;
use super::canvas::{BitmapPattern, Canvas};
use super::fonts::{create_font, FontFace};
use super::resources::PageResources;
use crate::config::SheetLayout;

const PRODUCER: &str = concat!("bcard ", env!("CARGO_PKG_VERSION"));

/// The output PDF: one page, its resources, and the open output file
pub struct SheetDocument {
    doc: Document,
    pages_id: ObjectId,
    resources: PageResources,
    page_width: f64,
    page_height: f64,
    path: PathBuf,
    writer: BufWriter<File>,
}

/// Create the output file and an empty single-page document sized to the
/// layout's page.
pub fn initialize_document(path: &Path, layout: &SheetLayout) -> Result<SheetDocument> {
    let file = File::create(path)
        .with_context(|| format!("Failed to open {:?} for writing", path))?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let page_width = layout.page_width.as_points();
    let page_height = layout.page_height.as_points();
    info!("Created {:?} ({}x{}pt)", path, page_width, page_height);

    Ok(SheetDocument {
        doc,
        pages_id,
        resources: PageResources::new(),
        page_width,
        page_height,
        path: path.to_path_buf(),
        writer: BufWriter::new(file),
    })
}

impl SheetDocument {
    /// Drawing context for the page, with a top-left origin
    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.page_height)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a font to the document unless an identical face is already
    /// registered; returns its resource name.
    pub fn register_font(&mut self, face: &FontFace) -> String {
        let base_font = face.base_font_name();
        if let Some(name) = self.resources.font_resource(base_font) {
            return name.to_string();
        }
        let font_id = create_font(&mut self.doc, face);
        let name = self.resources.add_font(base_font, font_id);
        debug!("Registered font {} as /{}", base_font, name);
        name
    }

    /// Add the bitmap as an image XObject and return a paintable handle
    pub fn register_image(&mut self, bitmap: &BitmapResource) -> BitmapPattern {
        let mut img_dict = Dictionary::new();
        img_dict.set("Type", "XObject");
        img_dict.set("Subtype", "Image");
        img_dict.set("Width", i64::from(bitmap.width));
        img_dict.set("Height", i64::from(bitmap.height));
        img_dict.set("ColorSpace", bitmap.color_space.pdf_name());
        img_dict.set("BitsPerComponent", 8_i64);
        img_dict.set("Filter", "FlateDecode");

        if let Some(alpha) = &bitmap.alpha {
            let mask_dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(bitmap.width),
                "Height" => i64::from(bitmap.height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8_i64,
                "Filter" => "FlateDecode",
            };
            let mask_id = self
                .doc
                .add_object(Stream::new(mask_dict, alpha.clone()).with_compression(false));
            img_dict.set("SMask", Object::Reference(mask_id));
        }

        let img_stream = Stream::new(img_dict, bitmap.samples.clone()).with_compression(false);
        let img_id = self.doc.add_object(img_stream);
        let resource = self.resources.add_xobject(img_id);
        debug!("Registered {}x{} image as /{}", bitmap.width, bitmap.height, resource);

        BitmapPattern {
            resource,
            width: bitmap.width,
            height: bitmap.height,
        }
    }

    /// Attach the canvas as the page's content and build the page tree
    fn assemble(&mut self, canvas: Canvas) -> Result<()> {
        let content = canvas.into_content()?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content));

        let resources_id = self
            .doc
            .add_object(Object::Dictionary(self.resources.to_dictionary()));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(self.page_width as _),
                Object::Real(self.page_height as _),
            ],
            "Contents" => content_id,
            "Resources" => resources_id,
        });

        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::string_literal("Business cards"),
            "Producer" => Object::string_literal(PRODUCER),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);
        self.doc.compress();
        Ok(())
    }

    /// Write the finished page to the output file and close it
    pub fn finalize(mut self, canvas: Canvas) -> Result<()> {
        self.assemble(canvas)?;
        self.doc
            .save_to(&mut self.writer)
            .with_context(|| format!("Failed to write {:?}", self.path))?;
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {:?}", self.path))?;
        info!("Wrote {:?}", self.path);
        Ok(())
    }
}
