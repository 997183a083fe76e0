use lopdf::{Dictionary, Object, ObjectId};
use std::collections::BTreeMap;

/// Resources referenced by the sheet's content stream.
///
/// Fonts are keyed by their PDF base font name so that styles resolving to
/// the same face share one `/Fn` entry.
#[derive(Debug, Default)]
pub struct PageResources {
    fonts: BTreeMap<String, (String, ObjectId)>,
    xobjects: Vec<(String, ObjectId)>,
}

impl PageResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resource name already assigned to `base_font`, if any
    pub fn font_resource(&self, base_font: &str) -> Option<&str> {
        self.fonts.get(base_font).map(|(name, _)| name.as_str())
    }

    /// Register a font object and return its resource name (`F1`, `F2`, ...)
    pub fn add_font(&mut self, base_font: &str, font_id: ObjectId) -> String {
        let name = format!("F{}", self.fonts.len() + 1);
        self.fonts
            .insert(base_font.to_string(), (name.clone(), font_id));
        name
    }

    /// Register an image XObject and return its resource name (`Im1`, ...)
    pub fn add_xobject(&mut self, xobject_id: ObjectId) -> String {
        let name = format!("Im{}", self.xobjects.len() + 1);
        self.xobjects.push((name.clone(), xobject_id));
        name
    }

    /// Build the page's `/Resources` dictionary
    pub fn to_dictionary(&self) -> Dictionary {
        let mut font_resources = Dictionary::new();
        for (name, id) in self.fonts.values() {
            font_resources.set(name.as_bytes().to_vec(), Object::Reference(*id));
        }

        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(font_resources));

        if !self.xobjects.is_empty() {
            let mut xobject_resources = Dictionary::new();
            for (name, id) in &self.xobjects {
                xobject_resources.set(name.as_bytes().to_vec(), Object::Reference(*id));
            }
            resources.set("XObject", Object::Dictionary(xobject_resources));
        }

        resources.set(
            "ProcSet",
            vec![
                Object::Name(b"PDF".to_vec()),
                Object::Name(b"Text".to_vec()),
                Object::Name(b"ImageB".to_vec()),
                Object::Name(b"ImageC".to_vec()),
            ],
        );
        resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_names_are_sequential_and_shared() {
        let mut resources = PageResources::new();
        assert_eq!(resources.add_font("Helvetica-Bold", (1, 0)), "F1");
        assert_eq!(resources.add_font("Courier-Bold", (2, 0)), "F2");
        assert_eq!(resources.font_resource("Helvetica-Bold"), Some("F1"));
        assert_eq!(resources.font_resource("Helvetica"), None);
    }

    #[test]
    fn test_dictionary_contains_fonts_and_xobjects() {
        let mut resources = PageResources::new();
        resources.add_font("Helvetica", (3, 0));
        assert_eq!(resources.add_xobject((7, 0)), "Im1");

        let dict = resources.to_dictionary();
        let fonts = dict.get(b"Font").unwrap().as_dict().unwrap();
        assert_eq!(fonts.get(b"F1").unwrap().as_reference().unwrap(), (3, 0));
        let xobjects = dict.get(b"XObject").unwrap().as_dict().unwrap();
        assert_eq!(xobjects.get(b"Im1").unwrap().as_reference().unwrap(), (7, 0));
    }

    #[test]
    fn test_dictionary_without_images_has_no_xobjects() {
        let dict = PageResources::new().to_dictionary();
        assert!(dict.get(b"XObject").is_err());
        assert!(dict.get(b"Font").is_ok());
    }
}
