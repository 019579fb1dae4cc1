//! Reference template library
//!
//! Canonical 5×7 bitmaps for the digits 0–9 and the blank (unlit) position.
//! A digit may have several variants because scoreboards differ in how they
//! render some segments (a "7" with or without the upper-left segment, a "6"
//! with or without its top bar, ...).
//!
//! Templates are loaded once and shared read-only across all iterations.

use std::fmt;
use std::path::Path;

use super::glyph::{Glyph, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::error::{Error, Result};

/// Pixel threshold used when reading template image files
const TEMPLATE_PIXEL_THRESHOLD: u8 = 127;

/// Value a template stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphValue {
    /// A digit 0–9
    Digit(u8),
    /// An unlit position
    Blank,
}

impl fmt::Display for GlyphValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlyphValue::Digit(d) => write!(f, "{}", d),
            GlyphValue::Blank => write!(f, "blank"),
        }
    }
}

/// A single reference bitmap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Value this template represents
    pub value: GlyphValue,
    /// Variant label ('A', 'B', ...)
    pub variant: char,
    /// Canonical bitmap
    pub glyph: Glyph,
}

impl Template {
    /// Create a template
    pub fn new(value: GlyphValue, variant: char, glyph: Glyph) -> Self {
        Self {
            value,
            variant,
            glyph,
        }
    }

    /// Template name as used for files, e.g. `7B` or `blank`
    pub fn name(&self) -> String {
        match self.value {
            GlyphValue::Digit(d) => format!("{}{}", d, self.variant),
            GlyphValue::Blank => "blank".to_string(),
        }
    }
}

/// Seven-segment glyphs as rendered after autocrop and 5×7 resampling
const BUILTIN: &[(&str, &str)] = &[
    ("0A", "##### #...# #...# #...# #...# #...# #####"),
    ("1A", "##### ##### ##### ##### ##### ##### #####"),
    ("1B", "..### .#### ..### ..### ..### ..### #####"),
    ("2A", "##### ....# ....# ##### #.... #.... #####"),
    ("3A", "##### ....# ....# ##### ....# ....# #####"),
    ("4A", "#...# #...# #...# ##### ....# ....# ....#"),
    ("5A", "##### #.... #.... ##### ....# ....# #####"),
    ("6A", "##### #.... #.... ##### #...# #...# #####"),
    ("6B", "#.... #.... #.... ##### #...# #...# #####"),
    ("7A", "##### ....# ....# ....# ....# ....# ....#"),
    ("7B", "##### #...# #...# ....# ....# ....# ....#"),
    ("8A", "##### #...# #...# ##### #...# #...# #####"),
    ("9A", "##### #...# #...# ##### ....# ....# #####"),
    ("9B", "##### #...# #...# ##### ....# ....# ....#"),
];

/// Immutable set of reference templates
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: Vec<Template>,
}

impl TemplateLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in seven-segment set plus the blank glyph
    pub fn builtin() -> Self {
        let mut library = Self::new();
        for (name, art) in BUILTIN {
            let mut chars = name.chars();
            let digit = chars.next().and_then(|c| c.to_digit(10));
            let variant = chars.next();
            // Table entries are static and covered by tests
            if let (Some(d), Some(v), Ok(glyph)) = (digit, variant, Glyph::parse(art)) {
                library.push(Template::new(GlyphValue::Digit(d as u8), v, glyph));
            }
        }
        library.push(Template::new(GlyphValue::Blank, 'A', Glyph::BLANK));
        library
    }

    /// Build a library from named `#`/`.` art, names as in [`parse_template_name`]
    pub fn from_ascii<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut library = Self::new();
        for (name, art) in entries {
            let (value, variant) = parse_template_name(name)
                .ok_or_else(|| Error::Template(format!("bad template name: {}", name)))?;
            library.push(Template::new(value, variant, Glyph::parse(art)?));
        }
        Ok(library)
    }

    /// Load every `<digit><variant>.png` and `blank.png` file from a directory
    ///
    /// Files that do not follow the naming scheme are skipped. Each image must
    /// be exactly 5×7; pixels brighter than 127 are lit.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("png"))
            })
            .collect();
        paths.sort();

        let mut library = Self::new();
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some((value, variant)) = parse_template_name(stem) else {
                tracing::debug!(path = %path.display(), "Skipping file with unknown template name");
                continue;
            };

            let gray = image::open(&path)?.to_luma8();
            let glyph = Glyph::from_gray(&gray, TEMPLATE_PIXEL_THRESHOLD).ok_or_else(|| {
                Error::Template(format!(
                    "{} is {}x{}, expected {}x{}",
                    path.display(),
                    gray.width(),
                    gray.height(),
                    GLYPH_WIDTH,
                    GLYPH_HEIGHT
                ))
            })?;
            library.push(Template::new(value, variant, glyph));
        }

        if library.is_empty() {
            return Err(Error::Template(format!(
                "no templates found in {}",
                dir.display()
            )));
        }

        tracing::info!(
            dir = %dir.display(),
            templates = library.len(),
            "Loaded reference templates"
        );
        Ok(library)
    }

    /// Add a template
    pub fn push(&mut self, template: Template) {
        self.templates.push(template);
    }

    /// All templates in load order
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Look up a template by value and variant
    pub fn get(&self, value: GlyphValue, variant: char) -> Option<&Template> {
        self.templates
            .iter()
            .find(|t| t.value == value && t.variant == variant)
    }

    /// Variants registered for a value
    pub fn variants(&self, value: GlyphValue) -> impl Iterator<Item = &Template> {
        self.templates.iter().filter(move |t| t.value == value)
    }

    /// Number of templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the library has no templates
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Parse `7B`, `0A` or `blank` into a value and variant
pub fn parse_template_name(name: &str) -> Option<(GlyphValue, char)> {
    if name.eq_ignore_ascii_case("blank") {
        return Some((GlyphValue::Blank, 'A'));
    }
    let mut chars = name.chars();
    let digit = chars.next()?.to_digit(10)?;
    let variant = chars.next().unwrap_or('A').to_ascii_uppercase();
    if chars.next().is_some() || !variant.is_ascii_alphabetic() {
        return None;
    }
    Some((GlyphValue::Digit(digit as u8), variant))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_builtin_covers_every_digit() {
        let library = TemplateLibrary::builtin();

        for d in 0..=9 {
            assert!(
                library.variants(GlyphValue::Digit(d)).count() >= 1,
                "missing digit {}",
                d
            );
        }
        assert!(library.get(GlyphValue::Blank, 'A').is_some());
        assert_eq!(library.len(), BUILTIN.len() + 1);
    }

    #[test]
    fn test_builtin_variants_are_disjoint() {
        let library = TemplateLibrary::builtin();
        let unique: HashSet<Glyph> = library.templates().iter().map(|t| t.glyph).collect();

        assert_eq!(unique.len(), library.len());
    }

    #[test]
    fn test_template_names() {
        let library = TemplateLibrary::builtin();

        assert_eq!(library.get(GlyphValue::Digit(7), 'B').unwrap().name(), "7B");
        assert_eq!(library.get(GlyphValue::Blank, 'A').unwrap().name(), "blank");
    }

    #[test]
    fn test_parse_template_name() {
        assert_eq!(parse_template_name("7B"), Some((GlyphValue::Digit(7), 'B')));
        assert_eq!(parse_template_name("3"), Some((GlyphValue::Digit(3), 'A')));
        assert_eq!(parse_template_name("blank"), Some((GlyphValue::Blank, 'A')));
        assert_eq!(parse_template_name("x1"), None);
        assert_eq!(parse_template_name("7BB"), None);
        assert_eq!(parse_template_name("7_"), None);
    }

    #[test]
    fn test_from_ascii() {
        let library = TemplateLibrary::from_ascii([
            ("1A", "##### ##### ##### ##### ##### ##### #####"),
            ("blank", "..... ..... ..... ..... ..... ..... ....."),
        ])
        .unwrap();

        assert_eq!(library.len(), 2);
        assert!(TemplateLibrary::from_ascii([("zz", "#####")]).is_err());
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        let builtin = TemplateLibrary::builtin();

        let seven_b = builtin.get(GlyphValue::Digit(7), 'B').unwrap();
        seven_b.glyph.to_gray().save(dir.path().join("7B.png")).unwrap();
        Glyph::BLANK.to_gray().save(dir.path().join("blank.png")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let library = TemplateLibrary::load_dir(dir.path()).unwrap();

        assert_eq!(library.len(), 2);
        assert_eq!(
            library.get(GlyphValue::Digit(7), 'B').unwrap().glyph,
            seven_b.glyph
        );
    }

    #[test]
    fn test_load_dir_rejects_wrong_size() {
        let dir = tempfile::tempdir().unwrap();
        image::GrayImage::new(6, 7).save(dir.path().join("0A.png")).unwrap();

        assert!(matches!(
            TemplateLibrary::load_dir(dir.path()),
            Err(Error::Template(_))
        ));
    }

    #[test]
    fn test_load_dir_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TemplateLibrary::load_dir(dir.path()).is_err());
    }
}
