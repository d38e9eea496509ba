// Font lookup and caching for text drawables
use skia_safe::{Font, FontMgr, FontStyle, Typeface};
use std::cell::RefCell;
use std::collections::HashMap;

/// Font manager with a per family and size cache
pub struct FontCache {
    font_mgr: FontMgr,
    fallback: Option<Typeface>,
    // key is (family, size rounded to 1/4 px)
    cache: RefCell<HashMap<(String, u32), Font>>,
}

impl FontCache {
    pub fn new() -> Self {
        let font_mgr = FontMgr::new();
        let fallback = font_mgr.legacy_make_typeface(None, FontStyle::default());
        Self {
            font_mgr,
            fallback,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Get or create a font for a comma separated `family` list at `size`
    pub fn font(&self, family: &str, size: f32) -> Font {
        let key = (family.to_string(), (size * 4.0).round() as u32);
        if let Some(font) = self.cache.borrow().get(&key) {
            return font.clone();
        }

        let typeface = family
            .split(',')
            .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\''))
            .filter(|name| !name.is_empty())
            .find_map(|name| self.font_mgr.match_family_style(name, FontStyle::normal()))
            .or_else(|| self.fallback.clone());

        let font = match typeface {
            Some(typeface) => Font::from_typeface(typeface, size),
            None => {
                tracing::debug!("no typeface available for {}", family);
                let mut font = Font::default();
                font.set_size(size);
                font
            }
        };
        self.cache.borrow_mut().insert(key, font.clone());
        font
    }
}

impl Default for FontCache {
    fn default() -> Self {
        Self::new()
    }
}
