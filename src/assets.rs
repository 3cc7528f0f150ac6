//! Id-keyed asset descriptors
//!
//! The store records where textures and fonts live; it never decodes them.
//! Systems carry only asset ids and look them up here at render time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    pub path: PathBuf,
    pub size: u32,
}

#[derive(Debug, Default)]
pub struct AssetStore {
    textures: BTreeMap<String, Texture>,
    fonts: BTreeMap<String, Font>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a texture, replacing any previous one with the same id.
    pub fn add_texture(&mut self, id: impl Into<String>, path: impl AsRef<Path>) {
        let id = id.into();
        let path = path.as_ref().to_path_buf();
        log::info!("added texture `{id}` ({})", path.display());
        self.textures.insert(id, Texture { path });
    }

    pub fn texture(&self, id: &str) -> Option<&Texture> {
        self.textures.get(id)
    }

    pub fn add_font(&mut self, id: impl Into<String>, path: impl AsRef<Path>, size: u32) {
        let id = id.into();
        let path = path.as_ref().to_path_buf();
        log::info!("added font `{id}` ({}, {size}pt)", path.display());
        self.fonts.insert(id, Font { path, size });
    }

    pub fn font(&self, id: &str) -> Option<&Font> {
        self.fonts.get(id)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub fn clear(&mut self) {
        self.textures.clear();
        self.fonts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_lookup() {
        let mut store = AssetStore::new();
        store.add_texture("tank-image", "assets/images/tank.png");
        store.add_font("pico8-font-8", "assets/fonts/pico8.ttf", 8);

        assert_eq!(
            store.texture("tank-image").map(|t| t.path.as_path()),
            Some(Path::new("assets/images/tank.png"))
        );
        assert_eq!(store.font("pico8-font-8").map(|f| f.size), Some(8));
        assert!(store.texture("missing").is_none());

        store.clear();
        assert_eq!(store.texture_count() + store.font_count(), 0);
    }
}
