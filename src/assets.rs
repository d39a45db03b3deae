//! Source bitmaps for the gauges, decoded once and handed out as surfaces.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::debug;

use crate::graphics::Surface;

pub struct Assets {
    dir: PathBuf,
    loaded: HashMap<String, Surface>,
}

impl Assets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            loaded: HashMap::new(),
        }
    }

    /// Register an already decoded bitmap under `name`, bypassing the disk.
    pub fn insert(&mut self, name: &str, surface: Surface) {
        self.loaded.insert(name.to_string(), surface);
    }

    /// Return the bitmap called `name`, decoding it from the asset directory
    /// on first use.
    pub fn load(&mut self, name: &str) -> Result<Surface> {
        if let Some(surface) = self.loaded.get(name) {
            return Ok(surface.clone());
        }
        let path = self.dir.join(name);
        let surface = decode(&path)?;
        debug!(
            "loaded {:?} ({}x{})",
            path,
            surface.width(),
            surface.height()
        );
        self.loaded.insert(name.to_string(), surface.clone());
        Ok(surface)
    }
}

fn decode(path: &Path) -> Result<Surface> {
    let image = image::open(path)
        .with_context(|| format!("failed to load bitmap {:?}", path))?
        .into_rgba8();
    let (width, height) = image.dimensions();
    Surface::from_rgba(width as usize, height as usize, image.into_raw())
        .ok_or_else(|| anyhow!("bitmap {:?} has an unexpected buffer size", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Color;

    #[test]
    fn inserted_bitmaps_skip_the_disk() {
        let mut assets = Assets::new("/nonexistent");
        assets.insert("hi.bmp", Surface::filled(2, 2, Color::new(1, 2, 3)));
        let surface = assets.load("hi.bmp").expect("inserted asset");
        assert_eq!(surface.pixel(1, 1), Some([1, 2, 3, 0xff]));
    }

    #[test]
    fn missing_file_reports_path() {
        let mut assets = Assets::new("/nonexistent");
        let err = assets.load("vor1.png").unwrap_err();
        assert!(format!("{err:#}").contains("vor1.png"));
    }
}
