//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::{fs, path::Path};

use autofish::config::PatchConfig;

#[path = "../../src/test/builder.rs"]
mod builder;

pub use builder::ImageBuilder;

/// A game directory holding `image` as the executable
pub struct Game {
    pub dir: tempfile::TempDir,
    pub config: PatchConfig,
}

impl Game {
    pub fn with_image(image: &[u8]) -> Game {
        let dir = tempfile::tempdir().unwrap();
        let config = PatchConfig::new().with_game_dir(dir.path());
        fs::write(config.exe_path(), image).unwrap();
        Game { dir, config }
    }

    pub fn exe(&self) -> Vec<u8> {
        fs::read(self.config.exe_path()).unwrap()
    }

    pub fn backup(&self) -> Vec<u8> {
        fs::read(self.config.backup_path()).unwrap()
    }

    pub fn replace_exe(&self, image: &[u8]) {
        fs::write(self.config.exe_path(), image).unwrap();
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
