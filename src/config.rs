//! Configuration of a patch run.
//!
//! [`PatchConfig`] says where the game lives and carries the values that are tied to one
//! build of the game: the number of projectile slots the recast scan walks and the local
//! slot holding the item in use. The defaults match the current Steam release.

use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{Error::InvalidConfig, Result};

/// Environment variable naming the game directory
pub const GAME_DIR_VAR: &str = "TERRARIA_DIR";

/// Name of the game executable
pub const DEFAULT_EXE_NAME: &str = "Terraria.exe";

/// Length of `Main.projectile`
pub const DEFAULT_MAX_PROJECTILES: i32 = 1000;

/// Local of `Player.ItemCheck` holding the item in use
pub const DEFAULT_HELD_ITEM_LOCAL: u16 = 1;

/// Settings of one patch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchConfig {
    /// Directory containing the executable
    pub game_dir: PathBuf,

    /// File name of the executable (default: `Terraria.exe`).
    pub exe_name: String,

    /// Number of projectile slots the recast check scans (default: 1000).
    pub max_projectiles: i32,

    /// Local slot of `Player.ItemCheck` holding the item in use (default: 1).
    pub held_item_local: u16,

    /// Keep `<exe>.bak` and the hash sidecar up to date (default: true).
    pub backup: bool,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            game_dir: default_game_dir(env::var_os("HOME").or_else(|| env::var_os("USERPROFILE"))),
            exe_name: DEFAULT_EXE_NAME.to_string(),
            max_projectiles: DEFAULT_MAX_PROJECTILES,
            held_item_local: DEFAULT_HELD_ITEM_LOCAL,
            backup: true,
        }
    }
}

impl PatchConfig {
    /// Creates a configuration with the default Steam location.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration whose game directory comes from `TERRARIA_DIR`, falling
    /// back to the default Steam location.
    #[must_use]
    pub fn from_env() -> Self {
        match env::var_os(GAME_DIR_VAR) {
            Some(dir) if !dir.is_empty() => Self::default().with_game_dir(dir),
            _ => Self::default(),
        }
    }

    /// Sets the game directory.
    #[must_use]
    pub fn with_game_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.game_dir = dir.into();
        self
    }

    /// Sets the executable name.
    #[must_use]
    pub fn with_exe_name(mut self, name: impl Into<String>) -> Self {
        self.exe_name = name.into();
        self
    }

    /// Sets the number of projectile slots to scan.
    #[must_use]
    pub fn with_max_projectiles(mut self, slots: i32) -> Self {
        self.max_projectiles = slots;
        self
    }

    /// Sets the local slot holding the item in use.
    #[must_use]
    pub fn with_held_item_local(mut self, local: u16) -> Self {
        self.held_item_local = local;
        self
    }

    /// Enables or disables backup bookkeeping.
    #[must_use]
    pub fn with_backup(mut self, enable: bool) -> Self {
        self.backup = enable;
        self
    }

    /// Check the values that end up inside the patched code.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConfig`] if `max_projectiles` is not positive, as the
    /// recast scan would then never see a bobber in flight.
    pub fn validate(&self) -> Result<()> {
        if self.max_projectiles <= 0 {
            return Err(InvalidConfig(format!(
                "max_projectiles must be positive, got {}",
                self.max_projectiles
            )));
        }
        Ok(())
    }

    /// Path of the executable
    #[must_use]
    pub fn exe_path(&self) -> PathBuf {
        self.game_dir.join(&self.exe_name)
    }

    /// Path of the backup, `<exe>.bak`
    #[must_use]
    pub fn backup_path(&self) -> PathBuf {
        with_suffix(&self.exe_path(), ".bak")
    }

    /// Path of the hash sidecar, `<exe>.patched.sha256`
    #[must_use]
    pub fn hash_path(&self) -> PathBuf {
        with_suffix(&self.exe_path(), ".patched.sha256")
    }
}

/// `path` with `suffix` appended to its file name
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// The Steam install location of the game for the current OS
fn default_game_dir(home: Option<OsString>) -> PathBuf {
    let home = home.map(PathBuf::from).unwrap_or_default();

    if cfg!(target_os = "macos") {
        home.join(
            "Library/Application Support/Steam/steamapps/common/Terraria/Terraria.app/Contents/Resources",
        )
    } else if cfg!(windows) {
        PathBuf::from(r"C:\Program Files (x86)\Steam\steamapps\common\Terraria")
    } else {
        home.join(".local/share/Steam/steamapps/common/Terraria")
    }
}
