//! Backup and restore bookkeeping for the patched executable.
//!
//! Next to the executable live two files: `<exe>.bak`, a copy of the unpatched game, and
//! `<exe>.patched.sha256`, the uppercase hex SHA-256 of the image this crate wrote last.
//! Comparing the executable against the sidecar tells apart a game we patched before from
//! one Steam has updated since, so repeated runs always patch a pristine image and never
//! patch twice.

use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};

use crate::{config::PatchConfig, Result};

/// What the files next to the executable say about it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupState {
    /// There is no backup yet
    Missing,
    /// A backup without hash sidecar, left by an older patcher
    Unverified,
    /// The executable is the image we wrote last
    Patched,
    /// The executable changed since we wrote it, the game was updated
    Updated,
}

/// What [`Backup::prepare`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupAction {
    /// Copied the executable to a new backup
    Created,
    /// Replaced a backup that had no sidecar
    ReplacedStale,
    /// Restored the unpatched executable from the backup
    RestoredOriginal,
    /// Replaced the backup with the updated executable
    ReplacedAfterUpdate,
}

/// The backup and sidecar of one executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    exe: PathBuf,
    backup: PathBuf,
    sidecar: PathBuf,
}

impl Backup {
    /// The backup files of the executable named by `config`
    #[must_use]
    pub fn new(config: &PatchConfig) -> Self {
        Backup {
            exe: config.exe_path(),
            backup: config.backup_path(),
            sidecar: config.hash_path(),
        }
    }

    /// Path of the executable
    #[must_use]
    pub fn exe_path(&self) -> &Path {
        &self.exe
    }

    /// Path of the backup copy
    #[must_use]
    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// Path of the hash sidecar
    #[must_use]
    pub fn sidecar_path(&self) -> &Path {
        &self.sidecar
    }

    /// Inspect the files without changing anything
    ///
    /// # Errors
    /// Returns an error if the executable or the sidecar cannot be read.
    pub fn state(&self) -> Result<BackupState> {
        if !self.backup.exists() {
            return Ok(BackupState::Missing);
        }
        if !self.sidecar.exists() {
            return Ok(BackupState::Unverified);
        }

        let recorded = fs::read_to_string(&self.sidecar)?;
        if file_hash(&self.exe)? == recorded.trim() {
            Ok(BackupState::Patched)
        } else {
            Ok(BackupState::Updated)
        }
    }

    /// Make sure a backup of the unpatched game exists and the executable is unpatched
    ///
    /// # Errors
    /// Returns an error if a file cannot be read, hashed or copied.
    pub fn prepare(&self) -> Result<BackupAction> {
        if !self.exe.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", self.exe.display()),
            )
            .into());
        }

        let action = match self.state()? {
            BackupState::Missing => {
                fs::copy(&self.exe, &self.backup)?;
                log::info!("Backup created: {}", self.backup.display());
                BackupAction::Created
            }
            BackupState::Unverified => {
                fs::remove_file(&self.backup)?;
                fs::copy(&self.exe, &self.backup)?;
                log::info!("No hash file found, replaced stale backup");
                BackupAction::ReplacedStale
            }
            BackupState::Patched => {
                fs::copy(&self.backup, &self.exe)?;
                log::info!("Restored original from backup");
                BackupAction::RestoredOriginal
            }
            BackupState::Updated => {
                fs::copy(&self.exe, &self.backup)?;
                log::info!("Detected game update, backup replaced with new version");
                BackupAction::ReplacedAfterUpdate
            }
        };

        Ok(action)
    }

    /// Record the hash of the executable as the image we wrote, returning the hash
    ///
    /// # Errors
    /// Returns an error if the executable cannot be hashed or the sidecar not written.
    pub fn record(&self) -> Result<String> {
        let hash = file_hash(&self.exe)?;
        fs::write(&self.sidecar, &hash)?;
        log::debug!("recorded {} in {}", hash, self.sidecar.display());
        Ok(hash)
    }

    /// Copy the backup over the executable and forget the recorded hash
    ///
    /// # Errors
    /// Returns an error if there is no backup or a file operation fails.
    pub fn restore(&self) -> Result<()> {
        if !self.backup.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no backup at {}", self.backup.display()),
            )
            .into());
        }

        fs::copy(&self.backup, &self.exe)?;
        if self.sidecar.exists() {
            fs::remove_file(&self.sidecar)?;
        }
        log::info!("Restored {} from {}", self.exe.display(), self.backup.display());
        Ok(())
    }
}

/// Uppercase hex SHA-256 of the file at `path`
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn file_hash(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect())
}
