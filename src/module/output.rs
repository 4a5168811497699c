//! Atomic, memory-mapped output files.
//!
//! The image is written to a temporary sibling of the target (same directory, so the final
//! rename stays on one filesystem) and only renamed over the target by
//! [`Output::finalize`]. An [`Output`] that is dropped before it was finalized removes its
//! temporary file, leaving the target untouched.

use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
};

use memmap2::{MmapMut, MmapOptions};

use crate::{Error::SerializationFailed, Result};

/// A memory-mapped temporary file that replaces its target on finalization.
pub struct Output {
    mmap: Option<MmapMut>,
    temp_path: PathBuf,
    target_path: PathBuf,
    finalized: bool,
}

impl Output {
    /// Create a temporary file of `size` bytes next to `target_path` and map it.
    ///
    /// # Errors
    /// Returns an error if the target has no file name, `size` is 0, or the temporary file
    /// cannot be created or mapped.
    pub fn create<P: AsRef<Path>>(target_path: P, size: usize) -> Result<Output> {
        let target_path = target_path.as_ref().to_path_buf();
        let Some(file_name) = target_path.file_name() else {
            return Err(SerializationFailed(format!(
                "{} is not a file path",
                target_path.display()
            )));
        };
        if size == 0 {
            return Err(SerializationFailed("refusing to write an empty image".to_string()));
        }

        let mut temp_name = file_name.to_os_string();
        temp_name.push(".tmp");
        let temp_path = target_path.with_file_name(temp_name);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;

        let mut output = Output {
            mmap: None,
            temp_path,
            target_path,
            finalized: false,
        };

        file.set_len(size as u64)?;
        // SAFETY: the temporary file was just created by us and is not shared
        let mmap = unsafe { MmapOptions::new().map_mut(&file)? };
        output.mmap = Some(mmap);

        Ok(output)
    }

    /// The mapped contents
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self.mmap.as_mut() {
            Some(mmap) => &mut mmap[..],
            None => &mut [],
        }
    }

    /// Copy `data` to `offset`
    ///
    /// # Errors
    /// Returns an error if the write would exceed the file.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let slice = self.as_mut_slice();
        let len = slice.len();
        let target = offset
            .checked_add(data.len())
            .and_then(|end| slice.get_mut(offset..end))
            .ok_or_else(|| {
                SerializationFailed(format!(
                    "write of {} bytes at {} exceeds the output size {}",
                    data.len(),
                    offset,
                    len
                ))
            })?;

        target.copy_from_slice(data);
        Ok(())
    }

    /// The path that [`Output::finalize`] replaces
    #[must_use]
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Flush the mapping and rename the temporary file over the target.
    ///
    /// # Errors
    /// Returns an error if flushing or renaming fails. The temporary file is removed.
    pub fn finalize(mut self) -> Result<()> {
        if let Some(mmap) = self.mmap.take() {
            mmap.flush()?;
        }

        std::fs::rename(&self.temp_path, &self.target_path)?;
        self.finalized = true;
        Ok(())
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        if !self.finalized {
            self.mmap = None;
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}
