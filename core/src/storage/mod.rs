//! Flash file store lifecycle
//!
//! ```text
//!             mount ok
//! Unmounted ───────────► Mounted ◄──┐
//!     │                     │       │ format + mount ok
//!     │ mount fails         │       │
//!     ▼                     ▼       │
//!  Corrupt ◄───────── format + mount fails
//!     │
//!     │ wipe (operator consent)
//!     ▼
//!   Wiped  (terminal until restart)
//! ```
//!
//! A failed mount never triggers a wipe on its own, and a failed re-mount
//! after format only reports. Wipe is accepted from any state: the
//! [`WipeConsent`] token is its only guard, and at boot it is only asked for
//! after a failed mount.

mod file;
mod recovery;

pub use file::OpenFile;
pub use recovery::{await_wipe_consent, wipe_with_consent, WipeConsent};

use hal_abstractions::{BlockFileSystem, BlockStorage, EntryName, OpenMode};

use crate::error::StorageError;

/// Lifecycle state of the file store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageState {
    #[default]
    Unmounted,
    Mounted,
    Corrupt,
    Wiped,
}

/// Result of a batch prefix delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeleteReport {
    pub matched: usize,
    pub removed: usize,
    pub failed: usize,
}

impl core::fmt::Display for DeleteReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Deleted {} of {} files", self.removed, self.matched)
    }
}

/// Result of a file read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadReport {
    pub read: usize,
    /// Bytes left unread after the read
    pub remaining: u32,
}

impl core::fmt::Display for ReadReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Read {} bytes, {} unread", self.read, self.remaining)
    }
}

/// Owns the file system and tracks its lifecycle
pub struct StorageManager<F> {
    fs: F,
    state: StorageState,
}

impl<F: BlockFileSystem> StorageManager<F> {
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            state: StorageState::Unmounted,
        }
    }

    pub fn state(&self) -> StorageState {
        self.state
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn fs_mut(&mut self) -> &mut F {
        &mut self.fs
    }

    fn ensure_mounted(&self) -> Result<(), StorageError> {
        match self.state {
            StorageState::Mounted => Ok(()),
            StorageState::Unmounted => Err(StorageError::NotMounted),
            StorageState::Corrupt => Err(StorageError::Corrupt),
            StorageState::Wiped => Err(StorageError::Wiped),
        }
    }

    /// Bring the existing on-flash structure online
    ///
    /// Failure leaves the store [`StorageState::Corrupt`]; recovery is up to
    /// the caller.
    pub fn mount(&mut self) -> Result<(), StorageError> {
        match self.state {
            StorageState::Wiped => return Err(StorageError::Wiped),
            StorageState::Mounted => return Ok(()),
            _ => {}
        }

        self.fs.clear_error();
        match self.fs.mount() {
            Ok(()) => {
                self.state = StorageState::Mounted;
                info!("File system mounted");
                Ok(())
            }
            Err(e) => {
                self.state = StorageState::Corrupt;
                error!("Mount failed: {}", e);
                Err(StorageError::Corrupt)
            }
        }
    }

    /// Unmount, format and mount again
    ///
    /// The mount is attempted even when the format fails. The result is `Ok`
    /// only when both succeed; a failed mount reports
    /// [`StorageError::Corrupt`] and goes no further.
    pub fn format(&mut self) -> Result<(), StorageError> {
        if self.state == StorageState::Wiped {
            return Err(StorageError::Wiped);
        }

        self.fs.unmount();
        self.state = StorageState::Unmounted;

        let formatted = self.fs.format();
        if let Err(e) = formatted {
            warn!("Format failed: {}", e);
        }

        match (formatted, self.mount()) {
            (_, Err(e)) => {
                error!("Restart the board as mounting failed");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e.into()),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    /// Chip-erase the backing device
    ///
    /// Allowed in every state, a mounted store included; holding a
    /// [`WipeConsent`] is the precondition. The device is released after the
    /// erase and nothing is re-mounted; the store stays [`StorageState::Wiped`]
    /// for the rest of the session.
    pub fn wipe(&mut self, consent: WipeConsent) -> Result<(), StorageError> {
        debug!("Wipe confirmed with key {}", consent.key());

        self.fs.unmount();
        let device = self.fs.device();
        device.init()?;
        device.erase_all()?;

        self.state = StorageState::Wiped;
        if let Err(e) = device.deinit() {
            warn!("Flash release failed: {}", e);
        }
        Ok(())
    }

    /// Visit every entry of the root directory
    ///
    /// Returns the number of entries seen, or the error that cut the listing
    /// short.
    pub fn list_files(&mut self, mut visit: impl FnMut(&EntryName)) -> Result<usize, StorageError> {
        self.ensure_mounted()?;
        self.fs.clear_error();

        let mut count = 0;
        for name in self.fs.entries()? {
            debug!("- {=str}", name.as_str());
            visit(&name);
            count += 1;
        }
        match self.fs.last_error() {
            Some(e) => Err(e.into()),
            None => Ok(count),
        }
    }

    /// Remove every file whose name starts with `prefix` (all files for `None`)
    ///
    /// Each match is opened, removed and closed on its own. A failing entry is
    /// counted and skipped; the error state is cleared so the iteration goes on.
    pub fn delete_prefixed(&mut self, prefix: Option<&str>) -> Result<DeleteReport, StorageError> {
        self.ensure_mounted()?;
        self.fs.clear_error();

        let mut report = DeleteReport::default();
        let mut dir = self.fs.open_dir()?;

        while let Some(name) = self.fs.next_entry(&mut dir) {
            if !prefix.map_or(true, |p| name.starts_with(p)) {
                continue;
            }
            report.matched += 1;

            let removed = OpenFile::open(&mut self.fs, &name, OpenMode::ReadWrite)
                .and_then(|mut file| file.remove());
            match removed {
                Ok(()) => {
                    report.removed += 1;
                    debug!("- {=str} deleted", name.as_str());
                }
                Err(e) => {
                    report.failed += 1;
                    warn!("- {=str} not deleted: {}", name.as_str(), e);
                }
            }

            self.fs.clear_error();
        }

        self.fs.close_dir(dir);
        match self.fs.last_error() {
            Some(e) => {
                warn!("Directory scan stopped: {}", e);
                Err(e.into())
            }
            None => Ok(report),
        }
    }

    /// Create or overwrite `path` with exactly `data`
    ///
    /// An existing file is truncated first, so nothing of a longer previous
    /// content survives.
    pub fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        self.ensure_mounted()?;
        self.fs.clear_error();

        let mut file = OpenFile::open(&mut self.fs, path, OpenMode::CreateTruncate)?;
        file.write_all(data)?;
        Ok(())
    }

    /// Read the start of `path` into `buf`
    pub fn read_file(&mut self, path: &str, buf: &mut [u8]) -> Result<ReadReport, StorageError> {
        self.ensure_mounted()?;
        self.fs.clear_error();

        let mut file = OpenFile::open(&mut self.fs, path, OpenMode::ReadOnly)?;
        let read = file.read(buf)?;
        let remaining = file.remaining()?;
        Ok(ReadReport { read, remaining })
    }

    pub fn remove_file(&mut self, path: &str) -> Result<(), StorageError> {
        self.ensure_mounted()?;
        self.fs.clear_error();

        self.fs.remove(path)?;
        Ok(())
    }
}
