//! File system interface over block storage
//!
//! The on-flash layout belongs to the implementation. This trait only fixes
//! the contract the lifecycle manager relies on:
//!
//! - `open` of an absent path in [`OpenMode::ReadOnly`] fails with
//!   [`FsError::NotFound`]
//! - `remove` of an absent path fails with [`FsError::NotFound`]
//! - `write` reports the number of bytes actually written; callers compare it
//!   against the request
//! - failing calls also latch the error into a sticky error state (see
//!   [`BlockFileSystem::last_error`]), and directory iteration stops while it
//!   is set; a caller that sees `next_entry` return `None` checks
//!   `last_error` to tell the end of the directory from a failure
//! - removing the entry just returned by `next_entry` must not make the
//!   iteration skip or repeat other entries

use heapless::String;

use crate::error::FsError;
use crate::storage::BlockStorage;

/// Maximum object name length, terminator excluded
pub const NAME_LEN: usize = 31;

/// Name of a directory entry
pub type EntryName = String<NAME_LEN>;

/// Access mode for [`BlockFileSystem::open`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpenMode {
    /// Read an existing file
    ReadOnly,
    /// Read and write an existing file
    ReadWrite,
    /// Read and write, creating the file when absent and emptying it otherwise
    CreateTruncate,
}

impl OpenMode {
    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::ReadOnly)
    }

    /// Create when absent, truncate when present
    pub fn creates(&self) -> bool {
        matches!(self, Self::CreateTruncate)
    }
}

/// Seek origin, mirroring `SEEK_SET`/`SEEK_CUR`/`SEEK_END`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SeekFrom {
    Start(u32),
    Current(i32),
    End(i32),
}

impl SeekFrom {
    /// Resolve to an absolute offset given the current position and length
    pub fn resolve(self, position: u32, len: u32) -> Option<u32> {
        let target = match self {
            Self::Start(offset) => offset as i64,
            Self::Current(delta) => position as i64 + delta as i64,
            Self::End(delta) => len as i64 + delta as i64,
        };
        u32::try_from(target).ok()
    }
}

/// Directory position kept as the last name handed out
///
/// For file systems that cannot hold a directory open between calls: each
/// step rescans the whole directory through [`offer`](Self::offer) and
/// [`advance`](Self::advance) picks the smallest name after the previous
/// one. The order is independent of the on-flash order, so entries removed
/// or added behind the cursor never shift it. Names longer than
/// [`NAME_LEN`] cannot be represented and are counted instead.
#[derive(Debug, Clone, Default)]
pub struct DirCursor {
    last: Option<EntryName>,
    best: Option<EntryName>,
    skipped: usize,
}

impl DirCursor {
    pub const fn new() -> Self {
        Self {
            last: None,
            best: None,
            skipped: 0,
        }
    }

    /// Start a rescan
    pub fn rewind_scan(&mut self) {
        self.best = None;
        self.skipped = 0;
    }

    /// Feed one name of the current rescan
    pub fn offer(&mut self, name: &str) {
        if name.is_empty() || name == "." || name == ".." {
            return;
        }
        if name.len() > NAME_LEN {
            self.skipped += 1;
            return;
        }
        if self.last.as_deref().is_some_and(|last| name <= last) {
            return;
        }
        if self.best.as_deref().is_some_and(|best| name >= best) {
            return;
        }
        self.best = EntryName::try_from(name).ok();
    }

    /// Finish the rescan and move past the chosen name
    pub fn advance(&mut self) -> Option<EntryName> {
        let next = self.best.take()?;
        self.last = Some(next.clone());
        Some(next)
    }

    /// Over-long names seen by the latest rescan
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// File system bound to a block device
pub trait BlockFileSystem {
    /// Backing block device
    type Device: BlockStorage;
    /// Open file; must be handed back to [`close`](Self::close)
    type Handle;
    /// Directory cursor; must be handed back to [`close_dir`](Self::close_dir)
    type Dir;

    /// Access to the backing device (used for destructive recovery)
    fn device(&mut self) -> &mut Self::Device;

    /// Bring the existing on-flash structure online
    fn mount(&mut self) -> Result<(), FsError>;

    /// Take the file system offline; a no-op when not mounted
    fn unmount(&mut self);

    /// Write an empty file system; must be unmounted
    fn format(&mut self) -> Result<(), FsError>;

    /// Start iterating the root directory
    fn open_dir(&mut self) -> Result<Self::Dir, FsError>;

    /// Next entry name, `None` at the end or while the error state is set
    fn next_entry(&mut self, dir: &mut Self::Dir) -> Option<EntryName>;

    fn close_dir(&mut self, dir: Self::Dir);

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::Handle, FsError>;

    fn read(&mut self, handle: &mut Self::Handle, buf: &mut [u8]) -> Result<usize, FsError>;

    fn write(&mut self, handle: &mut Self::Handle, data: &[u8]) -> Result<usize, FsError>;

    /// Move the file position; returns the new absolute offset
    fn seek(&mut self, handle: &mut Self::Handle, pos: SeekFrom) -> Result<u32, FsError>;

    /// Remove the file behind an open handle (the handle still needs closing)
    fn remove_open(&mut self, handle: &mut Self::Handle) -> Result<(), FsError>;

    fn close(&mut self, handle: Self::Handle);

    fn remove(&mut self, path: &str) -> Result<(), FsError>;

    /// Sticky error left by the last failing call
    fn last_error(&self) -> Option<FsError>;

    fn clear_error(&mut self);

    /// Lazily iterate the root directory
    ///
    /// The cursor is closed when the iterator is dropped.
    fn entries(&mut self) -> Result<Entries<'_, Self>, FsError>
    where
        Self: Sized,
    {
        let dir = self.open_dir()?;
        Ok(Entries {
            fs: self,
            dir: Some(dir),
        })
    }
}

/// Iterator over directory entry names
pub struct Entries<'a, F: BlockFileSystem> {
    fs: &'a mut F,
    dir: Option<F::Dir>,
}

impl<F: BlockFileSystem> Iterator for Entries<'_, F> {
    type Item = EntryName;

    fn next(&mut self) -> Option<Self::Item> {
        let dir = self.dir.as_mut()?;
        self.fs.next_entry(dir)
    }
}

impl<F: BlockFileSystem> Drop for Entries<'_, F> {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            self.fs.close_dir(dir);
        }
    }
}
