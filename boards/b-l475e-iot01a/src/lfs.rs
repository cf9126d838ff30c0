//! littlefs binding for the file store
//!
//! [`LfsStorage`] exposes a [`BlockStorage`] device to littlefs, and
//! [`LittleFs`] implements [`BlockFileSystem`] on top of it. littlefs keeps
//! no state between calls here: every operation mounts, runs and unmounts,
//! so open handles are plain path and position records.

use defmt::{debug, warn};
use hal_abstractions::fs::NAME_LEN;
use hal_abstractions::{
    BlockFileSystem, BlockStorage, BoardError, DirCursor, EntryName, FsError, OpenMode,
    SeekFrom,
};
use iot_core::config::StorageLayout;
use littlefs2::consts::{U1, U256};
use littlefs2::driver::Storage;
use littlefs2::fs::Filesystem;
use littlefs2::io::{self, prelude::*};
use littlefs2::path::PathBuf;

/// Adapter from a raw flash device to the littlefs driver interface
pub struct LfsStorage<D> {
    device: D,
}

impl<D: BlockStorage> Storage for LfsStorage<D> {
    const READ_SIZE: usize = 1;
    const WRITE_SIZE: usize = 1;
    const BLOCK_SIZE: usize = D::GEOMETRY.sector_size as usize;
    const BLOCK_COUNT: usize = D::GEOMETRY.sector_count() as usize;
    const BLOCK_CYCLES: isize = 500;

    // must match StorageLayout::LOG_PAGE_SIZE
    type CACHE_SIZE = U256;
    type LOOKAHEAD_SIZE = U1;

    fn read(&mut self, off: usize, buf: &mut [u8]) -> io::Result<usize> {
        self.device.read(off as u32, buf).map_err(device_error)?;
        Ok(buf.len())
    }

    fn write(&mut self, off: usize, data: &[u8]) -> io::Result<usize> {
        self.device.write(off as u32, data).map_err(device_error)?;
        Ok(data.len())
    }

    fn erase(&mut self, off: usize, len: usize) -> io::Result<usize> {
        let sector = D::GEOMETRY.sector_size as usize;
        for addr in (off..off + len).step_by(sector) {
            self.device.erase_block(addr as u32).map_err(device_error)?;
        }
        Ok(len)
    }
}

fn device_error(e: BoardError) -> io::Error {
    warn!("Flash access failed: {}", e);
    io::Error::Io
}

fn fs_error(e: io::Error) -> FsError {
    match e {
        io::Error::NoSuchEntry => FsError::NotFound,
        io::Error::Corruption => FsError::Corrupt,
        io::Error::NoSpace => FsError::NoSpace,
        io::Error::FilenameTooLong => FsError::NameTooLong,
        io::Error::BadFileDescriptor => FsError::BadHandle,
        _ => FsError::Device(BoardError::Recoverable),
    }
}

fn path_of(name: &str) -> Result<PathBuf, FsError> {
    if name.is_empty() || name.len() > NAME_LEN || name.contains('\0') {
        return Err(FsError::NameTooLong);
    }
    Ok(PathBuf::from(name))
}

pub struct LfsHandle {
    path: PathBuf,
    mode: OpenMode,
    position: u32,
}

/// Directory position; each step rescans the root directory
pub struct LfsDir {
    cursor: DirCursor,
}

/// File system on the external flash
pub struct LittleFs<D> {
    storage: LfsStorage<D>,
    mounted: bool,
    last_error: Option<FsError>,
}

impl<D: BlockStorage> LittleFs<D> {
    pub fn new(device: D) -> Self {
        debug!(
            "littlefs: {} blocks of {} bytes, {} byte cache",
            LfsStorage::<D>::BLOCK_COUNT,
            LfsStorage::<D>::BLOCK_SIZE,
            StorageLayout::LOG_PAGE_SIZE
        );
        Self {
            storage: LfsStorage { device },
            mounted: false,
            last_error: None,
        }
    }

    /// Record a failure as the sticky error
    fn track<T>(&mut self, result: Result<T, FsError>) -> Result<T, FsError> {
        if let Err(e) = &result {
            self.last_error = Some(*e);
        }
        result
    }

    fn with_fs<R>(
        &mut self,
        f: impl FnOnce(&Filesystem<'_, LfsStorage<D>>) -> io::Result<R>,
    ) -> Result<R, FsError> {
        if !self.mounted {
            return self.track(Err(FsError::NotMounted));
        }
        let result = Filesystem::mount_and_then(&mut self.storage, f).map_err(fs_error);
        self.track(result)
    }
}

impl<D: BlockStorage> BlockFileSystem for LittleFs<D> {
    type Device = D;
    type Handle = LfsHandle;
    type Dir = LfsDir;

    fn device(&mut self) -> &mut D {
        &mut self.storage.device
    }

    fn mount(&mut self) -> Result<(), FsError> {
        if self.mounted {
            return Ok(());
        }
        if let Err(e) = self.storage.device.init() {
            return self.track(Err(e.into()));
        }
        if !Filesystem::is_mountable(&mut self.storage) {
            return self.track(Err(FsError::Corrupt));
        }
        self.mounted = true;
        Ok(())
    }

    fn unmount(&mut self) {
        self.mounted = false;
    }

    fn format(&mut self) -> Result<(), FsError> {
        self.mounted = false;
        if let Err(e) = self.storage.device.init() {
            return self.track(Err(e.into()));
        }
        let result = Filesystem::format(&mut self.storage).map_err(fs_error);
        self.track(result)
    }

    fn open_dir(&mut self) -> Result<LfsDir, FsError> {
        self.with_fs(|fs| fs.read_dir_and_then(&PathBuf::from("/"), |_| Ok(())))?;
        Ok(LfsDir {
            cursor: DirCursor::new(),
        })
    }

    fn next_entry(&mut self, dir: &mut LfsDir) -> Option<EntryName> {
        if self.last_error.is_some() {
            return None;
        }
        let cursor = &mut dir.cursor;
        cursor.rewind_scan();
        self.with_fs(|fs| {
            fs.read_dir_and_then(&PathBuf::from("/"), |entries| {
                for entry in entries {
                    let entry = entry?;
                    let name: &str = entry.file_name().as_ref();
                    cursor.offer(name);
                }
                Ok(())
            })
        })
        .ok()?;
        cursor.advance()
    }

    fn close_dir(&mut self, dir: LfsDir) {
        if dir.cursor.skipped() > 0 {
            warn!("{} entries with over-long names skipped", dir.cursor.skipped());
        }
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<LfsHandle, FsError> {
        let path = self.track(path_of(path))?;
        self.with_fs(|fs| {
            fs.open_file_with_options_and_then(
                |o| {
                    o.read(true)
                        .write(mode.is_writable())
                        .create(mode.creates())
                        .truncate(mode.creates())
                },
                &path,
                |_| Ok(()),
            )
        })?;
        Ok(LfsHandle {
            path,
            mode,
            position: 0,
        })
    }

    fn read(&mut self, handle: &mut LfsHandle, buf: &mut [u8]) -> Result<usize, FsError> {
        let position = handle.position;
        let n = self.with_fs(|fs| {
            fs.open_file_and_then(&handle.path, |file| {
                file.seek(io::SeekFrom::Start(position))?;
                file.read(buf)
            })
        })?;
        handle.position += n as u32;
        Ok(n)
    }

    fn write(&mut self, handle: &mut LfsHandle, data: &[u8]) -> Result<usize, FsError> {
        if !handle.mode.is_writable() {
            return self.track(Err(FsError::BadHandle));
        }
        let position = handle.position;
        let n = self.with_fs(|fs| {
            fs.open_file_with_options_and_then(
                |o| o.read(true).write(true),
                &handle.path,
                |file| {
                    file.seek(io::SeekFrom::Start(position))?;
                    file.write(data)
                },
            )
        })?;
        handle.position += n as u32;
        Ok(n)
    }

    fn seek(&mut self, handle: &mut LfsHandle, pos: SeekFrom) -> Result<u32, FsError> {
        let len = self.with_fs(|fs| fs.open_file_and_then(&handle.path, |file| file.len()))?;
        let target = pos
            .resolve(handle.position, len as u32)
            .ok_or(FsError::BadHandle);
        handle.position = self.track(target)?;
        Ok(handle.position)
    }

    fn remove_open(&mut self, handle: &mut LfsHandle) -> Result<(), FsError> {
        self.with_fs(|fs| fs.remove(&handle.path))
    }

    fn close(&mut self, _handle: LfsHandle) {}

    fn remove(&mut self, path: &str) -> Result<(), FsError> {
        let path = self.track(path_of(path))?;
        self.with_fs(|fs| fs.remove(&path))
    }

    fn last_error(&self) -> Option<FsError> {
        self.last_error
    }

    fn clear_error(&mut self) {
        self.last_error = None;
    }
}
