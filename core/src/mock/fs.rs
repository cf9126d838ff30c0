use std::collections::{BTreeMap, BTreeSet};
use std::string::{String, ToString};
use std::vec::Vec;

use hal_abstractions::fs::NAME_LEN;
use hal_abstractions::{
    BlockFileSystem, BlockStorage, BoardError, DirCursor, EntryName, FsError, OpenMode,
    SeekFrom,
};

use super::MockFlash;

pub struct MemHandle {
    path: String,
    position: u32,
    writable: bool,
    removed: bool,
}

pub struct MemDir {
    cursor: DirCursor,
}

/// In-memory file system with a sticky error state and fault injection
pub struct MemFs {
    device: MockFlash,
    files: BTreeMap<String, Vec<u8>>,
    formatted: bool,
    mounted: bool,
    error: Option<FsError>,
    open_handles: usize,
    open_dirs: usize,
    /// Number of upcoming `mount` calls that fail
    pub mount_failures: u32,
    /// Make the next `format` fail
    pub fail_format: bool,
    /// Cap on bytes accepted per `write`
    pub write_limit: Option<usize>,
    /// Paths whose removal fails
    pub fail_remove: BTreeSet<String>,
    /// Directory scans that succeed before one fails
    pub scans_before_failure: Option<usize>,
}

impl MemFs {
    /// Never formatted: mounting fails until `format` runs
    pub fn blank() -> Self {
        Self {
            device: MockFlash::new(),
            files: BTreeMap::new(),
            formatted: false,
            mounted: false,
            error: None,
            open_handles: 0,
            open_dirs: 0,
            mount_failures: 0,
            fail_format: false,
            write_limit: None,
            fail_remove: BTreeSet::new(),
            scans_before_failure: None,
        }
    }

    /// Formatted and holding `files`
    pub fn with_files(files: &[(&str, &[u8])]) -> Self {
        let mut fs = Self::blank();
        fs.formatted = true;
        for (name, data) in files {
            fs.files.insert(name.to_string(), data.to_vec());
        }
        fs
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn names(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    /// Handles plus directory cursors still open
    pub fn open_resources(&self) -> usize {
        self.open_handles + self.open_dirs
    }

    /// Latch an error without any call failing
    pub fn inject_error(&mut self, e: FsError) {
        self.error = Some(e);
    }

    fn fail<T>(&mut self, e: FsError) -> Result<T, FsError> {
        self.error = Some(e);
        Err(e)
    }

    fn require_mounted(&mut self) -> Result<(), FsError> {
        if self.mounted {
            Ok(())
        } else {
            self.fail(FsError::NotMounted)
        }
    }

    fn require_live(&mut self, handle: &MemHandle) -> Result<(), FsError> {
        self.require_mounted()?;
        if handle.removed || !self.files.contains_key(&handle.path) {
            return self.fail(FsError::BadHandle);
        }
        Ok(())
    }
}

impl BlockFileSystem for MemFs {
    type Device = MockFlash;
    type Handle = MemHandle;
    type Dir = MemDir;

    fn device(&mut self) -> &mut MockFlash {
        &mut self.device
    }

    fn mount(&mut self) -> Result<(), FsError> {
        self.device.init()?;
        if self.mount_failures > 0 {
            self.mount_failures -= 1;
            return self.fail(FsError::Corrupt);
        }
        if !self.formatted {
            return self.fail(FsError::Corrupt);
        }
        self.mounted = true;
        Ok(())
    }

    fn unmount(&mut self) {
        self.mounted = false;
    }

    fn format(&mut self) -> Result<(), FsError> {
        if self.mounted {
            return self.fail(FsError::Device(BoardError::Busy));
        }
        if core::mem::take(&mut self.fail_format) {
            return self.fail(FsError::Device(BoardError::Timeout));
        }
        self.files.clear();
        self.formatted = true;
        Ok(())
    }

    fn open_dir(&mut self) -> Result<MemDir, FsError> {
        self.require_mounted()?;
        self.open_dirs += 1;
        Ok(MemDir {
            cursor: DirCursor::new(),
        })
    }

    fn next_entry(&mut self, dir: &mut MemDir) -> Option<EntryName> {
        if self.error.is_some() {
            return None;
        }
        match self.scans_before_failure.as_mut() {
            Some(0) => {
                self.error = Some(FsError::Corrupt);
                return None;
            }
            Some(left) => *left -= 1,
            None => {}
        }
        dir.cursor.rewind_scan();
        for name in self.files.keys() {
            dir.cursor.offer(name);
        }
        dir.cursor.advance()
    }

    fn close_dir(&mut self, _dir: MemDir) {
        self.open_dirs -= 1;
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<MemHandle, FsError> {
        self.require_mounted()?;
        if path.len() > NAME_LEN {
            return self.fail(FsError::NameTooLong);
        }
        match self.files.get_mut(path) {
            Some(data) if mode.creates() => data.clear(),
            Some(_) => {}
            None if mode.creates() => {
                self.files.insert(path.to_string(), Vec::new());
            }
            None => return self.fail(FsError::NotFound),
        }
        self.open_handles += 1;
        Ok(MemHandle {
            path: path.to_string(),
            position: 0,
            writable: mode.is_writable(),
            removed: false,
        })
    }

    fn read(&mut self, handle: &mut MemHandle, buf: &mut [u8]) -> Result<usize, FsError> {
        self.require_live(handle)?;
        let data = &self.files[&handle.path];
        let start = (handle.position as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        handle.position += n as u32;
        Ok(n)
    }

    fn write(&mut self, handle: &mut MemHandle, data: &[u8]) -> Result<usize, FsError> {
        self.require_live(handle)?;
        if !handle.writable {
            return self.fail(FsError::BadHandle);
        }
        let n = self.write_limit.unwrap_or(data.len()).min(data.len());
        let file = self.files.get_mut(&handle.path).ok_or(FsError::BadHandle)?;
        let start = handle.position as usize;
        if file.len() < start + n {
            file.resize(start + n, 0);
        }
        file[start..start + n].copy_from_slice(&data[..n]);
        handle.position += n as u32;
        Ok(n)
    }

    fn seek(&mut self, handle: &mut MemHandle, pos: SeekFrom) -> Result<u32, FsError> {
        self.require_live(handle)?;
        let len = self.files[&handle.path].len() as u32;
        match pos.resolve(handle.position, len) {
            Some(target) => {
                handle.position = target;
                Ok(target)
            }
            None => self.fail(FsError::Device(BoardError::BadParameter)),
        }
    }

    fn remove_open(&mut self, handle: &mut MemHandle) -> Result<(), FsError> {
        self.require_live(handle)?;
        if self.fail_remove.contains(&handle.path) {
            return self.fail(FsError::Device(BoardError::Recoverable));
        }
        self.files.remove(&handle.path);
        handle.removed = true;
        Ok(())
    }

    fn close(&mut self, _handle: MemHandle) {
        self.open_handles -= 1;
    }

    fn remove(&mut self, path: &str) -> Result<(), FsError> {
        self.require_mounted()?;
        if self.fail_remove.contains(path) {
            return self.fail(FsError::Device(BoardError::Recoverable));
        }
        match self.files.remove(path) {
            Some(_) => Ok(()),
            None => self.fail(FsError::NotFound),
        }
    }

    fn last_error(&self) -> Option<FsError> {
        self.error
    }

    fn clear_error(&mut self) {
        self.error = None;
    }
}
