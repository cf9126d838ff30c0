//! Scoped file handle

use hal_abstractions::{BlockFileSystem, FsError, OpenMode, SeekFrom};

/// Open file that is closed when dropped, error paths included
pub struct OpenFile<'a, F: BlockFileSystem> {
    fs: &'a mut F,
    handle: Option<F::Handle>,
}

impl<'a, F: BlockFileSystem> OpenFile<'a, F> {
    pub fn open(fs: &'a mut F, path: &str, mode: OpenMode) -> Result<Self, FsError> {
        let handle = fs.open(path, mode)?;
        Ok(Self {
            fs,
            handle: Some(handle),
        })
    }

    fn parts(&mut self) -> Result<(&mut F, &mut F::Handle), FsError> {
        let handle = self.handle.as_mut().ok_or(FsError::BadHandle)?;
        Ok((&mut *self.fs, handle))
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        let (fs, handle) = self.parts()?;
        fs.read(handle, buf)
    }

    /// Write all of `data`; a short write is an error, never a silent truncation
    pub fn write_all(&mut self, data: &[u8]) -> Result<(), FsError> {
        let (fs, handle) = self.parts()?;
        let written = fs.write(handle, data)?;
        if written != data.len() {
            return Err(FsError::SizeMismatch {
                expected: data.len(),
                actual: written,
            });
        }
        Ok(())
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u32, FsError> {
        let (fs, handle) = self.parts()?;
        fs.seek(handle, pos)
    }

    /// Bytes between the current position and the end of the file
    pub fn remaining(&mut self) -> Result<u32, FsError> {
        let current = self.seek(SeekFrom::Current(0))?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(current))?;
        Ok(end.saturating_sub(current))
    }

    /// Remove the file; the handle is still closed on drop
    pub fn remove(&mut self) -> Result<(), FsError> {
        let (fs, handle) = self.parts()?;
        fs.remove_open(handle)
    }
}

impl<F: BlockFileSystem> Drop for OpenFile<'_, F> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.fs.close(handle);
        }
    }
}
