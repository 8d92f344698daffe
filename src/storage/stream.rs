//! # Paged Stream Implementations
//!
//! The directory engine performs all of its I/O through the [`PagedStream`]
//! trait: block-aligned reads and writes against a resizable byte stream.
//! In a mounted filesystem the stream handed to the engine is the encrypted
//! sparse stream of the directory's backing file, so nothing in this module
//! assumes it can see plaintext layout beyond what the engine itself wrote.
//!
//! Two implementations are provided:
//!
//! - [`FileStream`]: memory-mapped file access. Reads and writes are plain
//!   `memcpy` against the mapping; `resize` remaps. Used directly when the
//!   encryption layer sits below the file (block-device style setups) and
//!   in the integration tests.
//! - [`MemoryStream`]: a `Vec<u8>` backing. Used by unit tests and by
//!   embedders that keep directories in memory.
//!
//! ## Safety Model for `FileStream`
//!
//! Memory-mapped regions become invalid when the file is resized and
//! remapped. `resize` takes `&mut self` and every read/write goes through
//! `&self`/`&mut self` accessors, so the borrow checker rules out holding
//! a view across a remap. The engine copies whole blocks in and out rather
//! than borrowing from the mapping, which keeps the trait object-safe for
//! non-mmap backings.
//!
//! ## Size Discipline
//!
//! The stream length is always a multiple of [`BLOCK_SIZE`]; `FileStream`
//! refuses to open a file that is not. Reads past the end return short
//! counts rather than erroring; the engine treats a short read of a page it
//! believes exists as corruption.

use std::fs::{File, OpenOptions};
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use memmap2::MmapMut;

use crate::config::BLOCK_SIZE;

/// Block-aligned I/O over a resizable byte stream.
///
/// Offsets and lengths used by the engine are always multiples of
/// [`BLOCK_SIZE`]; implementations may rely on that but are not required to
/// enforce it.
pub trait PagedStream {
    /// Reads up to `buf.len()` bytes at `offset`, returning how many were
    /// available. A short count means the stream ends inside the requested
    /// range.
    fn read(&self, buf: &mut [u8], offset: u64) -> Result<usize>;

    /// Writes `buf` at `offset`. The range must lie within the current
    /// stream size; the engine resizes before writing fresh pages.
    fn write(&mut self, buf: &[u8], offset: u64) -> Result<()>;

    /// Current stream length in bytes.
    fn size(&self) -> u64;

    /// Grows or shrinks the stream. New bytes read as zero.
    fn resize(&mut self, new_size: u64) -> Result<()>;

    /// Pushes buffered writes to the OS.
    fn flush(&mut self) -> Result<()>;

    /// Durably persists the stream.
    fn fsync(&self) -> Result<()>;
}

/// Memory-mapped file stream.
#[derive(Debug)]
pub struct FileStream {
    file: File,
    mmap: Option<MmapMut>,
    len: u64,
}

impl FileStream {
    /// Creates a new empty stream, truncating any existing file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .wrap_err_with(|| format!("failed to create directory stream '{}'", path.display()))?;

        Ok(Self {
            file,
            mmap: None,
            len: 0,
        })
    }

    /// Opens an existing stream. The file length must be block-aligned.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .wrap_err_with(|| format!("failed to open directory stream '{}'", path.display()))?;

        let len = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat '{}'", path.display()))?
            .len();

        ensure!(
            len % BLOCK_SIZE as u64 == 0,
            "directory stream '{}' length {} is not a multiple of block size {}",
            path.display(),
            len,
            BLOCK_SIZE
        );

        let mut stream = Self {
            file,
            mmap: None,
            len,
        };
        stream.remap()?;
        Ok(stream)
    }

    fn remap(&mut self) -> Result<()> {
        self.mmap = if self.len == 0 {
            None
        } else {
            // SAFETY: MmapMut::map_mut is unsafe because externally modified
            // files lead to undefined behavior. The stream file is owned
            // exclusively by this directory instance for the lifetime of the
            // mapping, every access is bounds-checked against `len`, and the
            // mapping is dropped before any resize of the file.
            Some(unsafe {
                MmapMut::map_mut(&self.file).wrap_err("failed to map directory stream")?
            })
        };
        Ok(())
    }
}

impl PagedStream for FileStream {
    fn read(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        if offset >= self.len {
            return Ok(0);
        }
        let available = (self.len - offset) as usize;
        let n = buf.len().min(available);
        let Some(mmap) = &self.mmap else {
            return Ok(0);
        };
        let start = offset as usize;
        buf[..n].copy_from_slice(&mmap[start..start + n]);
        Ok(n)
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        ensure!(
            offset + buf.len() as u64 <= self.len,
            "write of {} bytes at offset {} past stream end {}",
            buf.len(),
            offset,
            self.len
        );
        let Some(mmap) = &mut self.mmap else {
            ensure!(buf.is_empty(), "write into empty stream");
            return Ok(());
        };
        let start = offset as usize;
        mmap[start..start + buf.len()].copy_from_slice(buf);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.len
    }

    fn resize(&mut self, new_size: u64) -> Result<()> {
        if new_size == self.len {
            return Ok(());
        }

        // Drop the mapping before the file changes length; a mapping larger
        // than the file would fault on access.
        if let Some(mmap) = self.mmap.take() {
            mmap.flush().wrap_err("failed to flush mapping before resize")?;
        }

        self.file
            .set_len(new_size)
            .wrap_err_with(|| format!("failed to resize directory stream to {} bytes", new_size))?;

        self.len = new_size;
        self.remap()
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(mmap) = &self.mmap {
            mmap.flush().wrap_err("failed to flush directory stream")?;
        }
        Ok(())
    }

    fn fsync(&self) -> Result<()> {
        self.file
            .sync_all()
            .wrap_err("failed to fsync directory stream")
    }
}

/// Heap-backed stream.
#[derive(Debug, Default)]
pub struct MemoryStream {
    data: Vec<u8>,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PagedStream for MemoryStream {
    fn read(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        if offset >= self.data.len() as u64 {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        ensure!(
            offset + buf.len() as u64 <= self.data.len() as u64,
            "write of {} bytes at offset {} past stream end {}",
            buf.len(),
            offset,
            self.data.len()
        );
        let start = offset as usize;
        self.data[start..start + buf.len()].copy_from_slice(buf);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn resize(&mut self, new_size: u64) -> Result<()> {
        self.data.resize(new_size as usize, 0);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn fsync(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_stream_reads_back_writes() {
        let mut stream = MemoryStream::new();
        stream.resize(2 * BLOCK_SIZE as u64).unwrap();

        let block = vec![0xABu8; BLOCK_SIZE];
        stream.write(&block, BLOCK_SIZE as u64).unwrap();

        let mut out = vec![0u8; BLOCK_SIZE];
        let n = stream.read(&mut out, BLOCK_SIZE as u64).unwrap();
        assert_eq!(n, BLOCK_SIZE);
        assert_eq!(out, block);
    }

    #[test]
    fn memory_stream_short_read_at_end() {
        let mut stream = MemoryStream::new();
        stream.resize(BLOCK_SIZE as u64).unwrap();

        let mut out = vec![0u8; BLOCK_SIZE];
        assert_eq!(stream.read(&mut out, BLOCK_SIZE as u64).unwrap(), 0);
        assert_eq!(
            stream.read(&mut out, BLOCK_SIZE as u64 / 2).unwrap(),
            BLOCK_SIZE / 2
        );
    }

    #[test]
    fn memory_stream_rejects_write_past_end() {
        let mut stream = MemoryStream::new();
        stream.resize(BLOCK_SIZE as u64).unwrap();

        let block = vec![0u8; BLOCK_SIZE];
        assert!(stream.write(&block, 1).is_err());
    }

    #[test]
    fn memory_stream_shrink_discards_tail() {
        let mut stream = MemoryStream::new();
        stream.resize(2 * BLOCK_SIZE as u64).unwrap();
        let block = vec![0xCDu8; BLOCK_SIZE];
        stream.write(&block, BLOCK_SIZE as u64).unwrap();

        stream.resize(BLOCK_SIZE as u64).unwrap();
        stream.resize(2 * BLOCK_SIZE as u64).unwrap();

        let mut out = vec![0xFFu8; BLOCK_SIZE];
        stream.read(&mut out, BLOCK_SIZE as u64).unwrap();
        assert!(out.iter().all(|&b| b == 0), "regrown pages must read zero");
    }

    #[test]
    fn file_stream_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dir.stream");

        {
            let mut stream = FileStream::create(&path).unwrap();
            stream.resize(BLOCK_SIZE as u64).unwrap();
            let block = vec![0x5Au8; BLOCK_SIZE];
            stream.write(&block, 0).unwrap();
            stream.flush().unwrap();
            stream.fsync().unwrap();
        }

        let stream = FileStream::open(&path).unwrap();
        assert_eq!(stream.size(), BLOCK_SIZE as u64);
        let mut out = vec![0u8; BLOCK_SIZE];
        assert_eq!(stream.read(&mut out, 0).unwrap(), BLOCK_SIZE);
        assert!(out.iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn file_stream_grows_and_shrinks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dir.stream");

        let mut stream = FileStream::create(&path).unwrap();
        assert_eq!(stream.size(), 0);

        stream.resize(3 * BLOCK_SIZE as u64).unwrap();
        assert_eq!(stream.size(), 3 * BLOCK_SIZE as u64);

        stream.resize(BLOCK_SIZE as u64).unwrap();
        assert_eq!(stream.size(), BLOCK_SIZE as u64);

        let mut out = vec![0u8; BLOCK_SIZE];
        assert_eq!(stream.read(&mut out, BLOCK_SIZE as u64).unwrap(), 0);
    }

    #[test]
    fn file_stream_rejects_unaligned_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dir.stream");
        std::fs::write(&path, vec![0u8; BLOCK_SIZE + 1]).unwrap();

        assert!(FileStream::open(&path).is_err());
    }
}
