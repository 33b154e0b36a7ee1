//! Target memory access contract and the memory sources shipped with the tool.
//!
//! The decoder never touches target memory directly. Everything goes through
//! [`TargetMemory`], so a live debugger session, a memory dump on disk, or a
//! test fixture can all back a query.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::resolve::ResolvedAddress;

/// The inspected target could not supply the requested bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetUnreachable {
    /// No target is attached, or the memory source itself failed.
    #[error("target not attached: {0}")]
    Detached(String),
    /// The requested range is not mapped in the target.
    #[error("address {address:#010x} ({len} bytes) is not mapped in the target")]
    Unmapped {
        /// First byte requested.
        address: u64,
        /// Number of bytes requested.
        len: usize,
    },
}

/// Byte-level read access to the inspected target.
///
/// Implementations perform exactly one read per call and never retry.
pub trait TargetMemory {
    /// Fills `buf` with the bytes starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`TargetUnreachable`] when the target is gone or any byte of the
    /// range is unmapped.
    fn read_bytes(&mut self, address: u64, buf: &mut [u8]) -> Result<(), TargetUnreachable>;

    /// Reads one little-endian 32-bit register at `address`.
    ///
    /// # Errors
    ///
    /// Propagates the failure from [`TargetMemory::read_bytes`].
    fn read_word(&mut self, address: ResolvedAddress) -> Result<u32, TargetUnreachable> {
        let mut bytes = [0u8; 4];
        self.read_bytes(address.get(), &mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }
}

impl<T: TargetMemory + ?Sized> TargetMemory for &mut T {
    fn read_bytes(&mut self, address: u64, buf: &mut [u8]) -> Result<(), TargetUnreachable> {
        (**self).read_bytes(address, buf)
    }
}

fn image_offset(
    load_address: u64,
    image_len: u64,
    address: u64,
    len: usize,
) -> Result<u64, TargetUnreachable> {
    let unmapped = TargetUnreachable::Unmapped { address, len };
    let offset = address.checked_sub(load_address).ok_or(unmapped.clone())?;
    let end = u64::try_from(len)
        .ok()
        .and_then(|len| offset.checked_add(len))
        .ok_or(unmapped.clone())?;
    if end > image_len {
        return Err(unmapped);
    }
    Ok(offset)
}

/// A contiguous memory image held in host memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMemory {
    load_address: u64,
    bytes: Vec<u8>,
}

impl ImageMemory {
    /// Maps `bytes` so that `bytes[0]` appears at `load_address`.
    #[must_use]
    pub const fn new(load_address: u64, bytes: Vec<u8>) -> Self {
        Self {
            load_address,
            bytes,
        }
    }

    /// Creates a zero-filled image of `len` bytes at `load_address`.
    #[must_use]
    pub fn zeroed(load_address: u64, len: usize) -> Self {
        Self::new(load_address, vec![0; len])
    }

    /// Stores a little-endian word, as a device would present it.
    ///
    /// # Errors
    ///
    /// Returns [`TargetUnreachable::Unmapped`] when the word lies outside the
    /// image.
    pub fn write_word(&mut self, address: u64, value: u32) -> Result<(), TargetUnreachable> {
        let offset = self.offset_of(address, 4)?;
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn offset_of(&self, address: u64, len: usize) -> Result<usize, TargetUnreachable> {
        let image_len = u64::try_from(self.bytes.len()).unwrap_or(u64::MAX);
        let offset = image_offset(self.load_address, image_len, address, len)?;
        usize::try_from(offset).map_err(|_| TargetUnreachable::Unmapped { address, len })
    }
}

impl TargetMemory for ImageMemory {
    fn read_bytes(&mut self, address: u64, buf: &mut [u8]) -> Result<(), TargetUnreachable> {
        let offset = self.offset_of(address, buf.len())?;
        buf.copy_from_slice(&self.bytes[offset..offset + buf.len()]);
        Ok(())
    }
}

/// A raw physical memory dump on disk, such as QEMU `pmemsave` output.
///
/// Every read seeks and reads the file again; nothing is cached between
/// queries.
#[derive(Debug)]
pub struct FileMemory {
    path: PathBuf,
    file: File,
    load_address: u64,
}

impl FileMemory {
    /// Opens `path` and maps its first byte at `load_address`.
    ///
    /// # Errors
    ///
    /// Returns [`TargetUnreachable::Detached`] when the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, load_address: u64) -> Result<Self, TargetUnreachable> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|error| {
            TargetUnreachable::Detached(format!("cannot open {}: {error}", path.display()))
        })?;
        log::debug!(
            "opened memory image {} at load address {load_address:#x}",
            path.display()
        );
        Ok(Self {
            path,
            file,
            load_address,
        })
    }

    /// Path of the backing image.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn detached(&self, error: &std::io::Error) -> TargetUnreachable {
        TargetUnreachable::Detached(format!("{}: {error}", self.path.display()))
    }
}

impl TargetMemory for FileMemory {
    fn read_bytes(&mut self, address: u64, buf: &mut [u8]) -> Result<(), TargetUnreachable> {
        let image_len = self
            .file
            .metadata()
            .map_err(|error| self.detached(&error))?
            .len();
        let offset = image_offset(self.load_address, image_len, address, buf.len())?;

        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|error| self.detached(&error))?;
        self.file
            .read_exact(buf)
            .map_err(|error| self.detached(&error))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{FileMemory, ImageMemory, TargetMemory, TargetUnreachable};
    use crate::resolve::ResolvedAddress;

    #[test]
    fn image_reads_little_endian_words() {
        let mut image = ImageMemory::new(0x1000, vec![0x78, 0x56, 0x34, 0x12, 0xFF]);
        assert_eq!(image.read_word(ResolvedAddress(0x1000)), Ok(0x1234_5678));
    }

    #[test]
    fn image_rejects_reads_outside_mapping() {
        let mut image = ImageMemory::zeroed(0x1000, 8);
        assert_eq!(
            image.read_word(ResolvedAddress(0x0FFC)),
            Err(TargetUnreachable::Unmapped {
                address: 0x0FFC,
                len: 4
            })
        );
        assert_eq!(
            image.read_word(ResolvedAddress(0x1006)),
            Err(TargetUnreachable::Unmapped {
                address: 0x1006,
                len: 4
            })
        );
        assert!(image.read_word(ResolvedAddress(0x1004)).is_ok());
    }

    #[test]
    fn image_rejects_range_wrapping_address_space() {
        let mut image = ImageMemory::zeroed(0, 16);
        let mut buf = [0u8; 4];
        assert!(matches!(
            image.read_bytes(u64::MAX - 1, &mut buf),
            Err(TargetUnreachable::Unmapped { .. })
        ));
    }

    #[test]
    fn written_words_read_back() {
        let mut image = ImageMemory::zeroed(0x0800_0000, 0x1000);
        image
            .write_word(0x0800_0104, 0xDEAD_BEEF)
            .expect("inside image");
        assert_eq!(image.read_word(ResolvedAddress(0x0800_0104)), Ok(0xDEAD_BEEF));
        assert!(image.write_word(0x0800_1000, 1).is_err());
    }

    fn first_word(mut memory: impl TargetMemory) -> Result<u32, TargetUnreachable> {
        memory.read_word(ResolvedAddress(0))
    }

    #[test]
    fn reads_through_mutable_reference() {
        let mut image = ImageMemory::new(0, vec![1, 0, 0, 0]);
        assert_eq!(first_word(&mut image), Ok(1));
        assert_eq!(first_word(image), Ok(1));
    }

    #[test]
    fn file_memory_reads_dump_at_load_address() {
        let mut dump = tempfile::NamedTempFile::new().expect("temp file");
        dump.write_all(&[0, 0, 0, 0, 0x05, 0x00, 0x00, 0x80])
            .expect("write dump");

        let mut memory = FileMemory::open(dump.path(), 0x4000).expect("open dump");
        assert_eq!(memory.read_word(ResolvedAddress(0x4004)), Ok(0x8000_0005));
        assert_eq!(
            memory.read_word(ResolvedAddress(0x4008)),
            Err(TargetUnreachable::Unmapped {
                address: 0x4008,
                len: 4
            })
        );
        assert_eq!(memory.path(), dump.path());
    }

    #[test]
    fn file_memory_sees_fresh_contents_on_each_read() {
        let mut dump = tempfile::NamedTempFile::new().expect("temp file");
        dump.write_all(&[1, 0, 0, 0]).expect("write dump");
        dump.flush().expect("flush dump");

        let mut memory = FileMemory::open(dump.path(), 0).expect("open dump");
        assert_eq!(memory.read_word(ResolvedAddress(0)), Ok(1));

        std::fs::write(dump.path(), [2, 0, 0, 0]).expect("rewrite dump");
        assert_eq!(memory.read_word(ResolvedAddress(0)), Ok(2));
    }

    #[test]
    fn missing_file_is_detached() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = FileMemory::open(dir.path().join("absent.bin"), 0);
        assert!(matches!(result, Err(TargetUnreachable::Detached(_))));
    }
}
