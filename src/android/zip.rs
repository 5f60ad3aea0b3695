use std::io::{self, Cursor, Read, Seek};
use zip::read::ZipArchive;

/// Result alias for APK (ZIP) operations.
pub type ApkZipResult<T> = Result<T, ApkZipError>;

/// Errors surfaced while unpacking an APK.
#[derive(Debug)]
pub enum ApkZipError {
    Io(io::Error),
    Zip(zip::result::ZipError),
}

impl std::fmt::Display for ApkZipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApkZipError::Io(err) => write!(f, "I/O error: {err}"),
            ApkZipError::Zip(err) => write!(f, "ZIP error: {err}"),
        }
    }
}

impl std::error::Error for ApkZipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApkZipError::Io(err) => Some(err),
            ApkZipError::Zip(err) => Some(err),
        }
    }
}

impl From<io::Error> for ApkZipError {
    fn from(value: io::Error) -> Self {
        ApkZipError::Io(value)
    }
}

impl From<zip::result::ZipError> for ApkZipError {
    fn from(value: zip::result::ZipError) -> Self {
        ApkZipError::Zip(value)
    }
}

/// A dex entry unpacked from an [`ApkFile`].
#[derive(Clone, Debug)]
pub struct ApkEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// The dex images of an APK (ZIP) file, held in memory.
///
/// Entries keep the order of the archive's central directory, so `classes.dex`, `classes2.dex`
/// and later secondary dex files come back in the order the packager wrote them. Other entries
/// are counted but never decompressed.
pub struct ApkFile {
    entry_count: usize,
    dex: Vec<ApkEntry>,
}

impl ApkFile {
    /// Load an APK from a byte buffer.
    pub fn from_bytes(bytes: &[u8]) -> ApkZipResult<Self> {
        Self::read(Cursor::new(bytes))
    }

    fn read<R: Read + Seek>(reader: R) -> ApkZipResult<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut entry_count = 0;
        let mut dex = Vec::new();
        for idx in 0..archive.len() {
            let (name, is_dir) = {
                let raw = archive.by_index_raw(idx)?;
                (raw.name().to_string(), raw.is_dir())
            };
            if is_dir {
                continue;
            }
            entry_count += 1;
            if !name.ends_with(".dex") {
                continue;
            }
            let mut entry = archive.by_index(idx)?;
            let mut data = Vec::with_capacity(entry.size().min(64 * 1024 * 1024) as usize);
            entry.read_to_end(&mut data)?;
            dex.push(ApkEntry { name, data });
        }
        Ok(ApkFile { entry_count, dex })
    }

    /// Every `*.dex` entry, in archive order.
    pub fn dex_entries(&self) -> impl Iterator<Item = &ApkEntry> {
        self.dex.iter()
    }

    /// Number of file entries in the archive, dex or not.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }
}
