//! File-backed byte streams for the core's storage traits

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use avrisp_core::io::{LineSink, LineSource, Storage};
use avrisp_core::Error;

fn map_io_error(path: &Path, e: io::Error) -> Error {
    log::error!("{}: {}", path.display(), e);
    if e.kind() == io::ErrorKind::NotFound {
        Error::NotFound
    } else {
        Error::Io
    }
}

/// Buffered reader over a file
pub struct FileSource {
    path: PathBuf,
    reader: BufReader<File>,
}

impl FileSource {
    /// Open `path` for reading
    pub fn open(path: &Path) -> avrisp_core::Result<Self> {
        let file = File::open(path).map_err(|e| map_io_error(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        })
    }
}

impl LineSource for FileSource {
    fn read_byte(&mut self) -> avrisp_core::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_io_error(&self.path, e)),
            }
        }
    }
}

/// Buffered writer over a file
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Create or truncate `path` for writing
    pub fn create(path: &Path) -> avrisp_core::Result<Self> {
        let file = File::create(path).map_err(|e| map_io_error(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }
}

impl LineSink for FileSink {
    fn write_all(&mut self, bytes: &[u8]) -> avrisp_core::Result<()> {
        self.writer
            .write_all(bytes)
            .map_err(|e| map_io_error(&self.path, e))
    }

    fn flush(&mut self) -> avrisp_core::Result<()> {
        self.writer.flush().map_err(|e| map_io_error(&self.path, e))
    }
}

/// A directory standing in for the programmer's removable card
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    /// Use `root` as the storage directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Storage for DirStorage {
    type Reader = FileSource;
    type Writer = FileSink;

    fn exists(&mut self, name: &str) -> bool {
        self.root.join(name).is_file()
    }

    fn open(&mut self, name: &str) -> avrisp_core::Result<FileSource> {
        FileSource::open(&self.root.join(name))
    }

    fn create(&mut self, name: &str) -> avrisp_core::Result<FileSink> {
        FileSink::create(&self.root.join(name))
    }
}
