// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A whole-file LZ4 stream.
//!
//! The file is one size-prepended LZ4 block with no header. Reading
//! decompresses everything on open; writing buffers until [`CompressedFile::close`],
//! which writes a sibling temporary file and renames it into place so readers
//! never observe a half-written program.

use super::CacheError;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
enum Mode {
    Read { cursor: usize },
    Write,
}

/// An open compressed cache file.
#[derive(Debug)]
pub struct CompressedFile {
    path: PathBuf,
    mode: Mode,
    buffer: Vec<u8>,
}

impl CompressedFile {
    /// Opens and decompresses an existing file.
    ///
    /// ## Errors
    /// * `CacheError::Io` - If the file cannot be read.
    /// * `CacheError::Decompress` - If the content is not a valid LZ4 block.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let compressed = fs::read(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        let buffer = lz4_flex::decompress_size_prepended(&compressed).map_err(|err| {
            CacheError::Decompress {
                path: path.clone(),
                details: err.to_string(),
            }
        })?;

        Ok(Self {
            path,
            mode: Mode::Read { cursor: 0 },
            buffer,
        })
    }

    /// Starts a new file at `path`. Nothing touches the disk until `close`.
    pub fn create(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            mode: Mode::Write,
            buffer: Vec::new(),
        }
    }

    /// The file this stream reads from or will write to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copies up to `buf.len()` decompressed bytes into `buf`.
    ///
    /// ## Returns
    /// The number of bytes copied; `0` at the end of the data or for a
    /// stream opened for writing.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let Mode::Read { cursor } = &mut self.mode else {
            return 0;
        };
        let remaining = &self.buffer[*cursor..];
        let count = remaining.len().min(buf.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        *cursor += count;
        count
    }

    /// Reads the rest of the stream as UTF-8 text.
    ///
    /// ## Errors
    /// * `CacheError::Decompress` - If the decompressed bytes are not UTF-8.
    pub fn read_to_string(&mut self) -> Result<String, CacheError> {
        let mut rest = vec![0; self.buffer.len()];
        let count = self.read(&mut rest);
        rest.truncate(count);
        String::from_utf8(rest).map_err(|err| CacheError::Decompress {
            path: self.path.clone(),
            details: err.to_string(),
        })
    }

    /// Appends bytes to a stream created for writing. Ignored on read streams.
    pub fn write(&mut self, data: &[u8]) {
        if matches!(self.mode, Mode::Write) {
            self.buffer.extend_from_slice(data);
        }
    }

    /// Finishes the stream. A write stream is compressed and persisted here.
    ///
    /// ## Errors
    /// * `CacheError::Io` - If the temporary file cannot be written or renamed.
    pub fn close(self) -> Result<(), CacheError> {
        if let Mode::Read { .. } = self.mode {
            return Ok(());
        }

        let compressed = lz4_flex::compress_prepend_size(&self.buffer);
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, compressed).map_err(|source| CacheError::Io {
            path: staging.clone(),
            source,
        })?;
        if let Err(source) = fs::rename(&staging, &self.path) {
            let _ = fs::remove_file(&staging);
            return Err(CacheError::Io {
                path: self.path,
                source,
            });
        }
        Ok(())
    }
}
