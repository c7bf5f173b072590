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

//! On-disk store of cross-compiled programs.
//!
//! Entries are keyed by a hash of what determines the translation (file name,
//! defines, preprocessor features, stage, target language) and carry the
//! target's extension.
//! The store is not synchronized; a single caller drives it.

mod stream;

pub use self::stream::CompressedFile;

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tessera_core::renderer::{ShaderDescriptor, TargetLanguage};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Failures of the program cache. None of them is fatal to shader creation.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A cache file could not be read, written or renamed.
    #[error("Cache I/O failed for '{path}': {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A cache file is not a valid compressed UTF-8 program.
    #[error("Cache entry '{path}' is corrupt: {details}")]
    Decompress {
        /// The file involved.
        path: PathBuf,
        /// What the decoder reported.
        details: String,
    },

    /// The cache has no usable directory.
    #[error("Program cache is disabled")]
    Disabled,
}

/// A directory of compressed cross-compiled programs.
#[derive(Debug, Clone, Default)]
pub struct ProgramCache {
    directory: Option<PathBuf>,
}

impl ProgramCache {
    /// Resolves the cache location.
    ///
    /// The cache is enabled only when `enabled` is set and `directory` names an
    /// existing directory. Anything else disables it silently.
    pub fn new(enabled: bool, directory: Option<PathBuf>) -> Self {
        let directory = match directory {
            Some(dir) if enabled && dir.is_dir() => Some(dir),
            Some(dir) if enabled => {
                log::debug!(
                    "ProgramCache: '{}' is not a directory, caching disabled",
                    dir.display()
                );
                None
            }
            _ => {
                log::debug!("ProgramCache: Caching disabled");
                None
            }
        };
        if let Some(dir) = &directory {
            log::info!("ProgramCache: Using '{}'", dir.display());
        }
        Self { directory }
    }

    /// A cache that never hits and never writes.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Returns `true` when lookups and stores reach the disk.
    pub fn is_enabled(&self) -> bool {
        self.directory.is_some()
    }

    /// The cache directory, if enabled.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Builds the file name of the program translated from `descriptor` for `target`.
    ///
    /// The key string is the file name, then `-D<define>` for each define in
    /// order, `+<feature>` for each enabled preprocessor feature, `@<stage tag>`
    /// and `><target name>`. Targets sharing an extension (GLSL 330 and 450,
    /// ES 300 and 310) still get distinct names. The key's xxh3-64 hash is
    /// rendered as 16 hex digits followed by the target's extension.
    pub fn compute_program_name(descriptor: &ShaderDescriptor, target: TargetLanguage) -> String {
        let mut key = descriptor.filename.clone();
        for define in &descriptor.defines {
            let _ = write!(key, " -D{define}");
        }
        for feature in descriptor.features.tokens() {
            let _ = write!(key, " +{feature}");
        }
        let _ = write!(key, " @{}", descriptor.stage.tag());
        let _ = write!(key, " >{}", target.name());

        format!("{:016x}.{}", xxh3_64(key.as_bytes()), target.extension())
    }

    /// Loads a cached program.
    ///
    /// ## Returns
    /// `None` when caching is disabled or the entry is missing or unreadable.
    pub fn get_program_cache(&self, name: &str) -> Option<String> {
        let path = self.entry_path(name).ok()?;
        if !path.is_file() {
            return None;
        }

        match CompressedFile::open(&path).and_then(|mut file| file.read_to_string()) {
            Ok(program) => {
                log::debug!("ProgramCache: Hit '{name}'");
                Some(program)
            }
            Err(err) => {
                log::warn!("ProgramCache: Ignoring unreadable entry: {err}");
                None
            }
        }
    }

    /// Stores a program. Does nothing when caching is disabled.
    ///
    /// ## Errors
    /// * `CacheError::Io` - If the entry cannot be written.
    pub fn set_program_cache(&self, name: &str, data: &str) -> Result<(), CacheError> {
        let path = match self.entry_path(name) {
            Ok(path) => path,
            Err(CacheError::Disabled) => return Ok(()),
            Err(err) => return Err(err),
        };

        let mut file = CompressedFile::create(&path);
        file.write(data.as_bytes());
        file.close()?;
        log::debug!("ProgramCache: Stored '{name}'");
        Ok(())
    }

    /// Deletes every entry with a recognized program extension.
    ///
    /// ## Returns
    /// How many files were removed.
    pub fn clear(&self) -> usize {
        let Some(dir) = &self.directory else {
            return 0;
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!("ProgramCache: Cannot list '{}': {err}", dir.display());
                return 0;
            }
        };

        let removed = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_program_file(path))
            .filter(|path| fs::remove_file(path).is_ok())
            .count();
        log::info!("ProgramCache: Removed {removed} entries");
        removed
    }

    fn entry_path(&self, name: &str) -> Result<PathBuf, CacheError> {
        self.directory
            .as_ref()
            .map(|dir| dir.join(name))
            .ok_or(CacheError::Disabled)
    }
}

fn is_program_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TargetLanguage::ALL.iter().any(|t| t.extension() == ext))
}
