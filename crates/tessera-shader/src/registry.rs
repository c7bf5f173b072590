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

//! Named shader sections available to includes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tessera_core::renderer::ShaderError;

/// Recognized shader file suffixes, in lookup priority order.
pub const SHADER_SUFFIXES: [&str; 4] = [".wgsl", ".wgsli", ".inc.wgsl", ".shader"];

/// A name to source map of shader sections.
///
/// Mutation takes `&mut self`, so the registry is filled single-threaded
/// during device initialization and only read afterwards. Storage is shared
/// copy-on-write: cloning is cheap and gives the preprocessor a snapshot that
/// later edits do not affect.
#[derive(Debug, Clone, Default)]
pub struct ShaderSectionRegistry {
    sections: Arc<HashMap<String, Arc<str>>>,
}

impl ShaderSectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a section, replacing any section with the same exact name.
    ///
    /// ## Errors
    /// * `ShaderError::NoExtension` - If `name` carries no file extension.
    pub fn add_section(
        &mut self,
        name: impl Into<String>,
        code: impl Into<String>,
    ) -> Result<(), ShaderError> {
        let name = name.into();
        let has_extension = Path::new(&name)
            .extension()
            .is_some_and(|ext| !ext.is_empty());
        if !has_extension {
            return Err(ShaderError::NoExtension { name });
        }

        let code: Arc<str> = Arc::from(code.into());
        if Arc::make_mut(&mut self.sections)
            .insert(name.clone(), code)
            .is_some()
        {
            log::debug!("ShaderSectionRegistry: Replaced section '{name}'");
        } else {
            log::debug!("ShaderSectionRegistry: Added section '{name}'");
        }
        Ok(())
    }

    /// Removes the section registered under exactly `name`.
    ///
    /// ## Returns
    /// `true` if a section existed.
    pub fn remove_section(&mut self, name: &str) -> bool {
        if !self.sections.contains_key(name) {
            return false;
        }
        Arc::make_mut(&mut self.sections).remove(name).is_some()
    }

    /// Looks up a section by exact name, then by `name` plus each recognized
    /// suffix in priority order. Misses are logged.
    pub fn get_section(&self, name: &str) -> Option<&str> {
        let found = self.find_section(name);
        if found.is_none() {
            log::debug!("ShaderSectionRegistry: No section matches '{name}'");
        }
        found
    }

    /// Same lookup as [`Self::get_section`] without logging misses.
    pub fn find_section(&self, name: &str) -> Option<&str> {
        if let Some(code) = self.sections.get(name) {
            return Some(code);
        }
        SHADER_SUFFIXES.iter().find_map(|suffix| {
            self.sections
                .get(&format!("{name}{suffix}"))
                .map(|code| &**code)
        })
    }

    /// Same lookup as [`Self::get_section`], reporting a miss as an error.
    ///
    /// ## Errors
    /// * `ShaderError::SectionNotFound` - If neither the exact name nor any suffix matches.
    pub fn require_section(&self, name: &str) -> Result<&str, ShaderError> {
        self.find_section(name)
            .ok_or_else(|| ShaderError::SectionNotFound {
                name: name.to_string(),
            })
    }

    /// The number of registered sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Returns `true` if no section is registered.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
