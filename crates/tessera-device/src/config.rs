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

//! Device configuration, loaded from JSON or built in code.

use serde::Deserialize;
use std::path::PathBuf;
use tessera_core::renderer::{GraphicsBackendType, RenderError, TargetLanguage};
use tessera_infra::graphics::DEFAULT_DEVICE_LABEL;
use tessera_infra::BackendRequest;

/// Selects the backend: `auto`, `headless`, `headless:<target>` or an API name.
pub const ENV_BACKEND: &str = "TESSERA_BACKEND";
/// Overrides the program cache directory and enables caching.
pub const ENV_SHADER_CACHE_DIR: &str = "TESSERA_SHADER_CACHE_DIR";
/// `0`/`false`/`off` disables the program cache, anything else enables it.
pub const ENV_SHADER_CACHE: &str = "TESSERA_SHADER_CACHE";

/// Where cross-compiled programs are stored between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProgramCacheConfig {
    /// Whether the cache is used at all.
    pub enabled: bool,
    /// The cache directory. It must exist; the device never creates it.
    pub directory: Option<PathBuf>,
}

/// Everything needed to build a [`crate::Device`] apart from the window.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Which backend the factory builds.
    pub backend: BackendRequest,
    /// Program cache settings.
    pub program_cache: ProgramCacheConfig,
    /// Directory file includes are resolved against. `None` means the
    /// current directory.
    pub include_root: Option<PathBuf>,
    /// Debug label of the logical device.
    pub device_label: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            backend: BackendRequest::Auto,
            program_cache: ProgramCacheConfig::default(),
            include_root: None,
            device_label: DEFAULT_DEVICE_LABEL.to_string(),
        }
    }
}

impl DeviceConfig {
    /// A configuration for the CPU backend.
    ///
    /// ## Arguments
    /// * `shader_target` - The language shaders are translated to, or `None`
    ///   for WGSL.
    pub fn headless(shader_target: Option<TargetLanguage>) -> Self {
        Self {
            backend: BackendRequest::Headless { shader_target },
            ..Self::default()
        }
    }

    /// Enables the program cache in `directory`.
    pub fn with_program_cache(mut self, directory: impl Into<PathBuf>) -> Self {
        self.program_cache = ProgramCacheConfig {
            enabled: true,
            directory: Some(directory.into()),
        };
        self
    }

    /// Loads a configuration from JSON. Missing fields take their defaults.
    ///
    /// ## Errors
    /// * `RenderError::Configuration` - If the document does not parse.
    pub fn from_json_str(json: &str) -> Result<Self, RenderError> {
        serde_json::from_str(json)
            .map_err(|e| RenderError::Configuration(format!("invalid device config: {e}")))
    }

    /// Loads a configuration from a JSON file.
    ///
    /// ## Errors
    /// * `RenderError::Configuration` - If the file cannot be read or parsed.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, RenderError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            RenderError::Configuration(format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    /// Applies the `TESSERA_*` environment variables on top of `self`.
    ///
    /// ## Errors
    /// * `RenderError::Configuration` - If `TESSERA_BACKEND` is not recognized.
    pub fn with_env_overrides(self) -> Result<Self, RenderError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, RenderError> {
        if let Some(value) = lookup(ENV_BACKEND) {
            self.backend = parse_backend(&value)?;
            log::debug!("DeviceConfig: {ENV_BACKEND} selects {:?}", self.backend);
        }
        if let Some(dir) = lookup(ENV_SHADER_CACHE_DIR) {
            self.program_cache.directory = Some(PathBuf::from(dir));
            self.program_cache.enabled = true;
        }
        if let Some(flag) = lookup(ENV_SHADER_CACHE) {
            self.program_cache.enabled = !matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }
        Ok(self)
    }
}

fn parse_backend(value: &str) -> Result<BackendRequest, RenderError> {
    let value = value.trim().to_ascii_lowercase();
    let unknown = || RenderError::Configuration(format!("unknown backend '{value}'"));

    if let Some(target) = value.strip_prefix("headless:") {
        let target = TargetLanguage::ALL
            .into_iter()
            .find(|t| format!("{t:?}").eq_ignore_ascii_case(target))
            .ok_or_else(unknown)?;
        return Ok(BackendRequest::Headless {
            shader_target: Some(target),
        });
    }

    let api = match value.as_str() {
        "auto" => return Ok(BackendRequest::Auto),
        "headless" => return Ok(BackendRequest::Headless { shader_target: None }),
        "vulkan" | "vk" => GraphicsBackendType::Vulkan,
        "metal" => GraphicsBackendType::Metal,
        "dx12" | "d3d12" => GraphicsBackendType::Dx12,
        "opengl" | "gl" | "gles" => GraphicsBackendType::OpenGL,
        "webgpu" => GraphicsBackendType::WebGpu,
        _ => return Err(unknown()),
    };
    Ok(BackendRequest::Native(api))
}
