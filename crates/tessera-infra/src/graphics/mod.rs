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

//! Render backends and the factory that selects one.

pub mod headless;
#[cfg(feature = "wgpu")]
pub mod wgpu;

pub use self::headless::{HeadlessBackend, LiveObjects, StateKind};

use serde::{Deserialize, Serialize};
use tessera_core::platform::window::NativeWindowHandle;
use tessera_core::renderer::{
    GraphicsBackendType, RenderBackend, RenderError, ShaderModel, TargetLanguage,
};

/// Label given to the logical device when the caller names none.
pub const DEFAULT_DEVICE_LABEL: &str = "Tessera Device";

/// Which backend the factory should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendRequest {
    /// WGPU on whatever API the platform prefers.
    #[default]
    Auto,
    /// WGPU restricted to one graphics API.
    Native(GraphicsBackendType),
    /// The CPU backend, consuming WGSL when `shader_target` is `None` or
    /// translated programs of that language otherwise.
    Headless {
        /// The language shaders are translated to, if any.
        #[serde(default)]
        shader_target: Option<TargetLanguage>,
    },
}

impl BackendRequest {
    /// The shader model the requested backend will report, when known
    /// before construction.
    pub fn expected_shader_model(&self) -> Option<ShaderModel> {
        match self {
            BackendRequest::Headless { shader_target } => {
                Some(shader_target.map_or(ShaderModel::Canonical, ShaderModel::Translated))
            }
            _ => None,
        }
    }
}

/// Builds the backend described by `request`.
///
/// ## Arguments
/// * `request` - Which backend to build.
/// * `window` - The window to present to. Without one a GPU backend runs
///   headless.
///
/// ## Errors
/// * `RenderError::UnsupportedBackend` - If the API cannot be served by any
///   backend compiled into this build.
/// * `RenderError::InitializationFailed` - If the API is supported but no
///   device could be created.
pub fn create_backend(
    request: BackendRequest,
    window: Option<NativeWindowHandle>,
) -> Result<Box<dyn RenderBackend>, RenderError> {
    create_backend_with_label(request, window, DEFAULT_DEVICE_LABEL)
}

/// [`create_backend`] with an explicit logical device label.
pub fn create_backend_with_label(
    request: BackendRequest,
    window: Option<NativeWindowHandle>,
    label: &str,
) -> Result<Box<dyn RenderBackend>, RenderError> {
    log::info!("Creating render backend for request {request:?}");
    match request {
        BackendRequest::Headless { shader_target } => {
            let model = shader_target.map_or(ShaderModel::Canonical, ShaderModel::Translated);
            Ok(Box::new(HeadlessBackend::new(model)))
        }
        BackendRequest::Auto => create_wgpu(None, window, label),
        BackendRequest::Native(api) => create_wgpu(Some(api), window, label),
    }
}

#[cfg(feature = "wgpu")]
fn create_wgpu(
    api: Option<GraphicsBackendType>,
    window: Option<NativeWindowHandle>,
    label: &str,
) -> Result<Box<dyn RenderBackend>, RenderError> {
    let backends = match api {
        None => ::wgpu::Backends::all(),
        Some(api) => self::wgpu::conversions::backends_for(api)
            .ok_or_else(|| RenderError::UnsupportedBackend(format!("{api:?}")))?,
    };
    let backend = self::wgpu::WgpuBackend::new(backends, window, label)
        .map_err(|e| RenderError::InitializationFailed(format!("{e:#}")))?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "wgpu"))]
fn create_wgpu(
    api: Option<GraphicsBackendType>,
    _window: Option<NativeWindowHandle>,
    _label: &str,
) -> Result<Box<dyn RenderBackend>, RenderError> {
    Err(RenderError::UnsupportedBackend(format!(
        "{} requires the 'wgpu' feature",
        api.map_or_else(|| "Auto".to_string(), |api| format!("{api:?}"))
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_request_builds_the_requested_model() {
        let request = BackendRequest::Headless {
            shader_target: Some(TargetLanguage::SpirV),
        };
        let backend = create_backend(request, None).unwrap();
        assert_eq!(backend.backend_type(), GraphicsBackendType::Headless);
        assert_eq!(
            backend.shader_model(),
            ShaderModel::Translated(TargetLanguage::SpirV)
        );
        assert_eq!(request.expected_shader_model(), Some(backend.shader_model()));
    }

    #[test]
    fn apis_without_a_backend_are_unsupported() {
        for api in [GraphicsBackendType::Dx11, GraphicsBackendType::Unknown] {
            assert!(matches!(
                create_backend(BackendRequest::Native(api), None),
                Err(RenderError::UnsupportedBackend(_))
            ));
        }
    }

    #[test]
    fn requests_deserialize_from_config_json() {
        let auto: BackendRequest = serde_json::from_str("\"Auto\"").unwrap();
        let native: BackendRequest = serde_json::from_str(r#"{"Native":"Vulkan"}"#).unwrap();
        let headless: BackendRequest =
            serde_json::from_str(r#"{"Headless":{"shader_target":"GlslEs300"}}"#).unwrap();
        let canonical: BackendRequest = serde_json::from_str(r#"{"Headless":{}}"#).unwrap();

        assert_eq!(auto, BackendRequest::Auto);
        assert_eq!(native, BackendRequest::Native(GraphicsBackendType::Vulkan));
        assert_eq!(
            headless,
            BackendRequest::Headless {
                shader_target: Some(TargetLanguage::GlslEs300)
            }
        );
        assert_eq!(canonical.expected_shader_model(), Some(ShaderModel::Canonical));
    }
}
