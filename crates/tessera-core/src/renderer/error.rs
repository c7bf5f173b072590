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

//! Defines the hierarchy of error types for the graphics device.

use crate::renderer::api::shader::{ShaderModuleId, TargetLanguage};
use crate::renderer::api::util::ShaderStage;
use std::fmt;

/// An error raised while registering, preprocessing, translating or
/// creating a shader.
#[derive(Debug)]
pub enum ShaderError {
    /// A shader section was registered under a name without a file extension.
    NoExtension {
        /// The rejected section name.
        name: String,
    },
    /// A section lookup missed both the exact name and every suffix fallback.
    SectionNotFound {
        /// The requested section name.
        name: String,
    },
    /// An include directive could not be resolved.
    IncludeFailed {
        /// The file whose expansion failed.
        file: String,
        /// What the resolver reported.
        details: String,
    },
    /// The preprocessor rejected the source (syntax or evaluation error).
    Preprocess {
        /// The file being expanded.
        file: String,
        /// The preprocessor diagnostic.
        details: String,
    },
    /// The stage has no counterpart in the intermediate compiler.
    UnsupportedStage {
        /// The offending stage.
        stage: ShaderStage,
    },
    /// Cross-compilation was requested while the backend consumes canonical source.
    TranslationNotRequired,
    /// The canonical source failed to parse.
    Parse {
        /// The entry point that was being compiled.
        entry_point: String,
        /// Rendered compiler diagnostics.
        details: String,
    },
    /// The parsed module failed to lower to validated intermediate form.
    Lowering {
        /// Rendered validator diagnostics or the toolchain panic message.
        details: String,
    },
    /// The backend writer failed to emit the target language.
    Emission {
        /// The requested target.
        target: TargetLanguage,
        /// The writer diagnostic.
        details: String,
    },
    /// The target writer was not compiled into this build.
    TargetUnsupported {
        /// The requested target.
        target: TargetLanguage,
    },
    /// The native backend refused the final shader code.
    CompilationError {
        /// A descriptive label for the shader.
        label: String,
        /// Detailed error messages from the backend.
        details: String,
    },
    /// The requested shader module could not be found.
    NotFound {
        /// The ID of the shader module that was not found.
        id: ShaderModuleId,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::NoExtension { name } => {
                write!(f, "Shader section '{name}' has no file extension")
            }
            ShaderError::SectionNotFound { name } => {
                write!(f, "Shader section '{name}' is not registered")
            }
            ShaderError::IncludeFailed { file, details } => {
                write!(f, "Include resolution failed while expanding '{file}': {details}")
            }
            ShaderError::Preprocess { file, details } => {
                write!(f, "Preprocessing failed for '{file}': {details}")
            }
            ShaderError::UnsupportedStage { stage } => {
                write!(f, "Shader stage {stage:?} cannot be cross-compiled")
            }
            ShaderError::TranslationNotRequired => write!(
                f,
                "Cross-compilation requested but the backend consumes canonical source"
            ),
            ShaderError::Parse {
                entry_point,
                details,
            } => {
                write!(f, "Parsing failed for entry point '{entry_point}': {details}")
            }
            ShaderError::Lowering { details } => {
                write!(f, "Lowering to intermediate form failed: {details}")
            }
            ShaderError::Emission { target, details } => {
                write!(f, "Emitting {} failed: {details}", target.name())
            }
            ShaderError::TargetUnsupported { target } => {
                write!(f, "Target {} is not compiled into this build", target.name())
            }
            ShaderError::CompilationError { label, details } => {
                write!(f, "Shader compilation failed for '{label}': {details}")
            }
            ShaderError::NotFound { id } => {
                write!(f, "Shader module not found for ID: {id:?}")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// A generic resource could not be found.
    NotFound,
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
    /// An attempt was made to access a resource out of its bounds.
    OutOfBounds,
    /// A descriptor was rejected before reaching the native API.
    InvalidDescriptor(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::OutOfBounds => write!(f, "Resource access out of bounds."),
            ResourceError::InvalidDescriptor(msg) => {
                write!(f, "Invalid resource descriptor: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

/// A high-level error raised while constructing or running the graphics device.
#[derive(Debug)]
pub enum RenderError {
    /// The requested backend is not available in this build or on this platform.
    UnsupportedBackend(String),
    /// A failure occurred during the initialization of the graphics backend.
    InitializationFailed(String),
    /// The device configuration is inconsistent (e.g. a state object failed to build).
    Configuration(String),
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// An unexpected or internal error occurred.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::UnsupportedBackend(msg) => {
                write!(f, "Unsupported graphics backend: {msg}")
            }
            RenderError::InitializationFailed(msg) => {
                write!(f, "Failed to initialize graphics backend: {msg}")
            }
            RenderError::Configuration(msg) => {
                write!(f, "Invalid graphics device configuration: {msg}")
            }
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::Internal(msg) => {
                write!(f, "An internal or unexpected error occurred: {msg}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn shader_error_display() {
        let err = ShaderError::NoExtension {
            name: "common".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Shader section 'common' has no file extension"
        );

        let err = ShaderError::TargetUnsupported {
            target: TargetLanguage::Msl,
        };
        assert_eq!(
            format!("{err}"),
            "Target Metal Shading Language is not compiled into this build"
        );
    }

    #[test]
    fn resource_error_display_wrapping_shader_error() {
        let res_err: ResourceError = ShaderError::NotFound {
            id: ShaderModuleId(42),
        }
        .into();
        assert_eq!(
            format!("{res_err}"),
            "Shader resource error: Shader module not found for ID: ShaderModuleId(42)"
        );
        assert!(res_err.source().is_some());
    }

    #[test]
    fn render_error_chains_down_to_shader_error() {
        let res_err: ResourceError = ShaderError::UnsupportedStage {
            stage: ShaderStage::Hull,
        }
        .into();
        let render_err: RenderError = res_err.into();
        assert_eq!(
            format!("{render_err}"),
            "Graphics resource operation failed: Shader resource error: Shader stage Hull cannot be cross-compiled"
        );
        let source = render_err.source().expect("resource error source");
        assert!(source.source().is_some());
    }
}
