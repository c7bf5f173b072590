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

//! # Tessera Shader
//!
//! The shader half of the graphics device, in pipeline order:
//!
//! 1. [`ShaderSectionRegistry`]: named WGSL snippets registered at startup.
//! 2. [`Preprocessor`]: expands defines, conditionals and includes.
//! 3. [`CrossCompiler`]: WGSL to the backend's language through validated IR.
//! 4. [`ProgramCache`]: compressed on-disk store of cross-compiled programs.
//!
//! None of these types lock internally. The device drives them from
//! `create_shader` only.

#![warn(missing_docs)]

pub mod cache;
pub mod compiler;
pub mod preprocessor;
pub mod registry;

pub use cache::{CacheError, ProgramCache};
pub use compiler::{CombinedSampler, CompilerLimits, CrossCompiler, TranspileOutput};
pub use preprocessor::{backend_macro, Preprocessor};
pub use registry::{ShaderSectionRegistry, SHADER_SUFFIXES};
