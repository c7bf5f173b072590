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

//! Backend-agnostic rendering API.
//!
//! - **[`adapter`]**: adapter identity reported by a backend.
//! - **[`command`]**: the deferred command type funneled to the owner thread.
//! - **[`pipeline`]**: fixed-function state descriptors and state objects.
//! - **[`shader`]**: shader descriptors, target languages and module handles.
//! - **[`texture`]**: texture and sampler descriptors and handles.
//! - **[`util`]**: shared enums and the pixel format table.

pub mod adapter;
pub mod command;
pub mod pipeline;
pub mod shader;
pub mod texture;
pub mod util;

pub use self::adapter::*;
pub use self::command::*;
pub use self::pipeline::*;
pub use self::shader::*;
pub use self::texture::*;
pub use self::util::*;
