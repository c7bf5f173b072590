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

//! # Tessera Device
//!
//! The [`GraphicsDevice`](tessera_core::renderer::GraphicsDevice)
//! implementation. A [`Device`] owns one render backend and puts in front of
//! it:
//!
//! - the shader pipeline (sections, preprocessing, cross-compilation and the
//!   program cache) behind `create_shader`,
//! - the [`StateCache`] of named state objects,
//! - the [`CommandQueue`] that funnels work onto the owner thread.

#![warn(missing_docs)]

pub mod command_queue;
pub mod config;
mod device;
pub mod state_cache;

pub use command_queue::CommandQueue;
pub use config::{DeviceConfig, ProgramCacheConfig};
pub use device::{Device, DeviceStats};
pub use state_cache::StateCache;

pub use tessera_core::renderer::GraphicsDevice;
pub use tessera_infra::BackendRequest;
