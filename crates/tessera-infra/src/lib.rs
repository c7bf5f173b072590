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

//! # Tessera Infra
//!
//! Concrete implementations of the [`RenderBackend`] contract and the
//! factory that picks one from a [`BackendRequest`].
//!
//! [`RenderBackend`]: tessera_core::renderer::RenderBackend

pub mod graphics;

pub use self::graphics::{
    create_backend, create_backend_with_label, BackendRequest, HeadlessBackend, LiveObjects,
    StateKind,
};

#[cfg(feature = "wgpu")]
pub use self::graphics::wgpu::WgpuBackend;
