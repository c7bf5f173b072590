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

use crate::math::{Extent3D, Origin3D};
use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use std::fmt::Debug;
use std::sync::Arc;

/// The native object factory implemented once per graphics API.
///
/// Every object a backend creates lives in an arena owned by the backend and
/// is addressed by a typed handle. Releasing a handle releases the native
/// object; callers never hold native pointers.
pub trait RenderBackend: Send + Sync + Debug + 'static {
    /// The graphics API this backend drives.
    fn backend_type(&self) -> GraphicsBackendType;

    /// The shader language this backend consumes.
    fn shader_model(&self) -> ShaderModel;

    /// Information about the adapter in use.
    fn adapter_info(&self) -> GraphicsAdapterInfo;

    /// Creates a shader module from code in the backend's language.
    /// ## Arguments
    /// * `descriptor` - The code, stage and entry point of the module.
    /// ## Returns
    /// The ID of the created shader module.
    /// ## Errors
    /// * `ResourceError::Shader` - If the code is in the wrong language or the native compiler rejects it.
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError>;

    /// Destroys a shader module.
    /// ## Errors
    /// * `ResourceError::Shader` - If the ID is unknown.
    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError>;

    /// Creates a depth/stencil state object.
    fn create_depth_stencil_state(
        &self,
        descriptor: &DepthStencilStateDescriptor,
    ) -> Result<StateObjectId, ResourceError>;

    /// Creates a rasterizer state object.
    fn create_rasterizer_state(
        &self,
        descriptor: &RasterizerStateDescriptor,
    ) -> Result<StateObjectId, ResourceError>;

    /// Creates a blend state object.
    fn create_blend_state(
        &self,
        descriptor: &BlendStateDescriptor,
    ) -> Result<StateObjectId, ResourceError>;

    /// Creates a sampler state object.
    fn create_sampler(&self, descriptor: &SamplerDescriptor)
        -> Result<StateObjectId, ResourceError>;

    /// Creates a vertex input layout object.
    fn create_input_layout(
        &self,
        descriptor: &InputLayoutDescriptor,
    ) -> Result<StateObjectId, ResourceError>;

    /// Releases any state object by handle.
    /// ## Errors
    /// * `ResourceError::NotFound` - If the handle was never created or is already released.
    fn release_state_object(&self, id: StateObjectId) -> Result<(), ResourceError>;

    /// Creates a new GPU texture.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError>;

    /// Writes tightly packed pixel data into a region of mip level 0.
    /// ## Arguments
    /// * `id` - The destination texture.
    /// * `data` - The pixel bytes.
    /// * `bytes_per_row` - Row pitch of `data`; `None` for single-row writes.
    /// * `origin` - Where the region starts.
    /// * `size` - The extent of the region.
    fn write_texture(
        &self,
        id: TextureId,
        data: &[u8],
        bytes_per_row: Option<u32>,
        origin: Origin3D,
        size: Extent3D,
    ) -> Result<(), ResourceError>;

    /// Destroys a GPU texture.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Copies mip level 0 of a texture into CPU memory.
    ///
    /// The copy goes through a staging resource that is mapped, read and
    /// unmapped. Whatever the outcome, the staging resource is released
    /// before returning.
    /// ## Errors
    /// * `ResourceError::NotFound` - If the texture is unknown.
    /// * `ResourceError::BackendError` - If the copy or the map fails.
    fn read_texture(&self, id: TextureId) -> Result<CpuTexture, ResourceError>;
}

/// A shared backend is still a backend, which lets tools keep a handle to the
/// concrete type after handing it to the device.
impl<B: RenderBackend + ?Sized> RenderBackend for Arc<B> {
    fn backend_type(&self) -> GraphicsBackendType {
        (**self).backend_type()
    }

    fn shader_model(&self) -> ShaderModel {
        (**self).shader_model()
    }

    fn adapter_info(&self) -> GraphicsAdapterInfo {
        (**self).adapter_info()
    }

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        (**self).create_shader_module(descriptor)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        (**self).destroy_shader_module(id)
    }

    fn create_depth_stencil_state(
        &self,
        descriptor: &DepthStencilStateDescriptor,
    ) -> Result<StateObjectId, ResourceError> {
        (**self).create_depth_stencil_state(descriptor)
    }

    fn create_rasterizer_state(
        &self,
        descriptor: &RasterizerStateDescriptor,
    ) -> Result<StateObjectId, ResourceError> {
        (**self).create_rasterizer_state(descriptor)
    }

    fn create_blend_state(
        &self,
        descriptor: &BlendStateDescriptor,
    ) -> Result<StateObjectId, ResourceError> {
        (**self).create_blend_state(descriptor)
    }

    fn create_sampler(
        &self,
        descriptor: &SamplerDescriptor,
    ) -> Result<StateObjectId, ResourceError> {
        (**self).create_sampler(descriptor)
    }

    fn create_input_layout(
        &self,
        descriptor: &InputLayoutDescriptor,
    ) -> Result<StateObjectId, ResourceError> {
        (**self).create_input_layout(descriptor)
    }

    fn release_state_object(&self, id: StateObjectId) -> Result<(), ResourceError> {
        (**self).release_state_object(id)
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        (**self).create_texture(descriptor)
    }

    fn write_texture(
        &self,
        id: TextureId,
        data: &[u8],
        bytes_per_row: Option<u32>,
        origin: Origin3D,
        size: Extent3D,
    ) -> Result<(), ResourceError> {
        (**self).write_texture(id, data, bytes_per_row, origin, size)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        (**self).destroy_texture(id)
    }

    fn read_texture(&self, id: TextureId) -> Result<CpuTexture, ResourceError> {
        (**self).read_texture(id)
    }
}
