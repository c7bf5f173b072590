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

use crate::renderer::api::*;
use crate::renderer::error::ResourceError;

/// The device contract consumed by renderers.
///
/// A device owns one backend plus the shader pipeline, the named state
/// catalogue and the command queue. Any thread may call into it; only the
/// current owner thread executes queued commands.
pub trait GraphicsDevice: Send + Sync {
    /// Compiles a canonical shader for the active backend.
    ///
    /// Runs preprocessing, cross-compilation when the backend needs it (with
    /// the on-disk program cache in front of it), then the backend factory.
    /// ## Arguments
    /// * `descriptor` - The shader source, stage, defines and preprocessor options.
    /// ## Returns
    /// The module handle, or `None` after logging why compilation failed.
    fn create_shader(&self, descriptor: &ShaderDescriptor) -> Option<ShaderModuleId>;

    /// Destroys a shader module created by [`GraphicsDevice::create_shader`].
    fn destroy_shader(&self, id: ShaderModuleId) -> Result<(), ResourceError>;

    /// Looks up a named depth/stencil state. `None` means "use the default".
    fn depth_stencil_state(&self, name: &str) -> Option<&StateObject<DepthStencilStateDescriptor>>;

    /// Looks up a named rasterizer state. `None` means "use the default".
    fn rasterizer_state(&self, name: &str) -> Option<&StateObject<RasterizerStateDescriptor>>;

    /// Looks up a named blend state. `None` means "use the default".
    fn blend_state(&self, name: &str) -> Option<&StateObject<BlendStateDescriptor>>;

    /// Looks up a named sampler state. `None` means "use the default".
    fn sampler_state(&self, name: &str) -> Option<&StateObject<SamplerDescriptor<'static>>>;

    /// Looks up a named input layout. `None` means "use the default".
    fn input_layout(&self, name: &str) -> Option<&StateObject<InputLayoutDescriptor>>;

    /// Creates a texture, optionally uploading tightly packed initial pixels.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If `data` is shorter than mip level 0.
    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<TextureId, ResourceError>;

    /// Destroys a texture.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Stages a GPU texture into a CPU-side surface.
    /// ## Returns
    /// The pixels of mip level 0, or `None` if any step of the transfer failed.
    fn create_surface(&self, texture: TextureId) -> Option<CpuTexture>;

    /// Runs `command` now if called from the owner thread, else queues it.
    fn enqueue(&self, command: Command);

    /// Makes the caller the owner thread and drains the queue.
    /// ## Returns
    /// How many commands ran.
    fn dispatch_queue(&self) -> usize;

    /// Runs `command` immediately under the execution lock, on any thread.
    fn lockup(&self, command: Box<dyn FnOnce() + '_>);

    /// The graphics API of the active backend.
    fn backend_type(&self) -> GraphicsBackendType;

    /// The shader language the active backend consumes.
    fn shader_model(&self) -> ShaderModel;

    /// Information about the adapter in use.
    fn adapter_info(&self) -> GraphicsAdapterInfo;

    /// Bytes per row of `width` pixels; 0 for unknown formats.
    fn row_pitch(&self, format: TextureFormat, width: u32) -> u32 {
        format::row_pitch(format, width)
    }

    /// Bytes per `width` x `height` slice; 0 for unknown formats.
    fn depth_pitch(&self, format: TextureFormat, width: u32, height: u32) -> u32 {
        format::depth_pitch(format, width, height)
    }

    /// Full mip chain length for a `width` x `height` image.
    fn mip_level(&self, width: u32, height: u32) -> u32 {
        format::mip_level_count(width, height)
    }

    /// Bytes per pixel; 0 for unknown formats.
    fn format_size(&self, format: TextureFormat) -> u32 {
        format::format_size(format)
    }
}
