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

//! A CPU-only [`RenderBackend`] for tests and offline tools.
//!
//! Objects live in the same kind of handle arenas as on a GPU backend, and
//! textures keep their level-0 pixels in memory. The backend accepts shader
//! code in exactly one language, chosen at construction, which lets the
//! device's cross-compilation path run without a GPU.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tessera_core::math::{Extent3D, Origin3D};
use tessera_core::renderer::api::util::format;
use tessera_core::renderer::{
    BlendStateDescriptor, CpuTexture, DepthStencilStateDescriptor, GraphicsAdapterInfo,
    GraphicsBackendType, InputLayoutDescriptor, RasterizerStateDescriptor, RenderBackend,
    RendererDeviceType, ResourceError, SamplerDescriptor, ShaderCode, ShaderError, ShaderModel,
    ShaderModuleDescriptor, ShaderModuleId, StateObjectId, TextureDescriptor, TextureFormat,
    TextureId,
};

/// What kind of fixed-function state an arena slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    /// Depth/stencil state.
    DepthStencil,
    /// Rasterizer state.
    Rasterizer,
    /// Blend state.
    Blend,
    /// Sampler.
    Sampler,
    /// Vertex input layout.
    InputLayout,
}

#[derive(Debug)]
struct HeadlessTexture {
    size: Extent3D,
    format: TextureFormat,
    pixels: Vec<u8>,
}

/// Number of live objects per arena.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveObjects {
    /// Shader modules.
    pub shader_modules: usize,
    /// State objects of every kind.
    pub state_objects: usize,
    /// Textures.
    pub textures: usize,
    /// Staging buffers held by in-flight readbacks.
    pub staging_buffers: usize,
}

impl LiveObjects {
    /// Returns `true` when nothing is alive.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A backend that keeps every resource in host memory.
#[derive(Debug)]
pub struct HeadlessBackend {
    shader_model: ShaderModel,
    shader_modules: Mutex<HashMap<ShaderModuleId, String>>,
    states: Mutex<HashMap<StateObjectId, StateKind>>,
    textures: Mutex<HashMap<TextureId, HeadlessTexture>>,
    staging_buffers: AtomicUsize,
    fail_staging_map: AtomicBool,
    fail_state_creation: AtomicBool,

    next_shader_id: AtomicUsize,
    next_state_id: AtomicUsize,
    next_texture_id: AtomicUsize,
}

impl HeadlessBackend {
    /// Creates a backend consuming shaders of `shader_model`.
    pub fn new(shader_model: ShaderModel) -> Self {
        log::info!("HeadlessBackend: Created with shader model {shader_model:?}");
        Self {
            shader_model,
            shader_modules: Mutex::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
            textures: Mutex::new(HashMap::new()),
            staging_buffers: AtomicUsize::new(0),
            fail_staging_map: AtomicBool::new(false),
            fail_state_creation: AtomicBool::new(false),
            next_shader_id: AtomicUsize::new(0),
            next_state_id: AtomicUsize::new(0),
            next_texture_id: AtomicUsize::new(0),
        }
    }

    /// Makes every readback fail at the map step while `fail` is set.
    pub fn set_staging_map_failure(&self, fail: bool) {
        self.fail_staging_map.store(fail, Ordering::Relaxed);
    }

    /// Makes every state object creation fail while `fail` is set.
    pub fn set_state_creation_failure(&self, fail: bool) {
        self.fail_state_creation.store(fail, Ordering::Relaxed);
    }

    /// Counts the objects currently alive.
    pub fn live_objects(&self) -> LiveObjects {
        let count = |len: Result<usize, ResourceError>| len.unwrap_or_default();
        LiveObjects {
            shader_modules: count(lock(&self.shader_modules, "shader_modules").map(|m| m.len())),
            state_objects: count(lock(&self.states, "states").map(|m| m.len())),
            textures: count(lock(&self.textures, "textures").map(|m| m.len())),
            staging_buffers: self.staging_buffers.load(Ordering::Relaxed),
        }
    }

    /// The kind of a live state object.
    pub fn state_kind(&self, id: StateObjectId) -> Option<StateKind> {
        lock(&self.states, "states").ok()?.get(&id).copied()
    }

    /// The source text of a live shader module. SPIR-V is kept as its words.
    pub fn shader_source(&self, id: ShaderModuleId) -> Option<String> {
        lock(&self.shader_modules, "shader_modules").ok()?.get(&id).cloned()
    }

    fn insert_state(&self, kind: StateKind) -> Result<StateObjectId, ResourceError> {
        if self.fail_state_creation.load(Ordering::Relaxed) {
            return Err(ResourceError::BackendError(format!(
                "injected failure creating {kind:?} state"
            )));
        }
        let id = StateObjectId(self.next_state_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.states, "states")?.insert(id, kind);
        log::debug!("HeadlessBackend: Created {kind:?} state with ID: {id:?}");
        Ok(id)
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, ResourceError> {
    mutex
        .lock()
        .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned ({what}): {e}")))
}

/// A staging allocation that is released however the readback ends.
struct StagingGuard<'a>(&'a AtomicUsize);

impl<'a> StagingGuard<'a> {
    fn acquire(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for StagingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl RenderBackend for HeadlessBackend {
    fn backend_type(&self) -> GraphicsBackendType {
        GraphicsBackendType::Headless
    }

    fn shader_model(&self) -> ShaderModel {
        self.shader_model
    }

    fn adapter_info(&self) -> GraphicsAdapterInfo {
        GraphicsAdapterInfo {
            name: "Tessera Headless".to_string(),
            backend_type: GraphicsBackendType::Headless,
            device_type: RendererDeviceType::Cpu,
        }
    }

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let label = descriptor.label.unwrap_or_default();
        if !descriptor.code.matches_model(self.shader_model) {
            return Err(ShaderError::CompilationError {
                label: label.to_string(),
                details: format!(
                    "{} code given to a backend expecting {:?}",
                    descriptor.code.language(),
                    self.shader_model
                ),
            }
            .into());
        }

        let text = match &descriptor.code {
            ShaderCode::SpirV(words) => words
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(" "),
            ShaderCode::Wgsl(text)
            | ShaderCode::Glsl(text)
            | ShaderCode::Hlsl(text)
            | ShaderCode::Msl(text) => text.to_string(),
        };

        let id = ShaderModuleId(self.next_shader_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.shader_modules, "shader_modules")?.insert(id, text);
        log::debug!("HeadlessBackend: Created shader module '{label}' with ID: {id:?}");
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        match lock(&self.shader_modules, "shader_modules")?.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ShaderError::NotFound { id }.into()),
        }
    }

    fn create_depth_stencil_state(
        &self,
        descriptor: &DepthStencilStateDescriptor,
    ) -> Result<StateObjectId, ResourceError> {
        descriptor.validate()?;
        self.insert_state(StateKind::DepthStencil)
    }

    fn create_rasterizer_state(
        &self,
        _descriptor: &RasterizerStateDescriptor,
    ) -> Result<StateObjectId, ResourceError> {
        self.insert_state(StateKind::Rasterizer)
    }

    fn create_blend_state(
        &self,
        _descriptor: &BlendStateDescriptor,
    ) -> Result<StateObjectId, ResourceError> {
        self.insert_state(StateKind::Blend)
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<StateObjectId, ResourceError> {
        if descriptor.anisotropy_clamp == 0 {
            return Err(ResourceError::InvalidDescriptor(
                "anisotropy clamp must be at least 1".to_string(),
            ));
        }
        self.insert_state(StateKind::Sampler)
    }

    fn create_input_layout(
        &self,
        descriptor: &InputLayoutDescriptor,
    ) -> Result<StateObjectId, ResourceError> {
        descriptor.validate()?;
        self.insert_state(StateKind::InputLayout)
    }

    fn release_state_object(&self, id: StateObjectId) -> Result<(), ResourceError> {
        match lock(&self.states, "states")?.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ResourceError::NotFound),
        }
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        if descriptor.format == TextureFormat::Unknown {
            return Err(ResourceError::InvalidDescriptor(
                "texture format is unknown".to_string(),
            ));
        }
        let byte_len = usize::try_from(descriptor.base_level_size())
            .map_err(|_| ResourceError::InvalidDescriptor("texture is too large".to_string()))?;

        let id = TextureId(self.next_texture_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.textures, "textures")?.insert(
            id,
            HeadlessTexture {
                size: descriptor.size,
                format: descriptor.format,
                pixels: vec![0; byte_len],
            },
        );
        log::debug!("HeadlessBackend: Created texture with ID: {id:?}, {byte_len} bytes");
        Ok(id)
    }

    fn write_texture(
        &self,
        id: TextureId,
        data: &[u8],
        bytes_per_row: Option<u32>,
        origin: Origin3D,
        size: Extent3D,
    ) -> Result<(), ResourceError> {
        let mut textures = lock(&self.textures, "textures")?;
        let texture = textures.get_mut(&id).ok_or(ResourceError::NotFound)?;

        let within = |start: u32, len: u32, limit: u32| {
            start.checked_add(len).is_some_and(|end| end <= limit)
        };
        let fits = within(origin.x, size.width, texture.size.width)
            && within(origin.y, size.height, texture.size.height)
            && within(
                origin.z,
                size.depth_or_array_layers,
                texture.size.depth_or_array_layers,
            );
        if !fits {
            return Err(ResourceError::OutOfBounds);
        }

        let texel = format::format_size(texture.format) as usize;
        let copy_row = texel * size.width as usize;
        let src_row = bytes_per_row.map_or(copy_row, |row| row as usize);
        let dst_row = format::row_pitch(texture.format, texture.size.width) as usize;
        let dst_slice = dst_row * texture.size.height as usize;
        if src_row < copy_row {
            return Err(ResourceError::OutOfBounds);
        }

        for z in 0..size.depth_or_array_layers as usize {
            for y in 0..size.height as usize {
                let src = (z * size.height as usize + y) * src_row;
                let dst = (origin.z as usize + z) * dst_slice
                    + (origin.y as usize + y) * dst_row
                    + origin.x as usize * texel;
                let row = data
                    .get(src..src + copy_row)
                    .ok_or(ResourceError::OutOfBounds)?;
                texture.pixels[dst..dst + copy_row].copy_from_slice(row);
            }
        }
        Ok(())
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        match lock(&self.textures, "textures")?.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ResourceError::NotFound),
        }
    }

    fn read_texture(&self, id: TextureId) -> Result<CpuTexture, ResourceError> {
        let textures = lock(&self.textures, "textures")?;
        let texture = textures.get(&id).ok_or(ResourceError::NotFound)?;

        let staging = StagingGuard::acquire(&self.staging_buffers);
        if self.fail_staging_map.load(Ordering::Relaxed) {
            return Err(ResourceError::BackendError(
                "Staging buffer map failed (injected)".to_string(),
            ));
        }
        let pixels = texture.pixels.clone();
        drop(staging);

        Ok(CpuTexture {
            pixels,
            size: texture.size,
            format: texture.format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use tessera_core::renderer::{ShaderStage, TargetLanguage};

    fn module(code: ShaderCode<'_>) -> ShaderModuleDescriptor<'_> {
        ShaderModuleDescriptor {
            label: Some("test"),
            code,
            stage: ShaderStage::Fragment,
            entry_point: "fs_main",
        }
    }

    #[test]
    fn shader_language_must_match_the_model() {
        let backend = HeadlessBackend::new(ShaderModel::Translated(TargetLanguage::SpirV));

        let wgsl = module(ShaderCode::Wgsl(Cow::Borrowed("fn fs_main() {}")));
        assert!(matches!(
            backend.create_shader_module(&wgsl),
            Err(ResourceError::Shader(ShaderError::CompilationError { .. }))
        ));

        let spirv = module(ShaderCode::SpirV(Cow::Owned(vec![0x0723_0203, 1])));
        let id = backend.create_shader_module(&spirv).unwrap();
        assert_eq!(backend.shader_source(id).as_deref(), Some("119734787 1"));
        backend.destroy_shader_module(id).unwrap();
        assert!(backend.live_objects().is_empty());
    }

    #[test]
    fn glsl_model_accepts_any_glsl_flavour() {
        let backend = HeadlessBackend::new(ShaderModel::Translated(TargetLanguage::GlslEs300));
        let glsl = module(ShaderCode::Glsl(Cow::Borrowed("void main() {}")));
        assert!(backend.create_shader_module(&glsl).is_ok());
    }

    #[test]
    fn partial_writes_land_at_the_origin() {
        let backend = HeadlessBackend::new(ShaderModel::Canonical);
        let descriptor = TextureDescriptor::d2("partial", 4, 2, TextureFormat::R8Unorm);
        let id = backend.create_texture(&descriptor).unwrap();

        backend
            .write_texture(
                id,
                &[1, 2, 0xee, 3, 4, 0xee],
                Some(3),
                Origin3D { x: 2, y: 0, z: 0 },
                Extent3D::d2(2, 2),
            )
            .unwrap();

        let readback = backend.read_texture(id).unwrap();
        assert_eq!(readback.pixels, [0, 0, 1, 2, 0, 0, 3, 4]);
    }

    #[test]
    fn out_of_bounds_writes_are_rejected() {
        let backend = HeadlessBackend::new(ShaderModel::Canonical);
        let descriptor = TextureDescriptor::d2("bounds", 2, 2, TextureFormat::Rgba8Unorm);
        let id = backend.create_texture(&descriptor).unwrap();

        let past_edge = backend.write_texture(
            id,
            &[0; 16],
            None,
            Origin3D { x: 1, y: 0, z: 0 },
            descriptor.size,
        );
        let short_data = backend.write_texture(id, &[0; 8], None, Origin3D::ZERO, descriptor.size);

        assert!(matches!(past_edge, Err(ResourceError::OutOfBounds)));
        assert!(matches!(short_data, Err(ResourceError::OutOfBounds)));
    }

    #[test]
    fn origin_near_u32_max_is_out_of_bounds() {
        let backend = HeadlessBackend::new(ShaderModel::Canonical);
        let descriptor = TextureDescriptor::d2("wrap", 2, 2, TextureFormat::Rgba8Unorm);
        let id = backend.create_texture(&descriptor).unwrap();

        for origin in [
            Origin3D { x: u32::MAX, y: 0, z: 0 },
            Origin3D { x: 0, y: u32::MAX, z: 0 },
            Origin3D { x: 0, y: 0, z: u32::MAX },
        ] {
            let result = backend.write_texture(id, &[0; 16], None, origin, descriptor.size);
            assert!(matches!(result, Err(ResourceError::OutOfBounds)), "{origin:?}");
        }
    }

    #[test]
    fn failed_map_releases_the_staging_buffer() {
        let backend = HeadlessBackend::new(ShaderModel::Canonical);
        let descriptor = TextureDescriptor::d2("readback", 1, 1, TextureFormat::Rgba8Unorm);
        let id = backend.create_texture(&descriptor).unwrap();

        backend.set_staging_map_failure(true);
        assert!(backend.read_texture(id).is_err());
        assert_eq!(backend.live_objects().staging_buffers, 0);

        backend.set_staging_map_failure(false);
        assert!(backend.read_texture(id).is_ok());
        assert_eq!(backend.live_objects().staging_buffers, 0);
    }

    #[test]
    fn injected_state_failure_creates_nothing() {
        let backend = HeadlessBackend::new(ShaderModel::Canonical);
        backend.set_state_creation_failure(true);
        assert!(backend
            .create_rasterizer_state(&RasterizerStateDescriptor::default())
            .is_err());
        assert_eq!(backend.live_objects().state_objects, 0);
    }
}
