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

//! The WGPU implementation of [`RenderBackend`].
//!
//! Every native object lives in a handle-keyed arena. WGPU has no standalone
//! fixed-function state objects, so depth/stencil, rasterizer, blend and
//! input-layout states are stored as the converted WGPU structs a pipeline
//! build would consume. Samplers are real `wgpu::Sampler`s.

use super::context::WgpuGraphicsContext;
use super::conversions::{self, IntoWgpu};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tessera_core::math::{Extent3D, Origin3D};
use tessera_core::platform::window::NativeWindowHandle;
use tessera_core::renderer::api::util::format;
use tessera_core::renderer::{
    BlendStateDescriptor, CpuTexture, DepthStencilStateDescriptor, GraphicsAdapterInfo,
    GraphicsBackendType, InputLayoutDescriptor, RasterizerStateDescriptor, RenderBackend,
    ResourceError, SamplerDescriptor, ShaderCode, ShaderError, ShaderModel,
    ShaderModuleDescriptor, ShaderModuleId, StateObjectId, TextureDescriptor, TextureFormat,
    TextureId,
};

/// How long a readback waits for the staging buffer to map.
const MAP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct WgpuShaderModuleEntry {
    wgpu_module: Arc<wgpu::ShaderModule>,
    entry_point: String,
}

#[derive(Debug)]
struct WgpuTextureEntry {
    wgpu_texture: Arc<wgpu::Texture>,
    size: Extent3D,
    format: TextureFormat,
}

/// An owned vertex buffer layout, borrowed as a `wgpu::VertexBufferLayout`
/// when a pipeline is built.
#[derive(Debug, Clone)]
pub struct WgpuVertexLayout {
    pub array_stride: u64,
    pub step_mode: wgpu::VertexStepMode,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl WgpuVertexLayout {
    pub fn as_buffer_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}

/// A fixed-function state object in its WGPU form.
#[derive(Debug, Clone)]
pub enum WgpuStateEntry {
    DepthStencil(wgpu::DepthStencilState),
    Rasterizer {
        primitive: wgpu::PrimitiveState,
        bias: wgpu::DepthBiasState,
    },
    Blend {
        blend: Option<wgpu::BlendState>,
        write_mask: wgpu::ColorWrites,
        alpha_to_coverage: bool,
    },
    Sampler(Arc<wgpu::Sampler>),
    InputLayout(WgpuVertexLayout),
}

/// A [`RenderBackend`] over one WGPU device.
#[derive(Debug)]
pub struct WgpuBackend {
    context: WgpuGraphicsContext,
    shader_modules: Mutex<HashMap<ShaderModuleId, WgpuShaderModuleEntry>>,
    states: Mutex<HashMap<StateObjectId, WgpuStateEntry>>,
    textures: Mutex<HashMap<TextureId, WgpuTextureEntry>>,

    next_shader_id: AtomicUsize,
    next_state_id: AtomicUsize,
    next_texture_id: AtomicUsize,
}

impl WgpuBackend {
    /// Creates a backend on the first adapter serving `backends`.
    ///
    /// ## Arguments
    /// * `backends` - The graphics APIs to consider.
    /// * `window` - The window to present to, or `None` to run headless.
    /// * `label` - Debug label of the logical device.
    ///
    /// ## Errors
    /// Fails if no adapter or logical device can be obtained.
    pub fn new(
        backends: wgpu::Backends,
        window: Option<NativeWindowHandle>,
        label: &str,
    ) -> anyhow::Result<Self> {
        let context = pollster::block_on(WgpuGraphicsContext::new(backends, window, label))?;
        Ok(Self::with_context(context))
    }

    /// Wraps an already initialized context.
    pub fn with_context(context: WgpuGraphicsContext) -> Self {
        Self {
            context,
            shader_modules: Mutex::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
            textures: Mutex::new(HashMap::new()),
            next_shader_id: AtomicUsize::new(0),
            next_state_id: AtomicUsize::new(0),
            next_texture_id: AtomicUsize::new(0),
        }
    }

    /// The underlying context.
    pub fn context(&self) -> &WgpuGraphicsContext {
        &self.context
    }

    /// The WGPU module and entry point behind `id`.
    pub fn wgpu_shader_module(&self, id: ShaderModuleId) -> Option<(Arc<wgpu::ShaderModule>, String)> {
        let modules = lock(&self.shader_modules, "shader_modules").ok()?;
        modules
            .get(&id)
            .map(|entry| (Arc::clone(&entry.wgpu_module), entry.entry_point.clone()))
    }

    /// The WGPU form of a state object.
    pub fn wgpu_state(&self, id: StateObjectId) -> Option<WgpuStateEntry> {
        lock(&self.states, "states").ok()?.get(&id).cloned()
    }

    /// The WGPU texture behind `id`.
    pub fn wgpu_texture(&self, id: TextureId) -> Option<Arc<wgpu::Texture>> {
        let textures = lock(&self.textures, "textures").ok()?;
        textures.get(&id).map(|entry| Arc::clone(&entry.wgpu_texture))
    }

    // --- ID Generation Helpers ---

    fn generate_shader_id(&self) -> ShaderModuleId {
        ShaderModuleId(self.next_shader_id.fetch_add(1, Ordering::Relaxed))
    }

    fn generate_state_id(&self) -> StateObjectId {
        StateObjectId(self.next_state_id.fetch_add(1, Ordering::Relaxed))
    }

    fn generate_texture_id(&self) -> TextureId {
        TextureId(self.next_texture_id.fetch_add(1, Ordering::Relaxed))
    }

    fn insert_state(&self, kind: &str, entry: WgpuStateEntry) -> Result<StateObjectId, ResourceError> {
        let id = self.generate_state_id();
        lock(&self.states, "states")?.insert(id, entry);
        log::debug!("WgpuBackend: Created {kind} state with ID: {id:?}");
        Ok(id)
    }

    /// Maps `staging` for reading, polling the device until the callback fires.
    fn map_staging(&self, staging: &wgpu::Buffer) -> Result<(), ResourceError> {
        let (sender, receiver) = mpsc::channel();
        staging
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = sender.send(result);
            });

        let deadline = Instant::now() + MAP_TIMEOUT;
        loop {
            if let Err(e) = self.context.device.poll(wgpu::PollType::Poll) {
                return Err(ResourceError::BackendError(format!(
                    "Device poll failed during readback: {e:?}"
                )));
            }
            match receiver.try_recv() {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => {
                    return Err(ResourceError::BackendError(format!(
                        "Staging buffer map failed: {e}"
                    )))
                }
                Err(TryRecvError::Empty) if Instant::now() < deadline => std::thread::yield_now(),
                Err(_) => {
                    return Err(ResourceError::BackendError(
                        "Staging buffer map never completed".to_string(),
                    ))
                }
            }
        }
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, ResourceError> {
    mutex
        .lock()
        .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned ({what}): {e}")))
}

impl RenderBackend for WgpuBackend {
    fn backend_type(&self) -> GraphicsBackendType {
        conversions::backend_type_from_wgpu(self.context.adapter_backend)
    }

    fn shader_model(&self) -> ShaderModel {
        ShaderModel::Canonical
    }

    fn adapter_info(&self) -> GraphicsAdapterInfo {
        GraphicsAdapterInfo {
            name: self.context.adapter_name.clone(),
            backend_type: self.backend_type(),
            device_type: conversions::device_type_from_wgpu(self.context.adapter_device_type),
        }
    }

    // --- Shader Module Operations ---

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let label = descriptor.label;
        let ShaderCode::Wgsl(source) = &descriptor.code else {
            return Err(ShaderError::CompilationError {
                label: label.unwrap_or_default().to_string(),
                details: format!("WGPU consumes WGSL, got {}", descriptor.code.language()),
            }
            .into());
        };

        log::debug!("WgpuBackend: Creating wgpu::ShaderModule with label: {label:?}");
        let wgpu_module = self
            .context
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label,
                source: wgpu::ShaderSource::Wgsl(source.clone()),
            });

        let id = self.generate_shader_id();
        lock(&self.shader_modules, "shader_modules")?.insert(
            id,
            WgpuShaderModuleEntry {
                wgpu_module: Arc::new(wgpu_module),
                entry_point: descriptor.entry_point.to_string(),
            },
        );

        log::info!(
            "WgpuBackend: Created shader module '{}' with ID: {:?}",
            label.unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        if lock(&self.shader_modules, "shader_modules")?.remove(&id).is_some() {
            log::debug!("WgpuBackend: Destroyed shader module with ID: {id:?}");
            Ok(())
        } else {
            Err(ShaderError::NotFound { id }.into())
        }
    }

    // --- Fixed-function State Operations ---

    fn create_depth_stencil_state(
        &self,
        descriptor: &DepthStencilStateDescriptor,
    ) -> Result<StateObjectId, ResourceError> {
        descriptor.validate()?;
        let state: Option<wgpu::DepthStencilState> = descriptor.into_wgpu();
        let state = state.ok_or_else(|| {
            ResourceError::InvalidDescriptor(format!(
                "depth format {:?} has no WGPU equivalent",
                descriptor.format
            ))
        })?;
        self.insert_state("depth/stencil", WgpuStateEntry::DepthStencil(state))
    }

    fn create_rasterizer_state(
        &self,
        descriptor: &RasterizerStateDescriptor,
    ) -> Result<StateObjectId, ResourceError> {
        let entry = WgpuStateEntry::Rasterizer {
            primitive: descriptor.into_wgpu(),
            bias: descriptor.into_wgpu(),
        };
        self.insert_state("rasterizer", entry)
    }

    fn create_blend_state(
        &self,
        descriptor: &BlendStateDescriptor,
    ) -> Result<StateObjectId, ResourceError> {
        let entry = WgpuStateEntry::Blend {
            blend: descriptor.into_wgpu(),
            write_mask: descriptor.write_mask.into_wgpu(),
            alpha_to_coverage: descriptor.alpha_to_coverage,
        };
        self.insert_state("blend", entry)
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<StateObjectId, ResourceError> {
        let wgpu_sampler_descriptor = wgpu::SamplerDescriptor {
            label: descriptor.label.as_deref(),
            address_mode_u: descriptor.address_mode_u.into_wgpu(),
            address_mode_v: descriptor.address_mode_v.into_wgpu(),
            address_mode_w: descriptor.address_mode_w.into_wgpu(),
            mag_filter: descriptor.mag_filter.into_wgpu(),
            min_filter: descriptor.min_filter.into_wgpu(),
            mipmap_filter: descriptor.mipmap_filter.into_wgpu(),
            lod_min_clamp: descriptor.lod_min_clamp,
            lod_max_clamp: descriptor.lod_max_clamp,
            compare: descriptor.compare.map(|f| f.into_wgpu()),
            anisotropy_clamp: descriptor.anisotropy_clamp,
            border_color: descriptor.border_color.map(|c| c.into_wgpu()),
        };

        let wgpu_sampler = self.context.device.create_sampler(&wgpu_sampler_descriptor);
        self.insert_state("sampler", WgpuStateEntry::Sampler(Arc::new(wgpu_sampler)))
    }

    fn create_input_layout(
        &self,
        descriptor: &InputLayoutDescriptor,
    ) -> Result<StateObjectId, ResourceError> {
        descriptor.validate()?;
        let layout = WgpuVertexLayout {
            array_stride: descriptor.array_stride,
            step_mode: descriptor.step_mode.into_wgpu(),
            attributes: descriptor
                .attributes
                .iter()
                .map(|attr_desc| wgpu::VertexAttribute {
                    format: attr_desc.format.into_wgpu(),
                    offset: attr_desc.offset,
                    shader_location: attr_desc.shader_location,
                })
                .collect(),
        };
        self.insert_state("input layout", WgpuStateEntry::InputLayout(layout))
    }

    fn release_state_object(&self, id: StateObjectId) -> Result<(), ResourceError> {
        if lock(&self.states, "states")?.remove(&id).is_some() {
            log::debug!("WgpuBackend: Released state object with ID: {id:?}");
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }

    // --- Texture Operations ---

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let format: Option<wgpu::TextureFormat> = descriptor.format.into_wgpu();
        let format = format.ok_or_else(|| {
            ResourceError::InvalidDescriptor(format!(
                "texture format {:?} has no WGPU equivalent",
                descriptor.format
            ))
        })?;

        let wgpu_texture = self.context.device.create_texture(&wgpu::TextureDescriptor {
            label: descriptor.label.as_deref(),
            size: descriptor.size.into_wgpu(),
            mip_level_count: descriptor.mip_level_count,
            sample_count: descriptor.sample_count.into_wgpu(),
            dimension: descriptor.dimension.into_wgpu(),
            format,
            usage: descriptor.usage.into_wgpu(),
            view_formats: &[],
        });

        let id = self.generate_texture_id();
        lock(&self.textures, "textures")?.insert(
            id,
            WgpuTextureEntry {
                wgpu_texture: Arc::new(wgpu_texture),
                size: descriptor.size,
                format: descriptor.format,
            },
        );

        log::info!(
            "WgpuBackend: Created texture '{}' with ID: {:?}, {} bytes at level 0",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            descriptor.base_level_size()
        );
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
        let textures = lock(&self.textures, "textures")?;
        let entry = textures.get(&id).ok_or(ResourceError::NotFound)?;

        let fits = origin.x + size.width <= entry.size.width
            && origin.y + size.height <= entry.size.height
            && origin.z + size.depth_or_array_layers <= entry.size.depth_or_array_layers;
        let row = bytes_per_row.unwrap_or_else(|| format::row_pitch(entry.format, size.width));
        let needed = row as usize * size.height as usize * size.depth_or_array_layers as usize;
        if !fits || data.len() < needed {
            return Err(ResourceError::OutOfBounds);
        }

        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &entry.wgpu_texture,
                mip_level: 0,
                origin: origin.into_wgpu(),
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(row),
                rows_per_image: Some(size.height),
            },
            size.into_wgpu(),
        );
        log::debug!(
            "WgpuBackend: Wrote {} bytes to texture ID: {:?} at offset {:?}",
            data.len(),
            id,
            origin
        );
        Ok(())
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        if let Some(entry) = lock(&self.textures, "textures")?.remove(&id) {
            entry.wgpu_texture.destroy();
            log::debug!("WgpuBackend: Destroyed texture with ID: {id:?}");
            Ok(())
        } else {
            Err(ResourceError::NotFound)
        }
    }

    fn read_texture(&self, id: TextureId) -> Result<CpuTexture, ResourceError> {
        let (texture, size, texture_format) = {
            let textures = lock(&self.textures, "textures")?;
            let entry = textures.get(&id).ok_or(ResourceError::NotFound)?;
            (Arc::clone(&entry.wgpu_texture), entry.size, entry.format)
        };
        if texture_format.is_compressed() || texture_format.is_depth_stencil() {
            return Err(ResourceError::InvalidDescriptor(format!(
                "readback of {texture_format:?} textures is not supported"
            )));
        }

        let unpadded_row = format::row_pitch(texture_format, size.width);
        let padded_row = unpadded_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let rows = size.height * size.depth_or_array_layers;

        let device = &self.context.device;
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Tessera Readback Staging"),
            size: padded_row as u64 * rows as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Tessera Readback"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(size.height),
                },
            },
            size.into_wgpu(),
        );
        self.context.queue.submit(Some(encoder.finish()));

        let result = self.map_staging(&staging).map(|()| {
            let mapped = staging.slice(..).get_mapped_range();
            let mut pixels = Vec::with_capacity(unpadded_row as usize * rows as usize);
            for row in mapped.chunks(padded_row as usize) {
                pixels.extend_from_slice(&row[..unpadded_row as usize]);
            }
            drop(mapped);
            staging.unmap();
            pixels
        });
        // The staging buffer never outlives the readback, mapped or not.
        staging.destroy();

        let pixels = result?;
        log::debug!(
            "WgpuBackend: Read back {} bytes from texture ID: {:?}",
            pixels.len(),
            id
        );
        Ok(CpuTexture {
            pixels,
            size,
            format: texture_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::renderer::{ShaderStage, TextureDescriptor};

    fn backend() -> Option<WgpuBackend> {
        match WgpuBackend::new(wgpu::Backends::all(), None, "Tessera Test Device") {
            Ok(backend) => Some(backend),
            Err(e) => {
                println!("Skipping test: no WGPU adapter available ({e})");
                None
            }
        }
    }

    #[test]
    fn test_texture_readback_round_trip() {
        let Some(backend) = backend() else {
            return;
        };

        let descriptor = TextureDescriptor::d2("readback", 3, 2, TextureFormat::Rgba8Unorm);
        let id = backend.create_texture(&descriptor).unwrap();
        let pixels: Vec<u8> = (0..3 * 2 * 4).map(|i| i as u8).collect();
        backend
            .write_texture(id, &pixels, None, Origin3D::ZERO, descriptor.size)
            .unwrap();

        let readback = backend.read_texture(id).unwrap();
        assert_eq!(readback.pixels, pixels);
        assert_eq!(readback.size, descriptor.size);

        backend.destroy_texture(id).unwrap();
        assert!(matches!(
            backend.read_texture(id),
            Err(ResourceError::NotFound)
        ));
    }

    #[test]
    fn test_wgsl_only_shader_model() {
        let Some(backend) = backend() else {
            return;
        };
        assert_eq!(backend.shader_model(), ShaderModel::Canonical);

        let descriptor = ShaderModuleDescriptor {
            label: Some("spirv"),
            code: ShaderCode::SpirV(vec![0x0723_0203].into()),
            stage: ShaderStage::Vertex,
            entry_point: "vs_main",
        };
        assert!(matches!(
            backend.create_shader_module(&descriptor),
            Err(ResourceError::Shader(ShaderError::CompilationError { .. }))
        ));
    }

    #[test]
    fn test_write_out_of_bounds_is_rejected() {
        let Some(backend) = backend() else {
            return;
        };
        let descriptor = TextureDescriptor::d2("bounds", 2, 2, TextureFormat::R8Unorm);
        let id = backend.create_texture(&descriptor).unwrap();
        let result = backend.write_texture(
            id,
            &[0; 16],
            None,
            Origin3D { x: 1, y: 0, z: 0 },
            descriptor.size,
        );
        assert!(matches!(result, Err(ResourceError::OutOfBounds)));
    }
}
