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

use crate::command_queue::CommandQueue;
use crate::config::DeviceConfig;
use crate::state_cache::StateCache;
use std::borrow::Cow;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tessera_core::math::Origin3D;
use tessera_core::platform::window::NativeWindowHandle;
use tessera_core::renderer::api::util::format;
use tessera_core::renderer::{
    BlendStateDescriptor, Command, CpuTexture, DepthStencilStateDescriptor, GraphicsAdapterInfo,
    GraphicsBackendType, GraphicsDevice, InputLayoutDescriptor, RasterizerStateDescriptor,
    RenderBackend, RenderError, ResourceError, SamplerDescriptor, ShaderCode, ShaderDescriptor,
    ShaderError, ShaderModel, ShaderModuleDescriptor, ShaderModuleId, StateObject,
    TargetLanguage, TextureDescriptor, TextureId,
};
use tessera_infra::create_backend_with_label;
use tessera_shader::{CrossCompiler, Preprocessor, ProgramCache, ShaderSectionRegistry};

/// A snapshot of the shader pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Shader modules handed out by `create_shader`.
    pub shaders_created: u64,
    /// `create_shader` calls that returned `None`.
    pub shader_failures: u64,
    /// Programs produced by the cross compiler.
    pub transpilations: u64,
    /// Programs loaded from the program cache.
    pub cache_hits: u64,
    /// Lookups in an enabled program cache that found nothing usable.
    pub cache_misses: u64,
}

#[derive(Debug, Default)]
struct Counters {
    shaders_created: AtomicU64,
    shader_failures: AtomicU64,
    transpilations: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DeviceStats {
        DeviceStats {
            shaders_created: self.shaders_created.load(Ordering::Relaxed),
            shader_failures: self.shader_failures.load(Ordering::Relaxed),
            transpilations: self.transpilations.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }
}

/// The graphics device: one render backend plus the shader pipeline, the
/// state catalogue and the command queue in front of it.
///
/// Sections and the include root are configured through `&mut self` before
/// the device is shared; everything else takes `&self`.
#[derive(Debug)]
pub struct Device {
    backend: Box<dyn RenderBackend>,
    registry: ShaderSectionRegistry,
    preprocessor: Preprocessor,
    compiler: CrossCompiler,
    program_cache: ProgramCache,
    states: StateCache,
    queue: CommandQueue,
    counters: Counters,
}

impl Device {
    /// Creates a device on the backend selected by `config`, without a window.
    ///
    /// ## Errors
    /// * `RenderError::UnsupportedBackend` or `InitializationFailed` - If the
    ///   backend cannot be built.
    /// * `RenderError::Configuration` - If the state catalogue cannot be built.
    pub fn new(config: DeviceConfig) -> Result<Self, RenderError> {
        Self::with_window(config, None)
    }

    /// Creates a device presenting to `window`. See [`Device::new`].
    pub fn with_window(
        config: DeviceConfig,
        window: Option<NativeWindowHandle>,
    ) -> Result<Self, RenderError> {
        let backend = create_backend_with_label(config.backend, window, &config.device_label)?;
        Self::with_backend(config, backend)
    }

    /// Creates a device on an already built backend.
    ///
    /// `config.backend` and `config.device_label` are ignored.
    ///
    /// ## Errors
    /// * `RenderError::Configuration` - If the state catalogue cannot be built.
    pub fn with_backend(
        config: DeviceConfig,
        backend: Box<dyn RenderBackend>,
    ) -> Result<Self, RenderError> {
        let info = backend.adapter_info();
        log::info!(
            "Device: Initializing on '{}' ({:?}, shader model {:?})",
            info.name,
            info.backend_type,
            backend.shader_model()
        );

        let preprocessor = match config.include_root {
            Some(root) => Preprocessor::with_include_root(root),
            None => Preprocessor::new(),
        };
        let program_cache =
            ProgramCache::new(config.program_cache.enabled, config.program_cache.directory);
        let states = StateCache::create_states(&*backend)?;

        Ok(Self {
            backend,
            registry: ShaderSectionRegistry::new(),
            preprocessor,
            compiler: CrossCompiler::new(),
            program_cache,
            states,
            queue: CommandQueue::new(),
            counters: Counters::default(),
        })
    }

    /// The backend all objects are created on.
    pub fn backend(&self) -> &dyn RenderBackend {
        &*self.backend
    }

    /// A snapshot of the shader pipeline counters.
    pub fn stats(&self) -> DeviceStats {
        self.counters.snapshot()
    }

    /// Registers a shader section, replacing one with the same name.
    ///
    /// ## Errors
    /// * `ShaderError::NoExtension` - If `name` has no file extension.
    pub fn add_section(
        &mut self,
        name: impl Into<String>,
        code: impl Into<String>,
    ) -> Result<(), ShaderError> {
        self.registry.add_section(name, code)
    }

    /// Unregisters a section. Returns `false` if it did not exist.
    pub fn remove_section(&mut self, name: &str) -> bool {
        self.registry.remove_section(name)
    }

    /// Looks up a section the way includes do.
    pub fn section(&self, name: &str) -> Option<&str> {
        self.registry.get_section(name)
    }

    /// The registered sections.
    pub fn registry(&self) -> &ShaderSectionRegistry {
        &self.registry
    }

    /// Directory file includes are resolved against.
    pub fn include_root(&self) -> &Path {
        self.preprocessor.include_root()
    }

    /// Changes the directory file includes are resolved against.
    pub fn set_include_root(&mut self, root: impl Into<std::path::PathBuf>) {
        self.preprocessor.set_include_root(root);
    }

    /// The store of cross-compiled programs.
    pub fn program_cache(&self) -> &ProgramCache {
        &self.program_cache
    }

    /// The named state objects.
    pub fn states(&self) -> &StateCache {
        &self.states
    }

    fn build_shader(&self, descriptor: &ShaderDescriptor) -> Result<ShaderModuleId, ResourceError> {
        let model = self.backend.shader_model();
        let mut processed = descriptor.clone();
        self.preprocessor
            .process(&mut processed, &self.registry, model)?;

        let code = match model.target() {
            None => ShaderCode::Wgsl(Cow::Owned(processed.source_code)),
            Some(target) => {
                let program = self.translated_program(&processed, model)?;
                shader_code(&descriptor.filename, target, program)?
            }
        };

        self.backend.create_shader_module(&ShaderModuleDescriptor {
            label: Some(descriptor.filename.as_str()),
            code,
            stage: descriptor.stage,
            entry_point: descriptor.stage.entry_point(),
        })
    }

    /// Loads the translated program from the cache, or cross-compiles and
    /// stores it.
    fn translated_program(
        &self,
        processed: &ShaderDescriptor,
        model: ShaderModel,
    ) -> Result<String, ShaderError> {
        let target = model.target().ok_or(ShaderError::TranslationNotRequired)?;
        let name = ProgramCache::compute_program_name(processed, target);

        if let Some(program) = self.program_cache.get_program_cache(&name) {
            Counters::bump(&self.counters.cache_hits);
            return Ok(program);
        }
        if self.program_cache.is_enabled() {
            Counters::bump(&self.counters.cache_misses);
        }

        let mut program = processed.source_code.clone();
        let output = self
            .compiler
            .transpile(&mut program, processed.stage, model)?;
        Counters::bump(&self.counters.transpilations);
        for pair in &output.combined_samplers {
            log::debug!(
                "Device: '{}' samples '{}' with '{}' at binding {}",
                processed.filename,
                pair.image,
                pair.sampler,
                pair.binding
            );
        }

        if let Err(e) = self.program_cache.set_program_cache(&name, &program) {
            log::warn!("Device: Could not cache '{}': {e}", processed.filename);
        }
        Ok(program)
    }
}

/// Wraps a translated program in the code variant of its language.
fn shader_code(
    label: &str,
    target: TargetLanguage,
    program: String,
) -> Result<ShaderCode<'static>, ShaderError> {
    let code = match target {
        TargetLanguage::SpirV => {
            let words = program
                .split_ascii_whitespace()
                .map(str::parse::<u32>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ShaderError::CompilationError {
                    label: label.to_string(),
                    details: format!("malformed SPIR-V program: {e}"),
                })?;
            ShaderCode::SpirV(Cow::Owned(words))
        }
        TargetLanguage::Hlsl => ShaderCode::Hlsl(Cow::Owned(program)),
        TargetLanguage::Msl => ShaderCode::Msl(Cow::Owned(program)),
        TargetLanguage::Glsl330
        | TargetLanguage::Glsl450
        | TargetLanguage::GlslEs300
        | TargetLanguage::GlslEs310 => ShaderCode::Glsl(Cow::Owned(program)),
    };
    Ok(code)
}

impl GraphicsDevice for Device {
    fn create_shader(&self, descriptor: &ShaderDescriptor) -> Option<ShaderModuleId> {
        match self.build_shader(descriptor) {
            Ok(id) => {
                Counters::bump(&self.counters.shaders_created);
                log::debug!(
                    "Device: Created shader '{}' ({:?}) as {id:?}",
                    descriptor.filename,
                    descriptor.stage
                );
                Some(id)
            }
            Err(e) => {
                Counters::bump(&self.counters.shader_failures);
                log::error!(
                    "Device: Failed to create shader '{}' ({:?}): {e}",
                    descriptor.filename,
                    descriptor.stage
                );
                None
            }
        }
    }

    fn destroy_shader(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        self.backend.destroy_shader_module(id)
    }

    fn depth_stencil_state(&self, name: &str) -> Option<&StateObject<DepthStencilStateDescriptor>> {
        self.states.get_depth_stencil(name)
    }

    fn rasterizer_state(&self, name: &str) -> Option<&StateObject<RasterizerStateDescriptor>> {
        self.states.get_rasterizer(name)
    }

    fn blend_state(&self, name: &str) -> Option<&StateObject<BlendStateDescriptor>> {
        self.states.get_blend(name)
    }

    fn sampler_state(&self, name: &str) -> Option<&StateObject<SamplerDescriptor<'static>>> {
        self.states.get_sampler(name)
    }

    fn input_layout(&self, name: &str) -> Option<&StateObject<InputLayoutDescriptor>> {
        self.states.get_input_layout(name)
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<TextureId, ResourceError> {
        let id = self.backend.create_texture(descriptor)?;
        let Some(data) = data else {
            return Ok(id);
        };

        let bytes_per_row = format::row_pitch(descriptor.format, descriptor.size.width);
        let upload = self.backend.write_texture(
            id,
            data,
            Some(bytes_per_row),
            Origin3D::ZERO,
            descriptor.size,
        );
        if let Err(e) = upload {
            if let Err(cleanup) = self.backend.destroy_texture(id) {
                log::warn!(
                    "Device: Failed to destroy texture {id:?} after upload error: {cleanup}"
                );
            }
            return Err(e);
        }
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        self.backend.destroy_texture(id)
    }

    fn create_surface(&self, texture: TextureId) -> Option<CpuTexture> {
        match self.backend.read_texture(texture) {
            Ok(surface) => Some(surface),
            Err(e) => {
                log::error!("Device: Failed to read back texture {texture:?}: {e}");
                None
            }
        }
    }

    fn enqueue(&self, command: Command) {
        self.queue.enqueue(command);
    }

    fn dispatch_queue(&self) -> usize {
        self.queue.dispatch_queue()
    }

    fn lockup(&self, command: Box<dyn FnOnce() + '_>) {
        self.queue.lockup(command);
    }

    fn backend_type(&self) -> GraphicsBackendType {
        self.backend.backend_type()
    }

    fn shader_model(&self) -> ShaderModel {
        self.backend.shader_model()
    }

    fn adapter_info(&self) -> GraphicsAdapterInfo {
        self.backend.adapter_info()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        let states = &mut self.states;
        let backend = &*self.backend;
        self.queue.lockup(Box::new(move || states.release(backend)));
        log::info!("Device: Shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::renderer::{ShaderStage, TextureFormat};
    use tessera_infra::HeadlessBackend;

    const FRAGMENT: &str = "@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
";

    fn headless_device() -> Device {
        Device::with_backend(
            DeviceConfig::headless(None),
            Box::new(HeadlessBackend::new(ShaderModel::Canonical)),
        )
        .unwrap()
    }

    #[test]
    fn canonical_backend_skips_translation() {
        let device = headless_device();
        let descriptor = ShaderDescriptor::new("flat.wgsl", FRAGMENT, ShaderStage::Fragment);

        assert!(device.create_shader(&descriptor).is_some());

        let stats = device.stats();
        assert_eq!(stats.shaders_created, 1);
        assert_eq!(stats.transpilations, 0);
        assert_eq!(stats.cache_misses, 0);
    }

    #[test]
    fn preprocess_failure_returns_none() {
        let device = headless_device();
        let descriptor = ShaderDescriptor::new(
            "broken.wgsl",
            "#include \"@missing.wgsl\"\n",
            ShaderStage::Fragment,
        );

        assert_eq!(device.create_shader(&descriptor), None);
        assert_eq!(device.stats().shader_failures, 1);
    }

    #[test]
    fn sections_are_editable_before_sharing() {
        let mut device = headless_device();
        device.add_section("common.wgsl", "const ONE: f32 = 1.0;").unwrap();
        assert_eq!(device.section("common"), Some("const ONE: f32 = 1.0;"));
        assert!(device.remove_section("common.wgsl"));
        assert!(!device.remove_section("common.wgsl"));
        assert!(device.add_section("common", "").is_err());
    }

    #[test]
    fn spirv_words_parse_or_fail() {
        let code =
            shader_code("a.wgsl", TargetLanguage::SpirV, "119734787 65536 0".into()).unwrap();
        assert_eq!(code, ShaderCode::SpirV(Cow::Owned(vec![119734787, 65536, 0])));

        assert!(matches!(
            shader_code("a.wgsl", TargetLanguage::SpirV, "1 two".into()),
            Err(ShaderError::CompilationError { .. })
        ));
    }

    #[test]
    fn short_upload_destroys_the_texture() {
        let device = headless_device();
        let descriptor = TextureDescriptor::d2("tiny", 4, 4, TextureFormat::Rgba8Unorm);

        let result = device.create_texture(&descriptor, Some(&[0u8; 8]));

        assert!(result.is_err());
        assert_eq!(device.create_surface(TextureId(0)), None);
    }

    #[test]
    fn pure_helpers_follow_the_format_table() {
        let device = headless_device();
        assert_eq!(device.format_size(TextureFormat::Rgba32Float), 16);
        assert_eq!(device.row_pitch(TextureFormat::Rgba8Unorm, 10), 40);
        assert_eq!(device.depth_pitch(TextureFormat::R16Float, 4, 3), 24);
        assert_eq!(device.mip_level(300, 200), 9);
    }
}
