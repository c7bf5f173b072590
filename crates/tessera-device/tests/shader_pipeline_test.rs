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

use std::fs;
use std::sync::Arc;
use tessera_core::renderer::{ShaderDescriptor, ShaderModel, ShaderStage, TargetLanguage};
use tessera_device::{Device, DeviceConfig, GraphicsDevice};
use tessera_infra::HeadlessBackend;

const BASIC_WGSL: &str = r#"#include "@tint"

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return TINT;
}
"#;

const TINT_SECTION: &str = "#if FOO
const TINT: vec4<f32> = vec4<f32>(1.0, 0.0, 0.0, 1.0);
#else
const TINT: vec4<f32> = vec4<f32>(0.0, 0.0, 1.0, 1.0);
#endif
";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn basic_fragment() -> ShaderDescriptor {
    ShaderDescriptor::new("basic.wgsl", BASIC_WGSL, ShaderStage::Fragment).with_define("FOO")
}

fn spirv_device(cache_dir: &std::path::Path) -> Device {
    let config = DeviceConfig::headless(Some(TargetLanguage::SpirV)).with_program_cache(cache_dir);
    let mut device = Device::new(config).expect("Headless device should always build");
    device
        .add_section("tint.wgsl", TINT_SECTION)
        .expect("Section name has an extension");
    device
}

fn glsl_device(cache_dir: &std::path::Path, target: TargetLanguage) -> (Device, Arc<HeadlessBackend>) {
    let backend = Arc::new(HeadlessBackend::new(ShaderModel::Translated(target)));
    let config = DeviceConfig::headless(Some(target)).with_program_cache(cache_dir);
    let mut device = Device::with_backend(config, Box::new(Arc::clone(&backend)))
        .expect("Headless device should always build");
    device
        .add_section("tint.wgsl", TINT_SECTION)
        .expect("Section name has an extension");
    (device, backend)
}

fn cached_programs(dir: &std::path::Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_second_compile_is_served_from_program_cache() {
    init_logging();

    // --- 1. ARRANGE ---
    let cache_dir = tempfile::tempdir().unwrap();
    let device = spirv_device(cache_dir.path());
    assert_eq!(device.shader_model(), ShaderModel::Translated(TargetLanguage::SpirV));
    assert!(cached_programs(cache_dir.path()).is_empty());

    // --- 2. ACT ---
    let first = device.create_shader(&basic_fragment());
    let second = device.create_shader(&basic_fragment());

    // --- 3. ASSERT ---
    assert!(first.is_some(), "First compile should succeed");
    assert!(second.is_some(), "Cached compile should succeed");
    assert_ne!(first, second, "Each call creates its own module");

    let stats = device.stats();
    assert_eq!(stats.transpilations, 1, "Only the first call may transpile");
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.shaders_created, 2);

    let programs = cached_programs(cache_dir.path());
    assert_eq!(programs.len(), 1);
    assert!(programs[0].ends_with(".spv"));
}

#[test]
fn test_program_cache_survives_device_restart() {
    init_logging();

    // --- 1. ARRANGE ---
    let cache_dir = tempfile::tempdir().unwrap();
    {
        let warmup = spirv_device(cache_dir.path());
        assert!(warmup.create_shader(&basic_fragment()).is_some());
    }

    // --- 2. ACT ---
    let device = spirv_device(cache_dir.path());
    let id = device.create_shader(&basic_fragment());

    // --- 3. ASSERT ---
    assert!(id.is_some());
    assert_eq!(device.stats().transpilations, 0);
    assert_eq!(device.stats().cache_hits, 1);
}

#[test]
fn test_different_defines_get_their_own_program() {
    init_logging();

    // --- 1. ARRANGE ---
    let cache_dir = tempfile::tempdir().unwrap();
    let device = spirv_device(cache_dir.path());
    let without_foo = ShaderDescriptor::new("basic.wgsl", BASIC_WGSL, ShaderStage::Fragment);

    // --- 2. ACT ---
    assert!(device.create_shader(&basic_fragment()).is_some());
    assert!(device.create_shader(&without_foo).is_some());

    // --- 3. ASSERT ---
    assert_eq!(device.stats().transpilations, 2);
    assert_eq!(cached_programs(cache_dir.path()).len(), 2);
}

#[test]
fn test_corrupt_cache_entry_falls_back_to_transpiling() {
    init_logging();

    // --- 1. ARRANGE ---
    let cache_dir = tempfile::tempdir().unwrap();
    let device = spirv_device(cache_dir.path());
    assert!(device.create_shader(&basic_fragment()).is_some());
    let entry = cache_dir.path().join(&cached_programs(cache_dir.path())[0]);
    fs::write(&entry, [8, 0, 0, 0, 0xf0]).unwrap();

    // --- 2. ACT ---
    let id = device.create_shader(&basic_fragment());

    // --- 3. ASSERT ---
    assert!(id.is_some(), "A corrupt entry must not fail the compile");
    assert_eq!(device.stats().transpilations, 2);
    assert_eq!(device.stats().cache_hits, 0);
}

#[test]
fn test_disabled_cache_transpiles_every_time() {
    init_logging();

    // --- 1. ARRANGE ---
    let mut device = Device::new(DeviceConfig::headless(Some(TargetLanguage::SpirV))).unwrap();
    device.add_section("tint.wgsl", TINT_SECTION).unwrap();
    assert!(!device.program_cache().is_enabled());

    // --- 2. ACT ---
    for _ in 0..2 {
        assert!(device.create_shader(&basic_fragment()).is_some());
    }

    // --- 3. ASSERT ---
    let stats = device.stats();
    assert_eq!(stats.transpilations, 2);
    assert_eq!(stats.cache_hits + stats.cache_misses, 0);
}

#[test]
fn test_invalid_shader_fails_without_touching_cache() {
    init_logging();

    // --- 1. ARRANGE ---
    let cache_dir = tempfile::tempdir().unwrap();
    let device = spirv_device(cache_dir.path());
    let broken = ShaderDescriptor::new(
        "broken.wgsl",
        "@fragment fn fs_main() -> @location(0) vec4<f32> { return 1.0 +; }",
        ShaderStage::Fragment,
    );
    let geometry = ShaderDescriptor::new("basic.wgsl", BASIC_WGSL, ShaderStage::Geometry);

    // --- 2. ACT ---
    let broken_id = device.create_shader(&broken);
    let geometry_id = device.create_shader(&geometry);

    // --- 3. ASSERT ---
    assert_eq!(broken_id, None);
    assert_eq!(geometry_id, None);
    assert_eq!(device.stats().shader_failures, 2);
    assert!(cached_programs(cache_dir.path()).is_empty());
}

#[test]
fn test_glsl_versions_sharing_a_cache_directory_stay_apart() {
    init_logging();

    // --- 1. ARRANGE ---
    let cache_dir = tempfile::tempdir().unwrap();
    let (modern, modern_backend) = glsl_device(cache_dir.path(), TargetLanguage::Glsl450);
    let (legacy, legacy_backend) = glsl_device(cache_dir.path(), TargetLanguage::Glsl330);

    // --- 2. ACT ---
    let modern_module = modern.create_shader(&basic_fragment()).expect("GLSL 450 compile");
    let legacy_module = legacy.create_shader(&basic_fragment()).expect("GLSL 330 compile");

    // --- 3. ASSERT ---
    let modern_source = modern_backend.shader_source(modern_module).unwrap();
    let legacy_source = legacy_backend.shader_source(legacy_module).unwrap();
    assert!(modern_source.starts_with("#version 450"), "got: {modern_source}");
    assert!(legacy_source.starts_with("#version 330"), "got: {legacy_source}");

    let stats = legacy.stats();
    assert_eq!(stats.transpilations, 1, "GLSL 330 must not reuse the 450 program");
    assert_eq!(stats.cache_hits, 0);
    assert_eq!(cached_programs(cache_dir.path()).len(), 2);
}
