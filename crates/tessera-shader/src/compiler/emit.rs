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

//! Per-target writers. Each one is compiled only with its feature; without
//! it the target reports `TargetUnsupported`.

use naga::valid::ModuleInfo;
use naga::{Module, ShaderStage};
use tessera_core::renderer::{ShaderError, TargetLanguage};

pub(super) fn emit(
    module: &Module,
    info: &ModuleInfo,
    stage: ShaderStage,
    entry_point: &str,
    target: TargetLanguage,
) -> Result<String, ShaderError> {
    match target {
        TargetLanguage::SpirV => spirv(module, info, stage, entry_point),
        TargetLanguage::Hlsl => hlsl(module, info),
        TargetLanguage::Msl => msl(module, info),
        TargetLanguage::Glsl330
        | TargetLanguage::Glsl450
        | TargetLanguage::GlslEs300
        | TargetLanguage::GlslEs310 => glsl(module, info, stage, entry_point, target),
    }
}

#[cfg(feature = "spv-out")]
fn spirv(
    module: &Module,
    info: &ModuleInfo,
    stage: ShaderStage,
    entry_point: &str,
) -> Result<String, ShaderError> {
    use naga::back::spv;

    let options = spv::Options::default();
    let pipeline = spv::PipelineOptions {
        shader_stage: stage,
        entry_point: entry_point.to_string(),
    };
    let words = spv::write_vec(module, info, &options, Some(&pipeline)).map_err(|err| {
        ShaderError::Emission {
            target: TargetLanguage::SpirV,
            details: err.to_string(),
        }
    })?;

    let text: Vec<String> = words.iter().map(u32::to_string).collect();
    Ok(text.join(" "))
}

#[cfg(not(feature = "spv-out"))]
fn spirv(_: &Module, _: &ModuleInfo, _: ShaderStage, _: &str) -> Result<String, ShaderError> {
    Err(ShaderError::TargetUnsupported {
        target: TargetLanguage::SpirV,
    })
}

#[cfg(feature = "glsl-out")]
fn glsl(
    module: &Module,
    info: &ModuleInfo,
    stage: ShaderStage,
    entry_point: &str,
    target: TargetLanguage,
) -> Result<String, ShaderError> {
    use naga::back::glsl;

    let version = match target {
        TargetLanguage::Glsl330 => glsl::Version::Desktop(330),
        TargetLanguage::Glsl450 => glsl::Version::Desktop(450),
        TargetLanguage::GlslEs300 => glsl::Version::Embedded {
            version: 300,
            is_webgl: false,
        },
        _ => glsl::Version::Embedded {
            version: 310,
            is_webgl: false,
        },
    };
    let options = glsl::Options {
        version,
        binding_map: super::binding_map(module),
        ..Default::default()
    };
    let pipeline = glsl::PipelineOptions {
        shader_stage: stage,
        entry_point: entry_point.to_string(),
        multiview: None,
    };

    let to_emission = |err: glsl::Error| ShaderError::Emission {
        target,
        details: err.to_string(),
    };
    let mut out = String::new();
    let mut writer = glsl::Writer::new(
        &mut out,
        module,
        info,
        &options,
        &pipeline,
        naga::proc::BoundsCheckPolicies::default(),
    )
    .map_err(to_emission)?;
    writer.write().map_err(to_emission)?;
    Ok(out)
}

#[cfg(not(feature = "glsl-out"))]
fn glsl(
    _: &Module,
    _: &ModuleInfo,
    _: ShaderStage,
    _: &str,
    target: TargetLanguage,
) -> Result<String, ShaderError> {
    Err(ShaderError::TargetUnsupported { target })
}

#[cfg(feature = "hlsl-out")]
fn hlsl(module: &Module, info: &ModuleInfo) -> Result<String, ShaderError> {
    use naga::back::hlsl;

    let options = hlsl::Options::default();
    let pipeline = hlsl::PipelineOptions::default();
    let mut out = String::new();
    let mut writer = hlsl::Writer::new(&mut out, &options, &pipeline);
    writer
        .write(module, info, None)
        .map_err(|err| ShaderError::Emission {
            target: TargetLanguage::Hlsl,
            details: err.to_string(),
        })?;
    Ok(out)
}

#[cfg(not(feature = "hlsl-out"))]
fn hlsl(_: &Module, _: &ModuleInfo) -> Result<String, ShaderError> {
    Err(ShaderError::TargetUnsupported {
        target: TargetLanguage::Hlsl,
    })
}

#[cfg(feature = "msl-out")]
fn msl(module: &Module, info: &ModuleInfo) -> Result<String, ShaderError> {
    use naga::back::msl;

    let options = msl::Options::default();
    let pipeline = msl::PipelineOptions::default();
    let (out, _) = msl::write_string(module, info, &options, &pipeline).map_err(|err| {
        ShaderError::Emission {
            target: TargetLanguage::Msl,
            details: err.to_string(),
        }
    })?;
    Ok(out)
}

#[cfg(not(feature = "msl-out"))]
fn msl(_: &Module, _: &ModuleInfo) -> Result<String, ShaderError> {
    Err(ShaderError::TargetUnsupported {
        target: TargetLanguage::Msl,
    })
}
