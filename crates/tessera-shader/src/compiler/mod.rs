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

//! WGSL cross-compilation through naga's validated IR.
//!
//! The pipeline is parse, validate (the IR is the portable pivot), emit, and
//! for GLSL a textual relaxation pass. Which writers exist depends on the
//! `spv-out`, `glsl-out`, `hlsl-out` and `msl-out` features.

mod bindings;
mod emit;
mod glsl_fixup;

pub use self::bindings::{binding_map, combined_samplers, CombinedSampler};
pub use self::glsl_fixup::relax_glsl;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tessera_core::renderer::{ShaderError, ShaderModel, ShaderStage, TargetLanguage};

/// Validator configuration shared by every translation of one compiler.
#[derive(Debug, Clone, Copy)]
pub struct CompilerLimits {
    /// Which validation passes run.
    pub validation_flags: naga::valid::ValidationFlags,
    /// Which optional IR features are accepted.
    pub capabilities: naga::valid::Capabilities,
}

impl Default for CompilerLimits {
    fn default() -> Self {
        Self {
            validation_flags: naga::valid::ValidationFlags::all(),
            capabilities: naga::valid::Capabilities::all(),
        }
    }
}

/// What a successful translation reports besides the emitted text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranspileOutput {
    /// Image/sampler pairs the shader samples together, numbered after the image.
    pub combined_samplers: Vec<CombinedSampler>,
}

/// Translates canonical WGSL into a backend's language.
#[derive(Debug, Clone)]
pub struct CrossCompiler {
    limits: CompilerLimits,
}

impl Default for CrossCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossCompiler {
    /// Creates a compiler with the default limits.
    pub fn new() -> Self {
        Self::with_limits(CompilerLimits::default())
    }

    /// Creates a compiler validating against `limits`.
    pub fn with_limits(limits: CompilerLimits) -> Self {
        log::debug!(
            "CrossCompiler: Initialized with capabilities {:?}",
            limits.capabilities
        );
        Self { limits }
    }

    /// The limits this compiler validates against.
    pub fn limits(&self) -> &CompilerLimits {
        &self.limits
    }

    /// Whether the writer for `target` is compiled into this build.
    pub fn is_target_supported(target: TargetLanguage) -> bool {
        match target {
            TargetLanguage::SpirV => cfg!(feature = "spv-out"),
            TargetLanguage::Hlsl => cfg!(feature = "hlsl-out"),
            TargetLanguage::Msl => cfg!(feature = "msl-out"),
            TargetLanguage::Glsl330
            | TargetLanguage::Glsl450
            | TargetLanguage::GlslEs300
            | TargetLanguage::GlslEs310 => cfg!(feature = "glsl-out"),
        }
    }

    /// Every target this build can emit.
    pub fn supported_targets() -> Vec<TargetLanguage> {
        TargetLanguage::ALL
            .into_iter()
            .filter(|target| Self::is_target_supported(*target))
            .collect()
    }

    /// Replaces the WGSL in `source` with its translation for `model`.
    ///
    /// ## Arguments
    /// * `source` - Preprocessed WGSL; overwritten only on success.
    /// * `stage` - The stage to compile. Its entry point follows [`ShaderStage::entry_point`].
    /// * `model` - The active backend's shader model. Must be `Translated`.
    ///
    /// ## Errors
    /// * `ShaderError::TranslationNotRequired` - If `model` is `Canonical`.
    /// * `ShaderError::UnsupportedStage` - For geometry, hull and domain stages.
    /// * `ShaderError::TargetUnsupported` - If the target writer is not compiled in.
    /// * `ShaderError::Parse`, `Lowering` or `Emission` - For failures in each step.
    pub fn transpile(
        &self,
        source: &mut String,
        stage: ShaderStage,
        model: ShaderModel,
    ) -> Result<TranspileOutput, ShaderError> {
        let Some(target) = model.target() else {
            log::error!("CrossCompiler: transpile called for a backend consuming WGSL directly");
            return Err(ShaderError::TranslationNotRequired);
        };
        let naga_stage = naga_stage(stage)?;
        if !Self::is_target_supported(target) {
            return Err(ShaderError::TargetUnsupported { target });
        }

        let entry_point = stage.entry_point();
        let module = parse(source, naga_stage, entry_point)?;
        let info = self.lower(&module, source)?;

        let combined = combined_samplers(&module);
        let emitted = guard(|| emit::emit(&module, &info, naga_stage, entry_point, target))
            .map_err(|details| ShaderError::Emission { target, details })??;
        let emitted = if target.is_glsl() {
            relax_glsl(&emitted, target)
        } else {
            emitted
        };

        log::debug!(
            "CrossCompiler: Translated {stage:?} entry '{entry_point}' to {} ({} bytes)",
            target.name(),
            emitted.len()
        );
        *source = emitted;
        Ok(TranspileOutput {
            combined_samplers: combined,
        })
    }

    fn lower(
        &self,
        module: &naga::Module,
        source: &str,
    ) -> Result<naga::valid::ModuleInfo, ShaderError> {
        let limits = self.limits;
        let validated = guard(|| {
            naga::valid::Validator::new(limits.validation_flags, limits.capabilities)
                .validate(module)
        })
        .map_err(|details| ShaderError::Lowering { details })?;

        validated.map_err(|err| ShaderError::Lowering {
            details: err.emit_to_string(source),
        })
    }
}

fn naga_stage(stage: ShaderStage) -> Result<naga::ShaderStage, ShaderError> {
    match stage {
        ShaderStage::Vertex => Ok(naga::ShaderStage::Vertex),
        ShaderStage::Fragment => Ok(naga::ShaderStage::Fragment),
        ShaderStage::Compute => Ok(naga::ShaderStage::Compute),
        ShaderStage::Geometry | ShaderStage::Hull | ShaderStage::Domain => {
            Err(ShaderError::UnsupportedStage { stage })
        }
    }
}

fn parse(
    source: &str,
    stage: naga::ShaderStage,
    entry_point: &str,
) -> Result<naga::Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|err| ShaderError::Parse {
        entry_point: entry_point.to_string(),
        details: err.emit_to_string(source),
    })?;

    let has_entry = module
        .entry_points
        .iter()
        .any(|ep| ep.name == entry_point && ep.stage == stage);
    if !has_entry {
        return Err(ShaderError::Parse {
            entry_point: entry_point.to_string(),
            details: format!("no {stage:?} entry point named '{entry_point}'"),
        });
    }
    Ok(module)
}

/// Runs a toolchain step, turning a panic into its message.
fn guard<T>(step: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(step)).map_err(|payload| panic_message(&*payload))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "shader toolchain panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let x = f32(i32(index) - 1);
    let y = f32(i32(index & 1u) * 2 - 1);
    return vec4<f32>(x, y, 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.0, 0.0, 1.0);
}
"#;

    #[test]
    fn canonical_model_is_rejected() {
        let compiler = CrossCompiler::new();
        let mut source = TRIANGLE.to_string();
        let err = compiler
            .transpile(&mut source, ShaderStage::Vertex, ShaderModel::Canonical)
            .unwrap_err();
        assert!(matches!(err, ShaderError::TranslationNotRequired));
        assert_eq!(source, TRIANGLE);
    }

    #[test]
    fn tessellation_and_geometry_stages_are_unsupported() {
        let compiler = CrossCompiler::new();
        for stage in [ShaderStage::Geometry, ShaderStage::Hull, ShaderStage::Domain] {
            let mut source = TRIANGLE.to_string();
            let err = compiler
                .transpile(
                    &mut source,
                    stage,
                    ShaderModel::Translated(TargetLanguage::SpirV),
                )
                .unwrap_err();
            assert!(matches!(err, ShaderError::UnsupportedStage { .. }));
            assert_eq!(source, TRIANGLE);
        }
    }

    #[test]
    fn targets_outside_the_build_fail_and_leave_source_untouched() {
        let compiler = CrossCompiler::new();
        for target in TargetLanguage::ALL {
            if CrossCompiler::is_target_supported(target) {
                continue;
            }
            let mut source = TRIANGLE.to_string();
            let err = compiler
                .transpile(
                    &mut source,
                    ShaderStage::Fragment,
                    ShaderModel::Translated(target),
                )
                .unwrap_err();
            assert!(matches!(err, ShaderError::TargetUnsupported { target: t } if t == target));
            assert_eq!(source, TRIANGLE);
        }
    }

    #[test]
    fn supported_targets_agree_with_gate() {
        for target in CrossCompiler::supported_targets() {
            assert!(CrossCompiler::is_target_supported(target));
        }
    }

    #[cfg(feature = "spv-out")]
    #[test]
    fn spirv_output_is_space_joined_words() {
        let compiler = CrossCompiler::new();
        let mut source = TRIANGLE.to_string();
        compiler
            .transpile(
                &mut source,
                ShaderStage::Fragment,
                ShaderModel::Translated(TargetLanguage::SpirV),
            )
            .unwrap();

        let words: Vec<u32> = source
            .split(' ')
            .map(|word| word.parse().expect("decimal word"))
            .collect();
        assert_eq!(words[0], 0x0723_0203, "SPIR-V magic number");
    }

    #[cfg(feature = "spv-out")]
    #[test]
    fn parse_errors_carry_diagnostics() {
        let compiler = CrossCompiler::new();
        let broken = "@fragment fn fs_main() -> @location(0) vec4<f32> { return 1.0 +; }";
        let mut source = broken.to_string();
        let err = compiler
            .transpile(
                &mut source,
                ShaderStage::Fragment,
                ShaderModel::Translated(TargetLanguage::SpirV),
            )
            .unwrap_err();
        assert!(matches!(err, ShaderError::Parse { .. }), "{err}");
        assert_eq!(source, broken);
    }

    #[cfg(feature = "spv-out")]
    #[test]
    fn missing_entry_point_is_a_parse_error() {
        let compiler = CrossCompiler::new();
        let mut source = TRIANGLE.to_string();
        let err = compiler
            .transpile(
                &mut source,
                ShaderStage::Compute,
                ShaderModel::Translated(TargetLanguage::SpirV),
            )
            .unwrap_err();
        assert!(matches!(err, ShaderError::Parse { ref entry_point, .. } if entry_point == "main"));
    }

    #[cfg(feature = "spv-out")]
    #[test]
    fn validation_errors_are_lowering_errors() {
        let compiler = CrossCompiler::new();
        // Parses fine, but the returned type does not match the declared one.
        let invalid = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<i32>(1); }";
        let mut source = invalid.to_string();
        let err = compiler
            .transpile(
                &mut source,
                ShaderStage::Fragment,
                ShaderModel::Translated(TargetLanguage::SpirV),
            )
            .unwrap_err();
        assert!(
            matches!(err, ShaderError::Lowering { .. } | ShaderError::Parse { .. }),
            "{err}"
        );
        assert_eq!(source, invalid);
    }

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(guard(|| 7).unwrap(), 7);
        let message = guard(|| -> u32 { panic!("writer exploded") }).unwrap_err();
        assert_eq!(message, "writer exploded");
    }
}
