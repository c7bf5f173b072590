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

//! Shader descriptors, target languages and module handles.
//!
//! Shaders are authored in WGSL. A backend either consumes WGSL directly
//! ([`ShaderModel::Canonical`]) or needs it cross-compiled into one
//! [`TargetLanguage`] first ([`ShaderModel::Translated`]).

use crate::renderer::api::util::ShaderStage;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// A concrete shading language a translated backend consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetLanguage {
    /// Desktop GLSL 3.30, no explicit binding qualifiers.
    Glsl330,
    /// Desktop GLSL 4.50.
    Glsl450,
    /// GLSL ES 3.00, no explicit binding qualifiers.
    GlslEs300,
    /// GLSL ES 3.10.
    GlslEs310,
    /// HLSL for Direct3D.
    Hlsl,
    /// Metal Shading Language.
    Msl,
    /// SPIR-V words rendered as space-separated decimal text.
    SpirV,
}

impl TargetLanguage {
    /// Every target, in declaration order.
    pub const ALL: [TargetLanguage; 7] = [
        TargetLanguage::Glsl330,
        TargetLanguage::Glsl450,
        TargetLanguage::GlslEs300,
        TargetLanguage::GlslEs310,
        TargetLanguage::Hlsl,
        TargetLanguage::Msl,
        TargetLanguage::SpirV,
    ];

    /// A human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            TargetLanguage::Glsl330 => "GLSL 330",
            TargetLanguage::Glsl450 => "GLSL 450",
            TargetLanguage::GlslEs300 => "GLSL ES 300",
            TargetLanguage::GlslEs310 => "GLSL ES 310",
            TargetLanguage::Hlsl => "HLSL",
            TargetLanguage::Msl => "Metal Shading Language",
            TargetLanguage::SpirV => "SPIR-V",
        }
    }

    /// File extension used for cached programs of this target.
    pub fn extension(self) -> &'static str {
        match self {
            TargetLanguage::Glsl330 | TargetLanguage::Glsl450 => "glsl",
            TargetLanguage::GlslEs300 | TargetLanguage::GlslEs310 => "essl",
            TargetLanguage::Hlsl => "hlsl",
            TargetLanguage::Msl => "msl",
            TargetLanguage::SpirV => "spv",
        }
    }

    /// Returns `true` for every GLSL flavour.
    pub fn is_glsl(self) -> bool {
        matches!(
            self,
            TargetLanguage::Glsl330
                | TargetLanguage::Glsl450
                | TargetLanguage::GlslEs300
                | TargetLanguage::GlslEs310
        )
    }

    /// Whether `layout(binding = N)` is understood by this GLSL version.
    pub fn supports_explicit_binding(self) -> bool {
        !matches!(self, TargetLanguage::Glsl330 | TargetLanguage::GlslEs300)
    }
}

/// How a backend consumes shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaderModel {
    /// The backend compiles WGSL itself; no cross-compilation happens.
    #[default]
    Canonical,
    /// The backend needs WGSL cross-compiled into the given language.
    Translated(TargetLanguage),
}

impl ShaderModel {
    /// The cross-compilation target, if any.
    pub fn target(self) -> Option<TargetLanguage> {
        match self {
            ShaderModel::Canonical => None,
            ShaderModel::Translated(target) => Some(target),
        }
    }
}

/// The final code handed to a backend's shader factory.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderCode<'a> {
    /// WGSL source text.
    Wgsl(Cow<'a, str>),
    /// GLSL source text (any version).
    Glsl(Cow<'a, str>),
    /// HLSL source text.
    Hlsl(Cow<'a, str>),
    /// Metal Shading Language source text.
    Msl(Cow<'a, str>),
    /// SPIR-V words.
    SpirV(Cow<'a, [u32]>),
}

impl ShaderCode<'_> {
    /// A short name for the language carried, used in diagnostics.
    pub fn language(&self) -> &'static str {
        match self {
            ShaderCode::Wgsl(_) => "WGSL",
            ShaderCode::Glsl(_) => "GLSL",
            ShaderCode::Hlsl(_) => "HLSL",
            ShaderCode::Msl(_) => "MSL",
            ShaderCode::SpirV(_) => "SPIR-V",
        }
    }

    /// Returns `true` when this code is what a backend with `model` consumes.
    pub fn matches_model(&self, model: ShaderModel) -> bool {
        match (self, model) {
            (ShaderCode::Wgsl(_), ShaderModel::Canonical) => true,
            (ShaderCode::Glsl(_), ShaderModel::Translated(t)) => t.is_glsl(),
            (ShaderCode::Hlsl(_), ShaderModel::Translated(TargetLanguage::Hlsl)) => true,
            (ShaderCode::Msl(_), ShaderModel::Translated(TargetLanguage::Msl)) => true,
            (ShaderCode::SpirV(_), ShaderModel::Translated(TargetLanguage::SpirV)) => true,
            _ => false,
        }
    }
}

/// Describes a shader module to be created by a backend.
#[derive(Debug, Clone)]
pub struct ShaderModuleDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The code in the backend's language.
    pub code: ShaderCode<'a>,
    /// The pipeline stage.
    pub stage: ShaderStage,
    /// The entry point function name.
    pub entry_point: &'a str,
}

/// An opaque handle representing a compiled shader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderModuleId(pub usize);

bitflags! {
    /// Options forwarded to the preprocessor. Each enabled flag also
    /// participates in the cached program name.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PreprocessorFeatures: u32 {
        /// Remove the first newline after a block tag.
        const TRIM_BLOCKS = 1 << 0;
        /// Strip leading whitespace before a block tag.
        const LSTRIP_BLOCKS = 1 << 1;
        /// Keep the final newline of the source.
        const KEEP_TRAILING_NEWLINE = 1 << 2;
        /// Referencing an undefined name is an error, even in conditions.
        const STRICT_UNDEFINED = 1 << 3;
    }
}

impl PreprocessorFeatures {
    /// Stable token for each enabled flag, in bit order.
    pub fn tokens(self) -> impl Iterator<Item = &'static str> {
        [
            (Self::TRIM_BLOCKS, "trim_blocks"),
            (Self::LSTRIP_BLOCKS, "lstrip_blocks"),
            (Self::KEEP_TRAILING_NEWLINE, "keep_trailing_newline"),
            (Self::STRICT_UNDEFINED, "strict_undefined"),
        ]
        .into_iter()
        .filter(move |(flag, _)| self.contains(*flag))
        .map(|(_, token)| token)
    }
}

/// What a caller-supplied include resolver decided for one include.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeResolution {
    /// The include expands to this source.
    Resolved(String),
    /// Fall through to the registry and filesystem lookup.
    Defer,
    /// The include is invalid; fail the whole expansion with this reason.
    Fail(String),
}

/// Caller hook consulted before the built-in include lookup.
pub trait IncludeResolver: Send + Sync {
    /// Resolves `name`, as written in the include directive of `includer`.
    fn resolve(&self, name: &str, includer: &str) -> IncludeResolution;
}

impl<F> IncludeResolver for F
where
    F: Fn(&str, &str) -> IncludeResolution + Send + Sync,
{
    fn resolve(&self, name: &str, includer: &str) -> IncludeResolution {
        self(name, includer)
    }
}

/// A shader compile request in canonical source form.
#[derive(Clone)]
pub struct ShaderDescriptor {
    /// Name used for diagnostics, cache keys and relative includes.
    pub filename: String,
    /// WGSL source, possibly with preprocessor directives.
    pub source_code: String,
    /// The pipeline stage to compile.
    pub stage: ShaderStage,
    /// Ordered defines, each `NAME` or `NAME=VALUE`.
    pub defines: Vec<String>,
    /// Preprocessor options.
    pub features: PreprocessorFeatures,
    /// Optional hook consulted first for every include.
    pub include_resolver: Option<Arc<dyn IncludeResolver>>,
}

impl ShaderDescriptor {
    /// Creates a descriptor with no defines, default features and no resolver.
    pub fn new(
        filename: impl Into<String>,
        source_code: impl Into<String>,
        stage: ShaderStage,
    ) -> Self {
        Self {
            filename: filename.into(),
            source_code: source_code.into(),
            stage,
            defines: Vec::new(),
            features: PreprocessorFeatures::default(),
            include_resolver: None,
        }
    }

    /// Appends a define.
    pub fn with_define(mut self, define: impl Into<String>) -> Self {
        self.defines.push(define.into());
        self
    }

    /// Replaces the preprocessor features.
    pub fn with_features(mut self, features: PreprocessorFeatures) -> Self {
        self.features = features;
        self
    }

    /// Installs an include resolver.
    pub fn with_include_resolver(mut self, resolver: Arc<dyn IncludeResolver>) -> Self {
        self.include_resolver = Some(resolver);
        self
    }
}

impl fmt::Debug for ShaderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderDescriptor")
            .field("filename", &self.filename)
            .field("stage", &self.stage)
            .field("defines", &self.defines)
            .field("features", &self.features)
            .field("source_len", &self.source_code.len())
            .field("include_resolver", &self.include_resolver.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_module_id_creation_and_equality() {
        assert_eq!(ShaderModuleId(1), ShaderModuleId(1));
        assert_ne!(ShaderModuleId(1), ShaderModuleId(2));
    }

    #[test]
    fn code_matches_only_its_own_model() {
        let wgsl = ShaderCode::Wgsl(Cow::Borrowed("@vertex fn vs_main() {}"));
        assert!(wgsl.matches_model(ShaderModel::Canonical));
        assert!(!wgsl.matches_model(ShaderModel::Translated(TargetLanguage::Glsl450)));

        let glsl = ShaderCode::Glsl(Cow::Borrowed("#version 450"));
        assert!(glsl.matches_model(ShaderModel::Translated(TargetLanguage::GlslEs300)));
        assert!(!glsl.matches_model(ShaderModel::Translated(TargetLanguage::Hlsl)));
    }

    #[test]
    fn feature_tokens_follow_bit_order() {
        let features = PreprocessorFeatures::STRICT_UNDEFINED | PreprocessorFeatures::TRIM_BLOCKS;
        let tokens: Vec<_> = features.tokens().collect();
        assert_eq!(tokens, ["trim_blocks", "strict_undefined"]);
    }

    #[test]
    fn descriptor_builder_keeps_define_order() {
        let descriptor = ShaderDescriptor::new("basic.wgsl", "", ShaderStage::Fragment)
            .with_define("B")
            .with_define("A=2");
        assert_eq!(descriptor.defines, ["B", "A=2"]);
        assert!(descriptor.include_resolver.is_none());
    }

    #[test]
    fn closures_are_include_resolvers() {
        let resolver: Arc<dyn IncludeResolver> = Arc::new(|name: &str, _: &str| {
            if name == "virtual" {
                IncludeResolution::Resolved("fn f() {}".to_string())
            } else {
                IncludeResolution::Defer
            }
        });
        assert_eq!(
            resolver.resolve("virtual", "main.wgsl"),
            IncludeResolution::Resolved("fn f() {}".to_string())
        );
        assert_eq!(resolver.resolve("other", "main.wgsl"), IncludeResolution::Defer);
    }
}
