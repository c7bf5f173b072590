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

//! Shader source expansion.
//!
//! Sources are minijinja templates with a C-flavoured line syntax:
//!
//! ```text
//! #include "@common"
//! #if USE_FOG
//! fn fog(d: f32) -> f32 { return d * {{ FOG_DENSITY }}; }
//! #endif
//! ```
//!
//! Lines starting with `#` are statements, `{$ … $}` is an inline block tag
//! and `{{ … }}` prints an expression. Defines become template variables and
//! exactly one backend macro (see [`backend_macro`]) is set to `true`.

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, Error, ErrorKind, UndefinedBehavior, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tessera_core::renderer::{
    IncludeResolution, IncludeResolver, PreprocessorFeatures, ShaderDescriptor, ShaderError,
    ShaderModel, TargetLanguage,
};

use crate::registry::{ShaderSectionRegistry, SHADER_SUFFIXES};

/// Include names starting with this prefix resolve through the section registry.
pub const SECTION_PREFIX: char = '@';

/// The macro that identifies the active backend's shader language.
pub fn backend_macro(model: ShaderModel) -> &'static str {
    match model {
        ShaderModel::Canonical => "TESSERA_WGSL",
        ShaderModel::Translated(target) => match target {
            TargetLanguage::Glsl330 | TargetLanguage::Glsl450 => "TESSERA_GLSL",
            TargetLanguage::GlslEs300 | TargetLanguage::GlslEs310 => "TESSERA_GLSL_ES",
            TargetLanguage::Hlsl => "TESSERA_HLSL",
            TargetLanguage::Msl => "TESSERA_MSL",
            TargetLanguage::SpirV => "TESSERA_SPIRV",
        },
    }
}

/// Expands defines, conditionals and includes in shader sources.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    include_root: PathBuf,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    /// Creates a preprocessor resolving file includes from the current directory.
    pub fn new() -> Self {
        let include_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { include_root }
    }

    /// Creates a preprocessor resolving file includes from `root`.
    pub fn with_include_root(root: impl Into<PathBuf>) -> Self {
        Self {
            include_root: root.into(),
        }
    }

    /// The directory file includes are resolved against.
    pub fn include_root(&self) -> &Path {
        &self.include_root
    }

    /// Changes the directory file includes are resolved against.
    pub fn set_include_root(&mut self, root: impl Into<PathBuf>) {
        self.include_root = root.into();
    }

    /// Expands `descriptor.source_code` in place.
    ///
    /// Includes are resolved by the descriptor's resolver first, then by the
    /// registry for `@`-prefixed names, then from the filesystem.
    ///
    /// ## Errors
    /// * `ShaderError::IncludeFailed` - If any include cannot be resolved.
    /// * `ShaderError::Preprocess` - On syntax or evaluation errors.
    ///
    /// On error the descriptor is left untouched.
    pub fn process(
        &self,
        descriptor: &mut ShaderDescriptor,
        registry: &ShaderSectionRegistry,
        model: ShaderModel,
    ) -> Result<(), ShaderError> {
        let failure = IncludeFailure::default();
        let env = self.environment(descriptor, registry, &failure)?;
        let context = Self::context(&descriptor.defines, model);

        let expanded = env
            .render_str(&descriptor.source_code, context)
            .map_err(|err| Self::classify(err, &descriptor.filename, &failure))?;

        log::debug!(
            "Preprocessor: Expanded '{}' ({} -> {} bytes, macro {})",
            descriptor.filename,
            descriptor.source_code.len(),
            expanded.len(),
            backend_macro(model)
        );
        descriptor.source_code = expanded;
        Ok(())
    }

    fn environment(
        &self,
        descriptor: &ShaderDescriptor,
        registry: &ShaderSectionRegistry,
        failure: &IncludeFailure,
    ) -> Result<Environment<'static>, ShaderError> {
        let syntax = SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("#")
            .build()
            .map_err(|err| ShaderError::Preprocess {
                file: descriptor.filename.clone(),
                details: err.to_string(),
            })?;

        let features = descriptor.features;
        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_trim_blocks(features.contains(PreprocessorFeatures::TRIM_BLOCKS));
        env.set_lstrip_blocks(features.contains(PreprocessorFeatures::LSTRIP_BLOCKS));
        env.set_keep_trailing_newline(
            features.contains(PreprocessorFeatures::KEEP_TRAILING_NEWLINE),
        );
        env.set_undefined_behavior(if features.contains(PreprocessorFeatures::STRICT_UNDEFINED) {
            UndefinedBehavior::Strict
        } else {
            UndefinedBehavior::SemiStrict
        });

        let loader = IncludeLoader {
            registry: registry.clone(),
            resolver: descriptor.include_resolver.clone(),
            root: self.include_root.clone(),
            includer: descriptor.filename.clone(),
            failure: failure.clone(),
        };
        env.set_loader(move |name| loader.load(name));
        Ok(env)
    }

    fn context(defines: &[String], model: ShaderModel) -> BTreeMap<String, Value> {
        let mut context = BTreeMap::new();
        for define in defines {
            let (name, value) = match define.split_once('=') {
                Some((name, value)) => (name.trim(), define_value(value.trim())),
                None => (define.trim(), Value::from(true)),
            };
            context.insert(name.to_string(), value);
        }
        context.insert(backend_macro(model).to_string(), Value::from(true));
        context
    }

    fn classify(err: Error, file: &str, failure: &IncludeFailure) -> ShaderError {
        // minijinja rewrites loader errors, so the loader's own reason is kept aside.
        if let Some(reason) = failure.take() {
            return ShaderError::IncludeFailed {
                file: file.to_string(),
                details: reason,
            };
        }
        let details = match err.detail() {
            Some(detail) => format!("{} ({detail})", err.kind()),
            None => err.to_string(),
        };
        match err.kind() {
            ErrorKind::TemplateNotFound => ShaderError::IncludeFailed {
                file: file.to_string(),
                details,
            },
            _ => ShaderError::Preprocess {
                file: file.to_string(),
                details,
            },
        }
    }
}

/// `NAME=VALUE` values: integers and floats stay numeric, `true`/`false` are
/// booleans, anything else is a string.
fn define_value(raw: &str) -> Value {
    if let Ok(int) = raw.parse::<i64>() {
        Value::from(int)
    } else if let Ok(float) = raw.parse::<f64>() {
        Value::from(float)
    } else if let Ok(flag) = raw.parse::<bool>() {
        Value::from(flag)
    } else {
        Value::from(raw.to_string())
    }
}

struct IncludeLoader {
    registry: ShaderSectionRegistry,
    resolver: Option<Arc<dyn IncludeResolver>>,
    root: PathBuf,
    includer: String,
    failure: IncludeFailure,
}

/// The first reason the loader gave up, shared with [`Preprocessor::classify`].
#[derive(Clone, Default)]
struct IncludeFailure(Arc<Mutex<Option<String>>>);

impl IncludeFailure {
    fn record(&self, reason: String) -> Error {
        if let Ok(mut slot) = self.0.lock() {
            slot.get_or_insert_with(|| reason.clone());
        }
        Error::new(ErrorKind::InvalidOperation, reason)
    }

    fn take(&self) -> Option<String> {
        self.0.lock().ok()?.take()
    }
}

impl IncludeLoader {
    fn load(&self, name: &str) -> Result<Option<String>, Error> {
        if let Some(resolver) = &self.resolver {
            match resolver.resolve(name, &self.includer) {
                IncludeResolution::Resolved(source) => return Ok(Some(source)),
                IncludeResolution::Fail(reason) => {
                    return Err(self
                        .failure
                        .record(format!("'{name}' rejected by resolver: {reason}")))
                }
                IncludeResolution::Defer => {}
            }
        }

        if let Some(section) = name.strip_prefix(SECTION_PREFIX) {
            return self
                .registry
                .find_section(section)
                .map(|code| Some(code.to_string()))
                .ok_or_else(|| {
                    self.failure
                        .record(format!("section '{section}' is not registered"))
                });
        }

        self.load_file(name).map(Some)
    }

    fn load_file(&self, name: &str) -> Result<String, Error> {
        let base = self.root.join(name);
        let candidates = std::iter::once(base.clone()).chain(
            SHADER_SUFFIXES
                .iter()
                .map(|suffix| PathBuf::from(format!("{}{suffix}", base.display()))),
        );

        for path in candidates {
            if !path.is_file() {
                continue;
            }
            return std::fs::read_to_string(&path).map_err(|err| {
                self.failure
                    .record(format!("cannot read '{}': {err}", path.display()))
            });
        }
        Err(self.failure.record(format!(
            "'{name}' not found under '{}'",
            self.root.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::renderer::ShaderStage;

    fn descriptor(source: &str) -> ShaderDescriptor {
        ShaderDescriptor::new("test.wgsl", source, ShaderStage::Fragment)
    }

    #[test]
    fn defines_drive_conditionals() {
        let pre = Preprocessor::with_include_root(".");
        let registry = ShaderSectionRegistry::new();
        let mut desc = descriptor("#if FOO\nfoo\n#else\nbar\n#endif\n").with_define("FOO");

        pre.process(&mut desc, &registry, ShaderModel::Canonical)
            .unwrap();

        assert!(desc.source_code.contains("foo"));
        assert!(!desc.source_code.contains("bar"));
    }

    #[test]
    fn define_values_are_printed() {
        let pre = Preprocessor::with_include_root(".");
        let registry = ShaderSectionRegistry::new();
        let mut desc = descriptor("const N: u32 = {{ COUNT }}u;").with_define("COUNT=4");

        pre.process(&mut desc, &registry, ShaderModel::Canonical)
            .unwrap();

        assert_eq!(desc.source_code, "const N: u32 = 4u;");
    }

    #[test]
    fn exactly_one_backend_macro_is_set() {
        let pre = Preprocessor::with_include_root(".");
        let registry = ShaderSectionRegistry::new();
        let source = "#if TESSERA_GLSL_ES\nes\n#elif TESSERA_WGSL\nwgsl\n#endif\n";

        let mut desc = descriptor(source);
        pre.process(
            &mut desc,
            &registry,
            ShaderModel::Translated(TargetLanguage::GlslEs300),
        )
        .unwrap();
        assert_eq!(desc.source_code.trim(), "es");

        let mut desc = descriptor(source);
        pre.process(&mut desc, &registry, ShaderModel::Canonical)
            .unwrap();
        assert_eq!(desc.source_code.trim(), "wgsl");
    }

    #[test]
    fn abstract_includes_resolve_through_registry() {
        let pre = Preprocessor::with_include_root(".");
        let mut registry = ShaderSectionRegistry::new();
        registry
            .add_section("common.wgsl", "fn common() {}")
            .unwrap();
        let mut desc = descriptor("#include \"@common\"\nfn main() {}");

        pre.process(&mut desc, &registry, ShaderModel::Canonical)
            .unwrap();

        assert!(desc.source_code.contains("fn common() {}"));
        assert!(desc.source_code.contains("fn main() {}"));
    }

    #[test]
    fn missing_section_fails_without_touching_source() {
        let pre = Preprocessor::with_include_root(".");
        let registry = ShaderSectionRegistry::new();
        let source = "#include \"@missing\"\nfn main() {}";
        let mut desc = descriptor(source);

        let err = pre
            .process(&mut desc, &registry, ShaderModel::Canonical)
            .unwrap_err();

        assert!(matches!(err, ShaderError::IncludeFailed { .. }), "{err}");
        assert_eq!(desc.source_code, source);
    }

    #[test]
    fn resolver_runs_first_and_can_defer() {
        let pre = Preprocessor::with_include_root(".");
        let mut registry = ShaderSectionRegistry::new();
        registry.add_section("lights.wgsl", "// registry").unwrap();
        let resolver: Arc<dyn IncludeResolver> = Arc::new(|name: &str, _: &str| match name {
            "@lights" => IncludeResolution::Resolved("// resolver".to_string()),
            _ => IncludeResolution::Defer,
        });

        let mut desc = descriptor("#include \"@lights\"\n").with_include_resolver(resolver.clone());
        pre.process(&mut desc, &registry, ShaderModel::Canonical)
            .unwrap();
        assert!(desc.source_code.contains("// resolver"));

        let mut registry = ShaderSectionRegistry::new();
        registry.add_section("fog.wgsl", "// fog").unwrap();
        let mut desc = descriptor("#include \"@fog\"\n").with_include_resolver(resolver);
        pre.process(&mut desc, &registry, ShaderModel::Canonical)
            .unwrap();
        assert!(desc.source_code.contains("// fog"));
    }

    #[test]
    fn resolver_failure_is_fatal() {
        let pre = Preprocessor::with_include_root(".");
        let registry = ShaderSectionRegistry::new();
        let resolver: Arc<dyn IncludeResolver> =
            Arc::new(|_: &str, _: &str| IncludeResolution::Fail("forbidden".to_string()));
        let mut desc = descriptor("#include \"anything.wgsl\"\n").with_include_resolver(resolver);

        let err = pre
            .process(&mut desc, &registry, ShaderModel::Canonical)
            .unwrap_err();
        assert!(err.to_string().contains("forbidden"), "{err}");
    }

    #[test]
    fn include_failures_keep_the_loader_reason() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("binary.wgsl"), [0xff, 0xfe, 0x00]).unwrap();
        let pre = Preprocessor::with_include_root(dir.path());
        let registry = ShaderSectionRegistry::new();

        let cases = [
            ("#include \"@lights\"\n", "section 'lights' is not registered"),
            ("#include \"binary.wgsl\"\n", "cannot read"),
            ("#include \"nowhere\"\n", "'nowhere' not found under"),
        ];
        for (source, reason) in cases {
            let mut desc = descriptor(source);
            let err = pre
                .process(&mut desc, &registry, ShaderModel::Canonical)
                .unwrap_err();
            assert!(matches!(err, ShaderError::IncludeFailed { .. }), "{err}");
            assert!(err.to_string().contains(reason), "{err}");
            assert_eq!(desc.source_code, source);
        }
    }

    #[test]
    fn file_includes_try_suffixes_under_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("shadows.wgsli"), "fn shadow() {}").unwrap();
        let pre = Preprocessor::with_include_root(dir.path());
        let registry = ShaderSectionRegistry::new();
        let mut desc = descriptor("#include \"shadows\"\n");

        pre.process(&mut desc, &registry, ShaderModel::Canonical)
            .unwrap();

        assert!(desc.source_code.contains("fn shadow() {}"));
    }

    #[test]
    fn syntax_errors_are_preprocess_errors() {
        let pre = Preprocessor::with_include_root(".");
        let registry = ShaderSectionRegistry::new();
        let mut desc = descriptor("#if FOO\nunterminated\n");

        let err = pre
            .process(&mut desc, &registry, ShaderModel::Canonical)
            .unwrap_err();
        assert!(matches!(err, ShaderError::Preprocess { .. }), "{err}");
    }

    #[test]
    fn strict_undefined_rejects_unknown_names() {
        let pre = Preprocessor::with_include_root(".");
        let registry = ShaderSectionRegistry::new();
        let mut desc = descriptor("#if NOT_DEFINED\nx\n#endif\n")
            .with_features(PreprocessorFeatures::STRICT_UNDEFINED);
        assert!(pre
            .process(&mut desc, &registry, ShaderModel::Canonical)
            .is_err());

        let mut desc = descriptor("#if NOT_DEFINED\nx\n#endif\nok");
        pre.process(&mut desc, &registry, ShaderModel::Canonical)
            .unwrap();
        assert_eq!(desc.source_code.trim(), "ok");
    }
}
