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

use tessera_core::renderer::TargetLanguage;

const SEPARATE_SHADER_OBJECTS: &str = "GL_ARB_separate_shader_objects";

/// Adjusts emitted GLSL for versions older than explicit binding support.
///
/// On those targets `binding = N` qualifiers are removed from `layout(...)`
/// blocks, a layout left empty is dropped entirely, and the
/// separate-shader-objects extension directive is removed. Text for other
/// targets is returned as is.
pub fn relax_glsl(text: &str, target: TargetLanguage) -> String {
    if !target.is_glsl() || target.supports_explicit_binding() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#extension") && trimmed.contains(SEPARATE_SHADER_OBJECTS) {
            continue;
        }
        out.push_str(&strip_bindings(line));
        out.push('\n');
    }
    out
}

fn strip_bindings(line: &str) -> String {
    let Some(start) = line.find("layout(") else {
        return line.to_string();
    };
    let open = start + "layout(".len();
    let Some(close) = line[open..].find(')').map(|offset| open + offset) else {
        return line.to_string();
    };

    let qualifiers: Vec<&str> = line[open..close]
        .split(',')
        .map(str::trim)
        .filter(|q| !q.is_empty() && !is_binding(q))
        .collect();

    let rest = &line[close + 1..];
    if qualifiers.is_empty() {
        format!("{}{}", &line[..start], rest.trim_start())
    } else {
        format!("{}layout({}){}", &line[..start], qualifiers.join(", "), rest)
    }
}

fn is_binding(qualifier: &str) -> bool {
    qualifier
        .split_once('=')
        .is_some_and(|(key, _)| key.trim() == "binding")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_are_removed_for_legacy_targets() {
        let text = "layout(std140, binding = 0) uniform Globals { mat4 mvp; };\n";
        let relaxed = relax_glsl(text, TargetLanguage::Glsl330);
        assert_eq!(relaxed, "layout(std140) uniform Globals { mat4 mvp; };\n");
    }

    #[test]
    fn emptied_layout_is_dropped() {
        let text = "layout(binding = 2) uniform highp sampler2D _group_0_binding_2_fs;\n";
        let relaxed = relax_glsl(text, TargetLanguage::GlslEs300);
        assert_eq!(relaxed, "uniform highp sampler2D _group_0_binding_2_fs;\n");
    }

    #[test]
    fn location_qualifiers_are_kept() {
        let text = "layout(location = 0) out vec4 _fs2p_location0;\n";
        assert_eq!(relax_glsl(text, TargetLanguage::Glsl330), text);
    }

    #[test]
    fn separate_shader_objects_extension_is_dropped() {
        let text = "#version 330 core\n#extension GL_ARB_separate_shader_objects : enable\nvoid main() {}\n";
        let relaxed = relax_glsl(text, TargetLanguage::Glsl330);
        assert_eq!(relaxed, "#version 330 core\nvoid main() {}\n");
    }

    #[test]
    fn modern_targets_are_untouched() {
        let text = "layout(std140, binding = 0) uniform Globals { mat4 mvp; };";
        assert_eq!(relax_glsl(text, TargetLanguage::Glsl450), text);
        assert_eq!(relax_glsl(text, TargetLanguage::SpirV), text);
    }
}
