//! Preamble and postamble templates for generated modules.
//!
//! The banner, include and namespace blocks are data: a [`PreambleTemplates`]
//! table is supplied to the orchestrator and combined with each module's
//! [`ModuleSpec`] flags when the module is constructed.

use std::path::Path;

use crate::module::ModuleSpec;

/// Default license header placed at the top of every artifact.
pub const DEFAULT_COPYRIGHT: &str = "// Copyright (C) 2018 The Android Open Source Project
// Copyright (C) 2018 Google Inc.
//
// Licensed under the Apache License, Version 2.0 (the \"License\");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an \"AS IS\" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
";

const DEFAULT_NAMESPACE_BEGIN: &str = "
namespace gfxstream {
namespace vk {

";

const DEFAULT_NAMESPACE_END: &str = "
}  // namespace vk
}  // namespace gfxstream
";

const DEFAULT_API_HEADERS: &str = "#include <vulkan/vulkan.h>\n#include \"vulkan_gfxstream.h\"\n";

/// Text tables shared by every module of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreambleTemplates {
    /// License header.
    pub copyright: String,

    /// Sanitized command line that regenerates the artifacts.
    pub command_line: String,

    /// Opening namespace block.
    pub namespace_begin: String,

    /// Closing namespace block.
    pub namespace_end: String,

    /// Default API includes, skipped for modules that suppress them.
    pub api_headers: String,
}

impl Default for PreambleTemplates {
    fn default() -> Self {
        Self::gfxstream("vk-cereal generate")
    }
}

impl PreambleTemplates {
    /// The gfxstream table with the given regeneration command line.
    pub fn gfxstream(command_line: impl Into<String>) -> Self {
        Self {
            copyright: DEFAULT_COPYRIGHT.to_string(),
            command_line: command_line.into(),
            namespace_begin: DEFAULT_NAMESPACE_BEGIN.to_string(),
            namespace_end: DEFAULT_NAMESPACE_END.to_string(),
            api_headers: DEFAULT_API_HEADERS.to_string(),
        }
    }

    /// Autogeneration banner for one artifact of a module.
    pub fn banner(&self, basename: &str, artifact: &str) -> String {
        format!(
            "
// Autogenerated module {basename}
//
// ({artifact}) generated by {command}
//
// Please do not modify directly;
// re-run the generator with the command above,
// or regenerate a single module by setting
// ANDROID_EMU_VK_CEREAL_SUPPRESS=<module name>.
//
",
            command = self.command_line
        )
    }
}

/// Preamble and postamble text of one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preambles {
    pub header_preamble: String,
    pub header_postamble: String,
    pub impl_preamble: String,
    pub impl_postamble: String,
}

impl Preambles {
    /// Compute the preambles of a module from its `ModuleSpec`.
    pub fn compute(spec: &ModuleSpec, templates: &PreambleTemplates) -> Self {
        let mut header_preamble = templates.copyright.clone();
        header_preamble.push_str(&templates.banner(&spec.basename, "header"));
        header_preamble.push_str("#pragma once\n");
        if !spec.suppress_api_headers {
            header_preamble.push_str(&templates.api_headers);
        }
        header_preamble.push_str(&spec.extra_header);
        header_preamble.push('\n');

        let mut impl_preamble = templates.copyright.clone();
        impl_preamble.push_str(&templates.banner(&spec.basename, "impl"));
        if !spec.impl_only {
            impl_preamble.push_str(&format!("\n#include \"{}.h\"", spec.basename));
        }
        impl_preamble.push_str(&spec.extra_impl);

        let mut preambles = Self {
            header_preamble,
            impl_preamble,
            ..Self::default()
        };

        if spec.use_namespace {
            preambles.header_preamble.push_str(&templates.namespace_begin);
            preambles.impl_preamble.push_str(&templates.namespace_begin);
            preambles.header_postamble.push_str(&templates.namespace_end);
            preambles.impl_postamble.push_str(&templates.namespace_end);
        }

        preambles
    }
}

/// Render a command line for the banner.
///
/// Arguments naming existing paths under `cwd` are shown relative to it, with
/// `/` separators, so the banner does not depend on the checkout location.
pub fn banner_command<S: AsRef<str>>(args: &[S], cwd: &Path) -> String {
    args.iter()
        .map(|arg| {
            let arg = arg.as_ref();
            let path = Path::new(arg);
            if !path.exists() {
                return arg.to_string();
            }
            let relative = if path.is_absolute() {
                path.strip_prefix(cwd).unwrap_or(path)
            } else {
                path
            };
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            if parts.is_empty() {
                ".".to_string()
            } else {
                parts.join("/")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleRole, ModuleSpec};

    #[test]
    fn test_namespaced_module_preambles() {
        let spec = ModuleSpec::new("goldfish_vk_marshaling", ModuleRole::Common)
            .with_extra_header("#include \"VulkanStreamGuest.h\"\n");
        let templates = PreambleTemplates::gfxstream("genvk.py cereal");

        let preambles = Preambles::compute(&spec, &templates);

        assert!(preambles.header_preamble.starts_with(DEFAULT_COPYRIGHT));
        assert!(preambles
            .header_preamble
            .contains("// (header) generated by genvk.py cereal"));
        assert!(preambles.header_preamble.contains("#pragma once\n"));
        assert!(preambles.header_preamble.contains("#include <vulkan/vulkan.h>"));
        assert!(preambles.header_preamble.ends_with(DEFAULT_NAMESPACE_BEGIN));
        assert!(preambles
            .impl_preamble
            .contains("#include \"goldfish_vk_marshaling.h\""));
        assert_eq!(preambles.header_postamble, DEFAULT_NAMESPACE_END);
        assert_eq!(preambles.impl_postamble, DEFAULT_NAMESPACE_END);
    }

    #[test]
    fn test_plain_module_preambles() {
        let spec = ModuleSpec::new("VkSubDecoder", ModuleRole::Host)
            .without_namespace()
            .impl_only()
            .without_api_headers();
        let preambles = Preambles::compute(&spec, &PreambleTemplates::default());

        assert!(!preambles.header_preamble.contains("vulkan.h"));
        assert!(!preambles.impl_preamble.contains("#include \"VkSubDecoder.h\""));
        assert!(preambles.header_postamble.is_empty());
        assert!(preambles.impl_postamble.is_empty());
    }

    #[test]
    fn test_banner_command_keeps_plain_arguments() {
        let cwd = std::env::temp_dir();
        let args = ["genvk.py", "-registry", "definitely/not/here.xml", "cereal"];
        assert_eq!(
            banner_command(&args, &cwd),
            "genvk.py -registry definitely/not/here.xml cereal"
        );
    }

    #[test]
    fn test_banner_command_relativizes_existing_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("registry");
        std::fs::create_dir(&nested).unwrap();
        let arg = nested.to_string_lossy().into_owned();

        assert_eq!(banner_command(&[arg.as_str()], dir.path()), "registry");
    }
}
