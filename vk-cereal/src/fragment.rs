//! Build-system source lists.
//!
//! Every non-suppressed module with an implementation artifact contributes a
//! [`BuildEntry`]. Entries are partitioned by role into a guest list and a
//! host list (host decoder and common modules) and rendered as build
//! fragments that can be spliced into the respective build manifests.

use std::path::{Path, PathBuf};

use crate::module::ModuleRole;

/// One implementation file registered in a build target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEntry {
    pub role: ModuleRole,

    /// Registry name of the contributing module.
    pub module: String,

    /// Path of the implementation artifact.
    pub path: PathBuf,
}

/// Names substituted into the rendered fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentSettings {
    /// Command line shown in the fragment banner.
    pub command_line: String,

    /// Host library target name.
    pub host_library: String,

    /// Base utility library the host target links against.
    pub base_lib_link_name: String,

    /// API header target, may be empty.
    pub header_target: String,

    /// Private utility target, may be empty.
    pub utils_link_name: String,
}

impl Default for FragmentSettings {
    fn default() -> Self {
        Self {
            command_line: "vk-cereal generate".to_string(),
            host_library: "OpenglRender_vulkan_cereal".to_string(),
            base_lib_link_name: "android-emu-base".to_string(),
            header_target: String::new(),
            utils_link_name: String::new(),
        }
    }
}

/// Source lists partitioned by build target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildFragments {
    guest: Vec<BuildEntry>,
    host: Vec<BuildEntry>,
}

impl BuildFragments {
    /// Partition entries, keeping their order.
    pub fn from_entries(entries: impl IntoIterator<Item = BuildEntry>) -> Self {
        let mut fragments = Self::default();
        for entry in entries {
            fragments.push(entry);
        }
        fragments
    }

    /// Add one entry to its role's list.
    pub fn push(&mut self, entry: BuildEntry) {
        match entry.role {
            ModuleRole::GuestEncoder => self.guest.push(entry),
            ModuleRole::Host | ModuleRole::Common => self.host.push(entry),
        }
    }

    /// Guest encoder sources.
    pub fn guest_sources(&self) -> &[BuildEntry] {
        &self.guest
    }

    /// Host decoder and common sources.
    pub fn host_sources(&self) -> &[BuildEntry] {
        &self.host
    }

    pub fn is_empty(&self) -> bool {
        self.guest.is_empty() && self.host.is_empty()
    }

    /// Render the guest source list as a makefile fragment.
    pub fn render_guest(&self, base: &Path, settings: &FragmentSettings) -> String {
        let mut out = banner(settings);
        out.push_str("LOCAL_SRC_FILES += \\\n");
        let files: Vec<String> = self
            .guest
            .iter()
            .map(|e| format!("    {}", relative_display(&e.path, base)))
            .collect();
        out.push_str(&files.join(" \\\n"));
        out.push('\n');
        out
    }

    /// Render the host source list as a CMake fragment.
    pub fn render_host(&self, base: &Path, settings: &FragmentSettings) -> String {
        let files: Vec<String> = self
            .host
            .iter()
            .map(|e| relative_display(&e.path, base))
            .collect();

        let mut out = banner(settings);
        let lib = &settings.host_library;
        out.push_str(&format!("add_library({lib} {})\n", files.join(" ")));
        out.push_str(&format!(
            "target_compile_definitions({lib} PRIVATE -DVK_GOOGLE_gfxstream)\nif (WIN32)\n    target_compile_definitions({lib} PRIVATE -DVK_USE_PLATFORM_WIN32_KHR)\nendif()\n"
        ));
        out.push_str(&format!(
            "target_link_libraries(\n    {}\n    PUBLIC\n    {}\n",
            settings.host_library, settings.base_lib_link_name
        ));
        if !settings.header_target.is_empty() {
            out.push_str(&format!("    {}\n", settings.header_target));
        }
        out.push_str("    PRIVATE\n");
        if !settings.utils_link_name.is_empty() {
            out.push_str(&format!("    {}\n", settings.utils_link_name));
        }
        out.push_str(")\n\n");
        out.push_str(&format!(
            "target_include_directories({}\n                           PUBLIC\n                           .\n                           PRIVATE\n                           ..\n                           ../..\n                           ../../../include)\n",
            settings.host_library
        ));
        out
    }
}

fn banner(settings: &FragmentSettings) -> String {
    format!(
        "# Autogenerated makefile\n# {}\n# Please do not modify directly; re-run the generator.\n\n",
        settings.command_line
    )
}

/// Path relative to `base` with `/` separators, or the full path when it
/// lies outside `base`.
fn relative_display(path: &Path, base: &Path) -> String {
    match path.strip_prefix(base) {
        Ok(relative) => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.display().to_string(),
    }
}
