//! Configuration management for the CLI.
//!
//! Settings are layered: built-in defaults, then `vk-cereal.toml`, then the
//! `VK_CEREAL_*` environment overrides (plus the suppression switch), then
//! command-line flags. The resolved [`Config`] is turned into the explicit
//! option values the engine takes; the engine itself never reads the
//! environment.

use crate::error::{CliResult, ConfigError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use vk_cereal::layout::LayoutSettings;
use vk_cereal::orchestrator::SUPPRESS_ENV;
use vk_cereal::{FragmentSettings, GeneratorOptions, PreambleTemplates};

/// Default configuration filename.
pub const CONFIG_FILENAME: &str = "vk-cereal.toml";

/// Environment variables read by [`EnvOverrides::from_env`].
pub const ENV_GUEST_ENCODER_DIR: &str = "VK_CEREAL_GUEST_ENCODER_DIR";
pub const ENV_HOST_DECODER_DIR: &str = "VK_CEREAL_HOST_DECODER_DIR";
pub const ENV_BASELIB_PREFIX: &str = "VK_CEREAL_BASELIB_PREFIX";
pub const ENV_GUEST_BASELIB_PREFIX: &str = "VK_CEREAL_GUEST_BASELIB_PREFIX";
pub const ENV_BASELIB_LINKNAME: &str = "VK_CEREAL_BASELIB_LINKNAME";
pub const ENV_VK_HEADER_TARGET: &str = "VK_CEREAL_VK_HEADER_TARGET";
pub const ENV_UTILS_LINKNAME: &str = "VK_CEREAL_UTILS_LINKNAME";
pub const ENV_UTILS_PREFIX: &str = "VK_CEREAL_UTILS_PREFIX";

/// Main configuration structure.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output locations.
    pub output: OutputConfig,

    /// Library names and include prefixes.
    pub libraries: LibrariesConfig,

    /// Generation switches.
    pub generation: GenerationConfig,
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory of host and common modules and of the host build fragment.
    pub dir: PathBuf,

    /// Directory of guest encoder modules. Defaults to `<dir>/guest`.
    pub guest_encoder_dir: Option<PathBuf>,

    /// Directory of host decoder modules. Defaults to `<dir>`.
    pub host_decoder_dir: Option<PathBuf>,

    /// Preview artifacts without writing them.
    pub dry_run: bool,
}

/// Library names and include prefixes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LibrariesConfig {
    /// Host base library include prefix.
    pub base_lib_prefix: String,

    /// Guest base library include prefix.
    pub guest_base_lib_prefix: String,

    /// Base library the host target links against.
    pub base_lib_link_name: String,

    /// Vulkan header target the host target links against.
    pub vk_header_target: String,

    /// Utility library the host target links against privately.
    pub utils_link_name: String,

    /// Utility library include prefix.
    pub utils_prefix: String,

    /// Host library target name.
    pub host_library: String,
}

/// Generation switches.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Features generated in addition to the built-in allow-list.
    pub extra_features: Vec<String>,

    /// Regenerate only this module.
    pub suppress: Option<String>,

    /// Command line named in artifact banners. Defaults to the canonical
    /// `vk-cereal generate` invocation for the schema.
    pub command_line: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./cereal"),
            guest_encoder_dir: None,
            host_decoder_dir: None,
            dry_run: false,
        }
    }
}

impl Default for LibrariesConfig {
    fn default() -> Self {
        let layout = LayoutSettings::default();
        let fragments = FragmentSettings::default();
        Self {
            base_lib_prefix: layout.base_lib_prefix,
            guest_base_lib_prefix: layout.guest_base_lib_prefix,
            base_lib_link_name: fragments.base_lib_link_name,
            vk_header_target: fragments.header_target,
            utils_link_name: fragments.utils_link_name,
            utils_prefix: layout.utils_prefix,
            host_library: fragments.host_library,
        }
    }
}

impl Config {
    /// Check values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value("output.dir", "must not be empty"));
        }
        if self.libraries.host_library.is_empty() {
            return Err(ConfigError::invalid_value(
                "libraries.host_library",
                "must not be empty",
            ));
        }
        if let Some(feature) = self.generation.extra_features.iter().find(|f| f.is_empty()) {
            return Err(ConfigError::invalid_value(
                "generation.extra_features",
                format!("invalid feature name {feature:?}"),
            ));
        }
        Ok(())
    }

    /// Engine options for a run whose banners name `command_line`.
    pub fn generator_options(&self, command_line: &str) -> GeneratorOptions {
        let command_line = self
            .generation
            .command_line
            .as_deref()
            .unwrap_or(command_line);

        let mut options = GeneratorOptions::new(&self.output.dir)
            .with_dry_run(self.output.dry_run)
            .with_suppress_except(self.generation.suppress.clone().unwrap_or_default());
        options.guest_encoder_dir = self.output.guest_encoder_dir.clone();
        options.host_decoder_dir = self.output.host_decoder_dir.clone();
        options.templates = PreambleTemplates::gfxstream(command_line);
        options.fragments = self.fragment_settings(command_line);
        options
    }

    /// Include prefixes substituted into module preambles.
    pub fn layout_settings(&self) -> LayoutSettings {
        LayoutSettings {
            guest_base_lib_prefix: self.libraries.guest_base_lib_prefix.clone(),
            base_lib_prefix: self.libraries.base_lib_prefix.clone(),
            utils_prefix: self.libraries.utils_prefix.clone(),
        }
    }

    /// Names substituted into the build fragments.
    pub fn fragment_settings(&self, command_line: &str) -> FragmentSettings {
        FragmentSettings {
            command_line: command_line.to_string(),
            host_library: self.libraries.host_library.clone(),
            base_lib_link_name: self.libraries.base_lib_link_name.clone(),
            header_target: self.libraries.vk_header_target.clone(),
            utils_link_name: self.libraries.utils_link_name.clone(),
        }
    }
}

/// Configuration manager for loading and merging configs.
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from a file path.
    ///
    /// Without an explicit path the default file is used when present; a
    /// missing default file yields the default configuration. An explicit
    /// path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> CliResult<Config> {
        let (config_path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(CONFIG_FILENAME), false),
        };

        if !config_path.exists() {
            if explicit {
                return Err(ConfigError::not_found(config_path).into());
            }
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        Self::parse(&config_path, &content)
    }

    /// Parse configuration text read from `path`.
    pub fn parse(path: &Path, content: &str) -> CliResult<Config> {
        let config: Config = toml::from_str(content)
            .map_err(|e| ConfigError::invalid_toml(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Merge environment overrides into configuration.
    ///
    /// Environment values take precedence over config file values.
    pub fn merge_env(mut config: Config, env: &EnvOverrides) -> Config {
        if let Some(ref dir) = env.guest_encoder_dir {
            config.output.guest_encoder_dir = Some(dir.clone());
        }
        if let Some(ref dir) = env.host_decoder_dir {
            config.output.host_decoder_dir = Some(dir.clone());
        }

        let libraries = &mut config.libraries;
        let strings = [
            (&env.base_lib_prefix, &mut libraries.base_lib_prefix),
            (&env.guest_base_lib_prefix, &mut libraries.guest_base_lib_prefix),
            (&env.base_lib_link_name, &mut libraries.base_lib_link_name),
            (&env.vk_header_target, &mut libraries.vk_header_target),
            (&env.utils_link_name, &mut libraries.utils_link_name),
            (&env.utils_prefix, &mut libraries.utils_prefix),
        ];
        for (value, slot) in strings {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }

        if let Some(ref module) = env.suppress {
            config.generation.suppress = Some(module.clone());
        }

        config
    }

    /// Merge CLI arguments into configuration.
    ///
    /// CLI arguments take precedence over config file and environment values.
    pub fn merge_cli_args(mut config: Config, args: &CliArgs) -> Config {
        if let Some(ref output) = args.output {
            config.output.dir = output.clone();
        }

        if let Some(ref dir) = args.guest_encoder_dir {
            config.output.guest_encoder_dir = Some(dir.clone());
        }

        if let Some(ref dir) = args.host_decoder_dir {
            config.output.host_decoder_dir = Some(dir.clone());
        }

        if let Some(dry_run) = args.dry_run {
            config.output.dry_run = dry_run;
        }

        if let Some(ref module) = args.suppress {
            config.generation.suppress = Some(module.clone());
        }

        config
            .generation
            .extra_features
            .extend(args.extra_features.iter().cloned());

        config
    }

    /// Load, layer and validate the configuration of one invocation.
    pub fn resolve(path: Option<&Path>, env: &EnvOverrides, args: &CliArgs) -> CliResult<Config> {
        let config = Self::load(path)?;
        let config = Self::merge_env(config, env);
        let mut config = Self::merge_cli_args(config, args);
        if config.generation.suppress.as_deref() == Some("") {
            config.generation.suppress = None;
        }
        config.validate()?;
        Ok(config)
    }

    /// Generate default configuration file content with comments.
    pub fn default_config_content() -> &'static str {
        r#"# vk-cereal configuration file
#
# Precedence: built-in defaults < this file < VK_CEREAL_* environment
# variables < command-line flags.

[output]
# Directory of host and common modules; the host CMakeLists.txt goes here
dir = "./cereal"

# Directory of guest encoder modules and sources.mk (default: <dir>/guest)
# guest_encoder_dir = "./guest"

# Directory of host decoder modules (default: <dir>)
# host_decoder_dir = "./host"

# Preview artifacts without writing them
dry_run = false

[libraries]
# Include prefixes substituted into module preambles
base_lib_prefix = "aemu/base"
guest_base_lib_prefix = "aemu/base"
utils_prefix = "utils"

# Names used in the host build fragment
host_library = "OpenglRender_vulkan_cereal"
base_lib_link_name = "android-emu-base"
vk_header_target = ""
utils_link_name = ""

[generation]
# Features generated in addition to the built-in allow-list
extra_features = []

# Regenerate a single module, leaving every other artifact untouched
# (same as ANDROID_EMU_VK_CEREAL_SUPPRESS=<module>)
# suppress = "VkEncoder"

# Command line named in artifact banners
# command_line = "vk-cereal generate --schema vk.json"
"#
    }
}

/// Environment overrides.
///
/// Empty values count as unset.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EnvOverrides {
    pub guest_encoder_dir: Option<PathBuf>,
    pub host_decoder_dir: Option<PathBuf>,
    pub base_lib_prefix: Option<String>,
    pub guest_base_lib_prefix: Option<String>,
    pub base_lib_link_name: Option<String>,
    pub vk_header_target: Option<String>,
    pub utils_link_name: Option<String>,
    pub utils_prefix: Option<String>,
    pub suppress: Option<String>,
}

impl EnvOverrides {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides from `(name, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let pairs: Vec<(&str, &str)> = pairs.into_iter().collect();
        Self::from_lookup(|key| {
            pairs
                .iter()
                .rev()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            guest_encoder_dir: get(ENV_GUEST_ENCODER_DIR).map(PathBuf::from),
            host_decoder_dir: get(ENV_HOST_DECODER_DIR).map(PathBuf::from),
            base_lib_prefix: get(ENV_BASELIB_PREFIX),
            guest_base_lib_prefix: get(ENV_GUEST_BASELIB_PREFIX),
            base_lib_link_name: get(ENV_BASELIB_LINKNAME),
            vk_header_target: get(ENV_VK_HEADER_TARGET),
            utils_link_name: get(ENV_UTILS_LINKNAME),
            utils_prefix: get(ENV_UTILS_PREFIX),
            suppress: get(SUPPRESS_ENV),
        }
    }
}

/// CLI arguments that can override configuration.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Output directory override.
    pub output: Option<PathBuf>,

    /// Guest encoder directory override.
    pub guest_encoder_dir: Option<PathBuf>,

    /// Host decoder directory override.
    pub host_decoder_dir: Option<PathBuf>,

    /// Dry run override.
    pub dry_run: Option<bool>,

    /// Suppression override.
    pub suppress: Option<String>,

    /// Features added to the allow-list.
    pub extra_features: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.output.dir, PathBuf::from("./cereal"));
        assert_eq!(config.output.guest_encoder_dir, None);
        assert!(!config.output.dry_run);
        assert_eq!(config.libraries.base_lib_prefix, "aemu/base");
        assert_eq!(config.libraries.base_lib_link_name, "android-emu-base");
        assert_eq!(config.libraries.host_library, "OpenglRender_vulkan_cereal");
        assert!(config.generation.extra_features.is_empty());
        assert_eq!(config.generation.suppress, None);
    }

    #[test]
    fn test_default_content_parses_to_defaults() {
        let config =
            ConfigManager::parse(Path::new(CONFIG_FILENAME), ConfigManager::default_config_content())
                .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_toml_config() {
        let toml = r#"
[output]
dir = "./out"
guest_encoder_dir = "./guest-out"
dry_run = true

[libraries]
base_lib_prefix = "android/base"
utils_link_name = "gfxstream_utils"

[generation]
extra_features = ["VK_EXT_mesh_shader"]
suppress = "VkEncoder"
"#;

        let config = ConfigManager::parse(Path::new("vk-cereal.toml"), toml).unwrap();
        assert_eq!(config.output.dir, PathBuf::from("./out"));
        assert_eq!(config.output.guest_encoder_dir, Some(PathBuf::from("./guest-out")));
        assert!(config.output.dry_run);
        assert_eq!(config.libraries.base_lib_prefix, "android/base");
        assert_eq!(config.libraries.utils_link_name, "gfxstream_utils");
        assert_eq!(config.libraries.utils_prefix, "utils");
        assert_eq!(config.generation.extra_features, vec!["VK_EXT_mesh_shader"]);
        assert_eq!(config.generation.suppress.as_deref(), Some("VkEncoder"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = ConfigManager::parse(Path::new("bad.toml"), "[output\ndir = 1").unwrap_err();
        assert!(matches!(
            err,
            crate::error::CliError::Config(ConfigError::InvalidToml { .. })
        ));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::default();
        config.libraries.base_lib_prefix = "from/file".to_string();
        let env = EnvOverrides::from_pairs([
            (ENV_BASELIB_PREFIX, "from/env"),
            (ENV_HOST_DECODER_DIR, "/host"),
            (SUPPRESS_ENV, "VkDecoder"),
        ]);

        let merged = ConfigManager::merge_env(config, &env);
        assert_eq!(merged.libraries.base_lib_prefix, "from/env");
        assert_eq!(merged.output.host_decoder_dir, Some(PathBuf::from("/host")));
        assert_eq!(merged.generation.suppress.as_deref(), Some("VkDecoder"));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let env = EnvOverrides::from_pairs([(SUPPRESS_ENV, ""), (ENV_UTILS_PREFIX, "")]);
        assert_eq!(env, EnvOverrides::default());
    }

    #[test]
    fn test_merge_cli_args_preserves_unset() {
        let config = Config::default();
        let merged = ConfigManager::merge_cli_args(config.clone(), &CliArgs::default());
        assert_eq!(merged, config);
    }

    #[test]
    fn test_merge_cli_args_overrides_env() {
        let env = EnvOverrides::from_pairs([(SUPPRESS_ENV, "VkDecoder")]);
        let args = CliArgs {
            suppress: Some("VkEncoder".to_string()),
            extra_features: vec!["VK_EXT_mesh_shader".to_string()],
            ..Default::default()
        };

        let merged =
            ConfigManager::merge_cli_args(ConfigManager::merge_env(Config::default(), &env), &args);
        assert_eq!(merged.generation.suppress.as_deref(), Some("VkEncoder"));
        assert_eq!(merged.generation.extra_features, vec!["VK_EXT_mesh_shader"]);
    }

    #[test]
    fn test_validate_rejects_empty_output_dir() {
        let mut config = Config::default();
        config.output.dir = PathBuf::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "output.dir"
        ));
    }

    #[test]
    fn test_generator_options() {
        let mut config = Config::default();
        config.output.host_decoder_dir = Some(PathBuf::from("/host"));
        config.generation.suppress = Some("VkDecoder".to_string());
        config.libraries.vk_header_target = "vulkan_headers".to_string();

        let options = config.generator_options("vk-cereal generate --schema vk.json");
        assert_eq!(options.output_dir, PathBuf::from("./cereal"));
        assert_eq!(options.host_dir(), PathBuf::from("/host"));
        assert_eq!(options.suppress_except.as_deref(), Some("VkDecoder"));
        assert_eq!(options.templates.command_line, "vk-cereal generate --schema vk.json");
        assert_eq!(options.fragments.header_target, "vulkan_headers");
    }

    #[test]
    fn test_configured_command_line_wins() {
        let mut config = Config::default();
        config.generation.command_line = Some("genvk.py cereal".to_string());

        let options = config.generator_options("vk-cereal generate");
        assert_eq!(options.templates.command_line, "genvk.py cereal");
        assert_eq!(options.fragments.command_line, "genvk.py cereal");
    }
}
