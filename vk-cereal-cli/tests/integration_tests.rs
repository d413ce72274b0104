//! Integration tests for vk-cereal-cli.
//!
//! These tests verify end-to-end functionality of the CLI library:
//! configuration layering, schema loading, generation, suppression and
//! validation against the files on disk.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use vk_cereal_cli::{
    config::{CliArgs, Config, ConfigManager, EnvOverrides, ENV_BASELIB_PREFIX},
    error::{CliError, LoadError},
    loader::load_schema,
    runner,
};

const COMMAND: &str = "vk-cereal generate --schema tests/fixtures/minimal_schema.json";

/// Get the path to test fixtures.
fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn config_for(dir: &Path) -> Config {
    let mut config = Config::default();
    config.output.dir = dir.to_path_buf();
    config
}

fn generate_into(dir: &Path) -> vk_cereal::GenerationReport {
    let schema = load_schema(&fixtures_path().join("minimal_schema.json")).unwrap();
    runner::generate(&config_for(dir), &schema, COMMAND).unwrap()
}

// =============================================================================
// Schema Loading Tests
// =============================================================================

#[test]
fn test_load_fixture_schema() {
    let schema = load_schema(&fixtures_path().join("minimal_schema.json")).unwrap();

    let names: Vec<&str> = schema.features.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["VK_VERSION_1_0", "VK_EXT_surface_maintenance1", "VK_GOOGLE_gfxstream"]
    );
    assert_eq!(schema.features[2].number, Some(386));
}

#[test]
fn test_duplicate_definition_fixture_is_rejected() {
    let err = load_schema(&fixtures_path().join("duplicate_definition.json")).unwrap_err();
    assert!(matches!(err, CliError::Load(LoadError::Invalid { .. })));
    assert_eq!(err.exit_code(), 1);
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_load_fixture_config() {
    let config = ConfigManager::load(Some(&fixtures_path().join("custom_config.toml"))).unwrap();

    assert_eq!(config.output.dir, PathBuf::from("./out"));
    assert_eq!(
        config.output.guest_encoder_dir,
        Some(PathBuf::from("./out/guest-encoder"))
    );
    assert_eq!(config.libraries.host_library, "gfxstream_vulkan_cereal");
    assert_eq!(config.libraries.base_lib_link_name, "android-emu-base");
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let err = ConfigManager::load(Some(Path::new("definitely/not/here.toml"))).unwrap_err();
    assert!(matches!(err, CliError::Config(_)));
}

#[test]
fn test_resolve_layers_file_env_and_args() {
    let env = EnvOverrides::from_pairs([(ENV_BASELIB_PREFIX, "env/base")]);
    let args = CliArgs {
        output: Some(PathBuf::from("./cli-out")),
        extra_features: vec!["VK_KHR_present_id".to_string()],
        ..Default::default()
    };

    let config = ConfigManager::resolve(
        Some(&fixtures_path().join("custom_config.toml")),
        &env,
        &args,
    )
    .unwrap();

    assert_eq!(config.output.dir, PathBuf::from("./cli-out"));
    assert_eq!(config.libraries.base_lib_prefix, "env/base");
    assert_eq!(config.libraries.utils_link_name, "gfxstream_utils");
    assert_eq!(
        config.generation.extra_features,
        vec!["VK_EXT_mesh_shader", "VK_KHR_present_id"]
    );
}

#[test]
fn test_init_content_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vk-cereal.toml");
    fs::write(&path, ConfigManager::default_config_content()).unwrap();

    let config = ConfigManager::load(Some(&path)).unwrap();
    assert_eq!(config, Config::default());
}

// =============================================================================
// Generation Tests
// =============================================================================

#[test]
fn test_generate_writes_layout() {
    let dir = TempDir::new().unwrap();
    let report = generate_into(dir.path());

    assert!(report.is_success());
    for path in [
        "guest/VkEncoder.h",
        "guest/VkEncoder.cpp",
        "guest/func_table.cpp",
        "guest/vulkan_gfxstream_structure_type.h",
        "guest/sources.mk",
        "common/goldfish_vk_marshaling.h",
        "common/goldfish_vk_dispatch.cpp",
        "VkDecoder.h",
        "VkDecoder.cpp",
        "vulkan_gfxstream_structure_type.h",
        "CMakeLists.txt",
    ] {
        assert!(dir.path().join(path).exists(), "missing {path}");
    }

    let marshaling = fs::read_to_string(dir.path().join("common/goldfish_vk_marshaling.h")).unwrap();
    assert!(marshaling.contains(&format!("generated by {COMMAND}")));
    assert!(marshaling.contains("#define OP_vkCreateInstance 20000"));
    assert!(!marshaling.contains("VkSurfacePresentModeEXT"));

    let structure_type =
        fs::read_to_string(dir.path().join("vulkan_gfxstream_structure_type.h")).unwrap();
    assert!(structure_type.contains(
        "#define VK_STRUCTURE_TYPE_IMPORT_COLOR_BUFFER_GOOGLE VK_GOOGLE_GFXSTREAM_ENUM(VkStructureType, 0)"
    ));
    assert!(!structure_type.contains("#ifdef"));
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let schema = load_schema(&fixtures_path().join("minimal_schema.json")).unwrap();
    let mut config = config_for(dir.path());
    config.output.dry_run = true;

    let report = runner::generate(&config, &schema, COMMAND).unwrap();

    assert!(report.is_success());
    assert!(report.write_results().all(|r| !r.was_written()));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_suppression_regenerates_one_module() {
    let dir = TempDir::new().unwrap();
    generate_into(dir.path());

    let decoder = dir.path().join("VkDecoder.cpp");
    let encoder = dir.path().join("guest/VkEncoder.cpp");
    let cmake = dir.path().join("CMakeLists.txt");
    let original_encoder = fs::read_to_string(&encoder).unwrap();
    fs::write(&decoder, "// hand edit\n").unwrap();
    fs::write(&encoder, "// hand edit\n").unwrap();
    fs::write(&cmake, "# hand edit\n").unwrap();

    let schema = load_schema(&fixtures_path().join("minimal_schema.json")).unwrap();
    let mut config = config_for(dir.path());
    config.generation.suppress = Some("VkEncoder".to_string());
    let report = runner::generate(&config, &schema, COMMAND).unwrap();

    assert_eq!(report.written(), vec!["VkEncoder"]);
    assert_eq!(fs::read_to_string(&encoder).unwrap(), original_encoder);
    assert_eq!(fs::read_to_string(&decoder).unwrap(), "// hand edit\n");
    assert_eq!(fs::read_to_string(&cmake).unwrap(), "# hand edit\n");
}

#[test]
fn test_write_failure_reports_partial_success() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("common"), "not a directory").unwrap();

    let report = generate_into(dir.path());

    assert!(!report.is_success());
    let failed: Vec<&str> = report.failed().iter().map(|(module, _)| *module).collect();
    assert!(failed.contains(&"goldfish_vk_marshaling"));
    assert!(!failed.contains(&"VkEncoder"));
    assert!(dir.path().join("guest/VkEncoder.cpp").exists());
    assert!(dir.path().join("VkDecoder.cpp").exists());
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_validate_detects_stale_and_missing_artifacts() {
    let dir = TempDir::new().unwrap();
    generate_into(dir.path());

    let schema = load_schema(&fixtures_path().join("minimal_schema.json")).unwrap();
    let config = config_for(dir.path());

    let fresh = runner::validate(&config, &schema, COMMAND).unwrap();
    assert!(fresh.is_up_to_date(), "{fresh:?}");
    assert!(fresh.checked > 0);

    fs::write(dir.path().join("VkDecoder.cpp"), "// stale\n").unwrap();
    fs::remove_file(dir.path().join("guest/sources.mk")).unwrap();

    let stale = runner::validate(&config, &schema, COMMAND).unwrap();
    assert!(!stale.is_up_to_date());
    assert_eq!(stale.stale, vec![dir.path().join("VkDecoder.cpp")]);
    assert_eq!(stale.missing, vec![dir.path().join("guest/sources.mk")]);
    assert_eq!(
        CliError::Validation("stale".to_string()).exit_code(),
        2
    );
}

#[test]
fn test_validate_depends_on_banner_command() {
    let dir = TempDir::new().unwrap();
    generate_into(dir.path());

    let schema = load_schema(&fixtures_path().join("minimal_schema.json")).unwrap();
    let report =
        runner::validate(&config_for(dir.path()), &schema, "vk-cereal generate --schema other.json")
            .unwrap();

    assert!(!report.is_up_to_date());
    assert!(report.missing.is_empty());
}
