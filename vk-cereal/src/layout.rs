//! The gfxstream generation layout.
//!
//! Supported features, wrapper restrictions, registry exceptions, the module
//! table and the wrapper bindings used by the emulator build. Everything here
//! is plain data; callers may start from it and adjust before handing it to
//! the orchestrator.

use crate::error::ConfigError;
use crate::gate::FeatureGate;
use crate::module::{ModuleRole, ModuleSpec};
use crate::wrapper::{
    DecoderWrapper, DeepcopyWrapper, DispatchWrapper, EncoderWrapper, ExtensionStructsWrapper,
    FuncTableWrapper, MarshalingVariant, MarshalingWrapper, StructureTypeWrapper,
    TransformWrapper, WrapperBinding, WrapperKind,
};

/// Features that generate code.
pub const SUPPORTED_FEATURES: &[&str] = &[
    "VK_VERSION_1_0",
    "VK_VERSION_1_1",
    "VK_VERSION_1_2",
    "VK_VERSION_1_3",
    // Instance extensions
    "VK_KHR_get_physical_device_properties2",
    "VK_KHR_sampler_ycbcr_conversion",
    "VK_KHR_external_semaphore_capabilities",
    "VK_KHR_external_memory_capabilities",
    "VK_KHR_external_fence_capabilities",
    // Device extensions
    "VK_KHR_storage_buffer_storage_class",
    "VK_KHR_vulkan_memory_model",
    "VK_KHR_buffer_device_address",
    "VK_KHR_maintenance1",
    "VK_KHR_maintenance2",
    "VK_KHR_maintenance3",
    "VK_KHR_bind_memory2",
    "VK_KHR_dedicated_allocation",
    "VK_KHR_get_memory_requirements2",
    "VK_KHR_shader_float16_int8",
    "VK_AMD_gpu_shader_half_float",
    "VK_NV_shader_subgroup_partitioned",
    "VK_KHR_shader_subgroup_extended_types",
    "VK_EXT_provoking_vertex",
    "VK_EXT_line_rasterization",
    "VK_EXT_transform_feedback",
    "VK_EXT_primitive_topology_list_restart",
    "VK_EXT_index_type_uint8",
    "VK_EXT_load_store_op_none",
    "VK_EXT_swapchain_colorspace",
    "VK_EXT_custom_border_color",
    "VK_EXT_shader_stencil_export",
    "VK_KHR_image_format_list",
    "VK_KHR_incremental_present",
    "VK_KHR_pipeline_executable_properties",
    "VK_EXT_queue_family_foreign",
    "VK_KHR_external_semaphore",
    "VK_KHR_external_semaphore_fd",
    "VK_KHR_external_memory",
    "VK_KHR_external_fence",
    "VK_KHR_external_fence_fd",
    "VK_EXT_device_memory_report",
    "VK_KHR_create_renderpass2",
    "VK_KHR_imageless_framebuffer",
    "VK_KHR_descriptor_update_template",
    "VK_EXT_swapchain_maintenance1",
    "VK_EXT_image_compression_control",
    "VK_EXT_image_compression_control_swapchain",
    // Promoted to 1.3
    "VK_KHR_copy_commands2",
    "VK_KHR_dynamic_rendering",
    "VK_KHR_format_feature_flags2",
    "VK_KHR_maintenance4",
    "VK_KHR_shader_integer_dot_product",
    "VK_KHR_shader_non_semantic_info",
    "VK_KHR_shader_terminate_invocation",
    "VK_KHR_synchronization2",
    "VK_KHR_zero_initialize_workgroup_memory",
    "VK_EXT_4444_formats",
    "VK_EXT_extended_dynamic_state",
    "VK_EXT_extended_dynamic_state2",
    "VK_EXT_image_robustness",
    "VK_EXT_inline_uniform_block",
    "VK_EXT_pipeline_creation_cache_control",
    "VK_EXT_pipeline_creation_feedback",
    "VK_EXT_private_data",
    "VK_EXT_shader_demote_to_helper_invocation",
    "VK_EXT_subgroup_size_control",
    "VK_EXT_texel_buffer_alignment",
    "VK_EXT_texture_compression_astc_hdr",
    "VK_EXT_tooling_info",
    "VK_EXT_ycbcr_2plane_444_formats",
    // Host dispatch
    "VK_EXT_debug_utils",
    "VK_KHR_surface",
    "VK_KHR_swapchain",
    "VK_KHR_xcb_surface",
    "VK_KHR_win32_surface",
    "VK_EXT_metal_surface",
    "VK_MVK_moltenvk",
    "VK_KHR_external_semaphore_win32",
    "VK_KHR_external_memory_win32",
    "VK_KHR_external_memory_fd",
    // Android
    "VK_ANDROID_native_buffer",
    "VK_ANDROID_external_memory_android_hardware_buffer",
    "VK_KHR_android_surface",
    // Custom
    "VK_GOOGLE_gfxstream",
    "VK_EXT_graphics_pipeline_library",
];

/// Features processed by a subset of wrappers only.
pub const WRAPPER_RESTRICTIONS: &[(&str, &[WrapperKind])] = &[
    ("VK_EXT_debug_utils", &[WrapperKind::Dispatch]),
    ("VK_KHR_surface", &[WrapperKind::Dispatch]),
    ("VK_KHR_xcb_surface", &[WrapperKind::Dispatch]),
    ("VK_KHR_win32_surface", &[WrapperKind::Dispatch]),
    ("VK_EXT_metal_surface", &[WrapperKind::Dispatch]),
    ("VK_MVK_moltenvk", &[WrapperKind::Dispatch]),
    ("VK_KHR_external_semaphore_win32", &[WrapperKind::Dispatch]),
    ("VK_KHR_external_memory_win32", &[WrapperKind::Dispatch]),
    ("VK_KHR_external_memory_fd", &[WrapperKind::Dispatch]),
    (
        "VK_ANDROID_external_memory_android_hardware_buffer",
        &[WrapperKind::FuncTable],
    ),
    ("VK_KHR_android_surface", &[WrapperKind::FuncTable]),
];

/// Type names kept in the registry even when their feature is not generated.
pub const REGISTRY_EXCEPTIONS: &[&str] = &[
    "int",
    "int64_t",
    "double",
    "VkPresentScalingFlagsEXT",
    "VkPresentGravityFlagsEXT",
];

const STREAM_TYPE: &str = "VulkanStream";
const STREAM_TYPE_GUEST: &str = "VulkanStreamGuest";

/// Host builds always see every guest struct definition.
const HOST_COMMON_EXTRA_HEADERS: &str = "#include \"vk_android_native_buffer.h\"";

/// Disables Android-only extensions the guest implements by hand.
const GUEST_ANDROID_UNDEFS: &str = "
// Stuff we are not going to use but if included,
// will cause compile errors. These are Android Vulkan
// required extensions, but the approach will be to
// implement them completely on the guest side.
#undef VK_KHR_android_surface
#undef VK_ANDROID_external_memory_android_hardware_buffer
";

/// Include prefixes substituted into module preambles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutSettings {
    /// Guest base library include prefix.
    pub guest_base_lib_prefix: String,

    /// Host base library include prefix.
    pub base_lib_prefix: String,

    /// Host utility library include prefix.
    pub utils_prefix: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            guest_base_lib_prefix: "aemu/base".to_string(),
            base_lib_prefix: "aemu/base".to_string(),
            utils_prefix: "utils".to_string(),
        }
    }
}

/// Gate with the supported features, restrictions and registry exceptions.
///
/// `extra_features` extends the allow-list.
pub fn gfxstream_gate(
    extra_features: impl IntoIterator<Item = impl Into<String>>,
) -> Result<FeatureGate, ConfigError> {
    let mut gate = FeatureGate::new(SUPPORTED_FEATURES.iter().copied())
        .with_exceptions(REGISTRY_EXCEPTIONS.iter().copied());
    for feature in extra_features {
        gate.add_supported(feature);
    }
    for (feature, kinds) in WRAPPER_RESTRICTIONS {
        gate.restrict(*feature, kinds.iter().copied())?;
    }
    Ok(gate)
}

/// Preamble of a header defining `<EXTENSION>_ENUM(type, id)` for an
/// extension's value block.
pub fn structure_type_preamble(extension_macro: &str) -> String {
    format!(
        "\n#define {extension_macro}_ENUM(type,id) ((type)(1000000000 + (1000 * ({extension_macro}_NUMBER - 1)) + (id)))\n"
    )
}

fn guest(basename: &str) -> ModuleSpec {
    ModuleSpec::new(basename, ModuleRole::GuestEncoder)
}

fn common(basename: &str) -> ModuleSpec {
    ModuleSpec::new(basename, ModuleRole::Common)
}

/// Host module; the host common headers lead the extra header text unless
/// API headers are suppressed.
fn host(mut spec: ModuleSpec) -> ModuleSpec {
    if !spec.suppress_api_headers {
        spec.extra_header = format!("{HOST_COMMON_EXTRA_HEADERS}\n{}", spec.extra_header);
    }
    spec
}

fn structure_type_module(basename: &str, role: ModuleRole, extension_macro: &str) -> ModuleSpec {
    ModuleSpec::new(basename, role)
        .header_only()
        .without_feature_guards()
        .without_namespace()
        .without_api_headers()
        .with_extra_header(structure_type_preamble(extension_macro))
}

/// Module table, in emission order.
///
/// Every module here produces a header; none is implementation-only. The
/// host sub-decoder, the one implementation-only module of the gfxstream
/// tree, needs an emitter this crate does not ship, so it is left out.
pub fn gfxstream_modules(settings: &LayoutSettings) -> Vec<ModuleSpec> {
    let guest_base = &settings.guest_base_lib_prefix;
    let base = &settings.base_lib_prefix;
    let utils = &settings.utils_prefix;

    let common_guest_includes = "\n#include \"vk_platform_compat.h\"\n";
    let common_guest_impl_includes = "\n#include \"goldfish_vk_extension_structs_guest.h\"\n#include \"goldfish_vk_private_defs.h\"\n\n#include <cstring>\n";
    let common_impl_includes = "\n#include \"goldfish_vk_extension_structs.h\"\n#include \"goldfish_vk_private_defs.h\"\n#include <string.h>\n";
    let deepcopy_include = "\n#include \"vk_util.h\"\n";

    vec![
        guest("VkEncoder")
            .with_extra_header(format!(
                "\n#include \"{guest_base}/AndroidHealthMonitor.h\"\n#include \"goldfish_vk_private_defs.h\"\n#include <memory>\n\nnamespace gfxstream {{\nnamespace guest {{\nclass IOStream;\n}}  // namespace guest\n}}  // namespace gfxstream\n"
            ))
            .with_extra_impl(format!(
                "\n#include \"EncoderDebug.h\"\n#include \"IOStream.h\"\n#include \"Resources.h\"\n#include \"ResourceTracker.h\"\n#include \"Validation.h\"\n#include \"{STREAM_TYPE_GUEST}.h\"\n\n#include \"{guest_base}/AlignedBuf.h\"\n#include \"{guest_base}/BumpPool.h\"\n\n#include \"goldfish_vk_marshaling_guest.h\"\n#include \"goldfish_vk_deepcopy_guest.h\"\n#include \"goldfish_vk_private_defs.h\"\n#include \"goldfish_vk_transform_guest.h\"\n\n#include <memory>\n#include <optional>\n#include <string>\n"
            )),
        guest("goldfish_vk_extension_structs_guest").with_extra_header(format!(
            "\n#include \"vk_platform_compat.h\"\n#include \"goldfish_vk_private_defs.h\"{GUEST_ANDROID_UNDEFS}"
        )),
        guest("goldfish_vk_marshaling_guest")
            .with_extra_header(common_guest_includes)
            .with_extra_header(format!(
                "\n#include \"goldfish_vk_marshaling_guest.h\"\n#include \"goldfish_vk_private_defs.h\"\n#include \"{STREAM_TYPE_GUEST}.h\"\n{GUEST_ANDROID_UNDEFS}"
            ))
            .with_extra_impl(common_guest_impl_includes),
        guest("goldfish_vk_deepcopy_guest")
            .with_extra_header(common_guest_includes)
            .with_extra_header(format!(
                "\n#include \"goldfish_vk_private_defs.h\"\n#include \"{guest_base}/BumpPool.h\"\nusing gfxstream::guest::Allocator;\nusing gfxstream::guest::BumpPool;{GUEST_ANDROID_UNDEFS}"
            ))
            .with_extra_impl(common_guest_impl_includes)
            .with_extra_impl(deepcopy_include),
        guest("goldfish_vk_transform_guest")
            .with_extra_header(common_guest_includes)
            .with_extra_header("\n#include \"goldfish_vk_private_defs.h\"\n")
            .with_extra_impl(common_guest_impl_includes)
            .with_extra_impl("\n#include \"ResourceTracker.h\"\n"),
        structure_type_module(
            "vulkan_gfxstream_structure_type",
            ModuleRole::GuestEncoder,
            "VK_GOOGLE_GFXSTREAM",
        )
        .named("vulkan_gfxstream_structure_type_guest"),
        guest("func_table").with_extra_impl(
            "\n#include \"VkEncoder.h\"\n#include \"ResourceTracker.h\"\n\n#include \"goldfish_vk_private_defs.h\"\n\n#include <log/log.h>\n#include <cstring>\n\n#undef VK_KHR_android_surface\n#if defined(LINUX_GUEST_BUILD)\n#undef VK_ANDROID_native_buffer\n#endif\n",
        ),
        common("goldfish_vk_extension_structs").with_extra_header(format!(
            "\n{HOST_COMMON_EXTRA_HEADERS}\n#include \"goldfish_vk_private_defs.h\"\n"
        )),
        common("goldfish_vk_marshaling")
            .with_extra_header(format!(
                "\n{HOST_COMMON_EXTRA_HEADERS}\n#include \"goldfish_vk_private_defs.h\"\n\n#include \"{STREAM_TYPE}.h\"\n#include \"{base}/files/StreamSerializing.h\"\n"
            ))
            .with_extra_impl(common_impl_includes),
        common("goldfish_vk_deepcopy")
            .with_extra_header(format!(
                "\n{HOST_COMMON_EXTRA_HEADERS}\n#include \"goldfish_vk_private_defs.h\"\n#include \"{base}/BumpPool.h\"\nusing android::base::Allocator;\nusing android::base::BumpPool;\n"
            ))
            .with_extra_impl(common_impl_includes)
            .with_extra_impl(deepcopy_include),
        common("goldfish_vk_dispatch")
            .with_extra_header(format!(
                "\n{HOST_COMMON_EXTRA_HEADERS}\n#include \"goldfish_vk_private_defs.h\"\nnamespace gfxstream {{\nnamespace vk {{\n\nstruct VulkanDispatch;\n\n}} // namespace vk\n}} // namespace gfxstream\nusing DlOpenFunc = void* (void);\nusing DlSymFunc = void* (void*, const char*);\n"
            ))
            .with_extra_impl("\n#include <stdio.h>\n#include <stdlib.h>\n#include <string.h>\n"),
        common("goldfish_vk_transform")
            .with_extra_header(format!(
                "\n{HOST_COMMON_EXTRA_HEADERS}\n#include \"goldfish_vk_private_defs.h\"\n#include \"goldfish_vk_extension_structs.h\"\n"
            ))
            .with_extra_impl("\n#include \"VkDecoderGlobalState.h\"\n"),
        host(
            ModuleSpec::new("VkDecoder", ModuleRole::Host)
                .without_namespace()
                .with_extra_header(format!(
                    "\n#include \"VkDecoderContext.h\"\n#include \"{utils}/GfxApiLogger.h\"\n\n#include <memory>\n"
                ))
                .with_extra_impl(format!(
                    "\n#include \"common/goldfish_vk_marshaling.h\"\n#include \"common/goldfish_vk_private_defs.h\"\n#include \"common/goldfish_vk_transform.h\"\n\n#include \"{base}/BumpPool.h\"\n#include \"{base}/system/System.h\"\n#include \"{base}/Tracing.h\"\n#include \"render-utils/IOStream.h\"\n\n#include \"VkDecoderGlobalState.h\"\n#include \"VulkanDispatch.h\"\n#include \"{STREAM_TYPE}.h\"\n\n#include <functional>\n#include <optional>\n#include <unordered_map>\n"
                )),
        ),
        host(
            structure_type_module(
                "vulkan_gfxstream_structure_type",
                ModuleRole::Host,
                "VK_GOOGLE_GFXSTREAM",
            )
            .named("vulkan_gfxstream_structure_type_host"),
        ),
        host(structure_type_module(
            "vk_android_native_buffer_structure_type",
            ModuleRole::Host,
            "VK_ANDROID_NATIVE_BUFFER",
        )),
    ]
}

/// Wrapper bindings, in registration order.
pub fn gfxstream_bindings() -> Vec<WrapperBinding> {
    vec![
        WrapperBinding::new(EncoderWrapper::new(), "VkEncoder"),
        WrapperBinding::new(
            ExtensionStructsWrapper::new(),
            "goldfish_vk_extension_structs_guest",
        ),
        WrapperBinding::new(
            MarshalingWrapper::new(MarshalingVariant::Guest),
            "goldfish_vk_marshaling_guest",
        ),
        WrapperBinding::new(DeepcopyWrapper::new(), "goldfish_vk_deepcopy_guest"),
        WrapperBinding::new(
            TransformWrapper::new("ResourceTracker"),
            "goldfish_vk_transform_guest",
        ),
        WrapperBinding::new(FuncTableWrapper::new(), "func_table"),
        WrapperBinding::new(ExtensionStructsWrapper::new(), "goldfish_vk_extension_structs"),
        WrapperBinding::new(
            MarshalingWrapper::new(MarshalingVariant::Host),
            "goldfish_vk_marshaling",
        ),
        WrapperBinding::new(DeepcopyWrapper::new(), "goldfish_vk_deepcopy"),
        WrapperBinding::new(DispatchWrapper::new(), "goldfish_vk_dispatch"),
        WrapperBinding::new(
            TransformWrapper::new("VkDecoderGlobalState"),
            "goldfish_vk_transform",
        ),
        WrapperBinding::new(DecoderWrapper::new(), "VkDecoder"),
        WrapperBinding::new(
            StructureTypeWrapper::new("VK_GOOGLE_gfxstream", "VK_GOOGLE_GFXSTREAM_ENUM"),
            "vulkan_gfxstream_structure_type_guest",
        ),
        WrapperBinding::new(
            StructureTypeWrapper::new("VK_GOOGLE_gfxstream", "VK_GOOGLE_GFXSTREAM_ENUM"),
            "vulkan_gfxstream_structure_type_host",
        ),
        WrapperBinding::new(
            StructureTypeWrapper::new("VK_ANDROID_native_buffer", "VK_ANDROID_NATIVE_BUFFER_ENUM"),
            "vk_android_native_buffer_structure_type",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_gate_has_restrictions_and_exceptions() {
        let gate = gfxstream_gate(Vec::<String>::new()).unwrap();

        assert!(gate.is_supported("VK_VERSION_1_0"));
        assert!(!gate.is_supported("VK_NV_ray_tracing"));
        assert_eq!(
            gate.restriction("VK_KHR_android_surface"),
            Some(&[WrapperKind::FuncTable][..])
        );
        assert!(gate.is_exception("VkPresentGravityFlagsEXT"));
        assert_eq!(gate.exceptions().len(), 5);
    }

    #[test]
    fn test_gate_extra_features() {
        let gate = gfxstream_gate(["VK_EXT_mesh_shader"]).unwrap();
        assert!(gate.is_supported("VK_EXT_mesh_shader"));
    }

    #[test]
    fn test_restrictions_only_name_supported_features() {
        for (feature, _) in WRAPPER_RESTRICTIONS {
            assert!(SUPPORTED_FEATURES.contains(feature), "{feature}");
        }
    }

    #[test]
    fn test_every_binding_targets_a_module() {
        let modules = gfxstream_modules(&LayoutSettings::default());
        let names: HashSet<&str> = modules.iter().map(|m| m.name.as_str()).collect();

        assert_eq!(names.len(), modules.len(), "module names are unique");
        for binding in gfxstream_bindings() {
            assert!(names.contains(binding.module.as_str()), "{}", binding.module);
        }
    }

    #[test]
    fn test_structure_type_modules_are_guard_free_headers() {
        let modules = gfxstream_modules(&LayoutSettings::default());
        let native = modules
            .iter()
            .find(|m| m.name == "vk_android_native_buffer_structure_type")
            .unwrap();

        assert!(native.header_only);
        assert!(native.suppress_feature_guards);
        assert!(!native.use_namespace);
        assert!(!native.extra_header.contains("vk_android_native_buffer.h"));
        assert!(native.extra_header.contains(
            "#define VK_ANDROID_NATIVE_BUFFER_ENUM(type,id) ((type)(1000000000 + (1000 * (VK_ANDROID_NATIVE_BUFFER_NUMBER - 1)) + (id)))"
        ));
    }

    #[test]
    fn test_host_modules_lead_with_common_headers() {
        let modules = gfxstream_modules(&LayoutSettings::default());
        let decoder = modules.iter().find(|m| m.name == "VkDecoder").unwrap();

        assert!(decoder
            .extra_header
            .starts_with("#include \"vk_android_native_buffer.h\"\n"));
        assert!(decoder.extra_header.contains("#include \"utils/GfxApiLogger.h\""));
        assert!(decoder.extra_impl.contains("#include \"aemu/base/BumpPool.h\""));
    }

    #[test]
    fn test_every_module_produces_a_header() {
        let modules = gfxstream_modules(&LayoutSettings::default());

        assert!(modules.iter().all(|m| !m.impl_only));
        assert!(!modules.iter().any(|m| m.name == "VkSubDecoder"));
    }
}
