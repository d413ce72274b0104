//! Size lookup for structs that can appear in a `pNext` chain.

use super::{EmitContext, Wrapper, WrapperKind};
use crate::schema::StructDef;

const STRUCT_TYPE_DECL: &str = "uint32_t goldfish_vk_struct_type(const void* structExtension);\n\n";
const SIZE_DECL: &str =
    "size_t goldfish_vk_extension_struct_size(VkStructureType rootType, const void* structExtension);\n\n";

/// Emits `goldfish_vk_extension_struct_size`, one `case` per extending struct.
#[derive(Debug, Default)]
pub struct ExtensionStructsWrapper {
    cases: usize,
}

impl ExtensionStructsWrapper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Wrapper for ExtensionStructsWrapper {
    fn kind(&self) -> WrapperKind {
        WrapperKind::ExtensionStructs
    }

    fn on_begin(&mut self, cx: &mut EmitContext<'_>) {
        cx.header(STRUCT_TYPE_DECL);
        cx.header(SIZE_DECL);
        cx.implementation(
            "uint32_t goldfish_vk_struct_type(const void* structExtension) {\n    const uint32_t asStructType = *(reinterpret_cast<const uint32_t*>(structExtension));\n    return asStructType;\n}\n\n",
        );
        cx.implementation(
            "size_t goldfish_vk_extension_struct_size(VkStructureType rootType, const void* structExtension) {\n    (void)rootType;\n    if (!structExtension) {\n        return (size_t)0;\n    }\n    uint32_t structType = (uint32_t)goldfish_vk_struct_type(structExtension);\n    switch (structType) {\n",
        );
    }

    fn on_gen_struct(&mut self, cx: &mut EmitContext<'_>, def: &StructDef) {
        if def.alias.is_some() || def.extends.is_empty() {
            return;
        }
        let Some(structure_type) = &def.structure_type else {
            return;
        };
        self.cases += 1;
        cx.implementation(&format!(
            "        case {structure_type}: {{\n            return sizeof({});\n        }}\n",
            def.name
        ));
    }

    fn on_end(&mut self, cx: &mut EmitContext<'_>) {
        cx.implementation("        default: {\n            return (size_t)0;\n        }\n    }\n}\n\n");
    }
}
