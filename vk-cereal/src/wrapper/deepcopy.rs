//! Deep copies of structs into allocator-owned storage.

use super::{EmitContext, Wrapper, WrapperKind};
use crate::registry::TypeRegistry;
use crate::schema::{Member, StructDef};

/// Emits `deepcopy_*` for every struct.
#[derive(Debug, Default)]
pub struct DeepcopyWrapper;

impl DeepcopyWrapper {
    pub fn new() -> Self {
        Self
    }
}

fn signature(name: &str) -> String {
    format!(
        "void deepcopy_{name}(\n    Allocator* alloc,\n    VkStructureType rootType,\n    const {name}* from,\n    {name}* to)"
    )
}

fn member_copy(registry: &TypeRegistry, member: &Member) -> Option<String> {
    let ty = &member.type_name;
    let name = &member.name;

    if name == "pNext" {
        return Some(
            "    const void* from_pNext = from;\n    size_t pNext_size = 0u;\n    while (!pNext_size && from_pNext) {\n        from_pNext = static_cast<const vk_struct_common*>(from_pNext)->pNext;\n        pNext_size = goldfish_vk_extension_struct_size(rootType, from_pNext);\n    }\n    to->pNext = nullptr;\n    if (pNext_size) {\n        to->pNext = (void*)alloc->alloc(pNext_size);\n        deepcopy_extension_struct(alloc, rootType, from_pNext, (void*)(to->pNext));\n    }\n"
                .to_string(),
        );
    }

    if !member.is_pointer() {
        if registry.is_struct(ty) {
            return Some(format!(
                "    deepcopy_{ty}(alloc, rootType, &from->{name}, ({ty}*)(&to->{name}));\n"
            ));
        }
        // Plain values were covered by the initial assignment.
        return None;
    }

    if ty == "char" {
        return Some(format!(
            "    to->{name} = nullptr;\n    if (from->{name}) {{\n        to->{name} = alloc->strDup(from->{name});\n    }}\n"
        ));
    }

    if ty == "void" {
        return None;
    }

    let count = member
        .len
        .as_ref()
        .map(|len| format!("from->{len}"))
        .unwrap_or_else(|| "1".to_string());

    if registry.is_struct(ty) {
        return Some(format!(
            "    if (from) {{\n        to->{name} = nullptr;\n        if (from->{name}) {{\n            to->{name} = ({ty}*)alloc->alloc({count} * sizeof(const {ty}));\n            for (uint32_t i = 0; i < (uint32_t){count}; ++i) {{\n                deepcopy_{ty}(alloc, rootType, from->{name} + i, ({ty}*)(to->{name} + i));\n            }}\n        }}\n    }}\n"
        ));
    }

    Some(format!(
        "    to->{name} = nullptr;\n    if (from->{name}) {{\n        to->{name} = ({ty}*)alloc->dupArray(from->{name}, {count} * sizeof(const {ty}));\n    }}\n"
    ))
}

impl Wrapper for DeepcopyWrapper {
    fn kind(&self) -> WrapperKind {
        WrapperKind::DeepCopy
    }

    fn on_gen_struct(&mut self, cx: &mut EmitContext<'_>, def: &StructDef) {
        if let Some(target) = &def.alias {
            cx.header(&format!("#define deepcopy_{} deepcopy_{target}\n\n", def.name));
            return;
        }

        let signature = signature(&def.name);
        let mut body = String::from("    (void)alloc;\n    (void)rootType;\n    *to = *from;\n");
        for member in &def.members {
            if let Some(code) = member_copy(cx.registry, member) {
                body.push_str(&code);
            }
        }
        cx.header(&format!("{signature};\n\n"));
        cx.implementation(&format!("{signature} {{\n{body}}}\n\n"));
    }
}
