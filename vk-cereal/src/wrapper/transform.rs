//! Guest/host representation transforms for structs.
//!
//! Structs holding a `VkDeviceMemory` are handed to the resource tracker;
//! nested structs are transformed member by member. Every struct gets both
//! entry points, even when the body is empty.

use super::{EmitContext, Wrapper, WrapperKind};
use crate::registry::TypeRegistry;
use crate::schema::{Member, StructDef};

const DIRECTIONS: [&str; 2] = ["tohost", "fromhost"];

/// Emits `transform_tohost_*` / `transform_fromhost_*` for every struct.
#[derive(Debug)]
pub struct TransformWrapper {
    tracker_type: String,
}

impl TransformWrapper {
    /// Transforms taking a `tracker_type*` as first parameter.
    pub fn new(tracker_type: impl Into<String>) -> Self {
        Self {
            tracker_type: tracker_type.into(),
        }
    }

    fn signature(&self, direction: &str, name: &str) -> String {
        format!(
            "void transform_{direction}_{name}(\n    {}* resourceTracker,\n    {name}* toTransform)",
            self.tracker_type
        )
    }
}

fn has_device_memory(def: &StructDef) -> bool {
    def.members
        .iter()
        .any(|m| m.type_name == "VkDeviceMemory" && m.name == "memory" && !m.is_pointer())
}

fn member_transform(registry: &TypeRegistry, direction: &str, member: &Member) -> Option<String> {
    let ty = &member.type_name;
    let name = &member.name;
    if !registry.is_struct(ty) {
        return None;
    }
    match (&member.len, member.is_pointer()) {
        (Some(len), true) => Some(format!(
            "    if (toTransform->{name}) {{\n        for (uint32_t i = 0; i < (uint32_t)toTransform->{len}; ++i) {{\n            transform_{direction}_{ty}(resourceTracker, ({ty}*)(toTransform->{name} + i));\n        }}\n    }}\n"
        )),
        (None, true) => Some(format!(
            "    if (toTransform->{name}) {{\n        transform_{direction}_{ty}(resourceTracker, ({ty}*)(toTransform->{name}));\n    }}\n"
        )),
        _ => Some(format!(
            "    transform_{direction}_{ty}(resourceTracker, ({ty}*)(&toTransform->{name}));\n"
        )),
    }
}

impl Wrapper for TransformWrapper {
    fn kind(&self) -> WrapperKind {
        WrapperKind::Transform
    }

    fn on_begin(&mut self, cx: &mut EmitContext<'_>) {
        cx.header(&format!("class {};\n\n", self.tracker_type));
    }

    fn on_gen_struct(&mut self, cx: &mut EmitContext<'_>, def: &StructDef) {
        if let Some(target) = &def.alias {
            for direction in DIRECTIONS {
                cx.header(&format!(
                    "#define transform_{direction}_{} transform_{direction}_{target}\n\n",
                    def.name
                ));
            }
            return;
        }

        let memory = has_device_memory(def);
        for direction in DIRECTIONS {
            let signature = self.signature(direction, &def.name);
            let mut body = String::from("    (void)resourceTracker;\n    (void)toTransform;\n");
            if memory {
                let present = |field: &str| {
                    if def.members.iter().any(|m| m.name == field) {
                        format!("&toTransform->{field}")
                    } else {
                        "nullptr".to_string()
                    }
                };
                body.push_str(&format!(
                    "    resourceTracker->deviceMemoryTransform_{direction}({}, 1, {}, 1, {}, 1, nullptr, 0, nullptr, 0);\n",
                    present("memory"),
                    present("offset"),
                    present("size"),
                ));
            }
            for member in &def.members {
                if let Some(code) = member_transform(cx.registry, direction, member) {
                    body.push_str(&code);
                }
            }
            cx.header(&format!("{signature};\n\n"));
            cx.implementation(&format!("{signature} {{\n{body}}}\n\n"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wrapper::test_support::module;

    #[test]
    fn test_memory_struct_calls_tracker() {
        let registry = TypeRegistry::new();
        let mut m = module("goldfish_vk_transform");
        let mut wrapper = TransformWrapper::new("VkDecoderGlobalState");
        let mut cx = EmitContext {
            module: &mut m,
            registry: &registry,
        };

        wrapper.on_begin(&mut cx);
        wrapper.on_gen_struct(
            &mut cx,
            &StructDef::new(
                "VkMappedMemoryRange",
                vec![
                    Member::new("memory", "VkDeviceMemory"),
                    Member::new("offset", "VkDeviceSize"),
                    Member::new("size", "VkDeviceSize"),
                ],
            ),
        );

        assert!(m.header_buffer().starts_with("class VkDecoderGlobalState;\n\n"));
        assert!(m
            .header_buffer()
            .contains("void transform_tohost_VkMappedMemoryRange(\n    VkDecoderGlobalState* resourceTracker"));
        assert!(m.impl_buffer().contains(
            "resourceTracker->deviceMemoryTransform_fromhost(&toTransform->memory, 1, &toTransform->offset, 1, &toTransform->size, 1, nullptr, 0, nullptr, 0);"
        ));
    }

    #[test]
    fn test_nested_struct_array() {
        let mut registry = TypeRegistry::new();
        registry.on_gen_struct(&StructDef::new("VkSparseMemoryBind", vec![]));
        let mut m = module("goldfish_vk_transform_guest");
        let mut wrapper = TransformWrapper::new("ResourceTracker");

        wrapper.on_gen_struct(
            &mut EmitContext {
                module: &mut m,
                registry: &registry,
            },
            &StructDef::new(
                "VkSparseBufferMemoryBindInfo",
                vec![
                    Member::new("bindCount", "uint32_t"),
                    Member::const_ptr("pBinds", "VkSparseMemoryBind").with_len("bindCount"),
                ],
            ),
        );

        let text = m.impl_buffer();
        assert!(text.contains("for (uint32_t i = 0; i < (uint32_t)toTransform->bindCount; ++i)"));
        assert!(text.contains(
            "transform_tohost_VkSparseMemoryBind(resourceTracker, (VkSparseMemoryBind*)(toTransform->pBinds + i));"
        ));
        assert!(!text.contains("deviceMemoryTransform"));
    }
}
