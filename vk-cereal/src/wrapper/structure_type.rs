//! Extension-scoped `VkStructureType` values.
//!
//! Vendor extensions that are not in the upstream headers get their
//! structure-type values as macros over an extension-number helper, e.g.
//! `#define VK_STRUCTURE_TYPE_IMPORT_COLOR_BUFFER_GOOGLE VK_GOOGLE_GFXSTREAM_ENUM(VkStructureType, 0)`.

use super::{EmitContext, Wrapper, WrapperKind};
use crate::schema::GroupDef;

const STRUCTURE_TYPE_GROUP: &str = "VkStructureType";

/// Emits `#define`s for the structure-type values introduced by one extension.
#[derive(Debug)]
pub struct StructureTypeWrapper {
    extension: String,
    macro_name: String,
}

impl StructureTypeWrapper {
    /// Values whose owning extension is `extension`, spelled through `macro_name`.
    pub fn new(extension: impl Into<String>, macro_name: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            macro_name: macro_name.into(),
        }
    }
}

impl Wrapper for StructureTypeWrapper {
    fn kind(&self) -> WrapperKind {
        WrapperKind::StructureType
    }

    fn on_gen_group(&mut self, cx: &mut EmitContext<'_>, def: &GroupDef) {
        if def.name != STRUCTURE_TYPE_GROUP {
            return;
        }
        for value in &def.values {
            if value.extension.as_deref() != Some(self.extension.as_str()) {
                continue;
            }
            let Some(offset) = value.offset else {
                continue;
            };
            cx.header(&format!(
                "#define {} {}({STRUCTURE_TYPE_GROUP}, {offset})\n",
                value.name, self.macro_name
            ));
        }
    }
}
