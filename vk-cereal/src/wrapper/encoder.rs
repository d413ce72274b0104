//! Guest-side command encoder.

use super::{EmitContext, Wrapper, WrapperKind, OPCODE_BASE};
use crate::registry::TypeRegistry;
use crate::schema::{CommandDef, Member};

/// Emits `class VkEncoder` with one method per command.
///
/// Aliased commands are not encoded; the function table routes them to the
/// command they re-export.
#[derive(Debug)]
pub struct EncoderWrapper {
    next_opcode: u32,
}

impl Default for EncoderWrapper {
    fn default() -> Self {
        Self {
            next_opcode: OPCODE_BASE,
        }
    }
}

impl EncoderWrapper {
    pub fn new() -> Self {
        Self::default()
    }
}

fn method_params(def: &CommandDef) -> String {
    let mut params: Vec<String> = def.params.iter().map(Member::c_decl).collect();
    params.push("uint32_t doLock".to_string());
    params.join(", ")
}

fn encode_param(registry: &TypeRegistry, param: &Member, index: usize) -> String {
    let ty = &param.type_name;
    let name = &param.name;
    if registry.is_handle(ty) && !param.is_pointer() {
        return format!(
            "    uint64_t cgen_var_{index};\n    stream->handleMapping()->mapHandles_{ty}_u64(&{name}, &cgen_var_{index}, 1);\n    stream->write((uint64_t*)&cgen_var_{index}, 1 * 8);\n"
        );
    }
    if registry.is_struct(ty) && param.is_pointer() {
        return format!(
            "    if ({name}) {{\n        marshal_{ty}(stream, VK_STRUCTURE_TYPE_MAX_ENUM, ({ty}*)({name}));\n    }}\n"
        );
    }
    if param.is_pointer() {
        return format!("    stream->write(({ty}*){name}, sizeof({ty}));\n");
    }
    format!("    stream->write(({ty}*)&{name}, sizeof({ty}));\n")
}

impl Wrapper for EncoderWrapper {
    fn kind(&self) -> WrapperKind {
        WrapperKind::Encoder
    }

    fn on_begin(&mut self, cx: &mut EmitContext<'_>) {
        cx.header(
            "class VkEncoder {\n   public:\n    VkEncoder(gfxstream::guest::IOStream* stream);\n    ~VkEncoder();\n\n",
        );
    }

    fn on_gen_cmd(&mut self, cx: &mut EmitContext<'_>, def: &CommandDef) {
        if def.alias.is_some() {
            return;
        }
        let opcode = self.next_opcode;
        self.next_opcode += 1;

        let params = method_params(def);
        cx.header(&format!("    {} {}({params});\n", def.return_type, def.name));

        let mut body = format!(
            "{} VkEncoder::{}({params}) {{\n    (void)doLock;\n    auto stream = mImpl->stream();\n    uint32_t opcode_{} = OP_{};\n    stream->write(&opcode_{}, sizeof(uint32_t));\n",
            def.return_type, def.name, def.name, def.name, def.name
        );
        // OP_* comes from the marshaling header; keep the numeric value visible.
        body.push_str(&format!("    // opcode {opcode}\n"));
        for (index, param) in def.params.iter().enumerate() {
            body.push_str(&encode_param(cx.registry, param, index));
        }
        if def.returns_value() {
            body.push_str(&format!(
                "    {ret} {name}_return = ({ret})0;\n    stream->read(&{name}_return, sizeof({ret}));\n    stream->flush();\n    return {name}_return;\n",
                ret = def.return_type,
                name = def.name
            ));
        } else {
            body.push_str("    stream->flush();\n");
        }
        body.push_str("}\n\n");
        cx.implementation(&body);
    }

    fn on_end(&mut self, cx: &mut EmitContext<'_>) {
        cx.header("\n   private:\n    class Impl;\n    std::unique_ptr<Impl> mImpl;\n};\n\n");
    }
}
