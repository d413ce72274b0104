//! Marshal / unmarshal routines and command opcodes.

use super::{EmitContext, Wrapper, WrapperKind, OPCODE_BASE};
use crate::registry::TypeRegistry;
use crate::schema::{CommandDef, Member, StructDef};

/// Which stream type the generated routines target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarshalingVariant {
    Guest,
    Host,
}

impl MarshalingVariant {
    fn stream_type(&self) -> &'static str {
        match self {
            MarshalingVariant::Guest => "VulkanStreamGuest",
            MarshalingVariant::Host => "VulkanStream",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Marshal,
    Unmarshal,
}

impl Direction {
    fn prefix(&self) -> &'static str {
        match self {
            Direction::Marshal => "marshal",
            Direction::Unmarshal => "unmarshal",
        }
    }

    fn var(&self) -> &'static str {
        match self {
            Direction::Marshal => "forMarshaling",
            Direction::Unmarshal => "forUnmarshaling",
        }
    }

    fn stream_op(&self) -> &'static str {
        match self {
            Direction::Marshal => "write",
            Direction::Unmarshal => "read",
        }
    }
}

/// Emits `marshal_*` / `unmarshal_*` for every struct and an `OP_*` opcode
/// for every command.
#[derive(Debug)]
pub struct MarshalingWrapper {
    variant: MarshalingVariant,
    next_opcode: u32,
    /// (command, opcode, feature) for the opcode name table
    opcodes: Vec<(String, u32, Option<String>)>,
}

impl MarshalingWrapper {
    pub fn new(variant: MarshalingVariant) -> Self {
        Self {
            variant,
            next_opcode: OPCODE_BASE,
            opcodes: Vec::new(),
        }
    }

    fn signature(&self, direction: Direction, name: &str) -> String {
        let constness = match direction {
            Direction::Marshal => "const ",
            Direction::Unmarshal => "",
        };
        format!(
            "void {prefix}_{name}(\n    {stream}* vkStream,\n    VkStructureType rootType,\n    {constness}{name}* {var})",
            prefix = direction.prefix(),
            stream = self.variant.stream_type(),
            var = direction.var(),
        )
    }

    fn body(&self, registry: &TypeRegistry, direction: Direction, def: &StructDef) -> String {
        let mut body = String::from("    (void)rootType;\n");
        for (index, member) in def.members.iter().enumerate() {
            body.push_str(&member_code(registry, direction, member, index));
        }
        body
    }
}

fn member_code(registry: &TypeRegistry, direction: Direction, member: &Member, index: usize) -> String {
    let var = direction.var();
    let prefix = direction.prefix();
    let op = direction.stream_op();
    let ty = &member.type_name;
    let name = &member.name;

    if name == "pNext" {
        return format!("    {prefix}_extension_struct(vkStream, rootType, {var}->pNext);\n");
    }

    if registry.is_handle(ty) && !member.is_pointer() {
        return match direction {
            Direction::Marshal => format!(
                "    uint64_t cgen_var_{index};\n    vkStream->handleMapping()->mapHandles_{ty}_u64(&{var}->{name}, &cgen_var_{index}, 1);\n    vkStream->write((uint64_t*)&cgen_var_{index}, 1 * 8);\n"
            ),
            Direction::Unmarshal => format!(
                "    uint64_t cgen_var_{index};\n    vkStream->read((uint64_t*)&cgen_var_{index}, 1 * 8);\n    vkStream->handleMapping()->mapHandles_u64_{ty}(&cgen_var_{index}, ({ty}*)&{var}->{name}, 1);\n"
            ),
        };
    }

    if registry.is_struct(ty) {
        return match (&member.len, member.is_pointer()) {
            (Some(len), true) => format!(
                "    for (uint32_t i = 0; i < (uint32_t){var}->{len}; ++i) {{\n        {prefix}_{ty}(vkStream, rootType, ({ty}*)({var}->{name} + i));\n    }}\n"
            ),
            (None, true) => {
                format!("    {prefix}_{ty}(vkStream, rootType, ({ty}*)({var}->{name}));\n")
            }
            _ => format!("    {prefix}_{ty}(vkStream, rootType, ({ty}*)(&{var}->{name}));\n"),
        };
    }

    if member.is_pointer() {
        if ty == "char" {
            return match direction {
                Direction::Marshal => format!("    vkStream->putString({var}->{name});\n"),
                Direction::Unmarshal => {
                    format!("    vkStream->loadStringInPlace((char**)&{var}->{name});\n")
                }
            };
        }
        if let Some(len) = &member.len {
            return format!(
                "    vkStream->{op}(({ty}*){var}->{name}, (({var}->{len})) * sizeof({ty}));\n"
            );
        }
        return format!("    vkStream->{op}(({ty}*){var}->{name}, sizeof({ty}));\n");
    }

    format!("    vkStream->{op}(({ty}*)&{var}->{name}, sizeof({ty}));\n")
}

impl Wrapper for MarshalingWrapper {
    fn kind(&self) -> WrapperKind {
        WrapperKind::Marshaling
    }

    fn name(&self) -> String {
        match self.variant {
            MarshalingVariant::Guest => "marshaling(guest)".to_string(),
            MarshalingVariant::Host => "marshaling(host)".to_string(),
        }
    }

    fn on_begin(&mut self, cx: &mut EmitContext<'_>) {
        if self.variant == MarshalingVariant::Host {
            cx.header("const char* api_opcode_to_string(const uint32_t opcode);\n\n");
        }
    }

    fn on_gen_struct(&mut self, cx: &mut EmitContext<'_>, def: &StructDef) {
        if let Some(target) = &def.alias {
            for direction in [Direction::Marshal, Direction::Unmarshal] {
                let prefix = direction.prefix();
                cx.header(&format!(
                    "#define {prefix}_{} {prefix}_{target}\n\n",
                    def.name
                ));
            }
            return;
        }

        for direction in [Direction::Marshal, Direction::Unmarshal] {
            let signature = self.signature(direction, &def.name);
            let body = self.body(cx.registry, direction, def);
            cx.header(&format!("{signature};\n\n"));
            cx.implementation(&format!("{signature} {{\n{body}}}\n\n"));
        }
    }

    fn on_gen_cmd(&mut self, cx: &mut EmitContext<'_>, def: &CommandDef) {
        if def.alias.is_some() {
            return;
        }
        let opcode = self.next_opcode;
        self.next_opcode += 1;
        cx.header(&format!("#define OP_{} {}\n", def.name, opcode));
        self.opcodes.push((
            def.name.clone(),
            opcode,
            cx.registry.current_feature().map(str::to_string),
        ));
    }

    fn on_end(&mut self, cx: &mut EmitContext<'_>) {
        if self.variant != MarshalingVariant::Host {
            return;
        }
        let mut table = String::from(
            "const char* api_opcode_to_string(const uint32_t opcode) {\n    switch (opcode) {\n",
        );
        let mut open_feature: Option<&str> = None;
        for (name, _, feature) in &self.opcodes {
            let feature = feature.as_deref();
            if feature != open_feature {
                if open_feature.is_some() {
                    table.push_str("#endif\n");
                }
                if let Some(f) = feature {
                    table.push_str(&format!("#ifdef {f}\n"));
                }
                open_feature = feature;
            }
            table.push_str(&format!(
                "        case OP_{name}: {{\n            return \"OP_{name}\";\n        }}\n"
            ));
        }
        if open_feature.is_some() {
            table.push_str("#endif\n");
        }
        table.push_str("        default: {\n            return \"OP_UNKNOWN_API_CALL\";\n        }\n    }\n}\n\n");
        cx.implementation(&table);
    }
}
