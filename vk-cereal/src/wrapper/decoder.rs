//! Host-side command decoder.

use super::{EmitContext, Wrapper, WrapperKind};
use crate::registry::TypeRegistry;
use crate::schema::{CommandDef, Member};

/// Emits `class VkDecoder` and the opcode dispatch loop.
#[derive(Debug, Default)]
pub struct DecoderWrapper {
    decoded: usize,
}

impl DecoderWrapper {
    pub fn new() -> Self {
        Self::default()
    }
}

fn decode_param(registry: &TypeRegistry, param: &Member, index: usize) -> String {
    let ty = &param.type_name;
    let name = &param.name;
    if registry.is_handle(ty) && !param.is_pointer() {
        return format!(
            "                {ty} {name};\n                uint64_t cgen_var_{index};\n                memcpy((uint64_t*)&cgen_var_{index}, *readStreamPtrPtr, 1 * 8);\n                *readStreamPtrPtr += 1 * 8;\n                *({ty}*)&{name} = ({ty})unbox_{ty}(({ty})(*&cgen_var_{index}));\n"
        );
    }
    if registry.is_struct(ty) && param.is_pointer() {
        return format!(
            "                {ty}* {name};\n                vkReadStream->alloc((void**)&{name}, sizeof({ty}));\n                reservedunmarshal_{ty}(vkReadStream, VK_STRUCTURE_TYPE_MAX_ENUM, ({ty}*)({name}), readStreamPtrPtr);\n"
        );
    }
    if param.is_pointer() {
        return format!(
            "                {ty}* {name};\n                vkReadStream->alloc((void**)&{name}, sizeof({ty}));\n                memcpy((void*){name}, *readStreamPtrPtr, sizeof({ty}));\n                *readStreamPtrPtr += sizeof({ty});\n"
        );
    }
    format!(
        "                {ty} {name};\n                memcpy((void*)&{name}, *readStreamPtrPtr, sizeof({ty}));\n                *readStreamPtrPtr += sizeof({ty});\n"
    )
}

impl Wrapper for DecoderWrapper {
    fn kind(&self) -> WrapperKind {
        WrapperKind::Decoder
    }

    fn on_begin(&mut self, cx: &mut EmitContext<'_>) {
        cx.header(
            "class VkDecoder {\n   public:\n    VkDecoder();\n    ~VkDecoder();\n    size_t decode(void* buf, size_t bufsize, IOStream* stream, const VkDecoderContext&);\n\n   private:\n    class Impl;\n    std::unique_ptr<Impl> mImpl;\n};\n\n",
        );
        cx.implementation(
            "size_t VkDecoder::Impl::decode(void* buf, size_t len, IOStream* ioStream, const VkDecoderContext& context) {\n    if (len < 8) return 0;\n    unsigned char* ptr = (unsigned char*)buf;\n    const unsigned char* const end = (const unsigned char*)buf + len;\n    while (end - ptr >= 8) {\n        uint32_t opcode = *(uint32_t*)ptr;\n        uint32_t packetLen = *(uint32_t*)(ptr + 4);\n        if (end - ptr < packetLen) return ptr - (unsigned char*)buf;\n        stream()->setStream(ioStream);\n        VulkanStream* vkStream = stream();\n        VulkanMemReadingStream* vkReadStream = readStream();\n        vkReadStream->setBuf((uint8_t*)(ptr + 8));\n        uint8_t* readStreamPtr = vkReadStream->getBuf();\n        uint8_t** readStreamPtrPtr = &readStreamPtr;\n        switch (opcode) {\n",
        );
    }

    fn on_gen_cmd(&mut self, cx: &mut EmitContext<'_>, def: &CommandDef) {
        if def.alias.is_some() {
            return;
        }
        self.decoded += 1;

        let mut case = format!("            case OP_{}: {{\n", def.name);
        for (index, param) in def.params.iter().enumerate() {
            case.push_str(&decode_param(cx.registry, param, index));
        }
        let call = format!("m_vk->{}({})", def.name, def.c_args());
        if def.returns_value() {
            case.push_str(&format!(
                "                {ret} {name}_return = ({ret})0;\n                {name}_return = {call};\n                vkStream->write(&{name}_return, sizeof({ret}));\n",
                ret = def.return_type,
                name = def.name
            ));
        } else {
            case.push_str(&format!("                {call};\n"));
        }
        case.push_str("                vkStream->commitWrite();\n                break;\n            }\n");
        cx.implementation(&case);
    }

    fn on_end(&mut self, cx: &mut EmitContext<'_>) {
        cx.implementation(
            "            default: {\n                m_pool.freeAll();\n                return ptr - (unsigned char*)buf;\n            }\n        }\n        ptr += packetLen;\n    }\n    m_pool.freeAll();\n    return ptr - (unsigned char*)buf;\n}\n\n",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeDef;
    use crate::wrapper::test_support::module;

    #[test]
    fn test_decode_switch() {
        let mut registry = TypeRegistry::new();
        registry.on_gen_type(&TypeDef::handle("VkDevice", None));
        let mut m = module("VkDecoder");
        let mut wrapper = DecoderWrapper::new();
        let mut cx = EmitContext {
            module: &mut m,
            registry: &registry,
        };

        wrapper.on_begin(&mut cx);
        wrapper.on_gen_cmd(
            &mut cx,
            &CommandDef::new("vkDeviceWaitIdle", vec![Member::new("device", "VkDevice")])
                .returning("VkResult"),
        );
        wrapper.on_gen_cmd(
            &mut cx,
            &CommandDef::new("vkCmdSetDepthBias", vec![Member::new("depthBiasConstantFactor", "float")]),
        );
        wrapper.on_end(&mut cx);

        assert_eq!(wrapper.decoded, 2);
        let text = m.impl_buffer();
        assert!(text.contains("            case OP_vkDeviceWaitIdle: {\n"));
        assert!(text.contains("unbox_VkDevice((VkDevice)(*&cgen_var_0))"));
        assert!(text.contains("vkDeviceWaitIdle_return = m_vk->vkDeviceWaitIdle(device);"));
        assert!(text.contains("                m_vk->vkCmdSetDepthBias(depthBiasConstantFactor);\n"));
        assert!(text.contains("            default: {\n"));
        assert!(m.header_buffer().starts_with("class VkDecoder {"));
    }
}
