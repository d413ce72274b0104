//! Function-pointer dispatch table loaded from the system loader.

use super::{EmitContext, Wrapper, WrapperKind};
use crate::schema::{CommandDef, FeatureKind};

/// Emits `struct VulkanDispatch` and its loader initialization.
///
/// Aliased commands get their own entry; the loader may expose either name.
#[derive(Debug, Default)]
pub struct DispatchWrapper {
    /// Commands per feature, for the guarded loader blocks.
    features: Vec<(String, Vec<String>)>,
}

impl DispatchWrapper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Wrapper for DispatchWrapper {
    fn kind(&self) -> WrapperKind {
        WrapperKind::Dispatch
    }

    fn on_begin(&mut self, cx: &mut EmitContext<'_>) {
        cx.header("struct VulkanDispatch {\n");
    }

    fn on_begin_feature(&mut self, _cx: &mut EmitContext<'_>, name: &str, _kind: FeatureKind) {
        self.features.push((name.to_string(), Vec::new()));
    }

    fn on_gen_cmd(&mut self, cx: &mut EmitContext<'_>, def: &CommandDef) {
        cx.header(&format!("    PFN_{0} {0};\n", def.name));
        if let Some((_, commands)) = self.features.last_mut() {
            commands.push(def.name.clone());
        }
    }

    fn on_end(&mut self, cx: &mut EmitContext<'_>) {
        cx.header("};\n\n");
        cx.header("void init_vulkan_dispatch_from_system_loader(DlOpenFunc dlOpenFunc, DlSymFunc dlSymFunc, VulkanDispatch* out);\n\n");

        let mut body = String::from(
            "void init_vulkan_dispatch_from_system_loader(DlOpenFunc dlOpenFunc, DlSymFunc dlSymFunc, VulkanDispatch* out) {\n    memset(out, 0x0, sizeof(VulkanDispatch));\n    void* lib = dlOpenFunc();\n    if (!lib) return;\n",
        );
        for (feature, commands) in &self.features {
            if commands.is_empty() {
                continue;
            }
            body.push_str(&format!("#ifdef {feature}\n"));
            for command in commands {
                body.push_str(&format!(
                    "    out->{command} = (PFN_{command})dlSymFunc(lib, \"{command}\");\n"
                ));
            }
            body.push_str("#endif\n");
        }
        body.push_str("}\n\n");
        cx.implementation(&body);
    }
}
