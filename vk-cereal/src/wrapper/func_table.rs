//! Guest entry points and the `GetProcAddress` lookup tables.
//!
//! Commands are classified per feature before the feature's elements arrive,
//! so the lookup tables list every required command, aliases included. An
//! alias resolves to the entry point of the command it re-exports.

use std::collections::HashSet;

use super::{EmitContext, Wrapper, WrapperKind};
use crate::schema::{CommandDef, FeatureKind};

#[derive(Debug)]
struct FeatureBlock {
    name: String,
    kind: FeatureKind,
    commands: Vec<String>,
}

/// Emits `entry_*` functions plus `goldfish_vulkan_get_proc_address` and
/// `goldfish_vulkan_get_device_proc_address`.
#[derive(Debug, Default)]
pub struct FuncTableWrapper {
    blocks: Vec<FeatureBlock>,
    /// Commands that got a `dynCheck_entry_*` variant.
    dyn_checked: HashSet<String>,
}

impl FuncTableWrapper {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(def: &CommandDef) -> String {
        let mut out = format!(
            "static {} entry_{}({}) {{\n    AEMU_SCOPED_TRACE(\"{}\");\n    auto vkEnc = ResourceTracker::getThreadLocalEncoder();\n",
            def.return_type,
            def.name,
            def.c_params(),
            def.name
        );
        out.push_str(&Self::forward(def, "    "));
        out.push_str("}\n");
        out
    }

    fn dyn_check_entry(def: &CommandDef, feature: &str) -> String {
        let device = def
            .params
            .first()
            .map(|p| p.name.as_str())
            .unwrap_or("device");
        let mut out = format!(
            "static {} dynCheck_entry_{}({}) {{\n    auto resources = ResourceTracker::get();\n    if (!resources->hasDeviceExtension({device}, \"{feature}\")) {{\n        sOnInvalidDynamicallyCheckedCall(\"{}\", \"{feature}\");\n    }}\n    AEMU_SCOPED_TRACE(\"{}\");\n    auto vkEnc = ResourceTracker::getThreadLocalEncoder();\n",
            def.return_type,
            def.name,
            def.c_params(),
            def.name,
            def.name
        );
        out.push_str(&Self::forward(def, "    "));
        out.push_str("}\n");
        out
    }

    fn forward(def: &CommandDef, indent: &str) -> String {
        let args = if def.params.is_empty() {
            "true /* do lock */".to_string()
        } else {
            format!("{}, true /* do lock */", def.c_args())
        };
        if def.returns_value() {
            format!(
                "{indent}{ret} {name}_return = ({ret})0;\n{indent}{name}_return = vkEnc->{name}({args});\n{indent}return {name}_return;\n",
                ret = def.return_type,
                name = def.name
            )
        } else {
            format!("{indent}vkEnc->{}({args});\n", def.name)
        }
    }

    fn lookup_table(&self, cx: &EmitContext<'_>, function: &str, device: bool) -> String {
        let mut out = format!("void* {function}(const char* name) {{\n");
        for block in &self.blocks {
            if block.commands.is_empty() {
                continue;
            }
            out.push_str(&format!("#ifdef {}\n", block.name));
            for command in &block.commands {
                let target = cx.registry.resolve_alias(command);
                let prefix = if device && self.dyn_checked.contains(target) {
                    "dynCheck_entry_"
                } else {
                    "entry_"
                };
                out.push_str(&format!(
                    "    if (!strcmp(name, \"{command}\")) {{\n        return (void*){prefix}{target};\n    }}\n"
                ));
            }
            out.push_str("#endif\n");
        }
        out.push_str("    return nullptr;\n}\n");
        out
    }
}

impl Wrapper for FuncTableWrapper {
    fn kind(&self) -> WrapperKind {
        WrapperKind::FuncTable
    }

    fn on_begin(&mut self, cx: &mut EmitContext<'_>) {
        cx.header("void* goldfish_vulkan_get_proc_address(const char* name);\n");
        cx.header("void* goldfish_vulkan_get_device_proc_address(const char* name);\n\n");
        cx.implementation(
            "static void sOnInvalidDynamicallyCheckedCall(const char* apiname, const char* neededFeature) {\n    ALOGE(\"invalid call to %s: %s not supported\", apiname, neededFeature);\n    abort();\n}\n\n",
        );
    }

    fn on_begin_feature(&mut self, _cx: &mut EmitContext<'_>, name: &str, kind: FeatureKind) {
        self.blocks.push(FeatureBlock {
            name: name.to_string(),
            kind,
            commands: Vec::new(),
        });
    }

    fn on_feature_new_cmd(&mut self, _cx: &mut EmitContext<'_>, name: &str) {
        if let Some(block) = self.blocks.last_mut() {
            if !block.commands.iter().any(|c| c == name) {
                block.commands.push(name.to_string());
            }
        }
    }

    fn on_gen_cmd(&mut self, cx: &mut EmitContext<'_>, def: &CommandDef) {
        if def.alias.is_some() {
            return;
        }
        cx.implementation(&Self::entry(def));

        let Some(block) = self.blocks.last() else {
            return;
        };
        let device_level = def
            .dispatch_type()
            .is_some_and(|ty| cx.registry.is_device_level_handle(ty));
        if block.kind == FeatureKind::Device && device_level {
            cx.implementation(&Self::dyn_check_entry(def, &block.name));
            self.dyn_checked.insert(def.name.clone());
        }
    }

    fn on_end(&mut self, cx: &mut EmitContext<'_>) {
        let table = self.lookup_table(cx, "goldfish_vulkan_get_proc_address", false);
        let device_table = self.lookup_table(cx, "goldfish_vulkan_get_device_proc_address", true);
        cx.implementation(&table);
        cx.implementation(&device_table);
    }
}
