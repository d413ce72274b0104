//! Wrapper emitters.
//!
//! A [`Wrapper`] receives schema traversal callbacks and appends text to the
//! single [`OutputModule`] it is bound to. Every callback has a no-op default
//! so an emitter implements only what it needs. The set of emitters is closed:
//! each one reports a [`WrapperKind`], which is what feature restrictions
//! select on.
//!
//! Wrappers run on the traversal thread only. Sharing module or wrapper
//! instances between concurrent traversals is not supported.

mod decoder;
mod deepcopy;
mod dispatch;
mod encoder;
mod extension_structs;
mod func_table;
mod marshaling;
mod structure_type;
mod transform;

pub use decoder::DecoderWrapper;
pub use deepcopy::DeepcopyWrapper;
pub use dispatch::DispatchWrapper;
pub use encoder::EncoderWrapper;
pub use extension_structs::ExtensionStructsWrapper;
pub use func_table::FuncTableWrapper;
pub use marshaling::{MarshalingVariant, MarshalingWrapper};
pub use structure_type::StructureTypeWrapper;
pub use transform::TransformWrapper;

use std::fmt;

use crate::module::OutputModule;
use crate::registry::TypeRegistry;
use crate::schema::{CommandDef, EnumDef, FeatureKind, GroupDef, StructDef, TypeDef};

/// Identity of an emitter, used for feature restrictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WrapperKind {
    ExtensionStructs,
    Marshaling,
    DeepCopy,
    Transform,
    Dispatch,
    FuncTable,
    Encoder,
    Decoder,
    StructureType,
}

impl WrapperKind {
    /// Every kind, in declaration order.
    pub const ALL: [WrapperKind; 9] = [
        WrapperKind::ExtensionStructs,
        WrapperKind::Marshaling,
        WrapperKind::DeepCopy,
        WrapperKind::Transform,
        WrapperKind::Dispatch,
        WrapperKind::FuncTable,
        WrapperKind::Encoder,
        WrapperKind::Decoder,
        WrapperKind::StructureType,
    ];

    /// Configuration spelling of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            WrapperKind::ExtensionStructs => "extension_structs",
            WrapperKind::Marshaling => "marshaling",
            WrapperKind::DeepCopy => "deepcopy",
            WrapperKind::Transform => "transform",
            WrapperKind::Dispatch => "dispatch",
            WrapperKind::FuncTable => "func_table",
            WrapperKind::Encoder => "encoder",
            WrapperKind::Decoder => "decoder",
            WrapperKind::StructureType => "structure_type",
        }
    }

    /// Parse a configuration spelling.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for WrapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a wrapper can touch during a callback: its own module, and the
/// registry read-only.
#[derive(Debug)]
pub struct EmitContext<'a> {
    pub module: &'a mut OutputModule,
    pub registry: &'a TypeRegistry,
}

impl EmitContext<'_> {
    /// Append to the bound module's header.
    pub fn header(&mut self, text: &str) {
        self.module.append_header(text);
    }

    /// Append to the bound module's implementation.
    pub fn implementation(&mut self, text: &str) {
        self.module.append_impl(text);
    }
}

/// A schema-driven emitter bound to one output module.
///
/// Definitions carrying an alias are re-exports of an earlier definition;
/// each wrapper decides whether to emit a full definition or an alternate
/// name binding for them.
pub trait Wrapper: fmt::Debug {
    /// Kind used for feature restrictions.
    fn kind(&self) -> WrapperKind;

    /// Display name for diagnostics.
    fn name(&self) -> String {
        self.kind().to_string()
    }

    /// Once, before the first feature.
    fn on_begin(&mut self, _cx: &mut EmitContext<'_>) {}

    /// Once, after the last feature.
    fn on_end(&mut self, _cx: &mut EmitContext<'_>) {}

    fn on_begin_feature(&mut self, _cx: &mut EmitContext<'_>, _name: &str, _kind: FeatureKind) {}

    fn on_end_feature(&mut self, _cx: &mut EmitContext<'_>) {}

    /// Classification pass: one call per command in the feature's `require`
    /// block, before any element callback of that feature.
    fn on_feature_new_cmd(&mut self, _cx: &mut EmitContext<'_>, _name: &str) {}

    fn on_gen_type(&mut self, _cx: &mut EmitContext<'_>, _def: &TypeDef) {}

    fn on_gen_struct(&mut self, _cx: &mut EmitContext<'_>, _def: &StructDef) {}

    fn on_gen_group(&mut self, _cx: &mut EmitContext<'_>, _def: &GroupDef) {}

    fn on_gen_enum(&mut self, _cx: &mut EmitContext<'_>, _def: &EnumDef) {}

    fn on_gen_cmd(&mut self, _cx: &mut EmitContext<'_>, _def: &CommandDef) {}
}

/// A wrapper together with the name of the module it writes to.
#[derive(Debug)]
pub struct WrapperBinding {
    pub wrapper: Box<dyn Wrapper>,
    pub module: String,
}

impl WrapperBinding {
    /// Bind a wrapper to a module by registry name.
    pub fn new(wrapper: impl Wrapper + 'static, module: impl Into<String>) -> Self {
        Self {
            wrapper: Box::new(wrapper),
            module: module.into(),
        }
    }
}

/// First opcode assigned to commands; guest and host count from the same base.
pub(crate) const OPCODE_BASE: u32 = 20000;

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use super::*;
    use crate::module::{ModuleRole, ModuleSpec};
    use crate::preamble::PreambleTemplates;

    pub fn module(name: &str) -> OutputModule {
        OutputModule::new(
            &ModuleSpec::new(name, ModuleRole::Common),
            PathBuf::from("out"),
            &PreambleTemplates::default(),
        )
    }
}
