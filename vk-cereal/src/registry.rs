//! Type registry shared by all wrappers.
//!
//! The registry collects every definition as the schema streams in, along with
//! the feature that declared it. Wrappers consult it to decide how to emit a
//! member (nested struct, handle, plain value) or which dispatch level a
//! command belongs to.

use std::collections::HashMap;

use crate::schema::{CommandDef, EnumDef, FeatureKind, GroupDef, StructDef, TypeCategory, TypeDef};

/// What a registered name refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Type(TypeDef),
    Struct(StructDef),
    Group(GroupDef),
    Enum(EnumDef),
    Command(CommandDef),
}

/// A registered definition and its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRecord {
    /// Definition as delivered by the schema.
    pub definition: Definition,

    /// Feature that declared the definition, if any was active.
    pub feature: Option<String>,
}

/// Registry of every definition seen during a traversal.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    /// All records by name
    records: HashMap<String, TypeRecord>,

    /// Alias name -> target name
    aliases: HashMap<String, String>,

    /// Names in registration order
    order: Vec<String>,

    /// Feature currently being processed
    current_feature: Option<(String, FeatureKind)>,

    /// Feature name -> kind, for every supported feature seen
    feature_kinds: HashMap<String, FeatureKind>,

    /// Command name -> declaring feature
    command_features: HashMap<String, String>,

    finished: bool,
}

impl TypeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a supported feature.
    pub fn on_begin_feature(&mut self, name: &str, kind: FeatureKind) {
        self.feature_kinds.insert(name.to_string(), kind);
        self.current_feature = Some((name.to_string(), kind));
    }

    /// Leave the current feature.
    pub fn on_end_feature(&mut self) {
        self.current_feature = None;
    }

    /// Mark the traversal as complete.
    pub fn on_end(&mut self) {
        self.finished = true;
    }

    /// Record a type declared by the current feature.
    pub fn on_gen_type(&mut self, def: &TypeDef) {
        self.record_type(def, self.current_feature_name());
    }

    /// Record a type with an explicit declaring feature.
    ///
    /// Used for names registered while their feature is not supported.
    pub fn record_type(&mut self, def: &TypeDef, feature: Option<String>) {
        self.insert(&def.name, def.alias.as_deref(), Definition::Type(def.clone()), feature);
    }

    /// Record a struct declared by the current feature.
    pub fn on_gen_struct(&mut self, def: &StructDef) {
        let feature = self.current_feature_name();
        self.insert(&def.name, def.alias.as_deref(), Definition::Struct(def.clone()), feature);
    }

    /// Record an enum group declared by the current feature.
    pub fn on_gen_group(&mut self, def: &GroupDef) {
        let feature = self.current_feature_name();
        self.insert(&def.name, def.alias.as_deref(), Definition::Group(def.clone()), feature);
    }

    /// Record a constant declared by the current feature.
    pub fn on_gen_enum(&mut self, def: &EnumDef) {
        let feature = self.current_feature_name();
        self.insert(&def.name, def.alias.as_deref(), Definition::Enum(def.clone()), feature);
    }

    /// Record a command declared by the current feature.
    pub fn on_gen_cmd(&mut self, def: &CommandDef) {
        let feature = self.current_feature_name();
        if let Some(feature) = &feature {
            self.command_features
                .insert(def.name.clone(), feature.clone());
        }
        self.insert(&def.name, def.alias.as_deref(), Definition::Command(def.clone()), feature);
    }

    fn insert(
        &mut self,
        name: &str,
        alias: Option<&str>,
        definition: Definition,
        feature: Option<String>,
    ) {
        if let Some(target) = alias {
            self.aliases.insert(name.to_string(), target.to_string());
        }
        if !self.records.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.records
            .insert(name.to_string(), TypeRecord { definition, feature });
    }

    fn current_feature_name(&self) -> Option<String> {
        self.current_feature.as_ref().map(|(name, _)| name.clone())
    }

    /// Name of the feature currently being processed.
    pub fn current_feature(&self) -> Option<&str> {
        self.current_feature.as_ref().map(|(name, _)| name.as_str())
    }

    /// Kind of the feature currently being processed.
    pub fn current_feature_kind(&self) -> Option<FeatureKind> {
        self.current_feature.as_ref().map(|(_, kind)| *kind)
    }

    /// Kind of a supported feature seen so far.
    pub fn feature_kind(&self, feature: &str) -> Option<FeatureKind> {
        self.feature_kinds.get(feature).copied()
    }

    /// Get a record by name.
    pub fn get(&self, name: &str) -> Option<&TypeRecord> {
        self.records.get(name)
    }

    /// Check if a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Feature that declared a name.
    pub fn feature_of(&self, name: &str) -> Option<&str> {
        self.records.get(name).and_then(|r| r.feature.as_deref())
    }

    /// Follow alias links to the defining name.
    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> &'a str {
        let mut current = name;
        // Alias chains in practice are at most two deep; bound the walk anyway.
        for _ in 0..8 {
            match self.aliases.get(current) {
                Some(target) => current = target,
                None => break,
            }
        }
        current
    }

    /// Struct definition for a name, following aliases.
    pub fn struct_def(&self, name: &str) -> Option<&StructDef> {
        match self.records.get(self.resolve_alias(name)).map(|r| &r.definition) {
            Some(Definition::Struct(def)) => Some(def),
            _ => None,
        }
    }

    /// Command definition for a name, following aliases.
    pub fn command(&self, name: &str) -> Option<&CommandDef> {
        match self.records.get(self.resolve_alias(name)).map(|r| &r.definition) {
            Some(Definition::Command(def)) => Some(def),
            _ => None,
        }
    }

    /// Feature that declared a command.
    pub fn command_feature(&self, name: &str) -> Option<&str> {
        self.command_features.get(name).map(String::as_str)
    }

    /// Whether a name is a struct (or an alias of one).
    pub fn is_struct(&self, name: &str) -> bool {
        self.struct_def(name).is_some()
    }

    /// Whether a name is a handle type.
    pub fn is_handle(&self, name: &str) -> bool {
        matches!(
            self.records.get(self.resolve_alias(name)).map(|r| &r.definition),
            Some(Definition::Type(TypeDef {
                kind: TypeCategory::Handle,
                ..
            }))
        )
    }

    /// Whether a handle is `VkDevice` or derives from it.
    pub fn is_device_level_handle(&self, name: &str) -> bool {
        let mut current = self.resolve_alias(name);
        for _ in 0..16 {
            if current == "VkDevice" {
                return true;
            }
            match self.records.get(current).map(|r| &r.definition) {
                Some(Definition::Type(TypeDef {
                    kind: TypeCategory::Handle,
                    parent: Some(parent),
                    ..
                })) => current = self.resolve_alias(parent),
                _ => return false,
            }
        }
        false
    }

    /// Whether a struct (transitively) contains handle members.
    pub fn struct_has_handles(&self, name: &str) -> bool {
        self.struct_has_handles_inner(name, 0)
    }

    fn struct_has_handles_inner(&self, name: &str, depth: usize) -> bool {
        if depth > 16 {
            return false;
        }
        let Some(def) = self.struct_def(name) else {
            return false;
        };
        def.members.iter().any(|m| {
            self.is_handle(&m.type_name) || self.struct_has_handles_inner(&m.type_name, depth + 1)
        })
    }

    /// All registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Get the number of registered names.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the traversal completed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
