//! Typed schema model and the traversal that replays it.
//!
//! A [`Schema`] is an ordered list of features, each carrying its element
//! definitions and the commands listed in its `require` block. [`Schema::walk`]
//! delivers them to a [`SchemaVisitor`] in the fixed order the generator
//! expects: begin-file, then per feature begin-feature, types, structs,
//! groups, enums, commands, end-feature, and finally end-file.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Classification of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// A core API version (`VK_VERSION_1_0`, ...).
    #[default]
    Core,
    /// An instance-level extension.
    Instance,
    /// A device-level extension.
    Device,
}

impl FeatureKind {
    /// Registry spelling of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Core => "feature",
            FeatureKind::Instance => "instance",
            FeatureKind::Device => "device",
        }
    }

    /// Whether the feature is an extension rather than a core version.
    pub fn is_extension(&self) -> bool {
        !matches!(self, FeatureKind::Core)
    }
}

/// One API version or extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature name, also used as the preprocessor guard symbol.
    pub name: String,

    /// Core version or extension kind.
    #[serde(default)]
    pub kind: FeatureKind,

    /// Extension number, when the feature is an extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,

    /// Commands declared in the feature's `require` block.
    #[serde(default)]
    pub require: Vec<String>,

    /// Element definitions introduced by this feature.
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Feature {
    /// Create an empty core feature.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FeatureKind::Core,
            number: None,
            require: Vec::new(),
            elements: Vec::new(),
        }
    }

    /// Set the feature kind.
    pub fn with_kind(mut self, kind: FeatureKind) -> Self {
        self.kind = kind;
        self
    }

    /// Add an element; commands are also added to the `require` list.
    pub fn with_element(mut self, element: impl Into<Element>) -> Self {
        let element = element.into();
        if let Element::Command(cmd) = &element {
            self.require.push(cmd.name.clone());
        }
        self.elements.push(element);
        self
    }

    /// Elements in traversal order (types, structs, groups, enums, commands).
    ///
    /// The sort is stable, so declaration order is kept within a category.
    pub fn ordered_elements(&self) -> Vec<&Element> {
        let mut elements: Vec<&Element> = self.elements.iter().collect();
        elements.sort_by_key(|e| e.rank());
        elements
    }
}

/// A schema element definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum Element {
    Type(TypeDef),
    Struct(StructDef),
    Group(GroupDef),
    Enum(EnumDef),
    Command(CommandDef),
}

impl Element {
    /// Definition name.
    pub fn name(&self) -> &str {
        match self {
            Element::Type(d) => &d.name,
            Element::Struct(d) => &d.name,
            Element::Group(d) => &d.name,
            Element::Enum(d) => &d.name,
            Element::Command(d) => &d.name,
        }
    }

    /// Alias target, when this definition re-exports another one.
    pub fn alias(&self) -> Option<&str> {
        match self {
            Element::Type(d) => d.alias.as_deref(),
            Element::Struct(d) => d.alias.as_deref(),
            Element::Group(d) => d.alias.as_deref(),
            Element::Enum(d) => d.alias.as_deref(),
            Element::Command(d) => d.alias.as_deref(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Element::Type(_) => 0,
            Element::Struct(_) => 1,
            Element::Group(_) => 2,
            Element::Enum(_) => 3,
            Element::Command(_) => 4,
        }
    }
}

impl From<TypeDef> for Element {
    fn from(def: TypeDef) -> Self {
        Element::Type(def)
    }
}

impl From<StructDef> for Element {
    fn from(def: StructDef) -> Self {
        Element::Struct(def)
    }
}

impl From<GroupDef> for Element {
    fn from(def: GroupDef) -> Self {
        Element::Group(def)
    }
}

impl From<EnumDef> for Element {
    fn from(def: EnumDef) -> Self {
        Element::Enum(def)
    }
}

impl From<CommandDef> for Element {
    fn from(def: CommandDef) -> Self {
        Element::Command(def)
    }
}

/// Category of a plain type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeCategory {
    #[default]
    Basetype,
    Bitmask,
    Handle,
    Define,
    Include,
    Funcpointer,
    Primitive,
}

/// A plain type definition (base type, bitmask, handle, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default)]
    pub kind: TypeCategory,

    /// Parent handle type, for handles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Underlying type for base types and bitmasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlying: Option<String>,
}

impl TypeDef {
    /// Create a new type definition.
    pub fn new(name: impl Into<String>, kind: TypeCategory) -> Self {
        Self {
            name: name.into(),
            alias: None,
            kind,
            parent: None,
            underlying: None,
        }
    }

    /// Create a handle type with an optional parent handle.
    pub fn handle(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            parent: parent.map(str::to_string),
            ..Self::new(name, TypeCategory::Handle)
        }
    }

    /// Mark this definition as an alias of `target`.
    pub fn with_alias(mut self, target: impl Into<String>) -> Self {
        self.alias = Some(target.into());
        self
    }
}

/// A struct member or command parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,

    #[serde(rename = "type")]
    pub type_name: String,

    /// Levels of pointer indirection.
    #[serde(default)]
    pub pointer: u8,

    #[serde(default)]
    pub is_const: bool,

    /// Length expression for pointer-to-array members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub len: Option<String>,

    #[serde(default)]
    pub optional: bool,
}

impl Member {
    /// Create a by-value member.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            pointer: 0,
            is_const: false,
            len: None,
            optional: false,
        }
    }

    /// Create a `const T*` member.
    pub fn const_ptr(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            pointer: 1,
            is_const: true,
            ..Self::new(name, type_name)
        }
    }

    /// Create a `T*` member.
    pub fn ptr(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            pointer: 1,
            ..Self::new(name, type_name)
        }
    }

    /// Set the length expression.
    pub fn with_len(mut self, len: impl Into<String>) -> Self {
        self.len = Some(len.into());
        self
    }

    /// C spelling of the member type, e.g. `const VkFoo*`.
    pub fn c_type(&self) -> String {
        let mut ty = String::new();
        if self.is_const {
            ty.push_str("const ");
        }
        ty.push_str(&self.type_name);
        for _ in 0..self.pointer {
            ty.push('*');
        }
        ty
    }

    /// C declaration, e.g. `const VkFoo* pInfo`.
    pub fn c_decl(&self) -> String {
        format!("{} {}", self.c_type(), self.name)
    }

    /// Whether the member is passed by pointer.
    pub fn is_pointer(&self) -> bool {
        self.pointer > 0
    }
}

/// A struct or union definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default)]
    pub members: Vec<Member>,

    /// The `VK_STRUCTURE_TYPE_*` value of `sType`, for extensible structs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure_type: Option<String>,

    /// Structs this one can be chained onto through `pNext`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,

    #[serde(default)]
    pub union: bool,

    #[serde(default)]
    pub returned_only: bool,
}

impl StructDef {
    /// Create a struct with the given members.
    pub fn new(name: impl Into<String>, members: Vec<Member>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            members,
            structure_type: None,
            extends: Vec::new(),
            union: false,
            returned_only: false,
        }
    }

    /// Set the structure type value.
    pub fn with_structure_type(mut self, value: impl Into<String>) -> Self {
        self.structure_type = Some(value.into());
        self
    }

    /// Mark this definition as an alias of `target`.
    pub fn with_alias(mut self, target: impl Into<String>) -> Self {
        self.alias = Some(target.into());
        self
    }
}

/// One value of an enum group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,

    /// Offset within the owning extension's value block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,

    /// Extension that introduced the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl EnumValue {
    /// Create a value with a literal.
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
            offset: None,
            extension: None,
            alias: None,
        }
    }

    /// Create a value defined by an extension offset.
    pub fn extension(name: impl Into<String>, extension: impl Into<String>, offset: u32) -> Self {
        Self {
            name: name.into(),
            value: None,
            offset: Some(offset),
            extension: Some(extension.into()),
            alias: None,
        }
    }
}

/// An enum group (`VkFormat`, `VkStructureType`, bitmask bits, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default)]
    pub bitmask: bool,

    #[serde(default)]
    pub values: Vec<EnumValue>,
}

impl GroupDef {
    /// Create a group with the given values.
    pub fn new(name: impl Into<String>, values: Vec<EnumValue>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            bitmask: false,
            values,
        }
    }
}

/// A standalone API constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl EnumDef {
    /// Create a constant with a literal value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            value: Some(value.into()),
        }
    }
}

fn default_return_type() -> String {
    "void".to_string()
}

/// An API command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default = "default_return_type")]
    pub return_type: String,

    #[serde(default)]
    pub params: Vec<Member>,
}

impl CommandDef {
    /// Create a command returning `void`.
    pub fn new(name: impl Into<String>, params: Vec<Member>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            return_type: default_return_type(),
            params,
        }
    }

    /// Set the return type.
    pub fn returning(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = return_type.into();
        self
    }

    /// Mark this definition as an alias of `target`.
    pub fn with_alias(mut self, target: impl Into<String>) -> Self {
        self.alias = Some(target.into());
        self
    }

    /// Comma-separated C parameter list.
    pub fn c_params(&self) -> String {
        self.params
            .iter()
            .map(Member::c_decl)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Comma-separated argument names.
    pub fn c_args(&self) -> String {
        self.params
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Type of the first parameter, which selects the dispatch level.
    pub fn dispatch_type(&self) -> Option<&str> {
        self.params.first().map(|p| p.type_name.as_str())
    }

    /// Whether the command returns a value.
    pub fn returns_value(&self) -> bool {
        self.return_type != "void"
    }
}

/// Receiver of the schema traversal events.
pub trait SchemaVisitor {
    /// Error that aborts the traversal.
    type Error;

    /// Value produced at end-file.
    type Output;

    fn begin_file(&mut self) -> Result<(), Self::Error>;
    fn begin_feature(&mut self, feature: &Feature) -> Result<(), Self::Error>;
    fn gen_type(&mut self, def: &TypeDef) -> Result<(), Self::Error>;
    fn gen_struct(&mut self, def: &StructDef) -> Result<(), Self::Error>;
    fn gen_group(&mut self, def: &GroupDef) -> Result<(), Self::Error>;
    fn gen_enum(&mut self, def: &EnumDef) -> Result<(), Self::Error>;
    fn gen_cmd(&mut self, def: &CommandDef) -> Result<(), Self::Error>;
    fn end_feature(&mut self) -> Result<(), Self::Error>;
    fn end_file(&mut self) -> Result<Self::Output, Self::Error>;
}

/// A complete API description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl Schema {
    /// Create a schema from features in file order.
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Check that feature names are unique and that no definition name is
    /// delivered twice within one feature.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut features = HashSet::new();
        for feature in &self.features {
            if !features.insert(feature.name.as_str()) {
                return Err(SchemaError::DuplicateFeature {
                    name: feature.name.clone(),
                });
            }

            let mut names = HashSet::new();
            for element in &feature.elements {
                if !names.insert(element.name()) {
                    return Err(SchemaError::DuplicateDefinition {
                        feature: feature.name.clone(),
                        name: element.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Replay the schema into a visitor.
    pub fn walk<V: SchemaVisitor>(&self, visitor: &mut V) -> Result<V::Output, V::Error> {
        visitor.begin_file()?;

        for feature in &self.features {
            visitor.begin_feature(feature)?;
            for element in feature.ordered_elements() {
                match element {
                    Element::Type(d) => visitor.gen_type(d)?,
                    Element::Struct(d) => visitor.gen_struct(d)?,
                    Element::Group(d) => visitor.gen_group(d)?,
                    Element::Enum(d) => visitor.gen_enum(d)?,
                    Element::Command(d) => visitor.gen_cmd(d)?,
                }
            }
            visitor.end_feature()?;
        }

        visitor.end_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl SchemaVisitor for Recorder {
        type Error = ();
        type Output = Vec<String>;

        fn begin_file(&mut self) -> Result<(), ()> {
            self.events.push("begin-file".into());
            Ok(())
        }
        fn begin_feature(&mut self, feature: &Feature) -> Result<(), ()> {
            self.events.push(format!("begin:{}", feature.name));
            Ok(())
        }
        fn gen_type(&mut self, def: &TypeDef) -> Result<(), ()> {
            self.events.push(format!("type:{}", def.name));
            Ok(())
        }
        fn gen_struct(&mut self, def: &StructDef) -> Result<(), ()> {
            self.events.push(format!("struct:{}", def.name));
            Ok(())
        }
        fn gen_group(&mut self, def: &GroupDef) -> Result<(), ()> {
            self.events.push(format!("group:{}", def.name));
            Ok(())
        }
        fn gen_enum(&mut self, def: &EnumDef) -> Result<(), ()> {
            self.events.push(format!("enum:{}", def.name));
            Ok(())
        }
        fn gen_cmd(&mut self, def: &CommandDef) -> Result<(), ()> {
            self.events.push(format!("cmd:{}", def.name));
            Ok(())
        }
        fn end_feature(&mut self) -> Result<(), ()> {
            self.events.push("end".into());
            Ok(())
        }
        fn end_file(&mut self) -> Result<Vec<String>, ()> {
            self.events.push("end-file".into());
            Ok(std::mem::take(&mut self.events))
        }
    }

    #[test]
    fn test_walk_orders_elements_by_category() {
        let feature = Feature::new("VK_VERSION_1_0")
            .with_element(CommandDef::new("vkCmdDraw", vec![]))
            .with_element(StructDef::new("VkExtent2D", vec![]))
            .with_element(TypeDef::new("uint32_t", TypeCategory::Primitive))
            .with_element(EnumDef::new("VK_MAX_EXTENSION_NAME_SIZE", "256"))
            .with_element(GroupDef::new("VkFormat", vec![]));
        let schema = Schema::new(vec![feature]);

        let events = schema.walk(&mut Recorder::default()).unwrap();

        assert_eq!(
            events,
            vec![
                "begin-file",
                "begin:VK_VERSION_1_0",
                "type:uint32_t",
                "struct:VkExtent2D",
                "group:VkFormat",
                "enum:VK_MAX_EXTENSION_NAME_SIZE",
                "cmd:vkCmdDraw",
                "end",
                "end-file",
            ]
        );
    }

    #[test]
    fn test_with_element_adds_commands_to_require() {
        let feature = Feature::new("F").with_element(CommandDef::new("vkFoo", vec![]));
        assert_eq!(feature.require, vec!["vkFoo".to_string()]);
    }

    #[test]
    fn test_validate_rejects_duplicate_definition() {
        let feature = Feature::new("F")
            .with_element(StructDef::new("A", vec![]))
            .with_element(StructDef::new("A", vec![]));
        let err = Schema::new(vec![feature]).validate().unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateDefinition { .. }));
    }

    #[test]
    fn test_validate_allows_same_name_across_features() {
        let schema = Schema::new(vec![
            Feature::new("F1").with_element(StructDef::new("A", vec![])),
            Feature::new("F2").with_element(StructDef::new("A", vec![]).with_alias("B")),
        ]);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_member_c_decl() {
        let member = Member::const_ptr("pCreateInfo", "VkInstanceCreateInfo");
        assert_eq!(member.c_decl(), "const VkInstanceCreateInfo* pCreateInfo");
        assert_eq!(Member::new("x", "int32_t").c_decl(), "int32_t x");
    }

    #[test]
    fn test_deserialize_element_category() {
        let json = r#"{"category": "struct", "name": "VkOffset2D",
            "members": [{"name": "x", "type": "int32_t"}, {"name": "y", "type": "int32_t"}]}"#;
        let element: Element = serde_json::from_str(json).unwrap();
        match element {
            Element::Struct(def) => {
                assert_eq!(def.name, "VkOffset2D");
                assert_eq!(def.members.len(), 2);
            }
            other => panic!("unexpected element {other:?}"),
        }
    }

    #[test]
    fn test_command_defaults_to_void() {
        let json = r#"{"category": "command", "name": "vkCmdDraw"}"#;
        let element: Element = serde_json::from_str(json).unwrap();
        let Element::Command(cmd) = element else {
            panic!("expected command");
        };
        assert_eq!(cmd.return_type, "void");
        assert!(!cmd.returns_value());
    }
}
