//! Derived views over the raw descriptors.
//!
//! Everything the emitters need to know about a file, message, or field is
//! answered here: derived Scala names, type expressions, categorization
//! flags, wire data, and default values. All queries are pure; the
//! descriptor entities are built once per request and never mutated during
//! emission.

use std::collections::HashMap;

use base64::prelude::{Engine, BASE64_STANDARD};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto};

use crate::expr::Expr;
use crate::ident::{self, to_upper_camel};
use crate::options::{OptionsIndex, ScalaFileOptions};

mod c_escaping;
use c_escaping::unescape_c_escape_string;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Syntax {
    Proto2,
    Proto3,
}

impl From<Option<&str>> for Syntax {
    fn from(syntax: Option<&str>) -> Syntax {
        match syntax {
            None | Some("proto2") => Syntax::Proto2,
            Some("proto3") => Syntax::Proto3,
            Some(other) => panic!("unknown syntax: {}", other),
        }
    }
}

pub fn file_syntax(file: &FileDescriptorProto) -> Syntax {
    Syntax::from(file.syntax.as_deref())
}

/// `"dir/foo_bar.proto"` → `"foo_bar"`.
pub fn base_name(file_name: &str) -> &str {
    let stem = file_name.rsplit('/').next().unwrap_or(file_name);
    stem.strip_suffix(".proto").unwrap_or(stem)
}

/// The name of the per-file companion object.
pub fn file_object_name(file_name: &str) -> String {
    format!("{}Proto", to_upper_camel(base_name(file_name)))
}

/// The Scala package for a file: `package_name` (or the proto package),
/// with the file's base name appended as an extra level unless the file is
/// flat-packaged.
pub fn scala_package(
    file: &FileDescriptorProto,
    options: &ScalaFileOptions,
    flat_package_flag: bool,
) -> String {
    let base = options
        .package_name
        .clone()
        .unwrap_or_else(|| file.package().to_string());
    let flat = options.flat_package.unwrap_or(flat_package_flag);

    let mut parts: Vec<String> = base
        .split('.')
        .filter(|part| !part.is_empty())
        .map(ident::escape)
        .collect();
    if !flat {
        parts.push(ident::escape(base_name(file.name())));
    }
    parts.join(".")
}

fn join_scope(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}

/// One input file plus everything the emitters derive from it up front.
pub struct FileUnit<'a> {
    pub file: &'a FileDescriptorProto,
    pub options: ScalaFileOptions,
    pub syntax: Syntax,
    pub scala_package: String,
    pub object_name: String,
    /// Scala FQNs of the file objects of this file's imports, in import
    /// order; resolved by the driver's dependencies-first fold.
    pub dependencies: Vec<String>,
}

impl<'a> FileUnit<'a> {
    pub fn object_fqn(&self) -> String {
        join_scope(&self.scala_package, &self.object_name)
    }

    pub fn single_file(&self) -> bool {
        self.options.single_file.unwrap_or(false)
    }
}

/// The key/value field pair of a synthesized map entry message.
pub struct MapEntry {
    pub key: FieldDescriptorProto,
    pub value: FieldDescriptorProto,
}

pub enum TypeKind {
    Message { map_entry: Option<Box<MapEntry>> },
    Enum { values: Vec<(String, i32)> },
}

/// Symbol-table entry for one message or enum type.
pub struct TypeEntry {
    pub scala_name: String,
    pub java_name: String,
    pub syntax: Syntax,
    pub kind: TypeKind,
}

impl TypeEntry {
    pub fn is_map_entry(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Message {
                map_entry: Some(_)
            }
        )
    }
}

/// Maps fully qualified proto type names (`.pkg.Outer.Inner`) to their
/// derived target-language identity. Built once over every file in the
/// request, so cross-file field references resolve uniformly.
pub struct SymbolTable {
    types: HashMap<String, TypeEntry>,
}

impl SymbolTable {
    pub fn build(
        files: &[FileDescriptorProto],
        options: &OptionsIndex,
        flat_package_flag: bool,
    ) -> SymbolTable {
        let mut table = SymbolTable {
            types: HashMap::new(),
        };
        for file in files {
            let file_options = options.file_options(file.name());
            let scala_scope = scala_package(file, &file_options, flat_package_flag);
            let java_scope = java_scope(file);
            let proto_scope = if file.package().is_empty() {
                String::new()
            } else {
                format!(".{}", file.package())
            };
            let syntax = file_syntax(file);
            for message in &file.message_type {
                table.add_message(syntax, &proto_scope, &scala_scope, &java_scope, message);
            }
            for desc in &file.enum_type {
                table.add_enum(syntax, &proto_scope, &scala_scope, &java_scope, desc);
            }
        }
        table
    }

    fn add_message(
        &mut self,
        syntax: Syntax,
        proto_scope: &str,
        scala_scope: &str,
        java_scope: &str,
        message: &DescriptorProto,
    ) {
        let proto_fqn = format!("{}.{}", proto_scope, message.name());
        let scala_name = join_scope(scala_scope, &to_upper_camel(message.name()));
        let java_name = join_scope(java_scope, &to_upper_camel(message.name()));

        let map_entry = message
            .options
            .as_ref()
            .and_then(|options| options.map_entry)
            .unwrap_or(false)
            .then(|| {
                let key = message.field[0].clone();
                let value = message.field[1].clone();
                assert_eq!("key", key.name());
                assert_eq!("value", value.name());
                Box::new(MapEntry { key, value })
            });

        for nested in &message.nested_type {
            self.add_message(syntax, &proto_fqn, &scala_name, &java_name, nested);
        }
        for nested in &message.enum_type {
            self.add_enum(syntax, &proto_fqn, &scala_name, &java_name, nested);
        }

        self.types.insert(
            proto_fqn,
            TypeEntry {
                scala_name,
                java_name,
                syntax,
                kind: TypeKind::Message { map_entry },
            },
        );
    }

    fn add_enum(
        &mut self,
        syntax: Syntax,
        proto_scope: &str,
        scala_scope: &str,
        java_scope: &str,
        desc: &EnumDescriptorProto,
    ) {
        let proto_fqn = format!("{}.{}", proto_scope, desc.name());
        let values = desc
            .value
            .iter()
            .map(|value| (value.name().to_string(), value.number()))
            .collect();
        self.types.insert(
            proto_fqn,
            TypeEntry {
                scala_name: join_scope(scala_scope, &to_upper_camel(desc.name())),
                java_name: join_scope(java_scope, &to_upper_camel(desc.name())),
                syntax,
                kind: TypeKind::Enum { values },
            },
        );
    }

    pub fn get(&self, proto_fqn: &str) -> &TypeEntry {
        self.types
            .get(proto_fqn)
            .unwrap_or_else(|| panic!("type '{}' is not declared by any input file", proto_fqn))
    }

    pub fn scala_name(&self, proto_fqn: &str) -> &str {
        &self.get(proto_fqn).scala_name
    }

    pub fn map_entry(&self, proto_fqn: &str) -> Option<&MapEntry> {
        match &self.get(proto_fqn).kind {
            TypeKind::Message { map_entry } => map_entry.as_deref(),
            TypeKind::Enum { .. } => None,
        }
    }

    /// The Scala reference to an enum's default value: the named value if
    /// given (proto2 `default` option), otherwise the first declared one.
    pub fn enum_default(&self, proto_fqn: &str, named: Option<&str>) -> String {
        let entry = self.get(proto_fqn);
        let values = match &entry.kind {
            TypeKind::Enum { values } => values,
            TypeKind::Message { .. } => panic!("'{}' is not an enum", proto_fqn),
        };
        let name = match named {
            Some(name) => name,
            None => values.first().expect("enum with no values").0.as_str(),
        };
        format!("{}.{}", entry.scala_name, to_upper_camel(name))
    }
}

/// The `java_package.OuterClass` scope Java protobuf classes for a file
/// live under, used by the interop shims.
fn java_scope(file: &FileDescriptorProto) -> String {
    let options = file.options.clone().unwrap_or_default();
    let package = if options.java_package().is_empty() {
        file.package()
    } else {
        options.java_package()
    };
    if options.java_multiple_files() {
        package.to_string()
    } else {
        let outer = if options.java_outer_classname().is_empty() {
            to_upper_camel(base_name(file.name()))
        } else {
            options.java_outer_classname().to_string()
        };
        join_scope(package, &outer)
    }
}

/// How a field is held by its message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldShape {
    Map,
    Repeated,
    Required,
    /// Presence-tracked: held as an `Option`.
    Optional,
    /// Held as a bare value: proto3 singular, or a oneof member inside its
    /// variant.
    Singular,
}

/// A field together with the context needed to categorize it.
pub struct FieldView<'a> {
    pub field: &'a FieldDescriptorProto,
    pub syntax: Syntax,
    pub in_oneof: bool,
    /// Fully qualified custom Scala type, when the field declares one.
    pub custom_type: Option<String>,
}

impl<'a> FieldView<'a> {
    pub fn new(
        field: &'a FieldDescriptorProto,
        syntax: Syntax,
        in_oneof: bool,
        custom_type: Option<String>,
    ) -> FieldView<'a> {
        FieldView {
            field,
            syntax,
            in_oneof,
            custom_type,
        }
    }

    pub fn number(&self) -> i32 {
        self.field.number()
    }

    pub fn proto_name(&self) -> &str {
        self.field.name()
    }

    /// The derived accessor/value name.
    pub fn scala_name(&self) -> String {
        ident::field_name(self.field.name())
    }

    /// The `UpperCamel` form used in `withX`/`clearX`/`addX` accessors.
    pub fn upper_name(&self) -> String {
        to_upper_camel(self.field.name())
    }

    /// The camel-cased name without keyword quoting, for compound member
    /// names such as the per-field size cache.
    pub fn member_name(&self) -> String {
        ident::member_base_name(self.field.name())
    }

    pub fn type_(&self) -> Type {
        self.field.r#type()
    }

    pub fn is_repeated(&self) -> bool {
        self.field.label() == Label::Repeated
    }

    pub fn is_required(&self) -> bool {
        self.field.label() == Label::Required
    }

    pub fn is_message(&self) -> bool {
        matches!(self.type_(), Type::Message | Type::Group)
    }

    pub fn is_enum(&self) -> bool {
        self.type_() == Type::Enum
    }

    pub fn is_map(&self, symbols: &SymbolTable) -> bool {
        self.is_repeated() && self.is_message() && symbols.get(self.field.type_name()).is_map_entry()
    }

    /// Whether the field distinguishes "unset" from the default value:
    /// proto2 optional (and explicit proto3 `optional`), oneof members, and
    /// singular message fields.
    pub fn supports_presence(&self) -> bool {
        if self.is_repeated() {
            return false;
        }
        if self.in_oneof || self.field.proto3_optional() {
            return true;
        }
        self.field.label() == Label::Optional
            && (self.is_message() || self.syntax == Syntax::Proto2)
    }

    pub fn shape(&self, symbols: &SymbolTable) -> FieldShape {
        if self.is_map(symbols) {
            FieldShape::Map
        } else if self.is_repeated() {
            FieldShape::Repeated
        } else if self.is_required() {
            FieldShape::Required
        } else if !self.in_oneof && self.supports_presence() {
            FieldShape::Optional
        } else {
            FieldShape::Singular
        }
    }

    /// Singular without presence: the proto3 skip-default rules apply.
    pub fn is_singular(&self) -> bool {
        !self.in_oneof && !self.is_repeated() && !self.is_required() && !self.supports_presence()
    }

    pub fn is_packable(&self) -> bool {
        matches!(
            self.type_(),
            Type::Float
                | Type::Double
                | Type::Int32
                | Type::Int64
                | Type::Uint32
                | Type::Uint64
                | Type::Sint32
                | Type::Sint64
                | Type::Fixed32
                | Type::Fixed64
                | Type::Sfixed32
                | Type::Sfixed64
                | Type::Bool
                | Type::Enum
        )
    }

    pub fn is_packed(&self) -> bool {
        self.is_repeated()
            && self.is_packable()
            && self
                .field
                .options
                .as_ref()
                .and_then(|options| options.packed)
                .unwrap_or(self.syntax == Syntax::Proto3)
    }

    pub fn wire_type(&self) -> u32 {
        match self.type_() {
            Type::Int32
            | Type::Int64
            | Type::Uint32
            | Type::Uint64
            | Type::Sint32
            | Type::Sint64
            | Type::Bool
            | Type::Enum => 0,
            Type::Fixed64 | Type::Sfixed64 | Type::Double => 1,
            Type::String | Type::Bytes | Type::Message => 2,
            Type::Fixed32 | Type::Sfixed32 | Type::Float => 5,
            Type::Group => panic!("group fields are rejected before emission"),
        }
    }

    /// The full tag value the decoder matches on.
    pub fn tag(&self) -> u32 {
        (self.number() as u32) << 3 | self.wire_type()
    }

    /// The tag of the length-delimited (packed) form.
    pub fn packed_tag(&self) -> u32 {
        (self.number() as u32) << 3 | 2
    }

    /// The size of the encoded tag, computed at generation time.
    pub fn tag_size(&self) -> u32 {
        varint_size((self.number() as u64) << 3)
    }

    /// The capitalised type name the coded stream routines are named
    /// after: `write{Cap}`, `read{Cap}`, `compute{Cap}Size`.
    pub fn cap_type(&self) -> &'static str {
        match self.type_() {
            Type::Double => "Double",
            Type::Float => "Float",
            Type::Int64 => "Int64",
            Type::Uint64 => "UInt64",
            Type::Int32 => "Int32",
            Type::Fixed64 => "Fixed64",
            Type::Fixed32 => "Fixed32",
            Type::Bool => "Bool",
            Type::String => "String",
            Type::Message => "Message",
            Type::Bytes => "Bytes",
            Type::Uint32 => "UInt32",
            Type::Enum => "Enum",
            Type::Sfixed32 => "SFixed32",
            Type::Sfixed64 => "SFixed64",
            Type::Sint32 => "SInt32",
            Type::Sint64 => "SInt64",
            Type::Group => panic!("group fields are rejected before emission"),
        }
    }

    /// The Scala type of one element before any custom mapping.
    pub fn base_single_type(&self, symbols: &SymbolTable) -> String {
        match self.type_() {
            Type::Double => "_root_.scala.Double".to_string(),
            Type::Float => "_root_.scala.Float".to_string(),
            Type::Int64 | Type::Uint64 | Type::Fixed64 | Type::Sfixed64 | Type::Sint64 => {
                "_root_.scala.Long".to_string()
            }
            Type::Int32 | Type::Uint32 | Type::Fixed32 | Type::Sfixed32 | Type::Sint32 => {
                "_root_.scala.Int".to_string()
            }
            Type::Bool => "_root_.scala.Boolean".to_string(),
            Type::String => "_root_.scala.Predef.String".to_string(),
            Type::Bytes => "_root_.com.google.protobuf.ByteString".to_string(),
            Type::Message | Type::Enum | Type::Group => {
                symbols.scala_name(self.field.type_name()).to_string()
            }
        }
    }

    /// The Scala type of one element: the custom type when mapped.
    pub fn single_type(&self, symbols: &SymbolTable) -> String {
        match &self.custom_type {
            Some(custom) => custom.clone(),
            None => self.base_single_type(symbols),
        }
    }

    /// The type of the whole constructor parameter.
    pub fn container_type(&self, symbols: &SymbolTable) -> String {
        match self.shape(symbols) {
            FieldShape::Map => {
                let (key, value) = self.map_key_value(symbols).expect("map entry fields");
                format!(
                    "_root_.scala.collection.immutable.Map[{}, {}]",
                    key.single_type(symbols),
                    value.single_type(symbols)
                )
            }
            FieldShape::Repeated => format!("_root_.scala.Seq[{}]", self.single_type(symbols)),
            FieldShape::Optional => format!("_root_.scala.Option[{}]", self.single_type(symbols)),
            FieldShape::Required | FieldShape::Singular => self.single_type(symbols),
        }
    }

    /// Views over the key/value fields of a map field's entry message.
    pub fn map_key_value<'s>(
        &self,
        symbols: &'s SymbolTable,
    ) -> Option<(FieldView<'s>, FieldView<'s>)> {
        if !self.is_message() {
            return None;
        }
        let entry = symbols.map_entry(self.field.type_name())?;
        let syntax = symbols.get(self.field.type_name()).syntax;
        Some((
            FieldView::new(&entry.key, syntax, false, None),
            FieldView::new(&entry.value, syntax, false, None),
        ))
    }

    /// The lift from the custom type down to the wire-level base type.
    pub fn to_base_expr(&self, typemapper: Option<&str>) -> Expr {
        match (&self.custom_type, typemapper) {
            (Some(_), Some(mapper)) => Expr::function(format!("{}.toBase", mapper)),
            _ => Expr::Identity,
        }
    }

    /// The lift from the wire-level base type up to the custom type.
    pub fn to_custom_expr(&self, typemapper: Option<&str>) -> Expr {
        match (&self.custom_type, typemapper) {
            (Some(_), Some(mapper)) => Expr::function(format!("{}.toCustom", mapper)),
            _ => Expr::Identity,
        }
    }

    /// The raw read call for one element of a non-message field.
    pub fn read_expr(&self, symbols: &SymbolTable) -> String {
        match self.type_() {
            Type::String => "_input__.readStringRequireUtf8()".to_string(),
            Type::Bytes => "_input__.readBytes()".to_string(),
            Type::Enum => format!(
                "{}.fromValue(_input__.readEnum())",
                symbols.scala_name(self.field.type_name())
            ),
            Type::Message | Type::Group => panic!("message reads are assembled by the caller"),
            _ => format!("_input__.read{}()", self.cap_type()),
        }
    }

    /// The default expression of the base (uncustomized) type, honoring a
    /// proto2 `default` option.
    pub fn base_default_expr(&self, symbols: &SymbolTable) -> String {
        match self.field.default_value.as_deref() {
            Some(default) => self.explicit_default_expr(symbols, default),
            None => self.zero_default_expr(symbols),
        }
    }

    /// `D(f)`: the base default lifted through `toCustom` when mapped.
    pub fn default_expr(&self, symbols: &SymbolTable, typemapper: Option<&str>) -> String {
        self.to_custom_expr(typemapper)
            .apply(&self.base_default_expr(symbols), crate::expr::EnclosingType::None)
    }

    fn zero_default_expr(&self, symbols: &SymbolTable) -> String {
        match self.type_() {
            Type::Double => "0.0".to_string(),
            Type::Float => "0.0f".to_string(),
            Type::Int64 | Type::Uint64 | Type::Fixed64 | Type::Sfixed64 | Type::Sint64 => {
                "0L".to_string()
            }
            Type::Int32 | Type::Uint32 | Type::Fixed32 | Type::Sfixed32 | Type::Sint32 => {
                "0".to_string()
            }
            Type::Bool => "false".to_string(),
            Type::String => "\"\"".to_string(),
            Type::Bytes => "_root_.com.google.protobuf.ByteString.EMPTY".to_string(),
            Type::Enum => symbols.enum_default(self.field.type_name(), None),
            Type::Message | Type::Group => format!(
                "{}.defaultInstance",
                symbols.scala_name(self.field.type_name())
            ),
        }
    }

    fn explicit_default_expr(&self, symbols: &SymbolTable, default: &str) -> String {
        match self.type_() {
            Type::Double => match default {
                "inf" => "_root_.scala.Double.PositiveInfinity".to_string(),
                "-inf" => "_root_.scala.Double.NegativeInfinity".to_string(),
                "nan" => "_root_.scala.Double.NaN".to_string(),
                value if value.contains('.') || value.contains('e') || value.contains('E') => {
                    value.to_string()
                }
                value => format!("{}.0", value),
            },
            Type::Float => match default {
                "inf" => "_root_.scala.Float.PositiveInfinity".to_string(),
                "-inf" => "_root_.scala.Float.NegativeInfinity".to_string(),
                "nan" => "_root_.scala.Float.NaN".to_string(),
                value => format!("{}f", value),
            },
            Type::Int64 | Type::Sfixed64 | Type::Sint64 => format!("{}L", default),
            Type::Uint64 | Type::Fixed64 => {
                let value = default.parse::<u64>().expect("malformed uint64 default");
                format!("{}L", value as i64)
            }
            Type::Int32 | Type::Sfixed32 | Type::Sint32 => default.to_string(),
            Type::Uint32 | Type::Fixed32 => {
                let value = default.parse::<u32>().expect("malformed uint32 default");
                format!("{}", value as i32)
            }
            Type::Bool => default.to_string(),
            Type::String => scala_string_literal(default),
            Type::Bytes => format!(
                "_root_.scalagen.Encoding.byteStringFromBase64(\"{}\")",
                BASE64_STANDARD.encode(unescape_c_escape_string(default))
            ),
            Type::Enum => symbols.enum_default(self.field.type_name(), Some(default)),
            Type::Message | Type::Group => panic!("message fields cannot declare a default"),
        }
    }
}

/// Renders a Scala string literal.
pub fn scala_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if (ch as u32) < 0x20 || (ch as u32) > 0x7e => {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units).iter() {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
            ch => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// The length of a varint encoding of `value`.
pub fn varint_size(value: u64) -> u32 {
    let mut size = 1;
    let mut value = value >> 7;
    while value != 0 {
        size += 1;
        value >>= 7;
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn field(name: &str, number: i32, type_: Type, label: Label) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            r#type: Some(type_ as i32),
            label: Some(label as i32),
            ..Default::default()
        }
    }

    fn empty_symbols() -> SymbolTable {
        SymbolTable {
            types: HashMap::new(),
        }
    }

    #[test]
    fn test_base_name() {
        assert_eq!("foo", base_name("foo.proto"));
        assert_eq!("foo_bar", base_name("a/b/foo_bar.proto"));
        assert_eq!("ExampleProto", file_object_name("a/example.proto"));
    }

    #[test]
    fn test_scala_package() {
        let file = FileDescriptorProto {
            name: Some("dir/my_file.proto".to_string()),
            package: Some("com.acme".to_string()),
            ..Default::default()
        };
        let options = ScalaFileOptions::default();
        assert_eq!("com.acme.my_file", scala_package(&file, &options, false));
        assert_eq!("com.acme", scala_package(&file, &options, true));

        let named = ScalaFileOptions {
            package_name: Some("io.widgets".to_string()),
            flat_package: Some(true),
            ..Default::default()
        };
        assert_eq!("io.widgets", scala_package(&file, &named, false));
    }

    #[test]
    fn test_presence_and_shape() {
        let symbols = empty_symbols();
        let f = field("x", 1, Type::Int32, Label::Optional);

        let proto3 = FieldView::new(&f, Syntax::Proto3, false, None);
        assert!(!proto3.supports_presence());
        assert_eq!(proto3.shape(&symbols), FieldShape::Singular);

        let proto2 = FieldView::new(&f, Syntax::Proto2, false, None);
        assert!(proto2.supports_presence());
        assert_eq!(proto2.shape(&symbols), FieldShape::Optional);

        let member = FieldView::new(&f, Syntax::Proto3, true, None);
        assert!(member.supports_presence());
        assert_eq!(member.shape(&symbols), FieldShape::Singular);
    }

    #[test]
    fn test_packed_by_syntax() {
        let f = field("xs", 1, Type::Int32, Label::Repeated);
        assert!(FieldView::new(&f, Syntax::Proto3, false, None).is_packed());
        assert!(!FieldView::new(&f, Syntax::Proto2, false, None).is_packed());

        let strings = field("ss", 2, Type::String, Label::Repeated);
        assert!(!FieldView::new(&strings, Syntax::Proto3, false, None).is_packed());
    }

    #[test]
    fn test_tags() {
        let f = field("x", 3, Type::Fixed32, Label::Optional);
        let view = FieldView::new(&f, Syntax::Proto3, false, None);
        assert_eq!(view.wire_type(), 5);
        assert_eq!(view.tag(), 3 << 3 | 5);
        assert_eq!(view.packed_tag(), 3 << 3 | 2);
        assert_eq!(view.tag_size(), 1);

        let wide = field("y", 300, Type::Int32, Label::Optional);
        assert_eq!(FieldView::new(&wide, Syntax::Proto3, false, None).tag_size(), 2);
    }

    #[test]
    fn test_explicit_defaults() {
        let symbols = empty_symbols();
        let mut f = field("x", 1, Type::Float, Label::Optional);
        f.default_value = Some("-inf".to_string());
        let view = FieldView::new(&f, Syntax::Proto2, false, None);
        assert_eq!(
            view.base_default_expr(&symbols),
            "_root_.scala.Float.NegativeInfinity"
        );

        let mut f = field("x", 1, Type::Uint32, Label::Optional);
        f.default_value = Some("4294967295".to_string());
        let view = FieldView::new(&f, Syntax::Proto2, false, None);
        assert_eq!(view.base_default_expr(&symbols), "-1");

        let mut f = field("s", 1, Type::String, Label::Optional);
        f.default_value = Some("a\"b\n".to_string());
        let view = FieldView::new(&f, Syntax::Proto2, false, None);
        assert_eq!(view.base_default_expr(&symbols), "\"a\\\"b\\n\"");
    }

    #[test]
    fn test_scala_string_literal() {
        assert_eq!(scala_string_literal("plain"), "\"plain\"");
        assert_eq!(scala_string_literal("a\tb"), "\"a\\tb\"");
        assert_eq!(scala_string_literal("\u{7f}"), "\"\\u007f\"");
    }

    #[test]
    fn test_varint_size() {
        assert_eq!(varint_size(0), 1);
        assert_eq!(varint_size(127), 1);
        assert_eq!(varint_size(128), 2);
        assert_eq!(varint_size(16383), 2);
        assert_eq!(varint_size(16384), 3);
    }
}
