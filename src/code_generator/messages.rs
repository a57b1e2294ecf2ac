//! Message emission, the central subsystem.
//!
//! For every message this produces the immutable case class (accessors,
//! functional updates, memoized `serializedSize`, `writeTo`, reflection
//! lookups) and its companion (`parseFrom` merge loop, `fromFieldsMap`,
//! default instance, companion lookups by field number, nested scopes, and
//! the optional Java interop shims).

use itertools::{Either, Itertools};
use log::debug;
use multimap::MultiMap;
use prost_types::field_descriptor_proto::Type;
use prost_types::DescriptorProto;

use super::oneofs::OneofContext;
use super::{CodeGenerator, DescriptorProtoLocations};

mod interop;
use crate::descriptor::{FieldShape, FieldView};
use crate::error::GeneratorError;
use crate::expr::{EnclosingType, Expr};
use crate::ident::{self, to_upper_camel};
use crate::printer::Printer;

const CODED_OUTPUT: &str = "_root_.com.google.protobuf.CodedOutputStream";

pub(super) struct MessageContext<'a> {
    pub message: &'a DescriptorProto,
    /// Position in the enclosing scope's message list.
    pub idx: usize,
    /// Simple Scala name.
    pub name: String,
    /// Fully qualified Scala name.
    pub fqn: String,
    /// Regular (non-oneof) fields with their declaration index.
    pub fields: Vec<(FieldView<'a>, usize)>,
    pub oneofs: Vec<OneofContext<'a>>,
    pub is_map_entry: bool,
}

/// All writable slots of a message in ascending field-number order: the
/// wire-facing routines iterate in this order regardless of declaration
/// order.
fn sorted_slots<'c, 'a>(
    ctx: &'c MessageContext<'a>,
) -> Vec<(&'c FieldView<'a>, Option<&'c OneofContext<'a>>)> {
    let mut slots: Vec<(&FieldView<'a>, Option<&OneofContext<'a>>)> = ctx
        .fields
        .iter()
        .map(|(view, _)| (view, None))
        .collect();
    for oneof in &ctx.oneofs {
        for (view, _) in &oneof.fields {
            slots.push((view, Some(oneof)));
        }
    }
    slots.sort_by_key(|(view, _)| view.number());
    slots
}

/// The companion-side type mapper reference for a custom-mapped field.
fn typemapper_ref(fqn: &str, view: &FieldView<'_>) -> Option<String> {
    view.custom_type
        .as_ref()
        .map(|_| format!("{}._typemapper_{}", fqn, view.member_name()))
}

/// Base lift followed by the enum-to-varint projection: the value the coded
/// stream routines actually receive.
fn wire_lift(view: &FieldView<'_>, typemapper: Option<&str>) -> Expr {
    let base = view.to_base_expr(typemapper);
    if view.is_enum() {
        base.and_then(Expr::method("value"))
    } else {
        base
    }
}

/// Base lift followed by the coercion reflection expects: enums surface as
/// their value descriptor.
fn reflection_lift(view: &FieldView<'_>, typemapper: Option<&str>) -> Expr {
    let base = view.to_base_expr(typemapper);
    if view.is_enum() {
        base.and_then(Expr::method("valueDescriptor"))
    } else {
        base
    }
}

impl<'a> CodeGenerator<'a> {
    pub(super) fn push_message(
        &mut self,
        p: &mut Printer,
        message: &'a DescriptorProto,
        idx: usize,
    ) -> Result<(), GeneratorError> {
        debug!("  message: {:?}", message.name());

        let ctx = self.message_context(message, idx)?;
        self.check_oneof_conflicts(&ctx)?;

        self.push_doc(p);
        self.push_case_class(p, &ctx);
        p.add("");
        self.push_companion(p, &ctx)?;
        p.add("");
        Ok(())
    }

    fn message_context(
        &self,
        message: &'a DescriptorProto,
        idx: usize,
    ) -> Result<MessageContext<'a>, GeneratorError> {
        let message_path = self.message_path(message.name());
        if let Some(field) = message
            .field
            .iter()
            .find(|field| field.r#type() == Type::Group)
        {
            return Err(GeneratorError::GroupUnsupported {
                field: format!("{}.{}", message_path, field.name()),
            });
        }

        let name = to_upper_camel(message.name());
        let fqn = self.scala_scope_join(&name);
        let file_name = self.unit.file.name();
        let syntax = self.syntax;

        // Split the fields into the regular ones and the oneof members.
        // A proto3 `optional` field synthesizes a oneof that is folded back
        // into a plain presence-tracked field.
        type Fields<'b> = Vec<(FieldView<'b>, usize)>;
        type OneofFields<'b> = MultiMap<i32, (FieldView<'b>, usize)>;
        let (fields, mut oneof_fields): (Fields<'a>, OneofFields<'a>) = message
            .field
            .iter()
            .enumerate()
            .partition_map(|(decl_idx, field)| {
                let custom_type = self
                    .options
                    .custom_type(file_name, &message_path, field.name())
                    .map(str::to_string);
                if field.proto3_optional() {
                    Either::Left((FieldView::new(field, syntax, false, custom_type), decl_idx))
                } else if let Some(oneof_index) = field.oneof_index {
                    Either::Right((
                        oneof_index,
                        (FieldView::new(field, syntax, true, custom_type), decl_idx),
                    ))
                } else {
                    Either::Left((FieldView::new(field, syntax, false, custom_type), decl_idx))
                }
            });

        let mut oneofs = Vec::new();
        for (oneof_idx, decl) in message.oneof_decl.iter().enumerate() {
            // Synthetic proto3-optional oneofs have no members left.
            if let Some(members) = oneof_fields.remove(&(oneof_idx as i32)) {
                oneofs.push(OneofContext::new(decl, oneof_idx as i32, members));
            }
        }

        let is_map_entry = message
            .options
            .as_ref()
            .and_then(|options| options.map_entry)
            .unwrap_or(false);

        Ok(MessageContext {
            message,
            idx,
            name,
            fqn,
            fields,
            oneofs,
            is_map_entry,
        })
    }

    fn push_case_class(&mut self, p: &mut Printer, ctx: &MessageContext<'a>) {
        let params = self.constructor_params(ctx);
        p.add(&format!("final case class {}(", ctx.name));
        p.indented(|p| {
            p.indented(|p| {
                p.add_delimited(&params, ",");
                p.add(") extends _root_.scalagen.GeneratedMessage {");
                self.push_serialized_size(p, ctx);
                self.push_write_to(p, ctx);
                self.push_accessors(p, ctx);
                self.push_get_field_by_number(p, ctx);
                p.add("def getField(__field: _root_.scalagen.descriptors.FieldDescriptor): _root_.scala.Any = {");
                p.indented(|p| {
                    p.add("_root_.scala.Predef.require(__field.containingMessage eq companion.descriptor, \"FieldDescriptor does not match message type.\")");
                    p.add("getFieldByNumber(__field.number)");
                });
                p.add("}");
                p.add("def toProtoString: _root_.scala.Predef.String = _root_.scalagen.TextFormat.printToUnicodeString(this)");
                p.when(self.params.single_line_to_string, |p| {
                    p.add("override def toString: _root_.scala.Predef.String = _root_.scalagen.TextFormat.printToSingleLineUnicodeString(this)");
                });
                p.add(&format!("def companion: {}.type = {}", ctx.fqn, ctx.fqn));
            });
        });
        p.add("}");
    }

    fn constructor_params(&self, ctx: &MessageContext<'a>) -> Vec<String> {
        let symbols = self.symbols;
        let mut params = Vec::new();
        for (view, _) in &ctx.fields {
            let typemapper = typemapper_ref(&ctx.fqn, view);
            let default = match view.shape(symbols) {
                FieldShape::Map => "_root_.scala.collection.immutable.Map.empty".to_string(),
                FieldShape::Repeated => "_root_.scala.Seq.empty".to_string(),
                FieldShape::Optional => "_root_.scala.None".to_string(),
                FieldShape::Required | FieldShape::Singular => {
                    view.default_expr(symbols, typemapper.as_deref())
                }
            };
            params.push(format!(
                "{}: {} = {}",
                view.scala_name(),
                view.container_type(symbols),
                default
            ));
        }
        for oneof in &ctx.oneofs {
            let kind = format!("{}.{}", ctx.fqn, oneof.type_name);
            params.push(format!("{}: {} = {}.Empty", oneof.value_name, kind, kind));
        }
        params
    }

    fn push_serialized_size(&self, p: &mut Printer, ctx: &MessageContext<'a>) {
        // Packed fields carry their own memoized body size; it doubles as
        // the length prefix and as the per-element loop bound.
        for (view, _) in ctx.fields.iter().filter(|(view, _)| view.is_packed()) {
            let member = view.member_name();
            let lift = wire_lift(view, typemapper_ref(&ctx.fqn, view).as_deref());
            p.add(&format!(
                "@transient private[this] var __{}SerializedSizeField: _root_.scala.Int = 0",
                member
            ));
            p.block(&format!("private def {}SerializedSize = {{", member), "}", |p| {
                p.block(
                    &format!("if (__{}SerializedSizeField == 0) {{", member),
                    "}",
                    |p| {
                        p.add("var __s: _root_.scala.Int = 0");
                        p.add(&format!(
                            "{}.foreach(__i => __s += {}.compute{}SizeNoTag({}))",
                            view.scala_name(),
                            CODED_OUTPUT,
                            view.cap_type(),
                            lift.apply("__i", EnclosingType::None)
                        ));
                        p.add(&format!("__{}SerializedSizeField = __s", member));
                    },
                );
                p.add(&format!("__{}SerializedSizeField", member));
            });
        }

        p.add("@transient");
        p.add("private[this] var __serializedSizeMemo: _root_.scala.Int = 0");
        p.block(
            "private[this] def __computeSerializedSize(): _root_.scala.Int = {",
            "}",
            |p| {
                p.add("var __size = 0");
                for (view, oneof) in sorted_slots(ctx) {
                    self.push_size_fragment(p, ctx, view, oneof);
                }
                p.add("__size");
            },
        );
        p.block(
            "override def serializedSize: _root_.scala.Int = {",
            "}",
            |p| {
                p.add("var __size = __serializedSizeMemo");
                p.block("if (__size == 0) {", "}", |p| {
                    p.add("// Stored off by one: zero always means \"not yet computed\".");
                    p.add("__size = __computeSerializedSize() + 1");
                    p.add("__serializedSizeMemo = __size");
                });
                p.add("__size - 1");
            },
        );
    }

    /// One field's contribution to `__size`.
    fn push_size_fragment(
        &self,
        p: &mut Printer,
        ctx: &MessageContext<'a>,
        view: &FieldView<'a>,
        oneof: Option<&OneofContext<'a>>,
    ) {
        let symbols = self.symbols;
        let typemapper = typemapper_ref(&ctx.fqn, view);
        let lift = wire_lift(view, typemapper.as_deref());
        let acc = match oneof {
            Some(oneof) => format!("{}.{}", oneof.value_name, view.scala_name()),
            None => view.scala_name(),
        };
        let number = view.number();
        let tag_size = view.tag_size();

        let push_single = |p: &mut Printer, value: &str| {
            if view.is_message() {
                p.add(&format!(
                    "__size += {} + {}.computeUInt32SizeNoTag({}.serializedSize) + {}.serializedSize",
                    tag_size, CODED_OUTPUT, value, value
                ));
            } else {
                p.add(&format!(
                    "__size += {}.compute{}Size({}, {})",
                    CODED_OUTPUT,
                    view.cap_type(),
                    number,
                    value
                ));
            }
        };

        if oneof.is_some() || view.shape(symbols) == FieldShape::Optional {
            p.block(&format!("{}.foreach {{ __v =>", acc), "};", |p| {
                p.add(&format!(
                    "val __value = {}",
                    lift.apply("__v", EnclosingType::None)
                ));
                push_single(p, "__value");
            });
            return;
        }

        match view.shape(symbols) {
            FieldShape::Required => {
                if view.is_message() {
                    p.block("{", "};", |p| {
                        p.add(&format!(
                            "val __value = {}",
                            lift.apply(&acc, EnclosingType::None)
                        ));
                        push_single(p, "__value");
                    });
                } else {
                    push_single(p, &lift.apply(&acc, EnclosingType::None));
                }
            }
            FieldShape::Singular => {
                p.block("{", "};", |p| {
                    p.add(&format!(
                        "val __value = {}",
                        lift.apply(&acc, EnclosingType::None)
                    ));
                    p.block(
                        &format!("if ({}) {{", self.nonempty_check(view, "__value")),
                        "}",
                        |p| push_single(p, "__value"),
                    );
                });
            }
            FieldShape::Map => {
                let entry_mapper = self.entry_typemapper(view);
                p.block(&format!("{}.foreach {{ __item =>", acc), "}", |p| {
                    p.add(&format!("val __value = {}.toBase(__item)", entry_mapper));
                    p.add(&format!(
                        "__size += {} + {}.computeUInt32SizeNoTag(__value.serializedSize) + __value.serializedSize",
                        tag_size, CODED_OUTPUT
                    ));
                });
            }
            FieldShape::Repeated if view.is_packed() => {
                p.block(&format!("if ({}.nonEmpty) {{", acc), "}", |p| {
                    p.add(&format!(
                        "val __localsize = {}SerializedSize",
                        view.member_name()
                    ));
                    p.add(&format!(
                        "__size += {} + {}.computeUInt32SizeNoTag(__localsize) + __localsize",
                        tag_size, CODED_OUTPUT
                    ));
                });
            }
            FieldShape::Repeated => {
                p.block(&format!("{}.foreach {{ __item =>", acc), "}", |p| {
                    p.add(&format!(
                        "val __value = {}",
                        lift.apply("__item", EnclosingType::None)
                    ));
                    push_single(p, "__value");
                });
            }
            FieldShape::Optional => unreachable!("handled above"),
        }
    }

    /// The guard deciding whether a proto3 singular value is omitted.
    fn nonempty_check(&self, view: &FieldView<'a>, value: &str) -> String {
        match view.type_() {
            Type::String | Type::Bytes => format!("!{}.isEmpty", value),
            Type::Enum => format!("{} != 0", value),
            _ => format!("{} != {}", value, view.base_default_expr(self.symbols)),
        }
    }

    fn push_write_to(&self, p: &mut Printer, ctx: &MessageContext<'a>) {
        p.block(
            "def writeTo(_output__: _root_.com.google.protobuf.CodedOutputStream): _root_.scala.Unit = {",
            "}",
            |p| {
                for (view, oneof) in sorted_slots(ctx) {
                    self.push_write_fragment(p, ctx, view, oneof);
                }
            },
        );
    }

    fn push_write_fragment(
        &self,
        p: &mut Printer,
        ctx: &MessageContext<'a>,
        view: &FieldView<'a>,
        oneof: Option<&OneofContext<'a>>,
    ) {
        let symbols = self.symbols;
        let typemapper = typemapper_ref(&ctx.fqn, view);
        let lift = wire_lift(view, typemapper.as_deref());
        let acc = match oneof {
            Some(oneof) => format!("{}.{}", oneof.value_name, view.scala_name()),
            None => view.scala_name(),
        };
        let number = view.number();

        let push_single = |p: &mut Printer, value: &str| {
            if view.is_message() {
                p.add(&format!("_output__.writeTag({}, 2)", number));
                p.add(&format!(
                    "_output__.writeUInt32NoTag({}.serializedSize)",
                    value
                ));
                p.add(&format!("{}.writeTo(_output__)", value));
            } else {
                p.add(&format!(
                    "_output__.write{}({}, {})",
                    view.cap_type(),
                    number,
                    value
                ));
            }
        };

        if oneof.is_some() || view.shape(symbols) == FieldShape::Optional {
            p.block(&format!("{}.foreach {{ __v =>", acc), "};", |p| {
                if view.is_message() {
                    p.add(&format!(
                        "val __m = {}",
                        lift.apply("__v", EnclosingType::None)
                    ));
                    push_single(p, "__m");
                } else {
                    push_single(p, &lift.apply("__v", EnclosingType::None));
                }
            });
            return;
        }

        match view.shape(symbols) {
            FieldShape::Required => {
                if view.is_message() {
                    p.block("{", "};", |p| {
                        p.add(&format!(
                            "val __m = {}",
                            lift.apply(&acc, EnclosingType::None)
                        ));
                        push_single(p, "__m");
                    });
                } else {
                    push_single(p, &lift.apply(&acc, EnclosingType::None));
                }
            }
            FieldShape::Singular => {
                p.block("{", "};", |p| {
                    p.add(&format!(
                        "val __v = {}",
                        lift.apply(&acc, EnclosingType::None)
                    ));
                    p.block(
                        &format!("if ({}) {{", self.nonempty_check(view, "__v")),
                        "}",
                        |p| push_single(p, "__v"),
                    );
                });
            }
            FieldShape::Map => {
                let entry_mapper = self.entry_typemapper(view);
                p.block(&format!("{}.foreach {{ __kv =>", acc), "};", |p| {
                    p.add(&format!("val __m = {}.toBase(__kv)", entry_mapper));
                    p.add(&format!("_output__.writeTag({}, 2)", number));
                    p.add("_output__.writeUInt32NoTag(__m.serializedSize)");
                    p.add("__m.writeTo(_output__)");
                });
            }
            FieldShape::Repeated if view.is_packed() => {
                p.block(&format!("if ({}.nonEmpty) {{", acc), "};", |p| {
                    p.add(&format!("_output__.writeTag({}, 2)", number));
                    p.add(&format!(
                        "_output__.writeUInt32NoTag({}SerializedSize)",
                        view.member_name()
                    ));
                    p.add(&format!(
                        "{}.foreach(__m => _output__.write{}NoTag({}))",
                        acc,
                        view.cap_type(),
                        lift.apply("__m", EnclosingType::None)
                    ));
                });
            }
            FieldShape::Repeated => {
                p.block(&format!("{}.foreach {{ __v =>", acc), "};", |p| {
                    if view.is_message() {
                        p.add(&format!(
                            "val __m = {}",
                            lift.apply("__v", EnclosingType::None)
                        ));
                        push_single(p, "__m");
                    } else {
                        push_single(p, &lift.apply("__v", EnclosingType::None));
                    }
                });
            }
            FieldShape::Optional => unreachable!("handled above"),
        }
    }

    fn push_accessors(&self, p: &mut Printer, ctx: &MessageContext<'a>) {
        let symbols = self.symbols;
        for (view, _) in &ctx.fields {
            let typemapper = typemapper_ref(&ctx.fqn, view);
            let name = view.scala_name();
            let upper = view.upper_name();
            let single = view.single_type(symbols);
            match view.shape(symbols) {
                FieldShape::Optional => {
                    p.add(&format!(
                        "def get{}: {} = {}.getOrElse({})",
                        upper,
                        single,
                        name,
                        view.default_expr(symbols, typemapper.as_deref())
                    ));
                    p.add(&format!(
                        "def clear{}: {} = copy({} = _root_.scala.None)",
                        upper, ctx.fqn, name
                    ));
                    p.add(&format!(
                        "def with{}(__v: {}): {} = copy({} = _root_.scala.Some(__v))",
                        upper, single, ctx.fqn, name
                    ));
                }
                FieldShape::Required => {
                    p.add(&format!(
                        "def with{}(__v: {}): {} = copy({} = __v)",
                        upper, single, ctx.fqn, name
                    ));
                }
                FieldShape::Singular => {
                    p.add(&format!(
                        "def with{}(__v: {}): {} = copy({} = __v)",
                        upper, single, ctx.fqn, name
                    ));
                    p.add(&format!(
                        "def clear{}: {} = copy({} = {})",
                        upper,
                        ctx.fqn,
                        name,
                        view.default_expr(symbols, typemapper.as_deref())
                    ));
                }
                FieldShape::Repeated => {
                    p.add(&format!(
                        "def add{}(__vs: {}*): {} = addAll{}(__vs)",
                        upper, single, ctx.fqn, upper
                    ));
                    p.add(&format!(
                        "def addAll{}(__vs: _root_.scala.Iterable[{}]): {} = copy({} = {} ++ __vs)",
                        upper, single, ctx.fqn, name, name
                    ));
                    p.add(&format!(
                        "def with{}(__v: _root_.scala.Seq[{}]): {} = copy({} = __v)",
                        upper, single, ctx.fqn, name
                    ));
                    p.add(&format!(
                        "def clear{}: {} = copy({} = _root_.scala.Seq.empty)",
                        upper, ctx.fqn, name
                    ));
                }
                FieldShape::Map => {
                    let (key, value) = view.map_key_value(symbols).expect("map entry fields");
                    let pair = format!(
                        "({}, {})",
                        key.single_type(symbols),
                        value.single_type(symbols)
                    );
                    p.add(&format!(
                        "def add{}(__vs: {}*): {} = addAll{}(__vs)",
                        upper, pair, ctx.fqn, upper
                    ));
                    p.add(&format!(
                        "def addAll{}(__vs: _root_.scala.Iterable[{}]): {} = copy({} = {} ++ __vs)",
                        upper, pair, ctx.fqn, name, name
                    ));
                    p.add(&format!(
                        "def with{}(__v: _root_.scala.collection.immutable.Map[{}, {}]): {} = copy({} = __v)",
                        upper,
                        key.single_type(symbols),
                        value.single_type(symbols),
                        ctx.fqn,
                        name
                    ));
                    p.add(&format!(
                        "def clear{}: {} = copy({} = _root_.scala.collection.immutable.Map.empty)",
                        upper, ctx.fqn, name
                    ));
                }
            }
        }

        for oneof in &ctx.oneofs {
            let kind = format!("{}.{}", ctx.fqn, oneof.type_name);
            p.add(&format!(
                "def clear{}: {} = copy({} = {}.Empty)",
                oneof.type_name, ctx.fqn, oneof.value_name, kind
            ));
            p.add(&format!(
                "def with{}(__v: {}): {} = copy({} = __v)",
                oneof.type_name, kind, ctx.fqn, oneof.value_name
            ));
            for (view, _) in &oneof.fields {
                let typemapper = typemapper_ref(&ctx.fqn, view);
                let single = view.single_type(self.symbols);
                p.add(&format!(
                    "def get{}: {} = {}.{}.getOrElse({})",
                    view.upper_name(),
                    single,
                    oneof.value_name,
                    view.scala_name(),
                    view.default_expr(self.symbols, typemapper.as_deref())
                ));
                p.add(&format!(
                    "def with{}(__v: {}): {} = copy({} = {}.{}(__v))",
                    view.upper_name(),
                    single,
                    ctx.fqn,
                    oneof.value_name,
                    kind,
                    view.upper_name()
                ));
            }
        }
    }

    fn push_get_field_by_number(&self, p: &mut Printer, ctx: &MessageContext<'a>) {
        let symbols = self.symbols;
        let slots = sorted_slots(ctx);
        if slots.is_empty() {
            p.add("def getFieldByNumber(__fieldNumber: _root_.scala.Int): _root_.scala.Any = throw new _root_.scala.MatchError(__fieldNumber)");
            return;
        }

        p.block(
            "def getFieldByNumber(__fieldNumber: _root_.scala.Int): _root_.scala.Any = {",
            "}",
            |p| {
                p.block(
                    "(__fieldNumber: @_root_.scala.unchecked) match {",
                    "}",
                    |p| {
                        for &(view, oneof) in &slots {
                            let typemapper = typemapper_ref(&ctx.fqn, view);
                            let lift = reflection_lift(view, typemapper.as_deref());
                            let acc = match oneof {
                                Some(oneof) => {
                                    format!("{}.{}", oneof.value_name, view.scala_name())
                                }
                                None => view.scala_name(),
                            };
                            let number = view.number();

                            if oneof.is_some() {
                                p.add(&format!(
                                    "case {} => {}.orNull",
                                    number,
                                    lift.apply(&acc, EnclosingType::Collection)
                                ));
                                continue;
                            }
                            match view.shape(symbols) {
                                FieldShape::Required => p.add(&format!(
                                    "case {} => {}",
                                    number,
                                    lift.apply(&acc, EnclosingType::None)
                                )),
                                FieldShape::Singular => {
                                    let base = view
                                        .to_base_expr(typemapper.as_deref())
                                        .apply(&acc, EnclosingType::None);
                                    if view.is_enum() {
                                        p.add(&format!(
                                            "case {} => {{ val __t = {}; if (__t.value != 0) __t.valueDescriptor else null }}",
                                            number, base
                                        ));
                                    } else {
                                        p.add(&format!(
                                            "case {} => {{ val __t = {}; if ({}) __t else null }}",
                                            number,
                                            base,
                                            self.nonempty_check(view, "__t")
                                        ));
                                    }
                                }
                                FieldShape::Optional => p.add(&format!(
                                    "case {} => {}.orNull",
                                    number,
                                    lift.apply(&acc, EnclosingType::Collection)
                                )),
                                FieldShape::Repeated => p.add(&format!(
                                    "case {} => {}",
                                    number,
                                    lift.apply(&acc, EnclosingType::Collection)
                                )),
                                FieldShape::Map => p.add(&format!(
                                    "case {} => {}.iterator.map({}.toBase).toSeq",
                                    number,
                                    acc,
                                    self.entry_typemapper(view)
                                )),
                            }
                        }
                    },
                );
            },
        );
    }

    /// The companion reference of a map field's entry type mapper.
    fn entry_typemapper(&self, view: &FieldView<'a>) -> String {
        format!(
            "{}._typemapper",
            self.symbols.scala_name(view.field.type_name())
        )
    }

    fn push_companion(
        &mut self,
        p: &mut Printer,
        ctx: &MessageContext<'a>,
    ) -> Result<(), GeneratorError> {
        p.add(&format!(
            "object {} extends _root_.scalagen.GeneratedMessageCompanion[{}] {{",
            ctx.name, ctx.fqn
        ));
        let mut result = Ok(());
        p.indented(|p| {
            p.add(&format!(
                "implicit def messageCompanion: _root_.scalagen.GeneratedMessageCompanion[{}] = this",
                ctx.fqn
            ));
            self.push_parse_from(p, ctx);
            self.push_from_fields_map(p, ctx);
            p.add(&format!(
                "def descriptor: _root_.scalagen.descriptors.Descriptor = {}",
                self.descriptor_ref("messages", "nestedMessages", ctx.idx)
            ));
            self.push_companions_for_field_number(p, ctx);
            self.push_default_instance(p, ctx);
            p.when(self.params.java_conversions, |p| {
                self.push_java_conversions(p, ctx);
            });
            self.push_typemappers(p, ctx);
            p.when(ctx.is_map_entry, |p| {
                self.push_map_entry_typemapper(p, ctx);
            });
            result = self.push_companion_nested(p, ctx);
            self.push_field_number_constants(p, ctx);
        });
        p.add("}");
        result
    }

    fn push_companion_nested(
        &mut self,
        p: &mut Printer,
        ctx: &MessageContext<'a>,
    ) -> Result<(), GeneratorError> {
        self.type_path.push(ctx.message.name().to_string());

        self.path.push(DescriptorProtoLocations::NESTED_TYPE);
        for (idx, nested) in ctx.message.nested_type.iter().enumerate() {
            self.path.push(idx as i32);
            let nested_result = self.push_message(p, nested, idx);
            self.path.pop();
            if nested_result.is_err() {
                self.path.pop();
                self.type_path.pop();
                return nested_result;
            }
        }
        self.path.pop();

        self.path.push(DescriptorProtoLocations::ENUM_TYPE);
        for (idx, nested) in ctx.message.enum_type.iter().enumerate() {
            self.path.push(idx as i32);
            self.push_enum(p, nested, idx);
            self.path.pop();
        }
        self.path.pop();

        self.type_path.pop();

        for oneof in &ctx.oneofs {
            self.path.push(DescriptorProtoLocations::ONEOF_DECL);
            self.path.push(oneof.decl_idx);
            self.push_oneof(p, &ctx.fqn, oneof);
            self.path.pop();
            self.path.pop();
        }

        if !ctx.message.extension.is_empty() {
            self.path.push(DescriptorProtoLocations::EXTENSION);
            let extension_result = self.push_extensions(p, &ctx.message.extension);
            self.path.pop();
            extension_result?;
        }
        Ok(())
    }

    fn push_parse_from(&self, p: &mut Printer, ctx: &MessageContext<'a>) {
        let symbols = self.symbols;
        p.block(
            &format!(
                "def parseFrom(_input__: _root_.com.google.protobuf.CodedInputStream): {} = {{",
                ctx.fqn
            ),
            "}",
            |p| {
                // Mutable slots, converted to the final containers below.
                for (view, _) in &ctx.fields {
                    let member = view.member_name();
                    let typemapper = typemapper_ref(&ctx.fqn, view);
                    match view.shape(symbols) {
                        FieldShape::Map => {
                            let (key, value) = view.map_key_value(symbols).expect("map entry fields");
                            p.add(&format!(
                                "val __{} = _root_.scala.collection.immutable.Map.newBuilder[{}, {}]",
                                member,
                                key.single_type(symbols),
                                value.single_type(symbols)
                            ));
                        }
                        FieldShape::Repeated => p.add(&format!(
                            "val __{} = _root_.scala.Seq.newBuilder[{}]",
                            member,
                            view.single_type(symbols)
                        )),
                        FieldShape::Optional => p.add(&format!(
                            "var __{}: _root_.scala.Option[{}] = _root_.scala.None",
                            member,
                            view.single_type(symbols)
                        )),
                        FieldShape::Required | FieldShape::Singular => p.add(&format!(
                            "var __{}: {} = {}",
                            member,
                            view.single_type(symbols),
                            view.default_expr(symbols, typemapper.as_deref())
                        )),
                    }
                }
                for oneof in &ctx.oneofs {
                    let kind = format!("{}.{}", ctx.fqn, oneof.type_name);
                    p.add(&format!(
                        "var __{}: {} = {}.Empty",
                        ident::member_base_name(oneof.decl.name()),
                        kind,
                        kind
                    ));
                }

                p.add("var _done__ = false");
                p.block("while (!_done__) {", "}", |p| {
                    p.add("val _tag__ = _input__.readTag()");
                    p.block("_tag__ match {", "}", |p| {
                        p.add("case 0 => _done__ = true");
                        for (view, oneof) in sorted_slots(ctx) {
                            self.push_parse_arms(p, ctx, view, oneof);
                        }
                        p.add("case tag => _input__.skipField(tag)");
                    });
                });

                let mut args = Vec::new();
                for (view, _) in &ctx.fields {
                    let member = view.member_name();
                    let value = match view.shape(symbols) {
                        FieldShape::Map | FieldShape::Repeated => {
                            format!("__{}.result()", member)
                        }
                        _ => format!("__{}", member),
                    };
                    args.push(format!("{} = {}", view.scala_name(), value));
                }
                for oneof in &ctx.oneofs {
                    args.push(format!(
                        "{} = __{}",
                        oneof.value_name,
                        ident::member_base_name(oneof.decl.name())
                    ));
                }
                if args.is_empty() {
                    p.add(&format!("{}()", ctx.fqn));
                } else {
                    p.add(&format!("{}(", ctx.fqn));
                    p.indented(|p| p.add_delimited(&args, ","));
                    p.add(")");
                }
            },
        );
    }

    /// The decode arms for one field: the declared form, plus the alternate
    /// packed/unpacked form for packable repeated fields.
    fn push_parse_arms(
        &self,
        p: &mut Printer,
        ctx: &MessageContext<'a>,
        view: &FieldView<'a>,
        oneof: Option<&OneofContext<'a>>,
    ) {
        let symbols = self.symbols;
        let typemapper = typemapper_ref(&ctx.fqn, view);
        let to_custom = view.to_custom_expr(typemapper.as_deref());
        let tag = view.tag();
        let member = view.member_name();

        if let Some(oneof) = oneof {
            let kind = format!("{}.{}", ctx.fqn, oneof.type_name);
            let slot = format!("__{}", ident::member_base_name(oneof.decl.name()));
            let variant = format!("{}.{}", kind, view.upper_name());
            let read = if view.is_message() {
                let base = symbols.scala_name(view.field.type_name());
                let existing = match &typemapper {
                    Some(mapper) => format!(
                        "{}.{}.map({}.toBase).getOrElse({}.defaultInstance)",
                        slot,
                        view.scala_name(),
                        mapper,
                        base
                    ),
                    None => format!(
                        "{}.{}.getOrElse({}.defaultInstance)",
                        slot,
                        view.scala_name(),
                        base
                    ),
                };
                to_custom.apply(
                    &format!("_root_.scalagen.LiteParser.readMessage(_input__, {})", existing),
                    EnclosingType::None,
                )
            } else {
                to_custom.apply(&view.read_expr(symbols), EnclosingType::None)
            };
            p.add(&format!("case {} => {} = {}({})", tag, slot, variant, read));
            return;
        }

        match view.shape(symbols) {
            FieldShape::Required | FieldShape::Singular => {
                if view.is_message() {
                    let existing = match &typemapper {
                        Some(mapper) => format!("{}.toBase(__{})", mapper, member),
                        None => format!("__{}", member),
                    };
                    p.add(&format!(
                        "case {} => __{} = {}",
                        tag,
                        member,
                        to_custom.apply(
                            &format!(
                                "_root_.scalagen.LiteParser.readMessage(_input__, {})",
                                existing
                            ),
                            EnclosingType::None
                        )
                    ));
                } else {
                    p.add(&format!(
                        "case {} => __{} = {}",
                        tag,
                        member,
                        to_custom.apply(&view.read_expr(symbols), EnclosingType::None)
                    ));
                }
            }
            FieldShape::Optional => {
                if view.is_message() {
                    let base = symbols.scala_name(view.field.type_name());
                    let existing = match &typemapper {
                        Some(mapper) => format!(
                            "__{}.map({}.toBase).getOrElse({}.defaultInstance)",
                            member, mapper, base
                        ),
                        None => format!("__{}.getOrElse({}.defaultInstance)", member, base),
                    };
                    p.add(&format!(
                        "case {} => __{} = _root_.scala.Some({})",
                        tag,
                        member,
                        to_custom.apply(
                            &format!(
                                "_root_.scalagen.LiteParser.readMessage(_input__, {})",
                                existing
                            ),
                            EnclosingType::None
                        )
                    ));
                } else {
                    p.add(&format!(
                        "case {} => __{} = _root_.scala.Some({})",
                        tag,
                        member,
                        to_custom.apply(&view.read_expr(symbols), EnclosingType::None)
                    ));
                }
            }
            FieldShape::Map => {
                let entry = symbols.scala_name(view.field.type_name());
                p.add(&format!(
                    "case {} => __{} += {}.toCustom(_root_.scalagen.LiteParser.readMessage(_input__, {}.defaultInstance))",
                    tag,
                    member,
                    self.entry_typemapper(view),
                    entry
                ));
            }
            FieldShape::Repeated => {
                let element = if view.is_message() {
                    let base = symbols.scala_name(view.field.type_name());
                    to_custom.apply(
                        &format!(
                            "_root_.scalagen.LiteParser.readMessage(_input__, {}.defaultInstance)",
                            base
                        ),
                        EnclosingType::None,
                    )
                } else {
                    to_custom.apply(&view.read_expr(symbols), EnclosingType::None)
                };
                p.add(&format!("case {} => __{} += {}", tag, member, element));
                // A packable field accepts its alternate encoding as well.
                if view.is_packable() {
                    p.block(&format!("case {} => {{", view.packed_tag()), "}", |p| {
                        p.add("val length = _input__.readRawVarint32()");
                        p.add("val oldLimit = _input__.pushLimit(length)");
                        p.block("while (_input__.getBytesUntilLimit > 0) {", "}", |p| {
                            p.add(&format!("__{} += {}", member, element));
                        });
                        p.add("_input__.popLimit(oldLimit)");
                    });
                }
            }
        }
    }

    fn push_from_fields_map(&self, p: &mut Printer, ctx: &MessageContext<'a>) {
        let symbols = self.symbols;
        p.block(
            &format!(
                "def fromFieldsMap(__fieldsMap: _root_.scala.collection.immutable.Map[_root_.scalagen.descriptors.FieldDescriptor, _root_.scala.Any]): {} = {{",
                ctx.fqn
            ),
            "}",
            |p| {
                p.add("_root_.scala.Predef.require(__fieldsMap.keys.forall(_.containingMessage eq descriptor), \"FieldDescriptor does not match message type.\")");
                p.add("val __fields = descriptor.fields");
                let mut args = Vec::new();
                for (view, decl_idx) in &ctx.fields {
                    args.push(format!(
                        "{} = {}",
                        view.scala_name(),
                        self.from_fields_value(ctx, view, *decl_idx)
                    ));
                }
                for oneof in &ctx.oneofs {
                    let kind = format!("{}.{}", ctx.fqn, oneof.type_name);
                    // The first member present in the map wins.
                    let chain = oneof
                        .fields
                        .iter()
                        .map(|(view, decl_idx)| {
                            format!(
                                "__fieldsMap.get(__fields({})).map(__f => {}.{}({}))",
                                decl_idx,
                                kind,
                                view.upper_name(),
                                self.raw_to_value(ctx, view, "__f")
                            )
                        })
                        .join(".orElse(");
                    let close = ")".repeat(oneof.fields.len() - 1);
                    args.push(format!(
                        "{} = {}{}.getOrElse({}.Empty)",
                        oneof.value_name, chain, close, kind
                    ));
                }
                if args.is_empty() {
                    p.add(&format!("{}()", ctx.fqn));
                } else {
                    p.add(&format!("{}(", ctx.fqn));
                    p.indented(|p| p.add_delimited(&args, ","));
                    p.add(")");
                }
            },
        );
    }

    /// Converts one raw `Any` out of the fields map into the field's value
    /// type.
    fn raw_to_value(&self, ctx: &MessageContext<'a>, view: &FieldView<'a>, raw: &str) -> String {
        let symbols = self.symbols;
        let typemapper = typemapper_ref(&ctx.fqn, view);
        let to_custom = view.to_custom_expr(typemapper.as_deref());
        if view.is_enum() {
            let from_value = format!(
                "{}.fromValue({}.asInstanceOf[_root_.scalagen.descriptors.EnumValueDescriptor].number)",
                symbols.scala_name(view.field.type_name()),
                raw
            );
            to_custom.apply(&from_value, EnclosingType::None)
        } else {
            to_custom.apply(
                &format!("{}.asInstanceOf[{}]", raw, view.base_single_type(symbols)),
                EnclosingType::None,
            )
        }
    }

    fn from_fields_value(
        &self,
        ctx: &MessageContext<'a>,
        view: &FieldView<'a>,
        decl_idx: usize,
    ) -> String {
        let symbols = self.symbols;
        let typemapper = typemapper_ref(&ctx.fqn, view);
        match view.shape(symbols) {
            FieldShape::Required | FieldShape::Singular => {
                let absent = if view.is_enum() {
                    format!("{}.valueDescriptor", view.base_default_expr(symbols))
                } else {
                    view.base_default_expr(symbols)
                };
                self.raw_to_value(
                    ctx,
                    view,
                    &format!("__fieldsMap.getOrElse(__fields({}), {})", decl_idx, absent),
                )
            }
            FieldShape::Optional => {
                if !view.is_enum() && view.custom_type.is_none() {
                    format!(
                        "__fieldsMap.get(__fields({})).asInstanceOf[_root_.scala.Option[{}]]",
                        decl_idx,
                        view.single_type(symbols)
                    )
                } else {
                    format!(
                        "__fieldsMap.get(__fields({})).map(__e => {})",
                        decl_idx,
                        self.raw_to_value(ctx, view, "__e")
                    )
                }
            }
            FieldShape::Repeated => {
                let element_base = if view.is_enum() {
                    "_root_.scalagen.descriptors.EnumValueDescriptor".to_string()
                } else {
                    view.base_single_type(symbols)
                };
                let lifted = self.raw_to_value_element(ctx, view);
                let seq = format!(
                    "__fieldsMap.getOrElse(__fields({}), _root_.scala.Seq.empty).asInstanceOf[_root_.scala.Seq[{}]]",
                    decl_idx, element_base
                );
                lifted.apply(&seq, EnclosingType::Collection)
            }
            FieldShape::Map => {
                format!(
                    "__fieldsMap.getOrElse(__fields({}), _root_.scala.Seq.empty).asInstanceOf[_root_.scala.Seq[{}]].iterator.map({}.toCustom).toMap",
                    decl_idx,
                    symbols.scala_name(view.field.type_name()),
                    self.entry_typemapper(view)
                )
            }
        }
    }

    /// Element lift for repeated values out of the fields map (the cast is
    /// applied to the sequence, not per element).
    fn raw_to_value_element(&self, ctx: &MessageContext<'a>, view: &FieldView<'a>) -> Expr {
        let typemapper = typemapper_ref(&ctx.fqn, view);
        let to_custom = view.to_custom_expr(typemapper.as_deref());
        if view.is_enum() {
            Expr::method("number")
                .and_then(Expr::function(format!(
                    "{}.fromValue",
                    self.symbols.scala_name(view.field.type_name())
                )))
                .and_then(to_custom)
        } else {
            to_custom
        }
    }

    fn push_companions_for_field_number(&self, p: &mut Printer, ctx: &MessageContext<'a>) {
        let symbols = self.symbols;
        let slots = sorted_slots(ctx);

        let messages: Vec<String> = slots
            .iter()
            .filter(|(view, _)| view.is_message())
            .map(|(view, _)| {
                format!(
                    "case {} => {}",
                    view.number(),
                    symbols.scala_name(view.field.type_name())
                )
            })
            .collect();
        if !messages.is_empty() {
            p.add("def messageCompanionForFieldNumber(__number: _root_.scala.Int): _root_.scalagen.GeneratedMessageCompanion[_] =");
            p.indented(|p| {
                p.block("(__number: @_root_.scala.unchecked) match {", "}", |p| {
                    p.add_all(&messages);
                });
            });
        }

        let enums: Vec<String> = slots
            .iter()
            .filter(|(view, _)| view.is_enum())
            .map(|(view, _)| {
                format!(
                    "case {} => {}",
                    view.number(),
                    symbols.scala_name(view.field.type_name())
                )
            })
            .collect();
        if !enums.is_empty() {
            p.add("def enumCompanionForFieldNumber(__number: _root_.scala.Int): _root_.scalagen.GeneratedEnumCompanion[_] =");
            p.indented(|p| {
                p.block("(__number: @_root_.scala.unchecked) match {", "}", |p| {
                    p.add_all(&enums);
                });
            });
        }
    }

    fn push_default_instance(&self, p: &mut Printer, ctx: &MessageContext<'a>) {
        let symbols = self.symbols;
        let mut args = Vec::new();
        for (view, _) in &ctx.fields {
            let typemapper = typemapper_ref(&ctx.fqn, view);
            let value = match view.shape(symbols) {
                FieldShape::Map => "_root_.scala.collection.immutable.Map.empty".to_string(),
                FieldShape::Repeated => "_root_.scala.Seq.empty".to_string(),
                FieldShape::Optional => "_root_.scala.None".to_string(),
                FieldShape::Required | FieldShape::Singular => {
                    view.default_expr(symbols, typemapper.as_deref())
                }
            };
            args.push(format!("{} = {}", view.scala_name(), value));
        }
        for oneof in &ctx.oneofs {
            args.push(format!(
                "{} = {}.{}.Empty",
                oneof.value_name, ctx.fqn, oneof.type_name
            ));
        }
        if args.is_empty() {
            p.add(&format!("lazy val defaultInstance = {}()", ctx.fqn));
        } else {
            p.add(&format!("lazy val defaultInstance = {}(", ctx.fqn));
            p.indented(|p| p.add_delimited(&args, ","));
            p.add(")");
        }
    }

    fn push_typemappers(&self, p: &mut Printer, ctx: &MessageContext<'a>) {
        let symbols = self.symbols;
        let all = ctx
            .fields
            .iter()
            .chain(ctx.oneofs.iter().flat_map(|oneof| oneof.fields.iter()));
        for (view, _) in all {
            if let Some(custom) = &view.custom_type {
                p.add(&format!(
                    "@transient private val _typemapper_{}: _root_.scalagen.TypeMapper[{}, {}] = implicitly[_root_.scalagen.TypeMapper[{}, {}]]",
                    view.member_name(),
                    view.base_single_type(symbols),
                    custom,
                    view.base_single_type(symbols),
                    custom
                ));
            }
        }
    }

    /// Map entry messages also act as the bridge between the wire's
    /// repeated-entry encoding and the in-memory `Map`.
    fn push_map_entry_typemapper(&self, p: &mut Printer, ctx: &MessageContext<'a>) {
        let symbols = self.symbols;
        let (key, _) = &ctx.fields[0];
        let (value, _) = &ctx.fields[1];
        let key_type = key.single_type(symbols);
        let value_type = value.single_type(symbols);

        let access = |view: &FieldView<'a>| {
            if view.shape(symbols) == FieldShape::Optional {
                format!("__m.get{}", view.upper_name())
            } else {
                format!("__m.{}", view.scala_name())
            }
        };
        let wrap = |view: &FieldView<'a>, value: &str| {
            if view.shape(symbols) == FieldShape::Optional {
                format!("{} = _root_.scala.Some({})", view.scala_name(), value)
            } else {
                format!("{} = {}", view.scala_name(), value)
            }
        };

        p.add(&format!(
            "implicit val _typemapper: _root_.scalagen.TypeMapper[{}, ({}, {})] =",
            ctx.fqn, key_type, value_type
        ));
        p.indented(|p| {
            p.add(&format!(
                "_root_.scalagen.TypeMapper[{}, ({}, {})](__m => ({}, {}))(__p => {}({}, {}))",
                ctx.fqn,
                key_type,
                value_type,
                access(key),
                access(value),
                ctx.fqn,
                wrap(key, "__p._1"),
                wrap(value, "__p._2")
            ));
        });
    }

    fn push_field_number_constants(&self, p: &mut Printer, ctx: &MessageContext<'a>) {
        for (view, _) in sorted_slots(ctx) {
            p.add(&format!(
                "final val {}_FIELD_NUMBER = {}",
                ident::to_shouty_snake(view.proto_name()),
                view.number()
            ));
        }
    }
}
