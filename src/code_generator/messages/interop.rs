//! Java interop shims, emitted under the `java_conversions` flag.
//!
//! `toJavaProto` drives the Java builder API field by field; proto3 enum
//! fields go through the numeric `setXValue`/`getXValue` accessors so that
//! unknown values survive the round trip, proto2 fields go through the
//! typed enum.

use itertools::Itertools;
use prost_types::field_descriptor_proto::Type;

use super::{typemapper_ref, MessageContext};
use crate::code_generator::oneofs::OneofContext;
use crate::code_generator::CodeGenerator;
use crate::descriptor::{FieldShape, FieldView, Syntax};
use crate::expr::{EnclosingType, Expr};
use crate::ident::to_upper_camel;
use crate::printer::Printer;

impl<'a> CodeGenerator<'a> {
    pub(super) fn push_java_conversions(&self, p: &mut Printer, ctx: &MessageContext<'a>) {
        let java = self
            .symbols
            .get(&self.proto_fqn(ctx.message.name()))
            .java_name
            .clone();

        p.block(
            &format!("def toJavaProto(scalaSource: {}): {} = {{", ctx.fqn, java),
            "}",
            |p| {
                p.add(&format!("val javaOut = {}.newBuilder", java));
                for (view, _) in &ctx.fields {
                    self.push_to_java_field(p, ctx, view, None);
                }
                for oneof in &ctx.oneofs {
                    for (view, _) in &oneof.fields {
                        self.push_to_java_field(p, ctx, view, Some(oneof));
                    }
                }
                p.add("javaOut.build");
            },
        );

        p.add(&format!(
            "def fromJavaProto(javaSource: {}): {} = {}(",
            java, ctx.fqn, ctx.fqn
        ));
        p.indented(|p| {
            let mut args = Vec::new();
            for (view, _) in &ctx.fields {
                args.push(format!(
                    "{} = {}",
                    view.scala_name(),
                    self.from_java_value(ctx, view)
                ));
            }
            for oneof in &ctx.oneofs {
                args.push(self.from_java_oneof(ctx, oneof));
            }
            p.add_delimited(&args, ",");
        });
        p.add(")");
    }

    /// Scala element value -> java element value, together with the
    /// accessor suffix for proto3 enums.
    fn to_java_lift(&self, ctx: &MessageContext<'a>, view: &FieldView<'a>) -> (&'static str, Expr) {
        let to_base = view.to_base_expr(typemapper_ref(&ctx.fqn, view).as_deref());
        match view.type_() {
            Type::Enum if self.syntax == Syntax::Proto3 => {
                ("Value", to_base.and_then(Expr::method("value")))
            }
            Type::Enum => (
                "",
                to_base.and_then(Expr::function(format!(
                    "{}.toJavaValue",
                    self.symbols.scala_name(view.field.type_name())
                ))),
            ),
            Type::Message => (
                "",
                to_base.and_then(Expr::function(format!(
                    "{}.toJavaProto",
                    self.symbols.scala_name(view.field.type_name())
                ))),
            ),
            _ => ("", to_base),
        }
    }

    fn push_to_java_field(
        &self,
        p: &mut Printer,
        ctx: &MessageContext<'a>,
        view: &FieldView<'a>,
        oneof: Option<&OneofContext<'a>>,
    ) {
        let symbols = self.symbols;
        let upper = to_upper_camel(view.proto_name());
        let (suffix, lift) = self.to_java_lift(ctx, view);
        let acc = match oneof {
            Some(oneof) => format!(
                "scalaSource.{}.{}",
                oneof.value_name,
                view.scala_name()
            ),
            None => format!("scalaSource.{}", view.scala_name()),
        };

        if oneof.is_some() {
            p.add(&format!(
                "{}.foreach(__v => javaOut.set{}{}({}))",
                acc,
                upper,
                suffix,
                lift.apply("__v", EnclosingType::None)
            ));
            return;
        }

        match view.shape(symbols) {
            FieldShape::Required | FieldShape::Singular => {
                p.add(&format!(
                    "javaOut.set{}{}({})",
                    upper,
                    suffix,
                    lift.apply(&acc, EnclosingType::None)
                ));
            }
            FieldShape::Optional => {
                p.add(&format!(
                    "{}.foreach(__v => javaOut.set{}{}({}))",
                    acc,
                    upper,
                    suffix,
                    lift.apply("__v", EnclosingType::None)
                ));
            }
            FieldShape::Repeated => {
                p.add(&format!(
                    "{}.foreach(__v => javaOut.add{}{}({}))",
                    acc,
                    upper,
                    suffix,
                    lift.apply("__v", EnclosingType::None)
                ));
            }
            FieldShape::Map => {
                let (_, value) = view.map_key_value(symbols).expect("map entry fields");
                let (value_suffix, value_lift) = self.to_java_lift(ctx, &value);
                p.add(&format!(
                    "{}.foreach {{ __kv => javaOut.put{}{}(__kv._1, {}) }}",
                    acc,
                    upper,
                    value_suffix,
                    value_lift.apply("__kv._2", EnclosingType::None)
                ));
            }
        }
    }

    /// Lift applied to one boxed java element when converting collections.
    fn from_java_element(&self, ctx: &MessageContext<'a>, view: &FieldView<'a>) -> Expr {
        let to_custom = view.to_custom_expr(typemapper_ref(&ctx.fqn, view).as_deref());
        let lift = match view.type_() {
            Type::Enum if self.syntax == Syntax::Proto3 => Expr::method("intValue").and_then(
                Expr::function(format!(
                    "{}.fromValue",
                    self.symbols.scala_name(view.field.type_name())
                )),
            ),
            Type::Enum => Expr::function(format!(
                "{}.fromJavaValue",
                self.symbols.scala_name(view.field.type_name())
            )),
            Type::Message => Expr::function(format!(
                "{}.fromJavaProto",
                self.symbols.scala_name(view.field.type_name())
            )),
            Type::Int32 | Type::Uint32 | Type::Sint32 | Type::Fixed32 | Type::Sfixed32 => {
                Expr::method("intValue")
            }
            Type::Int64 | Type::Uint64 | Type::Sint64 | Type::Fixed64 | Type::Sfixed64 => {
                Expr::method("longValue")
            }
            Type::Float => Expr::method("floatValue"),
            Type::Double => Expr::method("doubleValue"),
            Type::Bool => Expr::method("booleanValue"),
            _ => Expr::Identity,
        };
        lift.and_then(to_custom)
    }

    /// The scala value of one singular java getter result.
    fn from_java_single(
        &self,
        ctx: &MessageContext<'a>,
        view: &FieldView<'a>,
        getter: &str,
    ) -> String {
        let to_custom = view.to_custom_expr(typemapper_ref(&ctx.fqn, view).as_deref());
        let value = match view.type_() {
            Type::Enum if self.syntax == Syntax::Proto3 => format!(
                "{}.fromValue({}Value)",
                self.symbols.scala_name(view.field.type_name()),
                getter
            ),
            Type::Enum => format!(
                "{}.fromJavaValue({})",
                self.symbols.scala_name(view.field.type_name()),
                getter
            ),
            Type::Message => format!(
                "{}.fromJavaProto({})",
                self.symbols.scala_name(view.field.type_name()),
                getter
            ),
            _ => getter.to_string(),
        };
        to_custom.apply(&value, EnclosingType::None)
    }

    fn from_java_value(&self, ctx: &MessageContext<'a>, view: &FieldView<'a>) -> String {
        let symbols = self.symbols;
        let upper = to_upper_camel(view.proto_name());
        match view.shape(symbols) {
            FieldShape::Required | FieldShape::Singular => self.from_java_single(
                ctx,
                view,
                &format!("javaSource.get{}", upper),
            ),
            FieldShape::Optional => format!(
                "if (javaSource.has{}) _root_.scala.Some({}) else _root_.scala.None",
                upper,
                self.from_java_single(ctx, view, &format!("javaSource.get{}", upper))
            ),
            FieldShape::Repeated => {
                let list = if view.is_enum() && self.syntax == Syntax::Proto3 {
                    format!("javaSource.get{}ValueList", upper)
                } else {
                    format!("javaSource.get{}List", upper)
                };
                let element = self.from_java_element(ctx, view);
                format!(
                    "_root_.scala.jdk.CollectionConverters.ListHasAsScala({}).asScala.iterator.map(__v => {}).toSeq",
                    list,
                    element.apply("__v", EnclosingType::None)
                )
            }
            FieldShape::Map => {
                let (key, value) = view.map_key_value(symbols).expect("map entry fields");
                let map = if value.is_enum() && self.syntax == Syntax::Proto3 {
                    format!("javaSource.get{}ValueMap", upper)
                } else {
                    format!("javaSource.get{}Map", upper)
                };
                let key_lift = self.from_java_element(ctx, &key);
                let value_lift = self.from_java_element(ctx, &value);
                format!(
                    "_root_.scala.jdk.CollectionConverters.MapHasAsScala({}).asScala.iterator.map(__kv => ({}, {})).toMap",
                    map,
                    key_lift.apply("__kv._1", EnclosingType::None),
                    value_lift.apply("__kv._2", EnclosingType::None)
                )
            }
        }
    }

    fn from_java_oneof(&self, ctx: &MessageContext<'a>, oneof: &OneofContext<'a>) -> String {
        let kind = format!("{}.{}", ctx.fqn, oneof.type_name);
        let arms = oneof
            .fields
            .iter()
            .map(|(view, _)| {
                format!(
                    "case {} => {}.{}({})",
                    view.number(),
                    kind,
                    view.upper_name(),
                    self.from_java_single(
                        ctx,
                        view,
                        &format!("javaSource.get{}", to_upper_camel(view.proto_name()))
                    )
                )
            })
            .join("; ");
        format!(
            "{} = javaSource.get{}Case.getNumber match {{ {}; case _ => {}.Empty }}",
            oneof.value_name, oneof.type_name, arms, kind
        )
    }
}
