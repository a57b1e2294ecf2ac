//! Oneof emission: a sealed sum type with an `Empty` variant and one case
//! class per member field.

use log::debug;
use prost_types::OneofDescriptorProto;

use super::messages::MessageContext;
use super::CodeGenerator;
use crate::descriptor::FieldView;
use crate::error::GeneratorError;
use crate::ident::to_upper_camel;
use crate::printer::Printer;

pub(super) struct OneofContext<'a> {
    pub decl: &'a OneofDescriptorProto,
    /// Index into the message's oneof declarations.
    pub decl_idx: i32,
    /// The derived sum type simple name.
    pub type_name: String,
    /// The constructor parameter / accessor name.
    pub value_name: String,
    pub fields: Vec<(FieldView<'a>, usize)>,
}

impl<'a> OneofContext<'a> {
    pub fn new(
        decl: &'a OneofDescriptorProto,
        decl_idx: i32,
        fields: Vec<(FieldView<'a>, usize)>,
    ) -> OneofContext<'a> {
        OneofContext {
            decl,
            decl_idx,
            type_name: to_upper_camel(decl.name()),
            value_name: crate::ident::field_name(decl.name()),
            fields,
        }
    }
}

impl CodeGenerator<'_> {
    /// The derived sum type name must not collide with a sibling nested
    /// message or enum, which would end up in the same companion scope.
    pub(super) fn check_oneof_conflicts(&self, ctx: &MessageContext<'_>) -> Result<(), GeneratorError> {
        for oneof in &ctx.oneofs {
            let conflict = ctx
                .message
                .nested_type
                .iter()
                .map(|nested| nested.name())
                .chain(ctx.message.enum_type.iter().map(|nested| nested.name()))
                .find(|name| to_upper_camel(name) == oneof.type_name);
            if let Some(conflict) = conflict {
                return Err(GeneratorError::OneofNameConflict {
                    message: ctx.message.name().to_string(),
                    oneof: oneof.decl.name().to_string(),
                    conflict: conflict.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Emits the sealed trait and its variants inside the enclosing
    /// companion; `scope` is the Scala FQN of that companion.
    pub(super) fn push_oneof(&mut self, p: &mut Printer, scope: &str, oneof: &OneofContext<'_>) {
        debug!("    oneof: {:?}", oneof.decl.name());
        let symbols = self.symbols;
        let fqn = format!("{}.{}", scope, oneof.type_name);

        p.add(&format!(
            "sealed trait {} extends _root_.scalagen.GeneratedOneof {{",
            oneof.type_name
        ));
        p.indented(|p| {
            p.add("def isEmpty: _root_.scala.Boolean = false");
            p.add("def isDefined: _root_.scala.Boolean = true");
            p.add("def number: _root_.scala.Int");
            for (view, _) in &oneof.fields {
                p.add(&format!(
                    "def is{}: _root_.scala.Boolean = false",
                    view.upper_name()
                ));
                p.add(&format!(
                    "def {}: _root_.scala.Option[{}] = _root_.scala.None",
                    view.scala_name(),
                    view.single_type(symbols)
                ));
            }
        });
        p.add("}");

        p.add(&format!("object {} {{", oneof.type_name));
        p.indented(|p| {
            p.add("@SerialVersionUID(0L)");
            p.block(&format!("case object Empty extends {} {{", fqn), "}", |p| {
                p.add("override def isEmpty: _root_.scala.Boolean = true");
                p.add("override def isDefined: _root_.scala.Boolean = false");
                p.add("override def number: _root_.scala.Int = 0");
            });
            for (view, _) in &oneof.fields {
                let variant = view.upper_name();
                let value_type = view.single_type(symbols);
                p.add("@SerialVersionUID(0L)");
                p.block(
                    &format!(
                        "final case class {}(value: {}) extends {} {{",
                        variant, value_type, fqn
                    ),
                    "}",
                    |p| {
                        p.add(&format!(
                            "override def is{}: _root_.scala.Boolean = true",
                            variant
                        ));
                        p.add(&format!(
                            "override def {}: _root_.scala.Option[{}] = _root_.scala.Some(value)",
                            view.scala_name(),
                            value_type
                        ));
                        p.add(&format!(
                            "override def number: _root_.scala.Int = {}",
                            view.number()
                        ));
                    },
                );
            }
        });
        p.add("}");
    }
}
