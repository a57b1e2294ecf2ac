//! Extension emission: typed accessors decoding an extension field out of
//! an extendable message's unknown-field set.

use log::debug;
use prost_types::field_descriptor_proto::Type;
use prost_types::FieldDescriptorProto;

use super::CodeGenerator;
use crate::descriptor::FieldView;
use crate::error::GeneratorError;
use crate::expr::{EnclosingType, Expr};
use crate::printer::Printer;

impl CodeGenerator<'_> {
    /// Emits one typed accessor per extension field. The caller has already
    /// pushed the enclosing source-info path element.
    pub(super) fn push_extensions(
        &mut self,
        p: &mut Printer,
        extensions: &[FieldDescriptorProto],
    ) -> Result<(), GeneratorError> {
        let symbols = self.symbols;
        for (idx, extension) in extensions.iter().enumerate() {
            debug!("  extension: {:?}", extension.name());
            let view = FieldView::new(extension, self.syntax, false, None);
            if view.type_() == Type::Group {
                return Err(GeneratorError::GroupUnsupported {
                    field: extension.name().to_string(),
                });
            }

            self.path.push(idx as i32);
            self.push_doc(p);
            self.path.pop();

            let containee = symbols.scala_name(extension.extendee());
            let element_type = view.single_type(symbols);
            let (shape, result_type) = if view.is_repeated() {
                ("repeated", format!("_root_.scala.Seq[{}]", element_type))
            } else {
                ("optional", format!("_root_.scala.Option[{}]", element_type))
            };
            let reader = match view.wire_type() {
                0 => "Varint",
                1 => "Fixed64",
                5 => "Fixed32",
                2 => "LengthDelimited",
                other => panic!("unexpected wire type {}", other),
            };
            let lift = unknown_field_lift(&view, symbols).apply("__v", EnclosingType::None);

            p.add(&format!(
                "val {}: _root_.scalagen.GeneratedExtension[{}, {}] =",
                view.scala_name(),
                containee,
                result_type
            ));
            p.indented(|p| {
                p.add(&format!(
                    "_root_.scalagen.GeneratedExtension.{}({}, _root_.scalagen.UnknownFieldSet.Field.{})(__v => {})",
                    shape,
                    view.number(),
                    reader,
                    lift
                ));
            });
        }
        Ok(())
    }
}

/// The lift from the raw unknown-field representation of one element
/// (`Long` for varint, `Int` for fixed32, `Long` for fixed64, `ByteString`
/// for length-delimited) to the extension's element type.
fn unknown_field_lift(view: &FieldView<'_>, symbols: &crate::descriptor::SymbolTable) -> Expr {
    match view.type_() {
        Type::Int32 | Type::Uint32 => Expr::method("toInt"),
        Type::Sint32 => Expr::method("toInt")
            .and_then(Expr::function("_root_.scalagen.Encoding.zigZagDecode32")),
        Type::Sint64 => Expr::function("_root_.scalagen.Encoding.zigZagDecode64"),
        Type::Int64 | Type::Uint64 | Type::Fixed64 | Type::Sfixed64 | Type::Fixed32
        | Type::Sfixed32 | Type::Bytes => Expr::Identity,
        Type::Float => Expr::function("_root_.java.lang.Float.intBitsToFloat"),
        Type::Double => Expr::function("_root_.java.lang.Double.longBitsToDouble"),
        Type::Bool => Expr::operator("!= 0"),
        Type::String => Expr::method("toStringUtf8"),
        Type::Enum => Expr::method("toInt").and_then(Expr::function(format!(
            "{}.fromValue",
            symbols.scala_name(view.field.type_name())
        ))),
        Type::Message => Expr::method("newCodedInput").and_then(Expr::function(format!(
            "{}.parseFrom",
            symbols.scala_name(view.field.type_name())
        ))),
        Type::Group => unreachable!("group extensions are rejected before emission"),
    }
}
