//! Enum emission: a sealed sum type preserving unknown values, plus its
//! companion carrying the value table and the total decode function.

use std::collections::HashSet;

use log::debug;
use prost_types::EnumDescriptorProto;

use super::{CodeGenerator, EnumDescriptorProtoLocations};
use crate::ident::to_upper_camel;
use crate::printer::Printer;

struct EnumValueMapping<'a> {
    path_idx: usize,
    proto_name: &'a str,
    number: i32,
    variant_name: String,
    /// False for aliases: only the first occurrence of each number takes
    /// part in the decode switch.
    first_occurrence: bool,
}

fn build_value_mappings(desc: &EnumDescriptorProto) -> Vec<EnumValueMapping<'_>> {
    let mut numbers = HashSet::new();
    desc.value
        .iter()
        .enumerate()
        .map(|(idx, value)| EnumValueMapping {
            path_idx: idx,
            proto_name: value.name(),
            number: value.number(),
            variant_name: to_upper_camel(value.name()),
            first_occurrence: numbers.insert(value.number()),
        })
        .collect()
}

impl CodeGenerator<'_> {
    pub(super) fn push_enum(&mut self, p: &mut Printer, desc: &EnumDescriptorProto, idx: usize) {
        debug!("  enum: {:?}", desc.name());

        let enum_name = to_upper_camel(desc.name());
        let fqn = self.scala_scope_join(&enum_name);
        let mappings = build_value_mappings(desc);

        self.push_doc(p);
        p.add(&format!(
            "sealed abstract class {}(val value: _root_.scala.Int) extends _root_.scalagen.GeneratedEnum {{",
            enum_name
        ));
        p.indented(|p| {
            p.add(&format!("type EnumType = {}", fqn));
            p.add("def index: _root_.scala.Int");
            p.add("def name: _root_.scala.Predef.String");
            for mapping in &mappings {
                p.add(&format!(
                    "def is{}: _root_.scala.Boolean = false",
                    mapping.variant_name
                ));
            }
            p.add("def isUnrecognized: _root_.scala.Boolean = false");
            p.add(&format!(
                "def companion: _root_.scalagen.GeneratedEnumCompanion[{}] = {}",
                fqn, fqn
            ));
            p.add("final def valueDescriptor: _root_.scalagen.descriptors.EnumValueDescriptor = companion.descriptor.findValueByNumberCreatingIfUnknown(value)");
        });
        p.add("}");
        p.add("");

        p.add(&format!(
            "object {} extends _root_.scalagen.GeneratedEnumCompanion[{}] {{",
            enum_name, fqn
        ));
        p.indented(|p| {
            p.add(&format!(
                "implicit def enumCompanion: _root_.scalagen.GeneratedEnumCompanion[{}] = this",
                fqn
            ));
            p.add("");

            self.path.push(EnumDescriptorProtoLocations::VALUE);
            for mapping in &mappings {
                self.path.push(mapping.path_idx as i32);
                self.push_doc(p);
                self.path.pop();

                p.add("@SerialVersionUID(0L)");
                p.add(&format!(
                    "case object {} extends {}({}) {{",
                    mapping.variant_name, fqn, mapping.number
                ));
                p.indented(|p| {
                    p.add(&format!("val index = {}", mapping.path_idx));
                    p.add(&format!("val name = \"{}\"", mapping.proto_name));
                    p.add(&format!(
                        "override def is{}: _root_.scala.Boolean = true",
                        mapping.variant_name
                    ));
                });
                p.add("}");
                p.add("");
            }
            self.path.pop();

            p.add("@SerialVersionUID(0L)");
            p.add(&format!(
                "final case class Unrecognized(unrecognizedValue: _root_.scala.Int) extends {}(unrecognizedValue) {{",
                fqn
            ));
            p.indented(|p| {
                p.add("val index = -1");
                p.add("val name = \"UNRECOGNIZED\"");
                p.add("override def isUnrecognized: _root_.scala.Boolean = true");
            });
            p.add("}");
            p.add("");

            let values: Vec<&str> = mappings
                .iter()
                .map(|mapping| mapping.variant_name.as_str())
                .collect();
            p.add(&format!(
                "lazy val values: _root_.scala.Seq[{}] = _root_.scala.Seq({})",
                fqn,
                values.join(", ")
            ));

            p.block(
                &format!("def fromValue(__value: _root_.scala.Int): {} = __value match {{", fqn),
                "}",
                |p| {
                    for mapping in mappings.iter().filter(|mapping| mapping.first_occurrence) {
                        p.add(&format!("case {} => {}", mapping.number, mapping.variant_name));
                    }
                    p.add("case __other => Unrecognized(__other)");
                },
            );

            let descriptor_ref = self.descriptor_ref("enums", "nestedEnums", idx);
            p.add(&format!(
                "def descriptor: _root_.scalagen.descriptors.EnumDescriptor = {}",
                descriptor_ref
            ));

            p.when(self.params.java_conversions, |p| {
                let java_name = self.enum_java_name(desc);
                p.block(
                    &format!("def toJavaValue(__e: {}): {} = {{", fqn, java_name),
                    "}",
                    |p| {
                        p.add("_root_.scala.Predef.require(!__e.isUnrecognized, \"Unrecognized enum value cannot be converted\")");
                        p.add(&format!("{}.forNumber(__e.value)", java_name));
                    },
                );
                p.add(&format!(
                    "def fromJavaValue(__j: {}): {} = fromValue(__j.getNumber)",
                    java_name, fqn
                ));
            });
        });
        p.add("}");
        p.add("");
    }

    fn enum_java_name(&self, desc: &EnumDescriptorProto) -> String {
        self.symbols.get(&self.proto_fqn(desc.name())).java_name.clone()
    }
}
