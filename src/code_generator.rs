//! Per-file emission.
//!
//! `CodeGenerator` walks one input file and assembles its output files:
//! either one source file per top-level message/enum plus the file's
//! companion object, or everything in a single source file. The message,
//! enum, oneof, and extension emitters live in the submodules and share the
//! walking state defined here.

use base64::prelude::{Engine, BASE64_STANDARD};
use log::debug;
use prost::Message;
use prost_types::SourceCodeInfo;

use crate::descriptor::{FileUnit, Syntax, SymbolTable};
use crate::error::GeneratorError;
use crate::ident::to_upper_camel;
use crate::options::OptionsIndex;
use crate::printer::Printer;
use crate::GeneratorParams;

mod enums;
mod extensions;
mod locations;
mod messages;
mod oneofs;

use locations::*;

/// Chunk length for the embedded base64 descriptor, kept safely below the
/// JVM's string-literal limit.
const DESCRIPTOR_CHUNK_LEN: usize = 55_000;

pub struct CodeGenerator<'a> {
    params: &'a GeneratorParams,
    unit: &'a FileUnit<'a>,
    symbols: &'a SymbolTable,
    options: &'a OptionsIndex,
    syntax: Syntax,
    /// Proto names of the enclosing messages, innermost last.
    type_path: Vec<String>,
    /// Source-info path of the element currently being emitted.
    path: Vec<i32>,
    source_info: Option<SourceCodeInfo>,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(
        params: &'a GeneratorParams,
        unit: &'a FileUnit<'a>,
        symbols: &'a SymbolTable,
        options: &'a OptionsIndex,
    ) -> CodeGenerator<'a> {
        let source_info = unit.file.source_code_info.clone().map(|mut s| {
            s.location.retain(|location| {
                let len = location.path.len();
                len > 0 && len % 2 == 0
            });
            s.location.sort_by(|a, b| a.path.cmp(&b.path));
            s
        });

        CodeGenerator {
            params,
            unit,
            symbols,
            options,
            syntax: unit.syntax,
            type_path: Vec::new(),
            path: Vec::new(),
            source_info,
        }
    }

    /// Emits every output file for this unit as `(path, content)` pairs.
    pub fn generate(&mut self) -> Result<Vec<(String, String)>, GeneratorError> {
        if !self.unit.options.preamble.is_empty() && !self.unit.single_file() {
            return Err(GeneratorError::PreambleRequiresSingleFile {
                file: self.unit.file.name().to_string(),
            });
        }

        debug!(
            "file: {:?}, package: {:?}",
            self.unit.file.name(),
            self.unit.scala_package
        );

        if self.unit.single_file() {
            self.generate_single_file()
        } else {
            self.generate_multi_file()
        }
    }

    fn generate_single_file(&mut self) -> Result<Vec<(String, String)>, GeneratorError> {
        let unit = self.unit;
        let mut p = Printer::new();
        self.push_header(&mut p);

        self.path.push(FileDescriptorProtoLocations::MESSAGE_TYPE);
        for (idx, message) in unit.file.message_type.iter().enumerate() {
            self.path.push(idx as i32);
            self.push_message(&mut p, message, idx)?;
            self.path.pop();
        }
        self.path.pop();

        self.path.push(FileDescriptorProtoLocations::ENUM_TYPE);
        for (idx, desc) in unit.file.enum_type.iter().enumerate() {
            self.path.push(idx as i32);
            self.push_enum(&mut p, desc, idx);
            self.path.pop();
        }
        self.path.pop();

        self.push_file_object(&mut p)?;

        Ok(vec![(
            self.output_path(&unit.object_name),
            p.into_string(),
        )])
    }

    fn generate_multi_file(&mut self) -> Result<Vec<(String, String)>, GeneratorError> {
        let unit = self.unit;
        let mut files = Vec::new();

        self.path.push(FileDescriptorProtoLocations::MESSAGE_TYPE);
        for (idx, message) in unit.file.message_type.iter().enumerate() {
            self.path.push(idx as i32);
            let mut p = Printer::new();
            self.push_header(&mut p);
            self.push_message(&mut p, message, idx)?;
            files.push((
                self.output_path(&to_upper_camel(message.name())),
                p.into_string(),
            ));
            self.path.pop();
        }
        self.path.pop();

        self.path.push(FileDescriptorProtoLocations::ENUM_TYPE);
        for (idx, desc) in unit.file.enum_type.iter().enumerate() {
            self.path.push(idx as i32);
            let mut p = Printer::new();
            self.push_header(&mut p);
            self.push_enum(&mut p, desc, idx);
            files.push((self.output_path(&to_upper_camel(desc.name())), p.into_string()));
            self.path.pop();
        }
        self.path.pop();

        let mut p = Printer::new();
        self.push_header(&mut p);
        self.push_file_object(&mut p)?;
        let object_name = self.unit.object_name.clone();
        files.push((self.output_path(&object_name), p.into_string()));

        Ok(files)
    }

    /// The output path of one generated source file, under the package
    /// directory.
    fn output_path(&self, simple_name: &str) -> String {
        let package_dir = self.unit.scala_package.replace('`', "").replace('.', "/");
        if package_dir.is_empty() {
            format!("{}.scala", simple_name)
        } else {
            format!("{}/{}.scala", package_dir, simple_name)
        }
    }

    fn push_header(&self, p: &mut Printer) {
        p.add("// Generated by protoc-gen-scala. Do not edit!");
        p.add(&format!("// source: {}", self.unit.file.name()));
        p.add("");
        p.when(!self.unit.scala_package.is_empty(), |p| {
            p.add(&format!("package {}", self.unit.scala_package));
            p.add("");
        });
        p.when(!self.unit.options.preamble.is_empty(), |p| {
            p.add_all(&self.unit.options.preamble);
            p.add("");
        });
        p.when(!self.unit.options.import.is_empty(), |p| {
            for import in &self.unit.options.import {
                p.add(&format!("import {}", import));
            }
            p.add("");
        });
    }

    fn push_file_object(&mut self, p: &mut Printer) -> Result<(), GeneratorError> {
        let object_name = self.unit.object_name.clone();
        p.add(&format!(
            "object {} extends _root_.scalagen.GeneratedFileObject {{",
            object_name
        ));
        p.indented(|p| {
            self.push_file_dependencies(p);
            self.push_messages_companions(p);
            self.push_descriptor_bytes(p);
            p.add("lazy val descriptor: _root_.scalagen.descriptors.FileDescriptor =");
            p.indented(|p| {
                p.add("_root_.scalagen.descriptors.FileDescriptor.buildFrom(ProtoBytes, dependencies.map(_.descriptor))");
            });
            p.when(self.params.java_conversions, |p| {
                self.push_java_descriptor(p);
            });
        });

        // File-level extensions live inside the file object.
        let extensions = &self.unit.file.extension;
        if !extensions.is_empty() {
            self.path.push(FileDescriptorProtoLocations::EXTENSION);
            let mut result = Ok(());
            p.indented(|p| {
                result = self.push_extensions(p, extensions);
            });
            self.path.pop();
            result?;
        }

        p.add("}");
        Ok(())
    }

    fn push_file_dependencies(&self, p: &mut Printer) {
        if self.unit.dependencies.is_empty() {
            p.add("lazy val dependencies: _root_.scala.Seq[_root_.scalagen.GeneratedFileObject] = _root_.scala.Seq.empty");
        } else {
            p.block(
                "lazy val dependencies: _root_.scala.Seq[_root_.scalagen.GeneratedFileObject] = _root_.scala.Seq(",
                ")",
                |p| p.add_delimited(&self.unit.dependencies, ","),
            );
        }
    }

    fn push_messages_companions(&self, p: &mut Printer) {
        let companions: Vec<String> = self
            .unit
            .file
            .message_type
            .iter()
            .map(|message| self.scala_scope_join(&to_upper_camel(message.name())))
            .collect();
        if companions.is_empty() {
            p.add("lazy val messagesCompanions: _root_.scala.Seq[_root_.scalagen.GeneratedMessageCompanion[_ <: _root_.scalagen.GeneratedMessage]] = _root_.scala.Seq.empty");
        } else {
            p.block(
                "lazy val messagesCompanions: _root_.scala.Seq[_root_.scalagen.GeneratedMessageCompanion[_ <: _root_.scalagen.GeneratedMessage]] = _root_.scala.Seq(",
                ")",
                |p| p.add_delimited(&companions, ","),
            );
        }
    }

    /// Embeds the raw file descriptor, source info stripped, as base64
    /// chunks that are reassembled and decoded at class-load time.
    fn push_descriptor_bytes(&self, p: &mut Printer) {
        let mut stripped = self.unit.file.clone();
        stripped.source_code_info = None;
        let encoded = BASE64_STANDARD.encode(stripped.encode_to_vec());

        let chunks: Vec<String> = encoded
            .as_bytes()
            .chunks(DESCRIPTOR_CHUNK_LEN)
            .map(|chunk| {
                format!(
                    "\"\"\"{}\"\"\"",
                    std::str::from_utf8(chunk).expect("base64 output is ASCII")
                )
            })
            .collect();

        p.add("private lazy val ProtoBytes: _root_.scala.Array[Byte] =");
        p.indented(|p| {
            p.block("_root_.scalagen.Encoding.fromBase64(_root_.scala.Seq(", ").mkString)", |p| {
                p.add_delimited(&chunks, ",");
            });
        });
    }

    fn push_java_descriptor(&self, p: &mut Printer) {
        p.add("lazy val javaDescriptor: _root_.com.google.protobuf.Descriptors.FileDescriptor =");
        p.indented(|p| {
            p.block(
                "_root_.com.google.protobuf.Descriptors.FileDescriptor.buildFrom(",
                ")",
                |p| {
                    p.add("_root_.com.google.protobuf.DescriptorProtos.FileDescriptorProto.parseFrom(ProtoBytes),");
                    if self.unit.dependencies.is_empty() {
                        p.add("_root_.scala.Array[_root_.com.google.protobuf.Descriptors.FileDescriptor]()");
                    } else {
                        let deps: Vec<String> = self
                            .unit
                            .dependencies
                            .iter()
                            .map(|dep| format!("{}.javaDescriptor", dep))
                            .collect();
                        p.block("_root_.scala.Array(", ")", |p| p.add_delimited(&deps, ","));
                    }
                },
            );
        });
    }

    /// The Scala scope code for the current position is emitted into: the
    /// file's package plus the enclosing companion objects.
    fn scala_scope(&self) -> String {
        let mut scope = self.unit.scala_package.clone();
        for name in &self.type_path {
            scope = self.join_scope(&scope, &to_upper_camel(name));
        }
        scope
    }

    fn scala_scope_join(&self, name: &str) -> String {
        self.join_scope(&self.scala_scope(), name)
    }

    fn join_scope(&self, scope: &str, name: &str) -> String {
        if scope.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", scope, name)
        }
    }

    /// The dot-joined proto message path within the file (no package), used
    /// to look up per-field generator options.
    fn message_path(&self, message_name: &str) -> String {
        let mut parts = self.type_path.clone();
        parts.push(message_name.to_string());
        parts.join(".")
    }

    /// The fully qualified proto name (`.pkg.Outer.Name`) of a type declared
    /// at the current position.
    fn proto_fqn(&self, name: &str) -> String {
        let mut fqn = String::new();
        if !self.unit.file.package().is_empty() {
            fqn.push('.');
            fqn.push_str(self.unit.file.package());
        }
        for part in &self.type_path {
            fqn.push('.');
            fqn.push_str(part);
        }
        fqn.push('.');
        fqn.push_str(name);
        fqn
    }

    /// The expression the current scope's descriptor is reachable through:
    /// the file object for top-level types, the enclosing companion for
    /// nested ones.
    fn descriptor_ref(&self, accessor_top: &str, accessor_nested: &str, idx: usize) -> String {
        if self.type_path.is_empty() {
            format!(
                "{}.descriptor.{}({})",
                self.unit.object_fqn(),
                accessor_top,
                idx
            )
        } else {
            format!("{}.descriptor.{}({})", self.scala_scope(), accessor_nested, idx)
        }
    }

    /// Scaladoc lines for the element at the current source-info path.
    fn leading_comments(&self) -> Vec<String> {
        let Some(info) = &self.source_info else {
            return Vec::new();
        };
        let Ok(idx) = info
            .location
            .binary_search_by_key(&&self.path[..], |location| &location.path[..])
        else {
            return Vec::new();
        };
        let comments = info.location[idx].leading_comments();
        if comments.trim().is_empty() {
            return Vec::new();
        }

        let mut lines = vec!["/**".to_string()];
        for line in comments.trim_end().lines() {
            let line = line.replace("*/", "*\\/");
            if line.trim().is_empty() {
                lines.push(" *".to_string());
            } else if line.starts_with(' ') {
                lines.push(format!(" *{}", line));
            } else {
                lines.push(format!(" * {}", line));
            }
        }
        lines.push(" */".to_string());
        lines
    }

    fn push_doc(&self, p: &mut Printer) {
        p.add_all(self.leading_comments());
    }
}
