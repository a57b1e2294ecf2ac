//! `scalagen` compiles protobuf descriptors into Scala sources.
//!
//! The crate is the engine behind the `protoc-gen-scala` plugin: it
//! consumes a `CodeGeneratorRequest` (a set of `FileDescriptorProto`s plus
//! a parameter string) and produces a `CodeGeneratorResponse` whose files
//! define immutable case-class messages with wire-format encode/decode,
//! enums that preserve unknown values, sealed-trait oneofs, companions
//! embedding the file descriptor, and optional interop shims against the
//! Java protobuf runtime.
//!
//! The generated code references its support runtime only by fully
//! qualified name (`_root_.scalagen.*`, `_root_.com.google.protobuf.*`);
//! no runtime library is part of this crate.
//!
//! ```no_run
//! use std::io::Read;
//!
//! let mut buf = Vec::new();
//! std::io::stdin().read_to_end(&mut buf).unwrap();
//! let response = scalagen::Config::new().run_plugin(&buf).unwrap();
//! ```

mod code_generator;
mod descriptor;
mod error;
mod expr;
mod file_graph;
mod ident;
mod options;
mod printer;

pub use crate::error::GeneratorError;
pub use crate::options::{ScalaFieldOptions, ScalaFileOptions};

use std::collections::HashMap;

use log::debug;
use prost::Message;
use prost_types::compiler::{code_generator_response, CodeGeneratorRequest, CodeGeneratorResponse};
use prost_types::{FileDescriptorProto, ServiceDescriptorProto};

use crate::code_generator::CodeGenerator;
use crate::descriptor::FileUnit;
use crate::file_graph::FileGraph;
use crate::options::OptionsIndex;

/// Emits the stub source for one service. Invoked once per service when
/// the `grpc` parameter is set; the returned string becomes the content of
/// the service's own output file.
pub trait ServiceGenerator {
    fn generate(&self, service: &ServiceDescriptorProto, package: &str) -> String;
}

/// The plugin parameters, parsed from the request's comma-separated
/// parameter string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GeneratorParams {
    /// Emit interop shims against the Java protobuf runtime.
    pub java_conversions: bool,
    /// Drop the per-file package suffix when deriving target packages.
    pub flat_package: bool,
    /// Route each service through the configured [`ServiceGenerator`].
    pub grpc: bool,
    /// Generated `toString` uses the compact single-line text format.
    pub single_line_to_string: bool,
}

impl GeneratorParams {
    pub fn parse(parameter: &str) -> Result<GeneratorParams, GeneratorError> {
        let mut params = GeneratorParams::default();
        for token in parameter
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
        {
            match token {
                "java_conversions" => params.java_conversions = true,
                "flat_package" => params.flat_package = true,
                "grpc" => params.grpc = true,
                "single_line_to_string" => params.single_line_to_string = true,
                unknown => return Err(GeneratorError::InvalidParameter(unknown.to_string())),
            }
        }
        Ok(params)
    }
}

/// Code generation configuration: the seam for the external service stub
/// emitter.
#[derive(Default)]
pub struct Config {
    service_generator: Option<Box<dyn ServiceGenerator>>,
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Configures the service stub emitter used under the `grpc` flag.
    pub fn service_generator(&mut self, service_generator: Box<dyn ServiceGenerator>) -> &mut Config {
        self.service_generator = Some(service_generator);
        self
    }

    /// Runs the generator against raw `CodeGeneratorRequest` bytes.
    ///
    /// Domain failures are reported through the response's `error` field
    /// with no files attached; `Err` is only returned when the request
    /// itself cannot be decoded.
    pub fn run_plugin(&self, raw_request: &[u8]) -> Result<CodeGeneratorResponse, prost::DecodeError> {
        let request = CodeGeneratorRequest::decode(raw_request)?;
        // The generator options extension is invisible to prost-types, so
        // the raw bytes are decoded a second time through a mirror type.
        let options = OptionsIndex::from_request_bytes(raw_request)?;

        let supported_features = Some(code_generator_response::Feature::Proto3Optional as u64);
        Ok(match self.generate(&request, &options) {
            Ok(files) => CodeGeneratorResponse {
                file: files,
                supported_features,
                ..Default::default()
            },
            Err(error) => CodeGeneratorResponse {
                error: Some(error.to_string()),
                supported_features,
                ..Default::default()
            },
        })
    }

    fn generate(
        &self,
        request: &CodeGeneratorRequest,
        options: &OptionsIndex,
    ) -> Result<Vec<code_generator_response::File>, GeneratorError> {
        let params = GeneratorParams::parse(request.parameter())?;
        let graph = FileGraph::new(&request.proto_file)?;
        let symbols = descriptor::SymbolTable::build(&request.proto_file, options, params.flat_package);

        let by_name: HashMap<&str, &FileDescriptorProto> = request
            .proto_file
            .iter()
            .map(|file| (file.name(), file))
            .collect();

        // Fold the files dependencies-first so that each unit resolves the
        // file objects of its imports from the accumulator.
        let mut units: HashMap<&str, FileUnit> = HashMap::new();
        for name in graph.ordered() {
            let file = by_name[name];
            let file_options = options.file_options(name);
            let dependencies = file
                .dependency
                .iter()
                .map(|dependency| units[dependency.as_str()].object_fqn())
                .collect();
            units.insert(
                name,
                FileUnit {
                    file,
                    syntax: descriptor::file_syntax(file),
                    scala_package: descriptor::scala_package(file, &file_options, params.flat_package),
                    object_name: descriptor::file_object_name(file.name()),
                    options: file_options,
                    dependencies,
                },
            );
        }

        let mut files = Vec::new();
        for name in &request.file_to_generate {
            let unit = units
                .get(name.as_str())
                .unwrap_or_else(|| panic!("file to generate '{}' missing from the request", name));
            debug!("generating: {:?}", name);

            let mut generator = CodeGenerator::new(&params, unit, &symbols, options);
            for (path, content) in generator.generate()? {
                files.push(code_generator_response::File {
                    name: Some(path),
                    content: Some(content),
                    ..Default::default()
                });
            }

            if params.grpc {
                if let Some(service_generator) = &self.service_generator {
                    for service in &unit.file.service {
                        files.push(code_generator_response::File {
                            name: Some(service_file_path(unit, service)),
                            content: Some(service_generator.generate(service, &unit.scala_package)),
                            ..Default::default()
                        });
                    }
                }
            }
        }
        Ok(files)
    }
}

fn service_file_path(unit: &FileUnit<'_>, service: &ServiceDescriptorProto) -> String {
    let dir = unit.scala_package.replace('`', "").replace('.', "/");
    let name = format!("{}Grpc", ident::to_upper_camel(service.name()));
    if dir.is_empty() {
        format!("{}.scala", name)
    } else {
        format!("{}/{}.scala", dir, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params() {
        assert_eq!(GeneratorParams::parse("").unwrap(), GeneratorParams::default());
        let params = GeneratorParams::parse("java_conversions, grpc").unwrap();
        assert!(params.java_conversions);
        assert!(params.grpc);
        assert!(!params.flat_package);

        let params = GeneratorParams::parse("flat_package,single_line_to_string").unwrap();
        assert!(params.flat_package);
        assert!(params.single_line_to_string);
    }

    #[test]
    fn test_parse_params_rejects_unknown_flags() {
        assert_eq!(
            GeneratorParams::parse("java_conversions,bogus").unwrap_err(),
            GeneratorError::InvalidParameter("bogus".to_string())
        );
    }
}
