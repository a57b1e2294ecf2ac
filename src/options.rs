//! Generator options carried as custom descriptor options.
//!
//! Per-file and per-field generator options travel as an extension of
//! `google.protobuf.FileOptions` / `FieldOptions` (field 1020). `prost`
//! drops unknown fields when decoding, so the structured request exposed by
//! `prost-types` never sees them. The raw request bytes are therefore
//! decoded a second time through a minimal mirror of the request that keeps
//! only the path down to the extension fields, and the results are joined
//! back by file name and field path.

use std::collections::HashMap;

use prost::Message;

/// File-level generator options (`FileOptions` extension 1020).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScalaFileOptions {
    /// Overrides the proto package when deriving the Scala package.
    #[prost(string, optional, tag = "1")]
    pub package_name: ::core::option::Option<::prost::alloc::string::String>,
    /// Overrides the plugin-level flat_package flag for this file.
    #[prost(bool, optional, tag = "2")]
    pub flat_package: ::core::option::Option<bool>,
    /// Additional imports emitted in every generated file.
    #[prost(string, repeated, tag = "3")]
    pub import: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    /// Verbatim lines emitted after the package clause. Requires
    /// single_file.
    #[prost(string, repeated, tag = "4")]
    pub preamble: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    /// Emit all of the file's output into one source file.
    #[prost(bool, optional, tag = "5")]
    pub single_file: ::core::option::Option<bool>,
}

/// Field-level generator options (`FieldOptions` extension 1020).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScalaFieldOptions {
    /// Fully qualified Scala type the field is lifted to. The type's
    /// implicit `TypeMapper` provides the `toBase`/`toCustom` pair.
    #[prost(string, optional, tag = "1")]
    pub custom_type: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct FileOptionsMirror {
    #[prost(message, optional, tag = "1020")]
    scala: ::core::option::Option<ScalaFileOptions>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct FieldOptionsMirror {
    #[prost(message, optional, tag = "1020")]
    scala: ::core::option::Option<ScalaFieldOptions>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct FieldMirror {
    #[prost(string, optional, tag = "1")]
    name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "8")]
    options: ::core::option::Option<FieldOptionsMirror>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct MessageMirror {
    #[prost(string, optional, tag = "1")]
    name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, repeated, tag = "2")]
    field: ::prost::alloc::vec::Vec<FieldMirror>,
    #[prost(message, repeated, tag = "3")]
    nested_type: ::prost::alloc::vec::Vec<MessageMirror>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct FileMirror {
    #[prost(string, optional, tag = "1")]
    name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, repeated, tag = "4")]
    message_type: ::prost::alloc::vec::Vec<MessageMirror>,
    #[prost(message, optional, tag = "8")]
    options: ::core::option::Option<FileOptionsMirror>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct RequestMirror {
    #[prost(message, repeated, tag = "15")]
    proto_file: ::prost::alloc::vec::Vec<FileMirror>,
}

/// All generator options found in one request, keyed for lookup during
/// emission.
#[derive(Debug, Default)]
pub struct OptionsIndex {
    files: HashMap<String, ScalaFileOptions>,
    // (file name, "Outer.Inner.field") -> custom Scala type
    custom_types: HashMap<(String, String), String>,
}

impl OptionsIndex {
    pub fn from_request_bytes(buf: &[u8]) -> Result<OptionsIndex, prost::DecodeError> {
        let mirror = RequestMirror::decode(buf)?;
        let mut index = OptionsIndex::default();
        for file in mirror.proto_file {
            let file_name = file.name.unwrap_or_default();
            if let Some(scala) = file.options.and_then(|options| options.scala) {
                index.files.insert(file_name.clone(), scala);
            }
            for message in &file.message_type {
                index.collect_custom_types(&file_name, message.name(), message);
            }
        }
        Ok(index)
    }

    fn collect_custom_types(&mut self, file_name: &str, path: &str, message: &MessageMirror) {
        for field in &message.field {
            let custom_type = field
                .options
                .as_ref()
                .and_then(|options| options.scala.as_ref())
                .and_then(|scala| scala.custom_type.clone());
            if let Some(custom_type) = custom_type {
                let key = (file_name.to_string(), format!("{}.{}", path, field.name()));
                self.custom_types.insert(key, custom_type);
            }
        }
        for nested in &message.nested_type {
            let nested_path = format!("{}.{}", path, nested.name());
            self.collect_custom_types(file_name, &nested_path, nested);
        }
    }

    /// The file-level options for `file_name`, defaulted when the file
    /// carries none.
    pub fn file_options(&self, file_name: &str) -> ScalaFileOptions {
        self.files.get(file_name).cloned().unwrap_or_default()
    }

    /// The custom Scala type declared for a field, if any. `message_path`
    /// is the dot-joined proto message path within the file, without the
    /// package (`Outer.Inner`).
    pub fn custom_type(&self, file_name: &str, message_path: &str, field_name: &str) -> Option<&str> {
        let key = (
            file_name.to_string(),
            format!("{}.{}", message_path, field_name),
        );
        self.custom_types.get(&key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_options_round_trip() {
        let mirror = RequestMirror {
            proto_file: vec![FileMirror {
                name: Some("example.proto".to_string()),
                message_type: vec![],
                options: Some(FileOptionsMirror {
                    scala: Some(ScalaFileOptions {
                        package_name: Some("com.acme".to_string()),
                        flat_package: Some(true),
                        import: vec!["com.acme.Instances._".to_string()],
                        preamble: vec!["// header".to_string()],
                        single_file: Some(true),
                    }),
                }),
            }],
        };
        let buf = mirror.encode_to_vec();

        let index = OptionsIndex::from_request_bytes(&buf).unwrap();
        let options = index.file_options("example.proto");
        assert_eq!(options.package_name.as_deref(), Some("com.acme"));
        assert_eq!(options.flat_package, Some(true));
        assert_eq!(options.import, vec!["com.acme.Instances._"]);
        assert_eq!(options.preamble, vec!["// header"]);
        assert_eq!(options.single_file, Some(true));

        // A file without options decodes to the defaults.
        let other = index.file_options("other.proto");
        assert_eq!(other.package_name, None);
        assert!(other.preamble.is_empty());
    }

    #[test]
    fn test_custom_type_lookup_by_path() {
        let mirror = RequestMirror {
            proto_file: vec![FileMirror {
                name: Some("example.proto".to_string()),
                message_type: vec![MessageMirror {
                    name: Some("Outer".to_string()),
                    field: vec![],
                    nested_type: vec![MessageMirror {
                        name: Some("Inner".to_string()),
                        field: vec![FieldMirror {
                            name: Some("id".to_string()),
                            options: Some(FieldOptionsMirror {
                                scala: Some(ScalaFieldOptions {
                                    custom_type: Some("com.acme.WidgetId".to_string()),
                                }),
                            }),
                        }],
                        nested_type: vec![],
                    }],
                }],
                options: None,
            }],
        };
        let buf = mirror.encode_to_vec();

        let index = OptionsIndex::from_request_bytes(&buf).unwrap();
        assert_eq!(
            index.custom_type("example.proto", "Outer.Inner", "id"),
            Some("com.acme.WidgetId")
        );
        assert_eq!(index.custom_type("example.proto", "Outer", "id"), None);
    }
}
