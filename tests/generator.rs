//! End-to-end tests: hand-built descriptor sets through `run_plugin`,
//! asserting on the emitted Scala.

use prost::Message;
use prost_types::compiler::CodeGeneratorResponse;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FieldOptions, FileDescriptorProto, MessageOptions, OneofDescriptorProto,
};
use scalagen::{Config, ScalaFieldOptions, ScalaFileOptions};

/// `CodeGeneratorRequest` assembled from pre-encoded file bytes, so that
/// tests can splice in the generator options extension that
/// `prost_types::FileOptions` cannot carry.
#[derive(Clone, PartialEq, ::prost::Message)]
struct RawRequest {
    #[prost(string, repeated, tag = "1")]
    file_to_generate: Vec<String>,
    #[prost(string, optional, tag = "2")]
    parameter: Option<String>,
    #[prost(bytes = "vec", repeated, tag = "15")]
    proto_file: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct FileOptionsExt {
    #[prost(message, optional, tag = "1020")]
    scala: Option<ScalaFileOptions>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct FileDescriptorExt {
    #[prost(message, optional, tag = "8")]
    options: Option<FileOptionsExt>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct FieldOptionsExt {
    #[prost(message, optional, tag = "1020")]
    scala: Option<ScalaFieldOptions>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct FieldDescriptorExt {
    #[prost(message, optional, tag = "8")]
    options: Option<FieldOptionsExt>,
}

fn field(name: &str, number: i32, type_: Type, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        r#type: Some(type_ as i32),
        label: Some(label as i32),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, label: Label, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, Type::Message, label)
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn file(
    name: &str,
    package: &str,
    syntax: &str,
    messages: Vec<DescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        syntax: Some(syntax.to_string()),
        message_type: messages,
        ..Default::default()
    }
}

fn request_bytes(
    files: Vec<(FileDescriptorProto, Option<ScalaFileOptions>)>,
    to_generate: &[&str],
    parameter: &str,
) -> Vec<u8> {
    let proto_file = files
        .into_iter()
        .map(|(descriptor, options)| {
            let mut buf = descriptor.encode_to_vec();
            if let Some(scala) = options {
                let ext = FileDescriptorExt {
                    options: Some(FileOptionsExt { scala: Some(scala) }),
                };
                buf.extend(ext.encode_to_vec());
            }
            buf
        })
        .collect();
    RawRequest {
        file_to_generate: to_generate.iter().map(|name| name.to_string()).collect(),
        parameter: Some(parameter.to_string()),
        proto_file,
    }
    .encode_to_vec()
}

fn run(request: &[u8]) -> CodeGeneratorResponse {
    Config::new().run_plugin(request).unwrap()
}

fn content<'a>(response: &'a CodeGeneratorResponse, name: &str) -> &'a str {
    response
        .file
        .iter()
        .find(|file| file.name() == name)
        .unwrap_or_else(|| {
            panic!(
                "no output file named '{}'; got {:?}",
                name,
                response.file.iter().map(|f| f.name()).collect::<Vec<_>>()
            )
        })
        .content()
}

#[test]
fn proto3_scalar_message() {
    let request = request_bytes(
        vec![(
            file(
                "example.proto",
                "com.acme",
                "proto3",
                vec![message("Widget", vec![field("x", 1, Type::Int32, Label::Optional)])],
            ),
            None,
        )],
        &["example.proto"],
        "",
    );
    let response = run(&request);
    assert_eq!(response.error, None);

    let widget = content(&response, "com/acme/example/Widget.scala");
    assert!(widget.contains("final case class Widget("));
    assert!(widget.contains("x: _root_.scala.Int = 0"));
    // A proto3 singular field is skipped at its default value.
    assert!(widget.contains("if (__value != 0)"));
    assert!(widget.contains(".computeInt32Size(1, __value)"));
    assert!(widget.contains("_output__.writeInt32(1, __v)"));
    // Tag 8 = field 1, wire type 0; unknown tags are skipped.
    assert!(widget.contains("case 8 => __x = _input__.readInt32()"));
    assert!(widget.contains("case tag => _input__.skipField(tag)"));
    assert!(widget.contains("def withX(__v: _root_.scala.Int): com.acme.example.Widget"));

    let file_object = content(&response, "com/acme/example/ExampleProto.scala");
    assert!(file_object.contains("object ExampleProto extends _root_.scalagen.GeneratedFileObject"));
    assert!(file_object.contains("_root_.scalagen.Encoding.fromBase64"));
    assert!(file_object.contains("com.acme.example.Widget"));
}

#[test]
fn proto2_optional_with_default() {
    let mut x = field("x", 1, Type::Int32, Label::Optional);
    x.default_value = Some("7".to_string());
    let request = request_bytes(
        vec![(
            file("example.proto", "com.acme", "proto2", vec![message("M", vec![x])]),
            None,
        )],
        &["example.proto"],
        "",
    );
    let response = run(&request);
    assert_eq!(response.error, None);

    let m = content(&response, "com/acme/example/M.scala");
    // Presence is kept apart from the default-bearing accessor.
    assert!(m.contains("x: _root_.scala.Option[_root_.scala.Int] = _root_.scala.None"));
    assert!(m.contains("def getX: _root_.scala.Int = x.getOrElse(7)"));
    assert!(m.contains("def clearX: com.acme.example.M = copy(x = _root_.scala.None)"));
    assert!(m.contains("x.foreach { __v =>"));
    assert!(m.contains("case 8 => __x = _root_.scala.Some(_input__.readInt32())"));
}

#[test]
fn packed_repeated_accepts_both_encodings() {
    let request = request_bytes(
        vec![(
            file(
                "example.proto",
                "com.acme",
                "proto3",
                vec![message("M", vec![field("xs", 1, Type::Int32, Label::Repeated)])],
            ),
            None,
        )],
        &["example.proto"],
        "",
    );
    let response = run(&request);
    let m = content(&response, "com/acme/example/M.scala");

    // Packed body: tag with wire type 2, length, bare payloads.
    assert!(m.contains("_output__.writeTag(1, 2)"));
    assert!(m.contains("_output__.writeUInt32NoTag(xsSerializedSize)"));
    assert!(m.contains("_output__.writeInt32NoTag("));
    assert!(m.contains("__xsSerializedSizeField"));
    // The decoder accepts both the varint form (tag 8) and the
    // length-delimited form (tag 10).
    assert!(m.contains("case 8 => __xs += _input__.readInt32()"));
    assert!(m.contains("case 10 => {"));
    assert!(m.contains("while (_input__.getBytesUntilLimit > 0)"));
    assert!(m.contains("_input__.popLimit(oldLimit)"));
}

#[test]
fn unpacked_repeated_still_accepts_packed_form() {
    let mut xs = field("xs", 1, Type::Int32, Label::Repeated);
    xs.options = Some(FieldOptions {
        packed: Some(false),
        ..Default::default()
    });
    let request = request_bytes(
        vec![(
            file("example.proto", "com.acme", "proto3", vec![message("M", vec![xs])]),
            None,
        )],
        &["example.proto"],
        "",
    );
    let response = run(&request);
    let m = content(&response, "com/acme/example/M.scala");

    // Written element-wise, but the packed arm is still decoded.
    assert!(m.contains("_output__.writeInt32(1, __v)"));
    assert!(m.contains("case 10 => {"));
}

#[test]
fn oneof_sum_type() {
    let mut a = field("a", 1, Type::Int32, Label::Optional);
    a.oneof_index = Some(0);
    let mut b = field("b", 2, Type::String, Label::Optional);
    b.oneof_index = Some(0);
    let mut m = message("M", vec![a, b]);
    m.oneof_decl = vec![OneofDescriptorProto {
        name: Some("kind".to_string()),
        ..Default::default()
    }];
    let request = request_bytes(
        vec![(file("example.proto", "com.acme", "proto3", vec![m]), None)],
        &["example.proto"],
        "",
    );
    let response = run(&request);
    assert_eq!(response.error, None);
    let m = content(&response, "com/acme/example/M.scala");

    assert!(m.contains("sealed trait Kind extends _root_.scalagen.GeneratedOneof"));
    assert!(m.contains("case object Empty extends com.acme.example.M.Kind"));
    assert!(m.contains("final case class A(value: _root_.scala.Int) extends com.acme.example.M.Kind"));
    assert!(m.contains("override def number: _root_.scala.Int = 1"));
    assert!(m.contains("def isA: _root_.scala.Boolean = false"));
    // Setting one member rewrites the whole oneof slot.
    assert!(m.contains("def withA(__v: _root_.scala.Int): com.acme.example.M = copy(kind = com.acme.example.M.Kind.A(__v))"));
    assert!(m.contains("case 8 => __kind = com.acme.example.M.Kind.A(_input__.readInt32())"));
    assert!(m.contains("case 18 => __kind = com.acme.example.M.Kind.B(_input__.readStringRequireUtf8())"));
    assert!(m.contains("kind: com.acme.example.M.Kind = com.acme.example.M.Kind.Empty"));
}

#[test]
fn oneof_name_conflict_is_a_domain_error() {
    let mut a = field("a", 1, Type::Int32, Label::Optional);
    a.oneof_index = Some(0);
    let mut m = message("M", vec![a]);
    m.oneof_decl = vec![OneofDescriptorProto {
        name: Some("kind".to_string()),
        ..Default::default()
    }];
    m.nested_type = vec![message("Kind", vec![])];
    let request = request_bytes(
        vec![(file("example.proto", "com.acme", "proto3", vec![m]), None)],
        &["example.proto"],
        "",
    );
    let response = run(&request);
    assert!(response.error().contains("collides"));
    assert!(response.file.is_empty());
}

#[test]
fn map_field() {
    let mut entry = message(
        "PropsEntry",
        vec![
            field("key", 1, Type::String, Label::Optional),
            field("value", 2, Type::Int32, Label::Optional),
        ],
    );
    entry.options = Some(MessageOptions {
        map_entry: Some(true),
        ..Default::default()
    });
    let mut m = message(
        "M",
        vec![message_field("props", 1, Label::Repeated, ".com.acme.M.PropsEntry")],
    );
    m.nested_type = vec![entry];
    let request = request_bytes(
        vec![(file("example.proto", "com.acme", "proto3", vec![m]), None)],
        &["example.proto"],
        "",
    );
    let response = run(&request);
    assert_eq!(response.error, None);
    let m = content(&response, "com/acme/example/M.scala");

    assert!(m.contains(
        "props: _root_.scala.collection.immutable.Map[_root_.scala.Predef.String, _root_.scala.Int] = _root_.scala.collection.immutable.Map.empty"
    ));
    // The entry message doubles as the wire representation; its companion
    // bridges entries and pairs.
    assert!(m.contains("final case class PropsEntry("));
    assert!(m.contains("implicit val _typemapper: _root_.scalagen.TypeMapper[com.acme.example.M.PropsEntry, (_root_.scala.Predef.String, _root_.scala.Int)]"));
    assert!(m.contains("case 10 => __props += com.acme.example.M.PropsEntry._typemapper.toCustom(_root_.scalagen.LiteParser.readMessage(_input__, com.acme.example.M.PropsEntry.defaultInstance))"));
    assert!(m.contains("def addProps(__vs: (_root_.scala.Predef.String, _root_.scala.Int)*)"));
}

#[test]
fn enum_preserves_unknown_values() {
    let value = |name: &str, number: i32| EnumValueDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        ..Default::default()
    };
    let mut f = file("example.proto", "com.acme", "proto3", vec![]);
    f.enum_type = vec![EnumDescriptorProto {
        name: Some("Color".to_string()),
        value: vec![value("RED", 0), value("CRIMSON", 0), value("GREEN", 1)],
        ..Default::default()
    }];
    let request = request_bytes(vec![(f, None)], &["example.proto"], "");
    let response = run(&request);
    assert_eq!(response.error, None);
    let color = content(&response, "com/acme/example/Color.scala");

    assert!(color.contains("sealed abstract class Color(val value: _root_.scala.Int)"));
    assert!(color.contains("final case class Unrecognized(unrecognizedValue: _root_.scala.Int)"));
    assert!(color.contains("case __other => Unrecognized(__other)"));
    // Aliases stay in the value table but not in the decode switch.
    assert!(color.contains("_root_.scala.Seq(Red, Crimson, Green)"));
    assert!(color.contains("case 0 => Red"));
    assert!(!color.contains("case 0 => Crimson"));
    assert!(color.contains("case 1 => Green"));
    assert!(color.contains("val index = -1"));
}

#[test]
fn fields_are_written_in_ascending_number_order() {
    let request = request_bytes(
        vec![(
            file(
                "example.proto",
                "com.acme",
                "proto3",
                vec![message(
                    "M",
                    vec![
                        field("later", 2, Type::Int32, Label::Optional),
                        field("earlier", 1, Type::Int32, Label::Optional),
                    ],
                )],
            ),
            None,
        )],
        &["example.proto"],
        "",
    );
    let response = run(&request);
    let m = content(&response, "com/acme/example/M.scala");
    let write_to = &m[m.find("def writeTo").unwrap()..];
    let first = write_to.find("_output__.writeInt32(1, __v)").unwrap();
    let second = write_to.find("_output__.writeInt32(2, __v)").unwrap();
    assert!(first < second);
}

#[test]
fn unknown_parameter_is_reported_without_files() {
    let request = request_bytes(
        vec![(file("example.proto", "com.acme", "proto3", vec![]), None)],
        &["example.proto"],
        "grpc,bogus_flag",
    );
    let response = run(&request);
    assert!(response.error().contains("bogus_flag"));
    assert!(response.file.is_empty());
}

#[test]
fn preamble_requires_single_file() {
    let options = ScalaFileOptions {
        preamble: vec!["// custom header".to_string()],
        ..Default::default()
    };
    let f = file("example.proto", "com.acme", "proto3", vec![]);

    let request = request_bytes(vec![(f.clone(), Some(options.clone()))], &["example.proto"], "");
    let response = run(&request);
    assert!(response.error().contains("single_file"));
    assert!(response.file.is_empty());

    let single = ScalaFileOptions {
        single_file: Some(true),
        ..options
    };
    let request = request_bytes(vec![(f, Some(single))], &["example.proto"], "");
    let response = run(&request);
    assert_eq!(response.error, None);
    assert_eq!(response.file.len(), 1);
    let out = content(&response, "com/acme/example/ExampleProto.scala");
    assert!(out.contains("// custom header"));
}

#[test]
fn flat_package_drops_the_file_suffix() {
    let f = file(
        "example.proto",
        "com.acme",
        "proto3",
        vec![message("M", vec![field("x", 1, Type::Int32, Label::Optional)])],
    );

    let request = request_bytes(vec![(f.clone(), None)], &["example.proto"], "flat_package");
    let response = run(&request);
    assert_eq!(response.error, None);
    let m = content(&response, "com/acme/M.scala");
    assert!(m.contains("package com.acme"));

    // The per-file option overrides the plugin flag.
    let options = ScalaFileOptions {
        flat_package: Some(true),
        ..Default::default()
    };
    let request = request_bytes(vec![(f, Some(options))], &["example.proto"], "");
    let response = run(&request);
    assert_eq!(response.error, None);
    content(&response, "com/acme/M.scala");
}

#[test]
fn java_conversions_emit_interop_shims() {
    let value = |name: &str, number: i32| EnumValueDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        ..Default::default()
    };
    let mut f = file(
        "example.proto",
        "com.acme",
        "proto3",
        vec![message(
            "M",
            vec![
                field("x", 1, Type::Int32, Label::Optional),
                FieldDescriptorProto {
                    type_name: Some(".com.acme.Color".to_string()),
                    ..field("color", 2, Type::Enum, Label::Optional)
                },
            ],
        )],
    );
    f.enum_type = vec![EnumDescriptorProto {
        name: Some("Color".to_string()),
        value: vec![value("RED", 0)],
        ..Default::default()
    }];
    let request = request_bytes(vec![(f, None)], &["example.proto"], "java_conversions");
    let response = run(&request);
    assert_eq!(response.error, None);

    let m = content(&response, "com/acme/example/M.scala");
    assert!(m.contains("def toJavaProto(scalaSource: com.acme.example.M): com.acme.Example.M"));
    assert!(m.contains("javaOut.setX(scalaSource.x)"));
    // proto3 enums interop through the numeric value to keep unknown
    // values intact.
    assert!(m.contains("javaOut.setColorValue(scalaSource.color.value)"));
    assert!(m.contains("color = com.acme.example.Color.fromValue(javaSource.getColorValue)"));

    let color = content(&response, "com/acme/example/Color.scala");
    assert!(color.contains("def toJavaValue(__e: com.acme.example.Color): com.acme.Example.Color"));

    let file_object = content(&response, "com/acme/example/ExampleProto.scala");
    assert!(file_object.contains("lazy val javaDescriptor"));
}

#[test]
fn dependencies_link_file_objects() {
    let base = file(
        "base.proto",
        "com.acme",
        "proto3",
        vec![message("Item", vec![field("id", 1, Type::Int32, Label::Optional)])],
    );
    let mut dependent = file(
        "dependent.proto",
        "com.acme",
        "proto3",
        vec![message(
            "Holder",
            vec![message_field("item", 1, Label::Optional, ".com.acme.Item")],
        )],
    );
    dependent.dependency = vec!["base.proto".to_string()];

    let request = request_bytes(
        vec![(base, None), (dependent, None)],
        &["dependent.proto"],
        "",
    );
    let response = run(&request);
    assert_eq!(response.error, None);

    let holder = content(&response, "com/acme/dependent/Holder.scala");
    // Cross-file references resolve to the other file's Scala package.
    assert!(holder.contains("item: _root_.scala.Option[com.acme.base.Item]"));
    assert!(holder.contains("case 10 => __item = _root_.scala.Some(_root_.scalagen.LiteParser.readMessage(_input__, __item.getOrElse(com.acme.base.Item.defaultInstance)))"));
    assert!(holder.contains("case 1 => com.acme.base.Item"));

    let file_object = content(&response, "com/acme/dependent/DependentProto.scala");
    assert!(file_object.contains("com.acme.base.BaseProto"));
}

#[test]
fn missing_dependency_is_reported() {
    let mut dependent = file("dependent.proto", "com.acme", "proto3", vec![]);
    dependent.dependency = vec!["absent.proto".to_string()];
    let request = request_bytes(vec![(dependent, None)], &["dependent.proto"], "");
    let response = run(&request);
    assert!(response.error().contains("absent.proto"));
}

#[test]
fn group_fields_are_a_domain_error() {
    let request = request_bytes(
        vec![(
            file(
                "example.proto",
                "com.acme",
                "proto2",
                vec![message("M", vec![field("g", 1, Type::Group, Label::Optional)])],
            ),
            None,
        )],
        &["example.proto"],
        "",
    );
    let response = run(&request);
    assert!(response.error().contains("group"));
    assert!(response.file.is_empty());
}

#[test]
fn custom_type_mapping_lifts_through_the_typemapper() {
    // The field-level options extension has to be spliced into the raw
    // bytes, so this request is assembled bottom-up.
    #[derive(Clone, PartialEq, ::prost::Message)]
    struct RawDescriptor {
        #[prost(string, optional, tag = "1")]
        name: Option<String>,
        #[prost(bytes = "vec", repeated, tag = "2")]
        field: Vec<Vec<u8>>,
    }
    #[derive(Clone, PartialEq, ::prost::Message)]
    struct RawFile {
        #[prost(string, optional, tag = "1")]
        name: Option<String>,
        #[prost(string, optional, tag = "2")]
        package: Option<String>,
        #[prost(bytes = "vec", repeated, tag = "4")]
        message_type: Vec<Vec<u8>>,
        #[prost(string, optional, tag = "12")]
        syntax: Option<String>,
    }

    let mut field_bytes = field("id", 1, Type::Int32, Label::Optional).encode_to_vec();
    field_bytes.extend(
        FieldDescriptorExt {
            options: Some(FieldOptionsExt {
                scala: Some(ScalaFieldOptions {
                    custom_type: Some("com.acme.WidgetId".to_string()),
                }),
            }),
        }
        .encode_to_vec(),
    );
    let message_bytes = RawDescriptor {
        name: Some("Widget".to_string()),
        field: vec![field_bytes],
    }
    .encode_to_vec();
    let file_bytes = RawFile {
        name: Some("example.proto".to_string()),
        package: Some("com.acme".to_string()),
        message_type: vec![message_bytes],
        syntax: Some("proto3".to_string()),
    }
    .encode_to_vec();
    let request = RawRequest {
        file_to_generate: vec!["example.proto".to_string()],
        parameter: Some(String::new()),
        proto_file: vec![file_bytes],
    }
    .encode_to_vec();

    let response = run(&request);
    assert_eq!(response.error, None);
    let widget = content(&response, "com/acme/example/Widget.scala");

    assert!(widget.contains("id: com.acme.WidgetId = com.acme.example.Widget._typemapper_id.toCustom(0)"));
    assert!(widget.contains(
        "@transient private val _typemapper_id: _root_.scalagen.TypeMapper[_root_.scala.Int, com.acme.WidgetId]"
    ));
    // toBase before sizing and writing, toCustom after reading.
    assert!(widget.contains("val __value = com.acme.example.Widget._typemapper_id.toBase(id)"));
    assert!(widget.contains("case 8 => __id = com.acme.example.Widget._typemapper_id.toCustom(_input__.readInt32())"));
}
