//! Source-info path constants, mirroring the field numbers of the
//! descriptor messages.

pub(super) struct FileDescriptorProtoLocations;

impl FileDescriptorProtoLocations {
    pub const MESSAGE_TYPE: i32 = 4;
    pub const ENUM_TYPE: i32 = 5;
    pub const EXTENSION: i32 = 7;
}

pub(super) struct DescriptorProtoLocations;

impl DescriptorProtoLocations {
    pub const NESTED_TYPE: i32 = 3;
    pub const ENUM_TYPE: i32 = 4;
    pub const EXTENSION: i32 = 6;
    pub const ONEOF_DECL: i32 = 8;
}

pub(super) struct EnumDescriptorProtoLocations;

impl EnumDescriptorProtoLocations {
    pub const VALUE: i32 = 2;
}
