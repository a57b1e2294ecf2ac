/// Domain errors raised during generation.
///
/// These are caught at the request-driver boundary and reported through the
/// `error` field of the `CodeGeneratorResponse`; no files are emitted for a
/// failing request.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum GeneratorError {
    #[error("unrecognized parameter: '{0}'")]
    InvalidParameter(String),

    #[error("oneof '{oneof}' of message '{message}' collides with the nested type '{conflict}'")]
    OneofNameConflict {
        message: String,
        oneof: String,
        conflict: String,
    },

    #[error("{file}: a 'preamble' can only be used together with 'single_file'")]
    PreambleRequiresSingleFile { file: String },

    #[error("field '{field}' uses the group wire format, which is not supported")]
    GroupUnsupported { field: String },

    #[error("{file} imports '{import_}', which is missing from the request")]
    MissingDependency { file: String, import_: String },
}
