use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchematicError>;

/// Error type for parsing and serialization operations.
///
/// Structural and shape errors carry the dotted path to the offending field
/// (`Level.Sections[3].BlockStates`). Absent data (missing chunks, coordinates
/// outside a schematic) is never reported through this type; those cases are
/// sentinel values on the respective APIs.
#[derive(Debug, Error)]
pub enum SchematicError {
    #[error("type mismatch at `{path}`: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("unknown NBT tag {tag} at `{path}`")]
    UnknownTag { tag: u8, path: String },
    #[error("unexpected end of data at `{path}`")]
    UnexpectedEof { path: String },
    #[error("root tag must be an unnamed compound")]
    InvalidRoot,
    #[error("cannot serialize wildcard-shaped data at `{path}`")]
    Unserializable { path: String },
    #[error("unsupported chunk compression type {0}")]
    UnsupportedCompression(u8),
    #[error("invalid UTF-8 string at `{path}`")]
    InvalidUtf8 { path: String },
    #[error("string at `{path}` exceeds the 65535-byte NBT limit")]
    StringTooLong { path: String },
    #[error("malformed block state string `{0}`")]
    MalformedBlockState(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
