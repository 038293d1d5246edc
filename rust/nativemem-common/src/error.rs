use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn null_region(context: impl Into<String>) -> Error {
        ErrorKind::NullRegion {
            context: context.into(),
        }
        .into()
    }

    pub fn index_out_of_range(index: usize, len: usize) -> Error {
        ErrorKind::IndexOutOfRange { index, len }.into()
    }

    pub fn offset_out_of_range(
        name: impl Into<String>,
        offset: usize,
        size: usize,
        limit: usize,
    ) -> Error {
        ErrorKind::OffsetOutOfRange {
            name: name.into(),
            offset,
            size,
            limit,
        }
        .into()
    }

    pub fn size_too_small(name: impl Into<String>, size: usize, minimum: usize) -> Error {
        ErrorKind::SizeTooSmall {
            name: name.into(),
            size,
            minimum,
        }
        .into()
    }

    pub fn widening_cast(source_size: usize, target_type_size: usize) -> Error {
        ErrorKind::WideningCast {
            source_size,
            target_type_size,
        }
        .into()
    }

    pub fn already_disposed(context: impl Into<String>) -> Error {
        ErrorKind::AlreadyDisposed {
            context: context.into(),
        }
        .into()
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        ErrorKind::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
        .into()
    }

    pub fn out_of_memory(size: usize) -> Error {
        ErrorKind::OutOfMemory { size }.into()
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        ErrorKind::Io {
            context: context.into(),
            source,
        }
        .into()
    }

    /// Returns `true` if this error reports an access to a disposed region.
    pub fn is_disposed(&self) -> bool {
        matches!(self.kind(), ErrorKind::AlreadyDisposed { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("null region: {context}")]
    NullRegion { context: String },

    #[error("index {index} is out of range, valid range is [0, {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error(
        "offset out of range for '{name}': offset {offset} with size {size} exceeds {limit} bytes"
    )]
    OffsetOutOfRange {
        name: String,
        offset: usize,
        size: usize,
        limit: usize,
    },

    #[error("size of '{name}' is too small: {size} (minimum is {minimum})")]
    SizeTooSmall {
        name: String,
        size: usize,
        minimum: usize,
    },

    #[error(
        "cannot reinterpret {source_size} bytes as elements of {target_type_size} bytes"
    )]
    WideningCast {
        source_size: usize,
        target_type_size: usize,
    },

    #[error("region is already disposed: {context}")]
    AlreadyDisposed { context: String },

    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("failed to allocate {size} bytes")]
    OutOfMemory { size: usize },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}
