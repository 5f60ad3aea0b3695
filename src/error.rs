use crate::android::ApkZipError;
use crate::dex::error::DexError;
use crate::types::DecodeError;
use std::error::Error;
use std::{fmt, io};

/// The reader that rejected a source's bytes.
#[derive(Debug)]
pub enum ReadError {
    Image(DexError),
    Archive(ApkZipError),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Image(e) => write!(f, "{e}"),
            ReadError::Archive(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReadError::Image(e) => Some(e),
            ReadError::Archive(e) => Some(e),
        }
    }
}

/// Any failure that ends a listing run. `source` names the input (a path, `<stdin>` or the
/// caller-supplied buffer name) and `image` the dex entry within it.
#[derive(Debug)]
pub enum ListError {
    /// The source could not be opened or read.
    Input { source: String, error: io::Error },
    /// The image or archive reader rejected the bytes.
    Read {
        source: String,
        image: Option<String>,
        error: ReadError,
    },
    /// A type descriptor inside an image did not decode.
    Decode {
        source: String,
        image: String,
        error: DecodeError,
    },
    /// Writing the listing to the output sink failed.
    Output(io::Error),
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListError::Input { source, error } if error.kind() == io::ErrorKind::NotFound => {
                write!(f, "File {source} not found.")
            }
            ListError::Input { source, error } => write!(f, "Unable to read {source}: {error}"),
            ListError::Read {
                source,
                image: Some(image),
                error,
            } => write!(f, "Unable to read {image} in {source}: {error}"),
            ListError::Read {
                source,
                image: None,
                error,
            } => write!(f, "Unable to read {source}: {error}"),
            ListError::Decode {
                source,
                image,
                error,
            } => write!(f, "Unable to decode {image} in {source}: {error}"),
            ListError::Output(error) => write!(f, "Unable to write output: {error}"),
        }
    }
}

impl Error for ListError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ListError::Input { error, .. } => Some(error),
            ListError::Read { error, .. } => Some(error),
            ListError::Decode { error, .. } => Some(error),
            ListError::Output(error) => Some(error),
        }
    }
}
