/*!
Specialized `Error` and `Result` types for the translation hierarchy.
*/

use std::{convert, error, fmt, result};

/// Specialized `Error` type for hierarchy construction and use.
///
/// Configuration problems are reported through this type; timing
/// invariant violations are not. A completion cycle that runs backwards
/// indicates a modeling bug and halts the simulation with a panic
/// instead of unwinding through every level as a `Result`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Error {
    /// Generic error type containing a string
    Other(&'static str),
    /// Configuration error.
    ///
    /// A structural parameter (entry count, associativity, set count)
    /// would build an inconsistent hierarchy.
    Configuration(&'static str),
    /// Unsupported page size.
    ///
    /// The page-table walker only models page sizes with a known
    /// radix-table depth.
    UnsupportedPageSize,
}

/// Convert from &str to error
impl convert::From<&'static str> for Error {
    fn from(error: &'static str) -> Self {
        Error::Other(error)
    }
}

impl Error {
    /// Returns a tuple representing the error description and its string value.
    pub fn to_str_pair(self) -> (&'static str, Option<&'static str>) {
        match self {
            Error::Other(e) => ("other error", Some(e)),
            Error::Configuration(e) => ("configuration error", Some(e)),
            Error::UnsupportedPageSize => ("unsupported page size", None),
        }
    }

    /// Returns a simple string representation of the error.
    pub fn to_str(self) -> &'static str {
        self.to_str_pair().0
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (desc, value) = self.to_str_pair();

        if let Some(value) = value {
            write!(f, "{}: {}", desc, value)
        } else {
            f.write_str(desc)
        }
    }
}

impl error::Error for Error {}

/// Specialized `Result` type for translation hierarchy results.
pub type Result<T> = result::Result<T, Error>;
