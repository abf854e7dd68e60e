use std::fmt::{self, Display, Formatter};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The provider could not be reached, or kept answering with failures
    /// until the attempt budget was exhausted.
    Connection,
    /// Any other errors.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Connection => write!(f, "API connection failure"),
            ErrorKind::Other => write!(f, "Other error"),
        }
    }
}
