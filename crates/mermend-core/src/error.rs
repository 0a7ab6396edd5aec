pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the library.
///
/// Malformed diagram text is never an error: repair always returns text and structural defects
/// are reported through [`crate::ValidationVerdict`]. The only failures are configuration
/// problems.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid repair options JSON: {message}")]
    InvalidOptionsJson { message: String },

    #[error("Invalid repair option `{option}`: {message}")]
    InvalidOption {
        option: &'static str,
        message: String,
    },
}
