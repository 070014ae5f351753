use thiserror::Error;

/// Errors produced by the decision core.
///
/// The transport layer reports its own failures through `anyhow`; this enum
/// only covers conditions a caller of the evaluation functions can branch on.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A snapshot lookup referenced a security the book does not carry.
    #[error("unknown security {0:?}")]
    UnknownSecurity(String),
}
