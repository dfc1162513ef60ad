/// Common types and utilities for abibind

/// Error type for binding generation and deployment
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Generic error with message
    #[error("{0}")]
    Generic(String),

    /// Malformed type string or ABI fragment
    #[error("Failed to parse: {0}")]
    Parse(String),

    /// ABI JSON could not be read
    #[error("Invalid ABI JSON: {0}")]
    AbiParse(String),

    /// Two top-level members normalize to the same identifier
    #[error("duplicated identifier \"{original}\" (normalized \"{normalized}\"), use an alias for renaming")]
    DuplicateIdentifier {
        original: String,
        normalized: String,
    },

    /// Bytecode references a library pattern nobody declared
    #[error("Unknown library pattern {pattern} referenced by {contract}")]
    UnknownLibrary {
        pattern: String,
        contract: String,
    },

    /// A dependency was referenced but no metadata exists for it
    #[error("Missing metadata for dependency {pattern} of {dependent}")]
    MissingDependency {
        pattern: String,
        dependent: String,
    },

    /// The dependency graph loops back on itself
    #[error("Cyclic library dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    /// Bytecode still contains placeholders after linking
    #[error("Bytecode of {0} is not fully linked")]
    UnlinkedBytecode(String),

    /// Deploy callback failure
    #[error("Deployment error: {0}")]
    Deploy(String),

    /// Error when interacting with a chain
    #[error("Chain error: {0}")]
    Chain(String),

    /// Contract creation succeeded but the account holds no code
    #[error("No contract code after deployment at {0}")]
    NoCodeAfterDeploy(String),

    /// Receipt does not belong to a contract creation
    #[error("Transaction {0} is not a contract creation")]
    NotContractCreation(String),

    /// Waiting was cancelled by the caller
    #[error("Cancelled while waiting for {0}")]
    Cancelled(String),

    /// Template registration or rendering failure
    #[error("Template error: {0}")]
    Template(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a new generic error
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a new ABI parse error
    pub fn abi<S: Into<String>>(msg: S) -> Self {
        Error::AbiParse(msg.into())
    }

    /// Create a new duplicate identifier error
    pub fn duplicate<S: Into<String>, N: Into<String>>(original: S, normalized: N) -> Self {
        Error::DuplicateIdentifier {
            original: original.into(),
            normalized: normalized.into(),
        }
    }

    /// Create a new deployment error
    pub fn deploy<S: Into<String>>(msg: S) -> Self {
        Error::Deploy(msg.into())
    }

    /// Create a new chain error
    pub fn chain<S: Into<String>>(msg: S) -> Self {
        Error::Chain(msg.into())
    }

    /// Create a new template error
    pub fn template<S: Into<String>>(msg: S) -> Self {
        Error::Template(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Whether the error is the caller-driven cancellation of a wait
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Generic(s.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON serialization error: {}", err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_identifier_message() {
        let err = Error::duplicate("get_value", "GetValue");
        let msg = err.to_string();
        assert!(msg.contains("\"get_value\""));
        assert!(msg.contains("\"GetValue\""));
    }

    #[test]
    fn test_cyclic_dependency_message() {
        let err = Error::CyclicDependency(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "Cyclic library dependency: a -> b -> a");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(Error::Cancelled("0x01".into()).is_cancelled());
        assert!(!Error::generic("boom").is_cancelled());
    }
}
