use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Invalid source specification: {0}")]
    InvalidSourceSpec(String),

    #[error("Invalid DNS response: {0}")]
    InvalidDnsResponse(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Query timeout: {0}")]
    QueryTimeout(String),

    #[error("Connection pool for {0} is shut down")]
    PoolShutdown(String),

    #[error("Resolution failed: {0}")]
    ResolutionFailed(String),

    #[error("Parse error in {path}: {reason}")]
    ParseError { path: String, reason: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Rule store error: {0}")]
    StoreError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::IoError(e.to_string())
    }
}
