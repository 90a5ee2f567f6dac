use thiserror::Error;

/// Errors that can occur in elball.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Class identifier not found in the index.
    #[error("Class not found: {0}")]
    ClassNotFound(String),
    /// Relation identifier not found in the index.
    #[error("Relation not found: {0}")]
    RelationNotFound(String),
    /// The ontology contained no usable axioms.
    #[error("Ontology contained no axioms")]
    EmptyOntology,
    /// Configuration failed bounds validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// Training loss became non-finite; the embeddings have diverged.
    #[error("Training diverged at epoch {epoch}: loss = {loss}")]
    Diverged {
        /// Epoch on which the non-finite loss was observed.
        epoch: usize,
        /// The offending loss value (NaN or infinite).
        loss: f32,
    },
}

/// Result type alias for elball.
pub type Result<T> = std::result::Result<T, Error>;
