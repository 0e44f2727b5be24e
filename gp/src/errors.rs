use thiserror::Error;

/// A result type for Laplace inference computations
pub type Result<T> = std::result::Result<T, GpError>;

/// An error when using the [`SingleLaplaceInference`](crate::SingleLaplaceInference) engine
#[derive(Error, Debug)]
pub enum GpError {
    /// When a given value is not consistent with the model (dimensions, labels, settings)
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When a derivative is requested wrt a hyperparameter the model does not own
    #[error("Unknown hyperparameter: {0}")]
    UnknownHyperparameter(String),
    /// When the registered minimizer cannot drive the mode search
    #[error("Unsupported minimizer: {0}")]
    UnsupportedMinimizer(String),
    /// When a capability is not compiled in (see `linesearch` feature)
    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(String),
    /// When a Cholesky or LU factorization fails or yields non finite values
    #[error("Factorization failed: {0}")]
    FactorizationError(String),
    /// When linear algebra computation fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
    /// When the argmin optimization framework fails
    #[cfg(feature = "linesearch")]
    #[error("Argmin optimization error: {0}")]
    ArgminError(#[from] argmin::core::Error),
}
