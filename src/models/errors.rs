use thiserror::Error;

use super::RelationKind;

/// Service-level errors that can occur in business logic
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Recipe not found: {id}")]
    RecipeNotFound { id: String },

    #[error("User not found: {id}")]
    UserNotFound { id: String },

    #[error("Tag not found: {id}")]
    TagNotFound { id: String },

    #[error("Ingredient not found: {id}")]
    IngredientNotFound { id: String },

    #[error("{}", .kind.missing_message())]
    RelationNotFound { kind: RelationKind, target_id: String },

    #[error("{}", .kind.duplicate_message())]
    RelationAlreadyExists { kind: RelationKind, target_id: String },

    #[error("Already exists: {message}")]
    AlreadyExists { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Repository error: {source}")]
    Repository {
        #[from]
        source: RepositoryError,
    },

    #[error("Rendering error: {message}")]
    Rendering { message: String },
}

/// Repository-level errors for data access operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database connection failed")]
    ConnectionFailed,

    #[error("Item not found")]
    NotFound,

    #[error("Item already exists")]
    AlreadyExists,

    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("AWS SDK error: {message}")]
    AwsSdk { message: String },

    #[error("DynamoDB table not found: {table_name}. Ensure the table exists and IAM permissions are correct.")]
    TableNotFound { table_name: String },

    #[error("Invalid item: {message}")]
    InvalidItem { message: String },

    #[error("Timeout occurred during operation")]
    Timeout,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

/// Validation errors for input data
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredField { field: String },

    #[error("Invalid field value: {field}={value}, reason={reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Field too long: {field}, max_length={max_length}, actual_length={actual_length}")]
    TooLong {
        field: String,
        max_length: usize,
        actual_length: usize,
    },

    #[error("Invalid format: {field}, expected={expected}")]
    InvalidFormat { field: String, expected: String },

    #[error("Value out of range: {field}, min={min}, max={max}, value={value}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
        value: String,
    },

    #[error("Duplicate value: {field}={value}")]
    Duplicate { field: String, value: String },
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::ValidationError {
            message: err.to_string(),
        }
    }
}

impl ServiceError {
    /// Name of the error class, used as a metrics label and in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::RecipeNotFound { .. }
            | ServiceError::UserNotFound { .. }
            | ServiceError::TagNotFound { .. }
            | ServiceError::IngredientNotFound { .. }
            | ServiceError::RelationNotFound { .. } => "not_found",
            ServiceError::RelationAlreadyExists { .. } | ServiceError::AlreadyExists { .. } => {
                "already_exists"
            }
            ServiceError::ValidationError { .. } => "validation",
            ServiceError::PermissionDenied { .. } => "permission_denied",
            ServiceError::Unauthenticated => "unauthenticated",
            ServiceError::Repository { .. } => "repository",
            ServiceError::Rendering { .. } => "rendering",
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;
