use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Table,
    Index,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Table => write!(f, "table"),
            ResourceType::Index => write!(f, "index"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptdbErrorCode {
    Validation,
    InvalidConfig,
    TableAlreadyExists,
    IndexAlreadyExists,
    TableNotFound,
    IndexNotFound,
    TypeMismatch,
    NotNullViolation,
    UnknownColumn,
    RowArityMismatch,
}

impl AdaptdbErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            AdaptdbErrorCode::Validation => "validation",
            AdaptdbErrorCode::InvalidConfig => "invalid_config",
            AdaptdbErrorCode::TableAlreadyExists => "table_already_exists",
            AdaptdbErrorCode::IndexAlreadyExists => "index_already_exists",
            AdaptdbErrorCode::TableNotFound => "table_not_found",
            AdaptdbErrorCode::IndexNotFound => "index_not_found",
            AdaptdbErrorCode::TypeMismatch => "type_mismatch",
            AdaptdbErrorCode::NotNullViolation => "not_null_violation",
            AdaptdbErrorCode::UnknownColumn => "unknown_column",
            AdaptdbErrorCode::RowArityMismatch => "row_arity_mismatch",
        }
    }
}

#[derive(Debug, Error)]
pub enum AdaptdbError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
    #[error("{resource_type} '{resource_id}' already exists")]
    AlreadyExists {
        resource_type: ResourceType,
        resource_id: String,
    },
    #[error("{resource_type} '{resource_id}' not found")]
    NotFound {
        resource_type: ResourceType,
        resource_id: String,
    },
    #[error(
        "type mismatch: column '{column}' in table '{table}' expected {expected}, got {actual}"
    )]
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
    #[error("NOT NULL violation: column '{column}' in table '{table}'")]
    NotNullViolation { table: String, column: String },
    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },
    #[error("row has {actual} values but table '{table}' has {expected} columns")]
    RowArityMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },
}

impl AdaptdbError {
    pub fn code(&self) -> AdaptdbErrorCode {
        match self {
            AdaptdbError::Validation(_) => AdaptdbErrorCode::Validation,
            AdaptdbError::InvalidConfig { .. } => AdaptdbErrorCode::InvalidConfig,
            AdaptdbError::AlreadyExists { resource_type, .. } => match resource_type {
                ResourceType::Table => AdaptdbErrorCode::TableAlreadyExists,
                ResourceType::Index => AdaptdbErrorCode::IndexAlreadyExists,
            },
            AdaptdbError::NotFound { resource_type, .. } => match resource_type {
                ResourceType::Table => AdaptdbErrorCode::TableNotFound,
                ResourceType::Index => AdaptdbErrorCode::IndexNotFound,
            },
            AdaptdbError::TypeMismatch { .. } => AdaptdbErrorCode::TypeMismatch,
            AdaptdbError::NotNullViolation { .. } => AdaptdbErrorCode::NotNullViolation,
            AdaptdbError::UnknownColumn { .. } => AdaptdbErrorCode::UnknownColumn,
            AdaptdbError::RowArityMismatch { .. } => AdaptdbErrorCode::RowArityMismatch,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }
}
