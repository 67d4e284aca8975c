use graft_core_types::{RequestId, TraceId};
use thiserror::Error;

/// Result type alias using GraftError
pub type Result<T> = std::result::Result<T, GraftError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    InvalidName,
    NotFound,
    IllegalReparent,
    KindMismatch,

    // Merge preconditions
    RootTargetMissing,
    TargetOutsideRoot,
    UnknownConflictMode,

    // Merge execution
    /// A duplicated subtree does not line up 1:1 with its original
    InternalConsistency,
    HookFailed,

    // Integration/IO
    Io,
    Serialization,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidName => "ERR_INVALID_NAME",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::IllegalReparent => "ERR_ILLEGAL_REPARENT",
            ExErrorKind::KindMismatch => "ERR_KIND_MISMATCH",
            ExErrorKind::RootTargetMissing => "ERR_ROOT_TARGET_MISSING",
            ExErrorKind::TargetOutsideRoot => "ERR_TARGET_OUTSIDE_ROOT",
            ExErrorKind::UnknownConflictMode => "ERR_UNKNOWN_CONFLICT_MODE",
            ExErrorKind::InternalConsistency => "ERR_INTERNAL_CONSISTENCY",
            ExErrorKind::HookFailed => "ERR_HOOK_FAILED",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
        }
    }
}

/// Canonical structured error type
///
/// This error type provides a structured representation of errors with
/// classification fields for programmatic handling and rich context for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context (a node, facet or addition handle rendered as text)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add a human-readable message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the trace ID context, if any
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity: {})", entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for graft operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraftError {
    // ===== Tree provider =====
    /// Node handle is unknown or stale
    #[error("Node not found: {node}")]
    NodeNotFound { node: String },

    /// Facet handle is unknown or stale (e.g. destroyed earlier in this pass)
    #[error("Facet not found: {facet}")]
    FacetNotFound { facet: String },

    /// Facet has no reference field at the given path
    #[error("Facet {facet} has no reference field '{path}'")]
    ReferenceFieldNotFound { facet: String, path: String },

    /// Node names must be non-empty
    #[error("Invalid name: {reason}")]
    InvalidName { reason: String },

    /// Reparenting would make a node its own ancestor
    #[error("Illegal reparent: {reason}")]
    IllegalReparent { reason: String },

    /// Facet values can only be cloned between facets of the same kind
    #[error("Cannot copy facet {src} ({src_kind}) onto {dst} ({dst_kind})")]
    FacetKindMismatch {
        src: String,
        src_kind: String,
        dst: String,
        dst_kind: String,
    },

    /// No node at the given name path
    #[error("No node at path '{path}'")]
    PathNotFound { path: String },

    // ===== Addition tree =====
    /// Addition tree index out of range
    #[error("Addition tree node not found: {index}")]
    AdditionNodeNotFound { index: usize },

    // ===== Merge =====
    /// The addition tree root has no destination assigned
    #[error("The root of the addition tree has no remap target")]
    RootTargetMissing,

    /// An addition would attach outside the destination root
    #[error("Remap target {target} of '{addition}' is not within the root target {root}")]
    TargetOutsideRoot {
        addition: String,
        target: String,
        root: String,
    },

    /// Conflict mode text outside the closed set
    #[error("Unknown conflict mode: {value}")]
    UnknownConflictMode { value: String },

    /// Duplicated subtree does not line up with its original
    #[error("Duplicate of {original} diverges from its original at {position}: {reason}")]
    DuplicateMismatch {
        original: String,
        position: String,
        reason: String,
    },

    // ===== Generic Errors =====
    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

/// Conversion from GraftError to ExError
impl From<GraftError> for ExError {
    fn from(err: GraftError) -> Self {
        match err {
            GraftError::NodeNotFound { node } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(node)
                .with_message("Node not found"),

            GraftError::FacetNotFound { facet } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(facet)
                .with_message("Facet not found"),

            GraftError::ReferenceFieldNotFound { facet, path } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_id(facet)
                    .with_message(format!("No reference field '{}'", path))
            }

            GraftError::PathNotFound { path } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(path)
                .with_message("No node at path"),

            GraftError::AdditionNodeNotFound { index } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(index.to_string())
                .with_message("Addition tree node not found"),

            GraftError::InvalidName { reason } => ExError::new(ExErrorKind::InvalidName)
                .with_message(format!("Invalid name: {}", reason)),

            GraftError::IllegalReparent { reason } => ExError::new(ExErrorKind::IllegalReparent)
                .with_op("reparent")
                .with_message(format!("Illegal reparent: {}", reason)),

            GraftError::FacetKindMismatch {
                src,
                src_kind,
                dst,
                dst_kind,
            } => ExError::new(ExErrorKind::KindMismatch)
                .with_op("copy_facet_value")
                .with_entity_id(dst)
                .with_message(format!(
                    "Cannot copy {} ({}) onto a {} facet",
                    src, src_kind, dst_kind
                )),

            GraftError::RootTargetMissing => ExError::new(ExErrorKind::RootTargetMissing)
                .with_op("merge")
                .with_message("The root of the addition tree has no remap target"),

            GraftError::TargetOutsideRoot {
                addition,
                target,
                root,
            } => ExError::new(ExErrorKind::TargetOutsideRoot)
                .with_op("merge")
                .with_entity_id(addition)
                .with_message(format!("Target {} is not within root target {}", target, root)),

            GraftError::UnknownConflictMode { value } => {
                ExError::new(ExErrorKind::UnknownConflictMode)
                    .with_message(format!("Unknown conflict mode: {}", value))
            }

            GraftError::DuplicateMismatch {
                original,
                position,
                reason,
            } => ExError::new(ExErrorKind::InternalConsistency)
                .with_op("merge")
                .with_entity_id(original)
                .with_message(format!("Duplicate diverges at {}: {}", position, reason)),

            GraftError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to GraftError
impl From<serde_json::Error> for GraftError {
    fn from(err: serde_json::Error) -> Self {
        GraftError::Serialization {
            message: err.to_string(),
        }
    }
}
