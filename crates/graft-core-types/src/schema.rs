//! Canonical schema constants for structured logging and events
//!
//! Every key here is emitted by at least one event. `tracing` takes field
//! names as tokens, so call sites spell the keys out; the capture layer and
//! log assertions read events back through these constants.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";

// Entity identifiers
pub const FIELD_NODE: &str = "node";
pub const FIELD_FACET: &str = "facet";
pub const FIELD_FACET_KIND: &str = "facet_kind";
pub const FIELD_FIELD_PATH: &str = "field_path";
pub const FIELD_HOOK: &str = "hook";

// Collection sizes
pub const FIELD_ADDITIONS: &str = "additions";
pub const FIELD_REMAP_LEN: &str = "remap_len";
pub const FIELD_FIXED: &str = "fixed";
pub const FIELD_UNFIXED: &str = "unfixed";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
