//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

pub fn r#true() -> bool {
    true
}

// ============================================================================
// [dom] Section Defaults
// ============================================================================

pub mod dom {
    pub fn signature_prefix() -> String {
        "data-h-".into()
    }
}

// ============================================================================
// [dedupe] Section Defaults
// ============================================================================

pub mod dedupe {
    pub fn singleton_links() -> Vec<String> {
        vec!["canonical".into()]
    }
}
