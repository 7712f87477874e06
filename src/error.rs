use thiserror::Error;

/// Failure modes of a detection pass.
///
/// All of these abort the current frame; none of them is retryable from
/// inside the post-processor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// The output layer does not use the Region layout
    /// (normalized cx/cy/w/h + objectness + per-class scores).
    #[error("unsupported output layer kind: {0}")]
    UnsupportedLayerKind(String),

    /// The tensor is too narrow to hold a box and at least one class score.
    #[error("malformed tensor from layer '{layer}': {cols} columns, need at least {min}")]
    MalformedTensor {
        layer: String,
        cols: usize,
        min: usize,
    },

    /// A resolved class id has no corresponding label entry.
    #[error("no label for class id {class_id} ({len} labels loaded)")]
    EmptyLabelTable { class_id: usize, len: usize },
}
