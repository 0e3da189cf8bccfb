//! Field merging and confidence scoring.

mod merger;

pub use merger::{FieldMerger, InterviewState, MergeOutcome, MergePolicy};
