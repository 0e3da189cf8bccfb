//! Catalog schema: the typed shape of an archive entity.

mod entity;
mod fields;
mod grounding;

pub use entity::MaterializedEntity;
pub use fields::{EntityFields, FieldAssignment, FieldName, Temperament};
pub use grounding::{EntityContext, MediaAnalysis};
