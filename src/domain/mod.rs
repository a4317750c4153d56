//! Domain layer - Declaration metadata and label schemas.
//!
//! Pure types with no backend dependency: field metadata lookups and the
//! label schema derived from label records.

pub mod labels;
pub mod meta;

pub use labels::{
    LabelArg, LabelDescriptor, LabelKind, LabelScalar, LabelSchema, LabelSet, LabelValue,
    LabelValues, SchemaBuilder,
};
pub use meta::Meta;
