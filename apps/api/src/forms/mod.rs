// Form field model: descriptors, values, the default identity schema, and merge rules.

pub mod defaults;
pub mod handlers;
pub mod label;
pub mod model;

pub use defaults::DefaultFields;
pub use model::{FieldDescriptor, FieldKind, FieldValue, FormError, FormModel, ImageRef, SchemaField};
