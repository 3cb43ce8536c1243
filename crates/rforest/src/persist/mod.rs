//! Model persistence.
//!
//! Models are written as versioned JSON documents built from the schema
//! types in [`schema`]. Reading validates the document structurally before
//! a [`Model`] is returned.

pub mod convert;
pub mod schema;

use crate::error::Result;
use crate::model::Model;

use schema::RandomForestModelSchema;

/// Encode `model` as JSON bytes.
pub fn to_json_bytes(model: &Model) -> Result<Vec<u8>> {
    let schema = RandomForestModelSchema::from(model);
    Ok(serde_json::to_vec(&schema)?)
}

/// Decode and validate a model from JSON bytes.
pub fn from_json_bytes(bytes: &[u8]) -> Result<Model> {
    let schema: RandomForestModelSchema = serde_json::from_slice(bytes)?;
    Model::try_from(schema)
}
