//! Model export and serialization module
//!
//! Trained models are written in a native binary format: a bincode envelope
//! carrying metadata, the encoded model and an integrity checksum.

mod serializer;

pub use serializer::{load, persist, ModelMetadata, SerializedModel};
