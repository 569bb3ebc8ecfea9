//! Nimbus Core
//!
//! Core library for a cloud resource provider: resource ID shapes and their
//! codec, the resource/state model, attribute schemas and the Provider trait.

pub mod differ;
pub mod provider;
pub mod resource;
pub mod resource_id;
pub mod schema;
