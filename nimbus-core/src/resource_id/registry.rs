//! Shape registry - Immutable lookup of ID shapes by name

use std::collections::BTreeMap;

use thiserror::Error;

use super::{IdShape, ParsedId, ResourceIdError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown resource ID shape: {0}")]
    UnknownShape(String),

    #[error("Resource ID shape registered twice: {0}")]
    DuplicateShape(&'static str),

    #[error(transparent)]
    Malformed(#[from] ResourceIdError),
}

/// Collects shapes before freezing them into a [`ShapeRegistry`]
#[derive(Debug, Default)]
pub struct ShapeRegistryBuilder {
    shapes: Vec<&'static IdShape>,
}

impl ShapeRegistryBuilder {
    pub fn register(mut self, shape: &'static IdShape) -> Self {
        self.shapes.push(shape);
        self
    }

    /// Freeze the registry; shape names must be unique
    pub fn build(self) -> Result<ShapeRegistry, RegistryError> {
        let mut shapes = BTreeMap::new();
        for shape in self.shapes {
            if shapes.insert(shape.name, shape).is_some() {
                return Err(RegistryError::DuplicateShape(shape.name));
            }
        }
        Ok(ShapeRegistry { shapes })
    }
}

/// Read-only map from shape name to shape, built once and shared by reference
#[derive(Debug, Clone, Default)]
pub struct ShapeRegistry {
    shapes: BTreeMap<&'static str, &'static IdShape>,
}

impl ShapeRegistry {
    pub fn builder() -> ShapeRegistryBuilder {
        ShapeRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&'static IdShape> {
        self.shapes.get(name).copied()
    }

    fn require(&self, name: &str) -> Result<&'static IdShape, RegistryError> {
        self.get(name)
            .ok_or_else(|| RegistryError::UnknownShape(name.to_string()))
    }

    /// Parse `input` with the named shape
    pub fn parse(&self, name: &str, input: &str) -> Result<ParsedId, RegistryError> {
        Ok(self.require(name)?.parse(input)?)
    }

    /// Format values (declared order) with the named shape
    pub fn format<S: AsRef<str>>(&self, name: &str, values: &[S]) -> Result<String, RegistryError> {
        Ok(self.require(name)?.format(values)?)
    }

    /// Every registered shape that accepts `input`
    pub fn identify(&self, input: &str) -> Vec<ParsedId> {
        self.shapes
            .values()
            .filter_map(|shape| shape.parse(input).ok())
            .collect()
    }

    /// Shapes in name order
    pub fn iter(&self) -> impl Iterator<Item = &'static IdShape> + '_ {
        self.shapes.values().copied()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
