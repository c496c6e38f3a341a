//! Author-declared variable mappings.

use std::collections::HashMap;

use crate::error::LayoutError;

use super::variable::VariableRole;

/// Associates a logical variable name with a role and, for attributes, a
/// vertex buffer slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableMapping {
    pub name: String,
    pub role: VariableRole,
    pub slot: Option<u32>,
}

impl VariableMapping {
    /// Per-vertex attribute read from `slot`.
    pub fn attribute(name: impl Into<String>, slot: u32) -> Self {
        Self {
            name: name.into(),
            role: VariableRole::Attribute,
            slot: Some(slot),
        }
    }

    /// Per-draw uniform.
    pub fn uniform(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: VariableRole::Uniform,
            slot: None,
        }
    }
}

/// An ordered, duplicate-free set of mappings.
///
/// Declaration order defines variable order for every layout built from it.
#[derive(Debug, Clone, Default)]
pub struct MappingSet {
    mappings: Vec<VariableMapping>,
    by_name: HashMap<String, usize>,
}

impl MappingSet {
    pub fn new(mappings: Vec<VariableMapping>) -> Result<Self, LayoutError> {
        let mut by_name = HashMap::with_capacity(mappings.len());
        for (i, mapping) in mappings.iter().enumerate() {
            if by_name.insert(mapping.name.clone(), i).is_some() {
                return Err(LayoutError::DuplicateMapping {
                    name: mapping.name.clone(),
                });
            }
        }
        Ok(Self { mappings, by_name })
    }

    pub fn get(&self, name: &str) -> Option<&VariableMapping> {
        self.by_name.get(name).map(|&i| &self.mappings[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableMapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
