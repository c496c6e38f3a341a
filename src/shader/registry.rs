//! Reflection of a compiled program into an ordered variable set.

use std::collections::{BTreeSet, HashMap};

use crate::error::LayoutError;

use super::mapping::MappingSet;
use super::variable::{ActiveVariable, CompiledProgram, ProgramId, ShaderVariable, VariableRole};

/// The active variables of one compiled program, in mapping declaration order.
#[derive(Debug, Clone)]
pub struct VariableRegistry {
    program: ProgramId,
    program_name: String,
    variables: Vec<ShaderVariable>,
    by_name: HashMap<String, usize>,
}

impl VariableRegistry {
    /// Reflect `program` against the caller's declared mappings.
    ///
    /// Every active variable must have a mapping with the same role. Mappings
    /// the program does not use are skipped.
    pub fn reflect(program: &CompiledProgram, mappings: &MappingSet) -> Result<Self, LayoutError> {
        let mut active: HashMap<&str, &ActiveVariable> = HashMap::with_capacity(program.active.len());
        for var in &program.active {
            let mapping = mappings
                .get(&var.name)
                .ok_or_else(|| LayoutError::UnmappedVariable {
                    program: program.name.clone(),
                    name: var.name.clone(),
                })?;
            if mapping.role != var.role {
                return Err(LayoutError::RoleMismatch {
                    name: var.name.clone(),
                    declared: mapping.role.as_str(),
                    reflected: var.role.as_str(),
                });
            }
            if active.insert(var.name.as_str(), var).is_some() {
                return Err(LayoutError::InvalidLayout(format!(
                    "Program '{}' reports active variable '{}' more than once",
                    program.name, var.name
                )));
            }
        }

        let mut variables = Vec::with_capacity(active.len());
        for mapping in mappings.iter() {
            match active.get(mapping.name.as_str()) {
                Some(var) => {
                    let index = variables.len();
                    variables.push(ShaderVariable::new(var, mapping.slot, index));
                }
                None => log::debug!(
                    "Program '{}' does not use declared variable '{}'",
                    program.name,
                    mapping.name
                ),
            }
        }

        let by_name = variables
            .iter()
            .enumerate()
            .map(|(i, v)| (v.name().to_string(), i))
            .collect();

        log::debug!(
            "Reflected program '{}': {} variables",
            program.name,
            variables.len()
        );

        Ok(Self {
            program: program.id,
            program_name: program.name.clone(),
            variables,
            by_name,
        })
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    /// All variables in declaration order.
    pub fn variables(&self) -> &[ShaderVariable] {
        &self.variables
    }

    pub fn attributes(&self) -> impl Iterator<Item = &ShaderVariable> {
        self.variables
            .iter()
            .filter(|v| v.role() == VariableRole::Attribute)
    }

    /// Uniforms backed by buffer storage.
    pub fn uniforms(&self) -> impl Iterator<Item = &ShaderVariable> {
        self.variables
            .iter()
            .filter(|v| v.role() == VariableRole::Uniform && !v.data_type().is_sampler())
    }

    pub fn samplers(&self) -> impl Iterator<Item = &ShaderVariable> {
        self.variables.iter().filter(|v| v.data_type().is_sampler())
    }

    pub fn by_name(&self, name: &str) -> Option<&ShaderVariable> {
        self.by_name.get(name).map(|&i| &self.variables[i])
    }

    /// Distinct vertex buffer slots consumed by the program.
    pub fn slots(&self) -> BTreeSet<u32> {
        self.attributes().filter_map(|v| v.slot()).collect()
    }
}
