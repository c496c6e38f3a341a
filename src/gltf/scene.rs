//! Node hierarchy traversal.

use glam::{Mat4, Quat, Vec3};

use crate::error::FormatError;

use super::document::{Document, Node};

/// A mesh instance placed in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshInstance {
    pub node: usize,
    pub mesh: usize,
    pub world: Mat4,
}

impl Node {
    /// Local transform, from `matrix` if present, else from TRS.
    pub fn local_transform(&self) -> Mat4 {
        if let Some(matrix) = self.matrix {
            return Mat4::from_cols_array(&matrix);
        }
        let translation = self.translation.map_or(Vec3::ZERO, Vec3::from_array);
        let rotation = self.rotation.map_or(Quat::IDENTITY, Quat::from_array);
        let scale = self.scale.map_or(Vec3::ONE, Vec3::from_array);
        Mat4::from_scale_rotation_translation(scale, rotation, translation)
    }
}

impl Document {
    /// Scene to show by default: `scene`, else the first one.
    pub fn default_scene(&self) -> Option<usize> {
        self.scene.or_else(|| (!self.scenes.is_empty()).then_some(0))
    }

    /// World transforms of every mesh-carrying node reachable from `scene`.
    pub fn world_transforms(&self, scene: usize) -> Result<Vec<MeshInstance>, FormatError> {
        let scene = self.scenes.get(scene).ok_or(FormatError::MissingReference {
            kind: "scene",
            index: scene,
        })?;

        let mut instances = Vec::new();
        let mut visiting = vec![false; self.nodes.len()];
        for &root in &scene.nodes {
            self.visit(root, Mat4::IDENTITY, &mut visiting, &mut instances)?;
        }
        Ok(instances)
    }

    fn visit(
        &self,
        index: usize,
        parent: Mat4,
        visiting: &mut [bool],
        instances: &mut Vec<MeshInstance>,
    ) -> Result<(), FormatError> {
        let node = self.nodes.get(index).ok_or(FormatError::MissingReference {
            kind: "node",
            index,
        })?;
        if visiting[index] {
            return Err(FormatError::MalformedNode {
                node: index,
                reason: "node hierarchy contains a cycle".into(),
            });
        }
        visiting[index] = true;

        let world = parent * node.local_transform();
        if let Some(mesh) = node.mesh {
            instances.push(MeshInstance {
                node: index,
                mesh,
                world,
            });
        }
        for &child in &node.children {
            self.visit(child, world, visiting, instances)?;
        }

        visiting[index] = false;
        Ok(())
    }
}
