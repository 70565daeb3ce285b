//! Resolved armature: bone indices, parent links, and rest data.

use std::collections::HashMap;

use rigforge_math::{DMat4, DVec3};

use crate::error::ResolveError;
use crate::scene::Armature;

/// Joint indices are serialized as 16-bit unsigned integers.
pub const MAX_BONES: usize = u16::MAX as usize + 1;

/// An armature with parent references resolved to list positions.
///
/// Bone order is the declaration order and is the joint order of the
/// serialized skin.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub ids: Vec<String>,
    pub parents: Vec<Option<usize>>,
    pub heads: Vec<DVec3>,
    pub root: usize,
    index: HashMap<String, usize>,
}

impl Skeleton {
    pub fn resolve(armature: &Armature) -> Result<Self, ResolveError> {
        let count = armature.bones.len();
        if count > MAX_BONES {
            return Err(ResolveError::TooManyBones(count));
        }

        let mut index = HashMap::with_capacity(count);
        for (i, bone) in armature.bones.iter().enumerate() {
            if index.insert(bone.id.clone(), i).is_some() {
                return Err(ResolveError::DuplicateBone(bone.id.clone()));
            }
        }

        let mut parents = Vec::with_capacity(count);
        for bone in &armature.bones {
            let parent = match &bone.parent {
                Some(parent_id) => match index.get(parent_id) {
                    Some(&p) => Some(p),
                    None => {
                        return Err(ResolveError::UnknownParent {
                            bone: bone.id.clone(),
                            parent: parent_id.clone(),
                        })
                    }
                },
                None => None,
            };
            parents.push(parent);
        }

        let roots: Vec<usize> = (0..count).filter(|&i| parents[i].is_none()).collect();
        if roots.len() != 1 {
            return Err(ResolveError::RootCount(roots.len()));
        }

        // Any chain longer than the bone count revisits a bone.
        for start in 0..count {
            let mut steps = 0;
            let mut cursor = parents[start];
            while let Some(p) = cursor {
                steps += 1;
                if steps > count {
                    return Err(ResolveError::ParentCycle(armature.bones[start].id.clone()));
                }
                cursor = parents[p];
            }
        }

        Ok(Self {
            ids: armature.bones.iter().map(|b| b.id.clone()).collect(),
            parents,
            heads: armature
                .bones
                .iter()
                .map(|b| DVec3::from_array(b.head))
                .collect(),
            root: roots[0],
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn bone_index(&self, id: &str) -> Result<usize, ResolveError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| ResolveError::UnknownBone(id.to_string()))
    }

    /// Rest offset of a bone from its parent's head (from the origin for the root).
    pub fn rest_offset(&self, bone: usize) -> DVec3 {
        match self.parents[bone] {
            Some(p) => self.heads[bone] - self.heads[p],
            None => self.heads[bone],
        }
    }

    /// Bones ordered so every parent precedes its children.
    ///
    /// Ties keep declaration order.
    pub fn topological_order(&self) -> Vec<usize> {
        let mut depth = vec![0usize; self.len()];
        for (i, d) in depth.iter_mut().enumerate() {
            let mut cursor = self.parents[i];
            while let Some(p) = cursor {
                *d += 1;
                cursor = self.parents[p];
            }
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| (depth[i], i));
        order
    }

    /// Inverse bind matrices: the inverse of a pure translation to each bone head.
    pub fn inverse_bind_matrices(&self) -> Vec<DMat4> {
        self.heads
            .iter()
            .map(|h| DMat4::from_translation(-*h))
            .collect()
    }
}
