//! One quadtree node.

use glam::DVec2;

use crate::Patch;

/// Either a leaf holding an optional payload, or a branch owning exactly
/// four children ordered bottom-left, bottom-right, top-left, top-right.
#[derive(Clone, Debug)]
pub enum PatchNode<T> {
    Leaf { patch: Patch, payload: Option<T> },
    Branch { patch: Patch, children: Box<[PatchNode<T>; 4]> },
}

impl<T> PatchNode<T> {
    #[must_use]
    pub fn leaf(patch: Patch) -> Self {
        PatchNode::Leaf {
            patch,
            payload: None,
        }
    }

    #[must_use]
    pub fn patch(&self) -> &Patch {
        match self {
            PatchNode::Leaf { patch, .. } | PatchNode::Branch { patch, .. } => patch,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, PatchNode::Leaf { .. })
    }

    #[must_use]
    pub fn payload(&self) -> Option<&T> {
        match self {
            PatchNode::Leaf { payload, .. } => payload.as_ref(),
            PatchNode::Branch { .. } => None,
        }
    }

    #[must_use]
    pub fn children(&self) -> Option<&[PatchNode<T>; 4]> {
        match self {
            PatchNode::Branch { children, .. } => Some(children),
            PatchNode::Leaf { .. } => None,
        }
    }

    /// Split a leaf into four empty children. No-op on a branch or on a leaf
    /// already at `u8::MAX`; the leaf's payload is dropped. Returns whether
    /// anything changed.
    pub fn subdivide(&mut self) -> bool {
        let PatchNode::Leaf { patch, .. } = self else {
            return false;
        };
        let patch = *patch;
        let Some(children) = patch.try_children() else {
            return false;
        };
        *self = PatchNode::Branch {
            patch,
            children: Box::new(children.map(PatchNode::leaf)),
        };
        true
    }

    /// Collapse a branch back into an empty leaf. No-op on a leaf.
    pub fn merge(&mut self) -> bool {
        let PatchNode::Branch { patch, .. } = self else {
            return false;
        };
        *self = PatchNode::leaf(*patch);
        true
    }

    /// Split every leaf shallower than `max_level`. Returns the number of splits.
    pub fn subdivide_to(&mut self, max_level: u8) -> usize {
        let mut splits = 0;
        if self.patch().level < max_level && self.subdivide() {
            splits += 1;
        }
        if let PatchNode::Branch { children, .. } = self {
            for child in children.iter_mut() {
                splits += child.subdivide_to(max_level);
            }
        }
        splits
    }

    /// Merge every branch at `level` or deeper. Returns the number of merges.
    pub fn merge_above(&mut self, level: u8) -> usize {
        match self {
            PatchNode::Leaf { .. } => 0,
            PatchNode::Branch { patch, children } => {
                if patch.level >= level {
                    let nested: usize = children.iter().map(PatchNode::branch_count).sum();
                    self.merge();
                    1 + nested
                } else {
                    children.iter_mut().map(|c| c.merge_above(level)).sum()
                }
            }
        }
    }

    fn branch_count(&self) -> usize {
        match self {
            PatchNode::Leaf { .. } => 0,
            PatchNode::Branch { children, .. } => 1 + children.iter().map(PatchNode::branch_count).sum::<usize>(),
        }
    }

    /// Leaf containing `uv`, descending by quadrant.
    #[must_use]
    pub fn find_leaf(&self, uv: DVec2) -> &PatchNode<T> {
        match self {
            PatchNode::Leaf { .. } => self,
            PatchNode::Branch { patch, children } => children[patch.bounds.quadrant_of(uv)].find_leaf(uv),
        }
    }

    pub fn find_leaf_mut(&mut self, uv: DVec2) -> &mut PatchNode<T> {
        match self {
            PatchNode::Leaf { .. } => self,
            PatchNode::Branch { patch, children } => {
                let i = patch.bounds.quadrant_of(uv);
                children[i].find_leaf_mut(uv)
            }
        }
    }

    pub fn for_each_leaf(&self, f: &mut impl FnMut(&Patch, Option<&T>)) {
        match self {
            PatchNode::Leaf { patch, payload } => f(patch, payload.as_ref()),
            PatchNode::Branch { children, .. } => {
                for child in children.iter() {
                    child.for_each_leaf(f);
                }
            }
        }
    }

    pub fn for_each_leaf_mut(&mut self, f: &mut impl FnMut(&Patch, &mut Option<T>)) {
        match self {
            PatchNode::Leaf { patch, payload } => f(patch, payload),
            PatchNode::Branch { children, .. } => {
                for child in children.iter_mut() {
                    child.for_each_leaf_mut(f);
                }
            }
        }
    }

    /// Deepest level below this node.
    #[must_use]
    pub fn depth(&self) -> u8 {
        match self {
            PatchNode::Leaf { patch, .. } => patch.level,
            PatchNode::Branch { children, .. } => children.iter().map(PatchNode::depth).max().unwrap_or(0),
        }
    }
}
