//! The six face quadtrees of one planet.

use glam::DVec2;
use orbis_cubesphere::CubeFace;
use orbis_terrain::NoiseSynthesizer;

use crate::{Patch, PatchGeometry, PatchNode};

/// Six quadtrees, one per cube face, each rooted at the full face.
#[derive(Clone, Debug)]
pub struct PatchForest<T> {
    roots: [PatchNode<T>; 6],
}

impl<T> Default for PatchForest<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PatchForest<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            roots: CubeFace::ALL.map(|face| PatchNode::leaf(Patch::root(face))),
        }
    }

    #[must_use]
    pub fn roots(&self) -> &[PatchNode<T>; 6] {
        &self.roots
    }

    #[must_use]
    pub fn root(&self, face: CubeFace) -> &PatchNode<T> {
        &self.roots[face.index()]
    }

    /// Split every leaf until all reach `max_lod`. Returns the number of splits.
    pub fn subdivide_to(&mut self, max_lod: u8) -> usize {
        let splits: usize = self.roots.iter_mut().map(|r| r.subdivide_to(max_lod)).sum();
        if splits > 0 {
            tracing::debug!(splits, max_lod, "patch forest subdivided");
        }
        splits
    }

    /// Collapse every branch at `level` or deeper. Returns the number of merges.
    pub fn merge_above(&mut self, level: u8) -> usize {
        self.roots.iter_mut().map(|r| r.merge_above(level)).sum()
    }

    /// Every leaf patch, face by face in quadrant order.
    #[must_use]
    pub fn leaves(&self) -> Vec<Patch> {
        let mut out = Vec::new();
        self.for_each_leaf(|patch, _| out.push(*patch));
        out
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        let mut n = 0;
        self.for_each_leaf(|_, _| n += 1);
        n
    }

    /// Deepest level anywhere in the forest.
    #[must_use]
    pub fn depth(&self) -> u8 {
        self.roots.iter().map(PatchNode::depth).max().unwrap_or(0)
    }

    /// Leaf on `face` containing `(u, v)`, or `None` outside the unit square.
    #[must_use]
    pub fn find_leaf(&self, face: CubeFace, u: f64, v: f64) -> Option<&PatchNode<T>> {
        let uv = unit_uv(u, v)?;
        Some(self.roots[face.index()].find_leaf(uv))
    }

    pub fn find_leaf_mut(&mut self, face: CubeFace, u: f64, v: f64) -> Option<&mut PatchNode<T>> {
        let uv = unit_uv(u, v)?;
        Some(self.roots[face.index()].find_leaf_mut(uv))
    }

    pub fn for_each_leaf(&self, mut f: impl FnMut(&Patch, Option<&T>)) {
        for root in &self.roots {
            root.for_each_leaf(&mut f);
        }
    }

    pub fn for_each_leaf_mut(&mut self, mut f: impl FnMut(&Patch, &mut Option<T>)) {
        for root in &mut self.roots {
            root.for_each_leaf_mut(&mut f);
        }
    }
}

fn unit_uv(u: f64, v: f64) -> Option<DVec2> {
    let range = 0.0..=1.0;
    (range.contains(&u) && range.contains(&v)).then(|| DVec2::new(u, v))
}

impl PatchForest<PatchGeometry> {
    /// Build raw noise geometry for every leaf still missing it. Returns how
    /// many leaves were generated.
    pub fn generate_all(&mut self, base_resolution: u32, radius: f64, noise: &NoiseSynthesizer) -> usize {
        let mut generated = 0;
        self.for_each_leaf_mut(|patch, payload| {
            if payload.is_none() {
                *payload = Some(PatchGeometry::generate(patch, base_resolution, radius, noise));
                generated += 1;
            }
        });
        generated
    }
}

#[cfg(test)]
mod tests {
    use orbis_config::NoiseConfig;

    use super::*;
    use crate::patch_resolution;

    #[test]
    fn test_new_forest_has_six_full_roots() {
        let forest: PatchForest<()> = PatchForest::new();
        assert_eq!(forest.leaf_count(), 6);
        for (root, face) in forest.roots().iter().zip(CubeFace::ALL) {
            assert_eq!(root.patch().face, face);
            assert_eq!(root.patch().level, 0);
            assert_eq!(root.patch().bounds.area(), 1.0);
        }
    }

    #[test]
    fn test_max_lod_two_gives_96_leaves() {
        let noise = NoiseSynthesizer::new(&NoiseConfig {
            seed: 1337,
            ..NoiseConfig::default()
        });
        let mut forest: PatchForest<PatchGeometry> = PatchForest::new();
        forest.subdivide_to(2);
        assert_eq!(forest.leaf_count(), 6 * 4 * 4);
        assert_eq!(forest.generate_all(8, 1000.0, &noise), 96);

        forest.for_each_leaf(|patch, geometry| {
            let geometry = geometry.expect("every leaf generated");
            let n = patch_resolution(8, patch.level) as usize;
            assert_eq!(geometry.vertex_count(), (n + 1) * (n + 1));
        });
        assert_eq!(forest.generate_all(8, 1000.0, &noise), 0, "nothing left to build");
    }

    #[test]
    fn test_find_leaf_by_face_uv() {
        let mut forest: PatchForest<()> = PatchForest::new();
        forest.subdivide_to(1);
        let leaf = forest.find_leaf(CubeFace::NegZ, 0.75, 0.25).unwrap();
        assert_eq!(leaf.patch().face, CubeFace::NegZ);
        assert!(leaf.patch().bounds.contains(DVec2::new(0.75, 0.25)));
        assert!(forest.find_leaf(CubeFace::NegZ, 1.5, 0.0).is_none());
        assert!(forest.find_leaf(CubeFace::NegZ, f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_merge_above_restores_roots() {
        let mut forest: PatchForest<()> = PatchForest::new();
        forest.subdivide_to(2);
        assert_eq!(forest.merge_above(1), 24);
        assert_eq!(forest.leaf_count(), 24);
        assert_eq!(forest.depth(), 1);
        forest.merge_above(0);
        assert_eq!(forest.leaf_count(), 6);
    }

    #[test]
    fn test_leaves_are_disjoint_and_cover_faces() {
        let mut forest: PatchForest<()> = PatchForest::new();
        forest.subdivide_to(2);
        let leaves = forest.leaves();
        for face in CubeFace::ALL {
            let area: f64 = leaves
                .iter()
                .filter(|p| p.face == face)
                .map(|p| p.bounds.area())
                .sum();
            assert!((area - 1.0).abs() < 1e-12, "{face:?} covered {area}");
        }
    }
}
