//! Nearest-neighbour index over mapped features.
//!
//! Features are projected onto the unit sphere and stored in an R-tree, so
//! Euclidean order in the tree equals great-circle order on the ground.
//! The index is immutable after construction and safe to share between
//! worker threads.

use std::collections::HashMap;

use log::warn;
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::error::{RecordKind, Result, StopMatchError};
use crate::geo_utils::{haversine_distance, to_unit_vector};
use crate::{GeoPoint, MappedFeature};

/// Unit-sphere position tagged with the feature's slot in `features`.
type IndexedPoint = GeomWithData<[f64; 3], usize>;

/// Read-only spatial index of mapped features.
#[derive(Debug)]
pub struct FeatureIndex {
    features: Vec<MappedFeature>,
    by_id: HashMap<String, usize>,
    tree: RTree<IndexedPoint>,
    skipped: usize,
}

impl FeatureIndex {
    /// Build the index. Features with invalid coordinates are kept for id
    /// lookups but never returned by `nearest`.
    pub fn new(mut features: Vec<MappedFeature>) -> Result<Self> {
        // Sorted input gives an identical tree for identical catalogs.
        features.sort_by(|a, b| a.id.cmp(&b.id));

        let mut by_id = HashMap::with_capacity(features.len());
        for (idx, feature) in features.iter().enumerate() {
            if by_id.insert(feature.id.clone(), idx).is_some() {
                return Err(StopMatchError::DuplicateId {
                    kind: RecordKind::MappedFeature,
                    id: feature.id.clone(),
                });
            }
        }

        let points: Vec<IndexedPoint> = features
            .iter()
            .enumerate()
            .filter(|(_, f)| f.location.is_valid())
            .map(|(idx, f)| IndexedPoint::new(to_unit_vector(&f.location), idx))
            .collect();

        let skipped = features.len() - points.len();
        if skipped > 0 {
            warn!("[FeatureIndex] {} features have invalid coordinates", skipped);
        }

        Ok(Self {
            features,
            by_id,
            tree: RTree::bulk_load(points),
            skipped,
        })
    }

    /// The `k` nearest features with their haversine distance in meters,
    /// nearest first. Equal distances are ordered by feature id, also at
    /// the k-th position.
    pub fn nearest(&self, point: &GeoPoint, k: usize) -> Vec<(&MappedFeature, f64)> {
        if k == 0 || !point.is_valid() {
            return Vec::new();
        }

        let query = to_unit_vector(point);
        let mut found: Vec<(usize, f64)> = Vec::with_capacity(k + 1);
        let mut cutoff = f64::INFINITY;
        for (item, chord_2) in self.tree.nearest_neighbor_iter_with_distance_2(&query) {
            if found.len() >= k && chord_2 > cutoff {
                break;
            }
            found.push((item.data, chord_2));
            if found.len() == k {
                cutoff = chord_2;
            }
        }

        let mut result: Vec<(&MappedFeature, f64)> = found
            .into_iter()
            .map(|(idx, _)| {
                let feature = &self.features[idx];
                (feature, haversine_distance(point, &feature.location))
            })
            .collect();
        result.sort_by(|(fa, da), (fb, db)| da.total_cmp(db).then_with(|| fa.id.cmp(&fb.id)));
        result.truncate(k);
        result
    }

    pub fn get(&self, id: &str) -> Option<&MappedFeature> {
        self.by_id.get(id).map(|&idx| &self.features[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// All features, sorted by id.
    pub fn features(&self) -> &[MappedFeature] {
        &self.features
    }

    /// Number of features excluded from spatial queries.
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
