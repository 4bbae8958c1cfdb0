use kdtree::KdTree;
use tracing::warn;

use crate::structures::{CrimeCounts, CrimeData, GridPoint, LatLng};

/// Nearest-neighbour lookup over aggregated crime locations.
///
/// Distances are great-circle meters. An index built from no records is
/// absent: every lookup misses.
pub struct CrimeIndex {
    tree: Option<KdTree<f64, GridPoint, [f64; 2]>>,
    data: CrimeData,
}

impl CrimeIndex {
    pub fn build(data: CrimeData) -> CrimeIndex {
        if data.is_empty() {
            warn!("No crime data available, crime index will not be built");
            return CrimeIndex { tree: None, data };
        }

        let mut tree = KdTree::new(2);
        for point in data.records().keys() {
            if let Err(e) = tree.add(point.lat_lng().as_point(), *point) {
                warn!("Skipping crime location {:?}: {:?}", point, e);
            }
        }

        CrimeIndex {
            tree: Some(tree),
            data,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.tree.is_none()
    }

    pub fn len(&self) -> usize {
        self.tree.as_ref().map_or(0, |t| t.size())
    }

    /// The query point is rounded to the stored precision before the lookup.
    pub fn nearest_neighbor(&self, lat: f64, lon: f64) -> Option<(GridPoint, f64)> {
        let tree = self.tree.as_ref()?;
        let query = GridPoint::round(lat, lon)?.lat_lng().as_point();

        let nearest = tree.nearest(&query, 1, &LatLng::distance).ok()?;
        nearest.first().map(|(dist, point)| (**point, *dist))
    }

    pub fn crimes_at(&self, point: &GridPoint) -> Option<&CrimeCounts> {
        self.data.get(point)
    }
}
