use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use osmpbf::{Element, ElementReader, Way};
use tracing::info;

use crate::{
    error::{Error, Result},
    structures::{LatLng, NodeData, NodeID, RoadNetwork},
};

/// Builds a walkable street network from an OSM extract.
///
/// Every consecutive pair of way nodes becomes a pair of opposite edges,
/// since pedestrians are not bound by one-way restrictions.
pub fn load_pbf_file(pbf_path: &Path, g: &mut RoadNetwork) -> Result<()> {
    let osm_error = |source| Error::Osm {
        path: pbf_path.to_path_buf(),
        source,
    };

    let reader = ElementReader::from_path(pbf_path).map_err(osm_error)?;
    let mut valid_node_ids = HashSet::new();
    let mut valid_way_ids = HashSet::<i64>::new();

    reader
        .for_each(|element| {
            if let Element::Way(w) = element {
                if !validate_way(&w) {
                    return;
                }

                valid_way_ids.insert(w.id());
                valid_node_ids.extend(w.refs());
            }
        })
        .map_err(osm_error)?;

    let mut id_mapper = HashMap::<i64, NodeID>::with_capacity(valid_node_ids.len());
    let reader = ElementReader::from_path(pbf_path).map_err(osm_error)?;
    reader
        .for_each(|element| {
            let (id, lat, lon) = match element {
                Element::DenseNode(n) => (n.id(), n.lat(), n.lon()),
                Element::Node(n) => (n.id(), n.lat(), n.lon()),
                _ => return,
            };
            if !valid_node_ids.contains(&id) {
                return;
            }
            let node_id = g.add_node(NodeData {
                eid: id,
                lat_lng: LatLng::new(lat, lon),
            });
            id_mapper.insert(id, node_id);
        })
        .map_err(osm_error)?;

    let reader = ElementReader::from_path(pbf_path).map_err(osm_error)?;

    let mut n = 0usize;
    let mut failed = 0usize;

    reader
        .for_each(|element| {
            if let Element::Way(w) = element {
                if !valid_way_ids.contains(&w.id()) {
                    return;
                }
                let node_ids = w.refs().collect::<Vec<_>>();

                for pair in node_ids.windows(2) {
                    n += 1;
                    if !insert_from_osm_ids(g, &id_mapper, pair[0], pair[1]) {
                        failed += 1;
                    }
                }
            }
        })
        .map_err(osm_error)?;

    info!(
        nodes = g.node_count(),
        edges = g.edge_count(),
        "Imported {} segments out of {} ({}%)",
        n - failed,
        n,
        if n == 0 { 100 } else { (n - failed) * 100 / n }
    );

    Ok(())
}

fn validate_way(way: &Way) -> bool {
    let highway = way.tags().find(|tag| tag.0 == "highway").map(|tag| tag.1);
    if !matches!(
        highway,
        Some(
            "primary"
                | "secondary"
                | "tertiary"
                | "unclassified"
                | "residential"
                | "service"
                | "living_street"
                | "primary_link"
                | "secondary_link"
                | "tertiary_link"
                | "footway"
                | "cycleway"
                | "bridleway"
                | "path"
                | "track"
                | "pedestrian"
                | "steps"
                | "corridor"
        )
    ) {
        return false;
    }

    let access = way.tags().find(|tag| tag.0 == "access").map(|tag| tag.1);
    if matches!(access, Some("no" | "private" | "agricultural" | "forestry")) {
        return false;
    }

    let foot = way.tags().find(|tag| tag.0 == "foot").map(|tag| tag.1);
    !matches!(foot, Some("no" | "private"))
}

fn insert_from_osm_ids(
    g: &mut RoadNetwork,
    id_mapper: &HashMap<i64, NodeID>,
    from: i64,
    to: i64,
) -> bool {
    let (Some(&from_id), Some(&to_id)) = (id_mapper.get(&from), id_mapper.get(&to)) else {
        return false;
    };
    if from_id == to_id {
        return false;
    }
    let Some(distance) = g.nodes_distance(from_id, to_id) else {
        return false;
    };

    g.add_edge(from_id, to_id, distance, None).is_ok()
        && g.add_edge(to_id, from_id, distance, None).is_ok()
}
