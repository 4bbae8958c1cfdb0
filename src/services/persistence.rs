use std::{fs, path::Path};

use postcard::{from_bytes, to_allocvec};
use serde::{Serialize, de::DeserializeOwned};
use tracing::info;

use crate::{
    error::{Error, Result},
    structures::{CrimeData, RoadNetwork},
};

/// Writes `value` next to `path` and renames it into place, so a reader
/// never observes a half-written artifact.
pub fn write_artifact<T: Serialize>(value: &T, path: &Path, what: &'static str) -> Result<()> {
    let bytes = to_allocvec(value).map_err(|source| Error::Encode { what, source })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, &bytes).map_err(|e| Error::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// `MissingArtifact` when the file does not exist, `CacheCorrupted` when it
/// does not decode.
pub fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::MissingArtifact {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(Error::io(path, e)),
    };
    from_bytes(&bytes).map_err(|source| Error::CacheCorrupted {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_network(network: &RoadNetwork, path: &Path) -> Result<()> {
    write_artifact(network, path, "road network")?;
    info!(
        path = %path.display(),
        nodes = network.node_count(),
        edges = network.edge_count(),
        "Road network saved"
    );
    Ok(())
}

pub fn load_network(path: &Path) -> Result<RoadNetwork> {
    let network: RoadNetwork = read_artifact(path)?;
    info!(
        path = %path.display(),
        nodes = network.node_count(),
        edges = network.edge_count(),
        annotated = network.annotated_edge_count(),
        "Road network restored"
    );
    Ok(network)
}

pub fn save_crime_data(data: &CrimeData, path: &Path) -> Result<()> {
    write_artifact(data, path, "crime data")?;
    info!(path = %path.display(), locations = data.len(), "Crime data saved");
    Ok(())
}

pub fn load_crime_data(path: &Path) -> Result<CrimeData> {
    let data: CrimeData = read_artifact(path)?;
    info!(path = %path.display(), locations = data.len(), "Crime data restored");
    Ok(data)
}
