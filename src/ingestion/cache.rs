use crate::{
    error::{Error, Result},
    structures::Ingestor,
};

#[derive(Debug)]
pub enum SourceLocation {
    Local(String),
    Remote(String),
}

pub fn resolve_path(input: &Ingestor) -> Result<String> {
    match input.location()? {
        SourceLocation::Local(path) => Ok(path),
        SourceLocation::Remote(url) => Err(Error::Config(format!(
            "Remote download not supported for '{}': {url}",
            input.label()
        ))),
    }
}
