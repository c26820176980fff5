//! Where a configuration's text came from

use super::json::parse_json;
use super::node::Node;
use crate::core::{LoggerError, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct ConfigurationSource {
    location: Option<PathBuf>,
    data: String,
    last_modified: Option<SystemTime>,
}

impl ConfigurationSource {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation("reading configuration", path.display().to_string(), e)
        })?;
        let last_modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        Ok(Self {
            location: Some(path.to_path_buf()),
            data,
            last_modified,
        })
    }

    /// A source with no backing file; it cannot be reloaded or watched
    pub fn from_json_str(json: impl Into<String>) -> Self {
        Self {
            location: None,
            data: json.into(),
            last_modified: None,
        }
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    pub fn is_reloadable(&self) -> bool {
        self.location.is_some()
    }

    /// Read the backing file again
    pub fn reload(&self) -> Result<Self> {
        match &self.location {
            Some(path) => Self::from_file(path),
            None => Err(LoggerError::config(
                "ConfigurationSource",
                "an in-memory source cannot be reloaded",
            )),
        }
    }

    pub fn parse(&self) -> Result<Node> {
        parse_json(&self.data)
    }
}
