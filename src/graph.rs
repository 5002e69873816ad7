//! Graph artifact discovery.
//!
//! The backend needs a compiled graph in the data directory. The primary
//! `<name>.osrm` file is preferred; without it the graph is still
//! launchable if an MLD partition (`.osrm.partition`) or a CH hierarchy
//! (`.osrm.hsgr`) is present.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphLocation {
    pub data_dir: PathBuf,
    pub basename: String,
}

impl GraphLocation {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>, basename: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            basename: basename.into(),
        }
    }

    /// `<data_dir>/<basename>.osrm`, the path handed to the backend.
    #[must_use]
    pub fn primary(&self) -> PathBuf {
        self.data_dir.join(format!("{}.osrm", self.basename))
    }

    #[must_use]
    pub fn partition(&self) -> PathBuf {
        self.data_dir.join(format!("{}.osrm.partition", self.basename))
    }

    #[must_use]
    pub fn hierarchy(&self) -> PathBuf {
        self.data_dir.join(format!("{}.osrm.hsgr", self.basename))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphAvailability {
    Primary,
    AlgorithmSpecific { partition: bool, hierarchy: bool },
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Check that the graph can be handed to the backend.
pub async fn check_availability(
    graph: &GraphLocation,
) -> Result<GraphAvailability, GatewayError> {
    let primary = graph.primary();
    if exists(&primary).await {
        return Ok(GraphAvailability::Primary);
    }

    let partition = exists(&graph.partition()).await;
    let hierarchy = exists(&graph.hierarchy()).await;
    if partition || hierarchy {
        tracing::warn!(
            graph = %primary.display(),
            partition,
            hierarchy,
            "base graph file missing, but found algorithm-specific files, proceeding"
        );
        return Ok(GraphAvailability::AlgorithmSpecific {
            partition,
            hierarchy,
        });
    }

    Err(GatewayError::GraphMissing { path: primary })
}
