//! Static process catalogue: the ISO 9001 process flow, reference
//! standards, their links and the wizard vocabularies.

use std::sync::LazyLock;

use serde::Deserialize;

use super::{MapEdge, MapNode};

const CATALOG_JSON: &str = include_str!("../../data/management_map.json");

#[derive(Debug, Deserialize)]
pub struct ProcessColumn {
    /// management, customer, support or assessment.
    pub name: String,
    pub processes: Vec<MapNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub name: String,
    pub version: String,
    pub columns: Vec<ProcessColumn>,
    pub standards: Vec<MapNode>,
    pub edges: Vec<MapEdge>,
    pub roles_catalog: Vec<String>,
    pub locations_catalog: Vec<String>,
    pub activities_catalog: Vec<String>,
}

impl Catalog {
    /// Process nodes column by column, top to bottom.
    pub fn processes(&self) -> impl Iterator<Item = &MapNode> {
        self.columns.iter().flat_map(|c| c.processes.iter())
    }
}

static CATALOG: LazyLock<Catalog> =
    LazyLock::new(|| serde_json::from_str(CATALOG_JSON).expect("embedded process catalogue is valid"));

pub fn catalog() -> &'static Catalog {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::management_map::NodeType;
    use std::collections::HashSet;

    #[test]
    fn catalogue_shape() {
        let c = catalog();
        assert_eq!(c.version, "3.0.0");
        let columns: Vec<&str> = c.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(columns, vec!["management", "customer", "support", "assessment"]);
        assert_eq!(c.processes().count(), 31);
        assert_eq!(c.standards.len(), 2);
        assert_eq!(c.edges.len(), 24);
        assert!(c.edges.iter().all(|e| e.critical));
        assert!(c.standards.iter().all(|s| s.node_type == NodeType::ExternalStandard));
    }

    #[test]
    fn edges_reference_known_processes() {
        let c = catalog();
        let ids: HashSet<&str> = c.processes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), 31, "process ids are unique");
        for edge in &c.edges {
            assert!(ids.contains(edge.source.as_str()), "{}", edge.id);
            assert!(ids.contains(edge.target.as_str()), "{}", edge.id);
        }
    }
}
