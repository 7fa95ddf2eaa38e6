//! Management system process map.
//!
//! The map is the static process catalogue with controlled documents and
//! risks from the database appended as extra nodes. Links between nodes
//! drive the minimal path wizard and the breadcrumb trail in [`path`].

pub mod catalog;
pub mod path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::document::Document;
use crate::models::risk::Risk;

/// Node kinds. Declaration order is the document hierarchy used to order
/// wizard paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Policy,
    Procedure,
    WorkInstruction,
    Sop,
    RiskAssessment,
    Form,
    Record,
    Training,
    ExternalStandard,
}

impl NodeType {
    /// Estimated minutes to work through one node of this kind.
    pub fn minutes(self) -> u32 {
        match self {
            Self::Policy => 30,
            Self::Procedure => 60,
            Self::WorkInstruction | Self::Sop => 45,
            Self::RiskAssessment => 90,
            Self::Form => 15,
            Self::Record => 10,
            Self::Training => 120,
            Self::ExternalStandard => 0,
        }
    }

    /// Lower-case words, e.g. `"work instruction"`.
    pub fn humanize(self) -> &'static str {
        match self {
            Self::Policy => "policy",
            Self::Procedure => "procedure",
            Self::WorkInstruction => "work instruction",
            Self::Sop => "sop",
            Self::RiskAssessment => "risk assessment",
            Self::Form => "form",
            Self::Record => "record",
            Self::Training => "training",
            Self::ExternalStandard => "external standard",
        }
    }

    fn from_document_type(doc_type: &str) -> Self {
        match doc_type {
            "POLICY" => Self::Policy,
            "WORK_INSTRUCTION" => Self::WorkInstruction,
            "REGISTER" => Self::Record,
            _ => Self::Procedure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Green,
    Amber,
    Red,
    Draft,
    Archived,
}

impl NodeStatus {
    fn from_document_status(status: &str) -> Self {
        match status {
            "APPROVED" => Self::Green,
            "PENDING_APPROVAL" => Self::Amber,
            "ARCHIVED" => Self::Archived,
            _ => Self::Draft,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub title: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub iso_clauses: Vec<String>,
    #[serde(default)]
    pub location: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<NodeLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Relationship {
    Prerequisite,
    OutputToInput,
    Evidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub relationship: Relationship,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub critical: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMetadata {
    pub name: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementMap {
    pub metadata: MapMetadata,
    pub nodes: Vec<MapNode>,
    pub edges: Vec<MapEdge>,
    pub roles_catalog: Vec<String>,
    pub locations_catalog: Vec<String>,
    pub activities_catalog: Vec<String>,
}

/// Stable coordinates for nodes without a fixed slot, within
/// x in [100, 900) and y in [100, 700).
pub fn layout_position(id: &str) -> Position {
    let digest = Sha256::digest(id.as_bytes());
    let word = |i: usize| u32::from_be_bytes([digest[i], digest[i + 1], digest[i + 2], digest[i + 3]]);
    Position {
        x: f64::from(100 + word(0) % 800),
        y: f64::from(100 + word(4) % 600),
    }
}

fn strings(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn document_node(doc: &Document) -> MapNode {
    let id = format!("doc-{}", doc.id);
    MapNode {
        position: Some(layout_position(&id)),
        id,
        code: doc.code.clone(),
        title: doc.title.clone(),
        node_type: NodeType::from_document_type(&doc.doc_type),
        description: Some(format!("Document version {}", doc.version)),
        owner: doc.owner.clone(),
        version: Some(doc.version.clone()),
        status: Some(NodeStatus::from_document_status(&doc.status)),
        next_review_date: doc.next_review.map(|d| d.to_rfc3339()),
        iso_clauses: strings(&doc.iso_clauses),
        location: owned(&["Head Office"]),
        roles: owned(&["Quality Manager", "Document Controller"]),
        inputs: owned(&["Document Creation Request"]),
        outputs: owned(&["Controlled Document"]),
        tags: vec![doc.doc_type.to_lowercase(), "documentation".to_string()],
        link: doc.url.clone().map(|url| NodeLink {
            url: Some(url),
            file_path: None,
        }),
    }
}

pub fn risk_node(risk: &Risk) -> MapNode {
    let id = format!("risk-{}", risk.id);
    let category = risk.category.to_lowercase();
    MapNode {
        position: Some(layout_position(&id)),
        id,
        code: Some(format!("RISK-{:04}", risk.id)),
        title: risk.title.clone(),
        node_type: NodeType::RiskAssessment,
        description: Some(format!("Risk assessment for {category} risks")),
        owner: risk.owner.clone(),
        version: Some("1.0".to_string()),
        status: Some(if risk.status == "OPEN" {
            NodeStatus::Amber
        } else {
            NodeStatus::Green
        }),
        next_review_date: risk.review_date.map(|d| d.to_rfc3339()),
        iso_clauses: Vec::new(),
        location: owned(&["All Sites"]),
        roles: owned(&["Risk Manager", "Operations Manager"]),
        inputs: owned(&["Risk Identification"]),
        outputs: owned(&["Risk Register", "Control Measures"]),
        tags: vec!["risk".to_string(), category],
        link: None,
    }
}

/// Assemble the map: processes, then documents, risks and standards.
/// Catalogue edges whose endpoints are missing are dropped.
pub fn build(documents: &[Document], risks: &[Risk], generated_at: DateTime<Utc>) -> ManagementMap {
    let catalog = catalog::catalog();
    let mut nodes: Vec<MapNode> = catalog.processes().cloned().collect();
    nodes.extend(documents.iter().map(document_node));
    nodes.extend(risks.iter().map(risk_node));
    nodes.extend(catalog.standards.iter().cloned());

    let edges = catalog
        .edges
        .iter()
        .filter(|e| {
            nodes.iter().any(|n| n.id == e.source) && nodes.iter().any(|n| n.id == e.target)
        })
        .cloned()
        .collect();

    ManagementMap {
        metadata: MapMetadata {
            name: catalog.name.clone(),
            version: catalog.version.clone(),
            generated_at,
        },
        nodes,
        edges,
        roles_catalog: catalog.roles_catalog.clone(),
        locations_catalog: catalog.locations_catalog.clone(),
        activities_catalog: catalog.activities_catalog.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn document(id: i64, doc_type: &str, status: &str) -> Document {
        Document {
            id,
            code: Some(format!("DOC-{id}")),
            title: "Control of Documents".into(),
            doc_type: doc_type.into(),
            status: status.into(),
            version: "2.1".into(),
            owner: Some("Quality Manager".into()),
            next_review: None,
            iso_clauses: json!(["9001:7.5"]),
            url: Some("/documents/7".into()),
            active: true,
            create_uid: None,
            create_date: None,
            write_uid: None,
            write_date: None,
        }
    }

    fn risk(id: i64, status: &str) -> Risk {
        Risk {
            id,
            title: "Supplier failure".into(),
            context: None,
            category: "OPERATIONAL".into(),
            likelihood: 3,
            severity: 4,
            controls: json!([]),
            owner: None,
            review_date: None,
            status: status.into(),
            iso_refs: json!([]),
            active: true,
            create_uid: None,
            create_date: None,
            write_uid: None,
            write_date: None,
        }
    }

    #[test]
    fn document_mapping() {
        let node = document_node(&document(7, "REGISTER", "PENDING_APPROVAL"));
        assert_eq!(node.id, "doc-7");
        assert_eq!(node.node_type, NodeType::Record);
        assert_eq!(node.status, Some(NodeStatus::Amber));
        assert_eq!(node.description.as_deref(), Some("Document version 2.1"));
        assert_eq!(node.tags, vec!["register", "documentation"]);

        assert_eq!(document_node(&document(1, "FORM", "DRAFT")).node_type, NodeType::Procedure);
        assert_eq!(document_node(&document(1, "POLICY", "ARCHIVED")).status, Some(NodeStatus::Archived));
        assert_eq!(document_node(&document(1, "POLICY", "REJECTED")).status, Some(NodeStatus::Draft));
    }

    #[test]
    fn risk_mapping() {
        let node = risk_node(&risk(12, "OPEN"));
        assert_eq!(node.id, "risk-12");
        assert_eq!(node.code.as_deref(), Some("RISK-0012"));
        assert_eq!(node.status, Some(NodeStatus::Amber));
        assert_eq!(node.description.as_deref(), Some("Risk assessment for operational risks"));
        assert_eq!(risk_node(&risk(3, "TREATED")).status, Some(NodeStatus::Green));
    }

    #[test]
    fn layout_is_stable_and_bounded() {
        for id in ["doc-1", "doc-2", "risk-1", "risk-9999"] {
            let p = layout_position(id);
            assert_eq!(p, layout_position(id));
            assert!((100.0..900.0).contains(&p.x), "{id}: {}", p.x);
            assert!((100.0..700.0).contains(&p.y), "{id}: {}", p.y);
        }
    }

    #[test]
    fn build_orders_nodes_and_keeps_edges() {
        let now = Utc::now();
        let map = build(&[document(1, "POLICY", "APPROVED")], &[risk(2, "OPEN")], now);
        assert_eq!(map.nodes.len(), 31 + 1 + 1 + 2);
        assert_eq!(map.nodes[31].id, "doc-1");
        assert_eq!(map.nodes[32].id, "risk-2");
        assert_eq!(map.nodes[34].node_type, NodeType::ExternalStandard);
        assert_eq!(map.edges.len(), 24);

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["metadata"]["version"], "3.0.0");
        assert_eq!(json["nodes"][0]["type"], "policy");
        assert!(json["rolesCatalog"].as_array().is_some_and(|r| !r.is_empty()));
    }

    #[test]
    fn hierarchy_order() {
        let mut types = vec![NodeType::Form, NodeType::Policy, NodeType::RiskAssessment, NodeType::Procedure];
        types.sort();
        assert_eq!(
            types,
            vec![NodeType::Policy, NodeType::Procedure, NodeType::RiskAssessment, NodeType::Form]
        );
    }
}
