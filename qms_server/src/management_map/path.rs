//! Minimal path wizard and breadcrumb trail over the process map.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{MapEdge, MapNode, NodeLink};

const MAX_BREADCRUMB_DEPTH: usize = 10;
const WORKDAY_MINUTES: u32 = 480;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PathRequest {
    pub roles: Vec<String>,
    pub activities: Vec<String>,
    pub locations: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: String,
    pub node_id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub order: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<NodeLink>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardResult {
    pub path: Vec<MapNode>,
    pub checklist: Vec<ChecklistItem>,
    pub estimated_time: String,
}

/// Case-insensitive: any wanted term is a substring of any candidate.
/// An empty filter matches everything.
fn matches<'a>(wanted: &[String], candidates: impl Iterator<Item = &'a str> + Clone) -> bool {
    wanted.is_empty()
        || wanted.iter().any(|w| {
            let w = w.to_lowercase();
            candidates.clone().any(|c| c.to_lowercase().contains(&w))
        })
}

fn is_relevant(node: &MapNode, req: &PathRequest) -> bool {
    matches(&req.roles, node.roles.iter().map(String::as_str))
        && matches(
            &req.activities,
            node.tags.iter().map(String::as_str).chain(std::iter::once(node.title.as_str())),
        )
        && matches(&req.locations, node.location.iter().map(String::as_str))
}

/// Follow the first unvisited successor from `start` until none is left.
fn walk<'a>(
    start: &'a MapNode,
    successors: &HashMap<&str, Vec<&str>>,
    by_id: &HashMap<&str, &'a MapNode>,
) -> Vec<&'a MapNode> {
    let mut path = vec![start];
    let mut visited: HashSet<&str> = HashSet::from([start.id.as_str()]);
    let mut current = start;
    loop {
        let next = successors
            .get(current.id.as_str())
            .into_iter()
            .flatten()
            .filter(|id| !visited.contains(**id))
            .find_map(|id| by_id.get(id).copied());
        let Some(next) = next else {
            return path;
        };
        visited.insert(next.id.as_str());
        path.push(next);
        current = next;
    }
}

pub fn minimal_path(nodes: &[MapNode], edges: &[MapEdge], req: &PathRequest) -> WizardResult {
    let by_id: HashMap<&str, &MapNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        successors
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }
    let has_critical_input: HashSet<&str> = edges
        .iter()
        .filter(|e| e.critical)
        .map(|e| e.target.as_str())
        .collect();

    let mut paths: Vec<Vec<&MapNode>> = nodes
        .iter()
        .filter(|n| is_relevant(n, req) && !has_critical_input.contains(n.id.as_str()))
        .map(|start| walk(start, &successors, &by_id))
        .collect();

    // Longest first, then by the kind of the first node.
    paths.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].node_type.cmp(&b[0].node_type)));

    let mut seen = HashSet::new();
    let mut merged: Vec<MapNode> = paths
        .into_iter()
        .flatten()
        .filter(|n| seen.insert(n.id.as_str()))
        .cloned()
        .collect();
    merged.sort_by_key(|n| n.node_type);

    let checklist = merged
        .iter()
        .enumerate()
        .map(|(i, node)| ChecklistItem {
            id: node.id.clone(),
            node_id: node.id.clone(),
            title: node.title.clone(),
            description: format!("Complete {}: {}", node.node_type.humanize(), node.title),
            completed: false,
            order: i + 1,
            link: node.link.clone(),
        })
        .collect();

    WizardResult {
        estimated_time: estimate_time(&merged),
        path: merged,
        checklist,
    }
}

pub fn estimate_time(path: &[MapNode]) -> String {
    let total: u32 = path.iter().map(|n| n.node_type.minutes()).sum();
    if total < 60 {
        format!("{total} minutes")
    } else if total < WORKDAY_MINUTES {
        match total % 60 {
            0 => format!("{}h", total / 60),
            m => format!("{}h {m}m", total / 60),
        }
    } else {
        let days = total.div_ceil(WORKDAY_MINUTES);
        format!("{days} day{}", if days > 1 { "s" } else { "" })
    }
}

/// Upstream chain of critical links ending at `node_id`, roots first.
/// `None` when the node is not on the map.
pub fn breadcrumbs(nodes: &[MapNode], edges: &[MapEdge], node_id: &str) -> Option<Vec<MapNode>> {
    let start = nodes.iter().find(|n| n.id == node_id)?;
    let mut trail = Vec::new();
    let mut visited = HashSet::new();
    collect_upstream(start, nodes, edges, 0, &mut visited, &mut trail);
    trail.reverse();
    Some(trail)
}

fn collect_upstream<'a>(
    node: &'a MapNode,
    nodes: &'a [MapNode],
    edges: &[MapEdge],
    depth: usize,
    visited: &mut HashSet<&'a str>,
    trail: &mut Vec<MapNode>,
) {
    if depth > MAX_BREADCRUMB_DEPTH || !visited.insert(node.id.as_str()) {
        return;
    }
    trail.push(node.clone());
    for edge in edges.iter().filter(|e| e.critical && e.target == node.id) {
        if let Some(upstream) = nodes.iter().find(|n| n.id == edge.source) {
            collect_upstream(upstream, nodes, edges, depth + 1, visited, trail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::management_map::{catalog, NodeType, Relationship};
    use pretty_assertions::assert_eq;

    fn node(id: &str, node_type: NodeType, roles: &[&str]) -> MapNode {
        MapNode {
            id: id.into(),
            code: None,
            title: id.replace('-', " "),
            node_type,
            description: None,
            owner: None,
            version: None,
            status: None,
            next_review_date: None,
            iso_clauses: Vec::new(),
            location: vec!["Head Office".into()],
            roles: roles.iter().map(|r| r.to_string()).collect(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            tags: Vec::new(),
            link: None,
            position: None,
        }
    }

    fn edge(source: &str, target: &str) -> MapEdge {
        MapEdge {
            id: format!("{source}-{target}"),
            source: source.into(),
            target: target.into(),
            relationship: Relationship::Prerequisite,
            label: None,
            critical: true,
        }
    }

    fn ids(path: &[MapNode]) -> Vec<&str> {
        path.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn walks_from_roots_and_orders_by_hierarchy() {
        let nodes = vec![
            node("record-log", NodeType::Record, &["Clerk"]),
            node("quality-policy", NodeType::Policy, &["Quality Manager"]),
            node("control-procedure", NodeType::Procedure, &["Quality Manager"]),
            node("inspection-form", NodeType::Form, &["Inspector"]),
        ];
        let edges = vec![
            edge("quality-policy", "control-procedure"),
            edge("control-procedure", "record-log"),
            edge("control-procedure", "inspection-form"),
        ];
        let result = minimal_path(&nodes, &edges, &PathRequest::default());
        assert_eq!(
            ids(&result.path),
            vec!["quality-policy", "control-procedure", "inspection-form", "record-log"]
        );
        assert_eq!(result.checklist[0].order, 1);
        assert_eq!(result.checklist[0].description, "Complete policy: quality policy");
        assert_eq!(result.checklist[3].order, 4);
        // 30 + 60 + 15 + 10
        assert_eq!(result.estimated_time, "1h 55m");
    }

    #[test]
    fn role_filter_is_case_insensitive_substring() {
        let nodes = vec![
            node("quality-policy", NodeType::Policy, &["Quality Manager"]),
            node("site-induction", NodeType::Training, &["HSE Officer"]),
        ];
        let req = PathRequest {
            roles: vec!["hse".into()],
            ..PathRequest::default()
        };
        let result = minimal_path(&nodes, &[], &req);
        assert_eq!(ids(&result.path), vec!["site-induction"]);
        assert_eq!(
            result.checklist[0].description,
            "Complete training: site induction"
        );
    }

    #[test]
    fn no_match_gives_empty_path() {
        let nodes = vec![node("quality-policy", NodeType::Policy, &["Quality Manager"])];
        let req = PathRequest {
            locations: vec!["Offshore".into()],
            ..PathRequest::default()
        };
        let result = minimal_path(&nodes, &[], &req);
        assert!(result.path.is_empty());
        assert_eq!(result.estimated_time, "0 minutes");
    }

    #[test]
    fn time_estimates() {
        let of = |types: &[NodeType]| -> String {
            let path: Vec<MapNode> = types.iter().map(|t| node("n", *t, &[])).collect();
            estimate_time(&path)
        };
        assert_eq!(of(&[NodeType::Policy, NodeType::Form]), "45 minutes");
        assert_eq!(of(&[NodeType::Procedure]), "1h");
        assert_eq!(of(&[NodeType::Training, NodeType::Policy]), "2h 30m");
        assert_eq!(of(&[NodeType::Training; 4]), "1 day");
        assert_eq!(of(&[NodeType::Training; 5]), "2 days");
    }

    #[test]
    fn breadcrumbs_walk_upstream_and_survive_cycles() {
        let nodes = vec![
            node("a", NodeType::Policy, &[]),
            node("b", NodeType::Procedure, &[]),
            node("c", NodeType::Record, &[]),
        ];
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "a")];
        let trail = breadcrumbs(&nodes, &edges, "c").unwrap();
        assert_eq!(ids(&trail), vec!["a", "b", "c"]);
        assert!(breadcrumbs(&nodes, &edges, "missing").is_none());
    }

    #[test]
    fn breadcrumb_depth_is_bounded() {
        let nodes: Vec<MapNode> = (0..20)
            .map(|i| node(&format!("n{i}"), NodeType::Procedure, &[]))
            .collect();
        let edges: Vec<MapEdge> = (0..19)
            .map(|i| edge(&format!("n{i}"), &format!("n{}", i + 1)))
            .collect();
        let trail = breadcrumbs(&nodes, &edges, "n19").unwrap();
        assert_eq!(trail.len(), MAX_BREADCRUMB_DEPTH + 1);
        assert_eq!(trail.last().map(|n| n.id.as_str()), Some("n19"));
    }

    #[test]
    fn catalogue_wizard_follows_process_chain() {
        let c = catalog::catalog();
        let nodes: Vec<MapNode> = c.processes().cloned().collect();
        let result = minimal_path(&nodes, &c.edges, &PathRequest::default());
        let path = ids(&result.path);
        assert!(path.contains(&"training-competence"));
        assert!(path.contains(&"continual-improvement"));
        // only reachable through its own incoming link
        assert!(!path.contains(&"management-system-planning"));
        assert!(result.path.windows(2).all(|w| w[0].node_type <= w[1].node_type));
    }
}
