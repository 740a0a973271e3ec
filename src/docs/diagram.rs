//! Mermaid architecture diagram built from the entity graph.
//!
//! Node ids are assigned in entity-id order, so the same analysis always
//! renders byte-identical diagram text.

use std::collections::{BTreeMap, BTreeSet};

use crate::constants::docs::MAX_DIAGRAM_EDGES;
use crate::types::{AnalysisResult, EntityType, RelationshipType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EdgeStyle {
    Solid,
    Dotted,
}

/// Render a `graph TD` diagram, or `None` when the graph has nothing to draw
pub fn mermaid_diagram(analysis: &AnalysisResult) -> Option<String> {
    let mut edges: BTreeSet<(String, String, EdgeStyle)> = BTreeSet::new();

    // api id -> controller entity id
    let controllers: BTreeMap<&str, &str> = analysis
        .relationships
        .iter()
        .filter(|r| r.relationship_type == RelationshipType::Exposes)
        .filter(|r| r.from.starts_with("controller:"))
        .map(|r| (r.to.as_str(), r.from.as_str()))
        .collect();

    for rel in &analysis.relationships {
        match rel.relationship_type {
            RelationshipType::DependsOn | RelationshipType::Imports => {
                edges.insert((rel.from.clone(), rel.to.clone(), EdgeStyle::Solid));
            }
            RelationshipType::Exposes if rel.from.starts_with("service:") => {
                if let Some(controller) = controllers.get(rel.to.as_str()) {
                    edges.insert((rel.from.clone(), controller.to_string(), EdgeStyle::Dotted));
                }
            }
            _ => {}
        }
    }

    let mut nodes: BTreeSet<&str> = BTreeSet::new();
    for entity in &analysis.entities {
        if matches!(entity.entity_type, EntityType::Service | EntityType::Controller) {
            nodes.insert(entity.id.as_str());
        }
    }
    let shown: Vec<_> = edges.iter().take(MAX_DIAGRAM_EDGES).collect();
    for (from, to, _) in &shown {
        nodes.insert(from.as_str());
        nodes.insert(to.as_str());
    }

    if nodes.is_empty() {
        return None;
    }

    let ids: BTreeMap<&str, String> = nodes
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, format!("n{}", i)))
        .collect();

    let mut out = String::from("graph TD\n");
    for (&entity_id, node) in &ids {
        let label = analysis
            .entity(entity_id)
            .map(|e| e.name.as_str())
            .unwrap_or_else(|| entity_id.split_once(':').map(|(_, k)| k).unwrap_or(entity_id));
        out.push_str(&format!("    {}{}\n", node, shape(entity_id, &escape_label(label))));
    }
    for (from, to, style) in &shown {
        if let (Some(a), Some(b)) = (ids.get(from.as_str()), ids.get(to.as_str())) {
            let arrow = match style {
                EdgeStyle::Solid => "-->",
                EdgeStyle::Dotted => "-.->",
            };
            out.push_str(&format!("    {} {} {}\n", a, arrow, b));
        }
    }
    if edges.len() > MAX_DIAGRAM_EDGES {
        out.push_str(&format!(
            "    %% {} more edges omitted\n",
            edges.len() - MAX_DIAGRAM_EDGES
        ));
    }
    Some(out)
}

fn shape(entity_id: &str, label: &str) -> String {
    if entity_id.starts_with("service:") {
        format!("[[\"{}\"]]", label)
    } else if entity_id.starts_with("controller:") {
        format!("{{{{\"{}\"}}}}", label)
    } else {
        format!("[\"{}\"]", label)
    }
}

fn escape_label(label: &str) -> String {
    label.replace('"', "#quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Entity, EntityDetails, Relationship, ServiceConvention};

    fn service(name: &str) -> Entity {
        Entity::new(
            format!("service:services/{}", name),
            name,
            format!("services/{}", name),
            EntityDetails::Service {
                root: format!("services/{}", name),
                convention: ServiceConvention::ServiceDirectory,
            },
        )
    }

    #[test]
    fn test_empty_graph_has_no_diagram() {
        assert!(mermaid_diagram(&AnalysisResult::default()).is_none());
    }

    #[test]
    fn test_service_dependency_diagram() {
        let analysis = AnalysisResult {
            entities: vec![service("billing"), service("orders")],
            relationships: vec![Relationship::new(
                "service:services/orders",
                "service:services/billing",
                RelationshipType::DependsOn,
            )],
            ..Default::default()
        };
        let diagram = mermaid_diagram(&analysis).unwrap();
        assert!(diagram.starts_with("graph TD\n"));
        assert!(diagram.contains("n0[[\"billing\"]]"));
        assert!(diagram.contains("n1 --> n0"));
        assert_eq!(Some(diagram), mermaid_diagram(&analysis));
    }

    #[test]
    fn test_import_edges_use_file_paths() {
        let analysis = AnalysisResult {
            relationships: vec![Relationship::new(
                "file:src/app.js",
                "file:src/db.js",
                RelationshipType::Imports,
            )],
            ..Default::default()
        };
        let diagram = mermaid_diagram(&analysis).unwrap();
        assert!(diagram.contains("n0[\"src/app.js\"]"));
        assert!(diagram.contains("n0 --> n1"));
    }
}
