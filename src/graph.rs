//! Graph projection of a refined result.
//!
//! Objects become object nodes, two-ended facts become edges between them,
//! and one-legged facts become pendant fact nodes hanging off their single
//! endpoint. Meta-facts have no rendering here.
//!
//! Element ids are derived only from object and fact ids, so an external
//! renderer can keep its layout and selection across recomputation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{ActFact, ActObject, Leg, ObjectId, SearchResult};

/// Overrides the display label of an object node.
///
/// Called once per (fact, endpoint) pair, in fact id order. The first
/// `Some` wins. Closures implement this trait.
pub trait ObjectLabel: Send + Sync {
    fn label(&self, fact: &ActFact, object: &ActObject) -> Option<String>;
}

impl<F> ObjectLabel for F
where
    F: Fn(&ActFact, &ActObject) -> Option<String> + Send + Sync,
{
    fn label(&self, fact: &ActFact, object: &ActObject) -> Option<String> {
        self(fact, object)
    }
}

/// Never overrides; nodes are labelled with the object value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueLabel;

impl ObjectLabel for ValueLabel {
    fn label(&self, _fact: &ActFact, _object: &ActObject) -> Option<String> {
        None
    }
}

/// Labels an object with the value of a one-legged fact of a given type
/// attached to it, e.g. a `name` fact on a threat actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactTypeLabel {
    pub fact_type: String,
}

impl FactTypeLabel {
    #[must_use]
    pub fn new(fact_type: impl Into<String>) -> Self {
        Self {
            fact_type: fact_type.into(),
        }
    }
}

impl ObjectLabel for FactTypeLabel {
    fn label(&self, fact: &ActFact, object: &ActObject) -> Option<String> {
        if fact.fact_type.name != self.fact_type {
            return None;
        }
        match fact.single_leg() {
            Some((_, leg)) if leg.id == object.id => fact.value.clone(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectNode {
    pub id: String,
    pub label: String,
    pub object_type: String,
    pub value: String,
}

/// Pendant node for a one-legged fact. Its id is the fact id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactNode {
    pub id: String,
    pub label: String,
    pub fact_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// The fact this edge renders.
    pub fact_id: String,
    pub directed: bool,
}

/// One element of the projected graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GraphElement {
    ObjectNode(ObjectNode),
    FactNode(FactNode),
    Edge(Edge),
}

impl GraphElement {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::ObjectNode(n) => &n.id,
            Self::FactNode(n) => &n.id,
            Self::Edge(e) => &e.id,
        }
    }

    #[must_use]
    pub const fn is_node(&self) -> bool {
        !matches!(self, Self::Edge(_))
    }
}

/// Nodes and edges handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphModel {
    pub elements: Vec<GraphElement>,
}

impl GraphModel {
    pub fn nodes(&self) -> impl Iterator<Item = &GraphElement> {
        self.elements.iter().filter(|e| e.is_node())
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.elements.iter().filter_map(|e| match e {
            GraphElement::Edge(edge) => Some(edge),
            _ => None,
        })
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&GraphElement> {
        self.elements.iter().find(|e| e.id() == id)
    }
}

/// Kind of a selected graph element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionKind {
    Fact,
    Object,
}

/// The single selected graph element, kept outside the model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub id: String,
    pub kind: SelectionKind,
}

impl Selection {
    #[must_use]
    pub fn object(id: &ObjectId) -> Self {
        Self {
            id: id.as_str().to_string(),
            kind: SelectionKind::Object,
        }
    }

    #[must_use]
    pub fn fact(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: SelectionKind::Fact,
        }
    }
}

/// Id of the edge joining a pendant fact node to its endpoint.
#[must_use]
pub fn pendant_edge_id(fact: &ActFact, object: &ActObject) -> String {
    format!("{}->{}", fact.id, object.id)
}

fn object_labels(result: &SearchResult, rule: &dyn ObjectLabel) -> BTreeMap<ObjectId, String> {
    let mut labels = BTreeMap::new();
    for fact in result.facts.values() {
        for object in fact.objects() {
            if labels.contains_key(&object.id) {
                continue;
            }
            if let Some(label) = rule.label(fact, object) {
                labels.insert(object.id.clone(), label);
            }
        }
    }
    labels
}

/// Projects `result` into a graph model.
///
/// # Examples
///
/// ```
/// use factscope::{project, SearchResult, ValueLabel};
///
/// let model = project(&SearchResult::new(), &ValueLabel);
/// assert_eq!(model.node_count(), 0);
/// ```
#[must_use]
pub fn project(result: &SearchResult, rule: &dyn ObjectLabel) -> GraphModel {
    let mut labels = object_labels(result, rule);
    let mut elements = Vec::with_capacity(result.objects.len() + result.facts.len());

    for object in result.objects.values() {
        elements.push(GraphElement::ObjectNode(ObjectNode {
            id: object.id.as_str().to_string(),
            label: labels.remove(&object.id).unwrap_or_else(|| object.value.clone()),
            object_type: object.type_name().to_string(),
            value: object.value.clone(),
        }));
    }

    let mut skipped = 0usize;
    for fact in result.facts.values() {
        if fact.is_meta_fact() {
            continue;
        }
        let label = Some(fact.fact_type.name.clone());
        let directed = !fact.bidirectional_binding;

        if let (Some(source), Some(destination)) = (&fact.source_object, &fact.destination_object) {
            if !result.objects.contains_key(&source.id) || !result.objects.contains_key(&destination.id) {
                skipped += 1;
                continue;
            }
            elements.push(GraphElement::Edge(Edge {
                id: fact.id.as_str().to_string(),
                source: source.id.as_str().to_string(),
                target: destination.id.as_str().to_string(),
                label,
                fact_id: fact.id.as_str().to_string(),
                directed,
            }));
            continue;
        }

        let Some((leg, object)) = fact.single_leg() else {
            continue;
        };
        if !result.objects.contains_key(&object.id) {
            skipped += 1;
            continue;
        }
        let fact_node = fact.id.as_str().to_string();
        let object_node = object.id.as_str().to_string();
        let (source, target) = match leg {
            Leg::Source => (object_node, fact_node.clone()),
            Leg::Destination => (fact_node.clone(), object_node),
        };
        elements.push(GraphElement::FactNode(FactNode {
            id: fact_node.clone(),
            label: fact.fact_type.name.clone(),
            fact_type: fact.fact_type.name.clone(),
            value: fact.value.clone(),
        }));
        elements.push(GraphElement::Edge(Edge {
            id: pendant_edge_id(fact, object),
            source,
            target,
            label,
            fact_id: fact_node,
            directed,
        }));
    }

    let model = GraphModel { elements };
    debug!(
        nodes = model.node_count(),
        edges = model.edge_count(),
        skipped,
        "graph projected"
    );
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::model::{FactId, FactReference, NamedId};

    fn object(id: &str, type_name: &str) -> ActObject {
        ActObject::new(id, NamedId::new(format!("t-{type_name}"), type_name), format!("{id}-value"))
    }

    fn fact(id: &str, type_name: &str) -> ActFact {
        ActFact::new(id, NamedId::new(format!("ft-{type_name}"), type_name), Utc::now())
    }

    fn fixture() -> SearchResult {
        let x = object("x", "threatActor");
        let y = object("y", "report");
        let z = object("z", "tool");
        let facts = vec![
            fact("f1", "mentions").with_source(y.clone()).with_destination(x.clone()),
            fact("f2", "mentions").with_source(y.clone()).with_destination(x.clone()),
            fact("f3", "alias").with_source(x.clone()).with_destination(z.clone()).bidirectional(),
            fact("f4", "name").with_value("Comment Crew").with_source(x.clone()),
            fact("f5", "category").with_value("malware").with_destination(z.clone()),
            fact("f6", "observationTime").with_reference(FactReference {
                id: FactId::new("f1"),
                fact_type: NamedId::new("ft-mentions", "mentions"),
            }),
        ];
        SearchResult::from_parts(facts, vec![x, y, z])
    }

    #[test]
    fn test_projection_totals() {
        let result = fixture();
        let model = project(&result, &ValueLabel);
        // O = 3 objects, F = 3 two-ended facts, L = 2 one-legged facts.
        assert_eq!(model.node_count(), 3 + 2);
        assert_eq!(model.edge_count(), 3 + 2);
        assert!(model.get("f6").is_none());
    }

    #[test]
    fn test_parallel_edges_are_kept() {
        let model = project(&fixture(), &ValueLabel);
        let y_to_x: Vec<&Edge> = model
            .edges()
            .filter(|e| e.source == "y" && e.target == "x")
            .collect();
        assert_eq!(y_to_x.len(), 2);
        assert!(y_to_x.iter().all(|e| e.label.as_deref() == Some("mentions")));
    }

    #[test]
    fn test_one_legged_fact_becomes_pendant_node() {
        let model = project(&fixture(), &ValueLabel);

        let Some(GraphElement::FactNode(node)) = model.get("f4") else {
            panic!("expected a fact node for f4");
        };
        assert_eq!(node.label, "name");
        assert_eq!(node.value.as_deref(), Some("Comment Crew"));

        let pendant: Vec<&Edge> = model.edges().filter(|e| e.fact_id == "f4").collect();
        assert_eq!(pendant.len(), 1);
        assert_eq!(pendant[0].source, "x");
        assert_eq!(pendant[0].target, "f4");

        let inbound: Vec<&Edge> = model.edges().filter(|e| e.fact_id == "f5").collect();
        assert_eq!(inbound[0].source, "f5");
        assert_eq!(inbound[0].target, "z");
    }

    #[test]
    fn test_bidirectional_edge_is_undirected() {
        let model = project(&fixture(), &ValueLabel);
        let Some(GraphElement::Edge(edge)) = model.get("f3") else {
            panic!("expected an edge for f3");
        };
        assert!(!edge.directed);
        let Some(GraphElement::Edge(edge)) = model.get("f1") else {
            panic!("expected an edge for f1");
        };
        assert!(edge.directed);
    }

    #[test]
    fn test_ids_are_stable_across_recomputation() {
        let result = fixture();
        let first: Vec<String> = project(&result, &ValueLabel)
            .elements
            .iter()
            .map(|e| e.id().to_string())
            .collect();

        let mut reduced = result.clone();
        reduced.facts.remove(&FactId::new("f2"));
        let second = project(&reduced, &ValueLabel);
        assert!(second.elements.iter().all(|e| first.iter().any(|id| id == e.id())));
    }

    #[test]
    fn test_fact_type_label_override() {
        let model = project(&fixture(), &FactTypeLabel::new("name"));
        let Some(GraphElement::ObjectNode(actor)) = model.get("x") else {
            panic!("expected an object node for x");
        };
        assert_eq!(actor.label, "Comment Crew");

        let Some(GraphElement::ObjectNode(tool)) = model.get("z") else {
            panic!("expected an object node for z");
        };
        assert_eq!(tool.label, "z-value");
    }

    #[test]
    fn test_closure_label_rule() {
        let rule = |fact: &ActFact, _: &ActObject| (fact.fact_type.name == "category").then(|| "cat".to_string());
        let model = project(&fixture(), &rule);
        let Some(GraphElement::ObjectNode(tool)) = model.get("z") else {
            panic!("expected an object node for z");
        };
        assert_eq!(tool.label, "cat");
    }

    #[test]
    fn test_edge_to_missing_endpoint_is_skipped() {
        let mut result = fixture();
        result.objects.remove(&ObjectId::new("z"));
        let model = project(&result, &ValueLabel);
        assert!(model.get("f3").is_none());
        assert!(model.get("f5").is_none());
        assert_eq!(model.node_count(), 2 + 1);
    }

    #[test]
    fn test_element_serialization_is_tagged() {
        let model = project(&fixture(), &ValueLabel);
        let json = serde_json::to_value(&model).unwrap();
        let kinds: Vec<&str> = json["elements"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["kind"].as_str().unwrap())
            .collect();
        assert!(kinds.contains(&"object-node"));
        assert!(kinds.contains(&"fact-node"));
        assert!(kinds.contains(&"edge"));
    }
}
