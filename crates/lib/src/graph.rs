//! Knowledge graph returned by the backend for a workspace, plus the small amount of
//! client-side shaping the viewer needs: per-concept relationship counts and node placement.
//!
//! Placement is a rendering concern; `GraphLayout` is the seam, `CircularLayout` the default.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Rejection;
use crate::gateway::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub concepts: Vec<Concept>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// Number of relationships touching a concept (either end).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptDegree {
    pub name: String,
    pub count: usize,
}

impl KnowledgeGraph {
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn concept(&self, id: &str) -> Option<&Concept> {
        self.concepts.iter().find(|c| c.id == id)
    }

    /// Relationship count per concept, in concept order. Endpoints that name no known concept
    /// are counted too, listed after the concepts under their raw id.
    pub fn concept_degrees(&self) -> Vec<ConceptDegree> {
        let mut order: Vec<&str> = self.concepts.iter().map(|c| c.id.as_str()).collect();
        let mut counts: HashMap<&str, usize> = order.iter().map(|id| (*id, 0)).collect();
        for rel in &self.relationships {
            for end in [rel.source.as_str(), rel.target.as_str()] {
                let count = counts.entry(end).or_insert_with(|| {
                    order.push(end);
                    0
                });
                *count += 1;
            }
        }
        order
            .into_iter()
            .map(|id| ConceptDegree {
                name: self
                    .concept(id)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| id.to_string()),
                count: counts.get(id).copied().unwrap_or(0),
            })
            .collect()
    }

    /// Relationships with at least one endpoint missing from `concepts`; viewers skip these.
    pub fn dangling_relationships(&self) -> Vec<&Relationship> {
        self.relationships
            .iter()
            .filter(|r| self.concept(&r.source).is_none() || self.concept(&r.target).is_none())
            .collect()
    }
}

/// Position of one concept node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePosition {
    pub concept_id: String,
    pub x: f64,
    pub y: f64,
}

/// Places concept nodes for rendering.
pub trait GraphLayout {
    fn layout(&self, graph: &KnowledgeGraph) -> Vec<NodePosition>;
}

/// Concepts evenly spaced on a circle, first concept at the top, clockwise.
#[derive(Debug, Clone, Copy)]
pub struct CircularLayout {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
}

impl Default for CircularLayout {
    fn default() -> Self {
        Self {
            center_x: 400.0,
            center_y: 300.0,
            radius: 220.0,
        }
    }
}

impl GraphLayout for CircularLayout {
    fn layout(&self, graph: &KnowledgeGraph) -> Vec<NodePosition> {
        let n = graph.concepts.len();
        graph
            .concepts
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if n == 1 {
                    return NodePosition {
                        concept_id: c.id.clone(),
                        x: self.center_x,
                        y: self.center_y,
                    };
                }
                let angle = std::f64::consts::TAU * i as f64 / n as f64;
                NodePosition {
                    concept_id: c.id.clone(),
                    x: self.center_x + self.radius * angle.sin(),
                    y: self.center_y - self.radius * angle.cos(),
                }
            })
            .collect()
    }
}

/// Why a knowledge graph could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error("{0}")]
    Gateway(#[from] GatewayError),
}
