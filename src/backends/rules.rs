//! Built-in rule-based classifier.
//!
//! Matches the normalized diagram type against fixed tables, in order:
//! Mermaid names (including friendly aliases), SVG template types, chart
//! types. Anything unmatched is a classifier error, which the router turns
//! into its zero-confidence safe default.

use async_trait::async_trait;

use super::traits::{Classifier, ClassifierDecision};
use crate::types::{GenerationMethod, GenerationRequest};
use crate::{Result, RunesmithError};

/// Friendly and canonical names mapped to the Mermaid diagram they produce.
const MERMAID_ALIASES: &[(&str, &str)] = &[
    ("flowchart", "flowchart"),
    ("erDiagram", "erDiagram"),
    ("journey", "journey"),
    ("gantt", "gantt"),
    ("quadrantChart", "quadrantChart"),
    ("timeline", "timeline"),
    ("kanban", "kanban"),
    ("entity_relationship", "erDiagram"),
    ("er_diagram", "erDiagram"),
    ("database_schema", "erDiagram"),
    ("user_journey", "journey"),
    ("journey_map", "journey"),
    ("customer_journey", "journey"),
    ("gantt_chart", "gantt"),
    ("project_timeline", "gantt"),
    ("quadrant", "quadrantChart"),
    ("quadrant_matrix", "quadrantChart"),
    ("2x2_matrix", "quadrantChart"),
    ("kanban_board", "kanban"),
    ("task_board", "kanban"),
    ("process_flow", "flowchart"),
    ("workflow", "flowchart"),
    ("decision_tree", "flowchart"),
];

const MERMAID_CONFIDENCE: f64 = 0.9;
const TABLE_CONFIDENCE: f64 = 0.85;

/// Resolve a normalized diagram type to its Mermaid diagram name.
pub fn mermaid_type_for(diagram_type: &str) -> Option<&'static str> {
    MERMAID_ALIASES
        .iter()
        .find(|(alias, _)| *alias == diagram_type)
        .map(|(_, mermaid)| *mermaid)
}

/// Table-driven [`Classifier`]. Always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    fn decide(&self, diagram_type: &str) -> Option<ClassifierDecision> {
        if let Some(mermaid) = mermaid_type_for(diagram_type) {
            return Some(ClassifierDecision::new(
                GenerationMethod::Mermaid,
                MERMAID_CONFIDENCE,
                format!("Direct match to Mermaid {mermaid} diagram"),
            ));
        }
        if GenerationMethod::SvgTemplate.handles(diagram_type) {
            return Some(ClassifierDecision::new(
                GenerationMethod::SvgTemplate,
                TABLE_CONFIDENCE,
                format!("Direct match to SVG template {diagram_type}"),
            ));
        }
        if GenerationMethod::PythonChart.handles(diagram_type) {
            return Some(ClassifierDecision::new(
                GenerationMethod::PythonChart,
                TABLE_CONFIDENCE,
                format!("Direct match to chart type {diagram_type}"),
            ));
        }
        None
    }
}

#[async_trait]
impl Classifier for RuleClassifier {
    fn name(&self) -> &str {
        "rules"
    }

    async fn classify(&self, request: &GenerationRequest) -> Result<ClassifierDecision> {
        self.decide(request.diagram_type()).ok_or_else(|| {
            RunesmithError::Classifier(format!(
                "no rule matches diagram type '{}'",
                request.diagram_type()
            ))
        })
    }
}
