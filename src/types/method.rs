//! Generation method identifiers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::RunesmithError;

/// A logical generation backend.
///
/// The set is closed: every backend registered with the
/// [`BackendRegistry`](crate::backends::BackendRegistry) is keyed by one of
/// these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    /// Template substitution into pre-built SVG layouts.
    SvgTemplate,
    /// LLM-driven Mermaid markup generation.
    Mermaid,
    /// Programmatic charting.
    PythonChart,
    /// Anything else plugged in by the host application.
    Custom,
}

impl GenerationMethod {
    /// All methods, in default priority order.
    pub const ALL: [GenerationMethod; 4] = [
        GenerationMethod::SvgTemplate,
        GenerationMethod::Mermaid,
        GenerationMethod::PythonChart,
        GenerationMethod::Custom,
    ];

    /// Wire name, e.g. `"svg_template"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMethod::SvgTemplate => "svg_template",
            GenerationMethod::Mermaid => "mermaid",
            GenerationMethod::PythonChart => "python_chart",
            GenerationMethod::Custom => "custom",
        }
    }

    /// Static duration estimate used before any latency has been observed.
    pub fn estimated_duration(&self) -> Duration {
        let millis = match self {
            GenerationMethod::SvgTemplate => 200,
            GenerationMethod::Mermaid => 500,
            GenerationMethod::PythonChart => 2000,
            GenerationMethod::Custom => 3000,
        };
        Duration::from_millis(millis)
    }

    /// Diagram types this method is known to handle.
    ///
    /// Backends may use this table in their `supports` implementation;
    /// the conductor itself only ever asks the backend.
    pub fn supported_types(&self) -> &'static [&'static str] {
        match self {
            GenerationMethod::SvgTemplate => &[
                "cycle_3_step",
                "cycle_4_step",
                "cycle_5_step",
                "pyramid_3_level",
                "pyramid_4_level",
                "pyramid_5_level",
                "venn_2_circle",
                "venn_3_circle",
                "honeycomb_3",
                "honeycomb_5",
                "honeycomb_7",
                "matrix_2x2",
                "matrix_3x3",
                "swot",
                "quadrant",
                "funnel",
                "timeline",
                "hub_spoke",
                "process_flow",
            ],
            GenerationMethod::Mermaid => &[
                "flowchart",
                "erDiagram",
                "journey",
                "gantt",
                "quadrantChart",
                "timeline",
                "kanban",
            ],
            GenerationMethod::PythonChart => &[
                "pie_chart",
                "bar_chart",
                "line_chart",
                "scatter_plot",
                "sankey",
                "network",
                "funnel",
                "quadrant",
            ],
            GenerationMethod::Custom => &[],
        }
    }

    /// Whether `diagram_type` (already normalized) is in this method's table.
    pub fn handles(&self, diagram_type: &str) -> bool {
        self.supported_types().contains(&diagram_type)
    }
}

impl fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMethod {
    type Err = RunesmithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg_template" => Ok(GenerationMethod::SvgTemplate),
            "mermaid" => Ok(GenerationMethod::Mermaid),
            "python_chart" => Ok(GenerationMethod::PythonChart),
            "custom" => Ok(GenerationMethod::Custom),
            other => Err(RunesmithError::InvalidRequest(format!(
                "unknown generation method '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names_case_insensitively() {
        assert_eq!(
            "SVG_TEMPLATE".parse::<GenerationMethod>().unwrap(),
            GenerationMethod::SvgTemplate
        );
        assert_eq!(
            " mermaid ".parse::<GenerationMethod>().unwrap(),
            GenerationMethod::Mermaid
        );
        assert!("matplotlib".parse::<GenerationMethod>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for method in GenerationMethod::ALL {
            assert_eq!(method.to_string().parse::<GenerationMethod>().unwrap(), method);
        }
    }

    #[test]
    fn supported_type_tables() {
        assert!(GenerationMethod::Mermaid.handles("erDiagram"));
        assert!(!GenerationMethod::Mermaid.handles("erdiagram"));
        assert!(GenerationMethod::PythonChart.handles("funnel"));
        assert!(GenerationMethod::SvgTemplate.handles("funnel"));
        assert!(!GenerationMethod::Custom.handles("funnel"));
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&GenerationMethod::PythonChart).unwrap();
        assert_eq!(json, "\"python_chart\"");
    }
}
