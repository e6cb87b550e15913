//! Diagram generation request types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::GenerationMethod;
use crate::{Result, RunesmithError};

/// Mermaid type names that keep their camelCase after normalization.
const CAMEL_CASE_TYPES: &[(&str, &str)] = &[
    ("erdiagram", "erDiagram"),
    ("quadrantchart", "quadrantChart"),
];

/// Fold a user-supplied diagram type into its canonical form.
///
/// Lowercases, trims, replaces spaces with underscores and restores the
/// known Mermaid camelCase names. Every fingerprint and routing decision
/// uses the folded form.
pub fn normalize_diagram_type(raw: &str) -> String {
    let folded = raw.trim().to_lowercase().replace(' ', "_");
    CAMEL_CASE_TYPES
        .iter()
        .find(|(lower, _)| *lower == folded)
        .map(|(_, camel)| (*camel).to_string())
        .unwrap_or(folded)
}

/// Palette generation method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorScheme {
    /// Single-color gradients.
    Monochromatic,
    /// Multiple harmonised colors.
    #[default]
    Complementary,
}

/// Visual theme configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagramTheme {
    pub primary_color: String,
    pub secondary_color: Option<String>,
    pub accent_color: Option<String>,
    pub color_scheme: ColorScheme,
    pub background_color: Option<String>,
    pub text_color: String,
    pub font_family: String,
    /// professional, playful, minimal or bold.
    pub style: String,
    pub use_smart_theming: bool,
}

impl Default for DiagramTheme {
    fn default() -> Self {
        Self {
            primary_color: "#3B82F6".to_string(),
            secondary_color: None,
            accent_color: None,
            color_scheme: ColorScheme::default(),
            background_color: Some("#FFFFFF".to_string()),
            text_color: "#1F2937".to_string(),
            font_family: "Inter, system-ui, sans-serif".to_string(),
            style: "professional".to_string(),
            use_smart_theming: true,
        }
    }
}

impl DiagramTheme {
    /// Check that every color is a hex or `rgb(...)` value.
    pub fn validate(&self) -> Result<()> {
        let colors = [
            Some(&self.primary_color),
            self.secondary_color.as_ref(),
            self.accent_color.as_ref(),
            self.background_color.as_ref(),
            Some(&self.text_color),
        ];
        for color in colors.into_iter().flatten() {
            if !(color.starts_with('#') || color.starts_with("rgb")) {
                return Err(RunesmithError::InvalidRequest(format!(
                    "invalid color format: {color}"
                )));
            }
        }
        Ok(())
    }
}

/// Generation constraints and preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagramConstraints {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// e.g. `"16:9"`.
    pub aspect_ratio: Option<String>,
    pub orientation: Option<String>,
    /// simple, medium or detailed.
    pub complexity: Option<String>,
    pub animation_enabled: bool,
}

impl Default for DiagramConstraints {
    fn default() -> Self {
        Self {
            max_width: Some(800),
            max_height: Some(600),
            aspect_ratio: None,
            orientation: Some("landscape".to_string()),
            complexity: Some("medium".to_string()),
            animation_enabled: false,
        }
    }
}

/// A single structured data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl DataPoint {
    /// Create a labelled data point with no value.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
            description: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Set the numeric value.
    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// An immutable, validated diagram generation request.
///
/// Construct via [`GenerationRequest::new`] or [`GenerationRequest::builder`].
/// The diagram type is normalized exactly once, at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    content: String,
    diagram_type: String,
    data_points: Vec<DataPoint>,
    theme: DiagramTheme,
    constraints: DiagramConstraints,
    session_id: Option<String>,
    user_id: Option<String>,
    correlation_id: Option<String>,
    requested_at: DateTime<Utc>,
    method: Option<GenerationMethod>,
}

impl GenerationRequest {
    /// Create a request with default theme and constraints.
    pub fn new(content: impl Into<String>, diagram_type: impl Into<String>) -> Result<Self> {
        Self::builder(content, diagram_type).build()
    }

    /// Start building a request.
    pub fn builder(
        content: impl Into<String>,
        diagram_type: impl Into<String>,
    ) -> GenerationRequestBuilder {
        GenerationRequestBuilder::new(content, diagram_type)
    }

    /// Trimmed free-text content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Normalized diagram type (see [`normalize_diagram_type`]).
    pub fn diagram_type(&self) -> &str {
        &self.diagram_type
    }

    pub fn data_points(&self) -> &[DataPoint] {
        &self.data_points
    }

    pub fn theme(&self) -> &DiagramTheme {
        &self.theme
    }

    pub fn constraints(&self) -> &DiagramConstraints {
        &self.constraints
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    /// Forced generation method, bypassing routing.
    pub fn forced_method(&self) -> Option<GenerationMethod> {
        self.method
    }
}

/// Builder for [`GenerationRequest`].
#[derive(Debug, Clone)]
pub struct GenerationRequestBuilder {
    content: String,
    diagram_type: String,
    data_points: Vec<DataPoint>,
    theme: DiagramTheme,
    constraints: DiagramConstraints,
    session_id: Option<String>,
    user_id: Option<String>,
    correlation_id: Option<String>,
    requested_at: Option<DateTime<Utc>>,
    method: Option<GenerationMethod>,
}

impl GenerationRequestBuilder {
    fn new(content: impl Into<String>, diagram_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            diagram_type: diagram_type.into(),
            data_points: Vec::new(),
            theme: DiagramTheme::default(),
            constraints: DiagramConstraints::default(),
            session_id: None,
            user_id: None,
            correlation_id: None,
            requested_at: None,
            method: None,
        }
    }

    pub fn data_points(mut self, points: Vec<DataPoint>) -> Self {
        self.data_points = points;
        self
    }

    pub fn data_point(mut self, point: DataPoint) -> Self {
        self.data_points.push(point);
        self
    }

    pub fn theme(mut self, theme: DiagramTheme) -> Self {
        self.theme = theme;
        self
    }

    pub fn constraints(mut self, constraints: DiagramConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn user_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Override the request timestamp (defaults to now).
    pub fn requested_at(mut self, at: DateTime<Utc>) -> Self {
        self.requested_at = Some(at);
        self
    }

    /// Force a generation method, skipping strategy selection.
    pub fn method(mut self, method: GenerationMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Validate and freeze the request.
    pub fn build(self) -> Result<GenerationRequest> {
        let content = self.content.trim().to_string();
        if content.is_empty() {
            return Err(RunesmithError::InvalidRequest(
                "content cannot be empty".into(),
            ));
        }
        let diagram_type = normalize_diagram_type(&self.diagram_type);
        if diagram_type.is_empty() {
            return Err(RunesmithError::InvalidRequest(
                "diagram_type must be a non-empty string".into(),
            ));
        }
        self.theme.validate()?;

        Ok(GenerationRequest {
            content,
            diagram_type,
            data_points: self.data_points,
            theme: self.theme,
            constraints: self.constraints,
            session_id: self.session_id,
            user_id: self.user_id,
            correlation_id: self.correlation_id,
            requested_at: self.requested_at.unwrap_or_else(Utc::now),
            method: self.method,
        })
    }
}
