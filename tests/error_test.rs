use std::time::Duration;

use runesmith::{GenerationMethod, JobId, Result, RunesmithError};

#[test]
fn test_error_display() {
    let err = RunesmithError::Backend {
        method: GenerationMethod::Mermaid,
        message: "renderer crashed".to_string(),
    };
    assert_eq!(err.to_string(), "mermaid failed: renderer crashed");
}

#[test]
fn exhausted_message_is_stable() {
    let err = RunesmithError::AllMethodsExhausted { attempts: 3 };
    assert_eq!(err.to_string(), "all generation methods failed (3 attempted)");
}

#[test]
fn job_not_found_names_the_id() {
    let id = JobId::new();
    let err = RunesmithError::JobNotFound(id);
    assert!(err.to_string().contains(&id.to_string()));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(RunesmithError::NoFallback)
    }
    assert!(returns_error().is_err());
}

// ============================================================================
// Per-attempt errors
// ============================================================================

#[test]
fn unsupported_names_method_and_type() {
    let err = RunesmithError::UnsupportedDiagramType {
        method: GenerationMethod::SvgTemplate,
        diagram_type: "sankey".into(),
    };
    assert_eq!(
        err.to_string(),
        "svg_template does not support diagram type 'sankey'"
    );
}

#[test]
fn timeout_names_method_and_deadline() {
    let err = RunesmithError::BackendTimeout {
        method: GenerationMethod::PythonChart,
        timeout: Duration::from_secs(30),
    };
    assert_eq!(err.to_string(), "python_chart timed out after 30s");
}

#[test]
fn missing_backend_names_method() {
    let err = RunesmithError::NoBackend(GenerationMethod::Custom);
    assert_eq!(err.to_string(), "no backend registered for custom");
}
