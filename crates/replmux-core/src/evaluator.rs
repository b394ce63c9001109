//! Expression evaluation
//!
//! The console does not evaluate anything itself; it hands expressions to an
//! [`EvaluationBackend`] (normally the debug adapter of the session) and
//! fills the result into the expression element once the backend answers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

use replmux_session::SessionId;

use crate::model::ReplModel;
use crate::Result;

/// Stack frame an expression is evaluated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrameRef {
    pub thread_id: u64,
    pub frame_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
    /// Session the expression was typed into
    pub session: SessionId,
    pub frame: Option<StackFrameRef>,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub value: String,
    pub type_name: Option<String>,
    /// Handle for lazily expanding children
    pub payload: Option<serde_json::Value>,
}

impl EvaluationResult {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            type_name: None,
            payload: None,
        }
    }
}

#[async_trait]
pub trait EvaluationBackend: Send + Sync {
    async fn evaluate(&self, request: EvaluationRequest) -> anyhow::Result<EvaluationResult>;
}

#[derive(Clone)]
pub struct ExpressionEvaluator {
    backend: Arc<dyn EvaluationBackend>,
}

impl ExpressionEvaluator {
    pub fn new(backend: Arc<dyn EvaluationBackend>) -> Self {
        Self { backend }
    }

    /// Append the expression to `model` right away and return a future that
    /// evaluates it and fills in the result.
    ///
    /// A failed evaluation is shown in the console as an error value and is
    /// not an error of this call. No lock is held while the backend runs.
    pub fn evaluate_into(
        &self,
        model: &ReplModel,
        request: EvaluationRequest,
    ) -> Result<impl Future<Output = ()> + Send + 'static> {
        let id = model.add_expression_input(&request.expression)?;

        tracing::debug!(
            session_id = %request.session,
            expression_id = %id,
            expression = %request.expression,
            "Evaluating expression"
        );

        let backend = Arc::clone(&self.backend);
        let model = model.clone();

        Ok(async move {
            let session = request.session;
            let outcome = backend.evaluate(request).await;

            if let Err(e) = &outcome {
                tracing::warn!(session_id = %session, expression_id = %id, error = %e, "Evaluation failed");
            }

            model.resolve_expression(&id, |expression| match outcome {
                Ok(result) => expression.resolve(result.value, result.type_name, result.payload),
                Err(e) => expression.fail(e.to_string()),
            });
        })
    }
}

impl std::fmt::Debug for ExpressionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionEvaluator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replmux_output::{Element, Severity, TreeOptions};

    struct FixedBackend;

    #[async_trait]
    impl EvaluationBackend for FixedBackend {
        async fn evaluate(&self, request: EvaluationRequest) -> anyhow::Result<EvaluationResult> {
            match request.expression.as_str() {
                "answer" => Ok(EvaluationResult {
                    value: "42".to_string(),
                    type_name: Some("number".to_string()),
                    payload: None,
                }),
                other => anyhow::bail!("{} is not defined", other),
            }
        }
    }

    fn request(expression: &str) -> EvaluationRequest {
        EvaluationRequest {
            session: SessionId(0),
            frame: None,
            expression: expression.to_string(),
        }
    }

    #[tokio::test]
    async fn test_successful_evaluation() {
        let model = ReplModel::new(TreeOptions::default());
        let evaluator = ExpressionEvaluator::new(Arc::new(FixedBackend));

        evaluator.evaluate_into(&model, request("answer")).unwrap().await;

        let elements = model.elements();
        let expression = elements[0].as_expression().unwrap();
        assert_eq!(expression.input, "answer");
        assert_eq!(expression.value.as_deref(), Some("42"));
        assert_eq!(expression.type_name.as_deref(), Some("number"));
        assert!(expression.available);
    }

    #[tokio::test]
    async fn test_failed_evaluation_becomes_error_value() {
        let model = ReplModel::new(TreeOptions::default());
        let evaluator = ExpressionEvaluator::new(Arc::new(FixedBackend));

        evaluator.evaluate_into(&model, request("nope")).unwrap().await;

        match &model.elements()[0] {
            Element::Expression(expression) => {
                assert_eq!(expression.value.as_deref(), Some("nope is not defined"));
                assert_eq!(expression.severity, Severity::Error);
                assert!(!expression.available);
            }
            other => panic!("Expected expression, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pending_line_sealed_before_expression() {
        let model = ReplModel::new(TreeOptions::default());
        let evaluator = ExpressionEvaluator::new(Arc::new(FixedBackend));

        model
            .append(crate::OutputData::text("partial", Severity::Info))
            .unwrap();
        evaluator.evaluate_into(&model, request("answer")).unwrap().await;
        model
            .append(crate::OutputData::text("partial", Severity::Info))
            .unwrap();

        let rendered: Vec<String> = model.elements().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["partial", "answer\n42", "partial"]);
    }

    #[tokio::test]
    async fn test_input_appended_before_future_is_polled() {
        let model = ReplModel::new(TreeOptions::default());
        let evaluator = ExpressionEvaluator::new(Arc::new(FixedBackend));

        let pending = evaluator.evaluate_into(&model, request("answer")).unwrap();
        assert!(!model.elements()[0].as_expression().unwrap().is_resolved());

        pending.await;
        assert!(model.elements()[0].as_expression().unwrap().is_resolved());
    }
}
