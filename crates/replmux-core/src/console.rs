//! Debug console
//!
//! Front door for everything the debugger UI and the debug adapters do with
//! the console. Each call names the session it acts for; the router decides
//! which console model owns that session's output.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;

use replmux_filter::ReplFilter;
use replmux_output::{Element, SourceLocation};
use replmux_session::{ReplPolicy, SessionId, SessionNode, SessionRouter};

use crate::config::ReplConfig;
use crate::evaluator::{EvaluationBackend, EvaluationRequest, ExpressionEvaluator, StackFrameRef};
use crate::event::{OutputEvent, OutputGroup};
use crate::model::{OutputData, ReplChange, ReplModel, CHANGE_CHANNEL_CAPACITY};
use crate::Result;

pub struct ReplConsole {
    config: ReplConfig,
    router: Arc<RwLock<SessionRouter>>,
    models: Arc<RwLock<HashMap<SessionId, ReplModel>>>,
    /// Change channels handed out by `subscribe`, bound to the owning model
    listeners: Arc<RwLock<HashMap<SessionId, broadcast::Sender<ReplChange>>>>,
    evaluator: ExpressionEvaluator,
    filter: Arc<RwLock<ReplFilter>>,
}

impl ReplConsole {
    pub fn new(config: ReplConfig, backend: Arc<dyn EvaluationBackend>) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            collapse_identical_lines = config.collapse_identical_lines,
            max_elements = config.max_elements,
            "Debug console initialized"
        );

        Ok(Self {
            filter: Arc::new(RwLock::new(ReplFilter::new(&config.filter_query))),
            config,
            router: Arc::new(RwLock::new(SessionRouter::new())),
            models: Arc::new(RwLock::new(HashMap::new())),
            listeners: Arc::new(RwLock::new(HashMap::new())),
            evaluator: ExpressionEvaluator::new(backend),
        })
    }

    pub fn config(&self) -> &ReplConfig {
        &self.config
    }

    // === Session operations ===

    pub fn add_session(
        &self,
        name: &str,
        parent: Option<SessionId>,
        repl_policy: Option<ReplPolicy>,
    ) -> Result<SessionId> {
        let id = self
            .router
            .write()
            .add_session(name.to_string(), parent, repl_policy)?;
        Ok(id)
    }

    pub fn session(&self, id: SessionId) -> Result<SessionNode> {
        Ok(self.router.read().get(id)?.clone())
    }

    pub fn sessions(&self) -> Vec<SessionNode> {
        self.router.read().sessions().to_vec()
    }

    pub fn set_parent(&self, id: SessionId, parent: Option<SessionId>) -> Result<()> {
        self.router.write().set_parent(id, parent)?;
        self.rebind_listeners();
        Ok(())
    }

    pub fn set_repl_policy(&self, id: SessionId, repl_policy: Option<ReplPolicy>) -> Result<()> {
        self.router.write().set_repl_policy(id, repl_policy)?;
        self.rebind_listeners();
        Ok(())
    }

    /// The session whose console receives writes made for `id`
    pub fn owner_of(&self, id: SessionId) -> Result<SessionId> {
        Ok(self.router.read().resolve(id)?)
    }

    /// The console model that receives writes made for `id`
    pub fn resolve(&self, id: SessionId) -> Result<ReplModel> {
        let owner = self.owner_of(id)?;
        Ok(self.model_for(owner))
    }

    /// End a session.
    ///
    /// Running children that were merging into it keep what they have
    /// written so far: each receives its own copy of the console it was
    /// writing into and owns it from then on.
    pub fn end_session(&self, id: SessionId) -> Result<()> {
        let shared = self.resolve(id)?;
        let detached = self.router.write().end_session(id)?;

        {
            let mut models = self.models.write();
            for child in detached {
                let model = shared.clone_detached();
                tracing::info!(
                    session_id = %child,
                    model_id = %model.id(),
                    "Detached console for session"
                );
                models.insert(child, model);
            }
        }

        self.rebind_listeners();
        Ok(())
    }

    /// Point every session listener at the model that owns its session now
    fn rebind_listeners(&self) {
        let listeners = self.listeners.read();
        if listeners.is_empty() {
            return;
        }

        for model in self.models.read().values() {
            model.clear_forwards();
        }

        for (session, sender) in listeners.iter() {
            match self.resolve(*session) {
                Ok(model) => model.forward_to(sender.clone()),
                Err(e) => {
                    tracing::warn!(session_id = %session, error = %e, "Session listener left unbound")
                }
            }
        }
    }

    fn model_for(&self, owner: SessionId) -> ReplModel {
        if let Some(model) = self.models.read().get(&owner) {
            return model.clone();
        }

        self.models
            .write()
            .entry(owner)
            .or_insert_with(|| {
                let model = ReplModel::new(self.config.tree_options());
                tracing::debug!(session_id = %owner, model_id = %model.id(), "Created console model");
                model
            })
            .clone()
    }

    // === Write operations ===

    pub fn append_to_repl(&self, session: SessionId, data: OutputData) -> Result<()> {
        self.resolve(session)?.append(data)
    }

    pub fn start_group(
        &self,
        session: SessionId,
        name: &str,
        auto_expand: bool,
        source: Option<SourceLocation>,
    ) -> Result<()> {
        self.resolve(session)?
            .start_group(name.to_string(), auto_expand, source)
    }

    pub fn end_group(&self, session: SessionId) -> Result<()> {
        self.resolve(session)?.end_group()
    }

    /// Submit an expression typed into the console of `session`.
    ///
    /// The input is appended before this returns; the returned future
    /// resolves once the result has been filled in.
    pub fn add_repl_expression(
        &self,
        session: SessionId,
        frame: Option<StackFrameRef>,
        expression: &str,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        let request = EvaluationRequest {
            session,
            frame,
            expression: expression.to_string(),
        };
        let submitted = self
            .resolve(session)
            .and_then(|model| self.evaluator.evaluate_into(&model, request));

        async move {
            submitted?.await;
            Ok(())
        }
    }

    pub fn remove_repl_expressions(&self, session: SessionId) -> Result<()> {
        self.resolve(session)?.remove_repl_expressions();
        Ok(())
    }

    /// Route an adapter output event into the console
    pub fn handle_output_event(&self, session: SessionId, event: OutputEvent) -> Result<()> {
        if event.is_telemetry() {
            tracing::trace!(session_id = %session, "Ignoring telemetry output");
            return Ok(());
        }

        let severity = event.severity();
        match event.group {
            Some(group @ (OutputGroup::Start | OutputGroup::StartCollapsed)) => {
                let auto_expand = group == OutputGroup::Start;
                return self
                    .resolve(session)?
                    .start_group(event.output, auto_expand, event.source);
            }
            Some(OutputGroup::End) => {
                self.end_group(session)?;
                if event.output.is_empty() {
                    return Ok(());
                }
            }
            None => {}
        }

        self.append_to_repl(
            session,
            OutputData {
                output: event.output,
                severity,
                expression: None,
                source: event.source,
            },
        )
    }

    // === Read operations ===

    pub fn get_repl_elements(&self, session: SessionId) -> Result<Vec<Element>> {
        Ok(self.resolve(session)?.elements())
    }

    /// Run `f` against the live top-level elements of the console of
    /// `session`. Writing to that console from inside `f` deadlocks.
    pub fn with_repl_elements<F, T>(&self, session: SessionId, f: F) -> Result<T>
    where
        F: FnOnce(&[Element]) -> T,
    {
        Ok(self.resolve(session)?.with_elements(f))
    }

    /// Change stream for `session`.
    ///
    /// Carries the changes of whichever console owns the session, following
    /// it when ownership moves (re-parenting, policy change, detach on end).
    pub fn subscribe(&self, session: SessionId) -> Result<broadcast::Receiver<ReplChange>> {
        let model = self.resolve(session)?;

        let mut listeners = self.listeners.write();
        let sender = listeners.entry(session).or_insert_with(|| {
            let (sender, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
            model.forward_to(sender.clone());
            sender
        });

        Ok(sender.subscribe())
    }

    // === Filter operations ===

    pub fn set_filter_query(&self, query: &str) {
        self.filter.write().set_query(query);
    }

    pub fn filter_query(&self) -> String {
        self.filter.read().query().to_string()
    }

    /// Elements of the console of `session` that pass the filter, group
    /// children included
    pub fn visible_repl_elements(&self, session: SessionId) -> Result<Vec<Element>> {
        let filter = self.filter.read().clone();
        self.with_repl_elements(session, |elements| filter.visible(elements, true))
    }
}

impl Clone for ReplConsole {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            router: Arc::clone(&self.router),
            models: Arc::clone(&self.models),
            listeners: Arc::clone(&self.listeners),
            evaluator: self.evaluator.clone(),
            filter: Arc::clone(&self.filter),
        }
    }
}
