use crate::protocol::command::{require_text, validate_depth, ChoiceContext, Command, ProtocolError};
use crate::protocol::message::{ServerMessage, TitleChoices};
use crate::session::{Session, SessionPhase, TaskOutcome};
use lineage_graph::{
    CancelToken, ExploreRequest, Explorer, Resolution, ResolveError, RunOutcome, TitleResolver,
};
use lineage_kg::ResolvedTitle;
use lineage_types::{Relationship, TraversalEvent};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

/// What a validated command asks for
#[derive(Debug, Clone, PartialEq)]
enum Action {
    Cancel,
    Run(Job),
}

/// Work a session task carries out
#[derive(Debug, Clone, PartialEq)]
enum Job {
    /// Resolve free text, then traverse; `depth: None` is unbounded
    Explore {
        query: String,
        depth: Option<u32>,
        context: ChoiceContext,
    },
    /// Traverse from a title the client picked
    ExploreChosen {
        title: String,
        depth: Option<u32>,
    },
    Expand {
        label: String,
        existing: Vec<Relationship>,
    },
    ExpandChosen {
        title: String,
        node_label: String,
        existing: Vec<Relationship>,
    },
}

/// Incremental expansion of a graph the client already holds
struct Expansion {
    label: String,
    existing: Vec<Relationship>,
}

/// Routes inbound commands of one session to the resolver and the explorer
#[derive(Clone)]
pub struct Dispatcher {
    explorer: Arc<Explorer>,
    resolver: Arc<TitleResolver>,
    default_depth: u32,
    expand_depth: u32,
}

impl Dispatcher {
    pub fn new(
        explorer: Arc<Explorer>,
        resolver: Arc<TitleResolver>,
        default_depth: u32,
        expand_depth: u32,
    ) -> Self {
        Self {
            explorer,
            resolver,
            default_depth,
            expand_depth: expand_depth.max(1),
        }
    }

    /// Handle one text frame from the socket
    pub async fn handle_text(&self, session: &Arc<Session>, text: &str) {
        match Command::parse(text) {
            Ok(command) => self.dispatch(session, command).await,
            Err(e) => self.reject(session, e).await,
        }
    }

    pub async fn dispatch(&self, session: &Arc<Session>, command: Command) {
        tracing::info!(session_id = %session.id(), action = command.action(), "Command received");

        let job = match self.plan(command) {
            Ok(Action::Run(job)) => job,
            Ok(Action::Cancel) => {
                let message = if session.cancel().await {
                    "Cancelled"
                } else {
                    "Nothing to cancel"
                };
                session.send(ServerMessage::status(message, 0)).await;
                return;
            }
            Err(e) => return self.reject(session, e).await,
        };

        let dispatcher = self.clone();
        let task_session = Arc::clone(session);
        session
            .spawn_task(move |token| async move { dispatcher.run_job(task_session, token, job).await })
            .await;
    }

    async fn reject(&self, session: &Arc<Session>, error: ProtocolError) {
        tracing::debug!(session_id = %session.id(), error = %error, "Command rejected");
        session.cancel().await;
        session.send(ServerMessage::error(error.to_string())).await;
    }

    fn plan(&self, command: Command) -> Result<Action, ProtocolError> {
        let domain = self.explorer.domain();

        let job = match command {
            Command::Cancel => return Ok(Action::Cancel),
            Command::Start { query, depth } => Job::Explore {
                query: require_text(&query)?,
                depth: Some(validate_depth(domain, depth.unwrap_or(self.default_depth))?),
                context: ChoiceContext::Search,
            },
            Command::FetchFullTree { query } => Job::Explore {
                query: require_text(&query)?,
                depth: None,
                context: ChoiceContext::FetchFullTree,
            },
            Command::ExpandNode { label, existing_graph } => Job::Expand {
                label: require_text(&label)?,
                existing: existing_graph,
            },
            Command::ChooseTitle {
                title,
                context,
                depth,
                existing_graph,
                node_label,
            } => {
                let title = require_text(&title)?;
                match context {
                    ChoiceContext::Search => Job::ExploreChosen {
                        title,
                        depth: Some(validate_depth(domain, depth.unwrap_or(self.default_depth))?),
                    },
                    ChoiceContext::FetchFullTree => Job::ExploreChosen { title, depth: None },
                    ChoiceContext::ExpandNode => Job::ExpandChosen {
                        node_label: node_label
                            .filter(|label| !label.trim().is_empty())
                            .unwrap_or_else(|| title.clone()),
                        title,
                        existing: existing_graph,
                    },
                }
            }
        };

        Ok(Action::Run(job))
    }

    async fn run_job(self, session: Arc<Session>, token: CancelToken, job: Job) -> TaskOutcome {
        session.set_phase(SessionPhase::Resolving);

        match job {
            Job::Explore { query, depth, context } => {
                let resolution = match self.resolve(&token, self.resolver.resolve(&query)).await {
                    Some(resolution) => resolution,
                    None => return TaskOutcome::Cancelled,
                };
                match resolution {
                    Ok(Resolution::Resolved(resolved)) => {
                        self.stream(&session, &token, resolved, depth, None).await
                    }
                    Ok(Resolution::Ambiguous { query, candidates }) => {
                        let choices = TitleChoices {
                            query,
                            context,
                            results: candidates,
                            existing_graph: None,
                            depth,
                            node_label: None,
                        };
                        self.finish_choices(&session, &token, choices).await
                    }
                    Err(e) => self.fail(&session, &token, e).await,
                }
            }
            Job::ExploreChosen { title, depth } => {
                match self.resolve(&token, self.resolver.resolve_exact(&title)).await {
                    Some(Ok(resolved)) => self.stream(&session, &token, resolved, depth, None).await,
                    Some(Err(e)) => self.fail(&session, &token, e).await,
                    None => TaskOutcome::Cancelled,
                }
            }
            Job::Expand { label, existing } => {
                let resolution = match self.resolve(&token, self.resolver.resolve(&label)).await {
                    Some(resolution) => resolution,
                    None => return TaskOutcome::Cancelled,
                };
                match resolution {
                    Ok(Resolution::Resolved(resolved)) => {
                        let expansion = Expansion { label, existing };
                        let depth = Some(self.expand_depth);
                        self.stream(&session, &token, resolved, depth, Some(expansion)).await
                    }
                    Ok(Resolution::Ambiguous { query, candidates }) => {
                        let choices = TitleChoices {
                            query,
                            context: ChoiceContext::ExpandNode,
                            results: candidates,
                            existing_graph: Some(existing),
                            depth: None,
                            node_label: Some(label),
                        };
                        self.finish_choices(&session, &token, choices).await
                    }
                    Err(e) => self.fail(&session, &token, e).await,
                }
            }
            Job::ExpandChosen {
                title,
                node_label,
                existing,
            } => {
                match self.resolve(&token, self.resolver.resolve_exact(&title)).await {
                    Some(Ok(resolved)) => {
                        let expansion = Expansion {
                            label: node_label,
                            existing,
                        };
                        let depth = Some(self.expand_depth);
                        self.stream(&session, &token, resolved, depth, Some(expansion)).await
                    }
                    Some(Err(e)) => self.fail(&session, &token, e).await,
                    None => TaskOutcome::Cancelled,
                }
            }
        }
    }

    /// Await a resolver call unless the task is cancelled first
    async fn resolve<T>(
        &self,
        token: &CancelToken,
        lookup: impl Future<Output = Result<T, ResolveError>>,
    ) -> Option<Result<T, ResolveError>> {
        tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = lookup => Some(result),
        }
    }

    async fn finish_choices(
        &self,
        session: &Session,
        token: &CancelToken,
        choices: TitleChoices,
    ) -> TaskOutcome {
        tracing::info!(
            session_id = %session.id(),
            query = %choices.query,
            candidates = choices.results.len(),
            "Asking client to choose a title"
        );
        if session.emit(token, ServerMessage::TitleChoices(choices)).await {
            TaskOutcome::Completed
        } else {
            TaskOutcome::Cancelled
        }
    }

    async fn fail(&self, session: &Session, token: &CancelToken, error: ResolveError) -> TaskOutcome {
        match &error {
            ResolveError::NotFound(_) | ResolveError::EmptyQuery => {
                tracing::info!(session_id = %session.id(), error = %error, "Title not resolved");
            }
            _ => {
                tracing::warn!(session_id = %session.id(), error = %error, "Title resolution failed");
            }
        }
        session.emit(token, ServerMessage::error(error.to_string())).await;
        TaskOutcome::Failed
    }

    /// Forward a traversal to the session, rewriting its end for expansions
    async fn stream(
        &self,
        session: &Session,
        token: &CancelToken,
        root: ResolvedTitle,
        depth: Option<u32>,
        expansion: Option<Expansion>,
    ) -> TaskOutcome {
        session.set_phase(SessionPhase::Streaming);
        tracing::info!(
            session_id = %session.id(),
            root = %root.id,
            title = %root.title,
            depth = ?depth,
            expand = expansion.is_some(),
            "Streaming traversal"
        );

        let details_event = self.explorer.domain().details_event();
        let request = ExploreRequest::from_id(root.id, depth);
        let (mut rx, handle) = self.explorer.spawn_explore(request, token.clone());

        let known: HashSet<Relationship> = expansion
            .as_ref()
            .map(|e| e.existing.iter().cloned().collect())
            .unwrap_or_default();
        let mut added = Vec::new();

        while let Some(event) = rx.recv().await {
            let message = match (&expansion, event) {
                (Some(_), TraversalEvent::EdgeDiscovered { relationship, .. }) => {
                    if known.contains(&relationship) {
                        continue;
                    }
                    added.push(relationship.clone());
                    ServerMessage::Relationship(relationship)
                }
                (Some(expansion), TraversalEvent::Completed { .. }) => {
                    let mut merged = expansion.existing.clone();
                    merged.extend(added.iter().cloned());
                    ServerMessage::ExpandComplete {
                        label: expansion.label.clone(),
                        added: std::mem::take(&mut added),
                        merged,
                    }
                }
                (_, event) => ServerMessage::from_event(event, details_event),
            };

            if !session.emit(token, message).await {
                token.cancel();
                break;
            }
        }
        drop(rx);

        match handle.await {
            Ok(RunOutcome::Completed { .. }) => TaskOutcome::Completed,
            Ok(RunOutcome::Failed) => TaskOutcome::Failed,
            Ok(RunOutcome::Cancelled) => TaskOutcome::Cancelled,
            Err(e) => {
                tracing::error!(session_id = %session.id(), error = %e, "Traversal task panicked");
                session.emit(token, ServerMessage::error("Internal error")).await;
                TaskOutcome::Failed
            }
        }
    }
}
