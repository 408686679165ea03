//! Node entry point — wires the supervisor, dispatcher, and control plane.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::NodeConfig;
use crate::control::{ControlCommand, ControlStream, EmotionStream, Percept, PerceptStream};
use crate::dispatch::{CommandExecutor, Dispatcher};
use crate::error::SupervisorError;
use crate::worker::{Routine, RoutineContext, Supervisor, WorkerSignals};

/// Per-percept hook for reactive nodes that act on observations directly
/// instead of (or in addition to) the supervised routine.
#[async_trait]
pub trait PerceptHandler: Send + Sync {
    async fn on_percept(&self, percept: &Percept, ctx: &RoutineContext);
}

/// A supervised node: one long-lived routine plus the control plumbing
/// around it.
pub struct Node {
    config: NodeConfig,
    supervisor: Arc<Supervisor>,
    ctx: RoutineContext,
    executor: Arc<dyn CommandExecutor>,
    ready_tx: watch::Sender<bool>,
    percept_tx: watch::Sender<Option<Percept>>,
    emotion_tx: watch::Sender<Option<serde_json::Value>>,
    percept_handler: Option<Arc<dyn PerceptHandler>>,
}

impl Node {
    pub fn new(
        config: NodeConfig,
        executor: Arc<dyn CommandExecutor>,
        routine: Arc<dyn Routine>,
    ) -> Self {
        let signals = Arc::new(WorkerSignals::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&executor),
            Arc::clone(&signals),
            config.kind.clone(),
            config.dispatch.clone(),
        ));
        let (percept_tx, percept_rx) = watch::channel(None);
        let (emotion_tx, emotion_rx) = watch::channel(None);
        let ctx = RoutineContext::new(
            dispatcher,
            signals,
            config.supervisor.pause_poll_interval,
            percept_rx,
            emotion_rx,
        );
        let supervisor = Arc::new(Supervisor::new(
            config.supervisor.clone(),
            routine,
            ctx.clone(),
        ));
        let (ready_tx, _) = watch::channel(false);

        Self {
            config,
            supervisor,
            ctx,
            executor,
            ready_tx,
            percept_tx,
            emotion_tx,
            percept_handler: None,
        }
    }

    /// Register a reactive per-percept hook.
    pub fn with_percept_handler(mut self, handler: Arc<dyn PerceptHandler>) -> Self {
        self.percept_handler = Some(handler);
        self
    }

    /// Subscribe to the readiness signal, flipped to `true` once startup
    /// completes.
    pub fn readiness(&self) -> watch::Receiver<bool> {
        self.ready_tx.subscribe()
    }

    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }

    /// One-time startup: publish declarations, mark ready, start the worker,
    /// then route control commands until the stream closes.
    pub async fn start(&self, mut commands: ControlStream) -> Result<(), SupervisorError> {
        self.publish_declarations().await;
        let _ = self.ready_tx.send(true);
        self.supervisor.start().await?;
        tracing::info!(node = %self.config.name, "Node ready");

        while let Some(raw) = commands.next().await {
            self.handle_command(&raw).await;
        }
        tracing::info!(node = %self.config.name, "Control stream closed");
        Ok(())
    }

    /// Publish the configured command declarations to the executor.
    /// Per-item failures are logged and skipped, never fatal.
    async fn publish_declarations(&self) {
        for descriptor in &self.config.declarations {
            if let Err(e) = self.executor.declare(descriptor).await {
                tracing::error!(error = %e, "Failed to publish declaration");
            }
        }
    }

    /// Route one raw control message into a supervisor transition.
    /// Unrecognized commands are logged and ignored.
    pub async fn handle_command(&self, raw: &str) {
        match raw.parse::<ControlCommand>() {
            Ok(ControlCommand::Pause) => self.supervisor.pause().await,
            Ok(ControlCommand::Continue) => self.supervisor.resume().await,
            Ok(ControlCommand::Reset) => {
                if let Err(e) = self.supervisor.reset().await {
                    tracing::error!(error = %e, "Reset failed");
                }
            }
            Err(e) => tracing::warn!("{e}"),
        }
    }

    /// Consume a percept feed: keep the latest-percept slot current and
    /// invoke the reactive handler if one is registered.
    pub fn attach_percepts(&self, mut percepts: PerceptStream) -> JoinHandle<()> {
        let tx = self.percept_tx.clone();
        let handler = self.percept_handler.clone();
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            while let Some(percept) = percepts.next().await {
                tracing::debug!(symbol = %percept.symbol, "Percept received");
                let _ = tx.send(Some(percept.clone()));
                if let Some(handler) = &handler {
                    handler.on_percept(&percept, &ctx).await;
                }
            }
        })
    }

    /// Consume an emotion-core parameter feed, keeping the latest-snapshot
    /// slot current for the routine.
    pub fn attach_emotions(&self, mut emotions: EmotionStream) -> JoinHandle<()> {
        let tx = self.emotion_tx.clone();
        tokio::spawn(async move {
            while let Some(params) = emotions.next().await {
                tracing::debug!("Emotion params received");
                let _ = tx.send(Some(params));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use futures::stream;
    use tokio::time::sleep;

    use super::*;
    use crate::control::EmotionWrite;
    use crate::dispatch::CommandRequest;
    use crate::error::{ExecutorError, RoutineError};
    use crate::worker::WorkerState;

    /// Executor that records declarations, failing those marked `"bad"`.
    struct Recording {
        declared: Mutex<Vec<serde_json::Value>>,
    }

    impl Recording {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                declared: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CommandExecutor for Recording {
        async fn execute(&self, _req: &CommandRequest) -> Result<String, ExecutorError> {
            Ok("ok:".to_string())
        }

        async fn declare(&self, descriptor: &serde_json::Value) -> Result<(), ExecutorError> {
            if descriptor.get("bad").is_some() {
                return Err(ExecutorError::Declaration("schema mismatch".to_string()));
            }
            self.declared.lock().unwrap().push(descriptor.clone());
            Ok(())
        }

        async fn write_emotion(&self, _write: &EmotionWrite) -> Result<(), ExecutorError> {
            Ok(())
        }
    }

    /// Routine that idles cooperatively.
    struct Idle;

    #[async_trait]
    impl Routine for Idle {
        async fn run(&self, ctx: &RoutineContext) -> Result<(), RoutineError> {
            ctx.wait(Duration::from_millis(50)).await?;
            Ok(())
        }
    }

    fn test_node(executor: Arc<Recording>, config: NodeConfig) -> Arc<Node> {
        Arc::new(Node::new(config, executor, Arc::new(Idle)))
    }

    #[tokio::test(start_paused = true)]
    async fn startup_publishes_declarations_and_tolerates_failures() {
        let executor = Recording::new();
        let config = NodeConfig {
            declarations: vec![
                serde_json::json!({"symbol": "move"}),
                serde_json::json!({"bad": true}),
                serde_json::json!({"symbol": "grab"}),
            ],
            ..NodeConfig::default()
        };
        let node = test_node(Arc::clone(&executor), config);

        let mut ready = node.readiness();
        assert!(!*ready.borrow());

        let runner = Arc::clone(&node);
        let handle =
            tokio::spawn(async move { runner.start(Box::pin(stream::empty::<String>())).await });
        handle.await.unwrap().unwrap();

        // The bad declaration is skipped, the rest land, and the node still
        // comes up ready.
        assert_eq!(executor.declared.lock().unwrap().len(), 2);
        assert!(*ready.borrow_and_update());
        assert_eq!(node.supervisor().state().await, WorkerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn commands_route_to_supervisor_transitions() {
        let node = test_node(Recording::new(), NodeConfig::default());
        node.supervisor().start().await.unwrap();

        node.handle_command("pause").await;
        assert_eq!(node.supervisor().state().await, WorkerState::Paused);

        node.handle_command("continue").await;
        assert_eq!(node.supervisor().state().await, WorkerState::Running);

        node.handle_command("reset").await;
        assert_eq!(node.supervisor().state().await, WorkerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_command_is_ignored() {
        let node = test_node(Recording::new(), NodeConfig::default());
        node.supervisor().start().await.unwrap();

        node.handle_command("self-destruct").await;
        assert_eq!(node.supervisor().state().await, WorkerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn percepts_update_the_context_slot() {
        let node = test_node(Recording::new(), NodeConfig::default());
        assert_eq!(node.ctx.current_percept(), None);

        let percepts = vec![
            Percept::new("noise", serde_json::json!("faint")),
            Percept::new("light", serde_json::json!("bright")),
        ];
        let handle = node.attach_percepts(Box::pin(stream::iter(percepts)));
        handle.await.unwrap();

        let latest = node.ctx.current_percept().unwrap();
        assert_eq!(latest.symbol, "light");
    }

    #[tokio::test(start_paused = true)]
    async fn emotions_update_the_context_slot() {
        let node = test_node(Recording::new(), NodeConfig::default());
        assert_eq!(node.ctx.current_emotion(), None);

        let snapshots = vec![
            serde_json::json!({"fear": 10, "joy": 40}),
            serde_json::json!({"fear": 70, "joy": 5}),
        ];
        let handle = node.attach_emotions(Box::pin(stream::iter(snapshots)));
        handle.await.unwrap();

        let latest = node.ctx.current_emotion().unwrap();
        assert_eq!(latest["fear"], 70);
    }

    #[tokio::test(start_paused = true)]
    async fn percept_handler_is_invoked_per_percept() {
        struct CountingHandler {
            seen: Mutex<Vec<String>>,
        }

        #[async_trait]
        impl PerceptHandler for CountingHandler {
            async fn on_percept(&self, percept: &Percept, _ctx: &RoutineContext) {
                self.seen.lock().unwrap().push(percept.symbol.clone());
            }
        }

        let handler = Arc::new(CountingHandler {
            seen: Mutex::new(Vec::new()),
        });
        let node = Node::new(NodeConfig::default(), Recording::new(), Arc::new(Idle))
            .with_percept_handler(Arc::clone(&handler) as Arc<dyn PerceptHandler>);

        let percepts = vec![
            Percept::new("noise", serde_json::json!(null)),
            Percept::new("touch", serde_json::json!(null)),
        ];
        node.attach_percepts(Box::pin(stream::iter(percepts)))
            .await
            .unwrap();

        sleep(Duration::from_millis(10)).await;
        assert_eq!(*handler.seen.lock().unwrap(), vec!["noise", "touch"]);
    }
}
