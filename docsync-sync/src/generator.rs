//! External content generation.
//!
//! The engine never writes documentation itself; it hands a
//! [`GenerationContext`] to a [`ContentGenerator`] and takes back markdown.
//! [`generate_bounded`] wraps any generator with a timeout and a
//! [`CancelSignal`]. Dropping the in-flight future is how both are enforced,
//! so generators must not leave side effects behind on drop.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::watch;

use docsync_core::{config::GeneratorConfig, DocumentId, Specification};

use crate::error::{io_err, GenerationError};

/// Everything a generator is bound to for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationContext {
    pub document_id: DocumentId,
    pub doc_type: String,
    pub title: String,
    /// Primary source specification.
    pub specification: Specification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub content: String,
    pub model: String,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        context: &GenerationContext,
    ) -> Result<GeneratedContent, GenerationError>;
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Create a linked cancel handle and signal.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(Arc::new(tx)), CancelSignal(rx))
}

/// Trips every [`CancelSignal`] cloned from the same pair.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal(self.0.subscribe())
    }
}

#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        cancel_pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancelled. Pends forever if the handle is dropped first.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Run `generator` under a timeout and cancellation signal.
///
/// Returns the content plus the elapsed wall time.
pub async fn generate_bounded(
    generator: &dyn ContentGenerator,
    context: &GenerationContext,
    timeout: Duration,
    cancel: &CancelSignal,
) -> Result<(GeneratedContent, Duration), GenerationError> {
    if cancel.is_cancelled() {
        return Err(GenerationError::Cancelled);
    }
    let mut cancel = cancel.clone();
    let started = Instant::now();

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GenerationError::Cancelled),
        result = tokio::time::timeout(timeout, generator.generate(context)) => match result {
            Ok(generated) => generated,
            Err(_) => Err(GenerationError::Timeout { secs: timeout.as_secs() }),
        },
    };
    outcome.map(|generated| (generated, started.elapsed()))
}

// ---------------------------------------------------------------------------
// Command generator
// ---------------------------------------------------------------------------

/// Runs an external program per document: the context goes to stdin as JSON,
/// stdout is taken as the new content. The child is killed if the call is
/// dropped (timeout or cancellation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    model: Option<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// `None` when no command is configured.
    pub fn from_config(config: &GeneratorConfig) -> Option<Self> {
        let (program, args) = config.command.as_deref()?.split_first()?;
        let mut generator = Self::new(program.clone(), args.to_vec());
        generator.model = config.model.clone();
        Some(generator)
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl ContentGenerator for CommandGenerator {
    async fn generate(
        &self,
        context: &GenerationContext,
    ) -> Result<GeneratedContent, GenerationError> {
        let payload = serde_json::to_vec(context)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| io_err(&self.program, e))?;

        // stdout is drained while stdin is fed; stdin closes when `feed` ends.
        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(&payload).await {
                Ok(()) => Ok(()),
                // The program may exit without reading its input.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                Err(e) => Err(e),
            }
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| io_err(&self.program, e))?;
        fed.map_err(|e| io_err(&self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GenerationError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let content = String::from_utf8(output.stdout).map_err(|_| {
            GenerationError::Failed(format!("{} produced non UTF-8 output", self.program))
        })?;
        if content.trim().is_empty() {
            return Err(GenerationError::Failed(format!(
                "{} produced no content",
                self.program
            )));
        }

        Ok(GeneratedContent {
            content,
            model: self.model.clone().unwrap_or_else(|| self.program.clone()),
        })
    }
}
