use crate::error::Result;
use crate::model::{NormalizedDocument, SearchResult};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Cancellation handle threaded through every public entry point. Cloning is
/// cheap (it is a thin wrapper over `CancellationToken`, itself an `Arc`).
#[derive(Debug, Clone, Default)]
pub struct Context(CancellationToken);

impl Context {
    pub fn new() -> Self {
        Self(CancellationToken::new())
    }

    pub fn child(&self) -> Self {
        Self(self.0.child_token())
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub async fn cancelled(&self) {
        self.0.cancelled().await
    }
}

impl From<CancellationToken> for Context {
    fn from(token: CancellationToken) -> Self {
        Self(token)
    }
}

/// A query source: the search orchestrator consults user-registered sources
/// (in registration order) before falling back to the built-in cascade.
#[async_trait]
pub trait SourcePlugin: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// Whether this source should handle `query`. First match wins.
    fn matches(&self, query: &str) -> bool;

    async fn run(&self, ctx: &Context, query: &str) -> Result<SearchResult>;
}

/// A document transform, applied in registration order during normalization.
/// Receives the current document and returns a new one (or the same) —
/// transforms never mutate their input in place.
#[async_trait]
pub trait TransformPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    async fn apply(&self, ctx: &Context, doc: &NormalizedDocument) -> Result<NormalizedDocument>;
}

/// A renderer selected by format name at `Render` time.
#[async_trait]
pub trait DisplayPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn format(&self) -> &str;

    async fn render(&self, ctx: &Context, doc: &NormalizedDocument) -> Result<Vec<u8>>;
}
