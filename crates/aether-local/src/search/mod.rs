//! Search Orchestrator (C9): intent classifier + source dispatcher.

pub mod plan;
pub mod sources;

use crate::fetcher::Fetcher;
use aether_core::{Context, Error, Result, SearchPlan, SearchResult, SourcePlugin};
use std::sync::Arc;

pub struct SearchOrchestrator {
    /// User-registered sources, consulted in registration order before the
    /// built-in cascade.
    registered: Vec<Arc<dyn SourcePlugin>>,
    builtins: Vec<Arc<dyn SourcePlugin>>,
}

impl SearchOrchestrator {
    pub fn new(reqwest_client: reqwest::Client, fetcher: Arc<Fetcher>) -> Self {
        let builtins: Vec<Arc<dyn SourcePlugin>> = vec![
            Arc::new(sources::WikipediaSource::new(reqwest_client.clone())),
            Arc::new(sources::HackerNewsSource::new(reqwest_client.clone())),
            Arc::new(sources::WeatherSource::new(reqwest_client)),
            Arc::new(sources::RssSource::new(fetcher.clone())),
            Arc::new(sources::FetchSource::new(fetcher)),
        ];
        Self {
            registered: Vec::new(),
            builtins,
        }
    }

    pub fn register_source(&mut self, plugin: Arc<dyn SourcePlugin>) {
        self.registered.push(plugin);
    }

    fn find_source(&self, name: &str) -> Option<&Arc<dyn SourcePlugin>> {
        self.registered
            .iter()
            .chain(self.builtins.iter())
            .find(|p| p.name() == name)
    }

    /// `Plan(query)`: user-registered sources are asked `Matches` first, in
    /// registration order; first match wins. Falling through reaches the
    /// built-in intent cascade.
    pub fn plan(&self, query: &str) -> SearchPlan {
        for source in &self.registered {
            if source.matches(query) {
                let mut p = plan::classify(query);
                p.source = source.name().to_string();
                return p;
            }
        }
        plan::classify(query)
    }

    /// `Dispatch(plan)`: invokes the chosen source. Failures propagate as
    /// `Error::Source` and do not fall back to other sources.
    pub async fn dispatch(&self, ctx: &Context, plan: &SearchPlan) -> Result<SearchResult> {
        let source = self.find_source(&plan.source).ok_or_else(|| Error::Source {
            source: plan.source.clone(),
            cause: "no such source registered".to_string(),
        })?;
        source.run(ctx, &plan.query).await
    }

    pub async fn search(&self, ctx: &Context, query: &str) -> Result<SearchResult> {
        let plan = self.plan(query);
        self.dispatch(ctx, &plan).await
    }
}
