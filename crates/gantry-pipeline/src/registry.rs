//! Event-type to pipeline dispatch.
//!
//! The registry maps event discriminators to pipelines, with a mandatory
//! default for unmatched types. All routes are resolved to pipeline handles
//! when the registry is built, so selection at dispatch time is a total
//! lookup that cannot fail.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use gantry_types::Event;

use crate::context::TaskContext;
use crate::engine::Pipeline;
use crate::error::RegistryError;

/// Builder collecting pipelines and dispatch rules.
#[derive(Default)]
pub struct PipelineRegistryBuilder {
    pipelines: HashMap<String, Arc<Pipeline>>,
    routes: Vec<(String, String)>,
    default: Option<String>,
}

impl PipelineRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pipeline under a name.
    pub fn register(mut self, name: impl Into<String>, pipeline: Pipeline) -> Self {
        self.pipelines.insert(name.into(), Arc::new(pipeline));
        self
    }

    /// Route an event type to a named pipeline.
    pub fn route(mut self, event_type: impl Into<String>, pipeline: impl Into<String>) -> Self {
        self.routes.push((event_type.into(), pipeline.into()));
        self
    }

    /// Name the pipeline used for event types with no explicit route.
    pub fn default_pipeline(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    /// Resolve every route and the default to registered pipelines.
    pub fn build(self) -> Result<PipelineRegistry, RegistryError> {
        let default_name = self.default.ok_or(RegistryError::MissingDefault)?;
        let default = self
            .pipelines
            .get(&default_name)
            .cloned()
            .ok_or(RegistryError::UnknownDefault(default_name.clone()))?;

        let mut routes = HashMap::with_capacity(self.routes.len());
        for (event_type, pipeline_name) in self.routes {
            let pipeline = self.pipelines.get(&pipeline_name).cloned().ok_or_else(|| {
                RegistryError::UnknownRoute {
                    event_type: event_type.clone(),
                    pipeline: pipeline_name.clone(),
                }
            })?;
            routes.insert(event_type, (pipeline_name, pipeline));
        }

        debug!(
            pipelines = self.pipelines.len(),
            routes = routes.len(),
            default = %default_name,
            "Built pipeline registry"
        );

        Ok(PipelineRegistry {
            pipelines: self.pipelines,
            routes,
            default,
            default_name,
        })
    }
}

/// An immutable dispatch table from event types to pipelines.
pub struct PipelineRegistry {
    pipelines: HashMap<String, Arc<Pipeline>>,
    routes: HashMap<String, (String, Arc<Pipeline>)>,
    default: Arc<Pipeline>,
    default_name: String,
}

impl fmt::Debug for PipelineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routes: HashMap<&str, &str> = self
            .routes
            .iter()
            .map(|(event_type, (name, _))| (event_type.as_str(), name.as_str()))
            .collect();
        f.debug_struct("PipelineRegistry")
            .field("pipelines", &self.pipeline_names())
            .field("routes", &routes)
            .field("default", &self.default_name)
            .finish_non_exhaustive()
    }
}

impl PipelineRegistry {
    /// The pipeline handling the given event type.
    pub fn select(&self, event_type: &str) -> &Arc<Pipeline> {
        match self.routes.get(event_type) {
            Some((_, pipeline)) => pipeline,
            None => &self.default,
        }
    }

    /// The registered name of the pipeline handling the given event type.
    pub fn select_name(&self, event_type: &str) -> &str {
        match self.routes.get(event_type) {
            Some((name, _)) => name,
            None => &self.default_name,
        }
    }

    /// Select by the event's type and run the pipeline to completion.
    pub async fn dispatch(&self, event: Event) -> TaskContext {
        let pipeline = self.select(&event.event_type).clone();
        info!(
            event_id = %event.id,
            event_type = %event.event_type,
            pipeline = self.select_name(&event.event_type),
            "Dispatching event"
        );
        pipeline.run(event).await
    }

    /// Whether a pipeline is registered under the given name.
    pub fn has_pipeline(&self, name: &str) -> bool {
        self.pipelines.contains_key(name)
    }

    /// Names of all registered pipelines.
    pub fn pipeline_names(&self) -> Vec<&str> {
        self.pipelines.keys().map(|s| s.as_str()).collect()
    }
}
