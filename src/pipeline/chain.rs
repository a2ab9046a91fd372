//! Ordered stage execution around a request handler.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, instrument};

use super::context::{RequestContext, Response};
use super::stage::{Rejection, Stage};

/// An ordered set of stages wrapped around a request handler.
///
/// Before hooks run in registration order. The first rejection wins: the
/// handler and every after hook are skipped, and the rejection response
/// goes out carrying whatever headers earlier hooks staged. When all
/// before hooks pass, the handler runs and after hooks unwind in reverse
/// order over its response.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage owned by this pipeline.
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Appends a stage shared with other pipelines.
    ///
    /// Useful when several endpoint pipelines meter against the same
    /// limiter or swap rules through the same handle.
    pub fn with_shared_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs one request through the pipeline.
    ///
    /// The handler is only invoked once every before hook has passed.
    /// Headers staged in the context are merged into whichever response
    /// leaves the pipeline, rejection or not.
    #[instrument(
        skip(self, ctx, handler),
        fields(
            request_id = %ctx.request_id(),
            endpoint = %ctx.endpoint(),
            identity = %ctx.principal().identity()
        )
    )]
    pub async fn execute<F, Fut>(&self, ctx: &mut RequestContext, handler: F) -> Response
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Response>,
    {
        for stage in &self.stages {
            if let Err(rejection) = stage.before(ctx).await {
                debug!(rejection = ?rejection, "Request rejected before handler");
                let mut response = rejection.into_response();
                ctx.merge_into(&mut response);
                return response;
            }
        }

        let mut response = handler().await;

        for stage in self.stages.iter().rev() {
            stage.after(ctx, &mut response).await;
        }

        ctx.merge_into(&mut response);
        response
    }
}
