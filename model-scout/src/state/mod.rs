use std::sync::Arc;

use crate::pipeline::SearchPipeline;

type PipelineHandle = Arc<SearchPipeline>;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: PipelineHandle,
}

impl AppState {
    pub fn new(pipeline: SearchPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}
