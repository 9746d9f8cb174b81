//! The search pipeline: query → keywords → registry lookup → enrichment and availability →
//! partitioned response.
//!
//! Every stage sits behind a trait and is infallible from the pipeline's point of view. Upstream
//! failures are absorbed inside the stage, which hands back its safe default instead.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use uuid::Uuid;

use crate::api_types::{ModelInfo, SearchResponse, SourceInfo};
use crate::providers::{CompletionApi, RegistryApi, WebSearchApi};

pub mod availability;
pub mod catalog;
pub mod decode;
pub mod enrich;
pub mod fanout;
pub mod keywords;
pub mod partition;
pub mod sources;

use enrich::Enrichment;

pub type CompletionHandle = Arc<dyn CompletionApi + Send + Sync>;
pub type RegistryHandle = Arc<dyn RegistryApi + Send + Sync>;
pub type WebSearchHandle = Arc<dyn WebSearchApi + Send + Sync>;

/// Produces at least one search keyword for a free-text use case.
#[async_trait]
pub trait KeywordSource {
    async fn generate_keywords(&self, query: &str) -> Vec<String>;
}

/// Finds candidate models for a set of keywords. Empty on total failure.
#[async_trait]
pub trait ModelCatalog {
    async fn find_models(&self, keywords: &[String]) -> Vec<ModelInfo>;
}

/// Extracts features and a summary for one model.
#[async_trait]
pub trait ModelEnricher {
    async fn enrich(&self, model: &ModelInfo) -> Enrichment;
}

/// Answers whether a model can be served right now. `false` on any failure.
#[async_trait]
pub trait AvailabilityCheck {
    async fn is_available(&self, model_id: &str) -> bool;
}

/// Finds contextual web pages for a query. Empty on failure.
#[async_trait]
pub trait SourceSearch {
    async fn search_sources(&self, query: &str) -> Vec<SourceInfo>;
}

pub type KeywordHandle = Arc<dyn KeywordSource + Send + Sync>;
pub type CatalogHandle = Arc<dyn ModelCatalog + Send + Sync>;
pub type EnricherHandle = Arc<dyn ModelEnricher + Send + Sync>;
pub type AvailabilityHandle = Arc<dyn AvailabilityCheck + Send + Sync>;
pub type SourceHandle = Arc<dyn SourceSearch + Send + Sync>;

pub struct SearchPipeline {
    keywords: KeywordHandle,
    catalog: CatalogHandle,
    availability: AvailabilityHandle,
    enricher: Option<EnricherHandle>,
    sources: Option<SourceHandle>,
}

impl SearchPipeline {
    pub fn new(keywords: KeywordHandle, catalog: CatalogHandle, availability: AvailabilityHandle) -> Self {
        Self {
            keywords,
            catalog,
            availability,
            enricher: None,
            sources: None,
        }
    }

    pub fn with_enricher(mut self, enricher: EnricherHandle) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_sources(mut self, sources: SourceHandle) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Enrich and annotate every candidate concurrently, one task per model.
    async fn annotate(&self, models: Vec<ModelInfo>) -> Vec<ModelInfo> {
        let originals = models.clone();
        let enricher = self.enricher.clone();
        let availability = Arc::clone(&self.availability);

        fanout::fan_out(
            models,
            move |mut model| {
                let enricher = enricher.clone();
                let availability = Arc::clone(&availability);
                async move {
                    let enrichment = async {
                        match &enricher {
                            Some(enricher) => Some(enricher.enrich(&model).await),
                            None => None,
                        }
                    };
                    let (enrichment, available) =
                        tokio::join!(enrichment, availability.is_available(&model.name));

                    if let Some(enrichment) = enrichment {
                        enrichment.apply(&mut model);
                    }
                    model.featherless_available = available;
                    model
                }
            },
            |index| {
                let mut model = originals[index].clone();
                if self.enricher.is_some() {
                    Enrichment::failed().apply(&mut model);
                }
                model.featherless_available = false;
                model
            },
        )
        .await
    }

    async fn find_sources(&self, query: &str) -> Option<Vec<SourceInfo>> {
        match &self.sources {
            Some(sources) => Some(sources.search_sources(query).await),
            None => None,
        }
    }

    async fn find_annotated_models(&self, request_id: Uuid, query: &str) -> (Vec<String>, Vec<ModelInfo>) {
        let keywords = self.keywords.generate_keywords(query).await;
        info!("[{}] keywords: {:?}", request_id, keywords);

        let models = self.catalog.find_models(&keywords).await;
        debug!("[{}] {} candidate models", request_id, models.len());

        (keywords, self.annotate(models).await)
    }

    /// Run the whole pipeline for one query.
    pub async fn search(&self, query: &str) -> SearchResponse {
        let request_id = Uuid::new_v4();
        info!("[{}] search {:?}", request_id, query);

        let ((search_terms, models), sources) = tokio::join!(
            self.find_annotated_models(request_id, query),
            self.find_sources(query)
        );

        let (llama3_models, alternatives) = partition::partition(models);
        info!(
            "[{}] {} primary, {} alternatives",
            request_id,
            llama3_models.len(),
            alternatives.len()
        );

        SearchResponse {
            llama3_models,
            alternatives,
            search_terms,
            sources,
        }
    }
}
