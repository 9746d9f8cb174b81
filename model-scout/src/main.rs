use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use env_logger::Env;

use model_scout::{
    config::EnvVars,
    pipeline::{
        availability::{AvailabilityCache, RetryPolicy, TokioClock},
        catalog::HubCatalog,
        enrich::FeatureEnricher,
        keywords::KeywordGenerator,
        sources::WebSources,
        CompletionHandle, RegistryHandle, SearchPipeline,
    },
    providers::{
        brave::BraveClient, featherless::FeatherlessClient, http_client,
        huggingface::HuggingFaceClient, together::TogetherClient,
    },
    router::app_router,
    state::AppState,
};

fn build_pipeline(env: &EnvVars) -> Result<SearchPipeline> {
    let http = http_client(env.request_timeout()).context("failed to build HTTP client")?;

    let completion: CompletionHandle = Arc::new(TogetherClient::new(
        http.clone(),
        &env.together_base_url,
        env.together_api_key.clone(),
        &env.completion_model,
    ));
    let registry: RegistryHandle = Arc::new(HuggingFaceClient::new(
        http.clone(),
        &env.huggingface_base_url,
        env.huggingface_api_key.clone(),
    ));
    let listing = Arc::new(FeatherlessClient::new(
        http.clone(),
        &env.featherless_base_url,
        env.featherless_api_key.clone(),
    ));

    let availability = AvailabilityCache::new(
        listing,
        Arc::new(TokioClock),
        env.availability_ttl(),
        RetryPolicy::default(),
    );

    let mut pipeline = SearchPipeline::new(
        Arc::new(KeywordGenerator::new(Arc::clone(&completion))),
        Arc::new(HubCatalog::new(Arc::clone(&registry), env.catalog_limit())),
        Arc::new(availability),
    );
    if env.enrich_models {
        pipeline = pipeline.with_enricher(Arc::new(FeatureEnricher::new(completion, registry)));
    }
    if env.web_sources {
        let brave = BraveClient::new(http, &env.brave_base_url, env.brave_api_key.clone());
        pipeline = pipeline.with_sources(Arc::new(WebSources::new(Arc::new(brave))));
    }

    Ok(pipeline)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let env = EnvVars::from_env().context("failed to read environment")?;
    log::info!(
        "listening on {}:{}, catalog limit {}, availability TTL {:?}",
        env.host,
        env.port,
        env.catalog_limit(),
        env.availability_ttl()
    );

    let state = AppState::new(build_pipeline(&env)?);
    let app = app_router().with_state(state);

    let listen_addr = SocketAddr::from((env.host, env.port));
    axum::Server::bind(&listen_addr)
        .serve(app.into_make_service())
        .await
        .context("failed to start axum server")?;

    Ok(())
}
