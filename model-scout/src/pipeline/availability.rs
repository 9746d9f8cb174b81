//! Cache of the inference host's model listing, used to answer "can this be served right now?".
//!
//! The cache holds at most one live generation. A refresh builds a complete new generation and
//! swaps it in, so readers see either the old listing or the new one, never a mix. Refreshes are
//! serialized: a reader holding a stale generation does not wait for someone else's refresh, it
//! answers from the snapshot it already has.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};

use async_trait::async_trait;
use log::{info, warn};
use tokio::{sync::Mutex, time::Instant};

use super::AvailabilityCheck;
use crate::providers::{CatalogEntry, ListingApi, ProviderResult};

pub type ListingHandle = Arc<dyn ListingApi + Send + Sync>;
pub type ClockHandle = Arc<dyn Clock + Send + Sync>;

/// Source of the current time for TTL decisions.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Tokio's clock. Follows paused time in tests.
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// How a failed listing fetch is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each following one.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

/// Lower-case and drop hyphens, underscores and whitespace.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug)]
struct CachedEntry {
    id: String,
    name: String,
    available: bool,
}

impl From<CatalogEntry> for CachedEntry {
    fn from(value: CatalogEntry) -> Self {
        Self {
            id: normalize(&value.id),
            name: normalize(&value.name),
            available: value.available,
        }
    }
}

#[derive(Debug)]
struct Generation {
    entries: Vec<CachedEntry>,
    fetched_at: Instant,
}

impl Generation {
    /// First entry whose normalized id or name contains the normalized query.
    fn lookup(&self, normalized: &str) -> Option<&CachedEntry> {
        self.entries
            .iter()
            .find(|entry| entry.id.contains(normalized) || entry.name.contains(normalized))
    }
}

pub struct AvailabilityCache {
    listing: ListingHandle,
    clock: ClockHandle,
    /// `None` fetches once and never expires.
    ttl: Option<Duration>,
    retry: RetryPolicy,
    current: RwLock<Option<Arc<Generation>>>,
    refresh_lock: Mutex<()>,
    /// Completed refresh attempts, successful or not.
    attempts: AtomicU64,
}

impl AvailabilityCache {
    pub fn new(listing: ListingHandle, clock: ClockHandle, ttl: Option<Duration>, retry: RetryPolicy) -> Self {
        Self {
            listing,
            clock,
            ttl,
            retry,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
        }
    }

    fn current(&self) -> Option<Arc<Generation>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn install(&self, generation: Generation) {
        let generation = Some(Arc::new(generation));
        match self.current.write() {
            Ok(mut guard) => *guard = generation,
            Err(poisoned) => *poisoned.into_inner() = generation,
        }
    }

    fn is_stale(&self, generation: &Generation) -> bool {
        match self.ttl {
            Some(ttl) => self.clock.now().saturating_duration_since(generation.fetched_at) > ttl,
            None => false,
        }
    }

    /// Fetch the listing, retrying transient failures with exponential backoff.
    async fn fetch_with_retry(&self) -> ProviderResult<Vec<CatalogEntry>> {
        let mut backoff = self.retry.initial_backoff;
        let mut retries = 0;
        loop {
            match self.listing.list_models().await {
                Ok(entries) => return Ok(entries),
                Err(err) if err.is_retryable() && retries < self.retry.max_retries => {
                    retries += 1;
                    warn!(
                        "availability listing failed ({}), retry {}/{} in {:?}",
                        err, retries, self.retry.max_retries, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Run one refresh. Callers must hold `refresh_lock`.
    async fn refresh(&self) {
        match self.fetch_with_retry().await {
            Ok(entries) => {
                info!("availability cache loaded {} models", entries.len());
                self.install(Generation {
                    entries: entries.into_iter().map(CachedEntry::from).collect(),
                    fetched_at: self.clock.now(),
                });
            }
            Err(err) => warn!("availability cache refresh failed, keeping previous listing: {}", err),
        }
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }

    /// The generation to answer from, refreshing first when needed.
    async fn snapshot(&self) -> Option<Arc<Generation>> {
        // Read before the generation, so a refresh finishing in between is still noticed.
        let seen = self.attempts.load(Ordering::SeqCst);
        match self.current() {
            Some(generation) if !self.is_stale(&generation) => Some(generation),
            Some(stale) => {
                // Someone else is already refreshing: answer from what we have.
                let Ok(_guard) = self.refresh_lock.try_lock() else {
                    return Some(stale);
                };
                if self.current().map_or(true, |current| Arc::ptr_eq(&current, &stale)) {
                    self.refresh().await;
                }
                self.current()
            }
            None => {
                let _guard = self.refresh_lock.lock().await;
                // A refresh that finished while we waited counts for this round too.
                if self.current().is_none() && self.attempts.load(Ordering::SeqCst) == seen {
                    self.refresh().await;
                }
                self.current()
            }
        }
    }

    /// Whether the host currently serves a model matching `model_id`. Never fails, any
    /// problem reaching the host answers `false`.
    pub async fn is_available(&self, model_id: &str) -> bool {
        let normalized = normalize(model_id);
        if normalized.is_empty() {
            return false;
        }

        match self.snapshot().await {
            Some(generation) => generation
                .lookup(&normalized)
                .map_or(false, |entry| entry.available),
            None => false,
        }
    }
}

#[async_trait]
impl AvailabilityCheck for AvailabilityCache {
    async fn is_available(&self, model_id: &str) -> bool {
        AvailabilityCache::is_available(self, model_id).await
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::providers::ProviderError;

    /// Replays scripted listing outcomes, repeating the last one, and records call times.
    struct ScriptedListing {
        script: StdMutex<Vec<Result<Vec<&'static str>, u16>>>,
        calls: StdMutex<Vec<Instant>>,
    }

    impl ScriptedListing {
        fn new(script: Vec<Result<Vec<&'static str>, u16>>) -> Arc<Self> {
            Arc::new(Self {
                script: StdMutex::new(script),
                calls: StdMutex::new(vec![]),
            })
        }

        fn calls(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ListingApi for ScriptedListing {
        async fn list_models(&self) -> ProviderResult<Vec<CatalogEntry>> {
            self.calls.lock().unwrap().push(Instant::now());
            let outcome = {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.remove(0)
                } else {
                    script[0].clone()
                }
            };
            match outcome {
                Ok(ids) => Ok(ids
                    .into_iter()
                    .map(|id| CatalogEntry {
                        id: id.to_owned(),
                        name: id.to_owned(),
                        available: true,
                        metadata: serde_json::Value::Null,
                    })
                    .collect()),
                Err(status) => Err(ProviderError::Status {
                    provider: "test",
                    status,
                }),
            }
        }
    }

    fn cache(listing: Arc<ScriptedListing>, ttl: Option<Duration>) -> AvailabilityCache {
        AvailabilityCache::new(listing, Arc::new(TokioClock), ttl, RetryPolicy::default())
    }

    const TTL: Option<Duration> = Some(Duration::from_secs(300));

    #[test]
    pub fn normalization() {
        assert_eq!(normalize("Meta-Llama_3 8B\tInstruct"), "metallama38binstruct");
        for raw in ["", "A-b_C d", "meta-llama/Meta-Llama-3-8B", "  __--  "] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once);
            assert!(!once.contains(['-', '_', ' ']));
            assert_eq!(once, once.to_lowercase());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn loose_containment_match() {
        let listing = ScriptedListing::new(vec![Ok(vec!["meta-llama/Meta-Llama-3-8B-Instruct"])]);
        let cache = cache(listing.clone(), TTL);

        assert!(cache.is_available("meta-llama/Meta-Llama-3-8B-Instruct").await);
        assert!(cache.is_available("META_LLAMA 3 8b").await);
        assert!(cache.is_available("llama-3-8b").await);
        assert!(!cache.is_available("mistralai/Mistral-7B").await);
        assert!(!cache.is_available("").await);
        assert!(!cache.is_available(" - _ ").await);
        assert_eq!(listing.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_flag_is_respected() {
        struct Listing;
        #[async_trait]
        impl ListingApi for Listing {
            async fn list_models(&self) -> ProviderResult<Vec<CatalogEntry>> {
                Ok(vec![CatalogEntry {
                    id: "org/paused".to_owned(),
                    name: "org/paused".to_owned(),
                    available: false,
                    metadata: serde_json::Value::Null,
                }])
            }
        }
        let cache = AvailabilityCache::new(Arc::new(Listing), Arc::new(TokioClock), TTL, RetryPolicy::default());
        assert!(!cache.is_available("org/paused").await);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_server_errors_with_backoff() {
        let listing = ScriptedListing::new(vec![Err(503)]);
        let cache = cache(listing.clone(), TTL);

        let started = Instant::now();
        assert!(!cache.is_available("org/model").await);

        let calls = listing.calls();
        assert_eq!(calls.len(), 4, "one attempt plus three retries");
        let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
        );
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn client_errors_are_not_retried() {
        let listing = ScriptedListing::new(vec![Err(404)]);
        let cache = cache(listing.clone(), TTL);

        assert!(!cache.is_available("org/model").await);
        assert_eq!(listing.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failure() {
        let listing = ScriptedListing::new(vec![Err(502), Err(500), Ok(vec!["org/model"])]);
        let cache = cache(listing.clone(), TTL);

        assert!(cache.is_available("org/model").await);
        assert_eq!(listing.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_after_ttl() {
        let listing = ScriptedListing::new(vec![Ok(vec!["org/old"]), Ok(vec!["org/new"])]);
        let cache = cache(listing.clone(), TTL);

        assert!(cache.is_available("org/old").await);
        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.is_available("org/old").await);
        assert_eq!(listing.calls().len(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!cache.is_available("org/old").await);
        assert!(cache.is_available("org/new").await);
        assert_eq!(listing.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_previous_generation() {
        let listing = ScriptedListing::new(vec![Ok(vec!["org/model"]), Err(404)]);
        let cache = cache(listing.clone(), TTL);

        assert!(cache.is_available("org/model").await);
        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(cache.is_available("org/model").await);
        assert_eq!(listing.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn without_ttl_fetches_once() {
        let listing = ScriptedListing::new(vec![Ok(vec!["org/model"])]);
        let cache = cache(listing.clone(), None);

        assert!(cache.is_available("org/model").await);
        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert!(cache.is_available("org/model").await);
        assert_eq!(listing.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_first_readers_share_one_refresh() {
        let listing = ScriptedListing::new(vec![Err(503), Ok(vec!["org/model"])]);
        let cache = Arc::new(cache(listing.clone(), TTL));

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.is_available("org/model").await })
            })
            .collect();
        for reader in readers {
            assert!(reader.await.unwrap());
        }
        assert_eq!(listing.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_reader_answers_during_refresh() {
        let listing = ScriptedListing::new(vec![Ok(vec!["org/model"]), Err(503)]);
        let cache = Arc::new(cache(listing.clone(), TTL));

        assert!(cache.is_available("org/model").await);
        tokio::time::advance(Duration::from_secs(301)).await;

        let refreshing = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.is_available("org/model").await })
        };
        while listing.calls().len() < 2 {
            tokio::task::yield_now().await;
        }

        // The refresh is now sleeping between retries and holds the lock.
        let started = Instant::now();
        assert!(cache.is_available("org/model").await);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(listing.calls().len(), 2);

        assert!(refreshing.await.unwrap());
        assert_eq!(started.elapsed(), Duration::from_secs(7));
        assert_eq!(listing.calls().len(), 5, "priming fetch plus one failed refresh");
    }

    /// Clock that only moves when told to.
    struct ManualClock(StdMutex<Instant>);

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.0.lock().unwrap()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn injected_clock_drives_expiry() {
        let clock = Arc::new(ManualClock(StdMutex::new(Instant::now())));
        let listing = ScriptedListing::new(vec![Ok(vec!["org/model"])]);
        let cache = AvailabilityCache::new(
            listing.clone(),
            clock.clone(),
            Some(Duration::from_secs(60)),
            RetryPolicy::default(),
        );

        assert!(cache.is_available("org/model").await);
        assert!(cache.is_available("org/model").await);
        assert_eq!(listing.calls().len(), 1);

        *clock.0.lock().unwrap() += Duration::from_secs(61);
        assert!(cache.is_available("org/model").await);
        assert_eq!(listing.calls().len(), 2);
    }
}
