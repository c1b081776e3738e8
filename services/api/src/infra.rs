use chrono::Duration;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use wisebites::analysis::{GroqAnalyzer, ReviewAnalyzer, ReviewRefresher, ReviewSource, SerpApiReviewSource};
use wisebites::community::{CommunityService, InMemoryStore, ProfileStore, ReviewStore};
use wisebites::config::AppConfig;
use wisebites::places::{CachedPlaces, GooglePlacesClient, PlaceSearch, SearchService};
use wisebites::scoring::{ReviewSignal, ScoreEngine};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Every service the HTTP layer exposes, sharing one store and one score engine.
pub(crate) struct Services<S, R, A, P> {
    pub(crate) engine: Arc<ScoreEngine>,
    pub(crate) community: Arc<CommunityService<S>>,
    pub(crate) refresher: Arc<ReviewRefresher<S, R, A>>,
    pub(crate) search: Arc<SearchService<S, P>>,
}

impl<S, R, A, P> Services<S, R, A, P>
where
    S: ReviewStore + ProfileStore + 'static,
    R: ReviewSource + 'static,
    A: ReviewAnalyzer + 'static,
    P: PlaceSearch + 'static,
{
    pub(crate) fn new(
        store: Arc<S>,
        engine: ScoreEngine,
        source: R,
        analyzer: A,
        places: P,
        freshness: Duration,
    ) -> Self {
        let engine = Arc::new(engine);
        Self {
            community: Arc::new(CommunityService::new(store.clone(), engine.clone())),
            refresher: Arc::new(ReviewRefresher::new(
                store.clone(),
                source,
                analyzer,
                engine.clone(),
                freshness,
            )),
            search: Arc::new(SearchService::new(store, places, engine.clone(), freshness)),
            engine,
        }
    }
}

pub(crate) type LiveServices =
    Services<InMemoryStore, SerpApiReviewSource, GroqAnalyzer, CachedPlaces<GooglePlacesClient>>;

/// Production wiring: in-memory store plus the configured upstream clients.
pub(crate) fn live_services(config: &AppConfig) -> LiveServices {
    let integrations = &config.integrations;
    Services::new(
        Arc::new(InMemoryStore::default()),
        ScoreEngine::new(config.scoring.clone()),
        SerpApiReviewSource::new(integrations.serpapi_key.clone()),
        GroqAnalyzer::new(
            integrations.groq_api_key.clone(),
            integrations.groq_model.clone(),
        ),
        CachedPlaces::new(GooglePlacesClient::new(integrations.google_api_key.clone())),
        config.cache.freshness(),
    )
}

/// Parse a community review given on the command line as `RATING:safe` or `RATING:unsafe`.
pub(crate) fn parse_review_signal(raw: &str) -> Result<ReviewSignal, String> {
    let (rating, verdict) = raw
        .trim()
        .split_once(':')
        .ok_or_else(|| format!("expected RATING:safe or RATING:unsafe, got '{raw}'"))?;

    let rating: u8 = rating
        .trim()
        .parse()
        .map_err(|err| format!("invalid rating '{rating}' ({err})"))?;
    if !(1..=5).contains(&rating) {
        return Err(format!("rating must be between 1 and 5, got {rating}"));
    }

    let felt_safe = match verdict.trim().to_ascii_lowercase().as_str() {
        "safe" | "yes" => true,
        "unsafe" | "no" => false,
        other => return Err(format!("expected 'safe' or 'unsafe', got '{other}'")),
    };

    Ok(ReviewSignal { rating, felt_safe })
}
