//! Keyword research orchestration.
//!
//! One call runs strictly in sequence: cache lookup, credential resolution,
//! optional provider fetch, heuristic fallback, ranking, cache write. Every
//! failure after input validation degrades to a smaller feature set instead
//! of an error; what happened is reported through [`Diagnostic`]s kept apart
//! from the candidates themselves.
//!
//! Counters go through the `metrics` facade. They are only collected when
//! `observability.metrics_enabled` installs a recorder for the run.

use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheError, CacheLookup, CacheStore, FileBackend};
use crate::clients::{DataForSeoClient, MetricsProvider, ProviderError};
use crate::config::Config;
use crate::credentials::{CredentialError, CredentialOrigin, CredentialResolver, Resolution};
use crate::models::{KeywordCandidate, KeywordMetrics, Source, Topic};
use crate::services::{heuristic, scoring};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResearchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result of trying the provider.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(Vec<KeywordMetrics>),
    Fallback(ProviderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Fresh(Source),
    Cached { source: Source, age_days: i64 },
}

impl Provenance {
    #[must_use]
    pub const fn source(&self) -> Source {
        match self {
            Self::Fresh(source) | Self::Cached { source, .. } => *source,
        }
    }

    #[must_use]
    pub const fn is_cached(&self) -> bool {
        matches!(self, Self::Cached { .. })
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fresh(source) => write!(f, "{source}"),
            Self::Cached { source, age_days } => {
                write!(f, "{source} (cached, age: {age_days} days)")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

/// Side-channel report of what a research call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    CacheHit {
        source: Source,
        age_days: i64,
    },
    CacheExpired {
        age_days: i64,
    },
    CacheReadFailed(CacheError),
    CacheStored,
    CacheWriteFailed(CacheError),
    CredentialFound {
        origin: CredentialOrigin,
    },
    CredentialAbsent,
    CredentialSourceFailed {
        origin: CredentialOrigin,
        error: CredentialError,
    },
    CredentialRejected {
        origin: CredentialOrigin,
        error: CredentialError,
    },
    ProviderFailed(ProviderError),
    ProviderShortfall {
        returned: usize,
        padded: usize,
    },
}

impl Diagnostic {
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::CacheHit { .. } | Self::CacheStored | Self::CredentialFound { .. } => {
                Severity::Info
            }
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CacheHit { source, age_days } => {
                write!(f, "Cache hit, {source} results (age: {age_days} days)")
            }
            Self::CacheExpired { age_days } => write!(
                f,
                "Cached results expired (age: {age_days} days), fetching fresh data"
            ),
            Self::CacheReadFailed(e) => {
                write!(f, "Cache read failed ({e}), fetching fresh data")
            }
            Self::CacheStored => write!(f, "Results cached"),
            Self::CacheWriteFailed(e) => write!(f, "Could not write to cache ({e})"),
            Self::CredentialFound { origin } => {
                write!(f, "Using DataForSEO API (credential from {origin})")
            }
            Self::CredentialAbsent => {
                writeln!(f, "API key not found. Using heuristic fallback.")?;
                writeln!(f, "  Credential options:")?;
                writeln!(f, "  1. Set the DATAFORSEO_API_KEY environment variable")?;
                writeln!(f, "  2. Run `keyscout setup` to create the credential file")?;
                writeln!(f, "  3. Pass --api-key 'login:password'")?;
                writeln!(f, "  4. Pass --interactive to be prompted")?;
                write!(f, "  Plain 'login:password' and Base64-encoded values both work.")
            }
            Self::CredentialSourceFailed { origin, error } => {
                write!(f, "Skipped credentials from {origin}: {error}")
            }
            Self::CredentialRejected { origin, error } => {
                writeln!(f, "Credential from {origin} rejected: {error}")?;
                writeln!(f, "  Expected e.g. user@example.com:mypassword123")?;
                write!(f, "  Falling back to heuristic mode.")
            }
            Self::ProviderFailed(e) => {
                writeln!(f, "Provider request failed: {e}")?;
                for hint in e.hints() {
                    writeln!(f, "  - {hint}")?;
                }
                write!(f, "  Falling back to heuristic mode.")
            }
            Self::ProviderShortfall { returned, padded } => write!(
                f,
                "Provider returned {returned} keywords; added {padded} heuristic suggestions"
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResearchReport {
    /// Ranked best first.
    pub candidates: Vec<KeywordCandidate>,

    pub provenance: Provenance,

    pub diagnostics: Vec<Diagnostic>,
}

impl ResearchReport {
    /// The keyword a caller should target: the top of the ranking.
    #[must_use]
    pub fn top(&self) -> Option<&KeywordCandidate> {
        self.candidates.first()
    }
}

pub struct Researcher {
    provider: Box<dyn MetricsProvider>,
    credentials: CredentialResolver,
    cache: Option<CacheStore>,
    cache_heuristic: bool,
}

impl Researcher {
    #[must_use]
    pub fn new(provider: Box<dyn MetricsProvider>, credentials: CredentialResolver) -> Self {
        Self {
            provider,
            credentials,
            cache: None,
            cache_heuristic: true,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn cache_heuristic(mut self, enabled: bool) -> Self {
        self.cache_heuristic = enabled;
        self
    }

    /// Production wiring: DataForSEO client, standard credential chain and,
    /// unless disabled, the file-backed cache.
    #[must_use]
    pub fn from_config(config: &Config, interactive: bool, use_cache: bool) -> Self {
        let researcher = Self::new(
            Box::new(DataForSeoClient::new(&config.provider)),
            CredentialResolver::standard(&config.credentials, interactive),
        )
        .cache_heuristic(config.cache.cache_heuristic);

        if use_cache && config.cache.enabled {
            let backend = FileBackend::new(config.cache.resolved_directory());
            let ttl = chrono::Duration::days(i64::from(config.cache.ttl_days));
            researcher.with_cache(CacheStore::with_ttl(Box::new(backend), ttl))
        } else {
            researcher
        }
    }

    pub async fn research(
        &self,
        topic: &str,
        count: usize,
        credential_override: Option<&str>,
    ) -> Result<ResearchReport, ResearchError> {
        let topic = Topic::parse(topic).ok_or_else(|| {
            ResearchError::InvalidInput("topic must contain at least one letter or digit".into())
        })?;
        if count == 0 {
            return Err(ResearchError::InvalidInput("count must be at least 1".into()));
        }

        let mut diagnostics = Vec::new();

        if let Some(hit) = self.check_cache(&topic, count, &mut diagnostics) {
            return Ok(ResearchReport {
                candidates: hit.0,
                provenance: hit.1,
                diagnostics,
            });
        }

        let outcome = self
            .attempt_provider(&topic, count, credential_override, &mut diagnostics)
            .await;

        let (batch, source) = match outcome {
            Some(FetchOutcome::Fetched(fetched)) => (
                complete_provider_batch(&topic, count, fetched, &mut diagnostics),
                Source::Provider,
            ),
            Some(FetchOutcome::Fallback(error)) => {
                warn!(kind = error.kind.as_str(), %error, "Provider failed, using heuristics");
                metrics::counter!("keyscout_provider_failures_total", "kind" => error.kind.as_str())
                    .increment(1);
                diagnostics.push(Diagnostic::ProviderFailed(error));
                (heuristic::generate(&topic, count), Source::Heuristic)
            }
            None => (heuristic::generate(&topic, count), Source::Heuristic),
        };

        let mut candidates = scoring::score_and_rank(batch, &topic);
        candidates.truncate(count);

        metrics::counter!("keyscout_research_total", "source" => source.as_str()).increment(1);
        info!(topic = %topic, count, %source, "Keyword research complete");

        let cacheable = source == Source::Provider || self.cache_heuristic;
        if let Some(cache) = self.cache.as_ref().filter(|_| cacheable) {
            match cache.put(&topic, count, &candidates, source) {
                Ok(()) => diagnostics.push(Diagnostic::CacheStored),
                Err(e) => {
                    warn!(error = %e, "Could not write to cache");
                    diagnostics.push(Diagnostic::CacheWriteFailed(e));
                }
            }
        }

        Ok(ResearchReport {
            candidates,
            provenance: Provenance::Fresh(source),
            diagnostics,
        })
    }

    fn check_cache(
        &self,
        topic: &Topic,
        count: usize,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<(Vec<KeywordCandidate>, Provenance)> {
        let cache = self.cache.as_ref()?;

        match cache.lookup(topic, count) {
            CacheLookup::Hit(hit) if hit.candidates.len() == count => {
                metrics::counter!("keyscout_cache_hits_total").increment(1);
                let age_days = hit.age_days();
                info!(topic = %topic, age_days, "Serving cached results");
                diagnostics.push(Diagnostic::CacheHit {
                    source: hit.source,
                    age_days,
                });
                return Some((
                    hit.candidates,
                    Provenance::Cached {
                        source: hit.source,
                        age_days,
                    },
                ));
            }
            CacheLookup::Hit(_) | CacheLookup::Miss => {}
            CacheLookup::Expired { age } => diagnostics.push(Diagnostic::CacheExpired {
                age_days: age.num_days(),
            }),
            CacheLookup::Failed(e) => diagnostics.push(Diagnostic::CacheReadFailed(e)),
        }

        metrics::counter!("keyscout_cache_misses_total").increment(1);
        None
    }

    /// `None` when no usable credential exists and the provider is skipped.
    async fn attempt_provider(
        &self,
        topic: &Topic,
        count: usize,
        credential_override: Option<&str>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<FetchOutcome> {
        let report = self.credentials.resolve(credential_override);
        diagnostics.extend(
            report
                .skipped
                .into_iter()
                .map(|(origin, error)| Diagnostic::CredentialSourceFailed { origin, error }),
        );

        let credential = match report.resolution {
            Resolution::Found { credential, origin } => {
                diagnostics.push(Diagnostic::CredentialFound { origin });
                credential
            }
            Resolution::Rejected { origin, error } => {
                diagnostics.push(Diagnostic::CredentialRejected { origin, error });
                return None;
            }
            Resolution::Absent => {
                debug!("No provider credential, heuristic mode");
                diagnostics.push(Diagnostic::CredentialAbsent);
                return None;
            }
        };

        Some(match self.provider.fetch(topic, count, &credential).await {
            Ok(fetched) => FetchOutcome::Fetched(fetched),
            Err(error) => FetchOutcome::Fallback(error),
        })
    }
}

/// Pads a short provider batch with heuristic keywords and fills in
/// related hints the provider did not supply.
fn complete_provider_batch(
    topic: &Topic,
    count: usize,
    mut fetched: Vec<KeywordMetrics>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<KeywordMetrics> {
    let returned = fetched.len();

    if returned < count {
        let present: HashSet<String> = fetched.iter().map(|m| m.phrase.clone()).collect();
        let padding: Vec<KeywordMetrics> = heuristic::generate(topic, count + returned)
            .into_iter()
            .filter(|m| !present.contains(&m.phrase))
            .take(count - returned)
            .collect();

        diagnostics.push(Diagnostic::ProviderShortfall {
            returned,
            padded: padding.len(),
        });
        fetched.extend(padding);
    }

    heuristic::fill_related(topic, &mut fetched);
    fetched
}
