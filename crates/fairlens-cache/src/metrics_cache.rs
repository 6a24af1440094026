//! Read-through metric cache.
//!
//! Values are cached per (feature index, model index, metric key). The feature
//! index only partitions the cache; the caller passes the bin vector of that
//! feature's current binning, which is what the fetcher scores against.
//!
//! Each slot is either ready or pending. A pending slot holds the shared
//! future of the fetch that will fill it, so concurrent requests for the same
//! key wait on one fetch. Every pending slot carries a ticket; a fetch only
//! writes its result back if its slot still holds its ticket, so a fetch that
//! outlives a [`MetricsCache::clear_cache`] cannot repopulate the cleared row.

use crate::cancel::CancellationToken;
use crate::error::{CacheError, FetchError, Result};
use crate::fetcher::{MetricFetcher, MetricRequest};
use crate::precomputed::{MetricMap, PrecomputedMetrics};
use crate::stats::{CacheStats, CacheStatsSnapshot};
use fairlens_metrics::{MetricValue, ParityMode};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, warn};

type FetchOutcome = std::result::Result<Arc<MetricValue>, FetchError>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

/// A fetch registered in a slot.
///
/// `settled` is set by the first waiter to write the outcome back, so the
/// bookkeeping for one fetch happens once however many callers share it.
#[derive(Clone)]
struct InFlight {
    ticket: u64,
    fetch: SharedFetch,
    settled: Arc<AtomicBool>,
}

enum Slot {
    Ready(Arc<MetricValue>),
    Pending(InFlight),
}

type Cell = HashMap<String, Slot>;

fn empty_row(model_count: usize) -> Vec<Cell> {
    (0..model_count).map(|_| Cell::new()).collect()
}

fn empty_grid(feature_count: usize, model_count: usize) -> Vec<Vec<Cell>> {
    (0..feature_count).map(|_| empty_row(model_count)).collect()
}

struct CacheState {
    grid: Vec<Vec<Cell>>,
    next_ticket: u64,
}

/// What a lookup found under the lock.
enum Lookup {
    Ready(Arc<MetricValue>),
    Wait(InFlight),
    NotComputable,
}

/// Memoizing cache of metric values over a `features x models` grid.
pub struct MetricsCache {
    feature_count: usize,
    model_count: usize,
    fetcher: Option<Arc<dyn MetricFetcher>>,
    state: Mutex<CacheState>,
    stats: CacheStats,
}

impl fmt::Debug for MetricsCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsCache")
            .field("feature_count", &self.feature_count)
            .field("model_count", &self.model_count)
            .field("has_fetcher", &self.fetcher.is_some())
            .finish_non_exhaustive()
    }
}

impl MetricsCache {
    /// Create an empty cache.
    ///
    /// # Arguments
    /// * `feature_count` - Number of feature binnings
    /// * `model_count` - Number of models
    /// * `fetcher` - Source of values on a miss; without one, misses are not computable
    pub fn new(
        feature_count: usize,
        model_count: usize,
        fetcher: Option<Arc<dyn MetricFetcher>>,
    ) -> Self {
        Self {
            feature_count,
            model_count,
            fetcher,
            state: Mutex::new(CacheState {
                grid: empty_grid(feature_count, model_count),
                next_ticket: 0,
            }),
            stats: CacheStats::default(),
        }
    }

    /// Create a cache seeded with precomputed values.
    ///
    /// The grid's shape fixes the feature and model counts. Returns an error if
    /// the rows disagree in length.
    pub fn from_precomputed(
        precomputed: PrecomputedMetrics,
        fetcher: Option<Arc<dyn MetricFetcher>>,
    ) -> Result<Self> {
        precomputed.validate()?;
        let feature_count = precomputed.feature_count();
        let model_count = precomputed.model_count();

        let grid = precomputed
            .into_grid()
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        cell.into_iter()
                            .map(|(key, value)| (key, Slot::Ready(Arc::new(value))))
                            .collect()
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            feature_count,
            model_count,
            fetcher,
            state: Mutex::new(CacheState {
                grid,
                next_ticket: 0,
            }),
            stats: CacheStats::default(),
        })
    }

    /// Number of feature binnings.
    pub const fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Number of models.
    pub const fn model_count(&self) -> usize {
        self.model_count
    }

    /// Whether misses can be fetched.
    pub const fn has_fetcher(&self) -> bool {
        self.fetcher.is_some()
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    fn check_indices(&self, feature_index: usize, model_index: usize) -> Result<()> {
        if feature_index >= self.feature_count {
            return Err(CacheError::IndexOutOfRange {
                axis: "feature",
                index: feature_index,
                size: self.feature_count,
            });
        }
        if model_index >= self.model_count {
            return Err(CacheError::IndexOutOfRange {
                axis: "model",
                index: model_index,
                size: self.model_count,
            });
        }
        Ok(())
    }

    /// Get a metric value, fetching it on a miss.
    ///
    /// Returns `Ok(None)` when the value is not cached and no fetcher is
    /// configured. Fetch failures are returned as [`CacheError::Fetch`] and
    /// are not cached.
    ///
    /// # Arguments
    /// * `bin_vector` - Group of every row under the binning of `feature_index`
    /// * `feature_index` - Cache partition for the binning
    /// * `model_index` - Model to score
    /// * `metric_key` - Metric to score
    pub async fn get_metric(
        &self,
        bin_vector: &[usize],
        feature_index: usize,
        model_index: usize,
        metric_key: &str,
    ) -> Result<Option<Arc<MetricValue>>> {
        self.resolve(bin_vector, feature_index, model_index, metric_key, None)
            .await
    }

    /// [`get_metric`](Self::get_metric) that stops waiting when `cancel` fires.
    ///
    /// A cancelled caller gets [`CacheError::Cancelled`]. The fetch itself stays
    /// registered so other waiters, or a later request, still receive it.
    pub async fn get_metric_with_cancel(
        &self,
        bin_vector: &[usize],
        feature_index: usize,
        model_index: usize,
        metric_key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<MetricValue>>> {
        self.resolve(
            bin_vector,
            feature_index,
            model_index,
            metric_key,
            Some(cancel),
        )
        .await
    }

    /// Disparity of a metric across the groups of a binning.
    ///
    /// Uses the same lookup-or-fetch path as [`get_metric`](Self::get_metric),
    /// so the fetched value is cached under the same key. Returns `NaN` when
    /// the value is not computable, has no per-group breakdown, has no valid
    /// group score, or is a ratio over a zero maximum.
    pub async fn get_disparity_metric(
        &self,
        bin_vector: &[usize],
        feature_index: usize,
        model_index: usize,
        metric_key: &str,
        mode: ParityMode,
    ) -> Result<f64> {
        let value = self
            .resolve(bin_vector, feature_index, model_index, metric_key, None)
            .await?;
        Ok(value.map_or(f64::NAN, |v| v.disparity(mode)))
    }

    /// [`get_disparity_metric`](Self::get_disparity_metric) that stops waiting when `cancel` fires.
    pub async fn get_disparity_metric_with_cancel(
        &self,
        bin_vector: &[usize],
        feature_index: usize,
        model_index: usize,
        metric_key: &str,
        mode: ParityMode,
        cancel: &CancellationToken,
    ) -> Result<f64> {
        let value = self
            .resolve(
                bin_vector,
                feature_index,
                model_index,
                metric_key,
                Some(cancel),
            )
            .await?;
        Ok(value.map_or(f64::NAN, |v| v.disparity(mode)))
    }

    /// Forget cached values.
    ///
    /// With `Some(feature_index)` only that feature's row (every model and
    /// metric) is reset; with `None` the whole grid is. Fetches in flight keep
    /// running for their callers but their results are not stored.
    pub async fn clear_cache(&self, feature_index: Option<usize>) -> Result<()> {
        let mut state = self.state.lock().await;
        match feature_index {
            Some(index) => {
                let row = state
                    .grid
                    .get_mut(index)
                    .ok_or(CacheError::IndexOutOfRange {
                        axis: "feature",
                        index,
                        size: self.feature_count,
                    })?;
                *row = empty_row(self.model_count);
                debug!(feature_index = index, "cleared metric cache row");
            }
            None => {
                state.grid = empty_grid(self.feature_count, self.model_count);
                debug!("cleared metric cache");
            }
        }
        self.stats.clear();
        Ok(())
    }

    /// Whether a ready value is cached for the key.
    pub async fn contains(
        &self,
        feature_index: usize,
        model_index: usize,
        metric_key: &str,
    ) -> bool {
        let state = self.state.lock().await;
        matches!(
            state
                .grid
                .get(feature_index)
                .and_then(|row| row.get(model_index))
                .and_then(|cell| cell.get(metric_key)),
            Some(Slot::Ready(_))
        )
    }

    /// Number of ready values.
    pub async fn len(&self) -> usize {
        let state = self.state.lock().await;
        state
            .grid
            .iter()
            .flatten()
            .map(|cell| {
                cell.values()
                    .filter(|slot| matches!(slot, Slot::Ready(_)))
                    .count()
            })
            .sum()
    }

    /// Whether no ready value is cached.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copy every ready value into a precomputed grid.
    pub async fn snapshot(&self) -> PrecomputedMetrics {
        let state = self.state.lock().await;
        let grid = state
            .grid
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        cell.iter()
                            .filter_map(|(key, slot)| match slot {
                                Slot::Ready(value) => Some((key.clone(), value.as_ref().clone())),
                                Slot::Pending(_) => None,
                            })
                            .collect::<MetricMap>()
                    })
                    .collect()
            })
            .collect();
        PrecomputedMetrics::new(grid)
    }

    async fn lookup(
        &self,
        bin_vector: &[usize],
        feature_index: usize,
        model_index: usize,
        metric_key: &str,
    ) -> Lookup {
        let mut state = self.state.lock().await;
        let CacheState { grid, next_ticket } = &mut *state;
        let cell = &mut grid[feature_index][model_index];

        match cell.get(metric_key) {
            Some(Slot::Ready(value)) => {
                self.stats.hit();
                debug!(feature_index, model_index, metric_key, "metric cache hit");
                return Lookup::Ready(Arc::clone(value));
            }
            Some(Slot::Pending(flight)) => {
                self.stats.join();
                debug!(
                    feature_index,
                    model_index,
                    metric_key,
                    "joining in-flight metric fetch"
                );
                return Lookup::Wait(flight.clone());
            }
            None => {}
        }

        self.stats.miss();
        let Some(fetcher) = self.fetcher.as_ref() else {
            debug!(
                feature_index,
                model_index,
                metric_key,
                "metric not computable without a fetcher"
            );
            return Lookup::NotComputable;
        };

        let request = MetricRequest::new(metric_key, bin_vector.to_vec(), model_index);
        let fetch = fetcher
            .fetch(request)
            .map(|outcome| outcome.map(Arc::new))
            .boxed()
            .shared();
        let ticket = *next_ticket;
        *next_ticket += 1;
        let flight = InFlight {
            ticket,
            fetch,
            settled: Arc::new(AtomicBool::new(false)),
        };
        cell.insert(metric_key.to_string(), Slot::Pending(flight.clone()));
        self.stats.fetch();
        debug!(feature_index, model_index, metric_key, ticket, "fetching metric");

        Lookup::Wait(flight)
    }

    async fn resolve(
        &self,
        bin_vector: &[usize],
        feature_index: usize,
        model_index: usize,
        metric_key: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<Arc<MetricValue>>> {
        self.check_indices(feature_index, model_index)?;

        let flight = match self
            .lookup(bin_vector, feature_index, model_index, metric_key)
            .await
        {
            Lookup::Ready(value) => return Ok(Some(value)),
            Lookup::NotComputable => return Ok(None),
            Lookup::Wait(flight) => flight,
        };

        let fetch = flight.fetch.clone();
        let outcome = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        debug!(feature_index, model_index, metric_key, "metric request cancelled");
                        return Err(CacheError::Cancelled);
                    }
                    outcome = fetch => outcome,
                }
            }
            None => fetch.await,
        };

        self.settle(feature_index, model_index, metric_key, &flight, &outcome)
            .await;

        Ok(Some(outcome?))
    }

    /// Write a finished fetch back into its slot if the slot still holds its ticket.
    ///
    /// Only the first waiter to get here does anything; later waiters on the
    /// same fetch return at once.
    async fn settle(
        &self,
        feature_index: usize,
        model_index: usize,
        metric_key: &str,
        flight: &InFlight,
        outcome: &FetchOutcome,
    ) {
        let mut state = self.state.lock().await;
        if flight.settled.swap(true, Ordering::AcqRel) {
            return;
        }
        let cell = &mut state.grid[feature_index][model_index];

        let owns_slot = matches!(
            cell.get(metric_key),
            Some(Slot::Pending(current)) if current.ticket == flight.ticket
        );

        if !owns_slot {
            if outcome.is_ok() {
                self.stats.stale_discard();
                debug!(
                    feature_index,
                    model_index,
                    metric_key,
                    ticket = flight.ticket,
                    "discarding metric fetched before cache clear"
                );
            }
            return;
        }

        match outcome {
            Ok(value) => {
                cell.insert(metric_key.to_string(), Slot::Ready(Arc::clone(value)));
            }
            Err(err) => {
                cell.remove(metric_key);
                self.stats.fetch_error();
                warn!(
                    feature_index,
                    model_index,
                    metric_key,
                    error = %err,
                    "metric fetch failed"
                );
            }
        }
    }
}
