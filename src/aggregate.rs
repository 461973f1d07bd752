// src/aggregate.rs
//! Windowed ranking over stored observations.

use chrono::{DateTime, Duration, Utc};
use metrics::gauge;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::category::{categorize, Category};
use crate::clock::Clock;
use crate::insight::InsightEngine;
use crate::metrics::AGGREGATE_GROUPS;
use crate::model::{AggregatedTrend, Observation, Summary};
use crate::store::SnapshotStore;

pub const DEFAULT_SCORE_WEIGHT: f64 = 0.1;
pub const DEFAULT_TOP_N: usize = 30;

/// Default window: one week.
pub fn default_window() -> Duration {
    Duration::days(7)
}

pub struct Aggregator {
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    weight: f64,
    insights: InsightEngine,
}

impl Aggregator {
    pub fn new(store: Arc<dyn SnapshotStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            weight: DEFAULT_SCORE_WEIGHT,
            insights: InsightEngine::default(),
        }
    }

    /// Recurrence bonus per sighting. Negative values are clamped to 0.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight.max(0.0);
        self
    }

    pub fn with_insights(mut self, insights: InsightEngine) -> Self {
        self.insights = insights;
        self
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn aggregate(&self, window: Duration, top_n: usize) -> Summary {
        let generated_at = self.clock.now();
        if window <= Duration::zero() {
            return Summary::empty(generated_at);
        }

        let scan = self.store.scan_window(window);
        if !scan.skipped.is_empty() {
            tracing::warn!(
                target: "aggregate",
                skipped = scan.skipped.len(),
                units_read = scan.units_read,
                "aggregating without unreadable units"
            );
        }
        if scan.observations.is_empty() {
            gauge!(AGGREGATE_GROUPS).set(0.0);
            return Summary::empty(generated_at);
        }

        let mut groups = group(&scan.observations, self.weight);
        gauge!(AGGREGATE_GROUPS).set(groups.len() as f64);

        let mut category_stats: BTreeMap<Category, usize> = BTreeMap::new();
        for g in &groups {
            *category_stats.entry(g.category).or_default() += 1;
        }

        groups.sort_by(rank_order);
        groups.truncate(top_n);

        let insights = self.insights.derive_insights(&groups);

        tracing::debug!(
            target: "aggregate",
            observations = scan.observations.len(),
            ranked = groups.len(),
            "aggregation complete"
        );

        Summary {
            generated_at,
            trends: groups,
            category_stats,
            insights,
        }
    }
}

struct Acc<'a> {
    frequency: usize,
    max_traffic: u64,
    latest: &'a Observation,
}

fn group(observations: &[Observation], weight: f64) -> Vec<AggregatedTrend> {
    let mut by_kw: HashMap<&str, Acc<'_>> = HashMap::new();
    for obs in observations {
        by_kw
            .entry(obs.keyword.as_str())
            .and_modify(|acc| {
                acc.frequency += 1;
                acc.max_traffic = acc.max_traffic.max(obs.traffic_numeric);
                if obs.timestamp > acc.latest.timestamp {
                    acc.latest = obs;
                }
            })
            .or_insert(Acc {
                frequency: 1,
                max_traffic: obs.traffic_numeric,
                latest: obs,
            });
    }

    by_kw
        .into_iter()
        .map(|(keyword, acc)| AggregatedTrend {
            keyword: keyword.to_string(),
            score: score(acc.max_traffic, acc.frequency, weight),
            max_traffic_numeric: acc.max_traffic,
            // stored category may predate the current trigger table
            category: categorize(&acc.latest.keyword),
            last_seen: acc.latest.timestamp,
            frequency: acc.frequency,
        })
        .collect()
}

/// `max_traffic * (1 + frequency * weight)`.
pub fn score(max_traffic: u64, frequency: usize, weight: f64) -> f64 {
    max_traffic as f64 * (1.0 + frequency as f64 * weight)
}

/// Score descending, then most recent, then keyword ascending.
pub fn rank_order(a: &AggregatedTrend, b: &AggregatedTrend) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| cmp_desc(a.last_seen, b.last_seen))
        .then_with(|| a.keyword.cmp(&b.keyword))
}

fn cmp_desc(a: DateTime<Utc>, b: DateTime<Utc>) -> Ordering {
    b.cmp(&a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::WindowScan;
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 8, 12, 0, 0).unwrap()
    }

    /// In-memory store: window filtering only, no files.
    struct MemStore {
        clock: Arc<dyn Clock>,
        rows: Mutex<Vec<Observation>>,
    }

    impl SnapshotStore for MemStore {
        fn append(
            &self,
            observations: &[Observation],
        ) -> crate::error::StoreResult<crate::model::SnapshotHandle> {
            self.rows.lock().unwrap().extend_from_slice(observations);
            Ok(crate::model::SnapshotHandle {
                name: "mem".into(),
                path: "mem".into(),
                timestamp: observations[0].timestamp,
                observations: observations.len(),
            })
        }

        fn scan_window(&self, window: Duration) -> WindowScan {
            let now = self.clock.now();
            let start = now - window;
            WindowScan {
                observations: self
                    .rows
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|o| o.timestamp >= start && o.timestamp <= now)
                    .cloned()
                    .collect(),
                units_read: 1,
                skipped: Vec::new(),
            }
        }
    }

    fn obs(kw: &str, traffic: u64, ts: DateTime<Utc>) -> Observation {
        Observation {
            id: format!("{kw}-{}", ts.timestamp()),
            timestamp: ts,
            keyword: kw.into(),
            traffic_numeric: traffic,
            category: Category::Other,
            raw_traffic_text: traffic.to_string(),
        }
    }

    fn aggregator(rows: Vec<Observation>) -> Aggregator {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now()));
        let store = Arc::new(MemStore {
            clock: clock.clone(),
            rows: Mutex::new(rows),
        });
        Aggregator::new(store, clock)
    }

    #[test]
    fn frequency_weighted_scores() {
        let t = now() - Duration::hours(1);
        let agg = aggregator(vec![
            obs("NFL playoffs", 2_000_000, t),
            obs("NFL playoffs", 2_000_000, t),
            obs("iPhone update", 500_000, t),
        ]);
        let s = agg.aggregate(default_window(), DEFAULT_TOP_N);
        assert_eq!(s.trends.len(), 2);

        let nfl = &s.trends[0];
        assert_eq!(nfl.keyword, "NFL playoffs");
        assert_eq!(nfl.frequency, 2);
        assert_eq!(nfl.max_traffic_numeric, 2_000_000);
        assert!((nfl.score - 2_400_000.0).abs() < 1e-6);
        assert_eq!(nfl.category, Category::Sports);

        let iphone = &s.trends[1];
        assert_eq!(iphone.frequency, 1);
        assert!((iphone.score - 550_000.0).abs() < 1e-6);
        assert_eq!(iphone.category, Category::TechAi);
    }

    #[test]
    fn ties_break_on_last_seen_then_keyword() {
        let old = now() - Duration::hours(5);
        let new = now() - Duration::hours(1);
        let agg = aggregator(vec![
            obs("beta", 100, old),
            obs("alpha", 100, old),
            obs("gamma", 100, new),
        ]);
        let s = agg.aggregate(default_window(), 10);
        let order: Vec<_> = s.trends.iter().map(|t| t.keyword.as_str()).collect();
        assert_eq!(order, vec!["gamma", "alpha", "beta"]);
    }

    #[test]
    fn histogram_covers_all_groups_not_only_top_n() {
        let t = now() - Duration::minutes(10);
        let agg = aggregator(vec![
            obs("NBA finals", 900, t),
            obs("Bitcoin price", 800, t),
            obs("mystery", 700, t),
            obs("OpenAI news", 600, t),
        ]);
        let s = agg.aggregate(default_window(), 1);
        assert_eq!(s.trends.len(), 1);
        assert_eq!(s.trends[0].keyword, "NBA finals");
        assert_eq!(s.category_stats.values().sum::<usize>(), 4);
        assert_eq!(s.category_stats[&Category::Finance], 1);
        assert_eq!(s.category_stats[&Category::Other], 1);
    }

    #[test]
    fn category_is_rederived_not_trusted() {
        let mut stale = obs("Champions League draw", 10, now() - Duration::hours(2));
        stale.category = Category::Finance;
        let s = aggregator(vec![stale]).aggregate(default_window(), 5);
        assert_eq!(s.trends[0].category, Category::Sports);
        assert_eq!(s.category_stats.get(&Category::Finance), None);
    }

    #[test]
    fn last_seen_is_latest_and_max_traffic_is_max() {
        let a = now() - Duration::days(3);
        let b = now() - Duration::days(1);
        let s = aggregator(vec![obs("xyz", 50, b), obs("xyz", 500, a)])
            .aggregate(default_window(), 5);
        assert_eq!(s.trends[0].last_seen, b);
        assert_eq!(s.trends[0].max_traffic_numeric, 500);
        assert_eq!(s.trends[0].frequency, 2);
    }

    #[test]
    fn window_edges() {
        let agg = aggregator(vec![
            obs("edge", 1, now() - Duration::days(7)),
            obs("stale", 1, now() - Duration::days(7) - Duration::seconds(1)),
        ]);
        let s = agg.aggregate(default_window(), 5);
        let kws: Vec<_> = s.trends.iter().map(|t| t.keyword.as_str()).collect();
        assert_eq!(kws, vec!["edge"]);

        assert!(agg.aggregate(Duration::zero(), 5).is_empty());
        let neg = agg.aggregate(Duration::hours(-3), 5);
        assert!(neg.is_empty());
        assert!(neg.category_stats.is_empty());
    }

    #[test]
    fn empty_store_gives_empty_summary() {
        let s = aggregator(Vec::new()).aggregate(default_window(), 5);
        assert!(s.trends.is_empty());
        assert!(s.category_stats.is_empty());
        assert!(s.insights.is_empty());
        assert_eq!(s.generated_at, now());
    }

    #[test]
    fn idempotent_and_top_n_larger_than_groups() {
        let t = now() - Duration::hours(1);
        let agg = aggregator(vec![obs("a", 3, t), obs("b", 2, t), obs("c", 1, t)]);
        let first = agg.aggregate(default_window(), 100);
        assert_eq!(first.trends.len(), 3);
        assert_eq!(first, agg.aggregate(default_window(), 100));
    }

    #[test]
    fn weight_changes_recurrence_bonus() {
        let t = now() - Duration::hours(1);
        let agg = aggregator(vec![obs("a", 100, t), obs("a", 100, t), obs("b", 150, t)]);
        // 100 * 1.2 = 120 < 150 * 1.1 = 165
        assert_eq!(agg.aggregate(default_window(), 2).trends[0].keyword, "b");
        let agg = agg.with_weight(1.0);
        // both score 300, keyword decides
        let s = agg.aggregate(default_window(), 2);
        assert_eq!(s.trends[0].keyword, "a");
        assert_eq!(s.trends[0].score, 300.0);
        assert_eq!(s.trends[1].score, 300.0);
    }
}
