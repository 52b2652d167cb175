use serde::Serialize;
use std::collections::HashMap;

/// A query and how often it has been searched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularSearch {
    pub query: String,
    pub count: u64,
}

/// Search history and popularity, updated on every tracked search.
#[derive(Debug, Default)]
pub(crate) struct SearchStats {
    /// Every query in call order.
    history: Vec<String>,
    /// One entry per distinct query, in first-seen order.
    ranking: Vec<PopularSearch>,
    /// Query -> position in `ranking`.
    index: HashMap<String, usize>,
}

impl SearchStats {
    pub(crate) fn record(&mut self, query: &str) {
        self.history.push(query.to_string());
        match self.index.get(query) {
            Some(&position) => self.ranking[position].count += 1,
            None => {
                self.index.insert(query.to_string(), self.ranking.len());
                self.ranking.push(PopularSearch {
                    query: query.to_string(),
                    count: 1,
                });
            }
        }
    }

    /// The last `limit` queries, oldest first.
    pub(crate) fn history(&self, limit: usize) -> Vec<String> {
        let start = self.history.len().saturating_sub(limit);
        self.history[start..].to_vec()
    }

    /// Most searched first; equal counts keep first-seen order.
    pub(crate) fn popular(&self, limit: usize) -> Vec<PopularSearch> {
        let mut ranked = self.ranking.clone();
        // `sort_by` is stable, which is what preserves first-seen order on ties.
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(limit);
        ranked
    }

    pub(crate) fn count_of(&self, query: &str) -> u64 {
        self.index
            .get(query)
            .map(|&position| self.ranking[position].count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_for(queries: &[&str]) -> SearchStats {
        let mut stats = SearchStats::default();
        for query in queries {
            stats.record(query);
        }
        stats
    }

    #[test]
    fn test_history_is_tail_in_call_order() {
        let stats = stats_for(&["a", "b", "c", "d"]);
        assert_eq!(stats.history(2), vec!["c", "d"]);
        assert_eq!(stats.history(10), vec!["a", "b", "c", "d"]);
        assert!(stats.history(0).is_empty());
    }

    #[test]
    fn test_counts_are_exact_per_query() {
        let stats = stats_for(&["grid", "Grid", "grid", "hedge"]);
        assert_eq!(stats.count_of("grid"), 2);
        assert_eq!(stats.count_of("Grid"), 1);
        assert_eq!(stats.count_of("hedge"), 1);
        assert_eq!(stats.count_of("never"), 0);
    }

    #[test]
    fn test_popular_ties_keep_first_seen_order() {
        let stats = stats_for(&["scalper", "grid", "news", "grid", "news", "martingale"]);
        let popular: Vec<_> = stats.popular(10).into_iter().map(|p| (p.query, p.count)).collect();

        assert_eq!(
            popular,
            vec![
                ("grid".to_string(), 2),
                ("news".to_string(), 2),
                ("scalper".to_string(), 1),
                ("martingale".to_string(), 1),
            ]
        );
        assert_eq!(stats.popular(1).len(), 1);
    }
}
