use crate::constants::{ RELEVANCE_WINDOW_SECS, SUMMARY_CACHE_MIN_COUNT, WEIGHT_INCREMENT_SECS };
use crate::database::{ Database, DatabaseResult };
use crate::logger::{ self, LogTag };

/// Weighted statistics for one exchange bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedStats {
    pub mean: f64,
    pub stddev: f64,
    /// Sum of all weights used
    pub weight: f64,
    /// Count of considered rows
    pub count: i64,
}

/// Recomputes `currency_summary` buckets from sale history
///
/// The sole writer of the summary table. Each currency-denominated sale
/// triggers a recomputation of its bucket from the sales inside the
/// relevance window, unless a recent-enough cached row short-circuits it.
pub struct SummaryUpdater<'a> {
    db: &'a Database,
    /// Cutoff for considering "old" data
    relevant: i64,
    /// Weight unit: a half-day increment
    weight_increment: i64,
    /// Caching horizon in seconds; None disables caching
    recent: Option<i64>,
}

impl<'a> SummaryUpdater<'a> {
    pub fn new(db: &'a Database, recent: Option<i64>) -> Self {
        Self {
            db,
            relevant: RELEVANCE_WINDOW_SECS,
            weight_increment: WEIGHT_INCREMENT_SECS,
            recent,
        }
    }

    /// Update the summary bucket for a new sale of `name` priced in
    /// `currency`
    ///
    /// Skips the recomputation when an existing summary is well-populated
    /// and fresh; in that case in-pass valuations keep using the cached
    /// mean.
    pub fn update_currency_summary(
        &self,
        name: &str,
        currency: &str,
        league: &str,
        sale_time: i64
    ) -> DatabaseResult<()> {
        let existing = self.db.get_summary(name, currency, league)?;
        let now = crate::database::unix_now();

        if let (Some(recent), Some(existing)) = (self.recent, &existing) {
            if existing.count >= SUMMARY_CACHE_MIN_COUNT && existing.updated_at >= now - recent {
                logger::debug(
                    LogTag::Currency,
                    &format!("Skipping cached currency: {}->{} {}", name, currency, league)
                );
                return Ok(());
            }
        }

        let stats = self.get_mean_and_std(name, currency, league, sale_time)?;
        let stats = match stats {
            Some(stats) => stats,
            // Empty bucket: nothing to write
            None => {
                return Ok(());
            }
        };

        logger::debug(
            LogTag::Currency,
            &format!("Weighted stddev of sale of {} in {} = {}", name, currency, stats.stddev)
        );

        self.db.upsert_summary(
            name,
            currency,
            league,
            stats.count,
            stats.mean,
            stats.stddev,
            stats.weight
        )
    }

    /// Weighted mean and standard deviation for a bucket's sales inside
    /// the relevance window, with one outlier-rejection pass
    pub fn get_mean_and_std(
        &self,
        name: &str,
        currency: &str,
        league: &str,
        sale_time: i64
    ) -> DatabaseResult<Option<WeightedStats>> {
        let now = crate::database::unix_now();
        let observations = self.db.bucket_observations(name, currency, league, now - self.relevant)?;
        if observations.is_empty() {
            return Ok(None);
        }

        // Later sales weigh more: a half-day increment over the age of
        // the observation, floored to keep near-coincident sales bounded
        let mut prices: Vec<f64> = Vec::with_capacity(observations.len());
        let mut weights: Vec<f64> = Vec::with_capacity(observations.len());
        for obs in &observations {
            prices.push(obs.sale_amount);
            weights.push((self.weight_increment as f64) / ((sale_time - obs.item_updated_at).max(1) as f64));
        }

        let (mut mean, mut stddev) = weighted_mean_stddev(&prices, &weights);
        let mut count = prices.len();
        let mut total_weight = compensated_sum(&weights);

        if count > 3 && stddev > mean / 2.0 {
            logger::debug(
                LogTag::Currency,
                &format!(
                    "{}->{}: Large stddev={} vs mean={}, recalibrating",
                    name,
                    currency,
                    stddev,
                    mean
                )
            );
            // Throw out values outside of 2 stddev and try again, once
            let keep: Vec<bool> = prices
                .iter()
                .map(|p| (p - mean).abs() <= stddev * 2.0)
                .collect();
            let kept_prices: Vec<f64> = prices
                .iter()
                .zip(&keep)
                .filter_map(|(p, k)| k.then_some(*p))
                .collect();
            let kept_weights: Vec<f64> = weights
                .iter()
                .zip(&keep)
                .filter_map(|(w, k)| k.then_some(*w))
                .collect();

            let (m, s) = weighted_mean_stddev(&kept_prices, &kept_weights);
            mean = m;
            stddev = s;
            total_weight = compensated_sum(&kept_weights);
            logger::debug(
                LogTag::Currency,
                &format!(
                    "Recalibration ignored {} rows, final stddev={}, mean={}",
                    count - kept_prices.len(),
                    stddev,
                    mean
                )
            );
            count = kept_prices.len();
        }

        Ok(
            Some(WeightedStats {
                mean,
                stddev,
                weight: total_weight,
                count: count as i64,
            })
        )
    }
}

/// Weighted mean and population standard deviation
///
/// `stddev = sqrt(sum(w * (x - mean)^2) / sum(w))`, accumulated with
/// compensated summation so large buckets stay accurate.
pub fn weighted_mean_stddev(prices: &[f64], weights: &[f64]) -> (f64, f64) {
    debug_assert_eq!(prices.len(), weights.len());
    if prices.is_empty() {
        return (0.0, 0.0);
    }

    let mut weight_sum = KahanSum::new();
    let mut weighted_prices = KahanSum::new();
    for (p, w) in prices.iter().zip(weights) {
        weight_sum.add(*w);
        weighted_prices.add(p * w);
    }
    let mean = weighted_prices.value() / weight_sum.value();

    let mut weighted_sq = KahanSum::new();
    for (p, w) in prices.iter().zip(weights) {
        let d = p - mean;
        weighted_sq.add(w * d * d);
    }
    let variance = weighted_sq.value() / weight_sum.value();

    (mean, variance.sqrt())
}

/// Compensated sum of a slice
fn compensated_sum(values: &[f64]) -> f64 {
    let mut sum = KahanSum::new();
    for v in values {
        sum.add(*v);
    }
    sum.value()
}

/// Kahan compensated accumulator
struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    fn new() -> Self {
        Self { sum: 0.0, compensation: 0.0 }
    }

    fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    fn value(&self) -> f64 {
        self.sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_weights_match_plain_mean() {
        let prices = [1.0, 2.0, 3.0, 4.0];
        let weights = [1.0, 1.0, 1.0, 1.0];
        let (mean, stddev) = weighted_mean_stddev(&prices, &weights);
        assert!((mean - 2.5).abs() < 1e-12);
        // Population stddev of 1..4
        assert!((stddev - (1.25f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_weights_shift_the_mean() {
        let prices = [1.0, 3.0];
        let weights = [3.0, 1.0];
        let (mean, _) = weighted_mean_stddev(&prices, &weights);
        assert!((mean - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_observation_has_zero_stddev() {
        let (mean, stddev) = weighted_mean_stddev(&[42.0], &[7.0]);
        assert_eq!(mean, 42.0);
        assert_eq!(stddev, 0.0);
    }

    #[test]
    fn test_compensated_sum_is_stable() {
        // Naive summation loses the small terms entirely
        let mut values = vec![1e16];
        values.extend(std::iter::repeat(1.0).take(1000));
        let sum = compensated_sum(&values);
        assert_eq!(sum, 1e16 + 1000.0);
    }
}
