/// Depth aggregation.
///
/// A single descent logs dozens of samples within a few centimetres of each
/// other, and repeat visits never hit the same depths. Readings are binned
/// into fixed-width depth buckets anchored at the surface (bucket `k` covers
/// `[k*w, (k+1)*w)`) and each bucket is reduced to one value.

use std::collections::BTreeMap;

use crate::config::{validate_positive, ProfilesConfig, Reducer};
use crate::model::{DepthBucket, DepthProfile, Parameter, ProfileError, Reading, SiteId};

#[derive(Debug, Clone, PartialEq)]
pub struct DepthAggregator {
    bucket_width_m: f64,
    reducer: Reducer,
}

impl DepthAggregator {
    /// Fails with `InvalidConfiguration` unless the width is a positive,
    /// finite number of metres.
    pub fn new(bucket_width_m: f64, reducer: Reducer) -> Result<Self, ProfileError> {
        validate_positive("bucket width", bucket_width_m)?;
        Ok(Self { bucket_width_m, reducer })
    }

    pub fn from_config(config: &ProfilesConfig) -> Result<Self, ProfileError> {
        Self::new(config.bucket_width_m, config.reducer)
    }

    pub fn bucket_width_m(&self) -> f64 {
        self.bucket_width_m
    }

    pub fn reducer(&self) -> Reducer {
        self.reducer
    }

    /// `None` when the index does not fit a `u64` (a negative, non-finite
    /// or absurdly deep reading), instead of saturating into a shared bucket.
    fn bucket_index(&self, depth: f64) -> Option<u64> {
        let index = (depth / self.bucket_width_m).floor();
        // 2^64 is exact in f64; every smaller non-negative float converts losslessly.
        (index >= 0.0 && index < u64::MAX as f64).then_some(index as u64)
    }

    fn bucket_center(&self, index: u64) -> f64 {
        index as f64 * self.bucket_width_m + self.bucket_width_m / 2.0
    }

    /// Builds the profile of `parameter` from a site's member readings.
    ///
    /// Readings without a value for `parameter` are skipped, as are depths
    /// with no representable bucket. When none qualify the profile has no
    /// buckets.
    pub fn aggregate<'a, I>(&self, site_id: SiteId, members: I, parameter: Parameter) -> DepthProfile
    where
        I: IntoIterator<Item = &'a Reading>,
    {
        let mut bins: BTreeMap<u64, Vec<f64>> = BTreeMap::new();
        for reading in members {
            let Some(value) = reading.value(parameter) else {
                continue;
            };
            if let Some(index) = self.bucket_index(reading.depth) {
                bins.entry(index).or_default().push(value);
            }
        }

        let buckets = bins
            .into_iter()
            .filter_map(|(index, mut values)| {
                let sample_count = values.len();
                reduce(self.reducer, &mut values).map(|value| DepthBucket {
                    depth_center: self.bucket_center(index),
                    value,
                    sample_count,
                })
            })
            .collect();

        DepthProfile { site_id, parameter, buckets }
    }
}

/// Collapses one bucket. `None` only for an empty slice.
fn reduce(reducer: Reducer, values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    match reducer {
        Reducer::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
        Reducer::Median => {
            values.sort_by(|a, b| a.total_cmp(b));
            let mid = values.len() / 2;
            if values.len() % 2 == 1 {
                Some(values[mid])
            } else {
                Some((values[mid - 1] + values[mid]) * 0.5)
            }
        }
    }
}
