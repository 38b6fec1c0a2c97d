/// Query façade for the presentation layer.
///
/// `ProfileService` owns one ingestion run (readings plus their site
/// partition) and memoizes depth profiles keyed by `(site id, parameter)`.
/// Queries take `&self` and may run concurrently; the cache sits behind a
/// single `RwLock`. Re-ingesting takes `&mut self` and drops the whole cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::analysis::groupings::{SiteResolution, SiteResolver};
use crate::analysis::profiles::DepthAggregator;
use crate::config::Config;
use crate::logging::{self, Stage};
use crate::model::{Coordinate, DepthProfile, Parameter, ProfileError, Reading, SiteId, SiteSummary};

type ProfileCache = HashMap<(SiteId, Parameter), Arc<DepthProfile>>;

pub struct ProfileService {
    resolver: SiteResolver,
    aggregator: DepthAggregator,
    resolution: SiteResolution,
    cache: RwLock<ProfileCache>,
    computations: AtomicUsize,
}

impl ProfileService {
    /// Creates an empty service. Fails with `InvalidConfiguration` on a bad
    /// threshold or bucket width.
    pub fn new(config: &Config) -> Result<Self, ProfileError> {
        Ok(Self::with_parts(
            SiteResolver::from_config(&config.clustering)?,
            DepthAggregator::from_config(&config.profiles)?,
        ))
    }

    pub fn with_parts(resolver: SiteResolver, aggregator: DepthAggregator) -> Self {
        Self {
            resolver,
            aggregator,
            resolution: SiteResolution::default(),
            cache: RwLock::new(HashMap::new()),
            computations: AtomicUsize::new(0),
        }
    }

    /// Replaces the current data set: re-resolves sites from scratch and
    /// invalidates every cached profile.
    pub fn ingest(&mut self, readings: Vec<Reading>) {
        self.resolution = self.resolver.resolve(readings);
        self.cache
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    pub fn resolution(&self) -> &SiteResolution {
        &self.resolution
    }

    /// Site index for the map, in id order.
    pub fn list_sites(&self) -> Vec<SiteSummary> {
        self.resolution.sites().iter().map(|s| s.summary()).collect()
    }

    /// "Sample Site 1", the southernmost site.
    pub fn default_site(&self) -> Option<SiteSummary> {
        self.resolution.southernmost().map(|s| s.summary())
    }

    /// Site under a clicked map coordinate: the nearest site within the
    /// proximity threshold.
    pub fn locate(&self, latitude: f64, longitude: f64) -> Option<SiteSummary> {
        let id = self
            .resolver
            .nearest(self.resolution.sites(), &Coordinate::new(latitude, longitude))?;
        self.resolution.site(id).map(|s| s.summary())
    }

    /// Profile of a parameter given by name (`"ph"`, `"Chl ug/L"`, ...).
    pub fn profile(&self, site_id: SiteId, parameter: &str) -> Result<Arc<DepthProfile>, ProfileError> {
        let parameter = parameter.parse::<Parameter>()?;
        self.profile_for(site_id, parameter)
    }

    /// Profile of `parameter` at `site_id`, computed once and then served
    /// from the cache. An unknown site is `NotFound`; a site with no data
    /// for the parameter gets an empty profile.
    pub fn profile_for(&self, site_id: SiteId, parameter: Parameter) -> Result<Arc<DepthProfile>, ProfileError> {
        let site = self
            .resolution
            .site(site_id)
            .ok_or(ProfileError::NotFound(site_id))?;

        let key = (site_id, parameter);
        if let Some(profile) = self.read_cache().get(&key) {
            return Ok(Arc::clone(profile));
        }

        let mut cache = self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(profile) = cache.get(&key) {
            return Ok(Arc::clone(profile));
        }

        let profile = Arc::new(self.aggregator.aggregate(
            site_id,
            self.resolution.members(site),
            parameter,
        ));
        self.computations.fetch_add(1, Ordering::Relaxed);

        let context = site.label.clone();
        logging::debug(
            Stage::Aggregator,
            Some(&context),
            &format!(
                "{} profile: {} bucket(s) from {} sample(s)",
                parameter,
                profile.buckets.len(),
                profile.sample_count()
            ),
        );

        cache.insert(key, Arc::clone(&profile));
        Ok(profile)
    }

    /// One profile per known parameter, in `Parameter::ALL` order.
    pub fn profiles_for_site(&self, site_id: SiteId) -> Result<Vec<Arc<DepthProfile>>, ProfileError> {
        Parameter::ALL
            .iter()
            .map(|&parameter| self.profile_for(site_id, parameter))
            .collect()
    }

    /// How many profiles have actually been aggregated (cache misses).
    pub fn computation_count(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, ProfileCache> {
        self.cache.read().unwrap_or_else(|poisoned| {
            logging::warn(Stage::Query, None, "profile cache lock was poisoned; continuing");
            poisoned.into_inner()
        })
    }
}
