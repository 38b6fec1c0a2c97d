/// Groups a flat reading set into sampling sites by GPS proximity.
///
/// Boats drift and handheld GPS wanders, so two visits to the same buoy rarely
/// log identical coordinates. Readings are clustered in a single greedy pass:
///
/// 1. readings are visited in input order;
/// 2. each reading joins the nearest existing site whose centroid lies within
///    the proximity threshold (lowest site id wins a tie);
/// 3. otherwise it founds a new site centred on its own coordinate.
///
/// A site's centroid is the coordinate of its first reading and never moves.

use crate::analysis::geodesy::distance_m;
use crate::config::{validate_positive, ClusteringConfig};
use crate::logging::{self, Stage};
use crate::model::{Coordinate, ProfileError, Reading, Site, SiteId};

// ---------------------------------------------------------------------------
// Resolution result
// ---------------------------------------------------------------------------

/// The readings of one ingestion run together with their site partition.
///
/// Every reading index appears in exactly one site's `members`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteResolution {
    readings: Vec<Reading>,
    sites: Vec<Site>,
}

impl SiteResolution {
    /// Sites in id order.
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn site(&self, id: SiteId) -> Option<&Site> {
        self.sites.get(id)
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// The readings assigned to `site`, in input order.
    pub fn members<'a>(&'a self, site: &'a Site) -> impl Iterator<Item = &'a Reading> + 'a {
        site.members.iter().filter_map(move |&i| self.readings.get(i))
    }

    /// The southernmost site ("Sample Site 1").
    pub fn southernmost(&self) -> Option<&Site> {
        self.sites.iter().min_by(|a, b| {
            a.centroid
                .latitude
                .total_cmp(&b.centroid.latitude)
                .then(a.id.cmp(&b.id))
        })
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SiteResolver {
    threshold_m: f64,
}

impl SiteResolver {
    /// Fails with `InvalidConfiguration` unless the threshold is a positive,
    /// finite number of metres.
    pub fn new(threshold_m: f64) -> Result<Self, ProfileError> {
        validate_positive("proximity threshold", threshold_m)?;
        Ok(Self { threshold_m })
    }

    pub fn from_config(config: &ClusteringConfig) -> Result<Self, ProfileError> {
        Self::new(config.proximity_threshold_m)
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    /// Partitions `readings` into sites. Deterministic for a given input order.
    pub fn resolve(&self, readings: Vec<Reading>) -> SiteResolution {
        let mut sites: Vec<Site> = Vec::new();

        for (index, reading) in readings.iter().enumerate() {
            match self.nearest(&sites, &reading.coordinate) {
                Some(id) => sites[id].members.push(index),
                None => {
                    let id = sites.len();
                    sites.push(Site {
                        id,
                        label: String::new(),
                        centroid: reading.coordinate,
                        members: vec![index],
                    });
                }
            }
        }

        assign_labels(&mut sites);

        logging::info(
            Stage::Resolver,
            None,
            &format!(
                "Resolved {} readings into {} site(s) (threshold {} m)",
                readings.len(),
                sites.len(),
                self.threshold_m
            ),
        );

        SiteResolution { readings, sites }
    }

    /// Id of the site whose centroid is closest to `coordinate`, if that
    /// distance is within the threshold. Equidistant sites resolve to the
    /// lowest id.
    pub fn nearest(&self, sites: &[Site], coordinate: &Coordinate) -> Option<SiteId> {
        let mut best: Option<(SiteId, f64)> = None;
        for site in sites {
            let d = distance_m(&site.centroid, coordinate);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((site.id, d)),
            }
        }
        best.filter(|&(_, d)| d <= self.threshold_m).map(|(id, _)| id)
    }
}

/// Numbers sites "Sample Site 1..N" from south to north; equal latitudes
/// keep id order.
fn assign_labels(sites: &mut [Site]) {
    let mut order: Vec<usize> = (0..sites.len()).collect();
    order.sort_by(|&a, &b| {
        sites[a]
            .centroid
            .latitude
            .total_cmp(&sites[b].centroid.latitude)
            .then(a.cmp(&b))
    });
    for (rank, index) in order.into_iter().enumerate() {
        sites[index].label = format!("Sample Site {}", rank + 1);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
