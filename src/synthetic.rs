//! Synthetic stop catalogs for stress testing and benchmarking.
//!
//! Generates an agency catalog of stations with quays and a mapped catalog
//! of platforms placed near them, with controllable positional noise,
//! missing names, missing platform tags and authoritative external refs.
//! Every quay's own platform is recorded as ground truth.
//!
//! Feature-gated behind `synthetic`, not included in production builds.
//!
//! # Example
//!
//! ```rust
//! use stopmatch::synthetic::SyntheticScenario;
//!
//! let dataset = SyntheticScenario::small_town().generate();
//! assert_eq!(dataset.metadata.quay_count, 40);
//! assert_eq!(dataset.expectations.len(), 40);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::validation::MatchExpectation;
use crate::{AgencyStop, FeatureKind, GeoPoint, MappedFeature, TransitMode};

// ============================================================================
// Types
// ============================================================================

/// Scenario configuration for generating synthetic catalogs.
#[derive(Debug, Clone)]
pub struct SyntheticScenario {
    /// South-west corner of the station grid.
    pub origin: GeoPoint,
    pub station_count: usize,
    /// Quays per station; odd quays head "forward", even ones "backward".
    pub quays_per_station: usize,
    /// Spacing of the station grid in meters.
    pub station_spacing_m: f64,
    /// Distance between neighbouring quays of one station in meters.
    pub quay_spacing_m: f64,
    /// Maximum offset of a mapped platform from its quay in meters.
    pub position_noise_m: f64,
    /// Fraction of mapped platforms without a name.
    pub missing_name_fraction: f64,
    /// Fraction of mapped platforms without a platform tag.
    pub missing_platform_fraction: f64,
    /// Fraction of mapped platforms carrying the agency id as external ref.
    pub external_ref_fraction: f64,
    /// Unrelated mapped features scattered over the grid.
    pub distractor_count: usize,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

/// Dataset statistics.
#[derive(Debug, Clone, Default)]
pub struct DatasetMetadata {
    pub station_count: usize,
    pub quay_count: usize,
    pub feature_count: usize,
}

/// A generated pair of catalogs with ground truth.
pub struct SyntheticDataset {
    pub stops: Vec<AgencyStop>,
    pub features: Vec<MappedFeature>,
    /// One `Matched` expectation per quay.
    pub expectations: Vec<MatchExpectation>,
    pub metadata: DatasetMetadata,
}

// ============================================================================
// Coordinate Helpers
// ============================================================================

/// Meters per degree of latitude (approximately constant).
const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Shift a point by metric offsets to the north and east.
fn offset(point: &GeoPoint, north_m: f64, east_m: f64) -> GeoPoint {
    let meters_per_deg_lng = METERS_PER_DEG_LAT * point.latitude.to_radians().cos();
    let dlng = if meters_per_deg_lng.abs() < 1e-10 {
        0.0
    } else {
        east_m / meters_per_deg_lng
    };
    GeoPoint::new(
        point.latitude + north_m / METERS_PER_DEG_LAT,
        point.longitude + dlng,
    )
}

fn jitter(point: &GeoPoint, max_m: f64, rng: &mut StdRng) -> GeoPoint {
    if max_m <= 0.0 {
        return *point;
    }
    offset(
        point,
        rng.gen_range(-max_m..=max_m),
        rng.gen_range(-max_m..=max_m),
    )
}

// ============================================================================
// Names
// ============================================================================

const PLACES: &[&str] = &[
    "Rathaus",
    "Marktplatz",
    "Kirche",
    "Schule",
    "Friedhof",
    "Post",
    "Sportplatz",
    "Krankenhaus",
    "Museum",
    "Freibad",
];

const STREETS: &[&str] = &[
    "Hauptstraße",
    "Bahnhofstraße",
    "Lindenweg",
    "Gartenstraße",
    "Am Ochsenwald",
    "Thingstraße",
    "Waldburgstraße",
    "Albblick",
];

fn station_name(index: usize) -> String {
    let place = PLACES[index % PLACES.len()];
    let street = STREETS[(index / PLACES.len()) % STREETS.len()];
    format!("{} {}", place, street)
}

// ============================================================================
// Generation
// ============================================================================

impl SyntheticScenario {
    /// Generate both catalogs and the ground truth.
    pub fn generate(&self) -> SyntheticDataset {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let columns = (self.station_count as f64).sqrt().ceil().max(1.0) as usize;
        let names: Vec<String> = (0..self.station_count).map(station_name).collect();

        let mut stops = Vec::with_capacity(self.station_count * (self.quays_per_station + 1));
        let mut features = Vec::with_capacity(
            self.station_count * self.quays_per_station + self.distractor_count,
        );
        let mut expectations = Vec::with_capacity(self.station_count * self.quays_per_station);

        for (s, name) in names.iter().enumerate() {
            let centre = offset(
                &self.origin,
                (s / columns) as f64 * self.station_spacing_m,
                (s % columns) as f64 * self.station_spacing_m,
            );
            let station_id = format!("de:08111:{}", 1000 + s);
            let mode = if s % 4 == 3 {
                TransitMode::Tram
            } else {
                TransitMode::Bus
            };

            let mut station = AgencyStop::new(&station_id, name, centre);
            station.mode = mode;
            stops.push(station);

            let next = &names[(s + 1) % names.len()];
            let prev = &names[(s + names.len() - 1) % names.len()];

            for q in 1..=self.quays_per_station {
                let quay_id = format!("{}:0:{}", station_id, q);
                let position = offset(&centre, 0.0, q as f64 * self.quay_spacing_m);
                let forward = q % 2 == 1;
                let (towards, away) = if forward { (next, prev) } else { (prev, next) };

                let mut quay = AgencyStop::new(&quay_id, name, position);
                quay.parent_id = Some(station_id.clone());
                quay.mode = mode;
                quay.platform_code = Some(q.to_string());
                quay.direction_hint = Some(format!("Ri {}", towards));
                quay.served_routes = Some(vec![(10 + s % 7).to_string()]);
                stops.push(quay);

                let feature_id = format!("n{}", features.len() + 1);
                let feature_name =
                    (!rng.gen_bool(self.missing_name_fraction)).then_some(name.as_str());
                let mut feature = MappedFeature::new(
                    &feature_id,
                    feature_name,
                    jitter(&position, self.position_noise_m, &mut rng),
                    FeatureKind::Platform,
                );
                feature.mode = Some(mode);
                if !rng.gen_bool(self.missing_platform_fraction) {
                    feature.assumed_platform = Some(q.to_string());
                }
                if rng.gen_bool(self.external_ref_fraction) {
                    feature.external_ref = Some(quay_id.clone());
                }
                feature.next_names = Some(towards.clone());
                feature.prev_names = Some(away.clone());
                features.push(feature);

                expectations.push(MatchExpectation::matched(&quay_id, &feature_id));
            }
        }

        let extent_m = columns as f64 * self.station_spacing_m;
        for d in 0..self.distractor_count {
            let position = offset(
                &self.origin,
                rng.gen_range(0.0..extent_m.max(1.0)),
                rng.gen_range(0.0..extent_m.max(1.0)),
            );
            let name = STREETS[d % STREETS.len()];
            let mut feature = MappedFeature::new(
                &format!("w{}", d + 1),
                Some(name),
                position,
                FeatureKind::Stop,
            );
            feature.mode = Some(TransitMode::Bus);
            features.push(feature);
        }

        let metadata = DatasetMetadata {
            station_count: self.station_count,
            quay_count: self.station_count * self.quays_per_station,
            feature_count: features.len(),
        };

        SyntheticDataset {
            stops,
            features,
            expectations,
            metadata,
        }
    }
}

// ============================================================================
// Preset Scenarios
// ============================================================================

/// Stuttgart-Rohr, where curated regressions come from.
const STUTTGART: GeoPoint = GeoPoint {
    latitude: 48.7075,
    longitude: 9.1130,
};

impl SyntheticScenario {
    /// 20 stations with 2 quays each, clean data. Baseline benchmark.
    pub fn small_town() -> Self {
        Self {
            origin: STUTTGART,
            station_count: 20,
            quays_per_station: 2,
            station_spacing_m: 600.0,
            quay_spacing_m: 25.0,
            position_noise_m: 5.0,
            missing_name_fraction: 0.0,
            missing_platform_fraction: 0.2,
            external_ref_fraction: 0.0,
            distractor_count: 10,
            seed: 42,
        }
    }

    /// 2000 stations with 4 quays each and noisy tags. Regional scale.
    pub fn regional() -> Self {
        Self {
            origin: STUTTGART,
            station_count: 2000,
            quays_per_station: 4,
            station_spacing_m: 450.0,
            quay_spacing_m: 20.0,
            position_noise_m: 15.0,
            missing_name_fraction: 0.1,
            missing_platform_fraction: 0.5,
            external_ref_fraction: 0.2,
            distractor_count: 2000,
            seed: 43,
        }
    }

    /// Few large hubs with many quays each. Exercises the group safeguards.
    pub fn dense_hubs() -> Self {
        Self {
            origin: STUTTGART,
            station_count: 25,
            quays_per_station: 16,
            station_spacing_m: 800.0,
            quay_spacing_m: 8.0,
            position_noise_m: 6.0,
            missing_name_fraction: 0.05,
            missing_platform_fraction: 0.3,
            external_ref_fraction: 0.1,
            distractor_count: 100,
            seed: 44,
        }
    }

    /// Same layout as `small_town` with a custom station count.
    pub fn with_station_count(count: usize) -> Self {
        Self {
            station_count: count,
            ..Self::small_town()
        }
    }
}
