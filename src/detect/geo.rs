//! Spatial grouping of geotagged reports.

use crate::model::Report;
use tracing::{info, warn};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle (haversine) distance between two WGS84 points, in km.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a =
        (dlat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Group reports by proximity with a single greedy pass.
///
/// Reports without coordinates are silently excluded. Iterating in input
/// order, each unassigned report seeds a new cluster and pulls in every
/// remaining unassigned report within `max_distance_km` of the seed.
/// Membership is measured against the seed only, so a cluster is a
/// single-link approximation, not a pairwise-connected group. Clusters
/// come out in seed-encounter order and are never empty.
pub fn cluster_by_location(reports: &[Report], max_distance_km: f64) -> Vec<Vec<Report>> {
    let geo_reports: Vec<(&Report, crate::model::Location)> = reports
        .iter()
        .filter_map(|r| r.location.map(|loc| (r, loc)))
        .collect();

    if geo_reports.is_empty() {
        warn!("No reports with geographic coordinates");
        return Vec::new();
    }

    let mut clusters: Vec<Vec<Report>> = Vec::new();
    let mut assigned = vec![false; geo_reports.len()];

    for i in 0..geo_reports.len() {
        if assigned[i] {
            continue;
        }

        let (seed, seed_loc) = geo_reports[i];
        let mut cluster = vec![seed.clone()];
        assigned[i] = true;

        for j in (i + 1)..geo_reports.len() {
            if assigned[j] {
                continue;
            }
            let (other, other_loc) = geo_reports[j];
            let distance =
                haversine_km(seed_loc.lat, seed_loc.lng, other_loc.lat, other_loc.lng);

            if distance <= max_distance_km {
                cluster.push(other.clone());
                assigned[j] = true;
            }
        }

        clusters.push(cluster);
    }

    info!(clusters = clusters.len(), "Geographic clustering complete");
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Location;
    use chrono::Utc;

    fn report_at(id: &str, location: Option<(f64, f64)>) -> Report {
        Report {
            id: id.to_string(),
            text: "signalement".to_string(),
            created_at: Utc::now(),
            priority: 1,
            categories: Vec::new(),
            sentiment: None,
            location: location.map(|(lat, lng)| Location { lat, lng }),
            processed: false,
            incident_id: None,
        }
    }

    #[test]
    fn test_haversine_paris_to_london() {
        // Paris: 48.8566°N, 2.3522°E / London: 51.5074°N, 0.1278°W
        let distance = haversine_km(48.8566, 2.3522, 51.5074, -0.1278);
        // Expected ~340 km
        assert!((distance - 340.0).abs() < 20.0);
    }

    #[test]
    fn test_haversine_same_location() {
        let distance = haversine_km(45.7578, 4.8320, 45.7578, 4.8320);
        assert!(distance < 0.001);
    }

    #[test]
    fn test_nearby_reports_form_one_cluster() {
        let batch = vec![
            report_at("a", Some((45.7578, 4.8320))),
            report_at("b", Some((45.7580, 4.8318))),
            report_at("c", Some((45.7575, 4.8325))),
        ];

        let clusters = cluster_by_location(&batch, 1.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
        assert_eq!(clusters[0][0].id, "a"); // seed first, in input order
    }

    #[test]
    fn test_distant_reports_split_and_ungeotagged_excluded() {
        let batch = vec![
            report_at("lyon", Some((45.7578, 4.8320))),
            report_at("nowhere", None),
            report_at("paris", Some((48.8566, 2.3522))),
        ];

        let clusters = cluster_by_location(&batch, 1.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0][0].id, "lyon");
        assert_eq!(clusters[1][0].id, "paris");
        let total: usize = clusters.iter().map(|c| c.len()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_every_geotagged_report_in_exactly_one_cluster_within_seed_range() {
        let coords = [
            (45.7578, 4.8320),
            (45.7580, 4.8318),
            (45.7600, 4.8400),
            (45.7700, 4.8600),
            (48.8566, 2.3522),
        ];
        let batch: Vec<Report> = coords
            .iter()
            .enumerate()
            .map(|(i, &(lat, lng))| report_at(&format!("r{i}"), Some((lat, lng))))
            .collect();

        let max_km = 1.0;
        let clusters = cluster_by_location(&batch, max_km);

        let mut seen = std::collections::HashSet::new();
        for cluster in &clusters {
            assert!(!cluster.is_empty());
            let seed = cluster[0].location.unwrap();
            for member in cluster {
                assert!(seen.insert(member.id.clone()), "report assigned twice");
                let loc = member.location.unwrap();
                assert!(haversine_km(seed.lat, seed.lng, loc.lat, loc.lng) <= max_km);
            }
        }
        assert_eq!(seen.len(), batch.len());
    }
}
