//! Density-based spatial clustering (DBSCAN) over case coordinates.
//!
//! Semantics:
//! - The neighbourhood of a point contains every point (itself included)
//!   strictly closer than `epsilon`.
//! - A point is a core point when its neighbourhood holds at least
//!   `min_points` points.
//! - Points are visited in input order. Clusters are numbered in creation
//!   order and list their members in discovery order.
//! - A border point joins the first cluster that reaches it.
//! - Points reachable from no core point are noise and belong to no cluster.

use crate::geo::{planar_distance_degrees, GeoPoint};

/// Indices into the input slice, one vector per cluster
pub type Cluster = Vec<usize>;

/// Result of one clustering pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clustering {
    pub clusters: Vec<Cluster>,
    /// Indices not reachable from any core point
    pub noise: Vec<usize>,
}

/// DBSCAN parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dbscan {
    /// Neighbourhood radius in decimal degrees
    pub epsilon: f64,
    pub min_points: usize,
}

impl Dbscan {
    pub fn new(epsilon: f64, min_points: usize) -> Self {
        Dbscan { epsilon, min_points }
    }

    /// Cluster `points`; the returned indices refer to positions in `points`
    pub fn run(&self, points: &[GeoPoint]) -> Clustering {
        let n = points.len();
        let mut visited = vec![false; n];
        let mut assigned = vec![false; n];
        let mut clustering = Clustering::default();

        for point in 0..n {
            if visited[point] {
                continue;
            }
            visited[point] = true;

            let neighbors = self.region_query(points, point);
            if neighbors.len() < self.min_points {
                clustering.noise.push(point);
                continue;
            }

            let mut cluster = vec![point];
            assigned[point] = true;
            self.expand(points, neighbors, &mut cluster, &mut visited, &mut assigned);
            clustering.clusters.push(cluster);
        }

        // Points first marked as noise may have joined a cluster as border points
        clustering.noise.retain(|&i| !assigned[i]);
        clustering
    }

    fn expand(
        &self,
        points: &[GeoPoint],
        seeds: Vec<usize>,
        cluster: &mut Cluster,
        visited: &mut [bool],
        assigned: &mut [bool],
    ) {
        let mut in_frontier = vec![false; points.len()];
        for &s in &seeds {
            in_frontier[s] = true;
        }
        let mut frontier = seeds;

        let mut cursor = 0;
        while cursor < frontier.len() {
            let candidate = frontier[cursor];
            cursor += 1;

            if !visited[candidate] {
                visited[candidate] = true;
                let reach = self.region_query(points, candidate);
                if reach.len() >= self.min_points {
                    for r in reach {
                        if !in_frontier[r] {
                            in_frontier[r] = true;
                            frontier.push(r);
                        }
                    }
                }
            }

            if !assigned[candidate] {
                assigned[candidate] = true;
                cluster.push(candidate);
            }
        }
    }

    fn region_query(&self, points: &[GeoPoint], index: usize) -> Vec<usize> {
        let origin = points[index];
        points
            .iter()
            .enumerate()
            .filter(|(_, p)| planar_distance_degrees(origin, **p) < self.epsilon)
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(lat: f64, lon: f64, count: usize, step: f64) -> Vec<GeoPoint> {
        (0..count)
            .map(|i| GeoPoint::new(lat, lon + i as f64 * step))
            .collect()
    }

    #[test]
    fn test_dense_group_forms_one_cluster() {
        let points = line(-16.68, -49.25, 5, 0.001);
        let result = Dbscan::new(0.02, 5).run(&points);
        assert_eq!(result.clusters, vec![vec![0, 1, 2, 3, 4]]);
        assert!(result.noise.is_empty());
    }

    #[test]
    fn test_below_min_points_is_noise() {
        let points = line(-16.68, -49.25, 4, 0.001);
        let result = Dbscan::new(0.02, 5).run(&points);
        assert!(result.clusters.is_empty());
        assert_eq!(result.noise, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_isolated_point_excluded() {
        let mut points = line(-16.68, -49.25, 5, 0.001);
        points.push(GeoPoint::new(-10.0, -40.0));
        let result = Dbscan::new(0.02, 5).run(&points);
        assert_eq!(result.clusters.len(), 1);
        assert!(!result.clusters[0].contains(&5));
        assert_eq!(result.noise, vec![5]);
    }

    #[test]
    fn test_two_separate_clusters_in_input_order() {
        let mut points = line(-16.68, -49.25, 5, 0.001);
        points.extend(line(-15.80, -47.90, 6, 0.001));
        let result = Dbscan::new(0.02, 5).run(&points);
        assert_eq!(result.clusters.len(), 2);
        assert_eq!(result.clusters[0], vec![0, 1, 2, 3, 4]);
        assert_eq!(result.clusters[1], vec![5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_distance_equal_to_epsilon_is_not_neighbor() {
        // Exactly epsilon apart on the latitude axis
        let points = vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.5, 0.0)];
        let result = Dbscan::new(0.5, 2).run(&points);
        assert!(result.clusters.is_empty());
        assert_eq!(result.noise.len(), 2);
    }

    #[test]
    fn test_border_point_joins_cluster() {
        // Core group at lon 0..0.004; the border point sees too few neighbours
        // to be core itself, but lies within epsilon of lon 0.004
        let mut points = line(0.0, 0.0, 5, 0.001);
        points.insert(0, GeoPoint::new(0.0, 0.022));
        let result = Dbscan::new(0.02, 5).run(&points);
        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.clusters[0].len(), 6);
        assert!(result.noise.is_empty(), "border point must leave the noise list");
    }

    #[test]
    fn test_empty_input() {
        let result = Dbscan::new(0.02, 5).run(&[]);
        assert_eq!(result, Clustering::default());
    }

    proptest! {
        #[test]
        fn prop_every_point_is_clustered_or_noise_exactly_once(
            coords in prop::collection::vec((-1.0f64..1.0, -1.0f64..1.0), 0..60)
        ) {
            let points: Vec<GeoPoint> = coords.iter().map(|(a, b)| GeoPoint::new(*a, *b)).collect();
            let result = Dbscan::new(0.2, 4).run(&points);

            let mut seen = vec![0u32; points.len()];
            for cluster in &result.clusters {
                prop_assert!(cluster.len() >= 4);
                for &i in cluster {
                    seen[i] += 1;
                }
            }
            for &i in &result.noise {
                seen[i] += 1;
            }
            prop_assert!(seen.iter().all(|&c| c == 1));
        }
    }
}
