#[cfg(test)]
mod tests {
    use crate::cluster::{
        Cluster, Point, PointStore, cluster, cluster_with_tile_size, new_kd_tree, project,
        region_query,
    };
    use quickcheck::{QuickCheck, TestResult};

    // 1 px per degree at zoom 0 makes thresholds read as degrees on the equator
    const UNIT_TILE: f64 = 360.0;

    fn store(coords: &[(f64, f64)]) -> PointStore {
        coords
            .iter()
            .enumerate()
            .map(|(i, &(lat, lng))| Point::bare(format!("p{i}"), lat, lng))
            .collect()
    }

    fn member_ids(c: &Cluster) -> Vec<&str> {
        c.members.iter().map(|m| m.id.as_str()).collect()
    }

    fn arbitrary_store(raw: &[(i16, i16)]) -> PointStore {
        let coords: Vec<(f64, f64)> = raw
            .iter()
            .map(|&(a, b)| (a as f64 / 400.0, b as f64 / 200.0))
            .collect();
        store(&coords)
    }

    #[test]
    fn test_range_query_kdtree() {
        // Verify that KD-Tree & region query give the same results
        let points = store(&[
            (59.955982, 30.244759),
            (59.955975, 30.24472),
            (59.96698, 30.244358),
            (59.951557, 30.258387),
            (60.029499, 30.434124),
        ]);
        let projected: Vec<_> = points.iter().map(|p| project(p, 14.0, 256.0)).collect();
        let tree = new_kd_tree(projected.clone());
        assert!(tree.height() >= 3);

        for pt in &projected {
            let mut pts1 = tree.in_range(pt, 120.0, Vec::new());
            let mut pts2 = region_query(&projected, pt, 120.0);
            pts1.sort();
            pts2.sort();
            assert_eq!(pts1, pts2);
        }
    }

    #[test]
    fn test_kdtree_builds_with_nan_coordinates() {
        let points = store(&[
            (1.0, 1.0),
            (f64::NAN, 2.0),
            (3.0, f64::NAN),
            (4.0, 4.0),
            (f64::NAN, f64::NAN),
        ]);
        let projected: Vec<_> = points.iter().map(|p| project(p, 0.0, UNIT_TILE)).collect();
        let tree = new_kd_tree(projected.clone());
        assert_eq!(tree.points.len(), 5);
        assert_eq!(tree.height(), 3);
    }

    #[test]
    fn prop_kdtree_matches_region_query() {
        fn prop(raw: Vec<(i16, i16)>, eps: u8) -> bool {
            let points = arbitrary_store(&raw);
            let projected: Vec<_> = points.iter().map(|p| project(p, 2.0, 256.0)).collect();
            let tree = new_kd_tree(projected.clone());
            let eps = eps as f64;
            projected.iter().all(|pt| {
                let mut a = tree.in_range(pt, eps, Vec::new());
                let mut b = region_query(&projected, pt, eps);
                a.sort();
                b.sort();
                a == b
            })
        }
        QuickCheck::new().quickcheck(prop as fn(Vec<(i16, i16)>, u8) -> bool);
    }

    #[test]
    fn test_scenario_a_three_close_points() {
        let points = store(&[(0.0, 0.0), (0.0001, 0.0001), (0.0002, 0.0)]);
        // ~30 m at zoom 16 is ~14 px
        let clusters = cluster(&points, 15.0, 16.0);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].count(), 3);
        assert_eq!(member_ids(&clusters[0]), vec!["p0", "p1", "p2"]);
        assert!((clusters[0].lat - 0.0001).abs() < 1e-12);
        assert!((clusters[0].lng - 0.0001 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_scenario_b_far_points() {
        let points = store(&[(0.0, 0.0), (10.0, 10.0)]);
        let clusters = cluster(&points, 40.0, 10.0);

        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| c.is_singleton()));
        assert_eq!(clusters[0].lat, 0.0);
        assert_eq!(clusters[1].lat, 10.0);
    }

    #[test]
    fn test_empty_input() {
        let clusters = cluster(&PointStore::<()>::new(Vec::new()), 40.0, 10.0);
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_non_positive_threshold_disables_clustering() {
        let points = store(&[(0.0, 0.0), (0.0, 0.0), (0.0, 0.0)]);
        for t in [0.0, -5.0, f64::NAN] {
            let clusters = cluster(&points, t, 18.0);
            assert_eq!(clusters.len(), 3);
            assert!(clusters.iter().all(|c| c.is_singleton()));
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let points = store(&[(0.0, 0.0), (1.0, 0.0)]);
        let clusters = cluster_with_tile_size(&points, 1.0, 0.0, UNIT_TILE);
        assert_eq!(clusters.len(), 1);
    }

    #[test]
    fn test_point_joins_first_reaching_seed() {
        // p2 is within reach of both p0 and p1, but p0 opened first
        let points = store(&[(0.0, 0.0), (0.0, 1.5), (0.0, 0.9)]);
        let clusters = cluster_with_tile_size(&points, 1.0, 0.0, UNIT_TILE);

        assert_eq!(clusters.len(), 2);
        assert_eq!(member_ids(&clusters[0]), vec!["p0", "p2"]);
        assert_eq!(member_ids(&clusters[1]), vec!["p1"]);
    }

    #[test]
    fn test_members_may_span_twice_the_threshold() {
        let points = store(&[(0.0, 0.0), (0.0, -0.95), (0.0, 0.95)]);
        let clusters = cluster_with_tile_size(&points, 1.0, 0.0, UNIT_TILE);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].count(), 3);
    }

    #[test]
    fn test_cluster_id_survives_reordering() {
        let a = store(&[(0.0, 0.0), (0.0, 0.5), (20.0, 20.0)]);
        let b: PointStore = vec![
            Point::bare("p2", 20.0, 20.0),
            Point::bare("p1", 0.0, 0.5),
            Point::bare("p0", 0.0, 0.0),
        ]
        .into();

        let ca = cluster_with_tile_size(&a, 1.0, 0.0, UNIT_TILE);
        let cb = cluster_with_tile_size(&b, 1.0, 0.0, UNIT_TILE);
        assert_eq!(ca.len(), 2);
        assert_eq!(cb.len(), 2);
        assert_eq!(ca[0].id, cb[1].id);
        assert_eq!(ca[1].id, cb[0].id);
        assert_ne!(ca[0].id, ca[1].id);
    }

    #[test]
    fn prop_partition() {
        fn prop(raw: Vec<(i16, i16)>, threshold: u8) -> TestResult {
            let points = arbitrary_store(&raw);
            let clusters = cluster(&points, threshold as f64, 4.0);

            let mut seen: Vec<&str> = clusters
                .iter()
                .flat_map(|c| c.members.iter().map(|m| m.id.as_str()))
                .collect();
            seen.sort_unstable();
            let mut expected: Vec<&str> = points.iter().map(|p| p.id.as_str()).collect();
            expected.sort_unstable();

            let counts_ok = clusters.iter().all(|c| c.count() >= 1);
            TestResult::from_bool(seen == expected && counts_ok)
        }
        QuickCheck::new().quickcheck(prop as fn(Vec<(i16, i16)>, u8) -> TestResult);
    }

    #[test]
    fn prop_deterministic() {
        fn prop(raw: Vec<(i16, i16)>, threshold: u8) -> bool {
            let points = arbitrary_store(&raw);
            let first = cluster(&points, threshold as f64, 3.0);
            let second = cluster(&points, threshold as f64, 3.0);
            first == second
        }
        QuickCheck::new().quickcheck(prop as fn(Vec<(i16, i16)>, u8) -> bool);
    }

    #[test]
    fn prop_centroid_is_member_mean() {
        fn prop(raw: Vec<(i16, i16)>, threshold: u8) -> bool {
            let points = arbitrary_store(&raw);
            cluster(&points, threshold as f64, 3.0).iter().all(|c| {
                let Some((lat, lng)) = c.centroid() else {
                    return false;
                };
                (lat - c.lat).abs() < 1e-9 && (lng - c.lng).abs() < 1e-9
            })
        }
        QuickCheck::new().quickcheck(prop as fn(Vec<(i16, i16)>, u8) -> bool);
    }
}
