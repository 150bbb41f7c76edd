//! Nearest grid point search.
//!
//! Distances are planar, in degrees: the latitude difference and the
//! longitude difference (wrapped into [0, 180]) combined with a Euclidean
//! norm. When several grid points are equally close, the one stored first
//! in the message wins. Every strategy returns identical matches.

use tracing::debug;

use crate::config::MatchStrategy;

/// Smallest bucket edge, in degrees.
const MIN_CELL_DEGREES: f64 = 0.1;
/// Target average number of grid points per bucket.
const POINTS_PER_BUCKET: f64 = 4.0;
const EPSILON: f64 = 1e-9;

/// The grid point closest to one query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPoint {
    /// Index of the grid point in storage order.
    pub index: usize,
    /// Planar distance in degrees.
    pub distance: f64,
}

impl NearestPoint {
    fn improves_on(&self, best: &Option<NearestPoint>) -> bool {
        match best {
            None => true,
            Some(b) => {
                self.distance < b.distance || (self.distance == b.distance && self.index < b.index)
            }
        }
    }
}

/// Planar distance in degrees between two points.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = lat1 - lat2;
    let mut dlon = (lon1 - lon2).abs() % 360.0;
    if dlon > 180.0 {
        dlon = 360.0 - dlon;
    }
    (dlat * dlat + dlon * dlon).sqrt()
}

/// Find the nearest grid point for each query `(latitude, longitude)`.
///
/// Returns `None` for a query only when the grid has no point with finite
/// coordinates.
pub fn nearest_points(
    latitudes: &[f64],
    longitudes: &[f64],
    queries: &[(f64, f64)],
    strategy: MatchStrategy,
) -> Vec<Option<NearestPoint>> {
    let strategy = strategy.resolve(queries.len());
    debug!(
        grid_points = latitudes.len(),
        queries = queries.len(),
        %strategy,
        "Matching query points to grid"
    );

    match strategy {
        MatchStrategy::BruteForce => queries
            .iter()
            .map(|&(lat, lon)| brute_force(latitudes, longitudes, lat, lon))
            .collect(),
        MatchStrategy::BucketIndex | MatchStrategy::Auto => {
            let index = BucketIndex::build(latitudes, longitudes);
            queries
                .iter()
                .map(|&(lat, lon)| index.nearest(lat, lon))
                .collect()
        }
    }
}

/// Scan every grid point.
pub fn brute_force(
    latitudes: &[f64],
    longitudes: &[f64],
    lat: f64,
    lon: f64,
) -> Option<NearestPoint> {
    let mut best: Option<NearestPoint> = None;
    for (index, (&grid_lat, &grid_lon)) in latitudes.iter().zip(longitudes).enumerate() {
        let d = distance(lat, lon, grid_lat, grid_lon);
        if !d.is_finite() {
            continue;
        }
        if best.map_or(true, |b| d < b.distance) {
            best = Some(NearestPoint { index, distance: d });
        }
    }
    best
}

/// Grid points bucketed into square latitude/longitude cells.
///
/// Columns always tile the full 360° so the search wraps across the
/// antimeridian. Rows only cover the grid's latitude range. Bucket contents
/// are stored contiguously in ascending grid index order.
#[derive(Debug)]
pub struct BucketIndex<'g> {
    latitudes: &'g [f64],
    longitudes: &'g [f64],
    min_latitude: f64,
    cell: f64,
    rows: usize,
    cols: usize,
    offsets: Vec<u32>,
    entries: Vec<u32>,
}

impl<'g> BucketIndex<'g> {
    pub fn build(latitudes: &'g [f64], longitudes: &'g [f64]) -> Self {
        let valid: Vec<usize> = latitudes
            .iter()
            .zip(longitudes)
            .enumerate()
            .filter(|(_, (lat, lon))| lat.is_finite() && lon.is_finite())
            .map(|(i, _)| i)
            .collect();

        let mut index = Self {
            latitudes,
            longitudes,
            min_latitude: 0.0,
            cell: 360.0,
            rows: 0,
            cols: 0,
            offsets: vec![0],
            entries: Vec::new(),
        };
        if valid.is_empty() {
            return index;
        }

        let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_lon, mut max_lon) = (f64::INFINITY, f64::NEG_INFINITY);
        for &i in &valid {
            min_lat = min_lat.min(latitudes[i]);
            max_lat = max_lat.max(latitudes[i]);
            let lon = normalize_longitude(longitudes[i]);
            min_lon = min_lon.min(lon);
            max_lon = max_lon.max(lon);
        }

        let lat_span = (max_lat - min_lat).max(MIN_CELL_DEGREES);
        let lon_span = (max_lon - min_lon).max(MIN_CELL_DEGREES);
        let cell = (lat_span * lon_span / valid.len() as f64 * POINTS_PER_BUCKET)
            .sqrt()
            .clamp(MIN_CELL_DEGREES, 360.0);
        let cols = (360.0 / cell).ceil().max(1.0) as usize;

        index.min_latitude = min_lat;
        index.cell = 360.0 / cols as f64;
        index.cols = cols;
        index.rows = ((max_lat - min_lat) / index.cell).floor() as usize + 1;

        // Counting sort into buckets; `valid` is ascending so each bucket is too
        let buckets: Vec<usize> = valid
            .iter()
            .map(|&i| {
                let (row, col) = index.bucket_of(latitudes[i], longitudes[i]);
                row * cols + col
            })
            .collect();
        let mut counts = vec![0u32; index.rows * cols + 1];
        for &b in &buckets {
            counts[b + 1] += 1;
        }
        for b in 1..counts.len() {
            counts[b] += counts[b - 1];
        }
        let mut cursor = counts.clone();
        let mut entries = vec![0u32; valid.len()];
        for (&i, &b) in valid.iter().zip(&buckets) {
            entries[cursor[b] as usize] = i as u32;
            cursor[b] += 1;
        }

        index.offsets = counts;
        index.entries = entries;

        debug!(
            points = valid.len(),
            rows = index.rows,
            cols = index.cols,
            cell_degrees = index.cell,
            "Built bucket index"
        );
        index
    }

    /// Bucket edge in degrees.
    pub fn cell_size(&self) -> f64 {
        self.cell
    }

    pub fn nearest(&self, lat: f64, lon: f64) -> Option<NearestPoint> {
        if self.rows == 0 || !lat.is_finite() || !lon.is_finite() {
            return None;
        }

        let (row, col) = self.bucket_of(lat, lon);
        let max_ring = self.rows.max(self.cols / 2);
        let mut best: Option<NearestPoint> = None;

        for ring in 0..=max_ring {
            self.for_each_in_ring(row, col, ring, |bucket| {
                let start = self.offsets[bucket] as usize;
                let end = self.offsets[bucket + 1] as usize;
                for &i in &self.entries[start..end] {
                    let i = i as usize;
                    let candidate = NearestPoint {
                        index: i,
                        distance: distance(lat, lon, self.latitudes[i], self.longitudes[i]),
                    };
                    if candidate.improves_on(&best) {
                        best = Some(candidate);
                    }
                }
            });

            // Anything outside rings 0..=ring is at least ring * cell away
            if let Some(b) = best {
                if b.distance + EPSILON < ring as f64 * self.cell {
                    break;
                }
            }
        }

        best
    }

    fn bucket_of(&self, lat: f64, lon: f64) -> (usize, usize) {
        let row = ((lat - self.min_latitude) / self.cell)
            .floor()
            .clamp(0.0, (self.rows - 1) as f64) as usize;
        let col = (normalize_longitude(lon) / self.cell)
            .floor()
            .clamp(0.0, (self.cols - 1) as f64) as usize;
        (row, col)
    }

    /// Call `visit` for every bucket at Chebyshev distance exactly `ring`
    /// from `(row, col)`, with columns wrapping around.
    fn for_each_in_ring(&self, row: usize, col: usize, ring: usize, mut visit: impl FnMut(usize)) {
        let ring_i = ring as isize;
        for dr in -ring_i..=ring_i {
            let r = row as isize + dr;
            if r < 0 || r >= self.rows as isize {
                continue;
            }
            let base = r as usize * self.cols;
            if dr.abs() == ring_i {
                if 2 * ring + 1 >= self.cols {
                    (0..self.cols).for_each(|c| visit(base + c));
                } else {
                    for dc in -ring_i..=ring_i {
                        visit(base + self.wrap_col(col, dc));
                    }
                }
            } else if 2 * ring < self.cols {
                visit(base + self.wrap_col(col, ring_i));
                visit(base + self.wrap_col(col, -ring_i));
            } else if 2 * ring == self.cols {
                visit(base + self.wrap_col(col, ring_i));
            }
        }
    }

    fn wrap_col(&self, col: usize, offset: isize) -> usize {
        (col as isize + offset).rem_euclid(self.cols as isize) as usize
    }
}

fn normalize_longitude(lon: f64) -> f64 {
    let lon = lon.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if lon >= 360.0 {
        0.0
    } else {
        lon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    /// Coordinates of a regular grid in row-major order, north to south.
    fn regular_grid(lat0: f64, lon0: f64, step: f64, ni: usize, nj: usize) -> (Vec<f64>, Vec<f64>) {
        let mut lats = Vec::with_capacity(ni * nj);
        let mut lons = Vec::with_capacity(ni * nj);
        for j in 0..nj {
            for i in 0..ni {
                lats.push(lat0 - step * j as f64);
                lons.push(lon0 + step * i as f64);
            }
        }
        (lats, lons)
    }

    /// Deterministic pseudo-random coordinates.
    fn scattered_queries(count: usize) -> Vec<(f64, f64)> {
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        (0..count)
            .map(|_| (next() * 180.0 - 90.0, next() * 360.0 - 180.0))
            .collect()
    }

    #[test]
    fn test_distance_wraps_longitude() {
        assert_approx_eq!(distance(0.0, 359.5, 0.0, 0.0), 0.5, 1e-12);
        assert_approx_eq!(distance(0.0, -0.027176, 0.0, 359.5), 0.472824, 1e-9);
        assert_approx_eq!(distance(0.0, 180.0, 0.0, -180.0), 0.0, 1e-12);
        assert_approx_eq!(distance(3.0, 0.0, 0.0, 4.0), 5.0, 1e-12);
    }

    #[test]
    fn test_brute_force_canary_wharf() {
        let (lats, lons) = regular_grid(90.0, 0.0, 0.5, 720, 361);
        let nearest = brute_force(&lats, &lons, 51.5054, -0.027176).unwrap();

        // 51.5N, 0.0E is row 77, column 0
        assert_eq!(nearest.index, 77 * 720);
        assert!(nearest.distance < 0.03);
    }

    #[test]
    fn test_ties_prefer_first_point() {
        let lats = vec![1.0, 0.0, -1.0, 0.0];
        let lons = vec![0.0, 1.0, 0.0, -1.0];
        let expected = Some(NearestPoint { index: 0, distance: 1.0 });

        assert_eq!(brute_force(&lats, &lons, 0.0, 0.0), expected);
        assert_eq!(BucketIndex::build(&lats, &lons).nearest(0.0, 0.0), expected);
    }

    #[test]
    fn test_empty_grid_has_no_match() {
        assert_eq!(brute_force(&[], &[], 0.0, 0.0), None);
        assert_eq!(BucketIndex::build(&[], &[]).nearest(0.0, 0.0), None);
    }

    #[test]
    fn test_non_finite_points_are_skipped() {
        let lats = vec![f64::NAN, 10.0];
        let lons = vec![0.0, 10.0];
        assert_eq!(brute_force(&lats, &lons, 0.0, 0.0).map(|n| n.index), Some(1));
        assert_eq!(
            BucketIndex::build(&lats, &lons).nearest(0.0, 0.0).map(|n| n.index),
            Some(1)
        );
    }

    #[test]
    fn test_bucket_index_matches_brute_force_global() {
        let (lats, lons) = regular_grid(90.0, 0.0, 2.5, 144, 73);
        let queries = scattered_queries(500);

        let brute = nearest_points(&lats, &lons, &queries, MatchStrategy::BruteForce);
        let bucket = nearest_points(&lats, &lons, &queries, MatchStrategy::BucketIndex);
        assert_eq!(brute, bucket);
    }

    #[test]
    fn test_bucket_index_matches_brute_force_regional() {
        // North Sea box, queries all over the globe
        let (lats, lons) = regular_grid(62.0, -10.0, 0.5, 61, 41);
        let queries = scattered_queries(300);

        let brute = nearest_points(&lats, &lons, &queries, MatchStrategy::BruteForce);
        let bucket = nearest_points(&lats, &lons, &queries, MatchStrategy::BucketIndex);
        assert_eq!(brute, bucket);
    }

    #[test]
    fn test_bucket_index_across_antimeridian() {
        // Pacific grid from 170E to 170W
        let (lats, lons) = regular_grid(-10.0, 170.0, 1.0, 21, 11);
        let index = BucketIndex::build(&lats, &lons);

        // Fiji sits at 178.4E, just west of the antimeridian
        let fiji = index.nearest(-17.7134, 178.065).unwrap();
        assert_eq!(fiji, brute_force(&lats, &lons, -17.7134, 178.065).unwrap());

        // A query expressed in the -180..180 convention matches 190E
        let east = index.nearest(-10.0, -170.0).unwrap();
        assert_eq!(lons[east.index], 190.0);
        assert_approx_eq!(east.distance, 0.0, 1e-9);
    }

    #[test]
    fn test_single_point_grid() {
        let index = BucketIndex::build(&[45.0], &[7.0]);
        let nearest = index.nearest(-45.0, -173.0).unwrap();
        assert_eq!(nearest.index, 0);
        assert_approx_eq!(nearest.distance, 90.0f64.hypot(180.0), 1e-9);
    }

    #[test]
    fn test_cell_tiles_full_circle() {
        let (lats, lons) = regular_grid(90.0, 0.0, 0.5, 720, 361);
        let index = BucketIndex::build(&lats, &lons);
        let cols = (360.0 / index.cell_size()).round();
        assert_approx_eq!(cols * index.cell_size(), 360.0, 1e-9);
    }
}
