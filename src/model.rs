//! K-Means customer segmentation on (order count, total spend)

use crate::aggregate::CustomerAggregate;
use crate::error::SalesError;
use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Number of customer segments
pub const SEGMENT_COUNT: usize = 4;

/// Default random seed for K-Means initialisation
pub const DEFAULT_SEED: u64 = 42;

/// Segment id given to the cluster at each mean-spend rank (highest first).
/// Keeps the ids in line with [`SEGMENT_PROFILES`].
const SEGMENT_BY_SPEND_RANK: [usize; SEGMENT_COUNT] = [0, 2, 1, 3];

/// Static description and marketing strategy of a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProfile {
    pub id: usize,
    pub description: &'static str,
    pub strategy: &'static str,
}

pub const SEGMENT_PROFILES: [SegmentProfile; SEGMENT_COUNT] = [
    SegmentProfile {
        id: 0,
        description: "Pelanggan bernilai tinggi dengan pesanan yang sering",
        strategy: "Tawarkan hadiah loyalitas dan diskon eksklusif untuk mempertahankan pelanggan bernilai tinggi ini.",
    },
    SegmentProfile {
        id: 1,
        description: "Pelanggan bernilai rendah dengan pesanan yang jarang",
        strategy: "Kirim promosi dan diskon yang ditargetkan untuk mendorong pembelian yang lebih sering.",
    },
    SegmentProfile {
        id: 2,
        description: "Pelanggan bernilai sedang dengan frekuensi moderat",
        strategy: "Berikan rekomendasi yang dipersonalisasi dan penawaran bundel untuk meningkatkan nilai pesanan rata-rata.",
    },
    SegmentProfile {
        id: 3,
        description: "Pelanggan baru atau dengan keterlibatan rendah",
        strategy: "Terlibat dengan kampanye penyambutan dan penawaran pengenalan untuk meningkatkan keterlibatan awal.",
    },
];

/// Profile of a segment id, if it is one of the known segments
pub fn segment_profile(segment: usize) -> Option<&'static SegmentProfile> {
    SEGMENT_PROFILES.get(segment)
}

/// Per-feature standardisation using population statistics
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

impl StandardScaler {
    /// Fit mean and population standard deviation of each column
    pub fn fit(data: &Array2<f64>) -> Self {
        let mean = data
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(data.ncols()));
        let std = if data.nrows() == 0 {
            Array1::zeros(data.ncols())
        } else {
            data.std_axis(Axis(0), 0.0)
        };
        Self { mean, std }
    }

    /// Standardise rows; constant columns map to 0
    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        let scale = self.std.mapv(|s| if s > 0.0 { s } else { 1.0 });
        (data - &self.mean) / &scale
    }

    /// Standardise a single observation
    pub fn transform_one(&self, values: &[f64]) -> crate::Result<Array1<f64>> {
        if values.len() != self.mean.len() {
            anyhow::bail!(
                "Expected {} features, got {}",
                self.mean.len(),
                values.len()
            );
        }
        let input = Array2::from_shape_vec((1, values.len()), values.to_vec())?;
        Ok(self.transform(&input).row(0).to_owned())
    }
}

/// K-Means parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentConfig {
    pub seed: u64,
    pub max_iters: usize,
    pub tolerance: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            max_iters: 300,
            tolerance: 1e-4,
        }
    }
}

/// Fitted segmentation with the customers it was trained on
#[derive(Debug)]
pub struct SegmentModel {
    /// Fitted K-Means model from linfa
    pub model: KMeans<f64, L2Dist>,
    pub scaler: StandardScaler,
    /// Customers with their `segment` filled in
    pub customers: Vec<CustomerAggregate>,
    /// Raw (orders, spend) per customer
    pub raw_features: Array2<f64>,
    /// Standardised features per customer
    pub features: Array2<f64>,
    /// Segment id per customer
    pub labels: Array1<usize>,
    /// Centroids in standardised space, row `i` belongs to segment `i`
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares (inertia)
    pub inertia: f64,
}

/// Aggregate statistics of one segment
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSummary {
    pub segment: usize,
    pub customer_count: usize,
    pub avg_total_orders: f64,
    pub avg_total_spent: f64,
}

impl SegmentModel {
    /// Predict the segment of a standardised observation
    pub fn predict(&self, features: &Array1<f64>) -> crate::Result<usize> {
        if features.len() != self.centroids.ncols() {
            anyhow::bail!(
                "Feature vector must have exactly {} dimensions",
                self.centroids.ncols()
            );
        }

        // Find nearest centroid
        let mut min_distance = f64::INFINITY;
        let mut closest = 0;
        for (segment, centroid) in self.centroids.outer_iter().enumerate() {
            let distance = euclidean_distance(&features.view(), &centroid);
            if distance < min_distance {
                min_distance = distance;
                closest = segment;
            }
        }

        Ok(closest)
    }

    /// Customers per segment id
    pub fn segment_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; SEGMENT_COUNT];
        for &label in self.labels.iter() {
            if label < SEGMENT_COUNT {
                sizes[label] += 1;
            }
        }
        sizes
    }

    /// Per-segment customer count and mean raw features
    pub fn summaries(&self) -> Vec<SegmentSummary> {
        summarize_segments(&self.customers)
    }

    /// Compute basic silhouette coefficient for a subset of points (for efficiency)
    pub fn compute_silhouette_sample(&self, sample_size: usize) -> f64 {
        let n_samples = self.features.nrows().min(sample_size);
        if n_samples < 2 {
            return 0.0;
        }

        let mut silhouette_sum = 0.0;

        for i in 0..n_samples {
            let point = self.features.row(i);
            let own = self.labels[i];

            let mut same_cluster = Vec::new();
            let mut other_clusters: Vec<Vec<f64>> = vec![Vec::new(); SEGMENT_COUNT];

            for j in 0..n_samples {
                if i == j {
                    continue;
                }
                let distance = euclidean_distance(&point, &self.features.row(j));
                let other = self.labels[j];
                if other == own {
                    same_cluster.push(distance);
                } else if other < SEGMENT_COUNT {
                    other_clusters[other].push(distance);
                }
            }

            let a_i = mean(&same_cluster).unwrap_or(0.0);
            let b_i = other_clusters
                .iter()
                .filter_map(|distances| mean(distances))
                .fold(f64::INFINITY, f64::min);

            let silhouette_i = if b_i.is_infinite() || (a_i == 0.0 && b_i == 0.0) {
                0.0
            } else {
                (b_i - a_i) / a_i.max(b_i)
            };

            silhouette_sum += silhouette_i;
        }

        silhouette_sum / n_samples as f64
    }
}

/// Cluster customers into [`SEGMENT_COUNT`] segments
///
/// # Arguments
/// * `customers` - Order count and spend of every customer
/// * `config` - Seed and convergence settings
///
/// # Returns
/// * Fitted `SegmentModel`; segment ids are ranked by mean spend so that
///   they match [`SEGMENT_PROFILES`]
pub fn fit_segments(
    customers: &[CustomerAggregate],
    config: &SegmentConfig,
) -> crate::Result<SegmentModel> {
    if customers.len() < SEGMENT_COUNT {
        return Err(SalesError::NotEnoughCustomers {
            customers: customers.len(),
            segments: SEGMENT_COUNT,
        }
        .into());
    }

    let n_samples = customers.len();
    let raw: Vec<f64> = customers
        .iter()
        .flat_map(|c| [c.total_orders as f64, c.total_spend])
        .collect();
    let raw_features = Array2::from_shape_vec((n_samples, 2), raw)?;

    let scaler = StandardScaler::fit(&raw_features);
    let features = scaler.transform(&raw_features);

    // Dummy targets for unsupervised learning
    let dataset = Dataset::new(features.clone(), Array1::<usize>::zeros(n_samples));
    let rng = StdRng::seed_from_u64(config.seed);

    let model = KMeans::params_with(SEGMENT_COUNT, rng, L2Dist)
        .max_n_iterations(config.max_iters as u64)
        .tolerance(config.tolerance)
        .fit(&dataset)?;

    let cluster_labels: Array1<usize> = model.predict(&features);
    let cluster_to_segment = rank_clusters_by_spend(&raw_features, &cluster_labels);

    let labels = cluster_labels.mapv(|c| cluster_to_segment[c]);

    let raw_centroids = model.centroids();
    let mut centroids: Array2<f64> = Array2::zeros(raw_centroids.raw_dim());
    for (cluster, centroid) in raw_centroids.outer_iter().enumerate() {
        centroids.row_mut(cluster_to_segment[cluster]).assign(&centroid);
    }

    let inertia = compute_inertia(&features, &labels, &centroids);

    let customers = customers
        .iter()
        .zip(labels.iter())
        .map(|(customer, &segment)| CustomerAggregate {
            segment: Some(segment),
            ..customer.clone()
        })
        .collect();

    tracing::debug!(
        customers = n_samples,
        seed = config.seed,
        inertia,
        "fitted customer segments"
    );

    Ok(SegmentModel {
        model,
        scaler,
        customers,
        raw_features,
        features,
        labels,
        centroids,
        inertia,
    })
}

/// Predict the segment of a hypothetical customer
///
/// # Arguments
/// * `model` - Fitted segmentation
/// * `orders` - Order count
/// * `spend` - Total spend
pub fn predict_segment(model: &SegmentModel, orders: f64, spend: f64) -> crate::Result<usize> {
    let scaled = model.scaler.transform_one(&[orders, spend])?;
    model.predict(&scaled)
}

/// Customer count and mean order count/spend per segment, ascending by id.
/// Segments without customers are omitted.
pub fn summarize_segments(customers: &[CustomerAggregate]) -> Vec<SegmentSummary> {
    let mut totals = vec![(0usize, 0.0f64, 0.0f64); SEGMENT_COUNT];
    for customer in customers {
        if let Some(segment) = customer.segment.filter(|&s| s < SEGMENT_COUNT) {
            let entry = &mut totals[segment];
            entry.0 += 1;
            entry.1 += customer.total_orders as f64;
            entry.2 += customer.total_spend;
        }
    }

    totals
        .into_iter()
        .enumerate()
        .filter(|(_, (count, _, _))| *count > 0)
        .map(|(segment, (count, orders, spend))| SegmentSummary {
            segment,
            customer_count: count,
            avg_total_orders: orders / count as f64,
            avg_total_spent: spend / count as f64,
        })
        .collect()
}

/// Map each raw cluster id to a segment id by ranking clusters on mean raw
/// spend (descending), then mean order count, then cluster id.
///
/// Only populated clusters are ranked: the highest spender is segment 0 and
/// the lowest is always segment 3. Empty clusters take the ids left over.
fn rank_clusters_by_spend(raw_features: &Array2<f64>, cluster_labels: &Array1<usize>) -> Vec<usize> {
    let mut stats = vec![(0usize, 0.0f64, 0.0f64); SEGMENT_COUNT];
    for (row, &cluster) in raw_features.outer_iter().zip(cluster_labels.iter()) {
        if cluster < SEGMENT_COUNT {
            stats[cluster].0 += 1;
            stats[cluster].1 += row[0];
            stats[cluster].2 += row[1];
        }
    }

    let means: Vec<(f64, f64)> = stats
        .iter()
        .map(|&(count, orders, spend)| {
            if count == 0 {
                (f64::NEG_INFINITY, f64::NEG_INFINITY)
            } else {
                (orders / count as f64, spend / count as f64)
            }
        })
        .collect();

    let mut ranked: Vec<usize> = (0..SEGMENT_COUNT).collect();
    ranked.sort_by(|&a, &b| {
        means[b]
            .1
            .total_cmp(&means[a].1)
            .then(means[b].0.total_cmp(&means[a].0))
            .then(a.cmp(&b))
    });
    let (populated, empty): (Vec<usize>, Vec<usize>) =
        ranked.into_iter().partition(|&cluster| stats[cluster].0 > 0);

    let mut segment_ids: Vec<usize> = match populated.len() {
        0 | 1 => SEGMENT_BY_SPEND_RANK[..populated.len()].to_vec(),
        n => SEGMENT_BY_SPEND_RANK[..n - 1]
            .iter()
            .copied()
            .chain(std::iter::once(SEGMENT_BY_SPEND_RANK[SEGMENT_COUNT - 1]))
            .collect(),
    };
    let leftover: Vec<usize> = SEGMENT_BY_SPEND_RANK
        .iter()
        .copied()
        .filter(|id| !segment_ids.contains(id))
        .collect();
    segment_ids.extend(leftover);

    let mut cluster_to_segment = vec![0; SEGMENT_COUNT];
    for (cluster, segment) in populated.into_iter().chain(empty).zip(segment_ids) {
        cluster_to_segment[cluster] = segment;
    }
    cluster_to_segment
}

/// Compute within-cluster sum of squares (inertia)
fn compute_inertia(features: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    let mut inertia = 0.0;

    for (i, &cluster) in labels.iter().enumerate() {
        if cluster < centroids.nrows() {
            let distance = euclidean_distance(&features.row(i), &centroids.row(cluster));
            inertia += distance.powi(2);
        }
    }

    inertia
}

/// Calculate Euclidean distance between two points
fn euclidean_distance(point1: &ArrayView1<f64>, point2: &ArrayView1<f64>) -> f64 {
    point1
        .iter()
        .zip(point2.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
