//! Tolerance clustering of price levels.

use serde::{Deserialize, Serialize};

/// A group of nearby prices represented by their running mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceCluster {
    pub center: f64,
    pub members: Vec<f64>,
}

impl PriceCluster {
    fn seed(price: f64) -> Self {
        Self {
            center: price,
            members: vec![price],
        }
    }

    fn absorb(&mut self, price: f64) {
        self.members.push(price);
        self.center = self.members.iter().sum::<f64>() / self.members.len() as f64;
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Whether `price` lies within `tolerance` (a fraction) of the center.
    pub fn accepts(&self, price: f64, tolerance: f64) -> bool {
        self.center > 0.0 && (price - self.center).abs() / self.center <= tolerance
    }
}

/// Merge each price, in input order, into the first cluster that accepts it,
/// otherwise open a new one. Result is sorted by member count, largest first;
/// equal counts keep creation order.
pub fn cluster_levels(prices: &[f64], tolerance: f64) -> Vec<PriceCluster> {
    let mut clusters: Vec<PriceCluster> = Vec::new();
    for &price in prices {
        match clusters.iter_mut().find(|c| c.accepts(price, tolerance)) {
            Some(cluster) => cluster.absorb(price),
            None => clusters.push(PriceCluster::seed(price)),
        }
    }
    clusters.sort_by(|a, b| b.count().cmp(&a.count()));
    clusters
}
