use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::LayoutConfig;
use crate::graph_utils::graph::Position;

// Uniform scatter over [0, width) x [0, height). Seeded when the config carries a seed.
pub fn scatter(count: usize, config: &LayoutConfig) -> Vec<Position> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    scatter_with(&mut rng, count, 0.0..config.scatter_width, 0.0..config.scatter_height)
}

pub fn scatter_with<R: Rng>(
    rng: &mut R,
    count: usize,
    xs: std::ops::Range<f64>,
    ys: std::ops::Range<f64>,
) -> Vec<Position> {
    // Empty ranges would panic in gen_range; collapse them to their start.
    let sample = |rng: &mut R, r: &std::ops::Range<f64>| if r.start < r.end { rng.gen_range(r.clone()) } else { r.start };
    (0..count)
        .map(|_| {
            let x = sample(rng, &xs);
            let y = sample(rng, &ys);
            Position::new(x, y)
        })
        .collect()
}
