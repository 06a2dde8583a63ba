use std::f64::consts::TAU;

use crate::graph_utils::graph::Position;

pub fn angle_step(count: usize) -> f64 {
    if count == 0 { 0.0 } else { TAU / count as f64 }
}

// Evenly around one circle; node i sits at angle i * 2π/n.
pub fn ring(count: usize, center: Position, radius: f64) -> Vec<Position> {
    let step = angle_step(count);
    (0..count)
        .map(|i| {
            let angle = i as f64 * step;
            Position::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect()
}
