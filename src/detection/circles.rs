use crate::models::{Contour, DetectedCircle};

/// Filter contours to find circular shapes
pub fn filter_circles(
    contours: &[Contour],
    min_radius: f32,
    max_radius: f32,
    circularity_threshold: f32,
) -> Vec<Contour> {
    contours
        .iter()
        .filter(|c| is_circle_like(c, min_radius, max_radius, circularity_threshold))
        .cloned()
        .collect()
}

pub fn is_circle_like(c: &Contour, min_radius: f32, max_radius: f32, circularity_threshold: f32) -> bool {
    has_coin_shape(
        c.circularity(),
        c.aspect_ratio(),
        c.radius(),
        min_radius,
        max_radius,
        circularity_threshold,
    )
}

pub fn has_coin_shape(
    circularity: f32,
    aspect_ratio: f32,
    radius: f32,
    min_radius: f32,
    max_radius: f32,
    circularity_threshold: f32,
) -> bool {
    (0.7..=circularity_threshold).contains(&circularity)
        && radius >= min_radius
        && radius <= max_radius
        && (0.8..=1.25).contains(&aspect_ratio) // Coins seen from above are round, not elliptical
}

/// Indices of the circles that survive proximity suppression, in reading order.
///
/// Circles whose centres are closer than `min_distance` collapse into the
/// largest one. Coins often yield an inner ring edge as well as the rim; the
/// rim wins.
pub fn suppress_close(circles: &[DetectedCircle], min_distance: f64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..circles.len()).collect();
    order.sort_by(|&a, &b| circles[b].radius.total_cmp(&circles[a].radius));

    let mut kept: Vec<usize> = Vec::new();
    let d2 = min_distance * min_distance;

    for &i in &order {
        let close_to_kept = kept.iter().any(|&k| {
            let dx = circles[i].x - circles[k].x;
            let dy = circles[i].y - circles[k].y;
            dx * dx + dy * dy < d2
        });
        if !close_to_kept {
            kept.push(i);
        }
    }

    kept.sort_by(|&a, &b| reading_order(&circles[a], &circles[b]));
    kept
}

pub fn dedup_by_proximity(circles: Vec<DetectedCircle>, min_distance: f64) -> Vec<DetectedCircle> {
    suppress_close(&circles, min_distance)
        .into_iter()
        .map(|i| circles[i])
        .collect()
}

/// Top-to-bottom, then left-to-right
pub fn reading_order(a: &DetectedCircle, b: &DetectedCircle) -> std::cmp::Ordering {
    a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x))
}
