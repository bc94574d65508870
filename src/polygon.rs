//! Mask to polygon conversion.
//!
//! The outer borders of the mask are traced, the one enclosing the largest
//! area is kept and then thinned out with Douglas-Peucker so the outline is
//! cheap to ship to the map client and to render.

use crate::segmentation::Mask;
use imageproc::contours::{BorderType, find_contours};
use imageproc::point::Point;
use tracing::debug;

/// Ordered `[x, y]` vertices of a closed outline.
pub type Polygon = Vec<[i32; 2]>;

/// Default simplification tolerance, as a fraction of the contour perimeter.
pub const DEFAULT_EPSILON_RATIO: f64 = 0.005;

pub fn mask_to_polygon(mask: &Mask, epsilon_ratio: f64) -> Polygon {
    let contours = external_contours(mask);
    let contour_count = contours.len();

    // First traced contour wins ties.
    let mut largest: Option<(f64, Vec<Point<i32>>)> = None;
    for contour in contours {
        let area = contour_area(&contour);
        if largest.as_ref().is_none_or(|(best, _)| area > *best) {
            largest = Some((area, contour));
        }
    }

    let Some((_, largest)) = largest else {
        debug!("Mask has no foreground region");
        return Vec::new();
    };

    let epsilon = tolerance(&largest, epsilon_ratio);
    let simplified = approximate_polygon(&largest, epsilon, true);

    debug!(
        "Picked largest of {} contours: {} points simplified to {} (epsilon {:.2})",
        contour_count,
        largest.len(),
        simplified.len(),
        epsilon
    );

    simplified.into_iter().map(|p| [p.x, p.y]).collect()
}

/// Outer borders of every connected foreground region. Holes and regions
/// nested inside holes are skipped.
pub fn external_contours(mask: &Mask) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(&mask.to_gray_image())
        .into_iter()
        .filter(|contour| {
            matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none()
        })
        .map(|contour| contour.points)
        .collect()
}

/// Distance tolerance used for a contour: `epsilon_ratio` of its closed perimeter.
pub fn tolerance(contour: &[Point<i32>], epsilon_ratio: f64) -> f64 {
    epsilon_ratio * arc_length(contour, true)
}

/// Enclosed area of a closed contour (shoelace formula).
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        area += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
    }

    (area * 0.5).abs()
}

pub fn arc_length(points: &[Point<i32>], closed: bool) -> f64 {
    let mut length: f64 = points
        .windows(2)
        .map(|pair| distance(pair[0], pair[1]))
        .sum();

    if closed && points.len() > 1 {
        length += distance(points[points.len() - 1], points[0]);
    }

    length
}

/// Douglas-Peucker simplification.
///
/// A closed curve is cut at the vertex farthest from its first point and
/// both halves are simplified separately, so the result never contains the
/// closing vertex twice.
pub fn approximate_polygon(points: &[Point<i32>], epsilon: f64, closed: bool) -> Vec<Point<i32>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    if !closed {
        return douglas_peucker(points, epsilon);
    }

    let first = points[0];
    let split = points
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, p)| (i, distance(*p, first)))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best })
        .0;

    if split == 0 {
        // Every point coincides with the first.
        return vec![first];
    }

    let mut simplified = douglas_peucker(&points[..=split], epsilon);

    let mut return_leg = points[split..].to_vec();
    return_leg.push(first);
    let return_leg = douglas_peucker(&return_leg, epsilon);

    simplified.pop();
    simplified.extend(return_leg);
    simplified.pop();
    simplified
}

fn douglas_peucker(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let end = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[end] = true;

    let mut stack = vec![(0, end)];
    while let Some((start, end)) = stack.pop() {
        let mut dmax = 0.0;
        let mut index = start;

        for i in start + 1..end {
            let d = perpendicular_distance(points[i], points[start], points[end]);
            if d > dmax {
                index = i;
                dmax = d;
            }
        }

        if dmax > epsilon {
            keep[index] = true;
            stack.push((start, index));
            stack.push((index, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, keep)| keep.then_some(*p))
        .collect()
}

fn distance(a: Point<i32>, b: Point<i32>) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

fn perpendicular_distance(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let (px, py) = (p.x as f64, p.y as f64);
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (bx, by) = (b.x as f64, b.y as f64);

    let dx = bx - ax;
    let dy = by - ay;
    let mag = (dx * dx + dy * dy).sqrt();
    if mag < 1e-9 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    (dy * px - dx * py + bx * ay - by * ax).abs() / mag
}

/// Fills a polygon back into a mask. Pixels on an edge count as inside, the
/// interior follows the even-odd rule.
pub fn rasterize(polygon: &[[i32; 2]], width: u32, height: u32) -> Mask {
    Mask::from_fn(width, height, |x, y| {
        let (x, y) = (x as f64, y as f64);
        on_boundary(polygon, x, y) || point_in_polygon(polygon, x, y)
    })
}

fn point_in_polygon(polygon: &[[i32; 2]], x: f64, y: f64) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (polygon[i][0] as f64, polygon[i][1] as f64);
        let (xj, yj) = (polygon[j][0] as f64, polygon[j][1] as f64);

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

fn on_boundary(polygon: &[[i32; 2]], x: f64, y: f64) -> bool {
    let n = polygon.len();
    (0..n).any(|i| {
        let [ax, ay] = polygon[i];
        let [bx, by] = polygon[(i + 1) % n];
        let (ax, ay, bx, by) = (ax as f64, ay as f64, bx as f64, by as f64);

        let cross = (bx - ax) * (y - ay) - (by - ay) * (x - ax);
        cross.abs() < 1e-9
            && x >= ax.min(bx)
            && x <= ax.max(bx)
            && y >= ay.min(by)
            && y <= ay.max(by)
    })
}
