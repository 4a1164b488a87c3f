//! Neighbour grouping of raw sliding-window hits.

use super::math::partition;

/// Relative tolerance under which two hits count as the same object.
pub const GROUP_EPS: f64 = 0.2;

/// A candidate box in frame coordinates, before clamping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

fn similar(a: &Rect, b: &Rect, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    (a.x - b.x).abs() as f64 <= delta
        && (a.y - b.y).abs() as f64 <= delta
        && (a.x + a.width - b.x - b.width).abs() as f64 <= delta
        && (a.y + a.height - b.y - b.height).abs() as f64 <= delta
}

/// Clusters similar hits and keeps one averaged box per cluster that has
/// more than `min_neighbors` members.
///
/// Clusters lying inside a better-supported cluster are dropped. With
/// `min_neighbors == 0` the hits are returned unchanged.
pub fn group_rectangles(rects: Vec<Rect>, min_neighbors: usize, eps: f64) -> Vec<Rect> {
    if min_neighbors == 0 || rects.is_empty() {
        return rects;
    }

    let (labels, n_classes) = partition(&rects, |a, b| similar(a, b, eps));

    let mut sums = vec![[0i64; 4]; n_classes];
    let mut counts = vec![0usize; n_classes];
    for (r, &label) in rects.iter().zip(&labels) {
        let s = &mut sums[label];
        s[0] += r.x as i64;
        s[1] += r.y as i64;
        s[2] += r.width as i64;
        s[3] += r.height as i64;
        counts[label] += 1;
    }

    let averaged: Vec<Rect> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &n)| {
            let avg = |v: i64| (v as f64 / n as f64).round() as i32;
            Rect::new(avg(s[0]), avg(s[1]), avg(s[2]), avg(s[3]))
        })
        .collect();

    let mut kept = Vec::new();
    for (i, r1) in averaged.iter().enumerate() {
        let n1 = counts[i];
        if n1 <= min_neighbors {
            continue;
        }
        let nested = averaged.iter().enumerate().any(|(j, r2)| {
            let n2 = counts[j];
            if j == i || n2 <= min_neighbors {
                return false;
            }
            let dx = (r2.width as f64 * eps).round() as i32;
            let dy = (r2.height as f64 * eps).round() as i32;
            r1.x >= r2.x - dx
                && r1.y >= r2.y - dy
                && r1.x + r1.width <= r2.x + r2.width + dx
                && r1.y + r1.height <= r2.y + r2.height + dy
                && (n2 > n1.max(3) || n1 < 3)
        });
        if !nested {
            kept.push(*r1);
        }
    }
    kept
}
