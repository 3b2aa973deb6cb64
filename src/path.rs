use crate::transform::Point;

/// Generate SVG path commands for an edge between two node centers
///
/// Both control points sit on the vertical line through the horizontal
/// midpoint, so the curve leaves the source and enters the target
/// horizontally.
///
/// # Arguments
/// * `source` - Start point (source node center)
/// * `target` - End point (target node center)
///
/// # Returns
/// SVG path command string (e.g., "M 0 0 C 100 0, 100 80, 200 80")
pub fn edge_path(source: Point, target: Point) -> String {
    let mx = (source.x + target.x) / 2.0;
    format!(
        "M {} {} C {} {}, {} {}, {} {}",
        source.x, source.y, mx, source.y, mx, target.y, target.x, target.y
    )
}
