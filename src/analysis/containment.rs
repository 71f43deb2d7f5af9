// src/analysis/containment.rs
//
// Strict box-in-box test. Boxes are [x1, y1, x2, y2] in the detector's
// pixel space and are compared exactly as supplied.

/// True when `inner` lies strictly inside `outer` on all four sides.
///
/// Shared edges do not count. A box with any non-finite coordinate is never
/// contained and never contains anything.
pub fn contains(outer: &[f32; 4], inner: &[f32; 4]) -> bool {
    if !is_finite(outer) || !is_finite(inner) {
        return false;
    }

    outer[0] < inner[0] && outer[1] < inner[1] && outer[2] > inner[2] && outer[3] > inner[3]
}

fn is_finite(bbox: &[f32; 4]) -> bool {
    bbox.iter().all(|v| v.is_finite())
}
