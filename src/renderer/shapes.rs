//! Shape generation for 2D primitives

use glam::Vec2;
use std::f32::consts::PI;

use super::vertex::Vertex;
use crate::sim::Rect;

/// Two triangles covering `dst`, sampling `uv` = `[u0, v0, u1, v1]`.
/// `flip_x` mirrors the texture horizontally.
pub fn quad(dst: Rect, uv: [f32; 4], color: [f32; 4], flip_x: bool) -> [Vertex; 6] {
    let [mut u0, v0, mut u1, v1] = uv;
    if flip_x {
        std::mem::swap(&mut u0, &mut u1);
    }
    let (x0, y0, x1, y1) = (dst.x, dst.y, dst.right(), dst.bottom());

    let tl = Vertex::new(x0, y0, u0, v0, color);
    let tr = Vertex::new(x1, y0, u1, v0, color);
    let bl = Vertex::new(x0, y1, u0, v1, color);
    let br = Vertex::new(x1, y1, u1, v1, color);

    [tl, bl, tr, tr, bl, br]
}

/// Segment count that keeps a circle of this radius looking round
pub fn segments_for(radius: f32) -> u32 {
    ((radius * 1.5) as u32).clamp(8, 48)
}

/// Generate vertices for a filled circle
pub fn circle(center: Vec2, radius: f32, color: [f32; 4], segments: u32) -> Vec<Vertex> {
    let segments = segments.max(3);
    let mut vertices = Vec::with_capacity((segments * 3) as usize);

    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * 2.0 * PI;
        let theta2 = ((i + 1) as f32 / segments as f32) * 2.0 * PI;

        // Triangle from center to edge
        vertices.push(Vertex::solid(center.x, center.y, color));
        vertices.push(Vertex::solid(
            center.x + radius * theta1.cos(),
            center.y + radius * theta1.sin(),
            color,
        ));
        vertices.push(Vertex::solid(
            center.x + radius * theta2.cos(),
            center.y + radius * theta2.sin(),
            color,
        ));
    }

    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_covers_rect() {
        let verts = quad(Rect::new(10.0, 20.0, 30.0, 40.0), [0.0, 0.0, 1.0, 1.0], [1.0; 4], false);
        let xs: Vec<f32> = verts.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = verts.iter().map(|v| v.position[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), 10.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 40.0);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), 20.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 60.0);
    }

    #[test]
    fn test_flipped_quad_mirrors_uv() {
        let verts = quad(Rect::new(0.0, 0.0, 1.0, 1.0), [0.25, 0.0, 0.5, 1.0], [1.0; 4], true);
        // Top-left corner now samples the right edge of the frame
        assert_eq!(verts[0].uv, [0.5, 0.0]);
        assert_eq!(verts[5].uv, [0.25, 1.0]);
    }

    #[test]
    fn test_circle_vertex_count_and_radius() {
        let verts = circle(Vec2::new(5.0, 5.0), 2.0, [1.0; 4], 12);
        assert_eq!(verts.len(), 36);
        for v in verts.iter().skip(1).step_by(3) {
            let d = Vec2::from(v.position) - Vec2::new(5.0, 5.0);
            assert!((d.length() - 2.0).abs() < 1e-4);
        }
    }
}
