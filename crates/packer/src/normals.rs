use foundation::math::Vec3;

/// Smooth per-vertex normals from `x, y, z` positions and a triangle list.
///
/// Face normals are accumulated unnormalized, so larger faces weigh more.
pub fn build_normals(positions: &[f64], indices: &[u32]) -> Vec<f64> {
    assert!(
        indices.len() % 3 == 0,
        "normals need a triangle index list, got {} indices",
        indices.len()
    );
    let vertex = |i: u32| {
        let i = i as usize * 3;
        Vec3::new(positions[i], positions[i + 1], positions[i + 2])
    };

    let mut normals = vec![0.0; positions.len()];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (vertex(tri[0]), vertex(tri[1]), vertex(tri[2]));
        let n = (b - a).cross(c - a);
        for &i in tri {
            let i = i as usize * 3;
            normals[i] += n.x;
            normals[i + 1] += n.y;
            normals[i + 2] += n.z;
        }
    }
    for n in normals.chunks_exact_mut(3) {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len > 0.0 {
            n[0] /= len;
            n[1] /= len;
            n[2] /= len;
        }
    }
    normals
}
