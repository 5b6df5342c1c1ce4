//! Vertex normal reconstruction for displaced meshes.

use std::collections::HashMap;

use glam::Vec3;
use rayon::prelude::*;
use tracing::debug;

use crate::geometry::normalize_or_up;

/// Area-weighted vertex normals.
///
/// Each triangle's unnormalized cross product is added to its three
/// vertices, then every sum is normalized. Vertices with no incident area
/// get `(0, 1, 0)`. Triangles referencing vertices out of range are skipped.
pub fn recompute_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut acc = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (Some(&p0), Some(&p1), Some(&p2)) = (positions.get(a), positions.get(b), positions.get(c))
        else {
            continue;
        };
        let n = (p1 - p0).cross(p2 - p0);
        acc[a] += n;
        acc[b] += n;
        acc[c] += n;
    }

    acc.into_par_iter().map(normalize_or_up).collect()
}

fn direction_key(d: Vec3) -> [i32; 3] {
    let q = |x: f32| (x * 1.0e5).round() as i32;
    [q(d.x), q(d.y), q(d.z)]
}

/// Makes vertices that share a direction share one normal and one position.
///
/// Face edges of the cube-sphere duplicate vertices; after independent
/// reconstruction their normals differ and lighting shows a crease. Returns
/// the number of welded groups.
pub fn weld_seams(directions: &[Vec3], positions: &mut [Vec3], normals: &mut [Vec3]) -> usize {
    let mut groups: HashMap<[i32; 3], Vec<usize>> = HashMap::new();
    for (i, d) in directions.iter().enumerate() {
        groups.entry(direction_key(*d)).or_default().push(i);
    }

    let mut welded = 0;
    for members in groups.values().filter(|m| m.len() > 1) {
        let count = members.len() as f32;
        let normal = normalize_or_up(members.iter().map(|&i| normals[i]).sum());
        let position = members.iter().map(|&i| positions[i]).sum::<Vec3>() / count;
        for &i in members {
            normals[i] = normal;
            positions[i] = position;
        }
        welded += 1;
    }
    debug!(groups = welded, "welded seam vertices");
    welded
}
