//! Core math types: glam re-exports, Transform, Camera.

pub use glam::{EulerRot, Mat4, Quat, Vec3, vec3};

pub mod camera;
pub mod transform;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_is_identity_matrix() {
        let t = transform::Transform::identity();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn translate_then_scale_matrix() {
        let t = transform::Transform::from_trs(
            vec3(1.0, 2.0, 3.0),
            vec3(0.0, 0.0, 0.0),
            vec3(2.0, 2.0, 2.0),
        );
        // Last column = translation, diagonal = scale (rotation is zero).
        let m = t.matrix().to_cols_array();
        assert!((m[12] - 1.0).abs() < 1e-6);
        assert!((m[13] - 2.0).abs() < 1e-6);
        assert!((m[14] - 3.0).abs() < 1e-6);
        assert!((m[0] - 2.0).abs() < 1e-6);
        assert!((m[5] - 2.0).abs() < 1e-6);
        assert!((m[10] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn spin_about_y_keeps_y_axis_fixed() {
        let rotated = transform::Transform::spin_y(1.25)
            .matrix()
            .transform_vector3(Vec3::Y);
        assert!((rotated - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn camera_pv_is_finite() {
        let cam = camera::Camera::new_perspective(
            vec3(0.0, 0.0, 6.0),
            vec3(0.0, 0.0, 0.0),
            Vec3::Y,
            45f32.to_radians(),
            0.1,
            100.0,
            800.0 / 600.0,
        );
        let pv = cam.proj_view();
        let a = pv.to_cols_array();
        assert!(a.iter().all(|f| f.is_finite()));
    }

    #[test]
    fn camera_with_aspect_replaces_aspect_only() {
        let cam = camera::Camera::new_perspective(
            vec3(0.0, 0.0, 6.0),
            Vec3::ZERO,
            Vec3::Y,
            45f32.to_radians(),
            0.1,
            100.0,
            1.0,
        )
        .with_aspect(2.0);
        assert_eq!(cam.aspect, 2.0);
        assert_eq!(cam.eye, vec3(0.0, 0.0, 6.0));
    }
}
