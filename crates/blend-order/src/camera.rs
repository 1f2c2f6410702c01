//! Camera state and the model-view transform built from it.

use nalgebra::{Matrix4, Point3, Quaternion, Unit, UnitQuaternion, Vector3};

use crate::scene::{InitialRotation, SceneOptions};

/// Vertical field of view of the perspective projection, in degrees.
pub const FIELD_OF_VIEW: f32 = 45.0;

/// Smallest near clip distance, as a fraction of the model size.
const MIN_NEAR_CLIP: f32 = 0.001;

/// The viewer camera.
///
/// Rotation happens about `centre`; `focus` is the point aligned with the
/// eye. The two coincide unless a scene overrides the focal point.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    pub rotation: UnitQuaternion<f32>,
    pub translation: Vector3<f32>,
    pub focus: Point3<f32>,
    pub centre: Point3<f32>,
    pub scale: Vector3<f32>,
    /// `1.0` for a right-handed scene, `-1.0` for left-handed.
    pub orientation: f32,
    pub near_clip: f32,
    pub far_clip: f32,
    /// Length of the scene bounding-box diagonal.
    pub model_size: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
            focus: Point3::origin(),
            centre: Point3::origin(),
            scale: Vector3::repeat(1.0),
            orientation: 1.0,
            near_clip: 0.1,
            far_clip: 10.0,
            model_size: 0.0,
        }
    }
}

impl CameraState {
    /// Creates a camera fitted to the given scene options.
    pub fn fitted(options: &SceneOptions) -> Self {
        let mut camera = Self::default();
        camera.fit(options);
        camera
    }

    /// Builds the model-view matrix.
    ///
    /// Applied to a point, the transforms run right to left: scale, move the
    /// focus to the origin, rotate about the centre, then translate.
    pub fn model_view(&self) -> Matrix4<f32> {
        let to_centre = self.centre - self.focus;
        let focus = Vector3::new(
            -self.focus.x,
            -self.focus.y,
            -self.focus.z * self.orientation,
        );
        let scale = Vector3::new(self.scale.x, self.scale.y, self.scale.z * self.orientation);

        Matrix4::new_translation(&self.translation)
            * Matrix4::new_translation(&to_centre)
            * self.rotation.to_homogeneous()
            * Matrix4::new_translation(&-to_centre)
            * Matrix4::new_translation(&focus)
            * Matrix4::new_nonuniform_scaling(&scale)
    }

    /// Perspective projection with a 45° vertical field of view.
    pub fn projection(&self, aspect: f32) -> Matrix4<f32> {
        let f = 1.0 / (FIELD_OF_VIEW.to_radians() / 2.0).tan();
        let aspect = if aspect > 0.0 { aspect } else { 1.0 };
        let (near, far) = (self.near_clip, self.far_clip);
        let depth = near - far;
        let (a, b) = if depth != 0.0 {
            ((far + near) / depth, 2.0 * far * near / depth)
        } else {
            (-1.0, -2.0 * near)
        };

        Matrix4::new(
            f / aspect, 0.0, 0.0, 0.0, //
            0.0, f, 0.0, 0.0, //
            0.0, 0.0, a, b, //
            0.0, 0.0, -1.0, 0.0,
        )
    }

    /// Whether front faces wind counter-clockwise.
    #[inline]
    pub fn counter_clockwise(&self) -> bool {
        self.orientation >= 0.0
    }

    /// Rotates by `degrees` about `axis`, applied on top of the current rotation.
    pub fn rotate(&mut self, degrees: f32, axis: Vector3<f32>) {
        let Some(axis) = Unit::try_new(axis, f32::EPSILON) else {
            return;
        };
        let delta = UnitQuaternion::from_axis_angle(&axis, degrees.to_radians());
        self.rotation = delta * self.rotation;
        self.rotation.renormalize();
    }

    #[inline]
    pub fn rotate_x(&mut self, degrees: f32) {
        self.rotate(degrees, Vector3::x());
    }

    #[inline]
    pub fn rotate_y(&mut self, degrees: f32) {
        self.rotate(degrees, Vector3::y());
    }

    #[inline]
    pub fn rotate_z(&mut self, degrees: f32) {
        self.rotate(degrees, Vector3::z());
    }

    /// Pans by a screen-space delta in pixels, one pixel being a thousandth
    /// of the model size.
    pub fn translate_by(&mut self, dx: f32, dy: f32) {
        let step = self.model_size / 1000.0;
        self.translation.x += dx * step;
        self.translation.y -= dy * step;
    }

    /// Moves the camera along the view axis.
    pub fn zoom(&mut self, factor: f32) {
        self.translation.z += factor * self.model_size;
    }

    /// Moves the near clip plane. Returns `false` and leaves the plane in
    /// place when it would come closer than a thousandth of the model size.
    pub fn zoom_clip(&mut self, factor: f32) -> bool {
        let near = self.near_clip + factor * self.model_size;
        if near < self.model_size * MIN_NEAR_CLIP {
            return false;
        }
        self.near_clip = near;
        true
    }

    /// Resets the view to frame the scene bounding box, then applies the
    /// scene's own rotation, translation, scale and focus overrides.
    pub fn fit(&mut self, options: &SceneOptions) {
        let (min, max) = options.bounds();
        let dims = max - min;
        let previous = self.model_size;
        self.model_size = dims.norm();

        self.focus = min + dims * 0.5;
        self.centre = self.focus;

        self.translation = Vector3::zeros();
        if self.model_size != previous {
            self.translation.z = -1.25 * self.model_size;
        }

        self.near_clip = options.near_clip.unwrap_or(self.model_size / 10.0);
        self.far_clip = options.far_clip.unwrap_or(self.model_size * 10.0);
        if let Some(orientation) = options.orientation {
            self.orientation = if orientation < 0.0 { -1.0 } else { 1.0 };
        }

        self.rotation = UnitQuaternion::identity();
        match options.rotate {
            Some(InitialRotation::Euler([x, y, z])) => {
                self.rotate_z(-z);
                self.rotate_y(-y);
                self.rotate_x(-x);
            }
            Some(InitialRotation::Quaternion([x, y, z, w])) => {
                self.rotation = UnitQuaternion::try_new(Quaternion::new(w, x, y, z), f32::EPSILON)
                    .unwrap_or_else(UnitQuaternion::identity);
            }
            None => {}
        }

        if let Some(translate) = options.translate {
            self.translation = Vector3::from(translate);
        }
        if let Some(scale) = options.scale {
            self.scale = Vector3::from(scale);
        }
        if let Some(focus) = options.focus {
            self.focus = Point3::from(focus);
            self.centre = self.focus;
        }

        log::debug!(
            "camera fitted: model size {}, focus {:?}, translation {:?}",
            self.model_size,
            self.focus,
            self.translation
        );
    }
}
