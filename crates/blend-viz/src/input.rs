//! Mouse and keyboard handling for the viewer window.

use std::time::Instant;

use blend_order::{GpuBackend, SortPolicy, Viewer};
use macroquad::prelude::*;
use nalgebra::Vector3;

/// Degrees of rotation per pixel dragged.
const DEGREES_PER_PIXEL: f32 = 0.2;

/// Zoom step per wheel notch, as a fraction of the model size.
const ZOOM_STEP: f32 = 0.05;

/// Near clip step per wheel notch, as a fraction of the model size.
const CLIP_STEP: f32 = 0.01;

/// Mouse button held during a drag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragButton {
    /// Tumble about the screen x and y axes.
    Left,
    /// Roll about the view axis.
    Middle,
    /// Pan.
    Right,
}

/// Tracks drag state between frames and turns input into viewer calls.
#[derive(Debug, Default)]
pub struct ViewerInput {
    drag: Option<(DragButton, Vec2)>,
}

impl ViewerInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a drag is in progress.
    pub fn dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn begin_drag(&mut self, button: DragButton, position: Vec2) {
        self.drag = Some((button, position));
    }

    /// Moves an active drag to `position`. Returns `true` if the camera
    /// changed.
    pub fn drag_to<G: GpuBackend>(
        &mut self,
        viewer: &mut Viewer<G>,
        position: Vec2,
        now: Instant,
    ) -> bool {
        let Some((button, last)) = self.drag else {
            return false;
        };
        let delta = position - last;
        self.drag = Some((button, position));
        if delta == Vec2::ZERO {
            return false;
        }
        apply_drag(viewer, button, delta.x, delta.y, now);
        true
    }

    pub fn end_drag<G: GpuBackend>(&mut self, viewer: &mut Viewer<G>, now: Instant) {
        if self.drag.take().is_some() {
            viewer.end_drag(now);
        }
    }

    /// Polls macroquad for this frame's input. Returns `true` if anything
    /// visible changed.
    pub fn update<G: GpuBackend>(&mut self, viewer: &mut Viewer<G>, now: Instant) -> bool {
        let mut changed = false;
        let position = Vec2::from(mouse_position());

        for (button, mouse) in [
            (DragButton::Left, MouseButton::Left),
            (DragButton::Middle, MouseButton::Middle),
            (DragButton::Right, MouseButton::Right),
        ] {
            if is_mouse_button_pressed(mouse) && !self.dragging() {
                self.begin_drag(button, position);
            }
            if is_mouse_button_released(mouse)
                && let Some((active, _)) = self.drag
                && active == button
            {
                self.end_drag(viewer, now);
            }
        }
        changed |= self.drag_to(viewer, position, now);

        let (_, wheel) = mouse_wheel();
        if wheel != 0.0 {
            let shift = is_key_down(KeyCode::LeftShift) || is_key_down(KeyCode::RightShift);
            changed |= apply_wheel(viewer, wheel.signum(), shift);
        }

        if let Some(key) = get_last_key_pressed() {
            changed |= apply_key(viewer, key);
        }
        changed
    }
}

/// Applies a drag of `(dx, dy)` pixels.
pub fn apply_drag<G: GpuBackend>(
    viewer: &mut Viewer<G>,
    button: DragButton,
    dx: f32,
    dy: f32,
    now: Instant,
) {
    match button {
        DragButton::Left => {
            viewer.rotate(dx * DEGREES_PER_PIXEL, Vector3::y(), now);
            viewer.rotate(dy * DEGREES_PER_PIXEL, Vector3::x(), now);
        }
        DragButton::Middle => {
            let amount = dx.hypot(dy) * dx.signum();
            viewer.rotate(amount * DEGREES_PER_PIXEL, Vector3::z(), now);
        }
        DragButton::Right => viewer.pan(dx, dy),
    }
}

/// Applies one wheel notch. Shift moves the near clip plane instead of the
/// camera.
pub fn apply_wheel<G: GpuBackend>(viewer: &mut Viewer<G>, spin: f32, shift: bool) -> bool {
    if shift {
        viewer.zoom_clip(spin * CLIP_STEP)
    } else {
        viewer.zoom(spin * ZOOM_STEP);
        true
    }
}

/// Keyboard shortcuts:
///
/// - `B` toggles the bounding box
/// - `R` refits the camera
/// - `I` switches between immediate and deferred sorting
/// - `1`..`9` toggle the visibility of the matching object
pub fn apply_key<G: GpuBackend>(viewer: &mut Viewer<G>, key: KeyCode) -> bool {
    match key {
        KeyCode::B => {
            let show = !viewer.settings().show_border;
            viewer.set_show_border(show);
            true
        }
        KeyCode::R => {
            viewer.reset();
            true
        }
        KeyCode::I => {
            let policy = match viewer.settings().sort_policy {
                SortPolicy::Immediate => SortPolicy::Deferred,
                SortPolicy::Deferred => SortPolicy::Immediate,
            };
            viewer.set_sort_policy(policy);
            false
        }
        _ => match object_key(key) {
            Some(index) => {
                let visible = viewer
                    .scene()
                    .objects
                    .get(index)
                    .is_some_and(|object| object.visible);
                viewer.set_visible(index, !visible)
            }
            None => false,
        },
    }
}

fn object_key(key: KeyCode) -> Option<usize> {
    let index = match key {
        KeyCode::Key1 => 0,
        KeyCode::Key2 => 1,
        KeyCode::Key3 => 2,
        KeyCode::Key4 => 3,
        KeyCode::Key5 => 4,
        KeyCode::Key6 => 5,
        KeyCode::Key7 => 6,
        KeyCode::Key8 => 7,
        KeyCode::Key9 => 8,
        _ => return None,
    };
    Some(index)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use blend_order::{
        PrimitiveBlock, RecordingBackend, RendererKind, Scene, SceneObject, SceneOptions,
        ViewerSettings,
    };

    use super::*;

    fn make_viewer(policy: SortPolicy) -> Viewer<RecordingBackend> {
        let settings = ViewerSettings {
            sort_policy: policy,
            ..Default::default()
        };
        let mut viewer = Viewer::new(settings);
        let scene = Scene::new(SceneOptions::default())
            .with_object(
                SceneObject::new("cloud")
                    .with_points(PrimitiveBlock::new(vec![0.1, 0.2, 0.3, 0.7, 0.8, 0.9])),
            )
            .with_object(
                SceneObject::new("axis")
                    .with_lines(PrimitiveBlock::new(vec![0.0; 6]).with_indices(vec![0, 1])),
            );
        viewer.load_scene(scene).unwrap();
        viewer
    }

    fn settle(viewer: &mut Viewer<RecordingBackend>) {
        let mut backend = RecordingBackend::new();
        viewer.draw_frame(&mut backend, Instant::now(), false).unwrap();
    }

    #[test]
    fn left_drag_rotates_and_defers_sort() {
        let mut viewer = make_viewer(SortPolicy::Deferred);
        settle(&mut viewer);
        let before = viewer.camera().rotation;

        apply_drag(&mut viewer, DragButton::Left, 10.0, 0.0, Instant::now());

        assert_ne!(viewer.camera().rotation, before);
        assert!(viewer.sort_pending());
        assert!(!viewer.renderer(RendererKind::Points).needs_sort());
    }

    #[test]
    fn left_drag_sorts_immediately() {
        let mut viewer = make_viewer(SortPolicy::Immediate);
        settle(&mut viewer);

        apply_drag(&mut viewer, DragButton::Left, 0.0, 5.0, Instant::now());

        assert!(viewer.renderer(RendererKind::Points).needs_sort());
        assert!(!viewer.sort_pending());
    }

    #[test]
    fn right_drag_pans_without_sorting() {
        let mut viewer = make_viewer(SortPolicy::Immediate);
        settle(&mut viewer);
        let before = viewer.camera().translation;

        apply_drag(&mut viewer, DragButton::Right, 100.0, 50.0, Instant::now());

        let after = viewer.camera().translation;
        assert!(after.x > before.x);
        assert!(after.y < before.y);
        assert!(!viewer.renderer(RendererKind::Points).needs_sort());
    }

    #[test]
    fn middle_drag_rolls() {
        let mut viewer = make_viewer(SortPolicy::Immediate);
        let before = viewer.camera().rotation;

        apply_drag(&mut viewer, DragButton::Middle, -3.0, 4.0, Instant::now());

        let delta = viewer.camera().rotation * before.inverse();
        let axis = delta.axis().unwrap();
        assert!(axis.z.abs() > 0.999);
        assert!((delta.angle() - 1.0_f32.to_radians()).abs() < 1e-4);
    }

    #[test]
    fn drag_lifecycle_restarts_timer() {
        let mut viewer = make_viewer(SortPolicy::Deferred);
        let mut input = ViewerInput::new();
        let start = Instant::now();

        input.begin_drag(DragButton::Left, vec2(0.0, 0.0));
        assert!(input.drag_to(&mut viewer, vec2(5.0, 0.0), start));
        assert!(!input.drag_to(&mut viewer, vec2(5.0, 0.0), start));

        let release = start + Duration::from_millis(1500);
        input.end_drag(&mut viewer, release);
        assert!(!input.dragging());

        // The timer counts from the release, not the last movement.
        assert!(!viewer.tick(start + Duration::from_millis(2100)));
        assert!(viewer.tick(release + viewer.settings().sort_delay()));
    }

    #[test]
    fn drag_without_begin_is_ignored() {
        let mut viewer = make_viewer(SortPolicy::Deferred);
        let mut input = ViewerInput::new();
        assert!(!input.drag_to(&mut viewer, vec2(40.0, 40.0), Instant::now()));
        assert!(!viewer.sort_pending());
    }

    #[test]
    fn wheel_zooms_and_clips() {
        let mut viewer = make_viewer(SortPolicy::Deferred);
        let z = viewer.camera().translation.z;
        let near = viewer.camera().near_clip;

        assert!(apply_wheel(&mut viewer, 1.0, false));
        assert!(viewer.camera().translation.z > z);

        assert!(apply_wheel(&mut viewer, 1.0, true));
        assert!(viewer.camera().near_clip > near);

        // Far enough below zero is rejected.
        for _ in 0..1000 {
            apply_wheel(&mut viewer, -1.0, true);
        }
        assert!(viewer.camera().near_clip >= viewer.camera().model_size * 0.001);
    }

    #[test]
    fn digit_keys_toggle_visibility() {
        let mut viewer = make_viewer(SortPolicy::Deferred);
        settle(&mut viewer);

        assert!(apply_key(&mut viewer, KeyCode::Key1));
        assert!(!viewer.scene().objects[0].visible);
        assert!(viewer.renderer(RendererKind::Points).needs_sort());
        assert!(!viewer.renderer(RendererKind::Lines).needs_sort());

        assert!(apply_key(&mut viewer, KeyCode::Key1));
        assert!(viewer.scene().objects[0].visible);

        assert!(!apply_key(&mut viewer, KeyCode::Key9));
    }

    #[test]
    fn sort_policy_toggle() {
        let mut backend = RecordingBackend::new();
        let mut viewer = make_viewer(SortPolicy::Deferred);
        viewer.draw_frame(&mut backend, Instant::now(), false).unwrap();
        apply_drag(&mut viewer, DragButton::Left, 10.0, 0.0, Instant::now());
        assert!(viewer.sort_pending());
        assert!(!viewer.renderer(RendererKind::Points).needs_sort());

        apply_key(&mut viewer, KeyCode::I);
        assert_eq!(viewer.settings().sort_policy, SortPolicy::Immediate);
        assert!(!viewer.sort_pending());
        assert!(viewer.renderer(RendererKind::Points).needs_sort());
        viewer.draw_frame(&mut backend, Instant::now(), false).unwrap();
        assert!(!viewer.renderer(RendererKind::Points).needs_sort());

        apply_key(&mut viewer, KeyCode::I);
        assert_eq!(viewer.settings().sort_policy, SortPolicy::Deferred);
    }

    #[test]
    fn border_and_reset_keys() {
        let mut viewer = make_viewer(SortPolicy::Deferred);
        assert!(!viewer.settings().show_border);
        assert!(apply_key(&mut viewer, KeyCode::B));
        assert!(viewer.settings().show_border);

        viewer.pan(300.0, 0.0);
        assert!(apply_key(&mut viewer, KeyCode::R));
        assert_eq!(viewer.camera().translation.x, 0.0);
        assert!(viewer.renderer(RendererKind::Points).needs_sort());

        assert!(!apply_key(&mut viewer, KeyCode::Q));
    }
}
