//! Scene ownership, camera interaction and the frame loop.

use std::time::Instant;

use log::{debug, info, warn};
use nalgebra::Vector3;

use crate::backend::{FrameUniforms, GpuBackend};
use crate::camera::CameraState;
use crate::config::{SortPolicy, ViewerSettings};
use crate::error::{FrameError, SceneError};
use crate::scene::{GeometryKind, Scene};
use crate::schedule::DeferredTask;

use super::renderer::{Renderer, RendererKind};

/// Owns a scene and draws it back to front through a [`GpuBackend`].
///
/// All interaction goes through `&mut self`, so camera state and dirty
/// flags have a single writer. Time is passed in by the host loop, which
/// polls [`tick`](Self::tick) to run deferred work.
pub struct Viewer<G: GpuBackend> {
    scene: Scene,
    camera: CameraState,
    settings: ViewerSettings,
    points: Renderer<G>,
    triangles: Renderer<G>,
    lines: Renderer<G>,
    border: Renderer<G>,
    sort_task: DeferredTask,
    redraw_task: DeferredTask,
    rotating: bool,
    interactive: bool,
    aspect: f32,
}

impl<G: GpuBackend> Viewer<G> {
    pub fn new(settings: ViewerSettings) -> Self {
        Self {
            scene: Scene::default(),
            camera: CameraState::default(),
            settings,
            points: Renderer::new(RendererKind::Points),
            triangles: Renderer::new(RendererKind::Triangles),
            lines: Renderer::new(RendererKind::Lines),
            border: Renderer::new(RendererKind::Border),
            sort_task: DeferredTask::new(),
            redraw_task: DeferredTask::new(),
            rotating: false,
            interactive: true,
            aspect: 1.0,
        }
    }

    #[inline]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[inline]
    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    /// Direct camera access. Changes made here do not trigger a re-sort;
    /// follow with [`request_sort`](Self::request_sort) if the rotation changed.
    #[inline]
    pub fn camera_mut(&mut self) -> &mut CameraState {
        &mut self.camera
    }

    #[inline]
    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    pub fn renderer(&self, kind: RendererKind) -> &Renderer<G> {
        match kind {
            RendererKind::Points => &self.points,
            RendererKind::Triangles => &self.triangles,
            RendererKind::Lines => &self.lines,
            RendererKind::Border => &self.border,
        }
    }

    /// Whether full frames are drawn while dragging. Large scenes draw only
    /// the border until the drag settles.
    #[inline]
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Switching to immediate sorting runs any pending deferred sort on the
    /// next frame.
    pub fn set_sort_policy(&mut self, policy: SortPolicy) {
        self.settings.sort_policy = policy;
        if policy == SortPolicy::Immediate && self.sort_task.is_pending() {
            self.request_sort();
        }
    }

    /// Shows or hides the bounding box on full frames.
    pub fn set_show_border(&mut self, show: bool) {
        self.settings.show_border = show;
    }

    /// Replaces the scene, fits the camera to it and flags every renderer
    /// for a full reload.
    pub fn load_scene(&mut self, scene: Scene) -> Result<(), SceneError> {
        scene.validate()?;

        let vertices = scene.vertex_count();
        info!(
            "Loaded scene: {} objects, {} vertices, {} colour maps",
            scene.objects.len(),
            vertices,
            scene.colour_maps.len()
        );

        self.scene = scene;
        self.camera.fit(&self.scene.options);
        self.interactive = vertices <= self.settings.interactive_vertex_limit;
        self.sort_task.cancel();
        self.redraw_task.cancel();
        for renderer in self.renderers_mut() {
            renderer.mark_reload();
        }
        Ok(())
    }

    /// Shows or hides an object. Only the draw order of the kinds it carries
    /// is rebuilt; vertex buffers are untouched.
    ///
    /// Returns `false` if there is no such object or nothing changed.
    pub fn set_visible(&mut self, object: usize, visible: bool) -> bool {
        let Some(target) = self.scene.objects.get_mut(object) else {
            return false;
        };
        if target.visible == visible {
            return false;
        }
        target.visible = visible;

        let (points, triangles, lines) = (
            target.has(GeometryKind::Points),
            target.has(GeometryKind::Triangles),
            target.has(GeometryKind::Lines),
        );
        if points {
            self.points.mark_sort();
        }
        if triangles {
            self.triangles.mark_sort();
        }
        if lines {
            self.lines.mark_sort();
        }
        true
    }

    /// Flags points and triangles for a re-sort at the next frame.
    pub fn request_sort(&mut self) {
        self.sort_task.cancel();
        self.points.mark_rotated();
        self.triangles.mark_rotated();
    }

    /// Rotates the camera by `degrees` about `axis`.
    ///
    /// Immediate sorting flags a re-sort right away; deferred sorting pushes
    /// the pending re-sort back to a full delay after `now`.
    pub fn rotate(&mut self, degrees: f32, axis: Vector3<f32>, now: Instant) {
        self.camera.rotate(degrees, axis);
        self.rotating = true;
        match self.settings.sort_policy {
            SortPolicy::Immediate => self.request_sort(),
            SortPolicy::Deferred => self.sort_task.reschedule(now, self.settings.sort_delay()),
        }
    }

    /// Ends a drag. A drag that rotated restarts the deferred sort timer.
    pub fn end_drag(&mut self, now: Instant) {
        if !self.rotating {
            return;
        }
        self.rotating = false;
        if self.settings.sort_policy == SortPolicy::Deferred {
            self.sort_task.reschedule(now, self.settings.sort_delay());
        }
    }

    /// Pans by a screen-space delta in pixels. Draw order is unaffected.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.camera.translate_by(dx, dy);
    }

    /// Moves the camera along the view axis. Draw order is unaffected.
    pub fn zoom(&mut self, factor: f32) {
        self.camera.zoom(factor);
    }

    /// Moves the near clip plane; rejected steps are logged and ignored.
    pub fn zoom_clip(&mut self, factor: f32) -> bool {
        let accepted = self.camera.zoom_clip(factor);
        if !accepted {
            warn!(
                "Near clip {} would fall below {}, ignoring",
                self.camera.near_clip + factor * self.camera.model_size,
                self.camera.model_size * 0.001
            );
        }
        accepted
    }

    /// Refits the camera to the scene and re-sorts.
    pub fn reset(&mut self) {
        self.camera = CameraState::fitted(&self.scene.options);
        self.request_sort();
    }

    /// Runs deferred work that has come due. Returns `true` when the host
    /// should draw a full frame.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut redraw = false;
        if self.sort_task.poll(now) {
            debug!("Deferred sort due");
            self.points.mark_rotated();
            self.triangles.mark_rotated();
            redraw = true;
        }
        if self.redraw_task.poll(now) {
            redraw = true;
        }
        redraw
    }

    /// Whether a deferred sort is waiting to fire.
    #[inline]
    pub fn sort_pending(&self) -> bool {
        self.sort_task.is_pending()
    }

    fn uniforms(&self) -> FrameUniforms {
        let options = &self.scene.options;
        FrameUniforms {
            model_view: self.camera.model_view(),
            projection: self.camera.projection(self.aspect),
            counter_clockwise: self.camera.counter_clockwise(),
            opacity: options.opacity.unwrap_or(self.settings.opacity),
            point_scale: options.point_scale.unwrap_or(self.settings.point_scale)
                * self.camera.model_size,
            point_type: options.point_type.unwrap_or(self.settings.point_type),
        }
    }

    fn renderers_mut(&mut self) -> [&mut Renderer<G>; 4] {
        [
            &mut self.points,
            &mut self.triangles,
            &mut self.lines,
            &mut self.border,
        ]
    }

    /// Draws one frame: points, triangles, lines, then the border.
    ///
    /// A border-only frame skips the scene geometry and schedules a full
    /// redraw shortly after `now`, picked up by [`tick`](Self::tick).
    pub fn draw_frame(
        &mut self,
        backend: &mut G,
        now: Instant,
        border_only: bool,
    ) -> Result<(), FrameError> {
        if self.scene.objects.is_empty() {
            return Ok(());
        }
        let uniforms = self.uniforms();

        if !border_only {
            self.points.draw(backend, &self.scene, &self.camera, &uniforms)?;
            self.triangles.draw(backend, &self.scene, &self.camera, &uniforms)?;
            self.lines.draw(backend, &self.scene, &self.camera, &uniforms)?;
        }
        if border_only || self.settings.show_border || self.scene.options.border {
            self.border.draw(backend, &self.scene, &self.camera, &uniforms)?;
        }

        if border_only {
            self.redraw_task.reschedule(now, self.settings.redraw_delay());
        }
        Ok(())
    }
}
