use super::camera::OrthographicCamera;

/// Window size bookkeeping: logical size, display scale, capped pixel ratio
/// and the physical size the scene is drawn at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
    scale_factor: f32,
    max_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, scale_factor: f32, max_pixel_ratio: f32) -> Self {
        let mut viewport = Self {
            width: width.max(1.0),
            height: height.max(1.0),
            pixel_ratio: 1.0,
            scale_factor: 1.0,
            max_pixel_ratio: max_pixel_ratio.max(1.0),
        };
        viewport.set_scale(scale_factor);
        viewport
    }

    fn set_scale(&mut self, scale_factor: f32) {
        self.scale_factor = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor
        } else {
            1.0
        };
        self.pixel_ratio = self.scale_factor.min(self.max_pixel_ratio);
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// Size of the offscreen scene target: logical size at the capped ratio.
    pub fn render_size(&self) -> [u32; 2] {
        self.physical(self.pixel_ratio)
    }

    /// Size of the window surface at the full display scale. Differs from
    /// [`Viewport::render_size`] only when the display scale exceeds the cap.
    pub fn surface_size(&self) -> [u32; 2] {
        self.physical(self.scale_factor)
    }

    fn physical(&self, ratio: f32) -> [u32; 2] {
        [
            ((self.width * ratio).round() as u32).max(1),
            ((self.height * ratio).round() as u32).max(1),
        ]
    }

    /// Applies a new logical size and display scale. Zero-sized resizes
    /// (minimized windows) are ignored and return false.
    pub fn resize(
        &mut self,
        width: f32,
        height: f32,
        scale_factor: f32,
        camera: &mut OrthographicCamera,
    ) -> bool {
        if width < 1.0 || height < 1.0 {
            log::debug!("Ignoring resize to {}x{}", width, height);
            return false;
        }
        self.width = width;
        self.height = height;
        self.set_scale(scale_factor);
        camera.set_aspect(self.aspect());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;

    #[test]
    fn pixel_ratio_is_capped() {
        let viewport = Viewport::new(800.0, 600.0, 3.0, 2.0);
        assert_eq!(viewport.pixel_ratio, 2.0);
        assert_eq!(viewport.render_size(), [1600, 1200]);

        let low = Viewport::new(800.0, 600.0, 1.25, 2.0);
        assert_eq!(low.pixel_ratio, 1.25);
        assert_eq!(low.render_size(), [1000, 750]);
    }

    #[test]
    fn surface_tracks_window_above_the_cap() {
        let viewport = Viewport::new(800.0, 600.0, 3.0, 2.0);
        assert_eq!(viewport.surface_size(), [2400, 1800]);
        assert_eq!(viewport.render_size(), [1600, 1200]);

        let mut camera = OrthographicCamera::from_config(&CameraConfig::default(), 4.0 / 3.0);
        let mut viewport = Viewport::new(800.0, 600.0, 1.5, 2.0);
        assert_eq!(viewport.surface_size(), viewport.render_size());
        assert!(viewport.resize(500.0, 400.0, 2.5, &mut camera));
        assert_eq!(viewport.surface_size(), [1250, 1000]);
        assert_eq!(viewport.render_size(), [1000, 800]);
        assert!(!viewport.resize(0.0, 0.0, 1.0, &mut camera));
        assert_eq!(viewport.surface_size(), [1250, 1000]);
    }

    #[test]
    fn any_resize_sequence_ends_at_last_size() {
        let sizes = [
            (1024.0, 768.0, 1.0),
            (300.0, 900.0, 2.5),
            (0.0, 0.0, 1.0),
            (1920.0, 1080.0, 1.5),
            (640.0, 0.0, 2.0),
            (333.0, 777.0, 4.0),
        ];
        let mut camera = OrthographicCamera::from_config(&CameraConfig::default(), 800.0 / 600.0);
        let mut viewport = Viewport::new(800.0, 600.0, 1.0, 2.0);

        let mut expected = (800.0f32, 600.0f32, 1.0f32);
        for &(w, h, scale) in &sizes {
            if viewport.resize(w, h, scale, &mut camera) {
                expected = (w, h, f32::min(scale, 2.0));
            }
            assert_eq!((viewport.width, viewport.height), (expected.0, expected.1));
            assert_eq!(viewport.pixel_ratio, expected.2);
            assert!((camera.aspect - expected.0 / expected.1).abs() < 1e-6);
            assert!(viewport.pixel_ratio <= 2.0);
        }
        assert_eq!(viewport.render_size(), [666, 1554]);
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut camera = OrthographicCamera::from_config(&CameraConfig::default(), 4.0 / 3.0);
        let mut viewport = Viewport::new(800.0, 600.0, 1.0, 2.0);
        assert!(!viewport.resize(0.0, 600.0, 1.0, &mut camera));
        assert_eq!(viewport.width, 800.0);
        assert!(camera.aspect.is_finite());
    }
}
