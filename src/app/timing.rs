use std::time::Instant;

const FPS_WINDOW_SECS: f32 = 0.5;

/// Monotonic frame clock started when the viewer initializes.
pub struct FrameClock {
    start: Instant,
    last_frame_time: Option<Instant>,
    last_fps_time: Instant,
    frame_count: u32,
    pub elapsed: f32,
    pub frame_dt: f32,
    render_ms: f32,
    base_title: String,
}

impl FrameClock {
    pub fn new(base_title: String, start: Instant) -> Self {
        Self {
            start,
            last_frame_time: None,
            last_fps_time: start,
            frame_count: 0,
            elapsed: 0.0,
            frame_dt: 1.0 / 60.0,
            render_ms: 0.0,
            base_title,
        }
    }

    pub fn set_render_ms(&mut self, render_ms: f32) {
        self.render_ms = render_ms;
    }

    /// Advances to `now`. The first frame measures from the clock start.
    /// Returns a new window title when the FPS readout is due.
    pub fn tick(&mut self, now: Instant) -> Option<String> {
        let last = self.last_frame_time.replace(now).unwrap_or(self.start);
        self.frame_dt = now.saturating_duration_since(last).as_secs_f32();
        self.elapsed = now.saturating_duration_since(self.start).as_secs_f32();

        self.frame_count = self.frame_count.saturating_add(1);
        let since_readout = now.saturating_duration_since(self.last_fps_time);
        if since_readout.as_secs_f32() < FPS_WINDOW_SECS {
            return None;
        }
        let fps = self.frame_count as f32 / since_readout.as_secs_f32();
        self.frame_count = 0;
        self.last_fps_time = now;
        Some(format!(
            "{} - {:.1} fps (frame {:.2} ms, render {:.2} ms)",
            self.base_title,
            fps,
            self.frame_dt * 1000.0,
            self.render_ms
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn delta_and_elapsed_follow_the_clock() {
        let start = Instant::now();
        let mut clock = FrameClock::new("viewer".to_string(), start);

        clock.tick(start + Duration::from_millis(10));
        assert!((clock.frame_dt - 0.010).abs() < 1e-4);
        assert!((clock.elapsed - 0.010).abs() < 1e-4);

        clock.tick(start + Duration::from_millis(35));
        assert!((clock.frame_dt - 0.025).abs() < 1e-4);
        assert!((clock.elapsed - 0.035).abs() < 1e-4);
    }

    #[test]
    fn title_refreshes_every_half_second() {
        let start = Instant::now();
        let mut clock = FrameClock::new("viewer".to_string(), start);
        let mut titles = 0;
        for frame in 1..=60 {
            if clock.tick(start + Duration::from_millis(frame * 16)).is_some() {
                titles += 1;
            }
        }
        assert_eq!(titles, 1);
        let title = clock.tick(start + Duration::from_millis(2000)).unwrap();
        assert!(title.starts_with("viewer - "));
    }

    #[test]
    fn first_delta_covers_time_since_start() {
        let start = Instant::now();
        let mut clock = FrameClock::new("viewer".to_string(), start);
        clock.tick(start + Duration::from_millis(500));
        assert!((clock.frame_dt - 0.5).abs() < 1e-4);
        assert!((clock.elapsed - 0.5).abs() < 1e-4);
    }
}
