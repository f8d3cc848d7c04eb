use crate::render::PointerDrag;
use winit::event::{MouseButton, MouseScrollDelta};

const PIXELS_PER_WHEEL_STEP: f32 = 50.0;

/// Mouse state for the orbit controls. Left drags rotate, right or middle
/// drags pan.
#[derive(Default, Debug, Clone, Copy)]
pub struct PointerState {
    position: Option<(f32, f32)>,
    rotate_held: bool,
    pan_held: bool,
}

impl PointerState {
    pub fn handle_button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.rotate_held = pressed,
            MouseButton::Right | MouseButton::Middle => self.pan_held = pressed,
            _ => {}
        }
    }

    #[cfg(test)]
    pub fn is_dragging(&self) -> bool {
        self.rotate_held || self.pan_held
    }

    /// Records the cursor position and returns the drag it produced, if any.
    pub fn handle_move(&mut self, x: f32, y: f32) -> Option<PointerDrag> {
        let previous = self.position.replace((x, y));
        let (px, py) = previous?;
        let (dx, dy) = (x - px, y - py);
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        if self.rotate_held {
            Some(PointerDrag::Rotate { dx, dy })
        } else if self.pan_held {
            Some(PointerDrag::Pan { dx, dy })
        } else {
            None
        }
    }

    pub fn release_all(&mut self) {
        *self = Self::default();
    }
}

/// Wheel delta in zoom steps, positive when scrolling away from the user.
pub fn wheel_steps(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_WHEEL_STEP,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_move_only_records_position() {
        let mut pointer = PointerState::default();
        pointer.handle_button(MouseButton::Left, true);
        assert_eq!(pointer.handle_move(10.0, 10.0), None);
        assert_eq!(
            pointer.handle_move(14.0, 7.0),
            Some(PointerDrag::Rotate { dx: 4.0, dy: -3.0 })
        );
    }

    #[test]
    fn buttons_select_drag_kind() {
        let mut pointer = PointerState::default();
        pointer.handle_move(0.0, 0.0);
        assert_eq!(pointer.handle_move(1.0, 0.0), None);

        pointer.handle_button(MouseButton::Right, true);
        assert_eq!(
            pointer.handle_move(3.0, 0.0),
            Some(PointerDrag::Pan { dx: 2.0, dy: 0.0 })
        );
        pointer.handle_button(MouseButton::Right, false);
        assert!(!pointer.is_dragging());
    }

    #[test]
    fn line_and_pixel_wheel_deltas() {
        assert_eq!(wheel_steps(MouseScrollDelta::LineDelta(0.0, -2.0)), -2.0);
        let pixels = winit::dpi::PhysicalPosition::new(0.0, 100.0);
        assert_eq!(wheel_steps(MouseScrollDelta::PixelDelta(pixels)), 2.0);
    }
}
