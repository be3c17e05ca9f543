//! Control intent.
//!
//! [`ControlIntent`] is the only input the physics core reads. Your code fills
//! it from keyboard, gamepad, AI, network or a replay file; the core latches
//! it once per fixed tick and derives edge-triggered presses itself.

use bevy::prelude::*;

/// Latched per-tick input.
///
/// # Example
///
/// ```rust
/// use hedgehog_physics::prelude::*;
///
/// let mut intent = ControlIntent::new();
/// intent.set_horizontal(1.0);
/// intent.set_jump_held(true);
/// intent.latch();
/// assert!(intent.jump_pressed());
/// assert!(intent.right());
///
/// // Holding jump on the next tick is not a new press.
/// intent.latch();
/// assert!(!intent.jump_pressed());
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct ControlIntent {
    /// Horizontal axis (-1.0 = left, 1.0 = right).
    pub horizontal: f32,
    /// Vertical axis (-1.0 = down, 1.0 = up).
    pub vertical: f32,
    /// Whether jump is currently held.
    pub jump_held: bool,
    /// Rising edge of `jump_held`, computed by [`ControlIntent::latch`].
    jump_pressed: bool,
    /// `jump_held` at the previous latch.
    jump_held_prev: bool,
}

impl ControlIntent {
    /// Inputs smaller than this are treated as neutral.
    pub const DEADZONE: f32 = 0.001;

    /// Create a neutral intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the horizontal axis.
    pub fn set_horizontal(&mut self, value: f32) {
        self.horizontal = value.clamp(-1.0, 1.0);
    }

    /// Set the vertical axis.
    pub fn set_vertical(&mut self, value: f32) {
        self.vertical = value.clamp(-1.0, 1.0);
    }

    /// Set whether jump is held.
    pub fn set_jump_held(&mut self, held: bool) {
        self.jump_held = held;
    }

    /// Clear all directional input.
    pub fn clear(&mut self) {
        self.horizontal = 0.0;
        self.vertical = 0.0;
        self.jump_held = false;
    }

    /// Latch the current state for the next physics tick.
    ///
    /// Called once per fixed tick by the controller systems.
    pub fn latch(&mut self) {
        self.jump_pressed = self.jump_held && !self.jump_held_prev;
        self.jump_held_prev = self.jump_held;
    }

    /// Whether jump went down since the previous latch.
    pub fn jump_pressed(&self) -> bool {
        self.jump_pressed
    }

    /// Horizontal axis with the deadzone applied, as -1, 0 or 1.
    pub fn horizontal_sign(&self) -> f32 {
        if self.horizontal > Self::DEADZONE {
            1.0
        } else if self.horizontal < -Self::DEADZONE {
            -1.0
        } else {
            0.0
        }
    }

    /// Whether there is horizontal input.
    pub fn has_horizontal(&self) -> bool {
        self.horizontal_sign() != 0.0
    }

    /// Whether left is held.
    pub fn left(&self) -> bool {
        self.horizontal < -Self::DEADZONE
    }

    /// Whether right is held.
    pub fn right(&self) -> bool {
        self.horizontal > Self::DEADZONE
    }

    /// Whether up is held.
    pub fn up(&self) -> bool {
        self.vertical > Self::DEADZONE
    }

    /// Whether down is held.
    pub fn down(&self) -> bool {
        self.vertical < -Self::DEADZONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_neutral() {
        let intent = ControlIntent::new();
        assert_eq!(intent.horizontal, 0.0);
        assert!(!intent.jump_held);
        assert!(!intent.jump_pressed());
        assert!(!intent.has_horizontal());
    }

    #[test]
    fn axes_clamp() {
        let mut intent = ControlIntent::new();
        intent.set_horizontal(5.0);
        assert_eq!(intent.horizontal, 1.0);
        intent.set_vertical(-5.0);
        assert_eq!(intent.vertical, -1.0);
        assert!(intent.down());
        assert!(!intent.up());
    }

    #[test]
    fn deadzone() {
        let mut intent = ControlIntent::new();
        intent.set_horizontal(0.0001);
        assert!(!intent.has_horizontal());
        intent.set_horizontal(-0.5);
        assert!(intent.left());
        assert_eq!(intent.horizontal_sign(), -1.0);
    }

    #[test]
    fn jump_press_is_edge_triggered() {
        let mut intent = ControlIntent::new();
        intent.set_jump_held(true);
        intent.latch();
        assert!(intent.jump_pressed());

        intent.latch();
        assert!(!intent.jump_pressed());

        intent.set_jump_held(false);
        intent.latch();
        assert!(!intent.jump_pressed());

        intent.set_jump_held(true);
        intent.latch();
        assert!(intent.jump_pressed());
    }

    #[test]
    fn clear_releases_everything() {
        let mut intent = ControlIntent::new();
        intent.set_horizontal(1.0);
        intent.set_jump_held(true);
        intent.clear();
        assert!(!intent.has_horizontal());
        assert!(!intent.jump_held);
    }
}
