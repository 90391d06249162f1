//! Composition of keyboard, gamepad and pointer controls into one sample.

use arcade_racer_core::{percent, InputSample};

/// Arrow keys and the space bar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyboardState {
    /// Steer left.
    pub left: bool,
    /// Steer right.
    pub right: bool,
    /// Accelerate.
    pub up: bool,
    /// Brake.
    pub down: bool,
    /// Brake.
    pub space: bool,
}

/// First connected gamepad.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GamepadState {
    /// Horizontal deflection of the left stick in `[-1, 1]`.
    pub stick_x: f32,
    /// Any digital accelerate button is held.
    pub gas_button: bool,
    /// Any digital brake button is held.
    pub brake_button: bool,
    /// Analog accelerate trigger in `[0, 1]`; overrides the button when non-zero.
    pub gas_trigger: f32,
    /// Analog brake trigger in `[0, 1]`; overrides the button when non-zero.
    pub brake_trigger: f32,
}

/// Mouse or touch pointer in normalized screen coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerState {
    /// Horizontal position in `[0, 1]`.
    pub x: f32,
    /// Vertical position in `[0, 1]`, growing downwards.
    pub y: f32,
    /// Primary button or finger is down.
    pub primary: bool,
    /// Secondary button is down.
    pub secondary: bool,
    /// The pointer is a touch screen.
    pub touch: bool,
}

/// Raw device state polled by the host for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputFrame {
    /// Keyboard state.
    pub keyboard: KeyboardState,
    /// Gamepad state when one is in use.
    pub gamepad: Option<GamepadState>,
    /// Pointer state.
    pub pointer: PointerState,
}

/// Merges device input, latching mouse-follow steering once the pointer is used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputMixer {
    mouse_follow: bool,
}

impl InputMixer {
    /// Creates a mixer with mouse-follow steering released.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mouse_follow: false,
        }
    }

    /// Whether steering currently follows the pointer.
    #[must_use]
    pub const fn mouse_follow(&self) -> bool {
        self.mouse_follow
    }

    /// Produces the driver input for this tick.
    ///
    /// A gamepad replaces the keyboard entirely. Gas from either of them
    /// releases the mouse-follow latch; pressing the primary pointer button
    /// sets it, after which the pointer owns every control.
    pub fn mix(&mut self, frame: &InputFrame) -> InputSample {
        let keyboard = frame.keyboard;
        let mut sample = InputSample {
            turn: f32::from(u8::from(keyboard.right)) - f32::from(u8::from(keyboard.left)),
            gas: f32::from(u8::from(keyboard.up)),
            brake: f32::from(u8::from(keyboard.down || keyboard.space)),
        };

        if let Some(gamepad) = frame.gamepad {
            sample.turn = gamepad.stick_x;
            sample.gas = f32::from(u8::from(gamepad.gas_button));
            sample.brake = f32::from(u8::from(gamepad.brake_button));
            if gamepad.gas_trigger != 0.0 {
                sample.gas = gamepad.gas_trigger;
            }
            if gamepad.brake_trigger != 0.0 {
                sample.brake = gamepad.brake_trigger;
            }
        }

        if sample.gas > 0.0 {
            self.mouse_follow = false;
        }

        let pointer = frame.pointer;
        if self.mouse_follow || pointer.primary {
            self.mouse_follow = true;
            sample.turn = (5.0 * (pointer.x - 0.5)).clamp(-1.0, 1.0);
            sample.gas = f32::from(u8::from(pointer.primary));
            sample.brake = f32::from(u8::from(pointer.secondary));

            if pointer.touch && pointer.primary {
                let touch = 1.8 - 2.0 * pointer.y;
                sample.gas = percent(touch, 0.1, 0.2);
                sample.brake = f32::from(u8::from(touch < 0.0));
                sample.turn = (3.0 * (pointer.x - 0.5)).clamp(-1.0, 1.0);
            }
        }

        sample
    }
}
