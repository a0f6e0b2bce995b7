use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use bitfield_struct::bitfield;

/// Standard joypad buttons, in the order the shift register reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

impl Button {
    pub const ALL: [Button; 8] = [
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
    ];
}

#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct ControllerState {
    pub a: bool,
    pub b: bool,
    pub select: bool,
    pub start: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl ControllerState {
    pub fn is_pressed(&self, button: Button) -> bool {
        (self.into_bits() >> button as u8) & 1 != 0
    }

    pub fn with_button(self, button: Button, pressed: bool) -> Self {
        let bit = 1 << button as u8;
        let bits = self.into_bits();
        Self::from_bits(if pressed { bits | bit } else { bits & !bit })
    }
}

/// Where a controller gets its button state from. Implementations are
/// polled on every strobe, possibly while another thread updates them.
pub trait InputSource: Send + Sync {
    fn is_pressed(&self, button: Button) -> bool;
}

/// Button state written by the host and read by the emulated joypad.
#[derive(Default)]
pub struct ButtonLatch(AtomicU8);

impl ButtonLatch {
    pub fn set(&self, state: ControllerState) {
        self.0.store(state.into_bits(), Ordering::Release);
    }

    pub fn get(&self) -> ControllerState {
        ControllerState::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn set_button(&self, button: Button, pressed: bool) {
        let bit = 1 << button as u8;
        if pressed {
            self.0.fetch_or(bit, Ordering::AcqRel);
        } else {
            self.0.fetch_and(!bit, Ordering::AcqRel);
        }
    }
}

impl InputSource for ButtonLatch {
    fn is_pressed(&self, button: Button) -> bool {
        self.get().is_pressed(button)
    }
}

/// A joypad on one of the $4016/$4017 ports.
pub struct Controller {
    source: Arc<dyn InputSource>,
    strobe: AtomicBool,
    shift: AtomicU8,
}

impl Controller {
    pub fn new(source: Arc<dyn InputSource>) -> Self {
        Self {
            source,
            strobe: AtomicBool::new(false),
            shift: AtomicU8::new(0xFF),
        }
    }

    /// A controller fed by a fresh [`ButtonLatch`], returned for the host to drive.
    pub fn with_latch() -> (Self, Arc<ButtonLatch>) {
        let latch = Arc::new(ButtonLatch::default());
        (Self::new(latch.clone()), latch)
    }

    fn sample(&self) {
        let state = Button::ALL
            .iter()
            .enumerate()
            .filter(|(_, button)| self.source.is_pressed(**button))
            .fold(0u8, |bits, (i, _)| bits | (1 << i));
        self.shift.store(state, Ordering::Release);
    }

    /// Write to $4016. While bit 0 is held high the shift register keeps
    /// reloading from the input source.
    pub fn set_strobe(&self, value: u8) {
        let strobe = (value & 1) != 0;
        self.strobe.store(strobe, Ordering::Release);
        if strobe {
            self.sample();
        }
    }

    /// Read from $4016/$4017: the next button bit in bit 0. After eight
    /// reads the port returns 1.
    pub fn get_input(&self, read_only: bool) -> u8 {
        if self.strobe.load(Ordering::Acquire) {
            self.sample();
        }
        let shift = self.shift.load(Ordering::Acquire);
        if !read_only {
            self.shift.store((shift >> 1) | 0x80, Ordering::Release);
        }
        shift & 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_buttons_in_order_then_ones() {
        let (pad, latch) = Controller::with_latch();
        latch.set(ControllerState::new().with_a(true).with_start(true).with_right(true));

        pad.set_strobe(1);
        pad.set_strobe(0);
        let bits: [u8; 10] = core::array::from_fn(|_| pad.get_input(false));
        assert_eq!(bits, [1, 0, 0, 1, 0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn strobe_high_keeps_reporting_a() {
        let (pad, latch) = Controller::with_latch();
        latch.set_button(Button::A, true);
        pad.set_strobe(1);
        assert_eq!(pad.get_input(false), 1);
        assert_eq!(pad.get_input(false), 1);
        latch.set_button(Button::A, false);
        assert_eq!(pad.get_input(false), 0);
    }

    #[test]
    fn read_only_does_not_shift() {
        let (pad, latch) = Controller::with_latch();
        latch.set_button(Button::B, true);
        pad.set_strobe(1);
        pad.set_strobe(0);
        assert_eq!(pad.get_input(true), 0);
        assert_eq!(pad.get_input(true), 0);
        assert_eq!(pad.get_input(false), 0);
        assert_eq!(pad.get_input(false), 1);
    }

    #[test]
    fn state_helpers() {
        let state = ControllerState::new().with_button(Button::Left, true);
        assert!(state.left());
        assert!(state.is_pressed(Button::Left));
        assert!(!state.with_button(Button::Left, false).is_pressed(Button::Left));
    }
}
