// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Buttons, power, time and the status LED.

use embedded_graphics::pixelcolor::Rgb888;
use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::InputPin;
use log::warn;

use crate::range::ButtonState;

/// Volts per count of the battery ADC: a 12-bit reading of a 3.3V reference behind a 1/3 divider.
pub const BATTERY_VOLTS_PER_COUNT: f32 = 3f32 * 3.3 / 4096f32;

/// Convert a raw battery ADC sample to volts.
pub fn battery_voltage(raw: u16) -> f32 {
    raw as f32 * BATTERY_VOLTS_PER_COUNT
}

/// Everything the control loop needs from the board besides the sensor and display.
pub trait Platform {
    /// Microseconds from an arbitrary, fixed starting point.
    fn now_micros(&mut self) -> u64;

    fn sleep_micros(&mut self, micros: u32);

    /// Sample every button once.
    fn buttons(&mut self) -> ButtonState;

    /// The raw battery voltage ADC reading.
    fn battery_sample(&mut self) -> u16;

    /// Whether the device is running from external (USB) power.
    fn external_power(&mut self) -> bool;

    fn set_led(&mut self, color: Rgb888, brightness: u8);
}

/// A free-running microsecond clock.
pub trait Monotonic {
    fn now_micros(&mut self) -> u64;
}

/// Battery and supply monitoring.
pub trait PowerMonitor {
    fn battery_sample(&mut self) -> u16;

    fn external_power(&mut self) -> bool;
}

/// An RGB LED with a separate brightness control.
pub trait StatusLed {
    fn set(&mut self, color: Rgb888, brightness: u8);
}

/// The four buttons. They're wired active-low, so a pin reading low is a pressed button.
#[derive(Debug)]
pub struct Buttons<X, Y, A, B> {
    x: X,
    y: Y,
    a: A,
    b: B,
}

impl<X, Y, A, B> Buttons<X, Y, A, B>
where
    X: InputPin,
    Y: InputPin,
    A: InputPin,
    B: InputPin,
{
    pub fn new(x: X, y: Y, a: A, b: B) -> Self {
        Self { x, y, a, b }
    }

    /// Read each pin once.
    ///
    /// A pin that fails to read counts as released.
    pub fn sample(&self) -> ButtonState {
        ButtonState {
            raise: is_pressed(&self.x, "X"),
            lower: is_pressed(&self.y, "Y"),
            modifier_a: is_pressed(&self.a, "A"),
            modifier_b: is_pressed(&self.b, "B"),
        }
    }

    pub fn release(self) -> (X, Y, A, B) {
        (self.x, self.y, self.a, self.b)
    }
}

fn is_pressed<P: InputPin>(pin: &P, name: &str) -> bool {
    match pin.is_low() {
        Ok(pressed) => pressed,
        Err(_) => {
            warn!("Unable to read button {}", name);
            false
        }
    }
}

/// A [`Platform`] assembled from `embedded-hal` parts.
#[derive(Debug)]
pub struct Board<C, D, X, Y, A, B, P, L> {
    clock: C,
    delay: D,
    buttons: Buttons<X, Y, A, B>,
    power: P,
    led: L,
}

impl<C, D, X, Y, A, B, P, L> Board<C, D, X, Y, A, B, P, L>
where
    C: Monotonic,
    D: DelayUs<u32>,
    X: InputPin,
    Y: InputPin,
    A: InputPin,
    B: InputPin,
    P: PowerMonitor,
    L: StatusLed,
{
    pub fn new(clock: C, delay: D, buttons: Buttons<X, Y, A, B>, power: P, led: L) -> Self {
        Self {
            clock,
            delay,
            buttons,
            power,
            led,
        }
    }
}

impl<C, D, X, Y, A, B, P, L> Platform for Board<C, D, X, Y, A, B, P, L>
where
    C: Monotonic,
    D: DelayUs<u32>,
    X: InputPin,
    Y: InputPin,
    A: InputPin,
    B: InputPin,
    P: PowerMonitor,
    L: StatusLed,
{
    fn now_micros(&mut self) -> u64 {
        self.clock.now_micros()
    }

    fn sleep_micros(&mut self, micros: u32) {
        self.delay.delay_us(micros)
    }

    fn buttons(&mut self) -> ButtonState {
        self.buttons.sample()
    }

    fn battery_sample(&mut self) -> u16 {
        self.power.battery_sample()
    }

    fn external_power(&mut self) -> bool {
        self.power.external_power()
    }

    fn set_led(&mut self, color: Rgb888, brightness: u8) {
        self.led.set(color, brightness)
    }
}
