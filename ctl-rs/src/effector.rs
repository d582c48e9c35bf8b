//! Effector interface: the device capabilities a script can call.
//!
//! The engine calls these synchronously and treats every call as having
//! succeeded.  [`Effector::wait`] is the only blocking call.
//!
//! | Script form | Method |
//! |-------------|--------|
//! | `digitalWrite(pin, level)` | [`Effector::digital_write`] |
//! | `digitalRead(pin)` | [`Effector::digital_read`] |
//! | `analogWrite(pin, level)` | [`Effector::analog_write`] |
//! | `analogRead(pin)` | [`Effector::analog_read`] |
//! | `pinMode(pin, mode)` | [`Effector::pin_mode`] |
//! | `delay(ms)` | [`Effector::wait`] |
//! | `millis()` | [`Effector::millis`] |
//! | `random(max)` / `random(min, max)` | [`Effector::random`] |
//! | `available()` | [`Effector::available`] |
//! | `read()` | [`Effector::read_byte`] |
//! | `setColor(r, g, b)` | [`Effector::set_color`] |
//! | `print(text)` | [`Effector::print`] |

use std::collections::{HashMap, VecDeque};

use crate::script::codec::Keyword;

// ── Effector ──────────────────────────────────────────────────────────────────

/// Host-provided device primitives.
pub trait Effector {
    fn digital_write(&mut self, pin: i32, level: i32);
    fn digital_read(&mut self, pin: i32) -> i32;
    fn analog_write(&mut self, pin: i32, level: i32);
    fn analog_read(&mut self, pin: i32) -> i32;
    fn pin_mode(&mut self, pin: i32, mode: i32);
    /// Block for `ms` milliseconds.
    fn wait(&mut self, ms: i32);
    /// Milliseconds since the host started.
    fn millis(&mut self) -> u64;
    /// Value in `min..max` (`min` when the range is empty).
    fn random(&mut self, min: i32, max: i32) -> i32;
    /// Number of input bytes ready to read.
    fn available(&mut self) -> i32;
    /// Next input byte, or `-1` if none.
    fn read_byte(&mut self) -> i32;
    fn set_color(&mut self, r: i32, g: i32, b: i32);
    /// Emit one line of text.
    fn print(&mut self, text: &str);
}

// ── Call ──────────────────────────────────────────────────────────────────────

/// One numeric effector call with its arguments bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    DigitalWrite { pin: i32, level: i32 },
    DigitalRead { pin: i32 },
    AnalogWrite { pin: i32, level: i32 },
    AnalogRead { pin: i32 },
    PinMode { pin: i32, mode: i32 },
    Delay { ms: i32 },
    Millis,
    Random { min: i32, max: i32 },
    Available,
    Read,
    SetColor { r: i32, g: i32, b: i32 },
}

impl Call {
    /// Bind `args` to the effector called `name`.
    ///
    /// Returns `None` for unknown names and arity mismatches.  `print` is
    /// not a numeric call and is handled by the statement layer.
    pub fn bind(name: &str, args: &[i32]) -> Option<Call> {
        let call = match (Keyword::from_name(name)?, args) {
            (Keyword::DigitalWrite, &[pin, level]) => Call::DigitalWrite { pin, level },
            (Keyword::DigitalRead, &[pin]) => Call::DigitalRead { pin },
            (Keyword::AnalogWrite, &[pin, level]) => Call::AnalogWrite { pin, level },
            (Keyword::AnalogRead, &[pin]) => Call::AnalogRead { pin },
            (Keyword::PinMode, &[pin, mode]) => Call::PinMode { pin, mode },
            (Keyword::Delay, &[ms]) => Call::Delay { ms },
            (Keyword::Millis, &[]) => Call::Millis,
            (Keyword::Random, &[max]) => Call::Random { min: 0, max },
            (Keyword::Random, &[min, max]) => Call::Random { min, max },
            (Keyword::Available, &[]) => Call::Available,
            (Keyword::Read, &[]) => Call::Read,
            (Keyword::SetColor, &[r, g, b]) => Call::SetColor { r, g, b },
            _ => return None,
        };
        Some(call)
    }

    /// Whether `name` is a numeric effector (as opposed to a keyword or
    /// `print`).
    pub fn is_effector_name(name: &str) -> bool {
        matches!(
            Keyword::from_name(name),
            Some(
                Keyword::DigitalWrite
                    | Keyword::DigitalRead
                    | Keyword::AnalogWrite
                    | Keyword::AnalogRead
                    | Keyword::PinMode
                    | Keyword::Delay
                    | Keyword::Millis
                    | Keyword::Random
                    | Keyword::Available
                    | Keyword::Read
                    | Keyword::SetColor
            )
        )
    }

    /// Perform the call.  Returns the result for value-producing calls.
    pub fn invoke(self, host: &mut dyn Effector) -> Option<f32> {
        match self {
            Call::DigitalWrite { pin, level } => {
                host.digital_write(pin, level);
                None
            }
            Call::DigitalRead { pin } => Some(host.digital_read(pin) as f32),
            Call::AnalogWrite { pin, level } => {
                host.analog_write(pin, level);
                None
            }
            Call::AnalogRead { pin } => Some(host.analog_read(pin) as f32),
            Call::PinMode { pin, mode } => {
                host.pin_mode(pin, mode);
                None
            }
            Call::Delay { ms } => {
                host.wait(ms);
                None
            }
            Call::Millis => Some(host.millis() as f32),
            Call::Random { min, max } => Some(host.random(min, max) as f32),
            Call::Available => Some(host.available() as f32),
            Call::Read => Some(host.read_byte() as f32),
            Call::SetColor { r, g, b } => {
                host.set_color(r, g, b);
                None
            }
        }
    }

    /// Whether the call produces a value.
    pub fn returns_value(self) -> bool {
        matches!(
            self,
            Call::DigitalRead { .. }
                | Call::AnalogRead { .. }
                | Call::Millis
                | Call::Random { .. }
                | Call::Available
                | Call::Read
        )
    }
}

// ── Recorder ──────────────────────────────────────────────────────────────────

/// An in-memory host that logs every call.
///
/// Reads come from the `digital`/`analog` maps (missing pins read 0),
/// `random` returns `min`, the clock advances only through `wait`, and input
/// bytes are served from `input`.
#[derive(Debug, Default)]
pub struct Recorder {
    /// Lines passed to [`Effector::print`].
    pub output: Vec<String>,
    /// Every non-print call, rendered as `name(args)`.
    pub calls: Vec<String>,
    pub digital: HashMap<i32, i32>,
    pub analog: HashMap<i32, i32>,
    pub input: VecDeque<u8>,
    pub clock_ms: u64,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return everything printed so far.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }
}

impl Effector for Recorder {
    fn digital_write(&mut self, pin: i32, level: i32) {
        self.calls.push(format!("digitalWrite({pin}, {level})"));
        self.digital.insert(pin, level);
    }

    fn digital_read(&mut self, pin: i32) -> i32 {
        self.calls.push(format!("digitalRead({pin})"));
        self.digital.get(&pin).copied().unwrap_or(0)
    }

    fn analog_write(&mut self, pin: i32, level: i32) {
        self.calls.push(format!("analogWrite({pin}, {level})"));
        self.analog.insert(pin, level);
    }

    fn analog_read(&mut self, pin: i32) -> i32 {
        self.calls.push(format!("analogRead({pin})"));
        self.analog.get(&pin).copied().unwrap_or(0)
    }

    fn pin_mode(&mut self, pin: i32, mode: i32) {
        self.calls.push(format!("pinMode({pin}, {mode})"));
    }

    fn wait(&mut self, ms: i32) {
        self.calls.push(format!("delay({ms})"));
        self.clock_ms += ms.max(0) as u64;
    }

    fn millis(&mut self) -> u64 {
        self.calls.push("millis()".to_owned());
        self.clock_ms
    }

    fn random(&mut self, min: i32, max: i32) -> i32 {
        self.calls.push(format!("random({min}, {max})"));
        min
    }

    fn available(&mut self) -> i32 {
        self.calls.push("available()".to_owned());
        self.input.len() as i32
    }

    fn read_byte(&mut self) -> i32 {
        self.calls.push("read()".to_owned());
        self.input.pop_front().map_or(-1, i32::from)
    }

    fn set_color(&mut self, r: i32, g: i32, b: i32) {
        self.calls.push(format!("setColor({r}, {g}, {b})"));
    }

    fn print(&mut self, text: &str) {
        self.output.push(text.to_owned());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
