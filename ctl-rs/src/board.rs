//! Simulated microcontroller board.
//!
//! [`Board`] implements [`Effector`] for the `ctl` binary.  It keeps two pin
//! banks (digital and analog, indexed independently), a monotonic clock, a
//! small pseudo-random generator and a byte input queue.  Output goes to any
//! [`Write`] sink; `setColor` draws a true-color swatch with crossterm when
//! the sink is a terminal.
//!
//! Analog outputs follow a crude RC model: every [`Board::tick`] decays them
//! by [`DECAY_FACTOR`] and then snaps pins with a pending ramp back to their
//! target, so a polled snapshot still shows the last written level.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetBackgroundColor},
};
use tracing::debug;

use crate::effector::Effector;

/// Default digital pin count (Uno-like).
pub const DEFAULT_DIGITAL_PINS: usize = 14;

/// Default analog pin count (Uno-like).
pub const DEFAULT_ANALOG_PINS: usize = 6;

/// Per-tick multiplier applied to analog outputs.
pub const DECAY_FACTOR: f32 = 0.95;

// ── Pin model ─────────────────────────────────────────────────────────────────

/// Board geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardSpec {
    pub digital_pins: usize,
    pub analog_pins: usize,
}

impl Default for BoardSpec {
    fn default() -> Self {
        Self { digital_pins: DEFAULT_DIGITAL_PINS, analog_pins: DEFAULT_ANALOG_PINS }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinMode {
    #[default]
    Input,
    Output,
    AnalogIn,
    AnalogOut,
}

impl PinMode {
    /// Decode the numeric mode used by `pinMode(pin, mode)`.
    pub fn from_code(code: i32) -> Option<PinMode> {
        match code {
            0 => Some(PinMode::Input),
            1 => Some(PinMode::Output),
            2 => Some(PinMode::AnalogIn),
            3 => Some(PinMode::AnalogOut),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PinMode::Input => "input",
            PinMode::Output => "output",
            PinMode::AnalogIn => "analog-in",
            PinMode::AnalogOut => "analog-out",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PinState {
    pub mode: PinMode,
    pub digital_level: bool,
    pub analog_level: f32,
}

// ── Board ─────────────────────────────────────────────────────────────────────

pub struct Board<W: Write> {
    digital: Vec<PinState>,
    analog: Vec<PinState>,
    /// Analog pin index → last written target.
    ramps: HashMap<usize, f32>,
    started: Instant,
    rng: u64,
    input: VecDeque<u8>,
    out: W,
    /// Draw `setColor` swatches with escape sequences.
    color: bool,
}

impl Board<io::Stdout> {
    /// A board writing to stdout.
    pub fn stdout(spec: BoardSpec, color: bool) -> Self {
        Board::new(spec, io::stdout(), color)
    }
}

impl<W: Write> Board<W> {
    pub fn new(spec: BoardSpec, out: W, color: bool) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0x2545_f491_4f6c_dd1d, |d| d.as_nanos() as u64);
        Board {
            digital: vec![PinState::default(); spec.digital_pins],
            analog: vec![PinState::default(); spec.analog_pins],
            ramps: HashMap::new(),
            started: Instant::now(),
            rng: seed | 1,
            input: VecDeque::new(),
            out,
            color,
        }
    }

    /// Replace the random seed (a zero seed is bumped to one).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = seed.max(1);
        self
    }

    /// Queue bytes for `available()` / `read()`.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    /// The output sink.
    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Advance the analog model one step.
    pub fn tick(&mut self) {
        for pin in self.analog.iter_mut().filter(|p| p.mode == PinMode::AnalogOut) {
            pin.analog_level *= DECAY_FACTOR;
        }
        for (&index, &target) in &self.ramps {
            if let Some(pin) = self.analog.get_mut(index) {
                pin.analog_level = target;
            }
        }
    }

    /// All pin states, digital bank first.
    pub fn snapshot(&self) -> Vec<PinState> {
        self.digital.iter().chain(self.analog.iter()).copied().collect()
    }

    /// Print a pin table through the board's own output.
    pub fn print_pins(&mut self) {
        let mut lines = Vec::with_capacity(self.digital.len() + self.analog.len());
        for (i, p) in self.digital.iter().enumerate() {
            lines.push(format!("D{i:<3} {:<10} {}", p.mode.name(), u8::from(p.digital_level)));
        }
        for (i, p) in self.analog.iter().enumerate() {
            lines.push(format!("A{i:<3} {:<10} {:.2}", p.mode.name(), p.analog_level));
        }
        for line in lines {
            self.print(&line);
        }
    }

    fn next_random(&mut self) -> u64 {
        // xorshift64
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng = x;
        x
    }

    fn digital_index(&mut self, pin: i32) -> Option<usize> {
        match usize::try_from(pin).ok().filter(|&i| i < self.digital.len()) {
            Some(i) => Some(i),
            None => {
                self.print(&format!("ERR: digital pin {pin} out of range"));
                None
            }
        }
    }

    fn analog_index(&mut self, pin: i32) -> Option<usize> {
        match usize::try_from(pin).ok().filter(|&i| i < self.analog.len()) {
            Some(i) => Some(i),
            None => {
                self.print(&format!("ERR: analog pin {pin} out of range"));
                None
            }
        }
    }
}

impl<W: Write> std::fmt::Debug for Board<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("digital", &self.digital)
            .field("analog", &self.analog)
            .field("input", &self.input.len())
            .finish_non_exhaustive()
    }
}

impl<W: Write> Effector for Board<W> {
    fn digital_write(&mut self, pin: i32, level: i32) {
        if let Some(i) = self.digital_index(pin) {
            self.digital[i].mode = PinMode::Output;
            self.digital[i].digital_level = level != 0;
        }
    }

    fn digital_read(&mut self, pin: i32) -> i32 {
        self.digital_index(pin)
            .map_or(0, |i| i32::from(self.digital[i].digital_level))
    }

    fn analog_write(&mut self, pin: i32, level: i32) {
        if let Some(i) = self.analog_index(pin) {
            let level = level as f32;
            self.analog[i].mode = PinMode::AnalogOut;
            self.analog[i].analog_level = level;
            self.ramps.insert(i, level);
        }
    }

    fn analog_read(&mut self, pin: i32) -> i32 {
        self.analog_index(pin)
            .map_or(0, |i| self.analog[i].analog_level.round() as i32)
    }

    fn pin_mode(&mut self, pin: i32, mode: i32) {
        let Some(mode) = PinMode::from_code(mode) else {
            self.print(&format!("ERR: unknown pin mode {mode}"));
            return;
        };
        // Pins number through the digital bank, then the analog bank.
        let digital_len = self.digital.len();
        let slot = match usize::try_from(pin) {
            Ok(i) if i < digital_len => self.digital.get_mut(i),
            Ok(i) => self.analog.get_mut(i - digital_len),
            Err(_) => None,
        };
        match slot {
            Some(p) => p.mode = mode,
            None => self.print(&format!("ERR: pin {pin} out of range")),
        }
    }

    fn wait(&mut self, ms: i32) {
        let ms = u64::try_from(ms).unwrap_or(0);
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
        self.tick();
    }

    fn millis(&mut self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn random(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (i64::from(max) - i64::from(min)) as u64;
        let offset = self.next_random() % span;
        (i64::from(min) + offset as i64) as i32
    }

    fn available(&mut self) -> i32 {
        i32::try_from(self.input.len()).unwrap_or(i32::MAX)
    }

    fn read_byte(&mut self) -> i32 {
        self.input.pop_front().map_or(-1, i32::from)
    }

    fn set_color(&mut self, r: i32, g: i32, b: i32) {
        let [r, g, b] = [r, g, b].map(|c| c.clamp(0, 255) as u8);
        debug!(r, g, b, "setColor");
        let label = format!(" rgb({r}, {g}, {b})\r\n");
        let result = if self.color {
            queue!(
                self.out,
                SetBackgroundColor(Color::Rgb { r, g, b }),
                Print("    "),
                ResetColor,
                Print(label),
            )
        } else {
            self.out.write_all(label.trim_start().as_bytes())
        };
        let _ = result.and_then(|()| self.out.flush());
    }

    fn print(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}").and_then(|()| self.out.flush());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> Board<Vec<u8>> {
        Board::new(BoardSpec::default(), Vec::new(), false).with_seed(42)
    }

    fn output(b: &Board<Vec<u8>>) -> String {
        String::from_utf8_lossy(b.writer()).into_owned()
    }

    #[test]
    fn digital_write_forces_output_mode() {
        let mut b = board();
        b.digital_write(13, 1);
        assert_eq!(b.digital_read(13), 1);
        let snap = b.snapshot();
        assert_eq!(snap[13].mode, PinMode::Output);
        assert!(snap[13].digital_level);
        assert_eq!(b.digital_read(12), 0);
    }

    #[test]
    fn out_of_range_pins_are_reported() {
        let mut b = board();
        b.digital_write(14, 1);
        assert_eq!(b.analog_read(-1), 0);
        assert_eq!(
            output(&b),
            "ERR: digital pin 14 out of range\nERR: analog pin -1 out of range\n"
        );
    }

    #[test]
    fn analog_ramp_survives_tick() {
        let mut b = board();
        b.analog_write(2, 200);
        b.tick();
        assert_eq!(b.analog_read(2), 200);
        assert_eq!(b.snapshot()[DEFAULT_DIGITAL_PINS + 2].mode, PinMode::AnalogOut);
    }

    #[test]
    fn analog_without_ramp_decays() {
        let mut b = board();
        b.pin_mode(DEFAULT_DIGITAL_PINS as i32 + 1, 3);
        b.analog[1].analog_level = 100.0;
        b.tick();
        assert_eq!(b.analog_read(1), 95);
    }

    #[test]
    fn pin_mode_codes() {
        let mut b = board();
        b.pin_mode(2, 1);
        assert_eq!(b.snapshot()[2].mode, PinMode::Output);
        b.pin_mode(2, 9);
        assert_eq!(output(&b), "ERR: unknown pin mode 9\n");
    }

    #[test]
    fn random_stays_in_range() {
        let mut b = board();
        for _ in 0..200 {
            let v = b.random(3, 9);
            assert!((3..9).contains(&v), "{v}");
        }
        assert_eq!(b.random(5, 5), 5);
        assert_eq!(b.random(7, 2), 7);
        let v = b.random(i32::MIN, i32::MAX);
        assert!(v < i32::MAX);
    }

    #[test]
    fn input_queue() {
        let mut b = board();
        assert_eq!(b.available(), 0);
        assert_eq!(b.read_byte(), -1);
        b.push_input(b"hi");
        assert_eq!(b.available(), 2);
        assert_eq!(b.read_byte(), i32::from(b'h'));
        assert_eq!(b.read_byte(), i32::from(b'i'));
        assert_eq!(b.read_byte(), -1);
    }

    #[test]
    fn set_color_plain_and_styled() {
        let mut b = board();
        b.set_color(300, -5, 128);
        assert_eq!(output(&b), "rgb(255, 0, 128)\r\n");

        let mut styled = Board::new(BoardSpec::default(), Vec::new(), true);
        styled.set_color(1, 2, 3);
        let text = String::from_utf8_lossy(styled.writer()).into_owned();
        assert!(text.contains("\x1b["), "{text:?}");
        assert!(text.ends_with("rgb(1, 2, 3)\r\n"));
    }

    #[test]
    fn clock_is_monotonic() {
        let mut b = board();
        let t0 = b.millis();
        b.wait(2);
        assert!(b.millis() >= t0 + 2);
    }

    #[test]
    fn print_pins_lists_both_banks() {
        let spec = BoardSpec { digital_pins: 2, analog_pins: 1 };
        let mut b = Board::new(spec, Vec::new(), false);
        b.digital_write(1, 1);
        b.print_pins();
        let text = output(&b);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("D1") && lines[1].ends_with('1'));
        assert!(lines[2].starts_with("A0"));
    }
}
