//! Control-script engine.
//!
//! Scripts are short, line-oriented programs:
//!
//! - assignment `x = expr` over `+ - * /` (no parentheses)
//! - conditions with `== != <= >= < >`
//! - `if … then` / `elseif … then` / `else` / `end`
//! - `while … do` … `end` and `for i = a, b[, step] do` … `end`
//! - effector calls such as `digitalWrite(13, 1)` and `print("text")`
//!
//! Loops are capped and nesting depth is bounded; malformed input degrades
//! to plain statements or zero values instead of failing.
//!
//! # Quick start
//!
//! ```rust
//! use ctlscript::effector::Recorder;
//! use ctlscript::script::Interpreter;
//!
//! let mut interp = Interpreter::new();
//! let mut host = Recorder::new();
//! interp.exec_script("s = 0\nfor i = 1, 3 do\ns = s + i\nend", &mut host);
//! assert_eq!(interp.get_var("s"), 6.0);
//! ```

pub mod block;
pub mod buffer;
pub mod codec;
pub mod expr;
pub mod interp;
pub mod source;
pub mod stmt;

// Re-exports for convenience.
pub use codec::LineCodec;
pub use interp::{Interpreter, Limits};
