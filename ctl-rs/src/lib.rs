//! `ctlscript`: a small control-script engine for I/O boards.
//!
//! The engine ([`script`]) stores scripts in a compact tokenised buffer and
//! runs them against any [`effector::Effector`] host.  The [`board`] module
//! provides a simulated host; [`dispatch`], [`config`] and [`cli`] make up
//! the `ctl` binary's front end.

pub mod board;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod effector;
pub mod script;
pub mod var;
