//! # boks-ctl
//!
//! Library half of the `boks-ctl` binary.  The binary itself only parses
//! arguments and prints; everything worth testing lives here:
//!
//! - **`config`** – the TOML configuration file (`[general]` and
//!   `[session]` tables) at the platform config directory.
//! - **`capture`** – parsing of packet-log captures and their replay
//!   through a real [`boks_session::BoksSession`] over the scripted
//!   transport.
//! - **`render`** – one-line human descriptions of decoded events and
//!   battery readings.

pub mod capture;
pub mod config;
pub mod render;
