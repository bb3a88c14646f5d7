//! # Meadow
//!
//! Headless driver for the procedural terrain core.
//!
//! The terrain crate knows nothing about frames or observers; this crate
//! supplies both. [`FrameDriver`] runs the update-then-upload loop a real
//! client would run each frame, and [`ObserverPath`] scripts where the
//! observer goes. Rendering stays behind `TileRenderer`, so the same loop
//! drives a GPU backend or the in-memory `HeadlessRenderer`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use meadow::{FrameDriver, ObserverPath};
//! use meadow_procedural::{HeadlessRenderer, TerrainConfig};
//!
//! let mut driver = FrameDriver::new(TerrainConfig::default(), [0.0, 0.0], HeadlessRenderer::new())?;
//! let path = ObserverPath::spiral([0.0, 0.0], 64.0, 12, 2.0);
//! let stats = driver.run(&path, None);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

pub mod driver;
pub mod path;

pub use driver::{next_algorithm, DriverStats, FrameDriver, FrameReport};
pub use path::ObserverPath;
