//! Logistics Simulation Library
//!
//! A tick-driven logistics simulation that runs headless; renderers and input
//! layers sit on top of the public API.

pub mod simulation;
