//! Terminal ISS tracker: polls a telemetry backend and draws the station on a
//! braille globe or Mercator map with live statistics.

pub mod app;
pub mod braille;
pub mod chart;
pub mod config;
pub mod data;
pub mod facts;
pub mod format;
pub mod geo;
pub mod hash;
pub mod map;
pub mod series;
pub mod telemetry;
pub mod ui;
