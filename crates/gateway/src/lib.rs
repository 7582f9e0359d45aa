//! HTTP surface of the Carimbo gateway
//!
//! Route registration, conditional-request handling via coordinate-derived
//! ETags, caching headers, gzip transport compression, and the HTML shell.
//! The actual fetch and cache logic lives in `carimbo-fetch` and
//! `carimbo-cache`; this crate only parses paths into coordinates, asks the
//! cache, and turns the outcome into HTTP responses.

pub mod app;
pub mod cli;
mod error;
mod handlers;
