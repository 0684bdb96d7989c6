//! LungScan - X-ray Classification API Service
//!
//! This crate implements the API backend for the LungScan chest X-ray demo.
//! It proxies uploaded images to an external inference service, keeps a
//! per-user inference history, and admission-controls every protected
//! endpoint with an in-process fixed-window rate limiter.

pub mod config;
pub mod error;
pub mod history;
pub mod http;
pub mod inference;
pub mod ratelimit;
