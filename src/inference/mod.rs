//! Upstream inference service client.

mod client;

pub use client::{mock_result, ImageUpload, InferenceClient, InferenceResult};
