/// State management module
///
/// This module handles all application state, including:
/// - Image intake and upload validation (intake.rs)
/// - Crop geometry and drag behavior (crop.rs)
/// - Prediction result and request lifecycle (prediction.rs)

pub mod crop;
pub mod intake;
pub mod prediction;
