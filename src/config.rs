/// Runtime configuration
///
/// The prediction endpoint used to be a hardcoded development host; it is
/// now taken from the command line or the environment so the same binary
/// can point at a deployed recognition service.
use clap::Parser;

/// Default endpoint, matching the recognition service's development setup.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/predict";

#[derive(Debug, Clone, Parser)]
#[command(name = "prescription-reader", about, version)]
pub struct Config {
    /// URL of the prediction endpoint receiving the cropped image
    #[arg(long, env = "PREDICTION_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}
