pub mod orchestrator;
pub mod supervisor;
pub mod swap_builder;
pub mod swap_config;

pub use orchestrator::{PipelineRun, PipelineStage, SwapError, SwapOrchestrator};
pub use swap_builder::{RaydiumSwapBuilder, SwapBuilder, SwapTransaction};
pub use swap_config::{SwapConfig, SwapDirection};
