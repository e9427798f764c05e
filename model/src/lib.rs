pub mod analytics;
pub mod conv_input_builder;
pub mod model_info;
pub mod position_metrics;

pub use analytics::*;
pub use conv_input_builder::*;
pub use model_info::*;
pub use position_metrics::*;
