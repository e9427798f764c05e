pub mod architecture;
pub mod batches;
pub mod checkpoint;
pub mod encoder;
pub mod error;
pub mod history;
pub mod loss;
pub mod network;
pub mod options;
pub mod predictor;
pub mod reporter;
pub mod resnet;
pub mod synthetic;
mod tensor;
pub mod trainer;

pub use architecture::*;
pub use batches::*;
pub use checkpoint::CheckpointError;
pub use encoder::*;
pub use error::*;
pub use history::*;
pub use loss::*;
pub use network::*;
pub use options::*;
pub use predictor::*;
pub use reporter::*;
pub use resnet::*;
pub use synthetic::*;
pub use trainer::*;
