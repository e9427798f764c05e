use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[clap(author, version)]
#[clap(name = "Go ResNet Client")]
#[clap(about = "Trains and queries the Go policy/value network", long_about = None)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    FakeTrain(FakeTrainCommand),
    Predict(PredictCommand),
    Describe(DescribeCommand),
}

#[derive(Args)]
#[clap(about = "Trains the network on synthetic stone counting data", long_about = None)]
pub struct FakeTrainCommand {
    #[clap(short, long, default_value_t = String::from("client.conf"))]
    pub config: String,
}

#[derive(Args)]
#[clap(about = "Prints the move distribution and value of a position", long_about = None)]
pub struct PredictCommand {
    #[clap(short, long)]
    pub checkpoint: String,

    /// Rows separated by '/', using 'x' for black, 'o' for white and '.' for empty.
    #[clap(short, long)]
    pub board: String,

    #[clap(short, long, default_value_t = 1, allow_hyphen_values = true)]
    pub player: i8,

    #[clap(short, long, default_value_t = 10)]
    pub top: usize,
}

#[derive(Args)]
#[clap(about = "Logs the configured architecture and its parameter count", long_about = None)]
pub struct DescribeCommand {
    #[clap(short, long, default_value_t = String::from("client.conf"))]
    pub config: String,
}
