use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "ripple-server", about = "Ripple federation inbox worker")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/ripple.toml")]
    pub config: String,
}
