use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "paceline-server", about = "Paceline coaching chat server")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/paceline.toml")]
    pub config: String,
}
