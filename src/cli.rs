use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tubedrop")]
#[command(author, version, about = "HTTP service for downloading YouTube video and audio", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Listening port, overrides PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the yt-dlp and ffmpeg versions and exit
    CheckTools,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
