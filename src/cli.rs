use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tivo-digest")]
#[command(about = "Email a digest of new episodes the TiVo will record today and tomorrow")]
pub struct Cli {
    /// Compose the digest and print it instead of sending it
    #[arg(short = 'd', long = "debug", visible_alias = "nomail")]
    pub debug: bool,

    /// Query the DVR even if today's to-do list is already cached
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Path to the JSON config file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Number of days to include, starting today
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..=14))]
    pub days: u32,

    /// Log at debug level
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
