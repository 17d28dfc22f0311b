use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Automated motivational video generator")]
pub struct Args {
    /// Specific topic for the quote; a random one is picked when omitted.
    #[clap(long)]
    pub topic: Option<String>,

    /// Produce a long-form 16:9 video instead of a vertical short.
    #[clap(long)]
    pub long: bool,

    /// Generate the video but do NOT upload anywhere.
    #[clap(long)]
    pub dry_run: bool,

    /// Do not delete temporary assets after the run.
    #[clap(long)]
    pub keep_temps: bool,

    /// Settings file path.
    #[clap(long, default_value = "config/settings.yaml")]
    pub config: String,

    /// Explicit output file; defaults into the configured output dir.
    #[clap(long)]
    pub out: Option<String>,

    /// Seed for topic/voice/music selection, for reproducible runs.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Use piper instead of edge-tts, with this voice model. Piper reports
    /// no word timing, so captions fall back to estimated boundaries.
    #[clap(long)]
    pub piper_model: Option<String>,

    /// Google OAuth token file used for uploads.
    #[clap(long, default_value = "token.json")]
    pub token_file: String,
}
