use clap::Parser;

/// Configuration for the docx-fill server.
#[derive(Parser, Debug, Clone)]
#[command(name = "docx-fill-server")]
#[command(about = "Extract fillable placeholders from .docx templates and fill them with answers")]
pub struct Config {
    /// TCP host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// TCP port to bind to
    #[arg(long, default_value = "8080", env = "PORT")]
    pub port: u16,

    /// OpenAI-compatible chat completions endpoint used for placeholder extraction
    #[arg(
        long,
        default_value = "https://router.huggingface.co/v1/chat/completions",
        env = "EXTRACTOR_URL"
    )]
    pub extractor_url: String,

    /// Bearer token for the extraction endpoint
    #[arg(long, env = "EXTRACTOR_API_TOKEN")]
    pub extractor_api_token: Option<String>,

    /// Model name sent to the extraction endpoint
    #[arg(long, default_value = "meta-llama/Llama-3.1-8B-Instruct", env = "EXTRACTOR_MODEL")]
    pub extractor_model: String,

    /// Upper bound for one extraction call (seconds)
    #[arg(long, default_value = "60", env = "EXTRACTOR_TIMEOUT_SECS")]
    pub extractor_timeout_secs: u64,

    /// How long an upload stays available for filling (seconds)
    #[arg(long, default_value = "3600", env = "SESSION_TTL_SECS")]
    pub session_ttl_secs: u64,

    /// Maximum number of uploads kept at once
    #[arg(long, default_value = "1000", env = "SESSION_MAX_ENTRIES")]
    pub session_max_entries: u64,

    /// Maximum request body size (bytes)
    #[arg(long, default_value = "20971520", env = "MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,
}
