use clap::Parser;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "cyclops-gateway")]
#[command(about = "Burst-suppressing ingress proxy for a Sentry-compatible backend")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Base URL of the upstream Sentry server
    #[arg(short, long, default_value = "http://localhost:9000")]
    pub sentry_url: String,

    // Path to the project credentials file (JSON)
    #[arg(long, default_value = "projects.json")]
    pub projects: String,

    // Fingerprint counter TTL in seconds (<= 0 disables admission control)
    #[arg(short, long, default_value_t = 60)]
    pub cache_ttl: i64,

    // Max occurrences of a fingerprint admitted per TTL window
    #[arg(long, default_value_t = 10)]
    pub max_uses: u64,
}
