use clap::Parser;

/// Runtime configuration, from flags or the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "algo-arena", about = "Battle service for competitive-programming events")]
pub struct Config {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind_addr: String,

    /// Base URL of the hosted identity/profile service
    #[arg(long, env = "IDENTITY_BASE_URL")]
    pub identity_base_url: String,

    /// Per-request timeout for identity service calls, in milliseconds
    #[arg(long, env = "IDENTITY_TIMEOUT_MS", default_value_t = 2_000)]
    pub identity_timeout_ms: u64,

    /// Maximum connections in the Postgres pool
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub database_max_connections: u32,
}
