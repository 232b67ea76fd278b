use ratelimiter::{
    config::RateLimiterConfig, init_tracing, CounterStore, MemoryStore, RedisStore,
    TieredRateLimiter,
};
use std::env;
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

#[tokio::main]
async fn main() {
    // Initialize tracing
    init_tracing();

    // Get config file path from command line or use default
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "config/ratelimiter.yaml".to_string());

    // Load configuration
    let config = match RateLimiterConfig::from_file(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", config_path, e);
            eprintln!("Usage: ratelimiter [config_file]");
            process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        eprintln!("Rate limiter error: {}", e);
        process::exit(1);
    }
}

/// Answer `<endpoint> <identity>` lines from stdin with `allow` or `deny`
async fn run(config: RateLimiterConfig) -> anyhow::Result<()> {
    let store: Arc<dyn CounterStore> = match env::var("REDIS_URL") {
        Ok(url) => {
            let store = RedisStore::connect(&url).await?;
            store.ping().await?;
            Arc::new(store)
        }
        Err(_) => {
            info!("REDIS_URL not set, using in-memory counter store");
            Arc::new(MemoryStore::new())
        }
    };

    let limiter = TieredRateLimiter::new(&config, store)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace();
        let (Some(endpoint), Some(identity)) = (parts.next(), parts.next()) else {
            continue;
        };
        let endpoint = if endpoint == "-" { "" } else { endpoint };

        let verdict = if limiter.allow(endpoint, identity).await {
            "allow\n"
        } else {
            "deny\n"
        };
        stdout.write_all(verdict.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}
