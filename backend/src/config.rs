use log::warn;
use std::str::FromStr;
use std::time::Duration;

/// Server settings, read from `MONUMENTS_*` environment variables.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Open the embedded UI in the default browser after start.
    pub open_browser: bool,
    /// CSV rows checked per rayon batch; one progress update per batch.
    pub chunk_size: usize,
    /// Capacity of the job update channel.
    pub channel_capacity: usize,
    /// Largest accepted bulk upload, file and mapping together.
    pub max_upload_bytes: usize,
    /// How long a finished job stays readable before it is dropped.
    pub job_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            open_browser: true,
            chunk_size: 500,
            channel_capacity: 100,
            max_upload_bytes: 10 * 1024 * 1024, // 10 MB
            job_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unset keys keep their default,
    /// unparseable ones are logged and keep their default too.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = ServerConfig::default();
        let chunk_size: usize = parse_or(&lookup, "MONUMENTS_CHUNK_SIZE", defaults.chunk_size);
        let channel_capacity: usize = parse_or(
            &lookup,
            "MONUMENTS_CHANNEL_CAPACITY",
            defaults.channel_capacity,
        );
        ServerConfig {
            host: lookup("MONUMENTS_HOST")
                .filter(|host| !host.trim().is_empty())
                .unwrap_or(defaults.host),
            port: parse_or(&lookup, "MONUMENTS_PORT", defaults.port),
            open_browser: parse_or(&lookup, "MONUMENTS_OPEN_BROWSER", defaults.open_browser),
            chunk_size: chunk_size.max(1),
            channel_capacity: channel_capacity.max(1),
            max_upload_bytes: parse_or(
                &lookup,
                "MONUMENTS_MAX_UPLOAD",
                defaults.max_upload_bytes,
            ),
            job_ttl: Duration::from_secs(parse_or(
                &lookup,
                "MONUMENTS_JOB_TTL_SECS",
                defaults.job_ttl.as_secs(),
            )),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{}={:?} is not valid, using the default", key, raw);
            default
        }),
    }
}
