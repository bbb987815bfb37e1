use std::{net::SocketAddr, num::NonZeroUsize, str::FromStr, time::Duration};

const DEFAULT_CACHE_TTL_SECS: u64 = 600;
const DEFAULT_CACHE_CAPACITY: usize = 256;
const DEFAULT_SOS_RESPONSE_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}={value:?} is not valid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Server settings, read from `NAVGUARD_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub addr: SocketAddr,
    pub route_cache_ttl: Duration,
    pub route_cache_capacity: NonZeroUsize,
    /// Fixed seed for the route calculator; `None` seeds from entropy.
    pub route_seed: Option<u64>,
    /// Delay before SOS alerts are auto-responded; `None` disables it.
    pub sos_response_delay: Option<Duration>,
    /// Artificial delay added to route calculations.
    pub simulated_latency: Duration,
    pub include_sample_incidents: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            route_cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            route_cache_capacity: NonZeroUsize::new(DEFAULT_CACHE_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
            route_seed: None,
            sos_response_delay: Some(Duration::from_secs(DEFAULT_SOS_RESPONSE_SECS)),
            simulated_latency: Duration::ZERO,
            include_sample_incidents: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Missing or blank keys take
    /// their default; unparsable values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let addr = parse_or("NAVGUARD_ADDR", get("NAVGUARD_ADDR"), defaults.addr)?;
        let ttl_secs = parse_or(
            "NAVGUARD_ROUTE_CACHE_TTL_SECS",
            get("NAVGUARD_ROUTE_CACHE_TTL_SECS"),
            DEFAULT_CACHE_TTL_SECS,
        )?;
        let route_cache_capacity = parse_or(
            "NAVGUARD_ROUTE_CACHE_CAPACITY",
            get("NAVGUARD_ROUTE_CACHE_CAPACITY"),
            defaults.route_cache_capacity,
        )?;
        let route_seed = get("NAVGUARD_ROUTE_SEED")
            .map(|value| parse("NAVGUARD_ROUTE_SEED", value))
            .transpose()?;
        let sos_secs = parse_or(
            "NAVGUARD_SOS_RESPONSE_SECS",
            get("NAVGUARD_SOS_RESPONSE_SECS"),
            DEFAULT_SOS_RESPONSE_SECS,
        )?;
        let latency_ms = parse_or(
            "NAVGUARD_SIMULATED_LATENCY_MS",
            get("NAVGUARD_SIMULATED_LATENCY_MS"),
            0u64,
        )?;
        let include_sample_incidents = parse_or(
            "NAVGUARD_SAMPLE_INCIDENTS",
            get("NAVGUARD_SAMPLE_INCIDENTS"),
            defaults.include_sample_incidents,
        )?;

        Ok(Self {
            addr,
            route_cache_ttl: Duration::from_secs(ttl_secs),
            route_cache_capacity,
            route_seed,
            sos_response_delay: (sos_secs > 0).then(|| Duration::from_secs(sos_secs)),
            simulated_latency: Duration::from_millis(latency_ms),
            include_sample_incidents,
        })
    }
}

fn parse<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value.trim().parse() {
        Ok(parsed) => Ok(parsed),
        Err(err) => Err(ConfigError::Invalid {
            key,
            reason: err.to_string(),
            value,
        }),
    }
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.map_or(Ok(default), |value| parse(key, value))
}
