use std::{env::var, time::Duration};

use log::{error, warn};

fn env_var(id: &str) -> Option<String> {
    var(id)
        .inspect_err(|e| {
            warn!("Could not read env var {}: {}", id, e);
        })
        .ok()
}

fn env_parsed<T: std::str::FromStr>(id: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    env_var(id).and_then(|s| {
        str::parse::<T>(&s)
            .inspect_err(|e| {
                error!("Could not parse {} ({}): {}", id, s, e);
            })
            .ok()
    })
}

pub fn hostname() -> String {
    env_var("HOSTNAME").unwrap_or("0.0.0.0".to_string())
}

pub fn port() -> String {
    env_var("PORT").unwrap_or("34392".to_string())
}

/// Origin of the engine serving `/api/...`, without trailing slash.
pub fn backend() -> String {
    env_var("BACKEND")
        .map(|b| b.trim_end_matches('/').to_string())
        .unwrap_or("http://localhost:5000".to_string())
}

pub fn requesttimeout() -> Duration {
    Duration::from_secs(env_parsed::<u64>("REQUESTTIMEOUT").unwrap_or(30))
}

pub fn notificationlimit() -> usize {
    env_parsed::<usize>("NOTIFICATIONLIMIT").unwrap_or(50)
}

pub fn buildlogtail() -> usize {
    env_parsed::<usize>("BUILDLOGTAIL").unwrap_or(1000)
}
