// agent/src/config.rs
//
// Environment-driven configuration, loaded once at startup. Wiring only:
// the capability interfaces (§6) are what actually carry behavior, this
// just tells them where to look.

use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub root_dir: String,
    pub host_identifier: String,
    pub poll_interval: Duration,
    pub max_concurrent: usize,
    pub shutdown_wait: Duration,
    pub allow_unsigned: bool,
    pub error_backoff_base: Duration,
    pub max_revisions: usize,
}

impl AgentConfig {
    pub fn load() -> Self {
        Self {
            root_dir: env::var("AGENT_ROOT_DIR")
                .unwrap_or_else(|_| "/opt/codedeploy-agent/deployment-root".to_string()),
            host_identifier: env::var("AGENT_HOST_IDENTIFIER").unwrap_or_else(|_| String::new()),
            poll_interval: parse_secs_env("AGENT_POLL_INTERVAL_SECONDS", 30),
            max_concurrent: parse_usize_env("AGENT_MAX_CONCURRENT", 16),
            shutdown_wait: parse_secs_env("AGENT_SHUTDOWN_WAIT_SECONDS", 10),
            allow_unsigned: env::var("AGENT_ALLOW_UNSIGNED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            error_backoff_base: parse_secs_env("AGENT_ERROR_BACKOFF_BASE_SECONDS", 30),
            max_revisions: parse_usize_env("AGENT_MAX_REVISIONS", 5),
        }
    }
}

fn parse_secs_env(key: &str, default_secs: u64) -> Duration {
    let secs = env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}

fn parse_usize_env(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}
