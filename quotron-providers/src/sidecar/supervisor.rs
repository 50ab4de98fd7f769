use std::path::PathBuf;
use std::time::Duration;

use quotron_core::QuotronError;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, warn};

const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(200);
const HEALTH_WAIT_BUDGET: Duration = Duration::from_secs(5);

/// Where to find a sidecar's startup script, PID file, and default port,
/// keyed by the `<SOURCE>` prefix used in its environment variables
/// (e.g. `YAHOO`, `ECONOMIC`).
#[derive(Debug, Clone)]
pub struct SidecarSupervisorConfig {
    /// Env-var prefix, e.g. `"YAHOO"` for `YAHOO_PROXY_URL` / `YAHOO_PROXY_PORT`.
    pub source_prefix: String,
    /// Path to the startup script, invoked with no arguments.
    pub script_path: PathBuf,
    /// Port used when `<SOURCE>_PROXY_PORT` is not set.
    pub default_port: u16,
    /// PID file path the sidecar itself writes on startup.
    pub pid_file: PathBuf,
}

impl SidecarSupervisorConfig {
    fn proxy_url_var(&self) -> String {
        format!("{}_PROXY_URL", self.source_prefix)
    }

    fn proxy_port_var(&self) -> String {
        format!("{}_PROXY_PORT", self.source_prefix)
    }
}

/// Owns the lifecycle of one local sidecar process: adopts an already-running
/// instance found via its PID file, or launches and waits for it to become
/// healthy. Only terminates the process on [`SidecarSupervisor::shutdown`]
/// if this supervisor is the one that launched it.
pub struct SidecarSupervisor {
    config: SidecarSupervisorConfig,
    base_url: String,
    child: Option<Child>,
}

impl SidecarSupervisor {
    /// Inspect the PID file and either adopt the running sidecar or launch
    /// a new one, blocking until `/health` answers `ok` or the 5 s budget
    /// elapses.
    pub async fn start(config: SidecarSupervisorConfig) -> Result<Self, QuotronError> {
        let base_url = resolve_base_url(&config);

        if let Some(pid) = read_live_pid(&config.pid_file) {
            info!(pid, source = %config.source_prefix, "adopting running sidecar");
            return Ok(Self {
                config,
                base_url,
                child: None,
            });
        }

        info!(source = %config.source_prefix, script = %config.script_path.display(), "launching sidecar");
        let mut cmd = Command::new(&config.script_path);
        cmd.env(config.proxy_url_var(), &base_url);
        cmd.env(config.proxy_port_var(), port_of(&base_url, config.default_port).to_string());
        cmd.kill_on_drop(false);
        let child = cmd
            .spawn()
            .map_err(|e| QuotronError::Unavailable(format!("failed to spawn sidecar: {e}")))?;

        let supervisor = Self {
            config,
            base_url,
            child: Some(child),
        };
        supervisor.wait_until_healthy().await?;
        Ok(supervisor)
    }

    /// Base URL other providers should use to reach this sidecar.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn wait_until_healthy(&self) -> Result<(), QuotronError> {
        let client = reqwest::Client::new();
        let url = format!("{}/health", self.base_url);
        let deadline = Instant::now() + HEALTH_WAIT_BUDGET;

        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    if let Ok(body) = resp.json::<serde_json::Value>().await {
                        if body.get("status").and_then(|s| s.as_str()) == Some("ok") {
                            return Ok(());
                        }
                    }
                }
                Ok(_) | Err(_) => {}
            }
            if Instant::now() >= deadline {
                return Err(QuotronError::Timeout);
            }
            tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
        }
    }

    /// Terminate the process and remove the PID file, but only if this
    /// supervisor launched it — an adopted process outlives the supervisor.
    pub async fn shutdown(mut self) {
        let Some(mut child) = self.child.take() else {
            debug!(source = %self.config.source_prefix, "not shutting down adopted sidecar");
            return;
        };

        if let Some(pid) = child.id() {
            // SAFETY: `pid` came from the child handle we just spawned.
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
        }
        if let Err(e) = tokio::time::timeout(Duration::from_secs(3), child.wait()).await {
            warn!(source = %self.config.source_prefix, error = %e, "sidecar did not exit in time, killing");
            let _ = child.kill().await;
        }
        let _ = std::fs::remove_file(&self.config.pid_file);
    }
}

fn resolve_base_url(config: &SidecarSupervisorConfig) -> String {
    if let Ok(url) = std::env::var(config.proxy_url_var()) {
        return url;
    }
    let port = std::env::var(config.proxy_port_var())
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(config.default_port);
    format!("http://127.0.0.1:{port}")
}

fn port_of(base_url: &str, default_port: u16) -> u16 {
    url::Url::parse(base_url)
        .ok()
        .and_then(|u| u.port())
        .unwrap_or(default_port)
}

fn read_live_pid(pid_file: &PathBuf) -> Option<u32> {
    let contents = std::fs::read_to_string(pid_file).ok()?;
    let pid: u32 = contents.trim().parse().ok()?;
    // SAFETY: signal 0 performs no action beyond existence/permission checks.
    let alive = unsafe { libc::kill(pid as libc::pid_t, 0) == 0 };
    alive.then_some(pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_pid_file_is_ignored() {
        let dir = std::env::temp_dir().join(format!("quotron-test-pid-{}", std::process::id()));
        std::fs::write(&dir, "999999999").unwrap();
        assert!(read_live_pid(&dir).is_none());
        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn live_pid_is_adopted() {
        let dir = std::env::temp_dir().join(format!("quotron-test-pid-live-{}", std::process::id()));
        std::fs::write(&dir, std::process::id().to_string()).unwrap();
        assert_eq!(read_live_pid(&dir), Some(std::process::id()));
        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn resolves_default_port_when_env_unset() {
        let config = SidecarSupervisorConfig {
            source_prefix: "QUOTRON_TEST_UNSET_PREFIX".to_string(),
            script_path: PathBuf::from("/bin/true"),
            default_port: 5055,
            pid_file: PathBuf::from("/tmp/quotron-test-unset.pid"),
        };
        assert_eq!(resolve_base_url(&config), "http://127.0.0.1:5055");
    }
}
