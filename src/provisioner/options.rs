use std::path::PathBuf;

/// Per-instance settings for [`Provisioner::start`](super::Provisioner::start).
#[derive(Debug, Clone)]
pub struct StartOptions {
    /// Block until the database completes a Bolt handshake. Credentials are
    /// not checked, so a wrong password still counts as ready.
    pub wait: bool,
    /// Host directory bound to `/data`. Implies `use_data_path`.
    pub data_path: Option<PathBuf>,
    /// Mount `/data`, at `<cwd>/data/<name>` unless `data_path` is set.
    pub use_data_path: bool,
    /// Host directory bound read-only to `/import`. Implies `use_import_path`.
    pub import_path: Option<PathBuf>,
    /// Mount `/import`, at `<cwd>/import/<name>` unless `import_path` is set.
    pub use_import_path: bool,
    /// Publish the browser ports 7474/7473 on the same host ports. Only one
    /// instance can hold them at a time.
    pub mount_browser: bool,
    /// Shell snippet run before the database starts.
    pub run_before: String,
    /// Shell snippet run once the database has started.
    pub run_after: String,
    /// Image override; the provisioner's configured image otherwise.
    pub image: Option<String>,
    /// Readiness probe attempts; the provisioner's configured limit otherwise.
    /// Zero skips waiting.
    pub wait_attempt_limit: Option<u32>,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            wait: false,
            data_path: None,
            use_data_path: true,
            import_path: None,
            use_import_path: false,
            mount_browser: false,
            run_before: String::new(),
            run_after: String::new(),
            image: None,
            wait_attempt_limit: None,
        }
    }
}

impl StartOptions {
    pub fn waiting() -> Self {
        Self {
            wait: true,
            ..Self::default()
        }
    }
}
