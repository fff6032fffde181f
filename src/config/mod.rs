mod loader;
mod types;

pub use loader::{CONFIG_FILE_NAME, load, load_file};
pub use types::{BOLT_PORT, BROWSER_HTTP_PORT, BROWSER_HTTPS_PORT, Config};
