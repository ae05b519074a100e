/// Name of the environment variable containing the path to the IR configuration file.
/// If not set, defaults to
///  (1) on Linux and macOS: `$XDG_CONFIG_HOME/pir/config.toml` or `$HOME/.config/pir/config.toml`
///  (2) on Windows: `%APPDATA%\pir\config.toml`
pub const ENV_CONFIG_PATH: &str = "PIR_CONFIG_PATH";

/// Directory and file name used when falling back to the per-user configuration.
pub const CONFIG_DIR_NAME: &str = "pir";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default number of buckets reserved by a freshly created storage uniquer.
pub const DEFAULT_UNIQUER_CAPACITY: usize = 64;

/// Alignment of every operation block. Slots and body are laid out so that
/// each of them starts on a multiple of this value.
pub const OPERATION_ALIGN: usize = 8;
