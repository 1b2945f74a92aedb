/// Application name, used for platform directories.
pub const APP_NAME: &str = "buildlab";

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "BUILDLAB_CONFIG";

/// Environment variable overriding the build store file.
pub const STORE_ENV: &str = "BUILDLAB_STORE";

/// File name of the config file inside the config directory.
pub const CONFIG_FILENAME: &str = "buildlab.toml";

/// File name of the JSON build store inside the data directory.
pub const STORE_FILENAME: &str = "builds.json";

/// Marker that starts the module body of a generated build.
pub const IMPORT_MARKER: &str = "import ";

/// Statement that terminates the module body of a generated build.
pub const EXPORT_MARKER: &str = "export default App;";

/// Maximum number of characters of the prompt kept as a build title.
pub const TITLE_MAX_CHARS: usize = 100;
