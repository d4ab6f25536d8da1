/// Application name, used for config discovery and environment variables.
pub const APP_NAME: &str = "stratus";

/// Length of the truncated hex digest used for content-addressed keys.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "stratus.toml";

/// Environment variable overriding the configuration file path.
pub const CONFIG_ENV: &str = "STRATUS_CONFIG";

/// Manifest file name within the build output directory.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Synthesized stack document file name within the build output directory.
pub const STACK_FILENAME: &str = "stack.json";

/// Directory holding one sub-directory per asset group.
pub const ASSETS_DIR: &str = "assets";

/// Directory holding one sub-directory per packaged function.
pub const FUNCTIONS_DIR: &str = "functions";

/// Function id reserved for the server-side rendering engine.
pub const SSR_ENGINE_ID: &str = "ssr-engine";

/// The generator's output root; stripped from static file paths to form object keys.
pub const GENERATOR_OUTPUT_ROOT: &str = "public";

/// Default path prefix under which assets are requested from the CDN.
pub const DEFAULT_ASSETS_PREFIX: &str = "/_assets";

/// Default build output directory, relative to the working directory.
pub const DEFAULT_OUT_DIR: &str = ".stratus";
