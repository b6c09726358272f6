//! Configuration loaded by front ends and turned into [`ClientSettings`].
//!
//! The engine itself never reads files or the environment.
//!
//! [`ClientSettings`]: crate::remote::ClientSettings

pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use parser::{parse_octolens_toml, parse_octolens_toml_str, to_toml};
pub use paths::{CONFIG_FILE_NAME, config_path_in, default_config_dir};
pub use schema::{ClientSection, OctolensConfig, ServerSection};
pub use store::ConfigStore;
