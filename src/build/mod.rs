//! Bundle build pipeline: request validation, artifact naming, and the
//! external build tool.

pub mod artifact;
pub mod request;
pub mod runner;

pub use artifact::{artifact_file_name, bundle_args, join_modules};
pub use request::{BuildRequest, is_valid_version, parse_body, validate};
pub use runner::{BuildRunner, CommandRunner};
