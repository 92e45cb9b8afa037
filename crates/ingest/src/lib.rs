pub mod config;
pub mod directory;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod resolver;

pub use config::Settings;
pub use directory::{Directory, DirectoryMember};
pub use error::{IngestError, Result};
pub use parser::{ScoreReport, parse_report, parse_report_now};
pub use pipeline::ingest_message;
pub use resolver::{display_name, reresolve_all, resolve};
