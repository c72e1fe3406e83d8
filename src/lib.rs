pub mod account;
pub mod cli;
pub mod environment;
pub mod session;
pub mod templates;
pub mod types;
pub mod utils;

pub use environment::EnvironmentConfig;
pub use session::{AnalyzeFlow, FileCredentialStore, GuestClient, GuestError};
pub use templates::TemplateClient;
