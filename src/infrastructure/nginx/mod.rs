pub mod enabled;
pub mod service;

pub use enabled::EnabledSites;
pub use service::{NginxService, ReloadError, SyntaxCheck};
