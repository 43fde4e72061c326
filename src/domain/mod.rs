mod site;
pub mod value_objects;

pub use site::{SiteRecord, TlsBinding};
pub use value_objects::{DomainName, DomainNameError};
