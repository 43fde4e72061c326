mod domain_name;

pub use domain_name::{DomainName, DomainNameError};
