use crate::domain::SiteRecord;

use super::Toolkit;

/// A registry entry joined with its live enabled state.
#[derive(Debug, Clone)]
pub struct SiteSummary {
    pub record: SiteRecord,
    pub enabled: bool,
}

/// Use case: list sites. Enabled state is read from the symlink farm for
/// every call.
pub struct ListSites<'a> {
    kit: Toolkit<'a>,
}

impl<'a> ListSites<'a> {
    pub fn new(kit: Toolkit<'a>) -> Self {
        Self { kit }
    }

    pub fn execute(&self) -> Vec<SiteSummary> {
        let sites = self.kit.enabled_sites();
        self.kit
            .registry
            .load()
            .iter()
            .map(|record| SiteSummary {
                enabled: sites.is_enabled(record.domain()),
                record: record.clone(),
            })
            .collect()
    }
}
