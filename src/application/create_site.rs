use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::{DomainName, SiteRecord};
use crate::infrastructure::clock;
use crate::infrastructure::exec::{Cmd, ExecError};
use crate::infrastructure::templates::TemplateSource;

use super::config_writer::ConfigTarget;
use super::{LifecycleError, StepOutcome, Toolkit};

pub struct CreateSiteRequest {
    pub domain: DomainName,
    /// Defaults to `<web_root_base>/<domain>`.
    pub root_dir: Option<PathBuf>,
    pub enable_php: bool,
}

/// Result of a successful site creation.
#[derive(Debug)]
pub struct CreateResult {
    pub record: SiteRecord,
    pub live_config: PathBuf,
    pub mirror_config: PathBuf,
    pub template: TemplateSource,
    pub steps: Vec<StepOutcome>,
}

/// Use case: register a new site with a validated plain vhost.
///
/// The site is not enabled; the registry entry is written last, only once the
/// config has passed validation and the document root is in place.
pub struct CreateSite<'a> {
    kit: Toolkit<'a>,
}

impl<'a> CreateSite<'a> {
    pub fn new(kit: Toolkit<'a>) -> Self {
        Self { kit }
    }

    pub fn execute(&self, request: CreateSiteRequest) -> Result<CreateResult, LifecycleError> {
        let root_dir = request
            .root_dir
            .unwrap_or_else(|| self.kit.paths.default_root(&request.domain));
        check_root_dir(&root_dir)?;

        let mut registry = self.kit.registry.load();
        if registry.contains(&request.domain) {
            return Err(LifecycleError::DuplicateDomain(request.domain));
        }

        let now = clock::now();
        let record = SiteRecord::new(request.domain, root_dir, request.enable_php, now);

        let rendered = self.kit.renderer.render_site(
            &record,
            self.kit.php_fpm_socket(),
            clock::display(now),
        )?;

        let target = ConfigTarget::site(self.kit.paths, record.domain());
        let pending = self.kit.writer().apply(target, &rendered.text)?;

        let mut steps = vec![StepOutcome::Success(format!(
            "Configuration written to {}",
            pending.target().live.display()
        ))];
        steps.extend(self.provision(&record)?);

        registry.insert(record.clone());
        self.kit.registry.save(&registry)?;
        info!(domain = %record.domain(), root = %record.root_dir.display(), "Site created");

        Ok(CreateResult {
            live_config: pending.target().live.clone(),
            mirror_config: pending.target().mirror.clone(),
            record,
            template: rendered.source,
            steps,
        })
    }

    /// Create the document root, hand it to the web user and drop a landing
    /// page into it unless one exists.
    fn provision(&self, record: &SiteRecord) -> Result<Vec<StepOutcome>, ExecError> {
        let runner = self.kit.runner;
        let root = &record.root_dir;
        let owner = self.kit.config.web.owner();

        runner.run(
            &Cmd::new("mkdir")
                .arg("-p")
                .path(root)
                .describe(format!("Creating document root {}", root.display()))
                .elevated(),
        )?;
        runner.run(
            &Cmd::new("chown")
                .args(["-R", owner.as_str()])
                .path(root)
                .describe(format!("Setting owner of {}", root.display()))
                .elevated(),
        )?;
        runner.run(
            &Cmd::new("chmod")
                .arg("755")
                .path(root)
                .describe(format!("Setting permissions of {}", root.display()))
                .elevated(),
        )?;

        let mut steps = vec![StepOutcome::Success(format!(
            "Document root ready at {}",
            root.display()
        ))];

        let index = root.join("index.html");
        if index.exists() {
            steps.push(StepOutcome::Skipped("index.html already present".into()));
        } else {
            runner.write_privileged(&index, &landing_page(record))?;
            runner.run(
                &Cmd::new("chown")
                    .arg(owner.as_str())
                    .path(&index)
                    .elevated(),
            )?;
            steps.push(StepOutcome::Success("Landing page written".into()));
        }
        Ok(steps)
    }
}

/// The root lands unquoted in a `root ...;` directive.
fn check_root_dir(root: &Path) -> Result<(), LifecycleError> {
    let text = root.to_string_lossy();
    let unsafe_char = |c: char| {
        matches!(c, ';' | '{' | '}' | '#' | '"' | '\'' | '\\')
            || c.is_whitespace()
            || c.is_control()
    };
    if text.is_empty() || text.chars().any(unsafe_char) {
        return Err(LifecycleError::InvalidRootDir(root.to_path_buf()));
    }
    Ok(())
}

fn landing_page(record: &SiteRecord) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Welcome to {domain}</title>
    <style>
        body {{ font-family: Arial, sans-serif; text-align: center; padding: 50px; }}
        h1 {{ color: #4CAF50; }}
    </style>
</head>
<body>
    <h1>Welcome to {domain}</h1>
    <p>This site is managed by sitekeep</p>
    <p>Created at {created}</p>
</body>
</html>
"#,
        domain = record.domain(),
        created = clock::display(record.created_at()),
    )
}
