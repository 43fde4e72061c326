//! Config rendering from on-disk templates.
//!
//! Site templates use `{name}` placeholders (`{{` and `}}` for literal
//! braces). Main and module templates are installed verbatim.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::domain::SiteRecord;

const BUILTIN_SITE: &str = include_str!("../../templates/sites/site.conf.template");
const BUILTIN_SITE_TLS: &str = include_str!("../../templates/sites/site-ssl.conf.template");

const TEMPLATE_SUFFIX: &str = ".conf.template";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template for {kind} not found: {path}")]
    TemplateMissing { kind: TemplateKind, path: PathBuf },

    #[error("Failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unknown placeholder '{{{name}}}' in {origin}")]
    UnknownPlaceholder { name: String, origin: String },

    #[error("Unbalanced brace at byte {offset} in {origin}")]
    UnbalancedBrace { offset: usize, origin: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateKind {
    SitePlain,
    SiteTls,
    Main,
    Module(String),
}

impl TemplateKind {
    /// Picks the TLS template only when the record carries a complete binding.
    pub fn for_site(record: &SiteRecord) -> Self {
        match record.tls() {
            Some(tls)
                if !tls.cert_path.as_os_str().is_empty()
                    && !tls.key_path.as_os_str().is_empty() =>
            {
                Self::SiteTls
            }
            _ => Self::SitePlain,
        }
    }

    fn relative_path(&self) -> PathBuf {
        match self {
            Self::SitePlain => Path::new("sites").join(format!("site{}", TEMPLATE_SUFFIX)),
            Self::SiteTls => Path::new("sites").join(format!("site-ssl{}", TEMPLATE_SUFFIX)),
            Self::Main => Path::new("main").join(format!("nginx{}", TEMPLATE_SUFFIX)),
            Self::Module(name) => Path::new("modules").join(format!("{}{}", name, TEMPLATE_SUFFIX)),
        }
    }

    fn builtin(&self) -> Option<&'static str> {
        match self {
            Self::SitePlain => Some(BUILTIN_SITE),
            Self::SiteTls => Some(BUILTIN_SITE_TLS),
            Self::Main | Self::Module(_) => None,
        }
    }

    fn substitutes(&self) -> bool {
        matches!(self, Self::SitePlain | Self::SiteTls)
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SitePlain => write!(f, "site"),
            Self::SiteTls => write!(f, "TLS site"),
            Self::Main => write!(f, "main config"),
            Self::Module(name) => write!(f, "module '{}'", name),
        }
    }
}

/// The fixed set of fields a site template can reference.
#[derive(Debug, Clone, Default)]
pub struct TemplateParams {
    pub domain: String,
    pub root_dir: String,
    pub php_config: String,
    pub ssl_cert: String,
    pub ssl_key: String,
    pub generated_at: String,
}

impl TemplateParams {
    pub fn for_site(record: &SiteRecord, php_fpm_socket: &str, generated_at: String) -> Self {
        let (ssl_cert, ssl_key) = record
            .tls()
            .map(|tls| {
                (
                    tls.cert_path.display().to_string(),
                    tls.key_path.display().to_string(),
                )
            })
            .unwrap_or_default();

        Self {
            domain: record.domain().to_string(),
            root_dir: record.root_dir.display().to_string(),
            php_config: if record.enable_php {
                php_fragment(php_fpm_socket)
            } else {
                String::new()
            },
            ssl_cert,
            ssl_key,
            generated_at,
        }
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            "domain" => Some(&self.domain),
            "root_dir" => Some(&self.root_dir),
            "php_config" => Some(&self.php_config),
            "ssl_cert" => Some(&self.ssl_cert),
            "ssl_key" => Some(&self.ssl_key),
            "generated_at" => Some(&self.generated_at),
            _ => None,
        }
    }
}

/// PHP-FPM handler block inserted for sites with PHP enabled.
pub fn php_fragment(php_fpm_socket: &str) -> String {
    format!(
        r#"
    location ~ \.php$ {{
        include snippets/fastcgi-php.conf;
        fastcgi_pass {socket};
        fastcgi_param SCRIPT_FILENAME $document_root$fastcgi_script_name;
        include fastcgi_params;
    }}
"#,
        socket = php_fpm_socket
    )
}

/// Where a rendered text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    File(PathBuf),
    Builtin,
}

#[derive(Debug, Clone)]
pub struct Rendered {
    pub kind: TemplateKind,
    pub text: String,
    pub source: TemplateSource,
}

pub struct ConfigRenderer {
    templates_dir: PathBuf,
}

impl ConfigRenderer {
    pub fn new(templates_dir: PathBuf) -> Self {
        Self { templates_dir }
    }

    pub fn template_path(&self, kind: &TemplateKind) -> PathBuf {
        self.templates_dir.join(kind.relative_path())
    }

    pub fn render(
        &self,
        kind: TemplateKind,
        params: &TemplateParams,
    ) -> Result<Rendered, RenderError> {
        let path = self.template_path(&kind);

        let (raw, source) = if path.is_file() {
            let raw = fs::read_to_string(&path).map_err(|source| RenderError::Read {
                path: path.clone(),
                source,
            })?;
            (raw, TemplateSource::File(path))
        } else if let Some(builtin) = kind.builtin() {
            debug!(
                kind = %kind,
                path = %path.display(),
                "Template file absent, using built-in default"
            );
            (builtin.to_string(), TemplateSource::Builtin)
        } else {
            return Err(RenderError::TemplateMissing { kind, path });
        };

        let text = if kind.substitutes() {
            let origin = match &source {
                TemplateSource::File(p) => p.display().to_string(),
                TemplateSource::Builtin => format!("built-in {} template", kind),
            };
            substitute(&raw, params, &origin)?
        } else {
            raw
        };

        Ok(Rendered { kind, text, source })
    }

    /// Render the vhost for a site, choosing plain or TLS per its binding.
    pub fn render_site(
        &self,
        record: &SiteRecord,
        php_fpm_socket: &str,
        generated_at: String,
    ) -> Result<Rendered, RenderError> {
        let params = TemplateParams::for_site(record, php_fpm_socket, generated_at);
        self.render(TemplateKind::for_site(record), &params)
    }

    /// Module names for which a template file exists, sorted.
    pub fn available_modules(&self) -> Vec<String> {
        let dir = self.templates_dir.join("modules");
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };

        let mut modules: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_suffix(TEMPLATE_SUFFIX))
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
            })
            .collect();
        modules.sort();
        modules
    }
}

fn substitute(
    template: &str,
    params: &TemplateParams,
    origin: &str,
) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len() + 256);
    let mut chars = template.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, n) in chars.by_ref() {
                    match n {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => break,
                        _ => name.push(n),
                    }
                }
                if !closed {
                    return Err(RenderError::UnbalancedBrace {
                        offset,
                        origin: origin.to_string(),
                    });
                }
                let value = params
                    .lookup(name.trim())
                    .ok_or_else(|| RenderError::UnknownPlaceholder {
                        name: name.clone(),
                        origin: origin.to_string(),
                    })?;
                out.push_str(value);
            }
            '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(RenderError::UnbalancedBrace {
                    offset,
                    origin: origin.to_string(),
                });
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainName, TlsBinding};
    use time::OffsetDateTime;

    const SOCKET: &str = "unix:/run/php/php-fpm.sock";

    fn site(php: bool) -> SiteRecord {
        SiteRecord::new(
            DomainName::new("example.com").unwrap(),
            PathBuf::from("/var/www/example.com"),
            php,
            OffsetDateTime::UNIX_EPOCH,
        )
    }

    fn renderer() -> (tempfile::TempDir, ConfigRenderer) {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ConfigRenderer::new(dir.path().to_path_buf());
        (dir, renderer)
    }

    #[test]
    fn test_php_fragment_only_when_enabled() {
        let (_dir, renderer) = renderer();

        let plain = renderer
            .render_site(&site(false), SOCKET, "now".into())
            .unwrap();
        assert!(!plain.text.contains("fastcgi_pass"));

        let php = renderer
            .render_site(&site(true), SOCKET, "now".into())
            .unwrap();
        assert_eq!(php.text.matches("fastcgi_pass").count(), 1);
        assert!(php.text.contains(SOCKET));
    }

    #[test]
    fn test_builtin_fallback_substitutes_fields() {
        let (_dir, renderer) = renderer();

        let rendered = renderer
            .render_site(&site(false), SOCKET, "2024-01-01 00:00:00".into())
            .unwrap();

        assert_eq!(rendered.source, TemplateSource::Builtin);
        assert_eq!(rendered.kind, TemplateKind::SitePlain);
        assert!(rendered.text.contains("server_name example.com;"));
        assert!(rendered.text.contains("root /var/www/example.com;"));
        assert!(rendered.text.contains("2024-01-01 00:00:00"));
        assert!(rendered.text.contains("location / {"));
        assert!(!rendered.text.contains("{{"));
    }

    #[test]
    fn test_tls_template_requires_complete_binding() {
        let secured = site(false).with_tls(TlsBinding::new("/ssl/fullchain.pem", "/ssl/key.pem"));
        assert_eq!(TemplateKind::for_site(&secured), TemplateKind::SiteTls);

        let half = site(false).with_tls(TlsBinding::new("/ssl/fullchain.pem", ""));
        assert_eq!(TemplateKind::for_site(&half), TemplateKind::SitePlain);

        assert_eq!(TemplateKind::for_site(&site(false)), TemplateKind::SitePlain);

        let (_dir, renderer) = renderer();
        let rendered = renderer.render_site(&secured, SOCKET, "now".into()).unwrap();
        assert!(rendered.text.contains("ssl_certificate /ssl/fullchain.pem;"));
        assert!(rendered.text.contains("ssl_certificate_key /ssl/key.pem;"));
    }

    #[test]
    fn test_template_file_takes_precedence() {
        let (dir, renderer) = renderer();
        let path = dir.path().join("sites").join("site.conf.template");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "server {{ server_name {domain}; }}").unwrap();

        let rendered = renderer.render_site(&site(false), SOCKET, "now".into()).unwrap();
        assert_eq!(rendered.text, "server { server_name example.com; }");
        assert_eq!(rendered.source, TemplateSource::File(path));
    }

    #[test]
    fn test_unknown_placeholder_is_reported() {
        let (dir, renderer) = renderer();
        let path = dir.path().join("sites").join("site.conf.template");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "server_name {domain} {upstream};").unwrap();

        let err = renderer
            .render_site(&site(false), SOCKET, "now".into())
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::UnknownPlaceholder { ref name, .. } if name == "upstream"
        ));
    }

    #[test]
    fn test_unbalanced_braces_are_reported() {
        let params = TemplateParams::default();
        assert!(matches!(
            substitute("server { listen 80;", &params, "t"),
            Err(RenderError::UnbalancedBrace { offset: 7, .. })
        ));
        assert!(substitute("a }", &params, "t").is_err());
        assert_eq!(substitute("{{}}", &params, "t").unwrap(), "{}");
    }

    #[test]
    fn test_main_and_module_have_no_fallback() {
        let (dir, renderer) = renderer();

        assert!(matches!(
            renderer.render(TemplateKind::Main, &TemplateParams::default()),
            Err(RenderError::TemplateMissing { .. })
        ));

        let modules = dir.path().join("modules");
        fs::create_dir_all(&modules).unwrap();
        fs::write(modules.join("gzip.conf.template"), "gzip on; { raw }").unwrap();
        fs::write(modules.join("notes.txt"), "ignored").unwrap();

        // Module templates are not substituted
        let rendered = renderer
            .render(TemplateKind::Module("gzip".into()), &TemplateParams::default())
            .unwrap();
        assert_eq!(rendered.text, "gzip on; { raw }");
        assert_eq!(renderer.available_modules(), vec!["gzip".to_string()]);
    }
}
