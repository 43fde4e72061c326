//! The interactive menu. Every menu is a closed enum; every entry maps to
//! exactly one handler.

use anyhow::Result;

use crate::application::issue_certificate::IssueCertificate;

use super::prompt::{self, MenuChoice};
use super::service::ServiceAction;
use super::{App, config, report_error, service, site, ssl, status};

macro_rules! menu {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant,)+
            Back,
        }

        impl MenuChoice for $name {
            const ENTRIES: &'static [Self] = &[$(Self::$variant),+];
            const BACK: Self = Self::Back;

            fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                    Self::Back => "Back",
                }
            }
        }
    };
}

menu!(MainMenu {
    Service => "Service control",
    Sites => "Sites",
    Ssl => "SSL certificates",
    Config => "Configuration",
    Status => "System status",
});

menu!(ServiceMenu {
    Start => "Start nginx",
    Stop => "Stop nginx",
    Restart => "Restart nginx",
    Reload => "Reload nginx",
    Test => "Test configuration",
    Status => "Service status",
});

menu!(SiteMenu {
    Create => "Create site",
    List => "List sites",
    Enable => "Enable site",
    Disable => "Disable site",
    Delete => "Delete site",
});

menu!(SslMenu {
    Issue => "Issue certificate",
    Renew => "Renew certificate",
    List => "List certificates",
    Bind => "Bind existing certificate",
});

menu!(ConfigMenu {
    ShowMain => "Show main config",
    ApplyMain => "Apply main config template",
    BackupMain => "Back up main config",
    ListModules => "List modules",
    InstallModule => "Install or update module",
    ShowModule => "Show module",
    RemoveModule => "Remove module",
    Archive => "Archive project configs",
});

/// Run the menu until the operator exits. Errors from a single action are
/// reported and the loop carries on.
pub fn run(app: &App) -> Result<()> {
    ctrlc::set_handler(|| {
        println!("\nInterrupted.");
        std::process::exit(130);
    })?;

    app.check_installed();
    loop {
        match prompt::choose::<MainMenu>("sitekeep", "Exit")? {
            MainMenu::Service => submenu::<ServiceMenu>(app, "Service control", service_action)?,
            MainMenu::Sites => submenu::<SiteMenu>(app, "Sites", site_action)?,
            MainMenu::Ssl => submenu::<SslMenu>(app, "SSL certificates", ssl_action)?,
            MainMenu::Config => submenu::<ConfigMenu>(app, "Configuration", config_action)?,
            MainMenu::Status => guarded(status::execute(app)),
            MainMenu::Back => {
                println!("Bye.");
                return Ok(());
            }
        }
    }
}

fn submenu<M: MenuChoice + PartialEq>(
    app: &App,
    title: &str,
    handler: fn(&App, M) -> Result<()>,
) -> Result<()> {
    loop {
        let choice = prompt::choose::<M>(title, "Back")?;
        if choice == M::BACK {
            return Ok(());
        }
        guarded(handler(app, choice));
    }
}

fn guarded(result: Result<()>) {
    if let Err(e) = result {
        report_error(&e);
    }
}

fn service_action(app: &App, choice: ServiceMenu) -> Result<()> {
    let action = match choice {
        ServiceMenu::Start => ServiceAction::Start,
        ServiceMenu::Stop => ServiceAction::Stop,
        ServiceMenu::Restart => ServiceAction::Restart,
        ServiceMenu::Reload => ServiceAction::Reload,
        ServiceMenu::Test => ServiceAction::Test,
        ServiceMenu::Status => ServiceAction::Status,
        ServiceMenu::Back => return Ok(()),
    };
    service::execute(app, action)
}

fn site_action(app: &App, choice: SiteMenu) -> Result<()> {
    match choice {
        SiteMenu::Create => {
            let domain = prompt::ask_domain("Domain: ")?;
            let root = prompt::ask_optional(&format!(
                "Document root [{}]: ",
                app.paths.default_root(&domain).display()
            ))?;
            let php = prompt::confirm("Enable PHP?")?;
            site::create(app, domain, root.map(Into::into), php)
        }
        SiteMenu::List => site::list(app),
        SiteMenu::Enable => site::enable(app, &prompt::ask_domain("Domain to enable: ")?),
        SiteMenu::Disable => site::disable(app, &prompt::ask_domain("Domain to disable: ")?),
        SiteMenu::Delete => {
            let domain = prompt::ask_domain("Domain to delete: ")?;
            if !prompt::confirm(&format!("Delete {}?", domain))? {
                println!("Cancelled.");
                return Ok(());
            }
            let remove_root = prompt::confirm("Also remove its document root?")?;
            site::delete(app, &domain, remove_root, true)
        }
        SiteMenu::Back => Ok(()),
    }
}

fn ssl_action(app: &App, choice: SslMenu) -> Result<()> {
    match choice {
        SslMenu::Issue => {
            let domain = prompt::ask_domain("Domain: ")?;
            let email = if app.config.acme.email.is_none()
                && IssueCertificate::new(app.toolkit()).needs_install()?
            {
                prompt::ask_optional("acme.sh account email: ")?
            } else {
                None
            };
            ssl::issue(app, &domain, email.as_deref())
        }
        SslMenu::Renew => ssl::renew(app, &prompt::ask_domain("Domain to renew: ")?),
        SslMenu::List => ssl::list(app),
        SslMenu::Bind => {
            let domain = prompt::ask_domain("Domain: ")?;
            let cert = prompt::ask_optional("Certificate path [default location]: ")?;
            let key = prompt::ask_optional("Key path [default location]: ")?;
            ssl::bind(app, &domain, cert.map(Into::into), key.map(Into::into))
        }
        SslMenu::Back => Ok(()),
    }
}

fn config_action(app: &App, choice: ConfigMenu) -> Result<()> {
    match choice {
        ConfigMenu::ShowMain => config::main_show(app),
        ConfigMenu::ApplyMain => {
            if !prompt::confirm("Replace the live main config with the template?")? {
                println!("Cancelled.");
                return Ok(());
            }
            config::main_apply(app)
        }
        ConfigMenu::BackupMain => config::main_backup(app),
        ConfigMenu::ListModules => config::module_list(app),
        ConfigMenu::InstallModule => {
            config::module_install(app, &prompt::ask_required("Module: ")?)
        }
        ConfigMenu::ShowModule => config::module_show(app, &prompt::ask_required("Module: ")?),
        ConfigMenu::RemoveModule => config::module_remove(app, &prompt::ask_required("Module: ")?),
        ConfigMenu::Archive => config::archive(app),
        ConfigMenu::Back => Ok(()),
    }
}
