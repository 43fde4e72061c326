use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use sitekeep::cli::service::ServiceAction;
use sitekeep::cli::{self, App};
use sitekeep::domain::DomainName;
use sitekeep::infrastructure::tracing::{TracingOutput, init_tracing};

#[derive(Parser)]
#[command(name = "sitekeep")]
#[command(about = "Manage nginx sites with validated, rollback-safe config changes")]
#[command(version)]
struct Cli {
    /// Project directory [default: $SITEKEEP_HOME or ~/.sitekeep]
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Config file [default: <home>/sitekeep.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr instead of the log file
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Do not print progress lines for external commands
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Runs the interactive menu when omitted
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive menu
    Menu,

    /// Control the nginx service
    Service {
        #[arg(value_enum)]
        action: ServiceAction,
    },

    /// Manage sites
    Site {
        #[command(subcommand)]
        command: SiteCommands,
    },

    /// Manage SSL certificates
    Ssl {
        #[command(subcommand)]
        command: SslCommands,
    },

    /// Main config, modules and project archives
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Show service and site overview
    Status,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum SiteCommands {
    /// Create a site (not enabled until `site enable`)
    Create {
        domain: DomainName,

        /// Document root [default: <web_root_base>/<domain>]
        #[arg(long)]
        root: Option<PathBuf>,

        /// Add the PHP-FPM handler
        #[arg(long)]
        php: bool,
    },

    /// List sites with their live status
    List,

    /// Enable a site and reload nginx
    Enable { domain: DomainName },

    /// Disable a site and reload nginx
    Disable { domain: DomainName },

    /// Delete a site and its generated files
    Delete {
        domain: DomainName,

        /// Also remove the document root
        #[arg(long)]
        remove_root: bool,

        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum SslCommands {
    /// Issue a certificate with acme.sh and bind it
    Issue {
        domain: DomainName,

        /// Account email, needed when acme.sh is not installed yet
        #[arg(long)]
        email: Option<String>,
    },

    /// Renew a certificate
    Renew { domain: DomainName },

    /// List installed certificates and their expiry
    List,

    /// Bind existing certificate files to a site
    Bind {
        domain: DomainName,

        /// [default: <ssl_dir>/<domain>/fullchain.pem]
        #[arg(long)]
        cert: Option<PathBuf>,

        /// [default: <ssl_dir>/<domain>/key.pem]
        #[arg(long)]
        key: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// The nginx main config
    Main {
        #[command(subcommand)]
        command: MainCommands,
    },

    /// Drop-in module configs
    Module {
        #[command(subcommand)]
        command: ModuleCommands,
    },

    /// Copy the registry and project configs into a timestamped backup
    Archive,

    /// Write the default config file
    Init,
}

#[derive(Subcommand)]
enum MainCommands {
    Show,
    Apply,
    Backup,
}

#[derive(Subcommand)]
enum ModuleCommands {
    List,
    Install { name: String },
    Show { name: String },
    Remove { name: String },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        cli::report_error(&e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Menu);

    if let Commands::Completions { shell } = command {
        clap_complete::generate(shell, &mut Cli::command(), "sitekeep", &mut io::stdout());
        return Ok(());
    }

    let mut app = App::load(cli.home, cli.config)?;
    app.set_progress(!cli.quiet);
    init_tracing(
        cli.verbose,
        if cli.verbose {
            TracingOutput::Stderr
        } else {
            TracingOutput::File(app.paths.log_file.clone())
        },
    );
    app.ensure_layout()?;

    match command {
        Commands::Menu => cli::menu::run(&app),
        Commands::Service { action } => cli::service::execute(&app, action),
        Commands::Site { command } => match command {
            SiteCommands::Create { domain, root, php } => {
                cli::site::create(&app, domain, root, php)
            }
            SiteCommands::List => cli::site::list(&app),
            SiteCommands::Enable { domain } => cli::site::enable(&app, &domain),
            SiteCommands::Disable { domain } => cli::site::disable(&app, &domain),
            SiteCommands::Delete {
                domain,
                remove_root,
                force,
            } => cli::site::delete(&app, &domain, remove_root, force),
        },
        Commands::Ssl { command } => match command {
            SslCommands::Issue { domain, email } => {
                cli::ssl::issue(&app, &domain, email.as_deref())
            }
            SslCommands::Renew { domain } => cli::ssl::renew(&app, &domain),
            SslCommands::List => cli::ssl::list(&app),
            SslCommands::Bind { domain, cert, key } => cli::ssl::bind(&app, &domain, cert, key),
        },
        Commands::Config { command } => match command {
            ConfigCommands::Main { command } => match command {
                MainCommands::Show => cli::config::main_show(&app),
                MainCommands::Apply => cli::config::main_apply(&app),
                MainCommands::Backup => cli::config::main_backup(&app),
            },
            ConfigCommands::Module { command } => match command {
                ModuleCommands::List => cli::config::module_list(&app),
                ModuleCommands::Install { name } => cli::config::module_install(&app, &name),
                ModuleCommands::Show { name } => cli::config::module_show(&app, &name),
                ModuleCommands::Remove { name } => cli::config::module_remove(&app, &name),
            },
            ConfigCommands::Archive => cli::config::archive(&app),
            ConfigCommands::Init => cli::config::init(&app),
        },
        Commands::Status => cli::status::execute(&app),
        Commands::Completions { .. } => Ok(()),
    }
}
