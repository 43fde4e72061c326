use anyhow::{Result, bail};
use clap::ValueEnum;

use super::App;
use crate::infrastructure::nginx::ReloadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Reload,
    Test,
    Status,
}

pub fn execute(app: &App, action: ServiceAction) -> Result<()> {
    let kit = app.toolkit();
    let nginx = kit.nginx();

    match action {
        ServiceAction::Start => {
            nginx.start()?;
            println!("nginx started");
        }
        ServiceAction::Stop => {
            nginx.stop()?;
            println!("nginx stopped");
        }
        ServiceAction::Restart => {
            nginx.restart()?;
            println!("nginx restarted");
        }
        ServiceAction::Reload => match nginx.reload() {
            Ok(()) => println!("nginx reloaded"),
            Err(ReloadError::Validation(check)) => {
                eprintln!("{}", check.detail);
                bail!("Configuration test failed; nginx was not reloaded");
            }
            Err(e) => return Err(e.into()),
        },
        ServiceAction::Test => {
            let check = nginx.test_config();
            println!("{}", check.detail);
            if !check.passed {
                bail!("Configuration test failed");
            }
            println!("Configuration test passed");
        }
        ServiceAction::Status => {
            print!("{}", nginx.status()?);
        }
    }
    Ok(())
}
