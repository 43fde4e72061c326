use anyhow::Result;

use crate::application::status::ShowStatus;

use super::App;

pub fn execute(app: &App) -> Result<()> {
    let status = ShowStatus::new(app.toolkit()).execute();

    println!("sitekeep status\n");
    if status.nginx_installed {
        println!("  nginx:          {}", status.nginx_state);
    } else {
        println!("  nginx:          not installed");
    }
    println!("  Sites:          {}", status.sites_total);
    println!("  Enabled:        {}", status.sites_enabled);
    println!("  With SSL:       {}", status.sites_ssl);
    println!(
        "  Mirrored:       {} site, {} main, {} module config(s)",
        status.mirrored_sites, status.mirrored_main, status.mirrored_modules
    );

    println!("\nDirectories:");
    for (label, path) in &status.directories {
        println!("  {:<16}{}", format!("{}:", label), path.display());
    }
    Ok(())
}
