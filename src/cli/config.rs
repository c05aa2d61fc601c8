use crate::config::generate::generate_starter_config;
use crate::config::user_config_path;
use std::fs;
use std::path::{Path, PathBuf};

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_content = generate_starter_config();

    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    let config_path = user_config_path()
        .unwrap_or_else(|| PathBuf::from("/etc/restart-workflow/config.yml"));
    write_config(&config_content, &config_path)?;

    println!("Config file written to {}", config_path.display());
    Ok(())
}

/// Writes `config_content` to `config_path`, refusing to overwrite an existing file.
pub fn write_config(config_content: &str, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if config_path.exists() {
        return Err(format!(
            "Config file already exists at {}. Remove it first or use --stdout to print the config",
            config_path.display()
        )
        .into());
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(config_path, config_content)?;
    Ok(())
}
