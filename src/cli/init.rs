use std::io::Write;
use std::path::PathBuf;

use crate::auth;
use crate::db::get_connection;
use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_file_exists, shellexpand_path};

pub fn run(data_dir: Option<String>, endpoint: Option<String>, payers: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    auth::ensure_unlocked(&settings)?;

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    } else if !settings_file_exists() {
        // First run: prompt for data dir
        print!("Data directory [{}]: ", settings.data_dir);
        std::io::stdout().flush()?;
        let mut input = String::new();
        std::io::stdin().read_line(&mut input).ok();
        let chosen = input.trim();
        if !chosen.is_empty() {
            settings.data_dir = shellexpand_path(chosen);
        }
    }
    if let Some(url) = endpoint {
        settings.set(&format!("endpoint_url={url}"))?;
    }
    if let Some(names) = payers {
        settings.set(&format!("payers={names}"))?;
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(resolved.join("exports"))?;
    get_connection(&settings.db_path())?;

    println!("Initialized kakeibo at {}", resolved.display());
    println!("Payers:   {} / {}", settings.payers[0], settings.payers[1]);
    println!(
        "Endpoint: {}",
        settings.endpoint().unwrap_or_else(|| "(not set, local only)".to_string())
    );
    Ok(())
}
