use colored::Colorize;

use crate::auth::{login_at, logout_at, session_path};
use crate::error::{KakeiboError, Result};
use crate::settings::load_settings;

pub fn login() -> Result<()> {
    let settings = load_settings();
    let configured = settings.configured_passphrase();
    if configured.is_none() {
        println!("No passphrase configured; nothing to unlock.");
        return Ok(());
    }

    let mut entered = rpassword::prompt_password("Passphrase: ")?;

    if login_at(&session_path(), configured.as_deref(), &mut entered)? {
        println!("{}", "Unlocked.".green());
        Ok(())
    } else {
        Err(KakeiboError::Other("Wrong passphrase.".to_string()))
    }
}

pub fn logout() -> Result<()> {
    if logout_at(&session_path())? {
        println!("Locked.");
    } else {
        println!("Already locked.");
    }
    Ok(())
}
