use anyhow::{bail, Result};
use dialoguer::{Confirm, Input};
use vigil_core::{save_telegram_credentials, secrets_path};

#[derive(Debug)]
struct TelegramSetup {
    token: String,
    chat_id: String,
}

pub fn execute(force: bool) -> Result<()> {
    let path = secrets_path();

    if path.exists() && !force {
        bail!(
            "Credentials already exist: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    if force && path.exists() {
        println!("⚠️  Overwriting the existing credentials.\n");
    }

    println!("Welcome to Vigil! Let's connect the Telegram bot that receives your reports.\n");

    let setup = prompt_setup()?;

    let confirmed = Confirm::new()
        .with_prompt(format!("Save credentials for chat {} ?", setup.chat_id))
        .default(true)
        .interact()?;
    if !confirmed {
        println!("Nothing saved.");
        return Ok(());
    }

    let written = save_telegram_credentials(&setup.token, &setup.chat_id)?;

    println!("\n✅ Credentials saved: {}", written.display());
    println!("Run `vigil start` to begin tracking.");

    Ok(())
}

fn prompt_setup() -> Result<TelegramSetup> {
    let token: String = Input::new()
        .with_prompt("Telegram bot token")
        .validate_with(|input: &String| validate_token(input))
        .interact_text()?;

    let chat_id: String = Input::new()
        .with_prompt("Telegram chat id")
        .validate_with(|input: &String| validate_chat_id(input))
        .interact_text()?;

    Ok(TelegramSetup { token, chat_id })
}

fn validate_token(input: &str) -> Result<(), &'static str> {
    match input.trim().split_once(':') {
        Some((bot_id, secret))
            if !bot_id.is_empty()
                && bot_id.chars().all(|c| c.is_ascii_digit())
                && !secret.is_empty() =>
        {
            Ok(())
        }
        _ => Err("A bot token looks like 123456:ABC-DEF..."),
    }
}

/// Numeric ids (negative for groups) or a `@channel` username.
fn validate_chat_id(input: &str) -> Result<(), &'static str> {
    let trimmed = input.trim();
    if trimmed.parse::<i64>().is_ok() || (trimmed.len() > 1 && trimmed.starts_with('@')) {
        Ok(())
    } else {
        Err("The chat id must be a number or an @username")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_requires_bot_id_and_secret() {
        assert!(validate_token("123456:ABC-DEF1234").is_ok());
        assert!(validate_token(" 42:x ").is_ok());
        assert!(validate_token("ABC-DEF").is_err());
        assert!(validate_token("abc:def").is_err());
        assert!(validate_token("123:").is_err());
    }

    #[test]
    fn chat_id_accepts_numbers_and_usernames() {
        assert!(validate_chat_id("987654321").is_ok());
        assert!(validate_chat_id("-100123456").is_ok());
        assert!(validate_chat_id("@my_channel").is_ok());
        assert!(validate_chat_id("@").is_err());
        assert!(validate_chat_id("my chat").is_err());
    }
}
