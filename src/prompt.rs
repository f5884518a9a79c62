//! Operator prompts.

use crate::error::ErrorKind;
use crate::plan::{validate_hostname, Password};
use anyhow::Context;
use dialoguer::{Input, Password as PasswordPrompt};
use log::warn;

pub trait Prompt {
    fn input(&mut self, prompt: &str) -> anyhow::Result<String>;
    fn password(&mut self, prompt: &str) -> anyhow::Result<Password>;
}

/// Prompts on the controlling terminal
pub struct Terminal;

impl Prompt for Terminal {
    fn input(&mut self, prompt: &str) -> anyhow::Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .context(ErrorKind::Interactive)
    }

    fn password(&mut self, prompt: &str) -> anyhow::Result<Password> {
        PasswordPrompt::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map(Password::new)
            .context(ErrorKind::Interactive)
    }
}

pub fn check_confirmation(first: &Password, second: &Password) -> Result<(), ErrorKind> {
    if first.is_empty() {
        Err(ErrorKind::EmptyPassword)
    } else if first != second {
        Err(ErrorKind::PasswordMismatch)
    } else {
        Ok(())
    }
}

/// Asks for a password twice until both entries match and are not empty
pub fn confirmed_password(prompt: &mut dyn Prompt, subject: &str) -> anyhow::Result<Password> {
    loop {
        let first = prompt.password(&format!("Enter {}", subject))?;
        let second = prompt.password(&format!("Confirm {}", subject))?;

        match check_confirmation(&first, &second) {
            Ok(()) => return Ok(first),
            Err(e) => warn!("{}, please try again", e),
        }
    }
}

pub fn hostname(prompt: &mut dyn Prompt) -> anyhow::Result<String> {
    loop {
        let hostname = prompt.input("Hostname")?;
        match validate_hostname(hostname.trim()) {
            Ok(()) => return Ok(hostname.trim().to_string()),
            Err(e) => warn!("{}", e),
        }
    }
}
