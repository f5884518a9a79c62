use crate::error::ErrorKind;
use anyhow::{anyhow, Context};
use log::{debug, error};
use std::io::Write;
use std::process::{Command, Stdio};
use std::str;

pub trait CommandExt {
    fn run(&mut self, context: ErrorKind) -> anyhow::Result<()>;
    fn run_text_output(&mut self, context: ErrorKind) -> anyhow::Result<String>;
    /// Runs the command with `input` written to its standard input.
    ///
    /// Used for passphrases, which must never show up in the argument list.
    fn run_with_input(&mut self, input: &[u8], context: ErrorKind) -> anyhow::Result<()>;
}

impl CommandExt for Command {
    fn run(&mut self, context: ErrorKind) -> anyhow::Result<()> {
        debug!("Running {:?}", self);
        let exit_status = self
            .spawn()
            .with_context(|| context.clone())?
            .wait()
            .with_context(|| context.clone())?;

        if !exit_status.success() {
            return Err(anyhow!("{}", exit_status)).context(context);
        }

        Ok(())
    }

    fn run_text_output(&mut self, context: ErrorKind) -> anyhow::Result<String> {
        debug!("Running {:?}", self);
        let output = self.output().with_context(|| context.clone())?;

        if !output.status.success() {
            let error = str::from_utf8(&output.stderr).unwrap_or("[INVALID UTF8]");
            error!("{}", error);
            return Err(anyhow!("{}", output.status)).context(context);
        }

        Ok(String::from(
            str::from_utf8(&output.stdout)
                .map_err(|_| anyhow!("Process output isn't valid UTF-8"))
                .context(context)?,
        ))
    }

    fn run_with_input(&mut self, input: &[u8], context: ErrorKind) -> anyhow::Result<()> {
        debug!("Running {:?} with standard input", self);
        let mut child = self
            .stdin(Stdio::piped())
            .spawn()
            .with_context(|| context.clone())?;

        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(input).map_err(anyhow::Error::from),
            None => Err(anyhow!("Standard input is not piped")),
        };

        // The child is reaped even when it stopped reading early
        let exit_status = child.wait().with_context(|| context.clone())?;
        written.with_context(|| context.clone())?;
        if !exit_status.success() {
            return Err(anyhow!("{}", exit_status)).context(context);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_command_carries_context() {
        let error = Command::new("false")
            .run(ErrorKind::Pacstrap)
            .unwrap_err();
        assert_eq!(error.downcast_ref::<ErrorKind>(), Some(&ErrorKind::Pacstrap));
    }

    #[test]
    fn text_output_is_captured() {
        let output = Command::new("echo")
            .arg("hello")
            .run_text_output(ErrorKind::DeviceQuery)
            .unwrap();
        assert_eq!(output, "hello\n");
    }

    #[test]
    fn input_is_piped() {
        Command::new("grep")
            .args(&["-q", "secret"])
            .run_with_input(b"a secret\n", ErrorKind::LuksSetup)
            .unwrap();
    }

    #[test]
    fn unread_input_fails_without_hanging() {
        let input = vec![0u8; 4 * 1024 * 1024];
        let error = Command::new("true")
            .run_with_input(&input, ErrorKind::KeyFile)
            .unwrap_err();
        assert_eq!(error.downcast_ref::<ErrorKind>(), Some(&ErrorKind::KeyFile));
    }
}
