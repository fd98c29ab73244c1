use anyhow::{Context, Result, bail};
use zeroize::Zeroizing;

/// Resolve the stream password.
///
/// stdin and stdout carry the data, so the password comes either from
/// `--key` / `BOXPIPE_KEY` or from a prompt on the controlling terminal.
pub fn resolve_password(key: Option<String>, confirm: bool) -> Result<Zeroizing<String>> {
    //  BOXPIPE_KEY="supersecret" boxpipe < plain > sealed
    if let Some(pw) = key {
        let pw = Zeroizing::new(pw);
        if pw.is_empty() {
            bail!("password cannot be empty");
        }
        return Ok(pw);
    }

    //  Interactive (TTY), even when stdin is redirected
    let pw = Zeroizing::new(
        rpassword::prompt_password("Password: ")
            .context("no password provided (use --key or BOXPIPE_KEY)")?,
    );
    if pw.is_empty() {
        bail!("password cannot be empty");
    }

    if confirm {
        let again = Zeroizing::new(
            rpassword::prompt_password("Confirm password: ")
                .context("failed to read password confirmation")?,
        );
        if pw != again {
            bail!("passwords do not match");
        }
    }

    Ok(pw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_wins() {
        let pw = resolve_password(Some("supersecret".to_string()), true).unwrap();
        assert_eq!(pw.as_str(), "supersecret");
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(resolve_password(Some(String::new()), false).is_err());
    }
}
