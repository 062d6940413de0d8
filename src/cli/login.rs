use crate::core::auth::Credentials;
use anyhow::{Result, bail};
use console::Term;

/// Takes credentials from the command line, prompting on the terminal for any that are missing.
pub fn resolve_credentials(username: Option<String>, password: Option<String>) -> Result<Credentials> {
    let term = Term::stderr();

    let username = match username {
        Some(username) => username,
        None => {
            term.write_str("Username: ")?;
            term.read_line()?
        }
    };
    let password = match password {
        Some(password) => password,
        None => {
            term.write_str("Password: ")?;
            term.read_secure_line()?
        }
    };

    let username = username.trim().to_string();
    if username.is_empty() || password.is_empty() {
        bail!("Please enter both username and password");
    }

    Ok(Credentials { username, password })
}
