use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};

use crate::state::ensure_tally_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthState {
    pub token: Option<String>,
    pub user_id: Option<String>,
}

/// Bearer token plus the user it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub user_id: String,
}

impl AuthState {
    pub fn credentials(&self) -> Result<Credentials> {
        match (&self.token, &self.user_id) {
            (Some(token), Some(user_id)) => Ok(Credentials {
                token: token.clone(),
                user_id: user_id.clone(),
            }),
            _ => bail!("not signed in; run: tally auth paste-token"),
        }
    }
}

fn auth_path() -> Result<std::path::PathBuf> {
    Ok(ensure_tally_home()?.join("auth.json"))
}

pub fn load_auth() -> Result<AuthState> {
    let p = auth_path()?;
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_auth(auth: &AuthState) -> Result<()> {
    let p = auth_path()?;
    let s = serde_json::to_string_pretty(auth)?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

pub fn paste_token() -> Result<()> {
    let token = prompt("Paste access token")?;
    if token.is_empty() || token.contains(char::is_whitespace) {
        bail!("token must be a single non-empty word");
    }
    let user_id = prompt("User id")?;
    if user_id.is_empty() {
        bail!("user id must not be empty");
    }
    save_auth(&AuthState {
        token: Some(token),
        user_id: Some(user_id),
    })?;
    println!("Saved credentials to {}", auth_path()?.display());
    Ok(())
}
