//! Shared code for the catalog command-line tools.

pub mod import;
pub mod rename;

use anyhow::Context;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use rand_core::OsRng;
use std::io::{BufRead, Write};

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

/// Ask a yes/no question on stdin; only `y`/`Y` counts as yes.
pub fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{} (y/N): ", prompt);
    std::io::stdout().flush().context("Failed to flush stdout")?;
    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read answer")?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Hash a password into the argon2 PHC string the API verifies
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

/// Horizontal rule used by the reports
pub fn rule(c: char) -> String {
    std::iter::repeat(c).take(70).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_is_argon2() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert_ne!(hash, hash_password("s3cret").unwrap());
    }

    #[test]
    fn test_rule_width() {
        assert_eq!(rule('=').len(), 70);
    }
}
