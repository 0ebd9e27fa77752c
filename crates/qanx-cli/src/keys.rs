//! Signing key sources for the offline cheque signer

use std::io::{BufRead, Write};
use std::path::Path;

use k256::ecdsa::SigningKey;
use qanx_core::crypto::{address_of, signing_key_from_hex};
use qanx_core::Address;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{CliError, Result};

/// Environment variable consulted when no key file is given
pub const KEY_ENV: &str = "QANX_SIGNING_KEY";

/// Resolve the signing key: key file, then `QANX_SIGNING_KEY`, then a
/// prompt on stdin.
pub fn load_signing_key(key_file: Option<&Path>) -> Result<SigningKey> {
    if let Some(path) = key_file {
        debug!("Reading signing key from {:?}", path);
        let content = Zeroizing::new(std::fs::read_to_string(path)?);
        return Ok(signing_key_from_hex(&content)?);
    }

    if let Ok(value) = std::env::var(KEY_ENV) {
        let value = Zeroizing::new(value);
        debug!("Using signing key from {}", KEY_ENV);
        return Ok(signing_key_from_hex(&value)?);
    }

    let stdin = std::io::stdin();
    prompt_signing_key(&mut stdin.lock(), &mut std::io::stderr())
}

/// Read a hex key from `input` after writing a prompt to `output`
pub fn prompt_signing_key<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<SigningKey> {
    write!(output, "Signing key: ")?;
    output.flush()?;

    let mut line = Zeroizing::new(String::new());
    input.read_line(&mut line)?;
    writeln!(output)?;

    if line.trim().is_empty() {
        return Err(CliError::MissingKey);
    }
    Ok(signing_key_from_hex(&line)?)
}

/// Write a key as hex, readable only by the owner on unix
pub fn write_key_file(path: &Path, key: &SigningKey) -> Result<()> {
    let hex_key = Zeroizing::new(format!("0x{}", hex::encode(key.to_bytes())));
    std::fs::write(path, hex_key.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

pub fn signer_address(key: &SigningKey) -> Address {
    address_of(key.verifying_key())
}
