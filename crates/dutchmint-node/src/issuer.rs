//! dutchmint-issuer
//!
//! Off-chain admission proof issuer. Holds the sale authority's secp256k1 key
//! and signs `H(prefix, claimant[, nonce])` for allow-listed claimants.
//!
//! Usage:
//!   dutchmint-issuer keygen  [--keyfile <path>]
//!   dutchmint-issuer address [--keyfile <path>]
//!   dutchmint-issuer sign    --claimant <0x..> --prefix <str> [--nonce <n>] [--keyfile <path>]
//!
//! `sign` prints a JSON proof object accepted by `dutchmint_mintAllowList`.
//! `--prefix` must be the live `prefix` (or `discounted_prefix`) reported by
//! `dutchmint_getSaleInfo`; the owner can change it at any time.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::info;
use zeroize::Zeroizing;

use dutchmint_core::types::Address;
use dutchmint_crypto::{AdmissionMessage, Signer};

// ── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "dutchmint-issuer",
    version,
    about = "Dutchmint issuer — sign allow-list admission proofs"
)]
struct Args {
    /// Path to the authority keyfile (JSON).
    #[arg(long, global = true, default_value = "~/.dutchmint/authority.json")]
    keyfile: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new authority key and save it to the keyfile.
    Keygen,

    /// Print the authority address.
    Address,

    /// Sign an admission proof for one claimant.
    Sign {
        /// Claimant address (0x-prefixed hex).
        #[arg(long)]
        claimant: String,

        /// Proof prefix, as reported by `dutchmint_getSaleInfo`. Use the
        /// discounted prefix for discounted proofs.
        #[arg(long)]
        prefix: String,

        /// Make the proof single-use.
        #[arg(long)]
        nonce: Option<u64>,
    },
}

#[derive(Serialize, Deserialize)]
struct Keyfile {
    address: String,
    secret_key: String,
}

#[derive(Serialize)]
struct ProofOut {
    hash: String,
    signature: String,
    nonce: Option<u64>,
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn,dutchmint_issuer=info")
        .init();

    let args = Args::parse();
    let keyfile = expand_tilde(&args.keyfile);

    match args.command {
        Command::Keygen => cmd_keygen(&keyfile),

        Command::Address => {
            let signer = load_signer(&keyfile)?;
            println!("{}", signer.address());
            Ok(())
        }

        Command::Sign { claimant, prefix, nonce } => {
            let signer = load_signer(&keyfile)?;
            let claimant = Address::from_hex(&claimant)
                .map_err(|e| anyhow::anyhow!("invalid claimant: {e}"))?;
            let message = AdmissionMessage::new(prefix, claimant, nonce);
            let (hash, signature) = signer.issue(&message).context("signing proof")?;
            info!(claimant = %claimant, nonce = ?nonce, "issued admission proof");
            let out = ProofOut {
                hash: hash.to_hex(),
                signature: signature.to_hex(),
                nonce,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
    }
}

fn cmd_keygen(keyfile: &Path) -> anyhow::Result<()> {
    if keyfile.exists() {
        bail!(
            "Keyfile {} already exists. Delete it first to generate a new key.",
            keyfile.display()
        );
    }
    if let Some(parent) = keyfile.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let signer = Signer::generate();
    let secret = signer.secret_hex();
    let json = Zeroizing::new(serde_json::to_string_pretty(&Keyfile {
        address: signer.address().to_hex(),
        secret_key: secret.to_string(),
    })?);
    std::fs::write(keyfile, json.as_bytes())
        .with_context(|| format!("writing keyfile to {}", keyfile.display()))?;

    println!("Generated new authority key.");
    println!("Address: {}", signer.address());
    println!("Keyfile: {}", keyfile.display());
    println!("\nSet this address as `authority` in the sale params.");
    Ok(())
}

fn load_signer(keyfile: &Path) -> anyhow::Result<Signer> {
    let json = Zeroizing::new(
        std::fs::read_to_string(keyfile)
            .with_context(|| format!("reading keyfile {}", keyfile.display()))?,
    );
    let kf: Keyfile = serde_json::from_str(&json).context("parsing keyfile")?;
    let secret = Zeroizing::new(kf.secret_key);
    let signer = Signer::from_secret_hex(&secret).context("loading authority key")?;
    if signer.address().to_hex() != kf.address.to_lowercase() {
        bail!("keyfile address does not match its secret key");
    }
    Ok(signer)
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLAIMANT: &str = "0x4448d4fd3f76f11ba4605f3c6ca91c14477ed363";

    #[test]
    fn sign_requires_explicit_prefix() {
        let err = Args::try_parse_from(["dutchmint-issuer", "sign", "--claimant", CLAIMANT]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let args = Args::try_parse_from([
            "dutchmint-issuer",
            "sign",
            "--claimant",
            CLAIMANT,
            "--prefix",
            "Season Two:",
            "--nonce",
            "4",
        ])
        .unwrap();
        match args.command {
            Command::Sign { prefix, nonce, .. } => {
                assert_eq!(prefix, "Season Two:");
                assert_eq!(nonce, Some(4));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
