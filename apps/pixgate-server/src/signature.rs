//! `signature` subcommand: sign a request offline.
//!
//! Lets client developers check that their signing code produces the same
//! signature the gate expects.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use pixgate_auth::{SecretKey, append_signature, sign_raw};

/// Arguments of the `signature` subcommand.
#[derive(Debug, Args)]
pub struct SignatureArgs {
    /// The signing key.
    #[arg(long)]
    pub key: Option<String>,

    /// HTTP method.
    #[arg(long, default_value = "GET")]
    pub method: String,

    /// Request path without query string and host.
    #[arg(long, default_value = "/")]
    pub url: String,

    /// File whose contents are sent as the request body.
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Query string to sign.
    #[arg(default_value = "")]
    pub query_string: String,
}

/// Compute the signature and write the report to `out`.
pub fn run(args: &SignatureArgs, out: &mut impl Write) -> Result<()> {
    let Some(key) = SecretKey::from_config(args.key.as_deref()) else {
        bail!("You must provide a key");
    };

    let body = match &args.path {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?
        }
        None => Vec::new(),
    };

    let sig = sign_raw(&key, &args.method, &args.url, &body, &args.query_string)
        .context("cannot sign query string")?;
    let signed = append_signature(&args.query_string, &sig);

    writeln!(out, "Query String: {}", args.query_string)?;
    writeln!(out, "Signature: {sig}")?;
    writeln!(out, "Signed Query String: {signed}")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use pixgate_auth::canonical::Params;
    use pixgate_auth::{RequestTarget, hash_body, verify_request};

    use super::*;

    fn args(key: Option<&str>) -> SignatureArgs {
        SignatureArgs {
            key: key.map(str::to_owned),
            method: "GET".to_owned(),
            url: "/display".to_owned(),
            path: None,
            query_string: "w=100&h=100".to_owned(),
        }
    }

    fn run_to_string(args: &SignatureArgs) -> Result<String> {
        let mut out = Vec::new();
        run(args, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_should_print_signature_report() {
        let output = run_to_string(&args(Some("secret"))).unwrap();
        let sig =
            sign_raw(&SecretKey::new("secret"), "GET", "/display", b"", "w=100&h=100").unwrap();

        let expected = format!(
            "Query String: w=100&h=100\n\
             Signature: {sig}\n\
             Signed Query String: w=100&h=100&sig={sig}\n"
        );
        assert_eq!(output, expected);
    }

    #[test]
    fn test_should_produce_signature_the_gate_accepts() {
        let key = SecretKey::new("secret");
        let output = run_to_string(&args(Some("secret"))).unwrap();
        let signed = output
            .lines()
            .find_map(|l| l.strip_prefix("Signed Query String: "))
            .unwrap();

        let target = RequestTarget::new("GET", "/display", hash_body(&key, b""));
        assert!(verify_request(&key, &target, &Params::from_query(signed).unwrap()).is_ok());
    }

    #[test]
    fn test_should_require_key() {
        assert!(run_to_string(&args(None)).is_err());
        assert!(run_to_string(&args(Some(""))).is_err());
    }

    #[test]
    fn test_should_hash_file_as_body() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"png-bytes").unwrap();

        let mut with_file = args(Some("secret"));
        with_file.method = "POST".to_owned();
        with_file.url = "/upload".to_owned();
        with_file.path = Some(file.path().to_path_buf());
        with_file.query_string = String::new();

        let output = run_to_string(&with_file).unwrap();
        let sig =
            sign_raw(&SecretKey::new("secret"), "POST", "/upload", b"png-bytes", "").unwrap();
        assert!(output.contains(&format!("Signed Query String: sig={sig}")));
    }

    #[test]
    fn test_should_fail_on_non_utf8_query_string() {
        let mut malformed = args(Some("secret"));
        malformed.query_string = "url=caf%E9".to_owned();
        let err = run_to_string(&malformed).unwrap_err();
        assert!(format!("{err:#}").contains("caf%E9"));
    }

    #[test]
    fn test_should_fail_on_unreadable_file() {
        let mut missing = args(Some("secret"));
        missing.path = Some(PathBuf::from("/nonexistent/image.png"));
        assert!(run_to_string(&missing).is_err());
    }
}
