//! # QR Subcommand
//!
//! Derives the public verification URL for an already formatted field
//! string. The secret comes from `EDOC_QR_SECRET`; it is never printed.
//!
//! ```bash
//! EDOC_QR_SECRET=... edoc qr --fields 'nVersion=150&Id=0180...'
//! ```

use anyhow::{Context, Result};
use clap::Args;
use edoc_envelope::{generate, OrderedFields, VerificationArtifact, VerificationConfig};
use url::Url;

/// Arguments for `edoc qr`.
#[derive(Args, Debug)]
pub struct QrArgs {
    /// Ordered field string, used verbatim.
    #[arg(long)]
    pub fields: String,

    /// Verification base URL. Defaults to `EDOC_QR_BASE_URL`.
    #[arg(long)]
    pub base_url: Option<Url>,

    /// Print only the hash.
    #[arg(long)]
    pub hash_only: bool,
}

/// Execute `edoc qr`.
pub fn run_qr(args: &QrArgs) -> Result<u8> {
    let config = VerificationConfig::from_env().context("loading verification settings")?;
    let artifact = derive(args, &config)?;
    if args.hash_only {
        println!("{}", artifact.hash());
    } else {
        println!("{artifact}");
    }
    Ok(0)
}

/// Derive the artifact for `args` under `config`.
pub fn derive(args: &QrArgs, config: &VerificationConfig) -> Result<VerificationArtifact> {
    let base = args.base_url.as_ref().unwrap_or(&config.base_url);
    let fields = OrderedFields::preformatted(args.fields.clone());
    generate(&fields, &config.secret, base).context("deriving verification code")
}

#[cfg(test)]
mod tests {
    use super::*;
    use edoc_envelope::Secret;

    fn config() -> VerificationConfig {
        VerificationConfig::new(Url::parse("https://example/qr").unwrap(), Secret::new("S"))
    }

    #[test]
    fn known_field_string_and_secret() {
        let args = QrArgs {
            fields: "F1".into(),
            base_url: None,
            hash_only: false,
        };
        let artifact = derive(&args, &config()).unwrap();
        assert_eq!(
            artifact.hash(),
            "39F38F68DFD2CD2F9BE5E8D6EE234E73FC2B2CDF8F83CC1C23200BCA3CE5F106"
        );
        assert_eq!(
            artifact.url(),
            "https://example/qr?F1&cHashQR=39F38F68DFD2CD2F9BE5E8D6EE234E73FC2B2CDF8F83CC1C23200BCA3CE5F106"
        );
    }

    #[test]
    fn base_url_flag_overrides_configuration() {
        let args = QrArgs {
            fields: "F1".into(),
            base_url: Some(Url::parse("https://other/check").unwrap()),
            hash_only: true,
        };
        let artifact = derive(&args, &config()).unwrap();
        assert!(artifact.url().starts_with("https://other/check?F1&"));
    }

    #[test]
    fn empty_fields_are_rejected() {
        let args = QrArgs {
            fields: String::new(),
            base_url: None,
            hash_only: false,
        };
        assert!(derive(&args, &config()).is_err());
    }
}
