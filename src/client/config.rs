//! Upstream connection settings.

use std::path::PathBuf;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;

use crate::error::ConnectError;
use crate::line::MAX_LINE_LEN;

/// Default idle-read timeout.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Settings for one upstream connection.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Label used in logs; the owning bouncer's name.
    pub name: String,
    pub host: String,
    pub port: u16,
    pub nick: String,
    pub user: String,
    pub real: String,
    /// Sent as `PASS` before registration.
    pub password: Option<String>,
    /// Wire character set label; `None` means UTF-8.
    pub encoding: Option<String>,
    /// Connect over TLS with these options.
    pub tls: Option<TlsOptions>,
    /// Tear the connection down after this long without inbound data.
    pub idle_timeout: Duration,
    /// Inbound lines longer than this are dropped with a warning.
    pub max_line_len: usize,
}

impl ClientConfig {
    /// Plain-text settings; user and real name default to the nick.
    pub fn new(name: &str, host: &str, port: u16, nick: &str) -> Self {
        ClientConfig {
            name: name.to_owned(),
            host: host.to_owned(),
            port,
            nick: nick.to_owned(),
            user: nick.to_owned(),
            real: nick.to_owned(),
            password: None,
            encoding: None,
            tls: None,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_line_len: MAX_LINE_LEN,
        }
    }
}

/// TLS material and trust policy for the upstream connection.
///
/// Each PEM item can be given inline or as a `_file` path.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TlsOptions {
    /// Trust anchors replacing the platform store.
    pub ca: Option<String>,
    pub ca_file: Option<PathBuf>,
    /// Client certificate chain.
    pub cert: Option<String>,
    pub cert_file: Option<PathBuf>,
    /// Client private key.
    pub key: Option<String>,
    pub key_file: Option<PathBuf>,
    /// PKCS#12 bundle, base64 when given inline.
    pub pfx: Option<String>,
    pub pfx_file: Option<PathBuf>,
    /// Password protecting the PKCS#12 bundle.
    pub passphrase: Option<String>,
    /// Accept a depth-zero self-signed server certificate.
    #[serde(rename = "selfSigned", alias = "self_signed")]
    pub self_signed: bool,
    /// Accept any server certificate.
    #[serde(rename = "acceptInvalidCert", alias = "accept_invalid_cert")]
    pub accept_invalid_cert: bool,
    /// DER bytes of the bundle once `pfx_file` has been read.
    #[serde(skip)]
    pub(crate) pfx_der: Option<Vec<u8>>,
}

impl TlsOptions {
    /// Replace every `_file` item with the file's content.
    pub fn resolve_files(&mut self) -> Result<(), ConnectError> {
        fn load(
            content: &mut Option<String>,
            file: &mut Option<PathBuf>,
        ) -> Result<(), ConnectError> {
            if let Some(path) = file.take() {
                *content = Some(std::fs::read_to_string(&path)?);
            }
            Ok(())
        }

        load(&mut self.ca, &mut self.ca_file)?;
        load(&mut self.cert, &mut self.cert_file)?;
        load(&mut self.key, &mut self.key_file)?;

        // PKCS#12 is binary; never read it as text.
        if let Some(path) = self.pfx_file.take() {
            self.pfx_der = Some(std::fs::read(&path)?);
        }
        Ok(())
    }

    /// The PKCS#12 bundle as DER, decoding the inline base64 form.
    pub fn pfx_bytes(&self) -> Result<Option<Vec<u8>>, ConnectError> {
        if let Some(der) = &self.pfx_der {
            return Ok(Some(der.clone()));
        }
        if let Some(path) = &self.pfx_file {
            return Ok(Some(std::fs::read(path)?));
        }
        match &self.pfx {
            Some(text) => {
                let compact: String = text.split_whitespace().collect();
                BASE64
                    .decode(compact.as_bytes())
                    .map(Some)
                    .map_err(|e| ConnectError::Material(format!("invalid base64 pfx: {}", e)))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_follow_nick() {
        let config = ClientConfig::new("net", "irc.example", 6667, "alice");
        assert_eq!(config.user, "alice");
        assert_eq!(config.real, "alice");
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.max_line_len, 8191);
    }

    #[test]
    fn test_resolve_files_reads_and_clears() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "-----BEGIN CERTIFICATE-----").unwrap();

        let mut tls = TlsOptions {
            ca_file: Some(file.path().to_path_buf()),
            ..TlsOptions::default()
        };
        tls.resolve_files().unwrap();

        assert_eq!(tls.ca.as_deref(), Some("-----BEGIN CERTIFICATE-----"));
        assert!(tls.ca_file.is_none());
    }

    #[test]
    fn test_resolve_missing_file_fails() {
        let mut tls = TlsOptions {
            key_file: Some("/nonexistent/key.pem".into()),
            ..TlsOptions::default()
        };
        assert!(matches!(tls.resolve_files(), Err(ConnectError::Io(_))));
    }

    #[test]
    fn test_pfx_file_is_read_as_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x30, 0x82, 0xff, 0x00, 0xfe]).unwrap();

        let mut tls = TlsOptions {
            pfx_file: Some(file.path().to_path_buf()),
            ..TlsOptions::default()
        };
        tls.resolve_files().unwrap();

        assert!(tls.pfx_file.is_none());
        assert_eq!(
            tls.pfx_bytes().unwrap(),
            Some(vec![0x30, 0x82, 0xff, 0x00, 0xfe])
        );
    }

    #[test]
    fn test_inline_pfx_is_base64() {
        let tls = TlsOptions {
            pfx: Some("MIL/\nAP4=".into()),
            ..TlsOptions::default()
        };
        assert_eq!(
            tls.pfx_bytes().unwrap(),
            Some(vec![0x30, 0x82, 0xff, 0x00, 0xfe])
        );

        let bad = TlsOptions {
            pfx: Some("not base64!".into()),
            ..TlsOptions::default()
        };
        assert!(matches!(bad.pfx_bytes(), Err(ConnectError::Material(_))));
    }

    #[test]
    fn test_deserialize_policy_flags() {
        let tls: TlsOptions = toml::from_str("selfSigned = true\nca_file = \"ca.pem\"").unwrap();
        assert!(tls.self_signed);
        assert!(!tls.accept_invalid_cert);
        assert_eq!(tls.ca_file, Some(PathBuf::from("ca.pem")));
    }
}
