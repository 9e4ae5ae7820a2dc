//! TLS connector and server-certificate trust policy.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use p12_keystore::KeyStore;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_rustls::TlsConnector;
use tracing::warn;

use super::config::TlsOptions;
use crate::error::ConnectError;

/// Certificate verification with the optional relaxations of
/// [`TlsOptions`]. Handshake signatures are always checked.
#[derive(Debug)]
struct PolicyVerifier {
    webpki: Option<Arc<WebPkiServerVerifier>>,
    provider: Arc<CryptoProvider>,
    self_signed: bool,
    accept_invalid: bool,
}

impl PolicyVerifier {
    fn new(
        roots: RootCertStore,
        provider: Arc<CryptoProvider>,
        self_signed: bool,
        accept_invalid: bool,
    ) -> Result<Self, ConnectError> {
        let webpki = if roots.is_empty() && (self_signed || accept_invalid) {
            None
        } else {
            Some(WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone()).build()?)
        };
        Ok(PolicyVerifier {
            webpki,
            provider,
            self_signed,
            accept_invalid,
        })
    }

    /// Verify `end_entity` with itself as the only trust anchor.
    ///
    /// Path building only matches the anchor when the leaf's issuer is its
    /// own subject and its signature checks under its own key. Validity
    /// period and server name are checked as for any other chain.
    fn verify_self_signed(
        &self,
        end_entity: &CertificateDer<'_>,
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let mut anchor = RootCertStore::empty();
        anchor.add(end_entity.clone().into_owned())?;
        let verifier = WebPkiServerVerifier::builder_with_provider(Arc::new(anchor), self.provider.clone())
            .build()
            .map_err(|e| rustls::Error::General(e.to_string()))?;
        verifier.verify_server_cert(end_entity, &[], server_name, ocsp_response, now)
    }
}

impl ServerCertVerifier for PolicyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let result = match &self.webpki {
            Some(webpki) => webpki.verify_server_cert(
                end_entity,
                intermediates,
                server_name,
                ocsp_response,
                now,
            ),
            None => Err(rustls::Error::InvalidCertificate(
                CertificateError::UnknownIssuer,
            )),
        };

        match result {
            Ok(verified) => Ok(verified),
            Err(_) if self.accept_invalid => {
                warn!(?server_name, "accepting invalid server certificate");
                Ok(ServerCertVerified::assertion())
            }
            Err(rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer))
                if self.self_signed && intermediates.is_empty() =>
            {
                let verified = self.verify_self_signed(end_entity, server_name, ocsp_response, now)?;
                warn!(?server_name, "accepting self-signed server certificate");
                Ok(verified)
            }
            Err(e) => Err(e),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

fn parse_certs(pem: &str) -> Result<Vec<CertificateDer<'static>>, ConnectError> {
    let certs = rustls_pemfile::certs(&mut pem.as_bytes()).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(ConnectError::Material("no certificates found in PEM".into()));
    }
    Ok(certs)
}

fn parse_key(pem: &str) -> Result<PrivateKeyDer<'static>, ConnectError> {
    rustls_pemfile::private_key(&mut pem.as_bytes())?
        .ok_or_else(|| ConnectError::Material("no private key found in PEM".into()))
}

/// Client identity from a PKCS#12 bundle: the first key entry and its chain.
fn parse_pfx(
    der: &[u8],
    passphrase: &str,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), ConnectError> {
    let store = KeyStore::from_pkcs12(der, passphrase)
        .map_err(|e| ConnectError::Material(format!("invalid PKCS#12 bundle: {}", e)))?;
    let (_, chain) = store
        .private_key_chain()
        .ok_or_else(|| ConnectError::Material("no private key found in PKCS#12 bundle".into()))?;

    let certs: Vec<_> = chain
        .chain()
        .iter()
        .map(|cert| CertificateDer::from(cert.as_der().to_vec()))
        .collect();
    if certs.is_empty() {
        return Err(ConnectError::Material("no certificates found in PKCS#12 bundle".into()));
    }
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(chain.key().to_vec()));
    Ok((certs, key))
}

fn root_store(ca: Option<&str>) -> Result<RootCertStore, ConnectError> {
    let mut roots = RootCertStore::empty();
    match ca {
        Some(pem) => {
            for cert in parse_certs(pem)? {
                roots.add(cert)?;
            }
        }
        None => {
            let certs = rustls_native_certs::load_native_certs();
            for e in &certs.errors {
                warn!("error loading native certs: {}", e);
            }
            for cert in certs.certs {
                if let Err(e) = roots.add(cert) {
                    warn!("failed to add root cert: {}", e);
                }
            }
        }
    }
    Ok(roots)
}

/// Build a connector for `options`, whose `_file` items must already be
/// resolved.
pub fn connector(options: &TlsOptions) -> Result<TlsConnector, ConnectError> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let roots = root_store(options.ca.as_deref())?;
    let verifier = PolicyVerifier::new(
        roots,
        provider.clone(),
        options.self_signed,
        options.accept_invalid_cert,
    )?;

    let builder = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier));

    let config = match (&options.cert, &options.key) {
        (Some(cert), Some(key)) => builder.with_client_auth_cert(parse_certs(cert)?, parse_key(key)?)?,
        (None, None) => match options.pfx_bytes()? {
            Some(der) => {
                let (certs, key) = parse_pfx(&der, options.passphrase.as_deref().unwrap_or(""))?;
                builder.with_client_auth_cert(certs, key)?
            }
            None => builder.with_no_client_auth(),
        },
        _ => {
            return Err(ConnectError::Material(
                "client cert and key must be given together".into(),
            ))
        }
    };

    Ok(TlsConnector::from(Arc::new(config)))
}

/// The SNI name for `host`.
pub fn server_name(host: &str) -> Result<ServerName<'static>, ConnectError> {
    ServerName::try_from(host.to_owned()).map_err(|_| ConnectError::InvalidServerName(host.to_owned()))
}
