use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use clap::Parser;
use log::warn;
use rustls::pki_types::CertificateDer;
use rustls::ServerConfig;
use sha2::{Digest, Sha256};

#[derive(Parser, Debug)]
#[command(name = "campus-desk")]
#[command(about = "Student and admin campus desk: reports, meetings and notifications", long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "CAMPUS_BIND", default_value = "0.0.0.0:2052")]
    pub bind: SocketAddr,
    #[arg(long, env = "CAMPUS_TLS_CERT", default_value = "ssl/campus/certificate.pem")]
    pub tls_cert: PathBuf,
    #[arg(long, env = "CAMPUS_TLS_KEY", default_value = "ssl/campus/private.key")]
    pub tls_key: PathBuf,
    #[arg(long, env = "CAMPUS_ADMIN_ID", default_value = "admin@campus")]
    pub admin_id: String,
    #[arg(long, env = "CAMPUS_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: String,
    /// Start with an empty roster instead of the demo students and faculty
    #[arg(long, env = "CAMPUS_NO_SEED")]
    pub no_seed: bool,
}

impl Config {
    pub fn admin_credentials(&self) -> AdminCredentials {
        AdminCredentials::new(&self.admin_id, &self.admin_password)
    }

    /// `None` when the certificate or key is missing or unusable.
    pub fn load_tls_config(&self) -> Option<ServerConfig> {
        let cert_file = match File::open(&self.tls_cert) {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to open certificate file {}: {e}", self.tls_cert.display());
                return None;
            }
        };
        let key_file = match File::open(&self.tls_key) {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to open private key file {}: {e}", self.tls_key.display());
                return None;
            }
        };

        let certs = match rustls_pemfile::certs(&mut BufReader::new(cert_file))
            .collect::<Result<Vec<CertificateDer<'static>>, _>>()
        {
            Ok(certs) => certs,
            Err(e) => {
                warn!("Failed to parse certificate: {e}");
                return None;
            }
        };

        let key = match rustls_pemfile::private_key(&mut BufReader::new(key_file)) {
            Ok(Some(key)) => key,
            Ok(None) => {
                warn!("No private key found in {}", self.tls_key.display());
                return None;
            }
            Err(e) => {
                warn!("Failed to parse private key: {e}");
                return None;
            }
        };

        match ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
        {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Failed to create TLS config: {e}");
                None
            }
        }
    }
}

/// Admin identifier plus the SHA-256 digest of the password. The clear
/// password is not retained.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    id: String,
    password_digest: String,
}

impl AdminCredentials {
    fn digest(password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        BASE64.encode(hasher.finalize())
    }

    pub fn new(id: &str, password: &str) -> Self {
        AdminCredentials {
            id: id.to_string(),
            password_digest: Self::digest(password),
        }
    }

    pub fn verify(&self, id: &str, password: &str) -> bool {
        self.id == id && self.password_digest == Self::digest(password)
    }
}
