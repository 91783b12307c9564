//! Login encryption interception.
//!
//! The proxy answers the server's encryption request in place of the client:
//! the client encrypts its shared secret with the proxy's key, the proxy
//! recovers it and hands it on encrypted with the server's key. Both sockets
//! then use the same secret.

use crate::config::AuthConfig;
use anyhow::{bail, Context};
use num_bigint::BigInt;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use strata_protocol_core::cipher::SECRET_LEN;
use strata_protocol_core::{InternalPacket, SignedNonce};
use tracing::{debug, info};

const KEY_BITS: usize = 1024;
const SESSION_JOIN_URL: &str = "https://sessionserver.mojang.com/session/minecraft/join";

/// The proxy's own key pair, generated once per process.
pub struct KeyExchange {
    private: RsaPrivateKey,
    public_der: Vec<u8>,
}

/// What the proxy remembers between the encryption request and response.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    pub server_id: String,
    server_key: RsaPublicKey,
    server_key_der: Vec<u8>,
    verify_token: Vec<u8>,
}

/// The re-encrypted response for the server and the recovered secret.
pub struct CompletedLogin {
    pub response: InternalPacket,
    pub secret: [u8; SECRET_LEN],
    pub server_hash: String,
}

impl KeyExchange {
    pub fn generate() -> anyhow::Result<Self> {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), KEY_BITS)
            .context("generating proxy key pair")?;
        let public_der = RsaPublicKey::from(&private)
            .to_public_key_der()
            .context("encoding proxy public key")?
            .into_vec();
        Ok(Self {
            private,
            public_der,
        })
    }

    pub fn public_der(&self) -> &[u8] {
        &self.public_der
    }

    /// Swap the server's key for ours. The verify token is passed through so
    /// that a token signed by the client (1.19) stays valid for the server.
    pub fn intercept_request(
        &self,
        server_id: &str,
        public_key: &[u8],
        verify_token: &[u8],
    ) -> anyhow::Result<(InternalPacket, PendingLogin)> {
        let server_key =
            RsaPublicKey::from_public_key_der(public_key).context("parsing server public key")?;
        let pending = PendingLogin {
            server_id: server_id.to_string(),
            server_key,
            server_key_der: public_key.to_vec(),
            verify_token: verify_token.to_vec(),
        };
        let request = InternalPacket::EncryptionRequest {
            server_id: server_id.to_string(),
            public_key: self.public_der.clone(),
            verify_token: verify_token.to_vec(),
        };
        Ok((request, pending))
    }

    /// Recover the secret from the client's response and re-encrypt the
    /// response for the server.
    pub fn complete(
        &self,
        pending: &PendingLogin,
        shared_secret: &[u8],
        verify_token: Option<&[u8]>,
        signed_nonce: Option<&SignedNonce>,
    ) -> anyhow::Result<CompletedLogin> {
        let plain_secret = self
            .private
            .decrypt(Pkcs1v15Encrypt, shared_secret)
            .context("decrypting shared secret")?;
        let secret: [u8; SECRET_LEN] = match plain_secret.as_slice().try_into() {
            Ok(secret) => secret,
            Err(_) => bail!("shared secret has {} bytes", plain_secret.len()),
        };

        let mut rng = rand::thread_rng();
        let forwarded_secret = pending
            .server_key
            .encrypt(&mut rng, Pkcs1v15Encrypt, &secret)
            .context("encrypting secret for server")?;

        let forwarded_token = match verify_token {
            Some(token) => {
                let token = self
                    .private
                    .decrypt(Pkcs1v15Encrypt, token)
                    .context("decrypting verify token")?;
                if token != pending.verify_token {
                    bail!("client verify token does not match");
                }
                Some(
                    pending
                        .server_key
                        .encrypt(&mut rng, Pkcs1v15Encrypt, &token)
                        .context("encrypting verify token for server")?,
                )
            }
            None => None,
        };

        let server_hash = server_hash(&pending.server_id, &secret, &pending.server_key_der);
        debug!("Recovered shared secret, server hash {}", server_hash);
        Ok(CompletedLogin {
            response: InternalPacket::EncryptionResponse {
                shared_secret: forwarded_secret,
                verify_token: forwarded_token,
                signed_nonce: signed_nonce.cloned(),
            },
            secret,
            server_hash,
        })
    }
}

/// Minecraft's server hash: SHA-1 over id, secret and key, printed as a
/// signed two's-complement hex number.
pub fn server_hash(server_id: &str, secret: &[u8], public_key: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(server_id.as_bytes());
    hasher.update(secret);
    hasher.update(public_key);
    BigInt::from_signed_bytes_be(&hasher.finalize()).to_str_radix(16)
}

/// Tell the session server that this identity joins the server.
pub async fn join_session(auth: &AuthConfig, server_hash: &str) -> anyhow::Result<()> {
    let body = serde_json::json!({
        "accessToken": auth.access_token,
        "selectedProfile": auth.profile_id.simple().to_string(),
        "serverId": server_hash,
    });
    reqwest::Client::new()
        .post(SESSION_JOIN_URL)
        .json(&body)
        .send()
        .await
        .context("contacting session server")?
        .error_for_status()
        .context("session server rejected join")?;
    info!("Joined session for profile {}", auth.profile_id);
    Ok(())
}
