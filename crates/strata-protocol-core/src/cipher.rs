use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;

/// Length of the shared secret negotiated during login.
pub const SECRET_LEN: usize = 16;

/// Which byte is shifted into the register: the output when encrypting, the
/// input when decrypting. Either way it is the ciphertext byte.
#[derive(Clone, Copy)]
enum Feedback {
    Output,
    Input,
}

/// AES-128 in 8-bit cipher feedback mode. `register` holds the last sixteen
/// ciphertext bytes of this direction, seeded with the shared secret.
struct Keystream {
    aes: Aes128,
    register: [u8; 16],
    feedback: Feedback,
}

impl Keystream {
    fn keyed(secret: &[u8; SECRET_LEN], feedback: Feedback) -> Self {
        Keystream {
            aes: Aes128::new(secret.into()),
            register: *secret,
            feedback,
        }
    }

    fn apply(&mut self, data: &mut [u8]) {
        for byte in data {
            let mut pad = aes::Block::from(self.register);
            self.aes.encrypt_block(&mut pad);
            let input = *byte;
            *byte ^= pad[0];
            self.register.rotate_left(1);
            self.register[15] = match self.feedback {
                Feedback::Output => *byte,
                Feedback::Input => input,
            };
        }
    }
}

/// Stateful cipher for one socket: one independent keystream per direction.
///
/// Until [`CipherStream::enable`] is called every byte passes through unchanged.
#[derive(Default)]
pub struct CipherStream {
    outbound: Option<Keystream>,
    inbound: Option<Keystream>,
}

impl CipherStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install AES-CFB8 keyed by the shared secret for both directions.
    /// The protocol uses the secret as both key and IV.
    pub fn enable(&mut self, secret: &[u8; SECRET_LEN]) {
        self.outbound = Some(Keystream::keyed(secret, Feedback::Output));
        self.inbound = Some(Keystream::keyed(secret, Feedback::Input));
    }

    pub fn is_enabled(&self) -> bool {
        self.inbound.is_some()
    }

    /// Transform outbound bytes in place.
    pub fn encrypt(&mut self, data: &mut [u8]) {
        if let Some(stream) = self.outbound.as_mut() {
            stream.apply(data);
        }
    }

    /// Transform inbound bytes in place.
    pub fn decrypt(&mut self, data: &mut [u8]) {
        if let Some(stream) = self.inbound.as_mut() {
            stream.apply(data);
        }
    }

    /// Drop all keystream state; later bytes pass through unchanged again.
    pub fn reset(&mut self) {
        self.outbound = None;
        self.inbound = None;
    }
}

impl std::fmt::Debug for CipherStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherStream")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
