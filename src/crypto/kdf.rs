use std::fmt;
use std::str::FromStr;

use argon2::{Algorithm, Argon2, Params, Version};
use tracing::debug;
use zeroize::Zeroizing;

use super::{KEY_LEN, LEGACY_SALT_LEN, MIN_PASSWORD_LEN, MIN_SALT_LEN, SALT_LEN};
use crate::error::{PipeError, Result};

/// Symmetric key produced by [`derive_key`], wiped on drop.
pub type DerivedKey = Zeroizing<[u8; KEY_LEN]>;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    mem_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            mem_cost_kib: 256 * 1024, // 256 MiB
            time_cost: 2,
            parallelism: 8,
        }
    }
}

impl Argon2Params {
    pub fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Self {
            mem_cost_kib,
            time_cost,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn mem_cost_kib(&self) -> u32 {
        self.mem_cost_kib
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn validate(&self) -> Result<()> {
        if self.mem_cost_kib < 8 {
            return Err(PipeError::UnsafeParameter("argon2 memory cost too low"));
        }
        if self.time_cost < 1 {
            return Err(PipeError::UnsafeParameter("argon2 time cost must be >= 1"));
        }
        if self.parallelism < 1 {
            return Err(PipeError::UnsafeParameter("argon2 parallelism must be >= 1"));
        }
        if self.mem_cost_kib < 8 * self.parallelism {
            return Err(PipeError::UnsafeParameter(
                "argon2 memory cost must be at least 8 * parallelism",
            ));
        }
        Ok(())
    }
}

/// scrypt cost parameters. `log_n` is the base-2 logarithm of the CPU/memory cost N.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptParams {
    log_n: u8,
    r: u32,
    p: u32,
}

impl ScryptParams {
    /// N = 2^14, r = 8, p = 1. Kept to decode streams written by older releases.
    pub const LEGACY: Self = Self {
        log_n: 14,
        r: 8,
        p: 1,
    };

    /// N = 2^16, r = 16, p = 4.
    pub const STRONG: Self = Self {
        log_n: 16,
        r: 16,
        p: 4,
    };

    pub fn new(log_n: u8, r: u32, p: u32) -> Result<Self> {
        let params = Self { log_n, r, p };
        params.validate()?;
        Ok(params)
    }

    pub fn log_n(&self) -> u8 {
        self.log_n
    }

    pub fn r(&self) -> u32 {
        self.r
    }

    pub fn p(&self) -> u32 {
        self.p
    }

    pub fn validate(&self) -> Result<()> {
        if self.log_n < 10 {
            return Err(PipeError::UnsafeParameter("scrypt cost N must be >= 2^10"));
        }
        if self.r < 1 || self.p < 1 {
            return Err(PipeError::UnsafeParameter("scrypt r and p must be >= 1"));
        }
        Ok(())
    }
}

/// Selector naming one of the key derivation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KdfAlgorithm {
    LegacyScryptWeak,
    Scrypt,
    #[default]
    Argon2id,
}

impl KdfAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            KdfAlgorithm::LegacyScryptWeak => "old",
            KdfAlgorithm::Scrypt => "scrypt",
            KdfAlgorithm::Argon2id => "argon",
        }
    }
}

impl fmt::Display for KdfAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KdfAlgorithm {
    type Err = PipeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "old" | "legacy" => Ok(KdfAlgorithm::LegacyScryptWeak),
            "scrypt" => Ok(KdfAlgorithm::Scrypt),
            "argon" | "argon2" | "argon2id" => Ok(KdfAlgorithm::Argon2id),
            other => Err(PipeError::Unsupported(other.to_string())),
        }
    }
}

/// A derivation function bundled with its cost parameters.
///
/// The profile fixes the salt length carried on the wire; both ends of a
/// stream must use the same profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfProfile {
    LegacyScryptWeak(ScryptParams),
    Scrypt(ScryptParams),
    Argon2id(Argon2Params),
}

impl Default for KdfProfile {
    fn default() -> Self {
        KdfProfile::Argon2id(Argon2Params::default())
    }
}

impl From<KdfAlgorithm> for KdfProfile {
    fn from(algorithm: KdfAlgorithm) -> Self {
        match algorithm {
            KdfAlgorithm::LegacyScryptWeak => KdfProfile::LegacyScryptWeak(ScryptParams::LEGACY),
            KdfAlgorithm::Scrypt => KdfProfile::Scrypt(ScryptParams::STRONG),
            KdfAlgorithm::Argon2id => KdfProfile::Argon2id(Argon2Params::default()),
        }
    }
}

impl KdfProfile {
    pub fn algorithm(&self) -> KdfAlgorithm {
        match self {
            KdfProfile::LegacyScryptWeak(_) => KdfAlgorithm::LegacyScryptWeak,
            KdfProfile::Scrypt(_) => KdfAlgorithm::Scrypt,
            KdfProfile::Argon2id(_) => KdfAlgorithm::Argon2id,
        }
    }

    pub fn salt_len(&self) -> usize {
        match self {
            KdfProfile::LegacyScryptWeak(_) => LEGACY_SALT_LEN,
            KdfProfile::Scrypt(_) | KdfProfile::Argon2id(_) => SALT_LEN,
        }
    }

    pub fn key_len(&self) -> usize {
        KEY_LEN
    }
}

fn check_inputs(password: &str, salt: &[u8]) -> Result<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(PipeError::UnsafeParameter("password too short"));
    }
    if salt.len() < MIN_SALT_LEN {
        return Err(PipeError::UnsafeParameter("salt too short"));
    }
    if salt.iter().all(|&b| b == 0) {
        return Err(PipeError::UnsafeParameter("salt is all zero"));
    }
    Ok(())
}

/// Stretch `password` and `salt` into a 32-byte key using `profile`.
///
/// Input checks run before any derivation work: the password must be at
/// least 5 bytes, the salt at least 12 bytes and not entirely zero.
pub fn derive_key(password: &str, salt: &[u8], profile: &KdfProfile) -> Result<DerivedKey> {
    check_inputs(password, salt)?;

    let mut key = Zeroizing::new([0u8; KEY_LEN]);

    match profile {
        KdfProfile::LegacyScryptWeak(params) | KdfProfile::Scrypt(params) => {
            params.validate()?;
            let scrypt_params = scrypt::Params::new(params.log_n, params.r, params.p, KEY_LEN)
                .map_err(|e| PipeError::DerivationFailed(format!("invalid scrypt params: {e}")))?;
            scrypt::scrypt(password.as_bytes(), salt, &scrypt_params, &mut key[..])
                .map_err(|e| PipeError::DerivationFailed(format!("scrypt: {e}")))?;
        }
        KdfProfile::Argon2id(params) => {
            params.validate()?;
            let argon2_params = Params::new(
                params.mem_cost_kib,
                params.time_cost,
                params.parallelism,
                Some(KEY_LEN),
            )
            .map_err(|e| PipeError::DerivationFailed(format!("invalid argon2 params: {e}")))?;

            Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params)
                .hash_password_into(password.as_bytes(), salt, &mut key[..])
                .map_err(|e| PipeError::DerivationFailed(format!("argon2: {e}")))?;
        }
    }

    debug!(
        algorithm = profile.algorithm().name(),
        salt_len = salt.len(),
        "derived stream key"
    );
    Ok(key)
}
