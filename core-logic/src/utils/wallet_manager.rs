use crate::config::WalletSource;
use crate::error::{SecurityError, WalletError};
use crate::security::SecurityUtils;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct DecryptedWallet {
    #[serde(default)]
    pub mnemonic: String,
    #[serde(default)]
    pub evm_private_key: String,
    #[serde(default)]
    pub evm_address: String,
}

impl fmt::Debug for DecryptedWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptedWallet")
            .field("evm_address", &self.evm_address)
            .field("mnemonic", &"***REDACTED***")
            .field("evm_private_key", &"***REDACTED***")
            .finish()
    }
}

impl DecryptedWallet {
    fn from_raw_key(key: &str) -> Self {
        Self {
            mnemonic: String::new(),
            evm_private_key: key.to_string(),
            evm_address: String::new(),
        }
    }
}

enum KeySource {
    JsonFile(PathBuf),
    RawKey(Zeroizing<String>),
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::JsonFile(path) => f.debug_tuple("JsonFile").field(path).finish(),
            KeySource::RawKey(_) => f.write_str("RawKey(***)"),
        }
    }
}

/// Loads wallet key material in a fixed, deterministic order.
///
/// Index `i` always refers to the same wallet for a given source, which is what
/// lets campaigns attribute outcomes to wallets by position.
pub struct WalletManager {
    sources: Vec<KeySource>,
    cache: Mutex<HashMap<usize, Arc<DecryptedWallet>>>,
}

impl WalletManager {
    pub fn from_source(source: &WalletSource) -> Result<Self> {
        let sources = match source {
            WalletSource::Directory { path } => Self::scan_directory(Path::new(path))?,
            WalletSource::KeysFile { path } => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read keys file {}", path))?;
                info!("[WalletManager] Loading raw keys from {}", path);
                parse_key_lines(&content)?
            }
            WalletSource::Env { key } => {
                let value = Zeroizing::new(
                    std::env::var(key).map_err(|_| WalletError::MissingEnv { key: key.clone() })?,
                );
                parse_key_lines(&value.replace(',', "\n"))?
            }
        };

        debug!("[WalletManager] {} wallet sources from {:?}", sources.len(), source);

        Ok(Self {
            sources,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Builds a manager over in-memory keys. Used by tests and embedding callers.
    pub fn from_keys<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sources = Vec::new();
        for key in keys {
            sources.push(KeySource::RawKey(Zeroizing::new(normalize_key(key.as_ref())?)));
        }
        Ok(Self {
            sources,
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn scan_directory(dir: &Path) -> Result<Vec<KeySource>> {
        if !dir.is_dir() {
            return Err(anyhow!("Wallet directory {:?} does not exist", dir));
        }
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("Failed to list {:?}", dir))?
            .filter_map(|res| res.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();

        entries.sort();
        info!(
            "[WalletManager] Found {} wallet files in {:?}",
            entries.len(),
            dir
        );

        Ok(entries.into_iter().map(KeySource::JsonFile).collect())
    }

    /// Returns the number of available wallets
    pub fn count(&self) -> usize {
        self.sources.len()
    }

    /// List wallet identifiers (filenames or indices) without decrypting
    pub fn list_wallets(&self) -> Vec<String> {
        self.sources
            .iter()
            .enumerate()
            .map(|(i, src)| match src {
                KeySource::JsonFile(path) => path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown.json")
                    .to_string(),
                KeySource::RawKey(_) => format!("Wallet {}", i),
            })
            .collect()
    }

    /// Whether any source needs a password to be read.
    pub fn needs_password(&self) -> bool {
        self.sources
            .iter()
            .any(|s| matches!(s, KeySource::JsonFile(_)))
    }

    /// Get a decrypted wallet by index. Decrypts if not cached.
    /// Returns Arc<DecryptedWallet> to avoid cloning sensitive data.
    pub async fn get_wallet(
        &self,
        index: usize,
        password: Option<&str>,
    ) -> Result<Arc<DecryptedWallet>> {
        {
            let cache = self.cache.lock().await;
            if let Some(wallet) = cache.get(&index) {
                return Ok(Arc::clone(wallet));
            }
        }

        let source = self.sources.get(index).ok_or(WalletError::NotFound {
            index,
            total: self.sources.len(),
        })?;
        let wallet = match source {
            KeySource::JsonFile(path) => Arc::new(Self::decrypt_json_wallet(path, password)?),
            KeySource::RawKey(key) => Arc::new(DecryptedWallet::from_raw_key(key)),
        };

        {
            let mut cache = self.cache.lock().await;
            cache.insert(index, Arc::clone(&wallet));
        }

        Ok(wallet)
    }

    /// Loads every wallet in index order.
    pub async fn load_all(&self, password: Option<&str>) -> Result<Vec<Arc<DecryptedWallet>>> {
        let mut wallets = Vec::with_capacity(self.count());
        for i in 0..self.count() {
            wallets.push(self.get_wallet(i, password).await?);
        }
        Ok(wallets)
    }

    fn decrypt_json_wallet(path: &Path, password: Option<&str>) -> Result<DecryptedWallet> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let json: Value = serde_json::from_str(&content)
            .with_context(|| format!("Wallet file {:?} is not valid JSON", path))?;

        if let Some(block) = json.get("encrypted").filter(|v| v.is_object()) {
            let pass = password.ok_or(SecurityError::PasswordRequired)?;
            let field = |name: &str| block.get(name).and_then(|v| v.as_str()).unwrap_or("");

            let decrypted = SecurityUtils::decrypt_components(
                field("ciphertext"),
                field("iv"),
                field("salt"),
                field("tag"),
                pass,
            )
            .map_err(|e| WalletError::DecryptionFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            let decrypted = Zeroizing::new(decrypted);
            let wallet: DecryptedWallet = serde_json::from_str(&decrypted)
                .with_context(|| format!("Decrypted payload of {:?} is not a wallet", path))?;
            return Ok(wallet);
        }

        // Plain wallet files carry the key directly
        if json.get("evm_private_key").is_some() {
            let wallet: DecryptedWallet = serde_json::from_value(json)
                .with_context(|| format!("Invalid wallet fields in {:?}", path))?;
            return Ok(wallet);
        }

        Err(anyhow!(
            "Invalid or unrecognized wallet format in {:?}",
            path
        ))
    }
}

fn parse_key_lines(content: &str) -> Result<Vec<KeySource>> {
    let mut sources = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        sources.push(KeySource::RawKey(Zeroizing::new(normalize_key(trimmed)?)));
    }
    Ok(sources)
}

/// Validates a hex private key and returns it `0x`-prefixed.
fn normalize_key(key: &str) -> Result<String, WalletError> {
    let hex_part = key.trim().trim_start_matches("0x");
    if hex_part.len() != 64 {
        return Err(WalletError::InvalidKeyLength {
            length: hex_part.len(),
        });
    }
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(WalletError::InvalidKeyFormat);
    }
    Ok(format!("0x{}", hex_part))
}
