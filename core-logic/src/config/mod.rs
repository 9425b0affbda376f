use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where wallet key material is loaded from.
///
/// Deserialized from a `[wallets]` table tagged by `type`:
///
/// ```toml
/// [wallets]
/// type = "keys_file"
/// path = "pv.txt"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WalletSource {
    /// Directory of encrypted wallet JSON files, loaded in file-name order.
    Directory { path: String },
    /// Plain text file, one hex private key per line. `#` starts a comment.
    KeysFile { path: String },
    /// Comma separated private keys in an environment variable.
    Env { key: String },
}

impl Default for WalletSource {
    fn default() -> Self {
        WalletSource::KeysFile {
            path: "pv.txt".to_string(),
        }
    }
}

impl WalletSource {
    /// Rebases a relative file or directory path onto `base`, normally the
    /// directory holding the config file. Absolute paths and `Env` are unchanged.
    pub fn relative_to(&self, base: &Path) -> WalletSource {
        let rebase = |path: &str| {
            if Path::new(path).is_absolute() {
                path.to_string()
            } else {
                base.join(path).to_string_lossy().into_owned()
            }
        };
        match self {
            WalletSource::Directory { path } => WalletSource::Directory { path: rebase(path) },
            WalletSource::KeysFile { path } => WalletSource::KeysFile { path: rebase(path) },
            WalletSource::Env { key } => WalletSource::Env { key: key.clone() },
        }
    }
}
