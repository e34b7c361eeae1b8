pub mod error;

pub use error::*;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "CAPP_CONFIG_PATH";
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const AZ_PATH_ENV: &str = "CAPP_AZ_PATH";

const LOCAL_CONFIG: &str = ".capp.yaml";
const DEFAULT_AZ: &str = "az";

/// capp の設定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CappConfig {
    /// リソースグループ作成時の既定リージョン
    pub default_location: Option<String>,
    /// 生成するリソース名のプレフィックス (アカウントのユーザー名を上書き)
    pub user_name: Option<String>,
    pub github_token: Option<String>,
    pub az_path: Option<String>,
    pub poll_interval_secs: u64,
    pub poll_max_attempts: u32,
}

impl Default for CappConfig {
    fn default() -> Self {
        Self {
            default_location: None,
            user_name: None,
            github_token: None,
            az_path: None,
            poll_interval_secs: 5,
            poll_max_attempts: 360,
        }
    }
}

impl CappConfig {
    /// 設定ファイルを探して読み込み、環境変数で上書きする
    ///
    /// ファイルが無ければ既定値を使う。
    pub fn load() -> Result<Self> {
        let config = match find_config_file()? {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "poll_interval_secs は 1 以上を指定してください".to_string(),
            ));
        }
        Ok(config)
    }

    /// GITHUB_TOKEN と CAPP_AZ_PATH はファイルの値より優先
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(token) = non_empty_env(GITHUB_TOKEN_ENV) {
            self.github_token = Some(token);
        }
        if let Some(az) = non_empty_env(AZ_PATH_ENV) {
            self.az_path = Some(az);
        }
        self
    }

    pub fn az_program(&self) -> &str {
        self.az_path.as_deref().unwrap_or(DEFAULT_AZ)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// グローバル設定ファイルのパス (~/.config/capp/config.yaml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("capp").join("config.yaml"))
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 CAPP_CONFIG_PATH (直接パス指定、存在しなければエラー)
/// 2. カレントディレクトリの .capp.yaml
/// 3. ~/.config/capp/config.yaml
pub fn find_config_file() -> Result<Option<PathBuf>> {
    // 1. 環境変数で直接指定
    if let Some(config_path) = non_empty_env(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::ConfigFileNotFound(path));
    }

    // 2. カレントディレクトリ
    let local = std::env::current_dir()?.join(LOCAL_CONFIG);
    if local.exists() {
        return Ok(Some(local));
    }

    // 3. グローバル設定
    Ok(global_config_path().filter(|p| p.exists()))
}
