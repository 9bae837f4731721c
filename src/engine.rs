use std::sync::Arc;

use reqwest::Client;
use tracing::debug;

use crate::assets::{AssetLoader, DependencyState};
use crate::badge::BadgeController;
use crate::config::{ConfigError, EmbedConfig, ResolvedConfig};
use crate::dom::HostPage;
use crate::page::PageInitializer;
use crate::score::client::ScoreClient;

/// バッジエンジン本体。設定と依存をまとめて保持する共有レジストリ。
///
/// 1 プロセスに 1 つ作り、ページごとに [`EmbedEngine::attach`] を呼ぶ。
/// レンダリング依存の取得結果はページをまたいで共有される。
pub struct EmbedEngine {
    config: Arc<ResolvedConfig>,
    scores: ScoreClient,
    assets: Arc<AssetLoader>,
}

impl EmbedEngine {
    /// 設定を検証し、HTTP クライアントと各コンポーネントを構築する。
    ///
    /// # Errors
    /// 設定値が不正な場合、または HTTP クライアントの構築に失敗した場合は
    /// [`ConfigError`] を返す。
    pub fn new(config: EmbedConfig) -> Result<Self, ConfigError> {
        let config = Arc::new(config.resolve()?);
        let client = Client::builder()
            .user_agent(concat!("impact-embed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ConfigError::HttpClient)?;

        let scores = ScoreClient::new(client.clone(), config.scores_base_url.clone());
        let assets = Arc::new(AssetLoader::new(client, &config));
        debug!(marker = %config.marker_class, "embed engine built");

        Ok(Self {
            config,
            scores,
            assets,
        })
    }

    /// ホストページにバッジを取り付ける。ページにつき一度だけ呼ぶ。
    ///
    /// 文書の準備を待ってプレースホルダを走査し、各バッジを並行に起動して、
    /// 完了したコントローラ群を返す。ホストは返ったコントローラへポインタ
    /// イベントとクリックを転送し、返された URL を新しいブラウジング
    /// コンテキストで開く。
    pub async fn attach(&self, page: &HostPage) -> Vec<BadgeController> {
        PageInitializer::new(
            Arc::clone(&self.config),
            self.scores.clone(),
            Arc::clone(&self.assets),
        )
        .run(page)
        .await
    }

    /// 共有レンダリング依存の現在の状態。
    pub fn dependency_state(&self) -> DependencyState {
        self.assets.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_builds_from_default_config() {
        let engine = EmbedEngine::new(EmbedConfig::default()).expect("defaults are valid");
        assert_eq!(engine.dependency_state(), DependencyState::NotLoaded);
    }

    #[test]
    fn engine_rejects_invalid_config() {
        let config = EmbedConfig {
            detail_base_url: "::::".to_string(),
            ..EmbedConfig::default()
        };
        assert!(EmbedEngine::new(config).is_err());
    }
}
