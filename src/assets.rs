use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::config::ResolvedConfig;

/// 共有レンダリング依存の取得状態。プロセスごとに一度だけ遷移する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyState {
    NotLoaded,
    Loading,
    Ready,
    Failed,
}

const STATE_NOT_LOADED: u8 = 0;
const STATE_LOADING: u8 = 1;
const STATE_READY: u8 = 2;
const STATE_FAILED: u8 = 3;

/// 取得済みのレンダリング依存一式。ページの `<head>` へ一度だけ注入される。
#[derive(Debug)]
pub struct RenderAssets {
    pub chart_runtime: String,
    pub datalabel_plugin: String,
    pub icon_stylesheet: String,
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to fetch {resource}")]
    Network {
        resource: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{resource} location returned {status}")]
    Status {
        resource: &'static str,
        status: StatusCode,
    },
}

/// 外部チャートランタイムとその付属資源の一括取得。
///
/// 最初の呼び出しだけが取得を開始し、取得中の呼び出しは同じ進行中の処理に
/// 合流する。二重取得はプラグインの二重登録を招くため明確なバグとして扱う。
/// いずれかの資源が取得できなければ、その失敗はプロセスの寿命いっぱい
/// ラッチされ、以後の呼び出しも同じ失敗を受け取る。再試行はしない。
pub struct AssetLoader {
    client: Client,
    chart_runtime_url: Url,
    datalabel_plugin_url: Url,
    icon_stylesheet_url: Url,
    state: AtomicU8,
    outcome: OnceCell<Result<Arc<RenderAssets>, Arc<AssetError>>>,
}

impl AssetLoader {
    pub(crate) fn new(client: Client, config: &ResolvedConfig) -> Self {
        Self {
            client,
            chart_runtime_url: config.chart_runtime_url.clone(),
            datalabel_plugin_url: config.datalabel_plugin_url.clone(),
            icon_stylesheet_url: config.icon_stylesheet_url.clone(),
            state: AtomicU8::new(STATE_NOT_LOADED),
            outcome: OnceCell::new(),
        }
    }

    /// すべての依存資源が手元に揃うまで待つ。
    ///
    /// # Errors
    /// 資源のいずれかが取得できなかった場合、最初の失敗を全員に返す。
    pub async fn ensure_ready(&self) -> Result<Arc<RenderAssets>, Arc<AssetError>> {
        self.outcome
            .get_or_init(|| async {
                self.state.store(STATE_LOADING, Ordering::SeqCst);
                match self.fetch_all().await {
                    Ok(assets) => {
                        self.state.store(STATE_READY, Ordering::SeqCst);
                        info!("render dependencies ready");
                        Ok(Arc::new(assets))
                    }
                    Err(err) => {
                        self.state.store(STATE_FAILED, Ordering::SeqCst);
                        error!(error = %err, "render dependency load failed; no badge can be drawn");
                        Err(Arc::new(err))
                    }
                }
            })
            .await
            .clone()
    }

    pub fn state(&self) -> DependencyState {
        match self.state.load(Ordering::SeqCst) {
            STATE_LOADING => DependencyState::Loading,
            STATE_READY => DependencyState::Ready,
            STATE_FAILED => DependencyState::Failed,
            _ => DependencyState::NotLoaded,
        }
    }

    async fn fetch_all(&self) -> Result<RenderAssets, AssetError> {
        let (chart_runtime, datalabel_plugin, icon_stylesheet) = tokio::try_join!(
            self.fetch("chart-runtime", &self.chart_runtime_url),
            self.fetch("datalabel-plugin", &self.datalabel_plugin_url),
            self.fetch("icon-stylesheet", &self.icon_stylesheet_url),
        )?;
        Ok(RenderAssets {
            chart_runtime,
            datalabel_plugin,
            icon_stylesheet,
        })
    }

    async fn fetch(&self, resource: &'static str, url: &Url) -> Result<String, AssetError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| AssetError::Network { resource, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Status { resource, status });
        }

        response
            .text()
            .await
            .map_err(|source| AssetError::Network { resource, source })
    }
}
