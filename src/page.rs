use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::assets::AssetLoader;
use crate::badge::BadgeController;
use crate::config::ResolvedConfig;
use crate::dom::HostPage;
use crate::score::client::ScoreClient;

/// ページ 1 枚分の初期化。
///
/// 一回限りの走査であり、初期化後に追加された要素は拾わない。
pub(crate) struct PageInitializer {
    config: Arc<ResolvedConfig>,
    scores: ScoreClient,
    assets: Arc<AssetLoader>,
}

impl PageInitializer {
    pub(crate) fn new(
        config: Arc<ResolvedConfig>,
        scores: ScoreClient,
        assets: Arc<AssetLoader>,
    ) -> Self {
        Self {
            config,
            scores,
            assets,
        }
    }

    /// 文書の準備を待ち、プレースホルダを列挙して各バッジを起動する。
    ///
    /// バッジ間に順序の保証は無く、すべて同一タスク上で協調的に交互実行
    /// される。依存資源の取得はここで一度だけ引き金が引かれ、完了し次第
    /// `<head>` への注入も一度だけ行われる。
    pub(crate) async fn run(&self, page: &HostPage) -> Vec<BadgeController> {
        page.ready().await;

        let mut controllers = self.discover(page);
        info!(badges = controllers.len(), "placeholder scan complete");

        let activations = futures::future::join_all(
            controllers
                .iter_mut()
                .map(|controller| controller.activate(&self.scores, &self.assets)),
        );
        let injection = async {
            if let Ok(assets) = self.assets.ensure_ready().await {
                page.inject_assets(&assets);
            }
        };
        futures::future::join(activations, injection).await;

        controllers
    }

    /// マーカークラスを持つ要素を集める。識別子属性が無い、または空の要素は
    /// 一切触らずに飛ばす。
    fn discover(&self, page: &HostPage) -> Vec<BadgeController> {
        let selector = format!(".{}", self.config.marker_class);
        let Ok(matches) = page.document().select(&selector) else {
            warn!(selector = %selector, "marker selector did not parse; no badges initialized");
            return Vec::new();
        };

        let mut controllers = Vec::new();
        for element in matches {
            let doi = element
                .attributes
                .borrow()
                .get(self.config.identifier_attr.as_str())
                .map(str::to_owned);
            match doi {
                Some(doi) if !doi.trim().is_empty() => {
                    controllers.push(BadgeController::new(
                        element.as_node().clone(),
                        doi,
                        Arc::clone(&self.config),
                    ));
                }
                _ => {
                    debug!(
                        attr = %self.config.identifier_attr,
                        "placeholder without identifier attribute skipped"
                    );
                }
            }
        }
        controllers
    }
}
