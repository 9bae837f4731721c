use std::sync::Arc;

use kuchiki::NodeRef;
use tracing::{debug, error};
use url::Url;

use crate::assets::AssetLoader;
use crate::config::{IconSet, OverlayMode, ResolvedConfig};
use crate::dom;
use crate::encode::{self, VisualEncoding};
use crate::score::client::ScoreClient;
use crate::score::model::NormalizedScore;

/// バッジのライフサイクル段階。
///
/// `Failed` は終端で、自動リトライは無い。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Loaded,
    Rendered,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayVisibility {
    Hidden,
    Shown,
}

/// ホストから転送されるクリックの対象。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Chart,
    Overlay,
    OverlayClose,
}

/// プレースホルダ要素 1 つ分の状態機械。
///
/// 自分のルート要素への直接参照を持ち、その子孫以外には決して触れない。
/// 状態はコントローラ間で共有されず、N 個のバッジが並行に描画されても
/// 互いのサブツリーを壊すことはない。
pub struct BadgeController {
    root: NodeRef,
    doi: String,
    config: Arc<ResolvedConfig>,
    phase: Phase,
    overlay: OverlayVisibility,
    overlay_node: Option<NodeRef>,
}

impl BadgeController {
    pub(crate) fn new(root: NodeRef, doi: String, config: Arc<ResolvedConfig>) -> Self {
        Self {
            root,
            doi,
            config,
            phase: Phase::Idle,
            overlay: OverlayVisibility::Hidden,
            overlay_node: None,
        }
    }

    /// 取得から描画までを一回だけ実行する。
    ///
    /// 取得失敗・依存失敗はこのプレースホルダの中に閉じ、外へは伝播しない。
    pub(crate) async fn activate(&mut self, scores: &ScoreClient, assets: &AssetLoader) {
        self.phase = Phase::Loading;
        self.show_indicator("color:gray;font-size:12px", "Loading...");

        let score = match scores.fetch_normalized(&self.doi).await {
            Ok(score) => {
                self.phase = Phase::Loaded;
                score
            }
            Err(err) => {
                error!(doi = %self.doi, error = %err, "score fetch failed");
                self.fail();
                return;
            }
        };

        if let Err(err) = assets.ensure_ready().await {
            // 取得失敗とは別枠: 共有依存が無ければどのバッジも描けない。
            error!(doi = %self.doi, error = %err, "render dependencies unavailable; badge not drawn");
            self.fail();
            return;
        }

        let encoding = encode::encode(&score, self.config.chart_style, self.config.icon_set);
        self.render(&score, &encoding);
        self.phase = Phase::Rendered;
        debug!(doi = %self.doi, "badge rendered");
    }

    pub fn identifier(&self) -> &str {
        &self.doi
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn overlay_visibility(&self) -> OverlayVisibility {
        self.overlay
    }

    /// バッジのルート要素。ホストはここを自分のページへ同期する。
    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    /// ポインタがバッジ上に入った。描画済みのときだけオーバーレイを出す。
    pub fn pointer_enter(&mut self) {
        if self.phase != Phase::Rendered {
            return;
        }
        if self.overlay == OverlayVisibility::Shown {
            return;
        }
        self.overlay = OverlayVisibility::Shown;
        self.set_overlay_hidden(false);
    }

    pub fn pointer_leave(&mut self) {
        if self.overlay != OverlayVisibility::Shown {
            return;
        }
        self.overlay = OverlayVisibility::Hidden;
        self.set_overlay_hidden(true);
    }

    /// クリックを処理し、遷移すべき詳細ページの URL を返す。
    ///
    /// 返った URL は新しいブラウジングコンテキストで開くのがホストの責務。
    /// 閉じるボタンは遷移せず、オーバーレイを隠すだけ。
    pub fn click(&mut self, target: ClickTarget) -> Option<Url> {
        if self.phase != Phase::Rendered {
            return None;
        }
        match (self.config.overlay_mode, target) {
            (_, ClickTarget::Chart) => Some(self.detail_url()),
            (OverlayMode::Popup, ClickTarget::Overlay) => Some(self.detail_url()),
            (OverlayMode::Popup, ClickTarget::OverlayClose) => {
                self.overlay = OverlayVisibility::Hidden;
                self.set_overlay_hidden(true);
                None
            }
            (OverlayMode::Tooltip, _) => None,
        }
    }

    fn detail_url(&self) -> Url {
        let mut url = self.config.detail_base_url.clone();
        url.query_pairs_mut().append_pair("id", &self.doi);
        url
    }

    fn fail(&mut self) {
        self.phase = Phase::Failed;
        self.overlay = OverlayVisibility::Hidden;
        self.overlay_node = None;
        self.show_indicator("color:red", "No data");
    }

    fn show_indicator(&self, style: &str, text: &str) {
        dom::clear_children(&self.root);
        let span = dom::element("span", &[("style", style)]);
        span.append(NodeRef::new_text(text));
        self.root.append(span);
    }

    fn render(&mut self, score: &NormalizedScore, encoding: &VisualEncoding) {
        dom::clear_children(&self.root);
        if let Some(root) = self.root.as_element() {
            root.attributes.borrow_mut().insert(
                "style",
                "width:64px;height:64px;display:inline-block;position:relative".to_string(),
            );
        }

        let chart_config = serde_json::to_string(encoding).unwrap_or_default();
        let canvas = dom::element(
            "canvas",
            &[
                ("class", "impact-embed-chart"),
                ("width", "400"),
                ("height", "400"),
                ("data-chart-type", self.config.chart_style.as_str()),
                ("data-chart-config", chart_config.as_str()),
            ],
        );
        self.root.append(canvas);

        let overlay = self.build_overlay(score, encoding);
        self.root.append(overlay.clone());
        self.overlay_node = Some(overlay);
        self.overlay = OverlayVisibility::Hidden;
    }

    fn build_overlay(&self, score: &NormalizedScore, encoding: &VisualEncoding) -> NodeRef {
        let (class, role) = match self.config.overlay_mode {
            OverlayMode::Tooltip => ("impact-embed-tooltip", "tooltip"),
            OverlayMode::Popup => ("impact-embed-overlay", "dialog"),
        };
        let overlay = dom::element("div", &[("class", class), ("role", role), ("hidden", "")]);

        for segment in &encoding.segments {
            let row = dom::element("div", &[("class", "impact-embed-metric")]);
            match self.config.icon_set {
                IconSet::Emoji => {
                    row.append(NodeRef::new_text(format!(
                        "{} {}: {}",
                        segment.glyph, segment.label, segment.tier_label
                    )));
                }
                IconSet::FontAwesome => {
                    row.append(dom::element("i", &[("class", segment.glyph)]));
                    row.append(NodeRef::new_text(format!(
                        " {}: {}",
                        segment.label, segment.tier_label
                    )));
                }
            }
            overlay.append(row);
        }

        if let Some(count) = score.citation_count {
            let row = dom::element("div", &[("class", "impact-embed-citations")]);
            row.append(NodeRef::new_text(format!("Citation count: {count}")));
            overlay.append(row);
        }

        if self.config.overlay_mode == OverlayMode::Popup {
            let close = dom::element(
                "button",
                &[("class", "impact-embed-close"), ("type", "button")],
            );
            close.append(NodeRef::new_text("\u{00D7}"));
            overlay.append(close);
        }

        overlay
    }

    fn set_overlay_hidden(&self, hidden: bool) {
        let Some(node) = &self.overlay_node else {
            return;
        };
        let Some(element) = node.as_element() else {
            return;
        };
        let mut attrs = element.attributes.borrow_mut();
        if hidden {
            attrs.insert("hidden", String::new());
        } else {
            attrs.remove("hidden");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChartStyle, EmbedConfig};
    use reqwest::Client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, overlay_mode: OverlayMode) -> Arc<ResolvedConfig> {
        let config = EmbedConfig {
            scores_base_url: format!("{}/paper/scores", server.uri()),
            detail_base_url: "https://example.org/details".to_string(),
            chart_runtime_url: format!("{}/chart.js", server.uri()),
            datalabel_plugin_url: format!("{}/plugin.js", server.uri()),
            icon_stylesheet_url: format!("{}/icons.css", server.uri()),
            overlay_mode,
            ..EmbedConfig::default()
        };
        Arc::new(config.resolve().expect("test config is valid"))
    }

    async fn mount_assets(server: &MockServer) {
        for route in ["/chart.js", "/plugin.js", "/icons.css"] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
                .mount(server)
                .await;
        }
    }

    fn controller(config: &Arc<ResolvedConfig>, doi: &str) -> BadgeController {
        let root = dom::element("div", &[("class", "bip-embed"), ("data-doi", doi)]);
        BadgeController::new(root, doi.to_string(), Arc::clone(config))
    }

    async fn rendered_controller(
        server: &MockServer,
        overlay_mode: OverlayMode,
    ) -> (BadgeController, Arc<ResolvedConfig>) {
        // アセットのモックを先に積む。スコアは残りを拾うキャッチオール。
        mount_assets(server).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "doi": "10.1/x",
                "imp_class": "C1",
                "inf_class": "C3",
                "pop_class": "C5",
                "cc_class": "C2",
                "cc": 42
            })))
            .mount(server)
            .await;

        let config = config_for(server, overlay_mode);
        let mut controller = controller(&config, "10.1/x");
        let scores = ScoreClient::new(Client::new(), config.scores_base_url.clone());
        let assets = AssetLoader::new(Client::new(), &config);
        controller.activate(&scores, &assets).await;
        (controller, config)
    }

    #[tokio::test]
    async fn successful_activation_renders_chart_and_hidden_overlay() {
        let server = MockServer::start().await;
        let (controller, _config) = rendered_controller(&server, OverlayMode::Tooltip).await;

        assert_eq!(controller.phase(), Phase::Rendered);
        assert_eq!(controller.overlay_visibility(), OverlayVisibility::Hidden);

        let html = controller.root().to_string();
        assert!(html.contains("data-chart-type=\"doughnut\""));
        assert!(html.contains("data-chart-config"));
        assert!(html.contains("Top 0.01%"));
        assert!(html.contains("Top 90%"));
        assert!(html.contains("Citation count: 42"));
        assert!(html.contains("hidden"));
    }

    #[tokio::test]
    async fn hover_toggles_overlay_visibility() {
        let server = MockServer::start().await;
        let (mut controller, _config) = rendered_controller(&server, OverlayMode::Tooltip).await;

        controller.pointer_enter();
        assert_eq!(controller.overlay_visibility(), OverlayVisibility::Shown);
        assert!(!controller.root().to_string().contains("hidden"));

        controller.pointer_leave();
        assert_eq!(controller.overlay_visibility(), OverlayVisibility::Hidden);
        assert!(controller.root().to_string().contains("hidden"));
    }

    #[tokio::test]
    async fn chart_click_navigates_to_detail_page_with_encoded_identifier() {
        let server = MockServer::start().await;
        let (mut controller, _config) = rendered_controller(&server, OverlayMode::Tooltip).await;

        let url = controller.click(ClickTarget::Chart).expect("navigates");
        assert_eq!(url.as_str(), "https://example.org/details?id=10.1%2Fx");

        // ツールチップ型ではオーバーレイ本体のクリックは遷移しない。
        assert!(controller.click(ClickTarget::Overlay).is_none());
    }

    #[tokio::test]
    async fn popup_overlay_click_navigates_and_close_only_hides() {
        let server = MockServer::start().await;
        let (mut controller, _config) = rendered_controller(&server, OverlayMode::Popup).await;

        assert!(controller.root().to_string().contains("impact-embed-close"));

        controller.pointer_enter();
        assert!(controller.click(ClickTarget::Overlay).is_some());

        assert!(controller.click(ClickTarget::OverlayClose).is_none());
        assert_eq!(controller.overlay_visibility(), OverlayVisibility::Hidden);
        assert!(controller.root().to_string().contains("hidden"));
    }

    #[tokio::test]
    async fn fetch_failure_is_terminal_and_inert() {
        let server = MockServer::start().await;
        mount_assets(&server).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let config = config_for(&server, OverlayMode::Tooltip);
        let mut controller = controller(&config, "10.1/missing");
        let scores = ScoreClient::new(Client::new(), config.scores_base_url.clone());
        let assets = AssetLoader::new(Client::new(), &config);
        controller.activate(&scores, &assets).await;

        assert_eq!(controller.phase(), Phase::Failed);
        let html = controller.root().to_string();
        assert!(html.contains("No data"));
        assert!(!html.contains("canvas"));

        // 失敗後の操作はすべて no-op。
        controller.pointer_enter();
        assert_eq!(controller.overlay_visibility(), OverlayVisibility::Hidden);
        assert!(controller.click(ClickTarget::Chart).is_none());
    }

    #[tokio::test]
    async fn dependency_failure_blocks_rendering_after_successful_fetch() {
        let server = MockServer::start().await;
        for route in ["/chart.js", "/plugin.js", "/icons.css"] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(503))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "doi": "10.1/x",
                "imp_class": "C1"
            })))
            .mount(&server)
            .await;

        let config = config_for(&server, OverlayMode::Tooltip);
        let mut controller = controller(&config, "10.1/x");
        let scores = ScoreClient::new(Client::new(), config.scores_base_url.clone());
        let assets = AssetLoader::new(Client::new(), &config);
        controller.activate(&scores, &assets).await;

        assert_eq!(controller.phase(), Phase::Failed);
        assert!(controller.root().to_string().contains("No data"));
    }

    #[tokio::test]
    async fn polar_area_style_is_reflected_in_the_mount_element() {
        let server = MockServer::start().await;
        mount_assets(&server).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "doi": "10.1/x",
                "imp_class": "C2"
            })))
            .mount(&server)
            .await;

        let config = EmbedConfig {
            scores_base_url: format!("{}/paper/scores", server.uri()),
            chart_runtime_url: format!("{}/chart.js", server.uri()),
            datalabel_plugin_url: format!("{}/plugin.js", server.uri()),
            icon_stylesheet_url: format!("{}/icons.css", server.uri()),
            chart_style: ChartStyle::PolarArea,
            ..EmbedConfig::default()
        };
        let config = Arc::new(config.resolve().expect("test config is valid"));
        let mut controller = controller(&config, "10.1/x");
        let scores = ScoreClient::new(Client::new(), config.scores_base_url.clone());
        let assets = AssetLoader::new(Client::new(), &config);
        controller.activate(&scores, &assets).await;

        assert!(
            controller
                .root()
                .to_string()
                .contains("data-chart-type=\"polar-area\"")
        );
    }
}
