use serde::Serialize;
use thiserror::Error;
use url::Url;

/// 既定のスコア取得エンドポイント。識別子はパスセグメントとして後置される。
pub const DEFAULT_SCORES_BASE_URL: &str = "https://bip-api.imsi.athenarc.gr/paper/scores";
/// 既定の詳細ページ。`?id={identifier}` を付けて新しいブラウジングコンテキストで開く。
pub const DEFAULT_DETAIL_BASE_URL: &str = "https://bip.imsi.athenarc.gr/site/details";
pub const DEFAULT_CHART_RUNTIME_URL: &str = "https://cdn.jsdelivr.net/npm/chart.js";
pub const DEFAULT_DATALABEL_PLUGIN_URL: &str =
    "https://cdn.jsdelivr.net/npm/chartjs-plugin-datalabels";
pub const DEFAULT_ICON_STYLESHEET_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.2/css/all.min.css";

pub const DEFAULT_MARKER_CLASS: &str = "bip-embed";
pub const DEFAULT_IDENTIFIER_ATTR: &str = "data-doi";

/// チャートの描画スタイル。マウント要素の `data-chart-type` にそのまま載る。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartStyle {
    Doughnut,
    PolarArea,
}

impl ChartStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Doughnut => "doughnut",
            Self::PolarArea => "polar-area",
        }
    }
}

/// オーバーレイの対話モード。
///
/// `Tooltip` はホバー中だけ表示され、クリックはチャート上でのみ遷移する。
/// `Popup` は閉じるボタンを持ち、オーバーレイ本体のクリックでも遷移する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    Tooltip,
    Popup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconSet {
    Emoji,
    FontAwesome,
}

/// バッジエンジンの設定値。
///
/// 4種類あった埋め込みスクリプトの差分は {マーカークラス, チャートスタイル,
/// オーバーレイモード, アイコンセット} の組に集約されている。URL はホストが
/// 差し替えられるよう文字列で受け、[`crate::EmbedEngine::new`] が検証する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedConfig {
    pub scores_base_url: String,
    pub detail_base_url: String,
    pub chart_runtime_url: String,
    pub datalabel_plugin_url: String,
    pub icon_stylesheet_url: String,
    pub marker_class: String,
    pub identifier_attr: String,
    pub chart_style: ChartStyle,
    pub overlay_mode: OverlayMode,
    pub icon_set: IconSet,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            scores_base_url: DEFAULT_SCORES_BASE_URL.to_string(),
            detail_base_url: DEFAULT_DETAIL_BASE_URL.to_string(),
            chart_runtime_url: DEFAULT_CHART_RUNTIME_URL.to_string(),
            datalabel_plugin_url: DEFAULT_DATALABEL_PLUGIN_URL.to_string(),
            icon_stylesheet_url: DEFAULT_ICON_STYLESHEET_URL.to_string(),
            marker_class: DEFAULT_MARKER_CLASS.to_string(),
            identifier_attr: DEFAULT_IDENTIFIER_ATTR.to_string(),
            chart_style: ChartStyle::Doughnut,
            overlay_mode: OverlayMode::Tooltip,
            icon_set: IconSet::Emoji,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

/// 検証済みの内部設定。構築後は読み取り専用。
#[derive(Debug)]
pub(crate) struct ResolvedConfig {
    pub(crate) scores_base_url: Url,
    pub(crate) detail_base_url: Url,
    pub(crate) chart_runtime_url: Url,
    pub(crate) datalabel_plugin_url: Url,
    pub(crate) icon_stylesheet_url: Url,
    pub(crate) marker_class: String,
    pub(crate) identifier_attr: String,
    pub(crate) chart_style: ChartStyle,
    pub(crate) overlay_mode: OverlayMode,
    pub(crate) icon_set: IconSet,
}

impl EmbedConfig {
    /// 設定値を検証し、型付きの内部設定へ変換する。
    ///
    /// # Errors
    /// URL のパースに失敗した場合、あるいはマーカークラス・識別子属性が
    /// セレクタとして成立しない場合は [`ConfigError`] を返す。
    pub(crate) fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        Ok(ResolvedConfig {
            scores_base_url: parse_url("scores_base_url", &self.scores_base_url)?,
            detail_base_url: parse_url("detail_base_url", &self.detail_base_url)?,
            chart_runtime_url: parse_url("chart_runtime_url", &self.chart_runtime_url)?,
            datalabel_plugin_url: parse_url("datalabel_plugin_url", &self.datalabel_plugin_url)?,
            icon_stylesheet_url: parse_url("icon_stylesheet_url", &self.icon_stylesheet_url)?,
            marker_class: validate_name("marker_class", self.marker_class)?,
            identifier_attr: validate_name("identifier_attr", self.identifier_attr)?,
            chart_style: self.chart_style,
            overlay_mode: self.overlay_mode,
            icon_set: self.icon_set,
        })
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

/// クラス名・属性名として CSS セレクタに埋め込める形であることを確かめる。
fn validate_name(name: &'static str, value: String) -> Result<String, ConfigError> {
    let well_formed = !value.is_empty()
        && !value.starts_with(|c: char| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if well_formed {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("must be a CSS identifier, got {value:?}"),
        })
    }
}
