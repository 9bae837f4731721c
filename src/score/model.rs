use serde::Deserialize;
use tracing::{debug, warn};

/// スコアリング API が返す生のペイロード。受信後は変更しない。
///
/// 分類コードは "C1".."C5" のカテゴリラベルで届く。未知のフィールドは無視する。
#[derive(Debug, Clone, Deserialize)]
pub struct RawScore {
    pub doi: Option<String>,
    pub imp_class: Option<String>,
    pub inf_class: Option<String>,
    pub pop_class: Option<String>,
    pub cc_class: Option<String>,
    /// 生の被引用数。変換せずそのまま通す。
    pub cc: Option<u64>,
}

/// パーセンタイル階級の順序尺度。
///
/// 対応表の向きはここで一意に固定している: 低いカテゴリコードほど高い順位。
/// "C1" (上位 0.01%) が順位 5 で最良、"C5" が順位 1。表に無いコードは
/// [`Tier::Unknown`] に正規化され、0 や欠損に黙って潰されることはない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Unknown,
    /// Top 90% ("C5")
    Top90,
    /// Top 10% ("C4")
    Top10,
    /// Top 1% ("C3")
    Top1,
    /// Top 0.1% ("C2")
    Top01,
    /// Top 0.01% ("C1")
    Top001,
}

impl Tier {
    /// 分類コードを順位へ写す。全域関数であり、未知のコードは `Unknown`。
    pub fn from_class(code: &str) -> Self {
        match code {
            "C1" => Self::Top001,
            "C2" => Self::Top01,
            "C3" => Self::Top1,
            "C4" => Self::Top10,
            "C5" => Self::Top90,
            _ => Self::Unknown,
        }
    }

    /// 1..=5 の順位。`Unknown` には順位が無い。
    pub fn ordinal(self) -> Option<u8> {
        match self {
            Self::Unknown => None,
            Self::Top90 => Some(1),
            Self::Top10 => Some(2),
            Self::Top1 => Some(3),
            Self::Top01 => Some(4),
            Self::Top001 => Some(5),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "No data",
            Self::Top90 => "Top 90%",
            Self::Top10 => "Top 10%",
            Self::Top1 => "Top 1%",
            Self::Top01 => "Top 0.1%",
            Self::Top001 => "Top 0.01%",
        }
    }

    fn from_optional(metric: &'static str, code: Option<&str>) -> Self {
        let Some(code) = code else {
            debug!(metric, "classification code absent");
            return Self::Unknown;
        };
        let tier = Self::from_class(code);
        if tier == Self::Unknown {
            warn!(metric, code, "unmapped classification code");
        }
        tier
    }
}

/// 1 文書分の正規化済みスコア。[`crate::ScoreClient`] が一度だけ構築する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedScore {
    pub doi: String,
    pub impulse: Tier,
    pub influence: Tier,
    pub popularity: Tier,
    pub citation_impact: Tier,
    pub citation_count: Option<u64>,
}

impl NormalizedScore {
    pub(crate) fn from_raw(requested_doi: &str, raw: RawScore) -> Self {
        Self {
            doi: raw.doi.unwrap_or_else(|| requested_doi.to_string()),
            impulse: Tier::from_optional("impulse", raw.imp_class.as_deref()),
            influence: Tier::from_optional("influence", raw.inf_class.as_deref()),
            popularity: Tier::from_optional("popularity", raw.pop_class.as_deref()),
            citation_impact: Tier::from_optional("citation_impact", raw.cc_class.as_deref()),
            citation_count: raw.cc,
        }
    }
}
