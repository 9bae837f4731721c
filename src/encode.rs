use serde::Serialize;

use crate::config::{ChartStyle, IconSet};
use crate::score::model::{NormalizedScore, Tier};

/// 各メトリクスの弧が持つ目盛りの最大値。filled + remainder は常にこの値。
pub const SCALE_MAX: u8 = 5;

/// バッジが表示する 4 つのメトリクス。描画順もこの並び。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    Impulse,
    Influence,
    Popularity,
    CitationImpact,
}

impl Metric {
    pub const ALL: [Self; 4] = [
        Self::Impulse,
        Self::Influence,
        Self::Popularity,
        Self::CitationImpact,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Impulse => "Impulse",
            Self::Influence => "Influence",
            Self::Popularity => "Popularity",
            Self::CitationImpact => "Citations",
        }
    }

    /// アイコンはメトリクスの同一性だけで決まる。値は色と弧にしか影響しない。
    pub fn glyph(self, icons: IconSet) -> &'static str {
        match icons {
            IconSet::Emoji => match self {
                Self::Impulse => "\u{1F680}",
                Self::Influence => "\u{1F525}",
                Self::Popularity => "\u{1F4AC}",
                Self::CitationImpact => "\u{1F3DB}\u{FE0F}",
            },
            IconSet::FontAwesome => match self {
                Self::Impulse => "fa-solid fa-rocket",
                Self::Influence => "fa-solid fa-fire",
                Self::Popularity => "fa-solid fa-comment",
                Self::CitationImpact => "fa-solid fa-landmark",
            },
        }
    }
}

/// (塗り, 残り) の弧のペア。合計は常に [`SCALE_MAX`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArcPair {
    pub filled: u8,
    pub remainder: u8,
}

impl ArcPair {
    fn for_tier(tier: Tier) -> Self {
        let filled = tier.ordinal().unwrap_or(0);
        Self {
            filled,
            remainder: SCALE_MAX - filled,
        }
    }
}

/// 順位ごとの色。最良の階級が最も濃く、順位が下がるほど薄くなる単調な傾斜。
/// `Unknown` は傾斜の外の固定フォールバック色。
pub fn tier_color(tier: Tier) -> &'static str {
    match tier {
        Tier::Top001 => "#08306b",
        Tier::Top01 => "#2171b5",
        Tier::Top1 => "#4292c6",
        Tier::Top10 => "#9ecae1",
        Tier::Top90 => "#deebf7",
        Tier::Unknown => "#d9d9d9",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricSegment {
    pub metric: Metric,
    pub label: &'static str,
    pub glyph: &'static str,
    pub arc: ArcPair,
    pub color: &'static str,
    pub tier_label: &'static str,
}

/// マウント要素に載る宣言的なチャート記述。入力が同じなら常に同一。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisualEncoding {
    pub chart: ChartStyle,
    pub scale_max: u8,
    pub segments: [MetricSegment; 4],
}

/// 正規化済みスコアを視覚エンコードへ写す純関数。
pub fn encode(score: &NormalizedScore, chart: ChartStyle, icons: IconSet) -> VisualEncoding {
    let segments = Metric::ALL.map(|metric| {
        let tier = tier_of(score, metric);
        MetricSegment {
            metric,
            label: metric.display_name(),
            glyph: metric.glyph(icons),
            arc: ArcPair::for_tier(tier),
            color: tier_color(tier),
            tier_label: tier.label(),
        }
    });
    VisualEncoding {
        chart,
        scale_max: SCALE_MAX,
        segments,
    }
}

pub(crate) fn tier_of(score: &NormalizedScore, metric: Metric) -> Tier {
    match metric {
        Metric::Impulse => score.impulse,
        Metric::Influence => score.influence,
        Metric::Popularity => score.popularity,
        Metric::CitationImpact => score.citation_impact,
    }
}
