use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tracing::debug;

use super::model::{NormalizedScore, RawScore};

/// スコア取得の失敗。呼び出し側 (バッジ) では単一の失敗として扱われ、
/// 原因はログにだけ残る。
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("scores endpoint URL does not accept path segments")]
    Url,
    #[error("score request failed")]
    Network(#[source] reqwest::Error),
    #[error("scores endpoint returned {status}")]
    Status { status: StatusCode },
    #[error("malformed score payload")]
    Malformed(#[source] reqwest::Error),
}

/// スコアリング API のクライアント。
///
/// 呼び出しごとに 1 回の GET。リトライもキャッシュも持たない。同じ識別子の
/// バッジが同一ページに複数あっても独立に取得する (バッジ数は小さい前提)。
#[derive(Debug, Clone)]
pub struct ScoreClient {
    client: Client,
    base_url: Url,
}

impl ScoreClient {
    pub(crate) fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// 1 文書分のスコアを取得し、順序尺度へ正規化して返す。
    ///
    /// 識別子は 1 つのパスセグメントとしてパーセントエンコードされる
    /// ("10.1/x" は `10.1%2Fx` として送られる)。
    ///
    /// # Errors
    /// トランスポート失敗・非 2xx 応答・ボディの復号失敗はそれぞれ
    /// [`ScoreError`] の対応する変種を返す。部分的成功は存在しない。
    pub async fn fetch_normalized(&self, doi: &str) -> Result<NormalizedScore, ScoreError> {
        let url = self.score_url(doi)?;
        debug!(doi, url = %url, "requesting impact scores");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ScoreError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoreError::Status { status });
        }

        let raw: RawScore = response.json().await.map_err(ScoreError::Malformed)?;
        Ok(NormalizedScore::from_raw(doi, raw))
    }

    fn score_url(&self, doi: &str) -> Result<Url, ScoreError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| ScoreError::Url)?;
            segments.pop_if_empty().push(doi);
        }
        Ok(url)
    }
}
