use std::cell::Cell;

use html5ever::{LocalName, QualName, namespace_url, ns};
use kuchiki::traits::TendrilSink;
use kuchiki::{Attribute, ExpandedName, NodeRef};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::assets::RenderAssets;

/// エンジンが操作するホストページ。
///
/// パース済みの HTML 文書と準備完了シグナルを束ねる。エンジンはプレース
/// ホルダ要素の子孫しか書き換えない。
pub struct HostPage {
    document: NodeRef,
    ready: watch::Receiver<bool>,
    assets_injected: Cell<bool>,
}

/// まだパース中の文書に対する準備完了シグナル。
pub struct PageReady {
    sender: watch::Sender<bool>,
}

impl PageReady {
    /// 文書の準備完了を通知する。スキャン待ちの [`HostPage`] を起こす。
    pub fn complete(self) {
        let _ = self.sender.send(true);
    }
}

impl HostPage {
    /// パース済みの文書からページを作る。即座にスキャン可能。
    pub fn from_html(html: &str) -> Self {
        let (sender, ready) = watch::channel(true);
        drop(sender);
        Self {
            document: kuchiki::parse_html().one(html),
            ready,
            assets_injected: Cell::new(false),
        }
    }

    /// まだ読み込み中の文書としてページを作る。
    /// スキャンは [`PageReady::complete`] が呼ばれるまで遅延される。
    pub fn deferred(html: &str) -> (Self, PageReady) {
        let (sender, ready) = watch::channel(false);
        let page = Self {
            document: kuchiki::parse_html().one(html),
            ready,
            assets_injected: Cell::new(false),
        };
        (page, PageReady { sender })
    }

    pub(crate) async fn ready(&self) {
        let mut ready = self.ready.clone();
        if ready.wait_for(|complete| *complete).await.is_err() {
            warn!("readiness signal dropped before completion; scanning anyway");
        }
    }

    pub(crate) fn document(&self) -> &NodeRef {
        &self.document
    }

    /// 文書全体を HTML として直列化する。
    pub fn to_html(&self) -> String {
        self.document.to_string()
    }

    /// 取得済みのレンダリング依存を `<head>` へ注入する。ページにつき一度だけ。
    /// 既に注入済みのマーカーがあれば何もしない。
    pub(crate) fn inject_assets(&self, assets: &RenderAssets) {
        if self.assets_injected.get() {
            return;
        }
        if self
            .document
            .select_first("[data-impact-embed-asset]")
            .is_ok()
        {
            debug!("render assets already present in document");
            self.assets_injected.set(true);
            return;
        }
        let Ok(head) = self.document.select_first("head") else {
            warn!("document has no <head>; render assets not injected");
            return;
        };

        for (kind, body) in [
            ("chart-runtime", &assets.chart_runtime),
            ("datalabel-plugin", &assets.datalabel_plugin),
        ] {
            let script = element("script", &[("data-impact-embed-asset", kind)]);
            script.append(NodeRef::new_text(body.clone()));
            head.as_node().append(script);
        }
        let style = element("style", &[("data-impact-embed-asset", "icon-stylesheet")]);
        style.append(NodeRef::new_text(assets.icon_stylesheet.clone()));
        head.as_node().append(style);

        self.assets_injected.set(true);
        debug!("render assets injected into document head");
    }
}

pub(crate) fn element(name: &str, attrs: &[(&str, &str)]) -> NodeRef {
    NodeRef::new_element(
        QualName::new(None, ns!(html), LocalName::from(name)),
        attrs.iter().map(|(name, value)| {
            (
                ExpandedName::new(ns!(), LocalName::from(*name)),
                Attribute {
                    prefix: None,
                    value: (*value).to_string(),
                },
            )
        }),
    )
}

pub(crate) fn clear_children(node: &NodeRef) {
    while let Some(child) = node.first_child() {
        child.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_builder_sets_name_and_attributes() {
        let node = element("span", &[("class", "x"), ("data-doi", "10.1/x")]);
        let data = node.as_element().expect("is an element");
        assert_eq!(&*data.name.local, "span");
        let attrs = data.attributes.borrow();
        assert_eq!(attrs.get("class"), Some("x"));
        assert_eq!(attrs.get("data-doi"), Some("10.1/x"));
    }

    #[test]
    fn clear_children_empties_a_subtree() {
        let parent = element("div", &[]);
        parent.append(element("span", &[]));
        parent.append(NodeRef::new_text("text"));
        clear_children(&parent);
        assert!(parent.first_child().is_none());
    }

    #[test]
    fn inject_assets_is_idempotent_per_page() {
        let page = HostPage::from_html("<html><head></head><body></body></html>");
        let assets = RenderAssets {
            chart_runtime: "runtime".to_string(),
            datalabel_plugin: "plugin".to_string(),
            icon_stylesheet: "styles".to_string(),
        };
        page.inject_assets(&assets);
        page.inject_assets(&assets);

        let html = page.to_html();
        assert_eq!(html.matches("data-impact-embed-asset").count(), 3);
    }

    #[tokio::test]
    async fn deferred_page_becomes_ready_on_signal() {
        let (page, ready) = HostPage::deferred("<html><body></body></html>");
        futures::future::join(page.ready(), async move { ready.complete() }).await;
    }
}
