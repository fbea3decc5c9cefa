//! Wiki node resolution.
//!
//! A bitable embedded in a wiki space is addressed by the wiki node token,
//! which bitable endpoints reject. The node is looked up to find the real
//! bitable token; a non-bitable node is searched one level deep for bitable
//! children.
use crate::client::LarkClient;
use crate::error::{LarkError, LarkResult};
use crate::types::{ItemPage, TableInfo, WikiNode, WikiNodeEnvelope};
use std::future::Future;

impl LarkClient {
    async fn wiki_node(&self, token: &str) -> LarkResult<WikiNode> {
        let envelope: WikiNodeEnvelope = self
            .get_data("/open-apis/wiki/v2/spaces/get_node", &[("token", token)])
            .await?;
        Ok(envelope.node)
    }

    async fn wiki_children(&self, space_id: &str, parent: &str) -> LarkResult<Vec<WikiNode>> {
        let path = format!("/open-apis/wiki/v2/spaces/{space_id}/nodes");
        let page: ItemPage<WikiNode> = self
            .get_data(
                &path,
                &[("page_size", "50"), ("parent_node_token", parent)],
            )
            .await?;
        Ok(page.items)
    }

    /// Map a wiki node token to the bitable token it wraps.
    ///
    /// # Errors
    /// - `NotFound` when the node is not a bitable.
    pub async fn resolve_wiki_token(&self, token: &str) -> LarkResult<String> {
        if let Some(resolved) = self.listings.wiki.get(token) {
            return Ok(resolved.clone());
        }
        let node = self.wiki_node(token).await?;
        let resolved = node
            .bitable_token()
            .ok_or_else(|| {
                LarkError::NotFound(format!(
                    "wiki node {token} is a {} rather than a bitable",
                    node.obj_type
                ))
            })?
            .to_string();
        tracing::debug!(wiki_token = %token, bitable_token = %resolved, "wiki token resolved");
        self.listings
            .wiki
            .insert(token.to_string(), resolved.clone());
        Ok(resolved)
    }

    /// Tables reachable from a wiki node: its own tables when it is a bitable,
    /// otherwise the tables of its bitable children.
    pub(crate) async fn wiki_tables(&self, token: &str) -> LarkResult<Vec<TableInfo>> {
        let node = self.wiki_node(token).await?;
        if let Some(bitable) = node.bitable_token() {
            self.listings
                .wiki
                .insert(token.to_string(), bitable.to_string());
            return self.fetch_tables(bitable).await;
        }

        tracing::debug!(
            wiki_token = %token,
            obj_type = %node.obj_type,
            "wiki node is not a bitable; searching children"
        );
        let children = self.wiki_children(&node.space_id, &node.node_token).await?;
        let mut tables = Vec::new();
        for child in &children {
            let Some(bitable) = child.bitable_token() else {
                continue;
            };
            match self.fetch_tables(bitable).await {
                Ok(found) => tables.extend(found),
                Err(err) => {
                    tracing::warn!(error = %err, title = %child.title, "skipping wiki child bitable");
                }
            }
        }
        if tables.is_empty() {
            return Err(LarkError::NotFound(format!(
                "no bitable tables under wiki node {token}"
            )));
        }
        Ok(tables)
    }

    /// Run `op` against `app_token`, retrying once with the resolved bitable
    /// token when the API signals that `app_token` is a wiki node.
    pub(crate) async fn with_resolved_token<T, F, Fut>(
        &self,
        app_token: &str,
        op: F,
    ) -> LarkResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = LarkResult<T>>,
    {
        let known = self
            .listings
            .wiki
            .get(app_token)
            .map(|entry| entry.clone());
        if let Some(resolved) = known {
            return op(resolved).await;
        }
        match op(app_token.to_string()).await {
            Err(err) if err.is_wiki_hint() => {
                let resolved = self.resolve_wiki_token(app_token).await?;
                op(resolved).await
            }
            other => other,
        }
    }
}
