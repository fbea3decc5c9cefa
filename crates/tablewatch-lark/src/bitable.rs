//! Bitable discovery and record endpoints.
use crate::client::{Cached, LarkClient};
use crate::error::LarkResult;
use crate::types::{
    Bitable, CreatedRecord, DriveFilePage, FetchedRecord, Field, ItemPage, RawField, RawTable,
    RecordEnvelope, TableInfo,
};
use crate::value::FieldMap;
use serde_json::json;
use tokio::time::Instant;

const DRIVE_PAGE_SIZE: &str = "200";
const FIELD_PAGE_SIZE: &str = "100";
const MAX_PAGES: usize = 20;

impl LarkClient {
    /// Bitable documents in the app's drive, served from cache while fresh.
    pub async fn list_bitables(&self) -> LarkResult<Vec<Bitable>> {
        let key = self.config.app_id.clone();
        if let Some(entry) = self.listings.bitables.get(&key)
            && entry.expires_at > Instant::now()
        {
            return Ok(entry.value.clone());
        }

        let mut bitables = Vec::new();
        let mut page_token: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let mut query = vec![("page_size", DRIVE_PAGE_SIZE)];
            if let Some(token) = page_token.as_deref() {
                query.push(("page_token", token));
            }
            let page: DriveFilePage = self.get_data("/open-apis/drive/v1/files", &query).await?;
            bitables.extend(
                page.files
                    .into_iter()
                    .filter(|file| file.kind == "bitable")
                    .map(|file| Bitable {
                        app_token: file.token,
                        name: file.name,
                        url: file.url,
                    }),
            );
            match page.next_page_token {
                Some(next) if page.has_more && !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        tracing::debug!(count = bitables.len(), "bitables listed");
        self.listings.bitables.insert(
            key,
            Cached {
                value: bitables.clone(),
                expires_at: Instant::now() + self.config.listing_ttl,
            },
        );
        Ok(bitables)
    }

    /// Tables of a bitable. `is_wiki` forces wiki resolution; otherwise wiki
    /// resolution is attempted only when the API hints at a wiki token.
    pub async fn list_tables(&self, app_token: &str, is_wiki: bool) -> LarkResult<Vec<TableInfo>> {
        let key = format!("{app_token}:{is_wiki}");
        if let Some(entry) = self.listings.tables.get(&key)
            && entry.expires_at > Instant::now()
        {
            return Ok(entry.value.clone());
        }

        let tables = if is_wiki {
            self.wiki_tables(app_token).await?
        } else {
            match self.fetch_tables(app_token).await {
                Err(err) if err.is_wiki_hint() => {
                    tracing::info!(%app_token, "bitable lookup hinted at a wiki token");
                    self.wiki_tables(app_token).await?
                }
                other => other?,
            }
        };

        self.listings.tables.insert(
            key,
            Cached {
                value: tables.clone(),
                expires_at: Instant::now() + self.config.listing_ttl,
            },
        );
        Ok(tables)
    }

    pub(crate) async fn fetch_tables(&self, app_token: &str) -> LarkResult<Vec<TableInfo>> {
        let path = format!("/open-apis/bitable/v1/apps/{app_token}/tables");
        let page: ItemPage<RawTable> = self.get_data(&path, &[("page_size", "100")]).await?;
        Ok(page
            .items
            .into_iter()
            .filter(|table| !table.table_id.is_empty())
            .map(|table| TableInfo {
                table_id: table.table_id,
                name: table.name,
                app_token: app_token.to_string(),
            })
            .collect())
    }

    pub async fn list_fields(&self, app_token: &str, table_id: &str) -> LarkResult<Vec<Field>> {
        self.with_resolved_token(app_token, |token| async move {
            let path = format!("/open-apis/bitable/v1/apps/{token}/tables/{table_id}/fields");
            let mut fields = Vec::new();
            let mut page_token: Option<String> = None;
            for _ in 0..MAX_PAGES {
                let mut query = vec![("user_id_type", "user_id"), ("page_size", FIELD_PAGE_SIZE)];
                if let Some(next) = page_token.as_deref() {
                    query.push(("page_token", next));
                }
                let page: ItemPage<RawField> = self.get_data(&path, &query).await?;
                fields.extend(page.items.into_iter().map(Field::from));
                match page.page_token {
                    Some(next) if page.has_more && !next.is_empty() => page_token = Some(next),
                    _ => break,
                }
            }
            Ok(fields)
        })
        .await
    }

    /// Insert one record and return its id.
    pub async fn create_record(
        &self,
        app_token: &str,
        table_id: &str,
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> LarkResult<String> {
        let body = json!({ "fields": fields });
        self.with_resolved_token(app_token, |token| {
            let body = &body;
            async move {
                let path = format!("/open-apis/bitable/v1/apps/{token}/tables/{table_id}/records");
                let created: RecordEnvelope<CreatedRecord> = self
                    .post_data(&path, &[("user_id_type", "user_id")], body)
                    .await?;
                Ok(created.record.record_id)
            }
        })
        .await
    }

    /// Current field values of one record.
    pub async fn get_record(
        &self,
        app_token: &str,
        table_id: &str,
        record_id: &str,
    ) -> LarkResult<FieldMap> {
        self.with_resolved_token(app_token, |token| async move {
            let path = format!(
                "/open-apis/bitable/v1/apps/{token}/tables/{table_id}/records/{record_id}"
            );
            let fetched: RecordEnvelope<FetchedRecord> =
                self.get_data(&path, &[("user_id_type", "user_id")]).await?;
            Ok(fetched.record.fields)
        })
        .await
    }
}
