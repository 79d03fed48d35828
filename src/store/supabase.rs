use super::{FactRecord, FactStore};
use crate::error::StoreError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, error, instrument};

const TABLE: &str = "countries";

/// Facts in a Supabase `countries` table, reached through its PostgREST API.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    base_url: String,
    anon_key: String,
    client: Client,
}

impl SupabaseStore {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let base_url = url.into().trim_end_matches('/').to_string();
        Self { base_url, anon_key: anon_key.into(), client: Client::new() }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, TABLE)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    async fn checked(response: Result<Response, reqwest::Error>) -> Result<Response, StoreError> {
        let response = response.map_err(|e| {
            error!(error = %e, "Supabase request failed");
            StoreError::Http(e.to_string())
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        error!(%status, error = %message, "Supabase API error");
        Err(StoreError::Api { status: status.as_u16(), message })
    }
}

/// Query parameters selecting the row for `name`.
fn lookup_query(name: &str) -> [(&'static str, String); 2] {
    [("select", "name,fun_fact".to_string()), ("name", format!("eq.{}", name))]
}

#[async_trait]
impl FactStore for SupabaseStore {
    #[instrument(target = "flag_quiz::store", skip(self))]
    async fn lookup(&self, name: &str) -> Result<Option<FactRecord>, StoreError> {
        let request = self.authorized(self.client.get(self.table_url())).query(&lookup_query(name));
        let response = Self::checked(request.send().await).await?;
        let body = response.text().await.map_err(|e| StoreError::Http(e.to_string()))?;
        // PostgREST answers with an array; zero rows is a miss.
        let rows: Vec<FactRecord> = serde_json::from_str(&body)?;
        debug!(rows = rows.len(), "Supabase lookup");
        Ok(rows.into_iter().next())
    }

    #[instrument(target = "flag_quiz::store", skip(self, record), fields(name = %record.name))]
    async fn upsert(&self, record: FactRecord) -> Result<(), StoreError> {
        let request = self
            .authorized(self.client.post(self.table_url()))
            .query(&[("on_conflict", "name")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[record]);
        Self::checked(request.send().await).await?;
        debug!("Supabase upsert accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_url_ignores_trailing_slash() {
        let store = SupabaseStore::new("https://demo.supabase.co/", "anon");
        assert_eq!(store.table_url(), "https://demo.supabase.co/rest/v1/countries");
    }

    #[test]
    fn lookup_filters_by_exact_name() {
        let query = lookup_query("South Africa");
        assert_eq!(query[0], ("select", "name,fun_fact".to_string()));
        assert_eq!(query[1], ("name", "eq.South Africa".to_string()));
    }

    #[test]
    fn rows_decode_with_missing_fact() {
        let rows: Vec<FactRecord> = serde_json::from_str(r#"[{"name":"Japan","fun_fact":null}]"#).unwrap();
        assert_eq!(rows[0].usable_fact(), None);
        let rows: Vec<FactRecord> = serde_json::from_str(r#"[{"name":"Japan"}]"#).unwrap();
        assert_eq!(rows[0].fun_fact, None);
    }
}
