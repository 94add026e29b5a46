// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! PostgREST-compatible HTTP backend (e.g. a hosted Postgres exposing
//! `/rest/v1/<table>`).

use crate::store::{check_ident, Row, StoreError, StoreResult, TableStore};
use crate::utils::http_client;
use reqwest::blocking::{Client, RequestBuilder, Response};
use tracing::debug;

/// Rows fetched per ranged GET; PostgREST servers commonly cap responses here.
pub const PAGE_SIZE: usize = 1000;

pub struct RestStore {
    client: Client,
    base_url: String,
    key: String,
}

impl RestStore {
    /// `key` is the write credential, sent both as `apikey` and as a bearer token.
    pub fn new(base_url: &str, key: &str) -> StoreResult<Self> {
        Ok(Self::with_client(http_client()?, base_url, key))
    }

    pub fn with_client(client: Client, base_url: &str, key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
        }
    }

    fn url(&self, table: &str) -> StoreResult<String> {
        Ok(format!("{}/rest/v1/{}", self.base_url, check_ident(table)?))
    }

    fn send(&self, req: RequestBuilder) -> StoreResult<Response> {
        let resp = req
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .send()?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            Err(StoreError::Status {
                status: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            })
        }
    }
}

/// PostgREST `in.(...)` filter with every value double-quoted.
pub fn in_filter(keys: &[String]) -> String {
    let quoted: Vec<String> = keys
        .iter()
        .map(|k| format!("\"{}\"", k.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

/// Total row count from a `Content-Range` value such as `0-499/1200`.
/// `*` (count not requested) yields `None`.
pub fn content_range_total(v: &str) -> Option<usize> {
    v.rsplit_once('/')?.1.trim().parse().ok()
}

impl TableStore for RestStore {
    fn select(&mut self, table: &str, fields: &[&str]) -> StoreResult<Vec<Row>> {
        let url = self.url(table)?;
        let cols = fields
            .iter()
            .map(|f| check_ident(f))
            .collect::<StoreResult<Vec<_>>>()?;
        let select = cols.join(",");
        let order = cols.first().copied().unwrap_or_default();
        let mut out = Vec::new();
        // The server may cap pages below PAGE_SIZE, so a short page does not
        // mean the end. Stop at the reported total or at an empty page.
        loop {
            let from = out.len();
            let mut req = self
                .client
                .get(&url)
                .query(&[("select", select.as_str())])
                .header("Prefer", "count=exact")
                .header("Range-Unit", "items")
                .header("Range", format!("{}-{}", from, from + PAGE_SIZE - 1));
            if !order.is_empty() {
                req = req.query(&[("order", order)]);
            }
            let resp = self.send(req)?;
            let total = resp
                .headers()
                .get("content-range")
                .and_then(|v| v.to_str().ok())
                .and_then(content_range_total);
            let page: Vec<Row> = resp.json()?;
            let n = page.len();
            out.extend(page);
            debug!(table, fetched = out.len(), ?total, "rest select page");
            if n == 0 || total.is_some_and(|t| out.len() >= t) {
                break;
            }
        }
        Ok(out)
    }

    fn upsert(&mut self, table: &str, key_field: &str, rows: &[Row]) -> StoreResult<()> {
        let url = self.url(table)?;
        let key_field = check_ident(key_field)?;
        let req = self
            .client
            .post(&url)
            .query(&[("on_conflict", key_field)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows);
        self.send(req)?;
        Ok(())
    }

    fn insert(&mut self, table: &str, rows: &[Row]) -> StoreResult<()> {
        let url = self.url(table)?;
        let req = self
            .client
            .post(&url)
            .header("Prefer", "return=minimal")
            .json(rows);
        self.send(req)?;
        Ok(())
    }

    fn delete(&mut self, table: &str, key_field: &str, keys: &[String]) -> StoreResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let url = self.url(table)?;
        let key_field = check_ident(key_field)?;
        let req = self
            .client
            .delete(&url)
            .query(&[(key_field, in_filter(keys))]);
        self.send(req)?;
        Ok(())
    }

    fn delete_all(&mut self, table: &str, key_field: &str) -> StoreResult<()> {
        let url = self.url(table)?;
        let key_field = check_ident(key_field)?;
        let req = self.client.delete(&url).query(&[(key_field, "neq.")]);
        self.send(req)?;
        Ok(())
    }
}
