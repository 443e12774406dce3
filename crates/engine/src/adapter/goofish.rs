// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Goofish (闲鱼) search adapter over the mtop h5 gateway.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::{json, Value};

use crate::adapter::classify::{classify_ret, classify_status};
use crate::adapter::sign::sign;
use crate::adapter::{SearchError, SiteAdapter};
use crate::config::{AdapterConfig, HttpConfig};
use crate::model::{epoch_ms, Item};
use crate::token::SessionToken;

const SITE: &str = "goofish";
const API_NAME: &str = "mtop.taobao.idlemtopsearch.pc.search";

pub struct GoofishAdapter {
    config: AdapterConfig,
    client: reqwest::Client,
}

impl GoofishAdapter {
    pub fn new(config: AdapterConfig, http: &HttpConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(http.connect_timeout)
            .timeout(http.read_timeout)
            .user_agent(http.user_agent.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("build http client: {e}"))?;
        Ok(Self { config, client })
    }

    async fn search_page(
        &self,
        query: &str,
        page: u64,
        rows: u64,
        token: &SessionToken,
    ) -> Result<Vec<Item>, SearchError> {
        let rows = rows.min(self.config.max_rows_per_page);
        let body = json!({
            "keyword": query,
            "pageNumber": page,
            "rowsPerPage": rows,
            "sortValue": "publish",
            "sortField": "create",
        })
        .to_string();
        let ts = epoch_ms();
        let signature = sign(&token.token_seed, ts, &self.config.app_key, &body);
        let ts_str = ts.to_string();

        let url = format!("{}{}", self.config.base_url, self.config.search_endpoint);
        let request = self
            .client
            .get(&url)
            .query(&[
                ("jsv", "2.7.2"),
                ("appKey", self.config.app_key.as_str()),
                ("t", ts_str.as_str()),
                ("sign", signature.as_str()),
                ("api", API_NAME),
                ("v", "1.0"),
                ("type", "originaljson"),
                ("dataType", "json"),
                ("data", body.as_str()),
            ])
            .header(reqwest::header::COOKIE, token.cookie_header());

        let response = request
            .send()
            .await
            .map_err(|e| SearchError::Transient(format!("request: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SearchError::Transient(format!("read body: {e}")))?;
        if !status.is_success() {
            return Err(classify_status(status.as_u16(), excerpt(&text)));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| SearchError::Transient(format!("malformed payload: {e}")))?;

        let ret = value
            .get("ret")
            .and_then(|v| v.as_array())
            .map(|parts| {
                parts.iter().filter_map(|p| p.as_str()).collect::<Vec<_>>().join(";")
            })
            .unwrap_or_default();
        if let Some(err) = classify_ret(&ret) {
            return Err(err);
        }

        let items = parse_items(&value, query);
        if items.is_empty() {
            return Err(SearchError::EmptyPage);
        }
        Ok(items)
    }
}

impl SiteAdapter for GoofishAdapter {
    fn search<'a>(
        &'a self,
        query: &'a str,
        page: u64,
        rows: u64,
        token: &'a SessionToken,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Item>, SearchError>> + Send + 'a>> {
        Box::pin(self.search_page(query, page, rows, token))
    }

    fn request_delay(&self) -> Duration {
        self.config.request_delay
    }

    fn site(&self) -> &str {
        SITE
    }
}

fn excerpt(text: &str) -> &str {
    let end = text
        .char_indices()
        .take_while(|(i, _)| *i < 200)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    &text[..end]
}

/// Extract items from a search payload, in server order.
///
/// Field paths are navigated defensively: a record missing its id is
/// dropped, every other missing field degrades to a default.
pub fn parse_items(value: &Value, query: &str) -> Vec<Item> {
    let Some(results) = value
        .pointer("/data/resultList")
        .and_then(|v| v.as_array())
    else {
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|entry| {
            let main = entry.pointer("/data/item/main")?;
            let ex = main.get("exContent")?;
            let detail = ex.pointer("/detailParams");

            let id = string_at(ex, "/itemId")
                .or_else(|| detail.and_then(|d| string_at(d, "/itemId")))?;

            let title = string_at(ex, "/title")
                .or_else(|| detail.and_then(|d| string_at(d, "/title")))
                .unwrap_or_default();

            let price = ex
                .pointer("/price")
                .and_then(|v| v.as_array())
                .map(|parts| {
                    parts
                        .iter()
                        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                        .collect::<String>()
                })
                .and_then(|text| parse_price(&text))
                .or_else(|| {
                    detail
                        .and_then(|d| string_at(d, "/soldPrice"))
                        .and_then(|s| parse_price(&s))
                })
                .unwrap_or(0.0);

            let publish_time = main
                .pointer("/clickParam/args/publishTime")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse::<u64>().ok());

            let images = string_at(ex, "/picUrl")
                .map(|pic| vec![absolute_url(&pic)])
                .unwrap_or_default();

            Some(Item {
                url: format!("https://www.goofish.com/item?id={id}"),
                title,
                price: price.max(0.0),
                location: string_at(ex, "/area").unwrap_or_default(),
                publish_time,
                images,
                seller: detail.and_then(|d| string_at(d, "/userNick")).unwrap_or_default(),
                category: main
                    .pointer("/clickParam/args/cCatId")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_owned(),
                query: query.to_owned(),
                site: SITE.to_owned(),
                id,
            })
        })
        .collect()
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(|v| v.as_str()).map(str::to_owned)
}

/// Parse a price text like `¥1,500.00`, keeping digits and the point.
fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String =
        text.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    cleaned.parse().ok()
}

fn absolute_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        url.to_owned()
    }
}

#[cfg(test)]
#[path = "goofish_tests.rs"]
mod tests;
