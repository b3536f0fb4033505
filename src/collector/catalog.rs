//! Cache-first typed lookups over a [`JsonFetcher`]
//!
//! Every lookup consults the [`CacheStore`] before the network. Only responses
//! with the expected shape are memoized, so a bad page is refetched next run.

use crate::cache::{CacheKey, CacheStore};
use crate::fetcher::{paths, FetchError, FetchResult, JsonFetcher};
use crate::{Brand, Model, YearOption};
use serde_json::Value;
use tracing::debug;

/// Catalog view bound to one fetcher and the shared cache
pub struct Catalog<'a> {
    fetcher: &'a dyn JsonFetcher,
    cache: &'a CacheStore,
}

impl<'a> Catalog<'a> {
    /// Bind a fetcher to the cache
    pub fn new(fetcher: &'a dyn JsonFetcher, cache: &'a CacheStore) -> Self {
        Self { fetcher, cache }
    }

    /// All brands
    pub async fn brands(&self) -> FetchResult<Vec<Brand>> {
        let key = CacheKey::Brands;
        if let Some(cached) = self.cache.get(&key) {
            return parse_brands(&cached);
        }

        let body = self.fetcher.get_json(&paths::brands()).await?;
        let brands = parse_brands(&body)?;
        self.cache.set(&key, body);
        Ok(brands)
    }

    /// Models of one brand
    pub async fn models(&self, brand_code: &str) -> FetchResult<Vec<Model>> {
        let key = CacheKey::models(brand_code);
        if let Some(cached) = self.cache.get(&key) {
            return parse_models(&cached, brand_code);
        }

        let body = self.fetcher.get_json(&paths::models(brand_code)).await?;
        // The endpoint wraps models in {"modelos": [...], "anos": [...]};
        // only the model list is memoized.
        let list = match body {
            Value::Object(mut fields) => fields.remove("modelos").unwrap_or(Value::Array(Vec::new())),
            other => {
                return Err(FetchError::MalformedResponse(format!(
                    "expected object for models of brand {brand_code}, got {}",
                    kind_of(&other)
                )))
            }
        };
        let models = parse_models(&list, brand_code)?;
        self.cache.set(&key, list);
        Ok(models)
    }

    /// Year options of one model
    pub async fn years(&self, brand_code: &str, model_code: &str) -> FetchResult<Vec<YearOption>> {
        let key = CacheKey::years(brand_code, model_code);
        if let Some(cached) = self.cache.get(&key) {
            return parse_years(&cached);
        }

        let body = self
            .fetcher
            .get_json(&paths::years(brand_code, model_code))
            .await?;
        let years = parse_years(&body)?;
        self.cache.set(&key, body);
        Ok(years)
    }

    /// Raw detail payload of one leaf.
    ///
    /// An empty object is returned as-is (and not memoized); the normalizer
    /// turns it into "no record".
    pub async fn detail(&self, brand_code: &str, model_code: &str, year_code: &str) -> FetchResult<Value> {
        let key = CacheKey::detail(brand_code, model_code, year_code);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let body = self
            .fetcher
            .get_json(&paths::detail(brand_code, model_code, year_code))
            .await?;
        match &body {
            Value::Object(fields) if fields.is_empty() => {
                debug!(%key, "empty detail payload");
            }
            Value::Object(_) => {
                self.cache.set(&key, body.clone());
            }
            other => {
                return Err(FetchError::MalformedResponse(format!(
                    "expected object for {key}, got {}",
                    kind_of(other)
                )))
            }
        }
        Ok(body)
    }
}

/// Upstream codes arrive as strings or numbers depending on the endpoint
fn code_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn as_list<'v>(value: &'v Value, what: &str) -> FetchResult<&'v Vec<Value>> {
    value.as_array().ok_or_else(|| {
        FetchError::MalformedResponse(format!("expected array of {what}, got {}", kind_of(value)))
    })
}

/// Parse `[{"codigo": "59", "nome": "VW - VolksWagen"}, ...]`
pub fn parse_brands(value: &Value) -> FetchResult<Vec<Brand>> {
    let items = as_list(value, "brands")?;
    if items.iter().any(|item| !item.is_object()) {
        return Err(FetchError::MalformedResponse(
            "brand list contains non-object entries".to_string(),
        ));
    }
    Ok(items
        .iter()
        .filter_map(|item| {
            let code = item.get("codigo").and_then(code_of)?;
            let name = item.get("nome").and_then(Value::as_str).unwrap_or(&code).to_string();
            Some(Brand { code, name })
        })
        .collect())
}

/// Parse `[{"codigo": 5940, "nome": "AMAROK ..."}, ...]`
pub fn parse_models(value: &Value, brand_code: &str) -> FetchResult<Vec<Model>> {
    let items = as_list(value, "models")?;
    Ok(items
        .iter()
        .filter_map(|item| {
            let code = item.get("codigo").and_then(code_of)?;
            let name = item.get("nome").and_then(Value::as_str).unwrap_or(&code).to_string();
            Some(Model {
                code,
                name,
                brand_code: brand_code.to_string(),
            })
        })
        .collect())
}

/// Parse `[{"codigo": "2014-3", "nome": "2014 Diesel"}, ...]` or plain codes
pub fn parse_years(value: &Value) -> FetchResult<Vec<YearOption>> {
    let items = as_list(value, "years")?;
    Ok(items
        .iter()
        .filter_map(|item| match item {
            Value::Object(fields) => Some(YearOption {
                code: fields.get("codigo").and_then(code_of)?,
                name: fields.get("nome").and_then(Value::as_str).map(str::to_string),
            }),
            scalar => code_of(scalar).map(|code| YearOption { code, name: None }),
        })
        .collect())
}
