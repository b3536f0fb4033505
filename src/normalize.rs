//! Detail payload normalization
//!
//! Turns the raw `/anos/{year}` object into a [`CollectedRecord`]. Nothing in
//! here fails: malformed fields become `None`.

use crate::CollectedRecord;
use serde_json::Value;

/// Oldest accepted model year
pub const MIN_MODEL_YEAR: i64 = 1900;

/// Newest accepted model year. The API reports brand-new vehicles as 32000.
pub const MAX_MODEL_YEAR: i64 = 2026;

/// Normalize a detail payload.
///
/// Returns `None` for empty or falsy payloads and for anything that is not a
/// JSON object.
pub fn normalize(detail: &Value, brand_name: &str, model_name: &str) -> Option<CollectedRecord> {
    if is_falsy(detail) {
        return None;
    }
    let fields = detail.as_object()?;

    let valor_str = field_string(fields.get("Valor"));
    let valor = parse_brl_currency(valor_str.as_deref());

    Some(CollectedRecord {
        marca: brand_name.to_string(),
        modelo: model_name.to_string(),
        ano_modelo: validate_model_year(fields.get("AnoModelo")),
        combustivel: field_string(fields.get("Combustivel")),
        valor_str,
        valor,
        codigo_fipe: field_string(fields.get("CodigoFipe")),
        sigla_combustivel: field_string(fields.get("SiglaCombustivel")),
        data_consulta: field_string(fields.get("DataConsulta")),
    })
}

/// Keep `AnoModelo` only if it is a JSON integer in
/// [`MIN_MODEL_YEAR`, `MAX_MODEL_YEAR`].
pub fn validate_model_year(value: Option<&Value>) -> Option<i32> {
    let year = value?.as_i64()?;
    if (MIN_MODEL_YEAR..=MAX_MODEL_YEAR).contains(&year) {
        i32::try_from(year).ok()
    } else {
        None
    }
}

/// Parse a Brazilian currency string such as `"R$ 12.345,67"` into `12345.67`.
///
/// Strips the `R$` marker, drops `.` thousands separators and turns the
/// decimal comma into a period. Absent, empty, non-numeric and non-finite
/// input yields `None`.
pub fn parse_brl_currency(raw: Option<&str>) -> Option<f64> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }
    let cleaned = raw
        .replace("R$", "")
        .replace('.', "")
        .replace(',', ".");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

fn field_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
