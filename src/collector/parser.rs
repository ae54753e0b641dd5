//! Jolokia JSON 응답 파서
//!
//! Jolokia API 응답을 파싱하여 평탄한 속성 목록으로 변환합니다.
//!
//! Every attribute is named `<objectName>,attr=<attribute>`. Composite
//! values are flattened with `.` separated keys, e.g.
//! `java.lang:type=Memory,attr=HeapMemoryUsage.used`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::CollectorError;

/// Collector 작업 결과 타입
pub type CollectResult<T> = Result<T, CollectorError>;

/// Primitive attribute value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// 정수
    Integer(i64),
    /// 실수
    Float(f64),
    /// 문자열
    String(String),
    /// 불리언
    Boolean(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Float(v) => f.write_str(&format_float(*v)),
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Shortest round-trip form, switching to `d.ddde±XX` when the decimal
/// exponent is below -4 or at least 6 (`1.23456789e+08`, `1e-05`)
fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let sci = format!("{:e}", v);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return v.to_string();
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if v == 0.0 || (-4..6).contains(&exp) {
        v.to_string()
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Integer(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::Integer(i64::from(v))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Boolean(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

/// One raw query result: a fully qualified `domain:props,attr=name` and
/// either a value or the reason it could not be read
#[derive(Debug, Clone, PartialEq)]
pub struct RawAttribute {
    pub name: String,
    pub value: Result<AttributeValue, String>,
}

impl RawAttribute {
    /// Successfully read attribute
    pub fn ok(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            value: Ok(value.into()),
        }
    }

    /// Error marker for an attribute that could not be read
    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Err(message.into()),
        }
    }
}

/// Jolokia API 응답 구조체
#[derive(Debug, Clone, Deserialize)]
pub struct JolokiaResponse {
    /// 요청 정보
    pub request: RequestInfo,
    /// 응답 값
    #[serde(default)]
    pub value: Option<Value>,
    /// 응답 상태 코드
    pub status: u16,
    /// 타임스탬프 (Unix epoch)
    #[serde(default)]
    pub timestamp: u64,
    /// 에러 메시지 (실패 시)
    #[serde(default)]
    pub error: Option<String>,
    /// 에러 타입 (실패 시)
    #[serde(default)]
    pub error_type: Option<String>,
}

/// 요청 정보
#[derive(Debug, Clone, Deserialize)]
pub struct RequestInfo {
    /// MBean ObjectName (or pattern)
    pub mbean: String,
    /// 요청 타입
    #[serde(rename = "type")]
    pub request_type: String,
}

/// 단일 응답 파싱
pub fn parse_response(json: &str) -> CollectResult<JolokiaResponse> {
    serde_json::from_str(json).map_err(|e| CollectorError::JsonParse(e.to_string()))
}

/// Turn a read response into flat attribute results
///
/// # Errors
/// Returns `CollectorError::Jolokia` for non-200 responses and
/// `CollectorError::JsonParse` when the value is not an attribute map.
pub fn flatten_response(response: &JolokiaResponse) -> CollectResult<Vec<RawAttribute>> {
    if response.status != 200 {
        let message = match (&response.error_type, &response.error) {
            (Some(t), Some(e)) => format!("{}: {}", t, e),
            (None, Some(e)) => e.clone(),
            (Some(t), None) => t.clone(),
            (None, None) => "unknown error".to_string(),
        };
        return Err(CollectorError::Jolokia {
            status: response.status,
            message,
        });
    }

    let map = match &response.value {
        None | Some(Value::Null) => return Ok(vec![]),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(CollectorError::JsonParse(format!(
                "expected an attribute map for {}, got {}",
                response.request.mbean, other
            )))
        }
    };

    let mut result = Vec::new();

    // 와일드카드 응답인지 확인 (값이 모두 객체이고 MBean ObjectName 형태)
    let is_wildcard = !map.is_empty()
        && map
            .iter()
            .all(|(k, v)| k.contains(':') && k.contains('=') && v.is_object());

    if is_wildcard {
        for (mbean, attrs) in map {
            if let Value::Object(attrs) = attrs {
                for (attr, value) in attrs {
                    flatten_value(format!("{},attr={}", mbean, attr), value, &mut result);
                }
            }
        }
    } else {
        for (attr, value) in map {
            flatten_value(
                format!("{},attr={}", response.request.mbean, attr),
                value,
                &mut result,
            );
        }
    }

    Ok(result)
}

fn flatten_value(name: String, value: &Value, out: &mut Vec<RawAttribute>) {
    match value {
        Value::Bool(b) => out.push(RawAttribute::ok(name, *b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push(RawAttribute::ok(name, i));
            } else if let Some(f) = n.as_f64() {
                out.push(RawAttribute::ok(name, f));
            } else {
                let message = format!("number {} cannot be represented as f64", n);
                out.push(RawAttribute::error(name, message));
            }
        }
        Value::String(s) => out.push(RawAttribute::ok(name, s.as_str())),
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_value(format!("{}.{}", name, key), nested, out);
            }
        }
        Value::Null => out.push(RawAttribute::error(name, "attribute value is null")),
        Value::Array(_) => out.push(RawAttribute::error(name, "unsupported array attribute")),
    }
}
