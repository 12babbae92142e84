use gdbridge_protocol::{LogBody, PhaseStatus, PhaseUpdate, RunBody};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Every `(method, path)` pair the bridge answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Status,
    Errors,
    Run,
    Stop,
    Reload,
    Log,
    SetPhase,
    GetPhase,
    Events,
    Health,
}

impl Route {
    pub const ALL: [Route; 10] = [
        Self::Status,
        Self::Errors,
        Self::Run,
        Self::Stop,
        Self::Reload,
        Self::Log,
        Self::SetPhase,
        Self::GetPhase,
        Self::Events,
        Self::Health,
    ];

    pub fn method(self) -> &'static str {
        match self {
            Self::Status | Self::Errors | Self::GetPhase | Self::Events | Self::Health => "GET",
            Self::Run | Self::Stop | Self::Reload | Self::Log | Self::SetPhase => "POST",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::Status => "/status",
            Self::Errors => "/errors",
            Self::Run => "/run",
            Self::Stop => "/stop",
            Self::Reload => "/reload",
            Self::Log => "/log",
            Self::SetPhase | Self::GetPhase => "/phase",
            Self::Events => "/events",
            Self::Health => "/health",
        }
    }

    /// Exact match on method and query-free path.
    pub fn resolve(method: &str, path: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|route| route.method() == method && route.path() == path)
    }
}

/// A routed request with its body decoded into the endpoint's shape.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeRequest {
    Status,
    Errors,
    Run(RunBody),
    Stop,
    Reload,
    Log(LogBody),
    SetPhase(PhaseUpdate),
    GetPhase,
    Events,
    Health,
}

impl BridgeRequest {
    /// Decodes `body` for `route`. Never fails.
    ///
    /// An empty body or one that is not a JSON object counts as `{}`. Each field is decoded on
    /// its own: numeric strings are coerced, and a field that still does not fit takes its
    /// default.
    pub fn decode(route: Route, body: &[u8]) -> Self {
        let fields = parse_body(body);
        match route {
            Route::Status => Self::Status,
            Route::Errors => Self::Errors,
            Route::Run => Self::Run(RunBody {
                scene_path: field(&fields, "scene_path", text).filter(|path| !path.is_empty()),
            }),
            Route::Stop => Self::Stop,
            Route::Reload => Self::Reload,
            Route::Log => Self::Log(LogBody {
                message: field(&fields, "message", text).unwrap_or_default(),
            }),
            Route::SetPhase => Self::SetPhase(PhaseUpdate {
                phase_number: field(&fields, "phase_number", phase_number).unwrap_or_default(),
                phase_name: field(&fields, "phase_name", text).unwrap_or_default(),
                status: field(&fields, "status", status).unwrap_or_default(),
                quality_gates: field(&fields, "quality_gates", gates).unwrap_or_default(),
            }),
            Route::GetPhase => Self::GetPhase,
            Route::Events => Self::Events,
            Route::Health => Self::Health,
        }
    }
}

fn parse_body(body: &[u8]) -> Map<String, Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Map::new();
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) | Err(_) => {
            log::debug!("Request body is not a JSON object; treating as empty");
            Map::new()
        }
    }
}

/// `None` when the field is absent, null or cannot be coerced.
fn field<T>(fields: &Map<String, Value>, key: &str, coerce: fn(&Value) -> Option<T>) -> Option<T> {
    let value = fields.get(key).filter(|value| !value.is_null())?;
    let coerced = coerce(value);
    if coerced.is_none() {
        log::debug!("Ignoring request field {key}={value}; using default");
    }
    coerced
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn phase_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => match number.as_u64() {
            Some(whole) => u32::try_from(whole).ok(),
            None => number
                .as_f64()
                .filter(|float| float.fract() == 0.0 && *float >= 0.0 && *float <= f64::from(u32::MAX))
                .map(|float| float as u32),
        },
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn status(value: &Value) -> Option<PhaseStatus> {
    value.as_str()?.parse().ok()
}

fn gates(value: &Value) -> Option<BTreeMap<String, bool>> {
    let entries = value.as_object()?;
    Some(
        entries
            .iter()
            .filter_map(|(gate, verdict)| {
                let passed = match verdict {
                    Value::Bool(flag) => Some(*flag),
                    Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                        "true" | "pass" | "passed" | "1" => Some(true),
                        "false" | "fail" | "failed" | "0" => Some(false),
                        _ => None,
                    },
                    Value::Number(number) => number.as_i64().map(|n| n != 0),
                    _ => None,
                };
                passed.map(|passed| (gate.clone(), passed))
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolves_exact_method_and_path() {
        assert_eq!(Route::resolve("GET", "/phase"), Some(Route::GetPhase));
        assert_eq!(Route::resolve("POST", "/phase"), Some(Route::SetPhase));
        assert_eq!(Route::resolve("GET", "/run"), None);
        assert_eq!(Route::resolve("GET", "/status/"), None);
        assert_eq!(Route::resolve("DELETE", "/status"), None);
    }

    #[test]
    fn invalid_json_means_empty_object() {
        assert_eq!(
            BridgeRequest::decode(Route::Run, b"{not json"),
            BridgeRequest::Run(RunBody::default())
        );
        assert_eq!(
            BridgeRequest::decode(Route::Log, b""),
            BridgeRequest::Log(LogBody::default())
        );
    }

    #[test]
    fn phase_body_applies_defaults() {
        let request =
            BridgeRequest::decode(Route::SetPhase, br#"{"phase_number": 3, "status": "started"}"#);
        let BridgeRequest::SetPhase(update) = request else {
            panic!("expected SetPhase");
        };
        assert_eq!(update.phase_number, 3);
        assert_eq!(update.phase_name, "");
        assert_eq!(update.status, PhaseStatus::InProgress);
        assert!(update.quality_gates.is_empty());
    }

    #[test]
    fn mistyped_fields_are_coerced_or_defaulted() {
        let decode = |body: &[u8]| match BridgeRequest::decode(Route::SetPhase, body) {
            BridgeRequest::SetPhase(update) => update,
            other => panic!("expected SetPhase, got {other:?}"),
        };

        let update = decode(
            br#"{"phase_number": "5", "phase_name": 7, "status": "In Progress", "quality_gates": {"a": "true", "b": 0, "c": []}}"#,
        );
        assert_eq!(update.phase_number, 5);
        assert_eq!(update.phase_name, "7");
        assert_eq!(update.status, PhaseStatus::InProgress);
        assert_eq!(
            update.quality_gates,
            BTreeMap::from([("a".to_string(), true), ("b".to_string(), false)])
        );

        let update = decode(br#"{"phase_number": -1, "status": "bogus", "quality_gates": "yes"}"#);
        assert_eq!(update, PhaseUpdate::default());

        assert_eq!(
            BridgeRequest::decode(Route::Log, br#"{"message": null}"#),
            BridgeRequest::Log(LogBody::default())
        );
        assert_eq!(
            BridgeRequest::decode(Route::Run, br#"{"scene_path": 3}"#),
            BridgeRequest::Run(RunBody {
                scene_path: Some("3".to_string())
            })
        );
    }
}
