use serde::Deserialize;

/// Body of every successful backend response
#[derive(Deserialize, Debug)]
pub struct SuccessEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: T,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Body of a failed backend response. Older endpoints put the reason in `msg`, newer ones in
/// `error`.
#[derive(Deserialize, Debug, Default)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
}

impl ErrorEnvelope {
    /// Best human readable reason in the body, if there is one
    pub fn into_message(self) -> Option<String> {
        self.error
            .or(self.msg)
            .filter(|message| !message.trim().is_empty())
    }
}

/// Pulls the failure reason out of an error body, falling back to the HTTP reason phrase
pub fn failure_message(status: u16, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .and_then(ErrorEnvelope::into_message)
        .unwrap_or_else(|| {
            reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|code| code.canonical_reason())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("request failed with status {status}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_error_over_msg() {
        let body = br#"{"success":false,"error":"Task not found","msg":"fail","status":404}"#;
        assert_eq!("Task not found", failure_message(404, body));
    }

    #[test]
    fn falls_back_to_msg() {
        let body = br#"{"success":false,"msg":"Invalid credentials"}"#;
        assert_eq!("Invalid credentials", failure_message(400, body));
    }

    #[test]
    fn falls_back_to_reason_phrase() {
        assert_eq!("Bad Gateway", failure_message(502, b"<html>oops</html>"));
        assert_eq!("Internal Server Error", failure_message(500, br#"{"error":"  "}"#));
    }

    #[test]
    fn success_tolerates_missing_msg() {
        let envelope: SuccessEnvelope<String> =
            serde_json::from_str(r#"{"success":true,"data":"Task deleted"}"#)
                .expect("envelope should parse");
        assert_eq!("Task deleted", envelope.data);
        assert_eq!(None, envelope.msg);
    }
}
