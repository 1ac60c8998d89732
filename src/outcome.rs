// src/outcome.rs

//! Mapping of a finished connector process onto a typed [`Outcome`].
//!
//! | exit code | outcome                                                  |
//! |-----------|----------------------------------------------------------|
//! | 0         | `Success(stdout as JSON)`, or `UnknownFailure` if stdout is not JSON |
//! | 1         | `RecoverableFailure(stdout)`                             |
//! | 2         | `UnrecoverableFailure(stdout)`                           |
//! | other     | `UnknownFailure(stdout)`                                 |

use serde_json::Value;

use crate::types::exit_code;

/// Classified result of one connector invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    RecoverableFailure(String),
    UnrecoverableFailure(String),
    UnknownFailure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Whether the connector must be dropped from the schedule for good.
    pub fn removes_connector(&self) -> bool {
        matches!(self, Outcome::UnrecoverableFailure(_))
    }

    /// Short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::RecoverableFailure(_) => "recoverable_failure",
            Outcome::UnrecoverableFailure(_) => "unrecoverable_failure",
            Outcome::UnknownFailure(_) => "unknown_failure",
        }
    }

    /// The value persisted in the result file: the payload itself on
    /// success, a diagnostic JSON string otherwise.
    pub fn result_value(&self, connector: &str) -> Value {
        match self {
            Outcome::Success(payload) => payload.clone(),
            Outcome::RecoverableFailure(reason) => Value::String(format!(
                "Connector {connector} failed to retrieve results. Reason: {reason}"
            )),
            Outcome::UnrecoverableFailure(reason) => Value::String(format!(
                "{connector} encountered unrecoverable condition. Reason: {reason}. \
                 removing {connector} settings from execution list"
            )),
            Outcome::UnknownFailure(reason) => Value::String(format!(
                "{connector} encountered an unexpected error. Reason: {reason}"
            )),
        }
    }
}

/// Classify a finished process from its exit code and captured output.
///
/// Pure function; never fails. Trailing whitespace of the captured output is
/// dropped from diagnostics. For exit codes outside the contract, stderr is
/// used as the reason when stdout is empty (crashing interpreters usually
/// only write to stderr).
pub fn classify(code: i32, stdout: &str, stderr: &str) -> Outcome {
    let out = stdout.trim_end();

    match code {
        exit_code::SUCCESS => match serde_json::from_str::<Value>(stdout) {
            Ok(payload) => Outcome::Success(payload),
            Err(err) => Outcome::UnknownFailure(format!(
                "connector exited successfully but stdout is not valid JSON ({err}): {out}"
            )),
        },
        exit_code::RECOVERABLE => Outcome::RecoverableFailure(out.to_string()),
        exit_code::UNRECOVERABLE => Outcome::UnrecoverableFailure(out.to_string()),
        _ => {
            let err = stderr.trim_end();
            if out.is_empty() && !err.is_empty() {
                Outcome::UnknownFailure(format!("exit code {code}: {err}"))
            } else {
                Outcome::UnknownFailure(out.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exit_zero_with_json_is_success() {
        assert_eq!(classify(0, "{\"a\":1}\n", ""), Outcome::Success(json!({"a": 1})));
    }

    #[test]
    fn exit_zero_with_garbage_is_unknown() {
        let outcome = classify(0, "not json at all", "");
        match outcome {
            Outcome::UnknownFailure(reason) => assert!(reason.contains("not json at all")),
            other => panic!("expected UnknownFailure, got {other:?}"),
        }
    }

    #[test]
    fn exit_zero_with_empty_stdout_is_unknown() {
        assert!(matches!(classify(0, "", ""), Outcome::UnknownFailure(_)));
    }

    #[test]
    fn contract_failures_carry_stdout() {
        assert_eq!(
            classify(1, "bad domain\n", "ignored"),
            Outcome::RecoverableFailure("bad domain".to_string())
        );
        assert_eq!(
            classify(2, "fatal", ""),
            Outcome::UnrecoverableFailure("fatal".to_string())
        );
    }

    #[test]
    fn undefined_codes_are_unknown() {
        assert_eq!(classify(3, "huh", ""), Outcome::UnknownFailure("huh".to_string()));
        assert_eq!(
            classify(-1, "", "Traceback: boom\n"),
            Outcome::UnknownFailure("exit code -1: Traceback: boom".to_string())
        );
    }

    #[test]
    fn only_unrecoverable_removes() {
        assert!(!Outcome::Success(Value::Null).removes_connector());
        assert!(!Outcome::RecoverableFailure(String::new()).removes_connector());
        assert!(!Outcome::UnknownFailure(String::new()).removes_connector());
        assert!(Outcome::UnrecoverableFailure(String::new()).removes_connector());
    }

    #[test]
    fn diagnostics_embed_connector_and_reason() {
        let value = Outcome::RecoverableFailure("bad domain".into()).result_value("A");
        assert_eq!(
            value,
            Value::String("Connector A failed to retrieve results. Reason: bad domain".into())
        );

        let value = Outcome::UnrecoverableFailure("fatal".into()).result_value("A");
        let text = value.as_str().unwrap();
        assert!(text.contains("fatal"));
        assert!(text.contains("removing A settings"));
    }
}
