//! TaskSignature - 1 単位の仕事の宣言的な記述
//!
//! The signature is both the inbound envelope payload and the template stored in
//! `OnSuccess` / `OnError`. Field names on the wire are capitalised
//! (`Name`, `Args`, `OnSuccess`, `OnError`, `Immutable`).

use serde::{Deserialize, Deserializer, Serialize};

use super::arg::TaskArg;
use super::errors::DecodeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSignature {
    #[serde(rename = "Name")]
    pub name: String,

    /// Positional: order binds to the handler's parameter list.
    #[serde(rename = "Args", default, deserialize_with = "nullable_vec")]
    pub args: Vec<TaskArg>,

    #[serde(rename = "OnSuccess", default, deserialize_with = "nullable_vec")]
    pub on_success: Vec<TaskSignature>,

    #[serde(rename = "OnError", default, deserialize_with = "nullable_vec")]
    pub on_error: Vec<TaskSignature>,

    /// When set, success continuations keep their declared args.
    #[serde(rename = "Immutable", default)]
    pub immutable: bool,
}

impl TaskSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            on_success: Vec::new(),
            on_error: Vec::new(),
            immutable: false,
        }
    }

    pub fn with_arg(mut self, arg: TaskArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = TaskArg>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn on_success(mut self, continuation: TaskSignature) -> Self {
        self.on_success.push(continuation);
        self
    }

    pub fn on_error(mut self, continuation: TaskSignature) -> Self {
        self.on_error.push(continuation);
        self
    }

    pub fn immutable(mut self, immutable: bool) -> Self {
        self.immutable = immutable;
        self
    }

    /// A new signature identical to `self` with `first` bound as argument 0.
    /// `self` is left untouched so the same template can be derived from again.
    pub fn with_prepended(&self, first: TaskArg) -> TaskSignature {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(first);
        args.extend(self.args.iter().cloned());
        TaskSignature {
            args,
            ..self.clone()
        }
    }

    /// Decode an envelope body.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(body).map_err(|e| DecodeError::Envelope(e.to_string()))
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Producers that marshal empty lists as `null` are accepted.
fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_wire_envelope() {
        let body = json!({
            "Name": "add",
            "Args": [{"Type": "int", "Value": 2}, {"Type": "int", "Value": 3}],
            "OnSuccess": [{"Name": "log", "Args": [], "Immutable": false}],
            "OnError": null,
            "Immutable": false
        });
        let sig = TaskSignature::decode(body.to_string().as_bytes()).unwrap();

        assert_eq!(sig.name, "add");
        assert_eq!(sig.args, vec![TaskArg::int(2), TaskArg::int(3)]);
        assert_eq!(sig.on_success, vec![TaskSignature::new("log")]);
        assert!(sig.on_error.is_empty());
        assert!(!sig.immutable);
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let sig = TaskSignature::decode(br#"{"Name": "ping"}"#).unwrap();
        assert_eq!(sig, TaskSignature::new("ping"));
    }

    #[test]
    fn malformed_body_is_an_envelope_error() {
        let err = TaskSignature::decode(b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::Envelope(_)));

        let err = TaskSignature::decode(br#"{"Args": []}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Envelope(_)));
    }

    #[test]
    fn prepend_returns_a_new_signature() {
        let template = TaskSignature::new("alert")
            .with_arg(TaskArg::string("pager"))
            .on_success(TaskSignature::new("ack"));

        let derived = template.with_prepended(TaskArg::error("disk full"));

        assert_eq!(
            derived.args,
            vec![TaskArg::error("disk full"), TaskArg::string("pager")]
        );
        assert_eq!(derived.on_success, template.on_success);
        assert_eq!(template.args, vec![TaskArg::string("pager")]);
    }

    #[test]
    fn encode_then_decode_preserves_nesting() {
        let sig = TaskSignature::new("a")
            .with_arg(TaskArg::int(1))
            .on_success(TaskSignature::new("b").on_error(TaskSignature::new("c")))
            .immutable(true);
        let bytes = sig.encode().unwrap();
        assert_eq!(TaskSignature::decode(&bytes).unwrap(), sig);
    }
}
