//! Invoker - 名前解決と型チェック付きの呼び出し
//!
//! # フロー
//! 1. registry から handler を取得（なければ NotRegistered）
//! 2. TaskArg を順番通りに decode（1 つでも失敗したら全体を中止）
//! 3. 宣言された引数リストと個数・型を比較（ArgumentMismatch）
//! 4. handler を実行し、結果かエラーのどちらか 1 つを返す
//! 5. wire に載らない結果（NaN / inf）は Unrepresentable として失敗扱い
//!
//! Never retries.

use std::sync::Arc;

use crate::domain::arg::decode_all;
use crate::domain::{InvokeError, TaskArg, TypedValue};
use crate::typed::{HandlerRegistry, check_args};

#[derive(Clone)]
pub struct Invoker {
    registry: Arc<HandlerRegistry>,
}

impl Invoker {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// `Err(NotRegistered | Decode)` means the handler was not called.
    pub fn invoke(&self, name: &str, args: &[TaskArg]) -> Result<TypedValue, InvokeError> {
        let handler = self
            .registry
            .get(name)
            .ok_or_else(|| InvokeError::NotRegistered(name.to_string()))?;

        let values = decode_all(args)?;
        check_args(handler.params(), &values)?;

        let result = handler.call(values)?;
        result.ensure_encodable()?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DecodeError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn invoker_with_counter() -> (Invoker, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);

        let mut registry = HandlerRegistry::new();
        registry
            .register("add", move |a: i64, b: i64| -> Result<i64, String> {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok(a + b)
            })
            .unwrap();
        registry
            .register("div", |a: f64, b: f64| -> Result<f64, String> { Ok(a / b) })
            .unwrap();
        registry
            .register("fail", |_: String| -> Result<bool, String> {
                Err("disk full".to_string())
            })
            .unwrap();

        (Invoker::new(Arc::new(registry)), calls)
    }

    #[test]
    fn invokes_registered_handler() {
        let (invoker, calls) = invoker_with_counter();
        let out = invoker
            .invoke("add", &[TaskArg::int(2), TaskArg::int(3)])
            .unwrap();
        assert_eq!(out, TypedValue::Int(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_name_is_not_registered() {
        let (invoker, calls) = invoker_with_counter();
        let err = invoker.invoke("ghost", &[]).unwrap_err();
        assert_eq!(err, InvokeError::NotRegistered("ghost".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn undecodable_arg_aborts_before_call() {
        let (invoker, calls) = invoker_with_counter();
        let err = invoker
            .invoke("add", &[TaskArg::int(2), TaskArg::new("int", json!("three"))])
            .unwrap_err();
        assert!(matches!(
            err,
            InvokeError::Decode(DecodeError::InvalidValue { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn arity_and_type_mismatch_are_reported_not_called() {
        let (invoker, calls) = invoker_with_counter();

        let err = invoker.invoke("add", &[TaskArg::int(2)]).unwrap_err();
        assert!(matches!(err, InvokeError::ArgumentMismatch(_)));

        let err = invoker
            .invoke("add", &[TaskArg::int(2), TaskArg::string("3")])
            .unwrap_err();
        assert!(matches!(err, InvokeError::ArgumentMismatch(_)));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handler_failure_is_returned() {
        let (invoker, _) = invoker_with_counter();
        let err = invoker
            .invoke("fail", &[TaskArg::string("/var")])
            .unwrap_err();
        assert_eq!(err, InvokeError::Handler("disk full".into()));
    }

    #[test]
    fn non_finite_result_is_a_failure() {
        let (invoker, _) = invoker_with_counter();
        let err = invoker
            .invoke("div", &[TaskArg::float64(1.0), TaskArg::float64(0.0)])
            .unwrap_err();
        assert_eq!(err, InvokeError::Unrepresentable("float64 inf".into()));

        let ok = invoker
            .invoke("div", &[TaskArg::float64(1.0), TaskArg::float64(4.0)])
            .unwrap();
        assert_eq!(ok, TypedValue::Float64(0.25));
    }
}
