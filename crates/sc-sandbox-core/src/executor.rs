//! Runs a [`TestTransaction`] in a fresh [`ExecutionEngine`].

use sc_sandbox_types::Fixed8;
use tracing::{debug, warn};

use crate::gas::{GasMeter, FREE_GAS};
use crate::transaction::TestTransaction;
use crate::vm::{EngineLimits, ExecutionEngine, InvocationContext, StackItem, VmState};

/// Knobs for a test invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokeSettings {
    /// Allowance added to the fee when the transaction is in test mode.
    pub free_gas: Fixed8,
    pub limits: EngineLimits,
}

impl Default for InvokeSettings {
    fn default() -> Self {
        Self {
            free_gas: FREE_GAS,
            limits: EngineLimits::default(),
        }
    }
}

/// Outcome of a test invocation.
///
/// | stage reached         | transaction | return_values | total_ops | engine |
/// |-----------------------|-------------|---------------|-----------|--------|
/// | stopped before the VM | `None`      | `None`        | `None`    | `None` |
/// | VM fault              | `None`      | `Some`        | `Some`    | `Some` |
/// | success               | `Some`      | `Some`        | `Some`    | `Some` |
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionResult {
    pub transaction: Option<TestTransaction>,
    /// Result stack, top first.
    pub return_values: Option<Vec<StackItem>>,
    pub total_ops: Option<u64>,
    pub engine: Option<ExecutionEngine>,
}

impl ExecutionResult {
    /// The all-`None` result.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.transaction.is_some()
    }

    /// True when the pipeline stopped before reaching the VM.
    pub fn is_empty(&self) -> bool {
        self.transaction.is_none()
            && self.return_values.is_none()
            && self.total_ops.is_none()
            && self.engine.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestInvoker {
    settings: InvokeSettings,
}

impl TestInvoker {
    pub fn new(settings: InvokeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &InvokeSettings {
        &self.settings
    }

    pub fn run(&self, tx: TestTransaction) -> ExecutionResult {
        let limit = GasMeter::limit_for(tx.fee, tx.test_mode, self.settings.free_gas);
        let meter = GasMeter::new(limit, GasMeter::price_for(tx.gas_price, tx.test_mode));
        let context = InvocationContext {
            script_hash: tx.contract_hash,
            witnesses: tx.witnesses.clone(),
            attached_gas: tx.attached_gas,
            // test storage is private to this run
            storage_enabled: tx.properties.needs_storage || tx.test_mode,
        };

        let mut engine =
            ExecutionEngine::new(tx.script.clone(), context, self.settings.limits, meter);
        engine.load_arguments(tx.args.iter().map(StackItem::from));
        let state = engine.execute();

        let return_values = engine.result_stack();
        let total_ops = engine.ops_executed();

        match state {
            VmState::Halt => {
                debug!(
                    tx = %tx.hash(),
                    ops = total_ops,
                    gas = %engine.gas_consumed(),
                    "test invoke succeeded"
                );
                ExecutionResult {
                    transaction: Some(tx),
                    return_values: Some(return_values),
                    total_ops: Some(total_ops),
                    engine: Some(engine),
                }
            }
            VmState::Fault | VmState::None => {
                if let Some(fault) = engine.fault() {
                    warn!(error = %fault, ops = total_ops, "test invoke faulted");
                }
                ExecutionResult {
                    transaction: None,
                    return_values: Some(return_values),
                    total_ops: Some(total_ops),
                    engine: Some(engine),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ScriptCompiler;
    use crate::transaction::{InvocationParameters, TransactionComposer};
    use crate::wallet::{UserWallet, WalletAccount};
    use sc_sandbox_types::ContractParameter;

    fn wallet() -> UserWallet {
        UserWallet::new("dev").with_account(WalletAccount {
            address: "AJQ6FoaSXDFzA6wLnyZ1nFN7SGSN2oNTc3".parse().unwrap(),
            label: None,
            is_default: true,
            public_key: None,
        })
    }

    fn tx(source: &str, params: InvocationParameters) -> TestTransaction {
        let output = ScriptCompiler::new()
            .compile_str("T", "T.py", source)
            .unwrap();
        let wallet = wallet();
        TransactionComposer::compose(&output.script, params, Some(&wallet)).unwrap()
    }

    #[test]
    fn test_success_fills_every_field() {
        let params = InvocationParameters {
            args: vec![ContractParameter::Integer(2)],
            ..Default::default()
        };
        let result = TestInvoker::default().run(tx("def Main(a):\n    return a * 3\n", params));
        assert!(result.is_success());
        assert_eq!(result.return_values, Some(vec![StackItem::Integer(6)]));
        assert!(result.total_ops.unwrap() > 0);
        assert_eq!(result.engine.unwrap().state(), VmState::Halt);
    }

    #[test]
    fn test_fault_drops_transaction() {
        let params = InvocationParameters {
            args: vec![ContractParameter::Integer(2)],
            ..Default::default()
        };
        let result = TestInvoker::default().run(tx("def Main(a, b):\n    return a\n", params));
        assert!(!result.is_success());
        assert!(!result.is_empty());
        assert_eq!(result.total_ops, Some(0));
        assert_eq!(result.engine.unwrap().state(), VmState::Fault);
    }

    #[test]
    fn test_gas_limit_without_test_mode() {
        let source = "def Main():\n    i = 0\n    while i < 100:\n        i += 1\n    return i\n";
        let params = InvocationParameters {
            test_mode: false,
            gas_price: Fixed8::ONE,
            fee: Fixed8::from_units(100_000),
            ..Default::default()
        };
        let result = TestInvoker::default().run(tx(source, params.clone()));
        assert!(!result.is_success());

        let result = TestInvoker::default().run(tx(
            source,
            InvocationParameters {
                test_mode: true,
                ..params
            },
        ));
        assert!(result.is_success());
        assert_eq!(result.return_values, Some(vec![StackItem::Integer(100)]));
    }

    #[test]
    fn test_storage_available_in_test_mode() {
        let source = "def Main():\n    return Get(GetContext(), 'k')\n";
        let result = TestInvoker::default().run(tx(source, InvocationParameters::default()));
        assert!(result.is_success());
        assert_eq!(result.return_values, Some(vec![StackItem::empty()]));

        let outside_test_mode = InvocationParameters {
            test_mode: false,
            fee: Fixed8::ONE,
            ..Default::default()
        };
        let result = TestInvoker::default().run(tx(source, outside_test_mode.clone()));
        assert!(!result.is_success());

        let params = InvocationParameters {
            needs_storage: true,
            ..outside_test_mode
        };
        let result = TestInvoker::default().run(tx(source, params));
        assert!(result.is_success());
    }

    #[test]
    fn test_declared_gas_price_does_not_exhaust_test_allowance() {
        let source = "def Main(a):\n    Put(GetContext(), 'k', a)\n    return a\n";
        let params = InvocationParameters {
            gas_price: "70502".parse().unwrap(),
            fee: "2".parse().unwrap(),
            args: vec![ContractParameter::Integer(3)],
            ..Default::default()
        };
        let result = TestInvoker::default().run(tx(source, params));
        assert!(result.is_success());
        assert_eq!(result.return_values, Some(vec![StackItem::Integer(3)]));
        let engine = result.engine.unwrap();
        assert!(engine.gas_consumed() > Fixed8::ONE);
        assert_eq!(engine.gas_limit(), Fixed8::from_whole(12).unwrap());
    }
}
