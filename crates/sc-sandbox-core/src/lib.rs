//! SC Sandbox Core
//!
//! Compile, load and test-invoke smart contracts without a network.
//!
//! # Core Modules
//!
//! - [`compiler`]: Contract language compiler and artifact writer
//! - [`script`]: Bytecode format, instruction decoding, script builder
//! - [`debug_info`]: `.debug.json` sidecar metadata
//! - [`vm`]: Gas-metered execution engine and interop services
//! - [`gas`]: Cost table and gas meter
//! - [`wallet`]: Wallet capability and the JSON wallet file
//! - [`transaction`]: Test transaction composition
//! - [`executor`]: Runs a test transaction and packages the result
//!
//! # Example
//!
//! ```ignore
//! use sc_sandbox_core::compiler::{build_contract, ScriptCompiler};
//! use sc_sandbox_core::executor::TestInvoker;
//! use sc_sandbox_core::transaction::{InvocationParameters, TransactionComposer};
//!
//! let built = build_contract(&ScriptCompiler::new(), Path::new("SampleSC.py"))?;
//! let tx = TransactionComposer::compose(&built.script, params, Some(&wallet))?;
//! let result = TestInvoker::default().run(tx);
//! ```

pub mod compiler;
pub mod debug_info;
pub mod executor;
pub mod gas;
pub mod script;
pub mod transaction;
pub mod vm;
pub mod wallet;

pub use compiler::{build_contract, load_contract, CompileError, CompiledContract, Compiler, ScriptCompiler};
pub use executor::{ExecutionResult, InvokeSettings, TestInvoker};
pub use transaction::{
    ComposeError, InvocationParameters, InvokeAs, SignerTag, TestTransaction, TransactionComposer,
};
pub use vm::{EngineLimits, ExecutionEngine, StackItem, VmFault, VmState};
pub use wallet::{UserWallet, WalletAccount, WalletContext, WalletError};
