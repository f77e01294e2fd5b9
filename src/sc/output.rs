//! Reporting for the `sc` pipeline.
//!
//! Human-readable lines go to the dispatcher's sink one at a time. The JSON
//! summary is built separately so the binary can print it after the run.

use serde::Serialize;
use std::fmt::Display;
use std::io::Write;

use sc_sandbox_core::debug_info::DebugInfo;
use sc_sandbox_core::vm::{LogEntry, Notification};
use sc_sandbox_core::{ExecutionResult, StackItem};
use sc_sandbox_types::Fixed8;
use tracing::warn;

use super::errors::CommandError;
use super::ScOutcome;

/// Write one line and flush it.
pub fn emit(out: &mut dyn Write, line: impl Display) {
    if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
        warn!(error = %e, "failed to write command output");
    }
}

pub fn format_results(items: &[StackItem]) -> String {
    let rendered: Vec<String> = items.iter().map(|i| i.to_string()).collect();
    format!("[{}]", rendered.join(", "))
}

/// Where a fault happened, from the debug sidecar.
pub fn fault_location(result: &ExecutionResult, debug: Option<&DebugInfo>) -> Option<String> {
    let offset = result.engine.as_ref()?.fault_offset()?;
    let debug = debug?;
    let line = debug.line_for_offset(offset)?;
    Some(match debug.function_for_offset(offset) {
        Some(function) => format!("line {} in {}", line, function),
        None => format!("line {}", line),
    })
}

/// Print the outcome of a test invocation.
pub fn report_execution(out: &mut dyn Write, result: &ExecutionResult, debug: Option<&DebugInfo>) {
    let Some(engine) = result.engine.as_ref() else {
        return;
    };

    if result.is_success() {
        emit(out, "Test deploy invoke successful");
        emit(
            out,
            format_args!("Total operations executed: {}", engine.ops_executed()),
        );
        if let Some(values) = &result.return_values {
            emit(out, format_args!("Results: {}", format_results(values)));
        }
        for notification in engine.notifications() {
            emit(out, format_args!("Notification: {}", notification.state));
        }
        for log in engine.logs() {
            emit(out, format_args!("Log: {}", log.message));
        }
        emit(out, format_args!("Invoke TX GAS cost: {}", engine.gas_consumed()));
        if let Some(tx) = &result.transaction {
            emit(out, format_args!("Invoke TX fee: {}", tx.fee));
        }
        return;
    }

    let reason = engine
        .fault()
        .map(|f| f.to_string())
        .unwrap_or_else(|| "execution did not halt".to_string());
    emit(out, CommandError::InvocationFault(reason));
    if let Some(location) = fault_location(result, debug) {
        emit(out, format_args!("Fault at {}", location));
    }
    emit(
        out,
        format_args!("Total operations executed: {}", engine.ops_executed()),
    );
}

// =============================================================================
// JSON summary
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorSummary {
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct InvokeSummary {
    pub tx_hash: Option<String>,
    pub state: Option<String>,
    pub results: Vec<StackItem>,
    pub total_ops: Option<u64>,
    pub gas_consumed: Option<Fixed8>,
    pub fee: Option<Fixed8>,
    pub notifications: Vec<Notification>,
    pub logs: Vec<LogEntry>,
    pub fault: Option<String>,
    pub fault_location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OutcomeSummary {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation: Option<InvokeSummary>,
}

pub fn summarize(
    outcome: &ScOutcome,
    error: Option<&CommandError>,
    debug: Option<&DebugInfo>,
) -> OutcomeSummary {
    let invocation = match outcome {
        ScOutcome::Invoked(result) if !result.is_empty() => Some(summarize_invocation(result, debug)),
        _ => None,
    };
    OutcomeSummary {
        success: outcome.is_success(),
        error: error.map(|e| ErrorSummary {
            kind: e.kind(),
            message: e.to_string(),
        }),
        invocation,
    }
}

fn summarize_invocation(result: &ExecutionResult, debug: Option<&DebugInfo>) -> InvokeSummary {
    let engine = result.engine.as_ref();
    InvokeSummary {
        tx_hash: result.transaction.as_ref().map(|tx| tx.hash().to_string()),
        state: engine.map(|e| e.state().to_string()),
        results: result.return_values.clone().unwrap_or_default(),
        total_ops: result.total_ops,
        gas_consumed: engine.map(|e| e.gas_consumed()),
        fee: result.transaction.as_ref().map(|tx| tx.fee),
        notifications: engine
            .map(|e| e.notifications().to_vec())
            .unwrap_or_default(),
        logs: engine.map(|e| e.logs().to_vec()).unwrap_or_default(),
        fault: engine.and_then(|e| e.fault()).map(|f| f.to_string()),
        fault_location: fault_location(result, debug),
    }
}
