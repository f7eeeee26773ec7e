use serde_json::Value;

use crate::models::{Engine, ExecutionResult};

/// Turn literal two-character escapes (`\n`, `\r`, `\t`) into the control
/// characters they name. Text left over from double encoding in transit
/// comes back as real source; already normalized text is unchanged.
pub fn normalize_code_string(code: &str) -> String {
    let mut normalized = String::with_capacity(code.len());
    let mut chars = code.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            normalized.push(c);
            continue;
        }
        match chars.peek() {
            Some('n') => normalized.push('\n'),
            Some('r') => normalized.push('\r'),
            Some('t') => normalized.push('\t'),
            _ => {
                normalized.push(c);
                continue;
            }
        }
        chars.next();
    }
    normalized
}

// First candidate that is a non-empty string
fn first_text<'a>(candidates: impl IntoIterator<Item = Option<&'a Value>>) -> String {
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn exit_code(phase: &Value) -> Option<i32> {
    phase.get("code").and_then(Value::as_i64).and_then(|code| i32::try_from(code).ok())
}

/// Map the remote service's response onto the common result shape.
///
/// Run-phase fields win; compile-phase fields fill in when the run phase is
/// missing or empty. Anything without either phase is kept as raw JSON text.
pub fn normalize_execution(engine: Engine, raw: Value) -> ExecutionResult {
    let mut result = ExecutionResult::new(engine);
    if raw.is_null() {
        return result;
    }

    let run = raw.get("run");
    let compile = raw.get("compile");
    if run.is_none() && compile.is_none() {
        result.stdout = raw.to_string();
        result.raw = raw;
        return result;
    }

    let field = |phase: Option<&Value>, name: &str| phase.and_then(|p| p.get(name)).cloned();
    let run_stdout = field(run, "stdout");
    let compile_stdout = field(compile, "stdout");
    let run_stderr = field(run, "stderr");
    let run_output = field(run, "output");
    let compile_stderr = field(compile, "stderr");
    let compile_output = field(compile, "output");

    result.stdout = first_text([run_stdout.as_ref(), compile_stdout.as_ref()]);
    result.stderr = first_text([
        run_stderr.as_ref(),
        run_output.as_ref(),
        compile_stderr.as_ref(),
        compile_output.as_ref(),
    ]);
    let code = run.and_then(exit_code).or_else(|| compile.and_then(exit_code));
    result = result.with_exit_code(code);
    result.raw = raw;
    result
}

/// Compiler diagnostics when the remote compile phase failed and nothing ran
pub fn remote_compile_error(raw: &Value) -> Option<String> {
    if raw.get("run").is_some_and(|run| !run.is_null()) {
        return None;
    }
    let compile = raw.get("compile")?;
    match exit_code(compile) {
        Some(0) | None => None,
        Some(code) => {
            let message = first_text([compile.get("stderr"), compile.get("output")]);
            if message.is_empty() {
                Some(format!("Compilation failed with exit code {code}"))
            } else {
                Some(message)
            }
        }
    }
}
