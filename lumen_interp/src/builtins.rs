//! Builtin operators.

use lumen_ir::{CallError, CallResult, Callable, Value};

/// Names and arities of every builtin.
pub const BUILTINS: &[(&str, usize)] = &[("+", 2), ("-", 2), ("*", 2), ("<", 2), ("==", 2), ("!", 1)];

/// Apply builtin `name` to `args`.
///
/// Returns `None` when `name` is not a builtin.
pub fn apply(name: &str, args: &[Value]) -> Option<CallResult<Value>> {
    let result = match name {
        "+" => builtin_add(args),
        "-" => builtin_sub(args),
        "*" => builtin_mul(args),
        "<" => builtin_lt(args),
        "==" => builtin_eq(args),
        "!" => builtin_not(args),
        _ => return None,
    };
    Some(result)
}

/// Callables for every builtin.
pub fn callables() -> impl Iterator<Item = Callable> {
    BUILTINS.iter().map(|&(name, arity)| {
        Callable::native(name, arity, move |args| {
            apply(name, args).unwrap_or_else(|| Err(CallError::Undefined { name: name.to_string() }))
        })
    })
}

fn binary<'a>(op: &str, args: &'a [Value]) -> CallResult<(&'a Value, &'a Value)> {
    match args {
        [lhs, rhs] => Ok((lhs, rhs)),
        _ => Err(CallError::Arity {
            name: op.to_string(),
            expected: 2,
            got: args.len(),
        }),
    }
}

fn mismatch(op: &str, lhs: &Value, rhs: &Value) -> CallError {
    CallError::TypeMismatch {
        op: op.to_string(),
        message: format!("unsupported operands {} and {}", lhs.type_tag(), rhs.type_tag()),
    }
}

/// Numeric operands promoted to a common representation.
enum Numeric {
    Int(i64, i64),
    Float(f64, f64),
}

fn numeric(lhs: &Value, rhs: &Value) -> Option<Numeric> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(Numeric::Int(*a, *b)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            Some(Numeric::Float(lhs.as_float()?, rhs.as_float()?))
        }
        _ => None,
    }
}

fn overflow(op: &str) -> CallError {
    CallError::Failed(format!("integer overflow in `{}`", op))
}

pub fn builtin_add(args: &[Value]) -> CallResult<Value> {
    let (lhs, rhs) = binary("+", args)?;
    if let (Value::Str(a), Value::Str(b)) = (lhs, rhs) {
        return Ok(Value::str(&format!("{}{}", a, b)));
    }
    match numeric(lhs, rhs) {
        Some(Numeric::Int(a, b)) => a.checked_add(b).map(Value::Int).ok_or_else(|| overflow("+")),
        Some(Numeric::Float(a, b)) => Ok(Value::Float(a + b)),
        None => Err(mismatch("+", lhs, rhs)),
    }
}

pub fn builtin_sub(args: &[Value]) -> CallResult<Value> {
    let (lhs, rhs) = binary("-", args)?;
    match numeric(lhs, rhs) {
        Some(Numeric::Int(a, b)) => a.checked_sub(b).map(Value::Int).ok_or_else(|| overflow("-")),
        Some(Numeric::Float(a, b)) => Ok(Value::Float(a - b)),
        None => Err(mismatch("-", lhs, rhs)),
    }
}

pub fn builtin_mul(args: &[Value]) -> CallResult<Value> {
    let (lhs, rhs) = binary("*", args)?;
    match numeric(lhs, rhs) {
        Some(Numeric::Int(a, b)) => a.checked_mul(b).map(Value::Int).ok_or_else(|| overflow("*")),
        Some(Numeric::Float(a, b)) => Ok(Value::Float(a * b)),
        None => Err(mismatch("*", lhs, rhs)),
    }
}

pub fn builtin_lt(args: &[Value]) -> CallResult<Value> {
    let (lhs, rhs) = binary("<", args)?;
    match (numeric(lhs, rhs), lhs, rhs) {
        (Some(Numeric::Int(a, b)), _, _) => Ok(Value::Bool(a < b)),
        (Some(Numeric::Float(a, b)), _, _) => Ok(Value::Bool(a < b)),
        (None, Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a < b)),
        _ => Err(mismatch("<", lhs, rhs)),
    }
}

pub fn builtin_eq(args: &[Value]) -> CallResult<Value> {
    let (lhs, rhs) = binary("==", args)?;
    let equal = match numeric(lhs, rhs) {
        Some(Numeric::Int(a, b)) => a == b,
        Some(Numeric::Float(a, b)) => a == b,
        None => lhs == rhs,
    };
    Ok(Value::Bool(equal))
}

pub fn builtin_not(args: &[Value]) -> CallResult<Value> {
    match args {
        [value] => Ok(Value::Bool(!value.is_truthy())),
        _ => Err(CallError::Arity {
            name: "!".to_string(),
            expected: 1,
            got: args.len(),
        }),
    }
}
