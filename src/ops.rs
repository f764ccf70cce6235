//! Operator semantics for deferred expressions.
//!
//! Integer arithmetic is checked; overflow and division by zero are errors
//! rather than wrapping. Mixing an int with a float promotes to float.
//! Errors are plain messages; the evaluator attaches the location.

use std::cmp::Ordering;

use crate::ast::{BinaryOp, UnaryOp};
use crate::value::{Map, Value};

pub fn unary(op: UnaryOp, operand: Value) -> Result<Value, String> {
    match (op, operand) {
        (UnaryOp::Neg, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| format!("integer overflow in -({})", n)),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::BitNot, Value::Int(n)) => Ok(Value::Int(!n)),
        (op, operand) => Err(format!(
            "cannot apply '{}' to {}",
            op.symbol(),
            operand.kind()
        )),
    }
}

/// Apply a binary operator to two evaluated operands.
///
/// `&&` and `||` are accepted here for completeness; the evaluator
/// short-circuits them before the right operand is evaluated.
pub fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, String> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(equals(&left, &right))),
        BinaryOp::Ne => Ok(Value::Bool(!equals(&left, &right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, &left, &right),
        BinaryOp::And | BinaryOp::Or => match (&left, &right) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == BinaryOp::And {
                *a && *b
            } else {
                *a || *b
            })),
            _ => Err(mismatch(op, &left, &right)),
        },
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem | BinaryOp::Pow => {
            arithmetic(op, left, right)
        }
        BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::BitAnd | BinaryOp::Shl | BinaryOp::Shr => {
            bitwise(op, &left, &right)
        }
    }
}

/// Deep equality where an int and a float compare by numeric value.
pub fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equals(x, y))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).map_or(false, |y| equals(x, y)))
        }
        _ => left == right,
    }
}

/// Merge `incoming` into `target`. Nested maps merge; anything else is
/// replaced by the incoming value.
pub fn merge(target: &mut Map, incoming: Map) {
    for (key, value) in incoming {
        merge_entry(target, key, value);
    }
}

fn merge_entry(target: &mut Map, key: String, value: Value) {
    match value {
        Value::Map(nested) => match target.get_mut(&key) {
            Some(Value::Map(existing)) => merge(existing, nested),
            _ => {
                target.insert(key, Value::Map(nested));
            }
        },
        value => {
            target.insert(key, value);
        }
    }
}

/// Insert `value` under a dotted key inside a map literal.
pub fn insert_nested(map: &mut Map, key: &[String], value: Value) -> Result<(), String> {
    let Some((last, parents)) = key.split_last() else {
        return Err("empty key in map literal".to_string());
    };
    let mut target = map;
    for name in parents {
        let entry = target
            .entry(name.clone())
            .or_insert_with(|| Value::Map(Map::new()));
        target = match entry {
            Value::Map(child) => child,
            other => {
                return Err(format!(
                    "key \"{}\" holds {}, not a map",
                    name,
                    other.kind()
                ))
            }
        };
    }
    merge_entry(target, last.clone(), value);
    Ok(())
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> String {
    format!(
        "unsupported operands for '{}': {} and {}",
        op.symbol(),
        left.kind(),
        right.kind()
    )
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

fn add(left: Value, right: Value) -> Result<Value, String> {
    match (left, right) {
        (Value::String(mut a), Value::String(b)) => {
            a.push_str(&b);
            Ok(Value::String(a))
        }
        (Value::Array(mut a), Value::Array(b)) => {
            a.extend(b);
            Ok(Value::Array(a))
        }
        (Value::Map(mut a), Value::Map(b)) => {
            merge(&mut a, b);
            Ok(Value::Map(a))
        }
        (left, right) => arithmetic(BinaryOp::Add, left, right),
    }
}

fn arithmetic(op: BinaryOp, left: Value, right: Value) -> Result<Value, String> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, *a, *b),
        (Value::String(s), Value::Int(count)) if op == BinaryOp::Mul => repeat(s, *count),
        _ => match (as_number(&left), as_number(&right)) {
            (Some(a), Some(b)) => float_arithmetic(op, a, b).map(Value::Float),
            _ => Err(mismatch(op, &left, &right)),
        },
    }
}

fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<Value, String> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div | BinaryOp::Rem if b == 0 => return Err("division by zero".to_string()),
        BinaryOp::Div => a.checked_div(b),
        BinaryOp::Rem => a.checked_rem(b),
        // A negative exponent has no integer result.
        BinaryOp::Pow if b < 0 => return Ok(Value::Float((a as f64).powf(b as f64))),
        BinaryOp::Pow => u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp)),
        other => return Err(format!("'{}' is not an arithmetic operator", other.symbol())),
    };
    result
        .map(Value::Int)
        .ok_or_else(|| format!("integer overflow in {} {} {}", a, op.symbol(), b))
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Result<f64, String> {
    Ok(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        BinaryOp::Pow => a.powf(b),
        other => return Err(format!("'{}' is not an arithmetic operator", other.symbol())),
    })
}

fn repeat(s: &str, count: i64) -> Result<Value, String> {
    let count = usize::try_from(count)
        .map_err(|_| format!("cannot repeat a string {} times", count))?;
    if s.len().checked_mul(count).is_none() {
        return Err(format!("repeating a string {} times overflows", count));
    }
    Ok(Value::String(s.repeat(count)))
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (as_number(left), as_number(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => return Err(mismatch(op, left, right)),
        },
    };
    // NaN is unordered: every comparison with it is false.
    let result = ordering.map_or(false, |ordering| match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    });
    Ok(Value::Bool(result))
}

fn bitwise(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    let (Value::Int(a), Value::Int(b)) = (left, right) else {
        return Err(mismatch(op, left, right));
    };
    let (a, b) = (*a, *b);
    match op {
        BinaryOp::BitOr => Ok(Value::Int(a | b)),
        BinaryOp::BitXor => Ok(Value::Int(a ^ b)),
        BinaryOp::BitAnd => Ok(Value::Int(a & b)),
        BinaryOp::Shl | BinaryOp::Shr => {
            let shift = u32::try_from(b)
                .ok()
                .filter(|shift| *shift < i64::BITS)
                .ok_or_else(|| format!("shift amount {} is out of range", b))?;
            Ok(Value::Int(if op == BinaryOp::Shl {
                a << shift
            } else {
                a >> shift
            }))
        }
        other => Err(format!("'{}' is not a bitwise operator", other.symbol())),
    }
}
