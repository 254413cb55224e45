// Abstract interpretation of operators over the value lattice.
//
// Fully known operands with a defined operation produce a known result;
// operands with known types but unknown values produce a type-only result
// where the result type is determinable; anything else is Indeterminate or
// an error. Errors carry no offsets here; the analysis pass attaches the
// source location.

use std::collections::HashSet;

use pyrite_ast::value::{Value, ValueKind, ValueType};
use pyrite_ast::{BinaryOperator, TernaryOperator, UnaryOperator};

pub type OperatorResult = Result<Value, String>;

fn is_int_like(v: &Value) -> bool {
    matches!(v.value_type(), ValueType::Bool | ValueType::Int)
}

fn is_numeric(v: &Value) -> bool {
    matches!(
        v.value_type(),
        ValueType::Bool | ValueType::Int | ValueType::Float
    )
}

fn ipow(base: i64, exponent: i64) -> i64 {
    let mut result: i64 = 1;
    let mut exponent = exponent;
    while exponent > 0 {
        result = result.wrapping_mul(base);
        exponent -= 1;
    }
    result
}

fn static_truth(v: &Value) -> Result<bool, String> {
    v.truth_value()
        .ok_or_else(|| format!("{} has no static truth value", v.value_type()))
}

pub fn execute_unary_operator(oper: UnaryOperator, var: &Value) -> OperatorResult {
    if var.value_type() == ValueType::Indeterminate
        && !matches!(oper, UnaryOperator::LogicalNot | UnaryOperator::Yield)
    {
        return Ok(Value::indeterminate());
    }

    match oper {
        UnaryOperator::LogicalNot => {
            if !var.value_known() {
                return Ok(Value::unknown(ValueType::Bool));
            }
            Ok(Value::bool_value(!static_truth(var)?))
        }

        UnaryOperator::BitwiseNot => match &var.kind {
            // ~True is -2, ~False is -1
            ValueKind::Bool(Some(b)) => Ok(Value::int(if *b { -2 } else { -1 })),
            ValueKind::Bool(None) => Ok(Value::unknown(ValueType::Int)),
            ValueKind::Int(Some(i)) => Ok(Value::int(!i)),
            ValueKind::Int(None) => Ok(Value::unknown(ValueType::Int)),
            _ => Err(format!("~ doesn't work on {}", var.value_type())),
        },

        UnaryOperator::Positive => match &var.kind {
            ValueKind::Bool(Some(b)) => Ok(Value::int(*b as i64)),
            ValueKind::Bool(None) => Ok(Value::unknown(ValueType::Int)),
            ValueKind::Int(_) | ValueKind::Float(_) => Ok(var.clone()),
            _ => Err(format!("unary + doesn't work on {}", var.value_type())),
        },

        UnaryOperator::Negative => match &var.kind {
            ValueKind::Bool(Some(b)) => Ok(Value::int(-(*b as i64))),
            ValueKind::Bool(None) => Ok(Value::unknown(ValueType::Int)),
            ValueKind::Int(Some(i)) => Ok(Value::int(i.wrapping_neg())),
            ValueKind::Int(None) => Ok(Value::unknown(ValueType::Int)),
            ValueKind::Float(Some(f)) => Ok(Value::float(-f)),
            ValueKind::Float(None) => Ok(Value::unknown(ValueType::Float)),
            _ => Err(format!("unary - doesn't work on {}", var.value_type())),
        },

        // a yield expression can produce anything; it depends on the caller
        UnaryOperator::Yield => Ok(Value::indeterminate()),
    }
}

pub fn execute_binary_operator(
    oper: BinaryOperator,
    left: &Value,
    right: &Value,
) -> OperatorResult {
    // an operand of unknown type poisons the result, except that
    // comparisons still have a determinable Bool result type
    if left.value_type() == ValueType::Indeterminate
        || right.value_type() == ValueType::Indeterminate
    {
        return Ok(match oper {
            BinaryOperator::LessThan
            | BinaryOperator::GreaterThan
            | BinaryOperator::Equality
            | BinaryOperator::GreaterOrEqual
            | BinaryOperator::LessOrEqual
            | BinaryOperator::NotEqual
            | BinaryOperator::Is
            | BinaryOperator::IsNot
            | BinaryOperator::In
            | BinaryOperator::NotIn => Value::unknown(ValueType::Bool),
            _ => Value::indeterminate(),
        });
    }

    match oper {
        BinaryOperator::LogicalOr => {
            // the result is the left side if it's truthy, else the right
            if !left.value_known() {
                if matches!(
                    left.value_type(),
                    ValueType::Function | ValueType::Class | ValueType::Module
                ) {
                    return Ok(left.clone()); // can't be falsey
                }
                if left.value_type() == right.value_type() {
                    return Ok(Value::unknown(left.value_type()));
                }
                return Ok(Value::indeterminate());
            }
            if static_truth(left)? {
                Ok(left.clone())
            } else {
                Ok(right.clone())
            }
        }

        BinaryOperator::LogicalAnd => {
            // the result is the left side if it's falsey, else the right
            if !left.value_known() {
                if matches!(
                    left.value_type(),
                    ValueType::Function | ValueType::Class | ValueType::Module
                ) {
                    return Ok(right.clone()); // can't be falsey
                }
                if left.value_type() == right.value_type() {
                    return Ok(Value::unknown(left.value_type()));
                }
                return Ok(Value::indeterminate());
            }
            if !static_truth(left)? {
                Ok(left.clone())
            } else {
                Ok(right.clone())
            }
        }

        BinaryOperator::LessThan => {
            if !left.value_known() || !right.value_known() {
                return Ok(Value::unknown(ValueType::Bool));
            }

            match (&left.kind, &right.kind) {
                (ValueKind::Bool(_) | ValueKind::Int(_), ValueKind::Bool(_) | ValueKind::Int(_)) => {
                    Ok(Value::bool_value(
                        left.as_int().unwrap_or(0) < right.as_int().unwrap_or(0),
                    ))
                }
                (ValueKind::Bool(_) | ValueKind::Int(_), ValueKind::Float(Some(f))) => {
                    Ok(Value::bool_value((left.as_int().unwrap_or(0) as f64) < *f))
                }
                (ValueKind::Float(Some(f)), ValueKind::Bool(_) | ValueKind::Int(_)) => {
                    Ok(Value::bool_value(*f < (right.as_int().unwrap_or(0) as f64)))
                }
                (ValueKind::Float(Some(a)), ValueKind::Float(Some(b))) => {
                    Ok(Value::bool_value(a < b))
                }
                (ValueKind::Bytes(Some(a)), ValueKind::Bytes(Some(b))) => {
                    Ok(Value::bool_value(a < b))
                }
                (ValueKind::Unicode(Some(a)), ValueKind::Unicode(Some(b))) => {
                    Ok(Value::bool_value(a < b))
                }
                (ValueKind::List(Some(a)), ValueKind::List(Some(b)))
                | (ValueKind::Tuple(Some(a)), ValueKind::Tuple(Some(b))) => {
                    // lexicographic; an unknown element comparison makes the
                    // whole result unknown
                    for (left_item, right_item) in a.iter().zip(b.iter()) {
                        let less = execute_binary_operator(
                            BinaryOperator::LessThan,
                            left_item,
                            right_item,
                        )?;
                        match less.truth_value() {
                            None => return Ok(Value::unknown(ValueType::Bool)),
                            Some(true) => return Ok(Value::bool_value(true)),
                            Some(false) => {}
                        }
                        let greater = execute_binary_operator(
                            BinaryOperator::GreaterThan,
                            left_item,
                            right_item,
                        )?;
                        match greater.truth_value() {
                            None => return Ok(Value::unknown(ValueType::Bool)),
                            Some(true) => return Ok(Value::bool_value(false)),
                            Some(false) => {}
                        }
                    }
                    Ok(Value::bool_value(a.len() < b.len()))
                }
                (ValueKind::Set(_), _) => Err("subset operator not yet implemented".to_string()),
                _ => Err(format!(
                    "can't compare {} and {}",
                    left.value_type(),
                    right.value_type()
                )),
            }
        }

        // the difference between is and == is an implementation detail of
        // the runtime; the lattice treats them identically
        BinaryOperator::Is | BinaryOperator::Equality => {
            if !left.value_known() || !right.value_known() {
                return Ok(Value::unknown(ValueType::Bool));
            }

            if is_int_like(left) {
                return Ok(match &right.kind {
                    ValueKind::Bool(_) | ValueKind::Int(_) => {
                        Value::bool_value(left.as_int() == right.as_int())
                    }
                    ValueKind::Float(Some(f)) => {
                        Value::bool_value((left.as_int().unwrap_or(0) as f64) == *f)
                    }
                    _ => Value::bool_value(false),
                });
            }
            if let ValueKind::Float(Some(f)) = &left.kind {
                return Ok(match &right.kind {
                    ValueKind::Bool(_) | ValueKind::Int(_) => {
                        Value::bool_value(*f == (right.as_int().unwrap_or(0) as f64))
                    }
                    ValueKind::Float(Some(g)) => Value::bool_value(f == g),
                    _ => Value::bool_value(false),
                });
            }

            // non-numeric types must match exactly
            if left.value_type() != right.value_type() {
                return Ok(Value::bool_value(false));
            }
            match (&left.kind, &right.kind) {
                (ValueKind::None, ValueKind::None) => Ok(Value::bool_value(true)),
                (ValueKind::Bytes(Some(a)), ValueKind::Bytes(Some(b))) => {
                    Ok(Value::bool_value(a == b))
                }
                (ValueKind::Unicode(Some(a)), ValueKind::Unicode(Some(b))) => {
                    Ok(Value::bool_value(a == b))
                }
                (ValueKind::List(Some(a)), ValueKind::List(Some(b)))
                | (ValueKind::Tuple(Some(a)), ValueKind::Tuple(Some(b))) => {
                    if a.len() != b.len() {
                        return Ok(Value::bool_value(false));
                    }
                    for (left_item, right_item) in a.iter().zip(b.iter()) {
                        let equal = execute_binary_operator(
                            BinaryOperator::Equality,
                            left_item,
                            right_item,
                        )?;
                        match equal.truth_value() {
                            None => return Ok(Value::unknown(ValueType::Bool)),
                            Some(false) => return Ok(Value::bool_value(false)),
                            Some(true) => {}
                        }
                    }
                    Ok(Value::bool_value(true))
                }
                _ => Err(format!("can't test equality of {} values", left.value_type())),
            }
        }

        BinaryOperator::GreaterThan => {
            let less = execute_binary_operator(BinaryOperator::LessThan, left, right)?;
            let equal = execute_binary_operator(BinaryOperator::Equality, left, right)?;
            let either = execute_binary_operator(BinaryOperator::LogicalOr, &less, &equal)?;
            execute_unary_operator(UnaryOperator::LogicalNot, &either)
        }

        BinaryOperator::GreaterOrEqual => {
            let less = execute_binary_operator(BinaryOperator::LessThan, left, right)?;
            execute_unary_operator(UnaryOperator::LogicalNot, &less)
        }

        BinaryOperator::LessOrEqual => {
            let less = execute_binary_operator(BinaryOperator::LessThan, left, right)?;
            let equal = execute_binary_operator(BinaryOperator::Equality, left, right)?;
            execute_binary_operator(BinaryOperator::LogicalOr, &less, &equal)
        }

        BinaryOperator::IsNot | BinaryOperator::NotEqual => {
            let equal = execute_binary_operator(BinaryOperator::Equality, left, right)?;
            execute_unary_operator(UnaryOperator::LogicalNot, &equal)
        }

        BinaryOperator::In => match &right.kind {
            ValueKind::Bytes(contents) => {
                if left.value_type() != ValueType::Bytes {
                    return Err("in Bytes requires another Bytes".to_string());
                }
                if let ValueKind::Bytes(Some(needle)) = &left.kind {
                    if needle.is_empty() {
                        return Ok(Value::bool_value(true));
                    }
                    if let Some(haystack) = contents {
                        return Ok(Value::bool_value(
                            haystack.windows(needle.len()).any(|w| w == &needle[..]),
                        ));
                    }
                }
                Ok(Value::unknown(ValueType::Bool))
            }

            ValueKind::Unicode(contents) => {
                if left.value_type() != ValueType::Unicode {
                    return Err("in Unicode requires another Unicode".to_string());
                }
                if let ValueKind::Unicode(Some(needle)) = &left.kind {
                    if needle.is_empty() {
                        return Ok(Value::bool_value(true));
                    }
                    if let Some(haystack) = contents {
                        return Ok(Value::bool_value(haystack.contains(needle.as_str())));
                    }
                }
                Ok(Value::unknown(ValueType::Bool))
            }

            ValueKind::List(items) | ValueKind::Tuple(items) => {
                if let Some(items) = items {
                    if items.is_empty() {
                        return Ok(Value::bool_value(false));
                    }
                    if left.value_known() {
                        for item in items {
                            let equal =
                                execute_binary_operator(BinaryOperator::Equality, left, item)?;
                            match equal.truth_value() {
                                None => return Ok(Value::unknown(ValueType::Bool)),
                                Some(true) => return Ok(Value::bool_value(true)),
                                Some(false) => {}
                            }
                        }
                        return Ok(Value::bool_value(false));
                    }
                }
                Ok(Value::unknown(ValueType::Bool))
            }

            ValueKind::Set(items) => {
                if let Some(items) = items {
                    if items.is_empty() {
                        return Ok(Value::bool_value(false));
                    }
                    if left.value_known() {
                        return Ok(Value::bool_value(items.contains(left)));
                    }
                }
                Ok(Value::unknown(ValueType::Bool))
            }

            ValueKind::Dict(items) => {
                if let Some(items) = items {
                    if items.is_empty() {
                        return Ok(Value::bool_value(false));
                    }
                    if left.value_known() {
                        return Ok(Value::bool_value(items.contains_key(left)));
                    }
                }
                Ok(Value::unknown(ValueType::Bool))
            }

            _ => Err(format!("non-collection {} given to in", right.value_type())),
        },

        BinaryOperator::NotIn => {
            let contains = execute_binary_operator(BinaryOperator::In, left, right)?;
            execute_unary_operator(UnaryOperator::LogicalNot, &contains)
        }

        BinaryOperator::Or => {
            // set union
            if left.value_type() == ValueType::Set && right.value_type() == ValueType::Set {
                if let (ValueKind::Set(Some(a)), ValueKind::Set(Some(b))) =
                    (&left.kind, &right.kind)
                {
                    let mut result = a.clone();
                    for item in b {
                        result.insert(item.clone());
                    }
                    return Ok(Value::set(result));
                }
                return Ok(Value::unknown(ValueType::Set));
            }
            bitwise_int_operation(left, right, "|", |a, b| a | b, |a, b| a || b)
        }

        BinaryOperator::And => {
            // set intersection
            if left.value_type() == ValueType::Set && right.value_type() == ValueType::Set {
                if let (ValueKind::Set(Some(a)), ValueKind::Set(Some(b))) =
                    (&left.kind, &right.kind)
                {
                    let result: HashSet<Value> =
                        a.iter().filter(|item| b.contains(item)).cloned().collect();
                    return Ok(Value::set(result));
                }
                return Ok(Value::unknown(ValueType::Set));
            }

            if !is_int_like(left) || !is_int_like(right) {
                return Err("& requires integer/boolean arguments".to_string());
            }
            if left.value_type() == ValueType::Bool && right.value_type() == ValueType::Bool {
                // a known falsey side decides the result
                if matches!(left.kind, ValueKind::Bool(Some(false)))
                    || matches!(right.kind, ValueKind::Bool(Some(false)))
                {
                    return Ok(Value::bool_value(false));
                }
                if !left.value_known() || !right.value_known() {
                    return Ok(Value::unknown(ValueType::Bool));
                }
                return Ok(Value::bool_value(
                    left.as_int().unwrap_or(0) != 0 && right.as_int().unwrap_or(0) != 0,
                ));
            }
            if !left.value_known() || !right.value_known() {
                return Ok(Value::unknown(ValueType::Int));
            }
            Ok(Value::int(
                left.as_int().unwrap_or(0) & right.as_int().unwrap_or(0),
            ))
        }

        BinaryOperator::Xor => {
            // set symmetric difference
            if left.value_type() == ValueType::Set && right.value_type() == ValueType::Set {
                if let (ValueKind::Set(Some(a)), ValueKind::Set(Some(b))) =
                    (&left.kind, &right.kind)
                {
                    let mut result = a.clone();
                    for item in b {
                        if !result.remove(item) {
                            result.insert(item.clone());
                        }
                    }
                    return Ok(Value::set(result));
                }
                return Ok(Value::unknown(ValueType::Set));
            }

            if !is_int_like(left) || !is_int_like(right) {
                return Err("^ requires integer/boolean arguments".to_string());
            }
            if left.value_type() == ValueType::Bool && right.value_type() == ValueType::Bool {
                if !left.value_known() || !right.value_known() {
                    return Ok(Value::unknown(ValueType::Bool));
                }
                return Ok(Value::bool_value(
                    (left.as_int().unwrap_or(0) != 0) != (right.as_int().unwrap_or(0) != 0),
                ));
            }
            if !left.value_known() || !right.value_known() {
                return Ok(Value::unknown(ValueType::Int));
            }
            Ok(Value::int(
                left.as_int().unwrap_or(0) ^ right.as_int().unwrap_or(0),
            ))
        }

        BinaryOperator::LeftShift | BinaryOperator::RightShift => {
            if !is_int_like(left) || !is_int_like(right) {
                return Err("shifts require integer/boolean arguments".to_string());
            }
            if !left.value_known() || !right.value_known() {
                return Ok(Value::unknown(ValueType::Int));
            }
            let l = left.as_int().unwrap_or(0);
            let r = right.as_int().unwrap_or(0) as u32;
            Ok(Value::int(if oper == BinaryOperator::LeftShift {
                l.wrapping_shl(r)
            } else {
                l.wrapping_shr(r)
            }))
        }

        BinaryOperator::Addition => match left.value_type() {
            ValueType::Bool | ValueType::Int => match right.value_type() {
                ValueType::Bool | ValueType::Int => {
                    if !left.value_known() || !right.value_known() {
                        return Ok(Value::unknown(ValueType::Int));
                    }
                    Ok(Value::int(
                        left.as_int()
                            .unwrap_or(0)
                            .wrapping_add(right.as_int().unwrap_or(0)),
                    ))
                }
                ValueType::Float => {
                    if !left.value_known() || !right.value_known() {
                        return Ok(Value::unknown(ValueType::Float));
                    }
                    Ok(Value::float(
                        left.as_int().unwrap_or(0) as f64 + right.as_float().unwrap_or(0.0),
                    ))
                }
                _ => Err("can't add numeric and non-numeric types".to_string()),
            },

            ValueType::Float => match right.value_type() {
                ValueType::Bool | ValueType::Int => {
                    if !left.value_known() || !right.value_known() {
                        return Ok(Value::unknown(ValueType::Float));
                    }
                    Ok(Value::float(
                        left.as_float().unwrap_or(0.0) + right.as_int().unwrap_or(0) as f64,
                    ))
                }
                ValueType::Float => {
                    if !left.value_known() || !right.value_known() {
                        return Ok(Value::unknown(ValueType::Float));
                    }
                    Ok(Value::float(
                        left.as_float().unwrap_or(0.0) + right.as_float().unwrap_or(0.0),
                    ))
                }
                _ => Err("can't add numeric and non-numeric types".to_string()),
            },

            ValueType::Bytes => {
                if right.value_type() != ValueType::Bytes {
                    return Err("can't append bytes and non-bytes".to_string());
                }
                if let (ValueKind::Bytes(Some(a)), ValueKind::Bytes(Some(b))) =
                    (&left.kind, &right.kind)
                {
                    let mut merged = a.clone();
                    merged.extend_from_slice(b);
                    return Ok(Value::bytes(merged));
                }
                Ok(Value::unknown(ValueType::Bytes))
            }

            ValueType::Unicode => {
                if right.value_type() != ValueType::Unicode {
                    return Err("can't append unicode and non-unicode".to_string());
                }
                if let (ValueKind::Unicode(Some(a)), ValueKind::Unicode(Some(b))) =
                    (&left.kind, &right.kind)
                {
                    return Ok(Value::unicode(format!("{}{}", a, b)));
                }
                Ok(Value::unknown(ValueType::Unicode))
            }

            ValueType::List | ValueType::Tuple => {
                if right.value_type() != left.value_type() {
                    return Err("can't append list/tuple and non-list/tuple".to_string());
                }
                match (&left.kind, &right.kind) {
                    (ValueKind::List(Some(a)), ValueKind::List(Some(b))) => {
                        let mut merged = a.clone();
                        merged.extend(b.iter().cloned());
                        Ok(Value::list(merged))
                    }
                    (ValueKind::Tuple(Some(a)), ValueKind::Tuple(Some(b))) => {
                        let mut merged = a.clone();
                        merged.extend(b.iter().cloned());
                        Ok(Value::tuple(merged))
                    }
                    _ => Ok(Value::unknown_with_extension_types(
                        left.value_type(),
                        left.extension_types.clone(),
                    )),
                }
            }

            _ => Err(format!("invalid type to + ({})", left.value_type())),
        },

        BinaryOperator::Subtraction => {
            // set difference
            if left.value_type() == ValueType::Set && right.value_type() == ValueType::Set {
                if let (ValueKind::Set(Some(a)), ValueKind::Set(Some(b))) =
                    (&left.kind, &right.kind)
                {
                    let result: HashSet<Value> =
                        a.iter().filter(|item| !b.contains(item)).cloned().collect();
                    return Ok(Value::set(result));
                }
                return Ok(Value::unknown(ValueType::Set));
            }

            // otherwise it's left + (-right)
            let negated = execute_unary_operator(UnaryOperator::Negative, right)?;
            execute_binary_operator(BinaryOperator::Addition, left, &negated)
        }

        BinaryOperator::Multiplication => {
            // list/tuple replication
            let (sequence, multiplier) = if matches!(
                left.value_type(),
                ValueType::List | ValueType::Tuple
            ) {
                (Some(left), right)
            } else if matches!(right.value_type(), ValueType::List | ValueType::Tuple) {
                (Some(right), left)
            } else {
                (None, right)
            };

            if let Some(sequence) = sequence {
                if !is_int_like(multiplier) {
                    return Err("list/tuple multipliers must be Int or Bool".to_string());
                }
                let is_tuple = sequence.value_type() == ValueType::Tuple;
                let make_empty = || {
                    if is_tuple {
                        Value::tuple(Vec::new())
                    } else {
                        Value::list(Vec::new())
                    }
                };

                let items: Option<&Vec<Value>> = match &sequence.kind {
                    ValueKind::List(Some(items)) | ValueKind::Tuple(Some(items)) => Some(items),
                    _ => None,
                };
                if let Some(items) = items {
                    if items.is_empty() {
                        return Ok(make_empty());
                    }
                }
                match multiplier.as_int() {
                    Some(0) => return Ok(make_empty()),
                    Some(1) => return Ok(sequence.clone()),
                    _ => {}
                }
                let (Some(items), Some(count)) = (items, multiplier.as_int()) else {
                    // type-only: the extension type is preserved
                    return Ok(Value::unknown_with_extension_types(
                        sequence.value_type(),
                        sequence.extension_types.clone(),
                    ));
                };

                let mut result = Vec::with_capacity(items.len() * count.max(0) as usize);
                for _ in 0..count.max(0) {
                    result.extend(items.iter().cloned());
                }
                return Ok(if is_tuple {
                    Value::tuple(result)
                } else {
                    Value::list(result)
                });
            }

            if !is_numeric(left) || !is_numeric(right) {
                return Err("can't multiply numeric and non-numeric types".to_string());
            }
            if is_int_like(left) && is_int_like(right) {
                if !left.value_known() || !right.value_known() {
                    return Ok(Value::unknown(ValueType::Int));
                }
                return Ok(Value::int(
                    left.as_int()
                        .unwrap_or(0)
                        .wrapping_mul(right.as_int().unwrap_or(0)),
                ));
            }
            if !left.value_known() || !right.value_known() {
                return Ok(Value::unknown(ValueType::Float));
            }
            Ok(Value::float(numeric_as_f64(left) * numeric_as_f64(right)))
        }

        BinaryOperator::Division => {
            if !is_numeric(left) || !is_numeric(right) {
                return Err("can't divide numeric and non-numeric types".to_string());
            }
            // / always produces Float, even for two integers
            if !left.value_known() || !right.value_known() {
                return Ok(Value::unknown(ValueType::Float));
            }
            Ok(Value::float(numeric_as_f64(left) / numeric_as_f64(right)))
        }

        BinaryOperator::Modulus => {
            if matches!(left.value_type(), ValueType::Bytes | ValueType::Unicode) {
                return Err(format!(
                    "{} format operator not yet implemented",
                    left.value_type()
                ));
            }
            if !is_numeric(left) || !is_numeric(right) {
                return Err("can't take modulus of non-numeric types".to_string());
            }
            if is_int_like(left) && is_int_like(right) {
                if !left.value_known() || !right.value_known() {
                    return Ok(Value::unknown(ValueType::Int));
                }
                let divisor = right.as_int().unwrap_or(0);
                if divisor == 0 {
                    return Err("integer modulo by zero".to_string());
                }
                return Ok(Value::int(left.as_int().unwrap_or(0).wrapping_rem(divisor)));
            }
            if !left.value_known() || !right.value_known() {
                return Ok(Value::unknown(ValueType::Float));
            }
            Ok(Value::float(numeric_as_f64(left) % numeric_as_f64(right)))
        }

        BinaryOperator::IntegerDivision => {
            if !is_numeric(left) || !is_numeric(right) {
                return Err("can't integer divide non-numeric types".to_string());
            }
            if is_int_like(left) && is_int_like(right) {
                if !left.value_known() || !right.value_known() {
                    return Ok(Value::unknown(ValueType::Int));
                }
                let divisor = right.as_int().unwrap_or(0);
                if divisor == 0 {
                    return Err("integer division by zero".to_string());
                }
                return Ok(Value::int(left.as_int().unwrap_or(0).wrapping_div(divisor)));
            }
            if !left.value_known() || !right.value_known() {
                return Ok(Value::unknown(ValueType::Float));
            }
            Ok(Value::float(
                (numeric_as_f64(left) / numeric_as_f64(right)).floor(),
            ))
        }

        BinaryOperator::Exponentiation => {
            if !is_numeric(left) || !is_numeric(right) {
                return Err("can't exponentiate non-numeric types".to_string());
            }

            if is_int_like(left) && is_int_like(right) {
                // a known negative Int exponent forces a Float result
                if !right.value_known() {
                    return Ok(Value::unknown(ValueType::Int));
                }
                let exponent = right.as_int().unwrap_or(0);
                if exponent < 0 {
                    if !left.value_known() {
                        return Ok(Value::unknown(ValueType::Float));
                    }
                    return Ok(Value::float(
                        (left.as_int().unwrap_or(0) as f64).powi(exponent as i32),
                    ));
                }
                if !left.value_known() {
                    return Ok(Value::unknown(ValueType::Int));
                }
                return Ok(Value::int(ipow(left.as_int().unwrap_or(0), exponent)));
            }

            if !left.value_known() || !right.value_known() {
                return Ok(Value::unknown(ValueType::Float));
            }
            Ok(Value::float(
                numeric_as_f64(left).powf(numeric_as_f64(right)),
            ))
        }
    }
}

pub fn execute_ternary_operator(
    oper: TernaryOperator,
    left: &Value,
    center: &Value,
    right: &Value,
) -> OperatorResult {
    let TernaryOperator::IfElse = oper;

    if center.value_known() {
        return Ok(if static_truth(center)? {
            left.clone()
        } else {
            right.clone()
        });
    }

    // we can't know which side is taken; if they're known-equal it doesn't
    // matter, and same-typed sides merge to a type-only value
    let equal = execute_binary_operator(BinaryOperator::Equality, left, right)?;
    if equal.truth_value() == Some(true) {
        return Ok(left.clone());
    }
    if left.value_type() == right.value_type() {
        return Ok(Value::unknown(left.value_type()));
    }
    Ok(Value::indeterminate())
}

fn numeric_as_f64(v: &Value) -> f64 {
    match &v.kind {
        ValueKind::Float(Some(f)) => *f,
        _ => v.as_int().unwrap_or(0) as f64,
    }
}

fn bitwise_int_operation(
    left: &Value,
    right: &Value,
    name: &str,
    int_op: fn(i64, i64) -> i64,
    bool_op: fn(bool, bool) -> bool,
) -> OperatorResult {
    if !is_int_like(left) || !is_int_like(right) {
        return Err(format!("{} requires integer/boolean arguments", name));
    }
    if left.value_type() == ValueType::Bool && right.value_type() == ValueType::Bool {
        // for | a known truthy side decides
        if name == "|"
            && (matches!(left.kind, ValueKind::Bool(Some(true)))
                || matches!(right.kind, ValueKind::Bool(Some(true))))
        {
            return Ok(Value::bool_value(true));
        }
        if !left.value_known() || !right.value_known() {
            return Ok(Value::unknown(ValueType::Bool));
        }
        return Ok(Value::bool_value(bool_op(
            left.as_int().unwrap_or(0) != 0,
            right.as_int().unwrap_or(0) != 0,
        )));
    }
    if !left.value_known() || !right.value_known() {
        return Ok(Value::unknown(ValueType::Int));
    }
    Ok(Value::int(int_op(
        left.as_int().unwrap_or(0),
        right.as_int().unwrap_or(0),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unknown(t: ValueType) -> Value {
        Value::unknown(t)
    }

    #[test]
    fn test_known_arithmetic() {
        assert_eq!(
            execute_binary_operator(BinaryOperator::Addition, &Value::int(1), &Value::int(2)),
            Ok(Value::int(3))
        );
        assert_eq!(
            execute_binary_operator(BinaryOperator::Addition, &Value::int(1), &Value::float(0.5)),
            Ok(Value::float(1.5))
        );
        assert_eq!(
            execute_binary_operator(
                BinaryOperator::Subtraction,
                &Value::int(1),
                &Value::int(3)
            ),
            Ok(Value::int(-2))
        );
        assert_eq!(
            execute_binary_operator(
                BinaryOperator::Multiplication,
                &Value::int(6),
                &Value::int(7)
            ),
            Ok(Value::int(42))
        );
    }

    #[test]
    fn test_type_only_results() {
        let r = execute_binary_operator(
            BinaryOperator::Addition,
            &unknown(ValueType::Int),
            &Value::int(1),
        )
        .unwrap();
        assert_eq!(r.value_type(), ValueType::Int);
        assert!(!r.value_known());

        let r = execute_binary_operator(
            BinaryOperator::Addition,
            &unknown(ValueType::Int),
            &unknown(ValueType::Float),
        )
        .unwrap();
        assert_eq!(r.value_type(), ValueType::Float);

        let r = execute_binary_operator(
            BinaryOperator::Addition,
            &unknown(ValueType::Bytes),
            &unknown(ValueType::Bytes),
        )
        .unwrap();
        assert_eq!(r.value_type(), ValueType::Bytes);
    }

    #[test]
    fn test_integer_wrap() {
        assert_eq!(
            execute_binary_operator(
                BinaryOperator::Addition,
                &Value::int(i64::MAX),
                &Value::int(1)
            ),
            Ok(Value::int(i64::MIN))
        );
    }

    #[test]
    fn test_division_always_float() {
        assert_eq!(
            execute_binary_operator(BinaryOperator::Division, &Value::int(3), &Value::int(2)),
            Ok(Value::float(1.5))
        );
        assert_eq!(
            execute_binary_operator(
                BinaryOperator::IntegerDivision,
                &Value::int(7),
                &Value::int(2)
            ),
            Ok(Value::int(3))
        );
    }

    #[test]
    fn test_exponentiation_edge_cases() {
        // 2**-1 is the float 0.5
        assert_eq!(
            execute_binary_operator(
                BinaryOperator::Exponentiation,
                &Value::int(2),
                &Value::int(-1)
            ),
            Ok(Value::float(0.5))
        );
        assert_eq!(
            execute_binary_operator(
                BinaryOperator::Exponentiation,
                &Value::int(2),
                &Value::int(10)
            ),
            Ok(Value::int(1024))
        );
        // unknown base, known negative exponent: Float
        let r = execute_binary_operator(
            BinaryOperator::Exponentiation,
            &unknown(ValueType::Int),
            &Value::int(-2),
        )
        .unwrap();
        assert_eq!(r.value_type(), ValueType::Float);
        assert!(!r.value_known());
    }

    #[test]
    fn test_short_circuit() {
        // statically truthy left decides an or without the right side
        assert_eq!(
            execute_binary_operator(
                BinaryOperator::LogicalOr,
                &Value::int(5),
                &unknown(ValueType::Unicode)
            ),
            Ok(Value::int(5))
        );
        assert_eq!(
            execute_binary_operator(
                BinaryOperator::LogicalAnd,
                &Value::int(0),
                &unknown(ValueType::Unicode)
            ),
            Ok(Value::int(0))
        );
        // unknown left of the same type as the right merges type-only
        let r = execute_binary_operator(
            BinaryOperator::LogicalOr,
            &unknown(ValueType::Int),
            &Value::int(5),
        )
        .unwrap();
        assert_eq!(r.value_type(), ValueType::Int);
        assert!(!r.value_known());
        // different types give Indeterminate
        let r = execute_binary_operator(
            BinaryOperator::LogicalOr,
            &unknown(ValueType::Int),
            &Value::unicode("s"),
        )
        .unwrap();
        assert_eq!(r.value_type(), ValueType::Indeterminate);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            execute_binary_operator(BinaryOperator::LessThan, &Value::int(1), &Value::int(2)),
            Ok(Value::bool_value(true))
        );
        assert_eq!(
            execute_binary_operator(
                BinaryOperator::GreaterOrEqual,
                &Value::int(2),
                &Value::int(2)
            ),
            Ok(Value::bool_value(true))
        );
        assert!(execute_binary_operator(
            BinaryOperator::LessThan,
            &Value::int(1),
            &Value::unicode("x")
        )
        .is_err());
        // equality across numeric types works; across others it's false
        assert_eq!(
            execute_binary_operator(BinaryOperator::Equality, &Value::int(1), &Value::float(1.0)),
            Ok(Value::bool_value(true))
        );
        assert_eq!(
            execute_binary_operator(
                BinaryOperator::Equality,
                &Value::int(1),
                &Value::unicode("x")
            ),
            Ok(Value::bool_value(false))
        );
    }

    #[test]
    fn test_in_operator() {
        let list = Value::list(vec![Value::int(1), Value::int(2)]);
        assert_eq!(
            execute_binary_operator(BinaryOperator::In, &Value::int(2), &list),
            Ok(Value::bool_value(true))
        );
        assert_eq!(
            execute_binary_operator(BinaryOperator::NotIn, &Value::int(3), &list),
            Ok(Value::bool_value(true))
        );
        assert_eq!(
            execute_binary_operator(
                BinaryOperator::In,
                &Value::bytes(b"el".to_vec()),
                &Value::bytes(b"hello".to_vec())
            ),
            Ok(Value::bool_value(true))
        );
        // an empty known container decides statically
        assert_eq!(
            execute_binary_operator(
                BinaryOperator::In,
                &unknown(ValueType::Int),
                &Value::list(Vec::new())
            ),
            Ok(Value::bool_value(false))
        );
    }

    #[test]
    fn test_set_operations() {
        let a = Value::set([Value::int(1), Value::int(2)].into_iter().collect());
        let b = Value::set([Value::int(2), Value::int(3)].into_iter().collect());

        let union = execute_binary_operator(BinaryOperator::Or, &a, &b).unwrap();
        let ValueKind::Set(Some(items)) = &union.kind else {
            panic!("expected a known set");
        };
        assert_eq!(items.len(), 3);

        let intersection = execute_binary_operator(BinaryOperator::And, &a, &b).unwrap();
        let ValueKind::Set(Some(items)) = &intersection.kind else {
            panic!("expected a known set");
        };
        assert_eq!(items.len(), 1);

        let sym_diff = execute_binary_operator(BinaryOperator::Xor, &a, &b).unwrap();
        let ValueKind::Set(Some(items)) = &sym_diff.kind else {
            panic!("expected a known set");
        };
        assert_eq!(items.len(), 2);

        let difference = execute_binary_operator(BinaryOperator::Subtraction, &a, &b).unwrap();
        let ValueKind::Set(Some(items)) = &difference.kind else {
            panic!("expected a known set");
        };
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_list_replication_preserves_extension_type() {
        let list = Value::list(vec![Value::int(1)]);
        let r = execute_binary_operator(
            BinaryOperator::Multiplication,
            &list.type_only(),
            &unknown(ValueType::Int),
        )
        .unwrap();
        assert_eq!(r.value_type(), ValueType::List);
        assert!(!r.value_known());
        assert_eq!(r.extension_types[0].value_type(), ValueType::Int);

        let replicated =
            execute_binary_operator(BinaryOperator::Multiplication, &list, &Value::int(3)).unwrap();
        let ValueKind::List(Some(items)) = &replicated.kind else {
            panic!("expected a known list");
        };
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(
            execute_unary_operator(UnaryOperator::Negative, &Value::int(5)),
            Ok(Value::int(-5))
        );
        assert_eq!(
            execute_unary_operator(UnaryOperator::BitwiseNot, &Value::int(0)),
            Ok(Value::int(-1))
        );
        assert_eq!(
            execute_unary_operator(UnaryOperator::BitwiseNot, &Value::bool_value(true)),
            Ok(Value::int(-2))
        );
        assert_eq!(
            execute_unary_operator(UnaryOperator::LogicalNot, &Value::int(0)),
            Ok(Value::bool_value(true))
        );
        assert_eq!(
            execute_unary_operator(UnaryOperator::Positive, &Value::bool_value(true)),
            Ok(Value::int(1))
        );
        assert!(execute_unary_operator(UnaryOperator::Negative, &Value::unicode("x")).is_err());
    }

    #[test]
    fn test_ternary() {
        assert_eq!(
            execute_ternary_operator(
                TernaryOperator::IfElse,
                &Value::int(1),
                &Value::bool_value(true),
                &Value::int(2)
            ),
            Ok(Value::int(1))
        );
        // unknown condition with same-typed sides merges type-only
        let r = execute_ternary_operator(
            TernaryOperator::IfElse,
            &Value::int(1),
            &unknown(ValueType::Bool),
            &Value::int(2),
        )
        .unwrap();
        assert_eq!(r.value_type(), ValueType::Int);
        assert!(!r.value_known());
        // known-equal sides stay known
        assert_eq!(
            execute_ternary_operator(
                TernaryOperator::IfElse,
                &Value::int(7),
                &unknown(ValueType::Bool),
                &Value::int(7)
            ),
            Ok(Value::int(7))
        );
        // different types give Indeterminate
        let r = execute_ternary_operator(
            TernaryOperator::IfElse,
            &Value::int(1),
            &unknown(ValueType::Bool),
            &Value::unicode("s"),
        )
        .unwrap();
        assert_eq!(r.value_type(), ValueType::Indeterminate);
    }
}
