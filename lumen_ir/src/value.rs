//! Runtime values and call signatures.
//!
//! A [`CallSignature`] is the concrete argument-type tuple observed at a
//! call. It is the part of a specialization key that varies per call, so it
//! is hashable and stores small arities inline.

use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Type Tag
// =============================================================================

/// Runtime type of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeTag {
    Nothing,
    Bool,
    Int,
    Float,
    Str,
}

impl TypeTag {
    /// Type name as shown in signatures.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Nothing => "Nothing",
            TypeTag::Bool => "Bool",
            TypeTag::Int => "Int",
            TypeTag::Float => "Float",
            TypeTag::Str => "Str",
        }
    }

    /// Check if values of this type are numbers.
    #[inline]
    pub fn is_numeric(self) -> bool {
        matches!(self, TypeTag::Int | TypeTag::Float)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Value
// =============================================================================

/// A runtime value passed through callables.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nothing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
}

impl Value {
    /// Build a string value.
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    /// Runtime type of this value.
    #[inline]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Nothing => TypeTag::Nothing,
            Value::Bool(_) => TypeTag::Bool,
            Value::Int(_) => TypeTag::Int,
            Value::Float(_) => TypeTag::Float,
            Value::Str(_) => TypeTag::Str,
        }
    }

    /// Truthiness used by conditional jumps.
    ///
    /// `Nothing`, `false`, zero and the empty string are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nothing => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nothing => f.write_str("nothing"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
        }
    }
}

// =============================================================================
// Call Signature
// =============================================================================

/// Most call sites pass at most this many arguments.
const INLINE_ARITY: usize = 4;

/// Ordered tuple of argument runtime types observed at a call.
///
/// Two signatures are equal iff they are elementwise type-equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CallSignature(SmallVec<[TypeTag; INLINE_ARITY]>);

impl CallSignature {
    /// Signature of the given concrete arguments.
    pub fn of(args: &[Value]) -> Self {
        Self(args.iter().map(Value::type_tag).collect())
    }

    /// Build a signature from explicit types.
    pub fn from_types<I: IntoIterator<Item = TypeTag>>(types: I) -> Self {
        Self(types.into_iter().collect())
    }

    /// Number of arguments.
    #[inline]
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// Argument types in order.
    #[inline]
    pub fn types(&self) -> &[TypeTag] {
        &self.0
    }

    /// Check whether `args` would produce this signature.
    pub fn matches(&self, args: &[Value]) -> bool {
        self.0.len() == args.len() && self.0.iter().zip(args).all(|(t, v)| *t == v.type_tag())
    }
}

impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, ty) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", ty)?;
        }
        if self.0.len() == 1 {
            f.write_str(",")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_value_type_tags() {
        assert_eq!(Value::Nothing.type_tag(), TypeTag::Nothing);
        assert_eq!(Value::Int(3).type_tag(), TypeTag::Int);
        assert_eq!(Value::Float(0.5).type_tag(), TypeTag::Float);
        assert_eq!(Value::str("x").type_tag(), TypeTag::Str);
        assert_eq!(Value::Bool(true).type_tag(), TypeTag::Bool);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nothing.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(!Value::str("").is_truthy());
        assert!(Value::Bool(true).is_truthy());
    }

    #[test]
    fn test_signature_equality_is_elementwise() {
        let a = CallSignature::of(&[Value::Int(1), Value::Float(2.0)]);
        let b = CallSignature::of(&[Value::Int(7), Value::Float(-1.0)]);
        let c = CallSignature::of(&[Value::Float(1.0), Value::Int(2)]);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_signature_matches() {
        let sig = CallSignature::from_types([TypeTag::Int]);
        assert!(sig.matches(&[Value::Int(4)]));
        assert!(!sig.matches(&[Value::Float(4.0)]));
        assert!(!sig.matches(&[Value::Int(4), Value::Int(5)]));
    }

    #[test]
    fn test_signature_display() {
        assert_eq!(CallSignature::default().to_string(), "()");
        assert_eq!(CallSignature::from_types([TypeTag::Int]).to_string(), "(Int,)");
        assert_eq!(
            CallSignature::from_types([TypeTag::Int, TypeTag::Str]).to_string(),
            "(Int, Str)"
        );
    }
}
