//! A small combinator algebra for composing generated value transforms.
//!
//! Lifts such as a custom-type `toBase`, an enum `fromValue`, or a zig-zag
//! decode are assembled as data and folded into a source fragment once.
//! Keeping the transforms first-order makes the composed fragments
//! inspectable in tests instead of being opaque closures.

/// A single value transform, or a composition of transforms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Identity,
    /// `f` applied as `f(input)`.
    FunctionApplication(String),
    /// `m` applied as `input.m`.
    MethodApplication(String),
    /// `op` applied as `input op`.
    OperatorApplication(String),
    /// Left transform applied first, then the right one.
    Compose(Box<Expr>, Box<Expr>),
}

/// How a transform is applied to a field value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnclosingType {
    /// Applied to the value itself.
    None,
    /// Applied element-wise over a collection (`Seq`, `Option`, iterator).
    Collection,
}

impl Expr {
    pub fn function(name: impl Into<String>) -> Expr {
        Expr::FunctionApplication(name.into())
    }

    pub fn method(name: impl Into<String>) -> Expr {
        Expr::MethodApplication(name.into())
    }

    pub fn operator(op: impl Into<String>) -> Expr {
        Expr::OperatorApplication(op.into())
    }

    /// Composes `self` with `next`, which is applied afterwards.
    /// Identities collapse so that composition never obscures an
    /// identity-only chain.
    pub fn and_then(self, next: Expr) -> Expr {
        match (self, next) {
            (Expr::Identity, next) => next,
            (prev, Expr::Identity) => prev,
            (prev, next) => Expr::Compose(Box::new(prev), Box::new(next)),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Expr::Identity)
    }

    fn apply_value(&self, input: &str) -> String {
        match self {
            Expr::Identity => input.to_string(),
            Expr::FunctionApplication(name) => format!("{}({})", name, input),
            Expr::MethodApplication(name) => format!("{}.{}", input, name),
            Expr::OperatorApplication(op) => format!("{} {}", input, op),
            Expr::Compose(first, second) => second.apply_value(&first.apply_value(input)),
        }
    }

    /// Folds the transform into a source fragment around `input`.
    ///
    /// Over a collection the transform is wrapped in `.map`; an identity
    /// transform elides the `map` altogether. The elision is
    /// behavior-preserving: `xs.map(identity)` equals `xs` for the
    /// immutable collections the generated code uses.
    pub fn apply(&self, input: &str, enclosing: EnclosingType) -> String {
        match enclosing {
            EnclosingType::None => self.apply_value(input),
            EnclosingType::Collection => {
                if self.is_identity() {
                    input.to_string()
                } else {
                    format!("{}.map(__e => {})", input, self.apply_value("__e"))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        assert_eq!(Expr::Identity.apply("x", EnclosingType::None), "x");
        assert_eq!(Expr::Identity.apply("xs", EnclosingType::Collection), "xs");
    }

    #[test]
    fn test_single_transforms() {
        assert_eq!(Expr::function("f").apply("x", EnclosingType::None), "f(x)");
        assert_eq!(
            Expr::method("toInt").apply("x", EnclosingType::None),
            "x.toInt"
        );
        assert_eq!(
            Expr::operator("!= 0").apply("x", EnclosingType::None),
            "x != 0"
        );
    }

    #[test]
    fn test_compose_applies_left_first() {
        let expr = Expr::method("toInt").and_then(Expr::function("Color.fromValue"));
        assert_eq!(
            expr.apply("__v", EnclosingType::None),
            "Color.fromValue(__v.toInt)"
        );
    }

    #[test]
    fn test_identity_collapses_in_composition() {
        assert_eq!(Expr::Identity.and_then(Expr::Identity), Expr::Identity);
        assert_eq!(
            Expr::Identity.and_then(Expr::function("f")),
            Expr::function("f")
        );
        assert_eq!(
            Expr::function("f").and_then(Expr::Identity),
            Expr::function("f")
        );
    }

    #[test]
    fn test_collection_wraps_in_map() {
        let expr = Expr::function("f");
        assert_eq!(
            expr.apply("xs", EnclosingType::Collection),
            "xs.map(__e => f(__e))"
        );
    }
}
