//! Polynomial long division.
//!
//! The rewrite engine only needs the [`PolynomialDivider`] seam; [`UnivariateDivider`] is the
//! default implementation. It works on dense coefficient vectors in one variable with numeric
//! coefficients, so `(x^2 - 1) / (x - 1)` divides while `(x^2 - y) / (x - 1)` is left alone.
use crate::symbolic::numbers::Number;
use crate::symbolic::symbolic_engine::{Entity, EntityKind};
use crate::symbolic::tree_analysis::multi_hang_linear;

/// Highest polynomial degree the default divider converts into coefficients.
pub const MAX_DIVISION_DEGREE: usize = 64;

pub trait PolynomialDivider: Send + Sync {
    /// `Some((quotient, remainder))` with `dividend = quotient * divisor + remainder`, or `None`
    /// when the operands are not polynomials this divider handles.
    fn divide(&self, dividend: &Entity, divisor: &Entity, var: &str) -> Option<(Entity, Entity)>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UnivariateDivider;

impl PolynomialDivider for UnivariateDivider {
    fn divide(&self, dividend: &Entity, divisor: &Entity, var: &str) -> Option<(Entity, Entity)> {
        let numerator = coefficients(dividend, var)?;
        let denominator = coefficients(divisor, var)?;
        let (quotient, remainder) = divide_coefficients(&numerator, &denominator)?;
        Some((
            from_coefficients(&quotient, var),
            from_coefficients(&remainder, var),
        ))
    }
}

/// Dense coefficients, lowest power first, trailing zeros trimmed (zero polynomial is `[]`).
pub fn coefficients(expr: &Entity, var: &str) -> Option<Vec<Number>> {
    let coefficients = match expr.kind() {
        EntityKind::Num(value) => vec![value.clone()],
        EntityKind::Var(name) if name == var => vec![Number::int(0), Number::int(1)],
        EntityKind::Sum(a, b) => add(&coefficients(a, var)?, &coefficients(b, var)?, false),
        EntityKind::Difference(a, b) => {
            add(&coefficients(a, var)?, &coefficients(b, var)?, true)
        }
        EntityKind::Product(a, b) => multiply(&coefficients(a, var)?, &coefficients(b, var)?)?,
        EntityKind::Quotient(a, b) if !b.contains(&Entity::var(var)) => {
            let divisor = b.eval().ok()?;
            if divisor.is_zero() {
                return None;
            }
            coefficients(a, var)?
                .iter()
                .map(|c| c.div(&divisor))
                .collect()
        }
        EntityKind::Power(base, exponent) => {
            let n = usize::try_from(exponent.as_number()?.as_i64()?).ok()?;
            if n > MAX_DIVISION_DEGREE {
                return None;
            }
            let base = coefficients(base, var)?;
            let mut acc = vec![Number::int(1)];
            for _ in 0..n {
                acc = multiply(&acc, &base)?;
            }
            acc
        }
        _ if !expr.contains(&Entity::var(var)) && expr.can_be_evaluated() => {
            vec![expr.eval().ok()?]
        }
        _ => return None,
    };
    Some(trim(coefficients))
}

fn trim(mut coefficients: Vec<Number>) -> Vec<Number> {
    while coefficients.last().is_some_and(Number::is_zero) {
        coefficients.pop();
    }
    coefficients
}

fn add(a: &[Number], b: &[Number], subtract: bool) -> Vec<Number> {
    let zero = Number::int(0);
    (0..a.len().max(b.len()))
        .map(|i| {
            let x = a.get(i).unwrap_or(&zero);
            let y = b.get(i).unwrap_or(&zero);
            if subtract { x.sub(y) } else { x.add(y) }
        })
        .collect()
}

fn multiply(a: &[Number], b: &[Number]) -> Option<Vec<Number>> {
    if a.is_empty() || b.is_empty() {
        return Some(Vec::new());
    }
    let degree = a.len() + b.len() - 2;
    if degree > MAX_DIVISION_DEGREE {
        return None;
    }
    let mut product = vec![Number::int(0); degree + 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            product[i + j] = product[i + j].add(&x.mul(y));
        }
    }
    Some(product)
}

/// Long division on trimmed coefficient vectors; requires `deg(n) >= deg(d) >= 1`.
fn divide_coefficients(n: &[Number], d: &[Number]) -> Option<(Vec<Number>, Vec<Number>)> {
    if d.len() < 2 || n.len() < d.len() {
        return None;
    }
    let lead = d.last()?;
    let shift = n.len() - d.len();
    let mut remainder = n.to_vec();
    let mut quotient = vec![Number::int(0); shift + 1];
    for i in (0..=shift).rev() {
        let factor = remainder[i + d.len() - 1].div(lead);
        for (j, c) in d.iter().enumerate() {
            remainder[i + j] = remainder[i + j].sub(&factor.mul(c));
        }
        quotient[i] = factor;
    }
    remainder.truncate(d.len() - 1);
    Some((trim(quotient), trim(remainder)))
}

/// Rebuilds `c_k * var^k + ... + c_0`, highest power first, skipping zero coefficients.
pub fn from_coefficients(coefficients: &[Number], var: &str) -> Entity {
    let x = Entity::var(var);
    let terms: Vec<Entity> = coefficients
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, c)| !c.is_zero())
        .map(|(power, c)| {
            let monomial = match power {
                0 => return Entity::number(c.clone()),
                1 => x.clone(),
                _ => x.pow(&Entity::int(power as i64)),
            };
            if c.is_one() {
                monomial
            } else {
                Entity::number(c.clone()) * monomial
            }
        })
        .collect();
    multi_hang_linear(&terms, |a, b| a + b).unwrap_or_else(|| Entity::int(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Entity {
        Entity::var("x")
    }

    #[test]
    fn test_coefficients() {
        let p = x().pow(&Entity::int(2)) - Entity::int(1);
        assert_eq!(
            coefficients(&p, "x").unwrap(),
            vec![Number::int(-1), Number::int(0), Number::int(1)]
        );
        let q = (x() + Entity::int(1)) * (x() - Entity::int(1));
        assert_eq!(coefficients(&q, "x").unwrap(), coefficients(&p, "x").unwrap());
        assert!(coefficients(&(x() + Entity::var("y")), "x").is_none());
        assert!(coefficients(&x().sin(), "x").is_none());
    }

    #[test]
    fn test_exact_division() {
        let dividend = x().pow(&Entity::int(2)) - Entity::int(1);
        let divisor = x() - Entity::int(1);
        let (quotient, remainder) = UnivariateDivider.divide(&dividend, &divisor, "x").unwrap();
        assert_eq!(quotient, x() + Entity::int(1));
        assert_eq!(remainder, Entity::int(0));
    }

    #[test]
    fn test_division_with_remainder() {
        // (x^2 + 1) / (x + 1) = x - 1 remainder 2
        let dividend = x().pow(&Entity::int(2)) + Entity::int(1);
        let divisor = x() + Entity::int(1);
        let (quotient, remainder) = UnivariateDivider.divide(&dividend, &divisor, "x").unwrap();
        assert_eq!(quotient, x() + Entity::int(-1));
        assert_eq!(remainder, Entity::int(2));
    }

    #[test]
    fn test_rational_coefficients() {
        // (x^2) / (2x) = x/2
        let dividend = x().pow(&Entity::int(2));
        let divisor = Entity::int(2) * x();
        let (quotient, remainder) = UnivariateDivider.divide(&dividend, &divisor, "x").unwrap();
        assert_eq!(quotient, Entity::rational(1, 2) * x());
        assert_eq!(remainder, Entity::int(0));
    }

    #[test]
    fn test_degree_requirements() {
        let lower = x();
        let higher = x().pow(&Entity::int(2));
        assert!(UnivariateDivider.divide(&lower, &higher, "x").is_none());
        assert!(
            UnivariateDivider
                .divide(&higher, &Entity::int(2), "x")
                .is_none()
        );
    }
}
