//! # Rewrite Patterns
//!
//! Pure root-level rewrite rules. Every function here looks at the root of the tree it is
//! given, tries its templates in the order they are written, applies the first one that
//! matches and returns the result. When nothing matches the input handle is returned as is.
//! None of them recurse: driving a rule over a whole tree is `Entity::replace`'s job, and
//! driving the whole catalog to a fixpoint is the simplificator's.
//!
//! ## Families
//! - negative powers and negated terms: `a^(-n) -> 1/a^n`, `a + (-c)*b -> a - c*b`
//! - factorial algebra: `(x+c)!*(x+c+1) -> (x+c+1)!`, `(x+a)!/(x+b)!` -> product
//! - division preparation (expanding): `a*(1/b) -> a/b`, pulling numeric factors out
//! - trigonometry: `sin*cos`, arc complements, inverse cancellation, Pythagorean identities
//! - trigonometric expansion (expanding): the reverse of the double-angle collapses
//! - exponential substitution: `sin`/`cos` of `a*x + b` over `t = e^(ix)`
//! - power algebra
//! - common rules: canonical operand order, like-term merging, factoring, cancellation
//! - angle-sum expansion and collapse (expanding)
//! - polynomial long division, canonical sort, optimize
//!
//! Templates name their pattern variables after the identities they encode: `a`, `b`, `c`
//! are arbitrary subtrees, `c1`, `c2` numeric literals, `v` a variable and `f` any function.

use crate::symbolic::numbers::Number;
use crate::symbolic::polynomial_division::PolynomialDivider;
use crate::symbolic::symbolic_engine::Entity;
use crate::symbolic::symbolic_engine::EntityKind::*;
use crate::symbolic::tree_analysis::{
    SortLevel, groups_by_level, multi_hang_binary, multi_hang_linear,
};

/// Largest `|a - b|` for which `(x+a)!/(x+b)!` is unrolled into a product.
pub const MAX_FACTORIAL_UNROLL: i64 = 20;

//___________________________________HELPERS____________________________________

fn int(value: i64) -> Entity {
    Entity::int(value)
}

fn lit(value: Number) -> Entity {
    Entity::number(value)
}

// literal arithmetic is folded right away, anything else builds a node
fn plus(a: &Entity, b: &Entity) -> Entity {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => lit(x + y),
        _ => a + b,
    }
}

fn minus(a: &Entity, b: &Entity) -> Entity {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => lit(x - y),
        _ => a - b,
    }
}

fn times(a: &Entity, b: &Entity) -> Entity {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => lit(x * y),
        _ => a * b,
    }
}

fn negated(a: &Entity) -> Entity {
    match a.as_number() {
        Some(x) => lit(-x),
        None => -a,
    }
}

/// `c1^c2` as a literal for integer exponents, otherwise kept as a power node.
fn literal_power(base: &Number, exponent: &Number) -> Entity {
    if exponent.is_integer() {
        let value = base.pow(exponent);
        if value.is_finite() {
            return lit(value);
        }
    }
    lit(base.clone()).pow(&lit(exponent.clone()))
}

fn squared(e: &Entity) -> Option<&Entity> {
    match e.kind() {
        Power(base, exponent) if exponent.is_int(2) => Some(base),
        _ => None,
    }
}

fn sin_arg(e: &Entity) -> Option<&Entity> {
    match e.kind() {
        Sin(a) => Some(a),
        _ => None,
    }
}

fn cos_arg(e: &Entity) -> Option<&Entity> {
    match e.kind() {
        Cos(a) => Some(a),
        _ => None,
    }
}

fn is_half(e: &Entity) -> bool {
    matches!(e.as_number(), Some(c) if *c == Number::rational(1, 2) || *c == Number::real(0.5))
}

/// `x + c` split into `(x, c)`; anything else is `(e, 0)`.
fn offset_of(e: &Entity) -> (Entity, Number) {
    if let Sum(x, c) = e.kind()
        && let Some(c) = c.as_number()
    {
        return (x.clone(), c.clone());
    }
    (e.clone(), Number::int(0))
}

fn shifted(x: &Entity, offset: &Number) -> Entity {
    if offset.is_zero() {
        x.clone()
    } else {
        x + &lit(offset.clone())
    }
}

//___________________________________NEGATIVE POWERS & MULTIPLIERS____________________________________

/// `a^(-n) -> 1/a^n` for integer `n`; `a^(-1) -> 1/a`.
pub fn invert_negative_powers(x: &Entity) -> Entity {
    if let Power(base, exponent) = x.kind()
        && let Some(n) = exponent.as_number()
        && n.is_integer()
        && n.is_negative()
    {
        let positive = -n;
        return if positive.is_one() {
            int(1) / base.clone()
        } else {
            int(1) / base.pow(&lit(positive))
        };
    }
    x.clone()
}

/// `a + c*b -> a - (-c)*b` for a negative real literal `c`.
pub fn invert_negative_multipliers(x: &Entity) -> Entity {
    if let Sum(a, term) = x.kind()
        && let Product(c, b) = term.kind()
        && let Some(c) = c.as_number()
        && c.is_negative()
    {
        return a - &(lit(-c) * b.clone());
    }
    x.clone()
}

//___________________________________FACTORIALS____________________________________

/// `(x+c)! * (x+c+1) -> (x+c+1)!`, also for a bare `x!` or a bare multiplier `x`.
pub fn collapse_factorial_multiplications(x: &Entity) -> Entity {
    if let Product(fact, multiplier) = x.kind()
        && let Factorial(inner) = fact.kind()
    {
        let (base, c1) = offset_of(inner);
        let (other, c2) = offset_of(multiplier);
        if base == other && (&c1 + &Number::int(1)) == c2 {
            return multiplier.factorial();
        }
    }
    x.clone()
}

/// `(x+a)! / (x+b)!` with integer `a - b`, `0 < |a - b| < MAX_FACTORIAL_UNROLL`:
/// `(x+b+1)*...*(x+a)` when `a > b`, `1/((x+a+1)*...*(x+b))` when `a < b`.
pub fn expand_factorial_divisions(x: &Entity) -> Entity {
    if let Quotient(num, den) = x.kind()
        && let Factorial(num_inner) = num.kind()
        && let Factorial(den_inner) = den.kind()
    {
        let (base, a) = offset_of(num_inner);
        let (other, b) = offset_of(den_inner);
        if base != other {
            return x.clone();
        }
        let Some(diff) = (&a - &b).as_i64() else {
            return x.clone();
        };
        if diff == 0 || diff.abs() >= MAX_FACTORIAL_UNROLL {
            return x.clone();
        }
        let (low, count) = if diff > 0 { (&b, diff) } else { (&a, -diff) };
        let factors: Vec<Entity> = (1..=count)
            .map(|k| shifted(&base, &(low + &Number::int(k))))
            .collect();
        if let Some(product) = multi_hang_linear(&factors, |p, q| p * q) {
            return if diff > 0 { product } else { int(1) / product };
        }
    }
    x.clone()
}

//___________________________________DIVISION PREPARATION____________________________________

pub fn division_preparing_rules(x: &Entity) -> Entity {
    // a * (1/b) -> a/b
    if let Product(a, q) = x.kind()
        && let Quotient(one, b) = q.kind()
        && one.is_int(1)
    {
        return a / b;
    }
    // (c*a)/b -> c*(a/b)
    if let Quotient(p, b) = x.kind()
        && let Product(c, a) = p.kind()
        && c.as_number().is_some()
    {
        return c * &(a / b);
    }
    // (c/a)*b -> c*(b/a)
    if let Product(q, b) = x.kind()
        && let Quotient(c, a) = q.kind()
        && c.as_number().is_some()
    {
        return c * &(b / a);
    }
    x.clone()
}

//___________________________________TRIGONOMETRY____________________________________

pub fn trigonometric_rules(x: &Entity) -> Entity {
    let half = || Entity::rational(1, 2);
    let right_angle = || Entity::var("pi") / int(2);
    match x.kind() {
        // sin(a)*cos(a) -> 1/2*sin(2a)
        Product(p, q) => {
            if let (Some(a), Some(b)) = (sin_arg(p), cos_arg(q))
                && a == b
            {
                return half() * (int(2) * a.clone()).sin();
            }
            if let (Some(a), Some(b)) = (cos_arg(p), sin_arg(q))
                && a == b
            {
                return half() * (int(2) * a.clone()).sin();
            }
        }
        Sum(p, q) => {
            let complementary = match (p.kind(), q.kind()) {
                (Arcsin(a), Arccos(b)) | (Arccos(a), Arcsin(b)) => a == b,
                (Arctan(a), Arccot(b)) | (Arccot(a), Arctan(b)) => a == b,
                _ => false,
            };
            if complementary {
                return right_angle();
            }
        }
        _ => {}
    }
    // inverse cancellation
    match (x.kind(), x.direct_children().first().map(Entity::kind)) {
        (Arcsin(_), Some(Sin(inner)))
        | (Arccos(_), Some(Cos(inner)))
        | (Arctan(_), Some(Tan(inner)))
        | (Arccot(_), Some(Cot(inner)))
        | (Sin(_), Some(Arcsin(inner)))
        | (Cos(_), Some(Arccos(inner)))
        | (Tan(_), Some(Arctan(inner)))
        | (Cot(_), Some(Arccot(inner))) => return inner.clone(),
        _ => {}
    }
    // Pythagorean and double-angle identities
    let sin2 = |e: &Entity| squared(e).and_then(sin_arg).cloned();
    let cos2 = |e: &Entity| squared(e).and_then(cos_arg).cloned();
    match x.kind() {
        Sum(p, q) => {
            if let (Some(a), Some(b)) = (sin2(p), cos2(q))
                && a == b
            {
                return int(1);
            }
            if let (Some(a), Some(b)) = (cos2(p), sin2(q))
                && a == b
            {
                return int(1);
            }
        }
        Difference(p, q) => {
            if let (Some(a), Some(b)) = (sin2(p), cos2(q))
                && a == b
            {
                return -(int(2) * a).cos();
            }
            if let (Some(a), Some(b)) = (cos2(p), sin2(q))
                && a == b
            {
                return (int(2) * a).cos();
            }
        }
        _ => {}
    }
    x.clone()
}

/// `1/2*sin(2x) -> sin(x)*cos(x)`, `cos(2x) -> cos(x)^2 - sin(x)^2`.
pub fn expand_trigonometric_rules(x: &Entity) -> Entity {
    if let Product(c, s) = x.kind()
        && is_half(c)
        && let Sin(arg) = s.kind()
        && let Product(two, a) = arg.kind()
        && two.is_int(2)
    {
        return a.sin() * a.cos();
    }
    if let Cos(arg) = x.kind()
        && let Product(two, a) = arg.kind()
        && two.is_int(2)
    {
        return a.cos().pow(&int(2)) - a.sin().pow(&int(2));
    }
    x.clone()
}

/// `sin(a+b) -> sin(a)cos(b) + sin(b)cos(a)`, `sin(a-b) -> sin(a)cos(b) - sin(b)cos(a)`.
pub fn expand_rules(x: &Entity) -> Entity {
    if let Sin(arg) = x.kind() {
        match arg.kind() {
            Sum(a, b) => return a.sin() * b.cos() + b.sin() * a.cos(),
            Difference(a, b) => return a.sin() * b.cos() - b.sin() * a.cos(),
            _ => {}
        }
    }
    x.clone()
}

//___________________________________EXPONENTIAL SUBSTITUTION____________________________________

/// Splits `arg` into `(a, b)` with `arg = a*x + b` for a numeric `a`. Recognises the additive and subtractive
/// orderings of `x`, `x*a`, `a*x` with `b`.
fn linear_parts(arg: &Entity, x: &Entity) -> Option<(Entity, Entity)> {
    let scaled = |e: &Entity| match e.kind() {
        Product(p, a) if p == x && a.as_number().is_some() => Some(a.clone()),
        Product(a, p) if p == x && a.as_number().is_some() => Some(a.clone()),
        _ => None,
    };
    if arg == x {
        return Some((int(1), int(0)));
    }
    if let Some(a) = scaled(arg) {
        return Some((a, int(0)));
    }
    match arg.kind() {
        Sum(p, q) => {
            if p == x {
                return Some((int(1), q.clone()));
            }
            if q == x {
                return Some((int(1), p.clone()));
            }
            if let Some(a) = scaled(p) {
                return Some((a, q.clone()));
            }
            if let Some(a) = scaled(q) {
                return Some((a, p.clone()));
            }
        }
        Difference(p, q) => {
            if p == x {
                return Some((int(1), negated(q)));
            }
            if q == x {
                return Some((int(-1), p.clone()));
            }
            if let Some(a) = scaled(p) {
                return Some((a, negated(q)));
            }
            if let Some(a) = scaled(q) {
                return Some((negated(&a), p.clone()));
            }
        }
        _ => {}
    }
    None
}

/// Rewrites `sin(a*x + b)` and `cos(a*x + b)` over the substitute `to = e^(i*x)`:
///
/// `sin(a*x+b) = to^a * e^(b*i)/(2i) - to^(-a) * e^(-b*i)/(2i)`
/// `cos(a*x+b) = to^a * e^(b*i)/2 + to^(-a) * e^(-b*i)/2`
pub fn exponential_substitution(x: &Entity, from: &Entity, to: &Entity) -> Entity {
    let (arg, is_sin) = match x.kind() {
        Sin(arg) => (arg, true),
        Cos(arg) => (arg, false),
        _ => return x.clone(),
    };
    let Some((a, b)) = linear_parts(arg, from) else {
        return x.clone();
    };
    let e = Entity::var("e");
    let i = Entity::number(Number::i());
    let forward = e.pow(&times(&b, &i));
    let backward = e.pow(&times(&negated(&b), &i));
    let up = to.pow(&a);
    let down = to.pow(&negated(&a));
    if is_sin {
        let two_i = Entity::complex(0.0, 2.0);
        up * (forward / two_i.clone()) - down * backward / two_i
    } else {
        up * (forward / int(2)) + down * backward / int(2)
    }
}

//___________________________________POWERS____________________________________

pub fn power_rules(x: &Entity) -> Entity {
    match x.kind() {
        Product(p, q) => {
            // v * a^b -> a^b * v
            if p.as_var().is_some()
                && let Power(..) = q.kind()
            {
                return q * p;
            }
            // a^n * a -> a^(n+1)
            if let Power(a, n) = p.kind()
                && a == q
            {
                return a.pow(&plus(n, &int(1)));
            }
            // a * a^n -> a^(n+1)
            if let Power(a, n) = q.kind()
                && a == p
            {
                return a.pow(&plus(n, &int(1)));
            }
            if let (Power(a, n), Power(b, m)) = (p.kind(), q.kind()) {
                // a^n * a^m -> a^(n+m)
                if a == b {
                    return a.pow(&plus(n, m));
                }
            }
        }
        Quotient(p, q) => {
            // a^n / a^m -> a^(n-m)
            if let (Power(a, n), Power(b, m)) = (p.kind(), q.kind())
                && a == b
            {
                return a.pow(&minus(n, m));
            }
        }
        _ => {}
    }
    // (a^b)^c -> a^(b*c)
    if let Power(inner, c) = x.kind()
        && let Power(a, b) = inner.kind()
    {
        return a.pow(&times(b, c));
    }
    match x.kind() {
        Product(p, q) => {
            // a^n * b^n -> (a*b)^n
            if let (Power(a, n), Power(b, m)) = (p.kind(), q.kind())
                && n == m
            {
                return (a * b).pow(n);
            }
        }
        Quotient(p, q) => {
            // a^n / b^n -> (a/b)^n
            if let (Power(a, n), Power(b, m)) = (p.kind(), q.kind())
                && n == m
            {
                return (a / b).pow(n);
            }
            // a / a^n -> a^(1-n)
            if let Power(a, n) = q.kind()
                && a == p
            {
                return a.pow(&minus(&int(1), n));
            }
            // a^n / a -> a^(n-1)
            if let Power(a, n) = p.kind()
                && a == q
            {
                return a.pow(&minus(n, &int(1)));
            }
        }
        _ => {}
    }
    // c^log(c, a) -> a
    if let Power(c, l) = x.kind()
        && c.as_number().is_some()
        && let Log(base, a) = l.kind()
        && base == c
    {
        return a.clone();
    }
    // a^n * (a*b), a^n * (b*a), (a*b) * a^n, (b*a) * a^n -> a^(n+1) * b
    if let Product(p, q) = x.kind() {
        let pairs = [(p, q), (q, p)];
        for (power, product) in pairs {
            if let Power(a, n) = power.kind()
                && let Product(l, r) = product.kind()
            {
                if l == a {
                    return a.pow(&plus(n, &int(1))) * r.clone();
                }
                if r == a {
                    return a.pow(&plus(n, &int(1))) * l.clone();
                }
            }
        }
    }
    if let Power(base, exponent) = x.kind() {
        // (c1*a)^c2 -> c1^c2 * a^c2
        if let Product(c1, a) = base.kind()
            && let (Some(c1), Some(c2)) = (c1.as_number(), exponent.as_number())
        {
            return literal_power(c1, c2) * a.pow(exponent);
        }
        // a^(-1) -> 1/a
        if exponent.is_int(-1) {
            return int(1) / base.clone();
        }
    }
    if let Product(p, q) = x.kind()
        && let Power(quotient, c2) = p.kind()
        && let Quotient(c1, a) = quotient.kind()
        && let (Some(c1), Some(c2)) = (c1.as_number(), c2.as_number())
    {
        // (c1/a)^c2 * a -> c1^c2 * a^(1-c2)
        if q == a {
            return literal_power(c1, c2) * a.pow(&lit(&Number::int(1) - c2));
        }
        // (c1/a)^c2 * a^c3 -> c1^c2 * a^(c3-c2)
        if let Power(b, c3) = q.kind()
            && b == a
            && let Some(c3) = c3.as_number()
        {
            return literal_power(c1, c2) * a.pow(&lit(c3 - c2));
        }
    }
    // nested quotients over the same base
    if let Quotient(p, q) = x.kind()
        && let Quotient(a, inner) = p.kind()
    {
        let (b, n) = match inner.kind() {
            Power(b, n) => (b.clone(), n.clone()),
            _ => (inner.clone(), int(1)),
        };
        let (d, m) = match q.kind() {
            Power(d, m) => (d.clone(), m.clone()),
            _ => (q.clone(), int(1)),
        };
        if b == d {
            return a / &b.pow(&plus(&n, &m));
        }
    }
    x.clone()
}

//___________________________________COMMON RULES____________________________________

/// Operand positions `(left, right)` compared when two products look for a shared factor,
/// in the order they are tried.
type FactorOrder = [(usize, usize); 4];

const SUM_FACTOR_ORDER: FactorOrder = [(0, 0), (1, 0), (0, 1), (1, 1)];
const COLLAPSE_FACTOR_ORDER: FactorOrder = [(0, 0), (0, 1), (1, 0), (1, 1)];
const QUOTIENT_FACTOR_ORDER: FactorOrder = [(1, 0), (1, 1), (0, 0), (0, 1)];

/// Shared factor of two products, returned as `(factor, rest_of_left, rest_of_right)`.
fn common_factor(p: &Entity, q: &Entity, order: &FactorOrder) -> Option<(Entity, Entity, Entity)> {
    let (Product(a1, b1), Product(a2, b2)) = (p.kind(), q.kind()) else {
        return None;
    };
    let (left, right) = ([a1, b1], [a2, b2]);
    order
        .iter()
        .find(|&&(i, j)| left[i] == right[j])
        .map(|&(i, j)| (left[i].clone(), left[1 - i].clone(), right[1 - j].clone()))
}

/// Cofactor of `a` in a product `a*b` or `b*a`.
fn cofactor(product: &Entity, a: &Entity) -> Option<Entity> {
    match product.kind() {
        Product(l, r) if l == a => Some(r.clone()),
        Product(l, r) if r == a => Some(l.clone()),
        _ => None,
    }
}

/// Factoring of sums and differences that share a term:
/// `a*b ± a*c -> a*(b ± c)`, `a ± a*b -> a*(1 ± b)`, `a*b ± a -> a*(b ± 1)`,
/// `a/b + a*c -> a*(1/b + c)`, `a*b + a/c -> a*(b + 1/c)`.
fn factor_common_terms(x: &Entity, order: &FactorOrder) -> Option<Entity> {
    let (p, q, subtract) = match x.kind() {
        Sum(p, q) => (p, q, false),
        Difference(p, q) => (p, q, true),
        _ => return None,
    };
    let join = |l: &Entity, r: &Entity| if subtract { l - r } else { l + r };
    if let Some((a, b, c)) = common_factor(p, q, order) {
        return Some(a * join(&b, &c));
    }
    if let Some(b) = cofactor(q, p) {
        return Some(p * &join(&int(1), &b));
    }
    if let Some(b) = cofactor(p, q) {
        return Some(q * &join(&b, &int(1)));
    }
    if !subtract {
        // a/b + a*c, a/b + c*a
        if let Quotient(a, b) = p.kind()
            && let Some(c) = cofactor(q, a)
        {
            return Some(a * &(int(1) / b.clone() + c));
        }
        // b*a + a/c, a*b + a/c
        if let Quotient(a, c) = q.kind()
            && let Some(b) = cofactor(p, a)
        {
            return Some(a * &(b + int(1) / c.clone()));
        }
    }
    None
}

pub fn common_rules(x: &Entity) -> Entity {
    match x.kind() {
        Product(p, q) => {
            // (c*f1)*f2 -> f1*f2*c
            if let Product(c, f1) = p.kind()
                && c.as_number().is_some()
                && f1.is_function()
                && q.is_function()
            {
                return (f1 * q) * c.clone();
            }
        }
        Quotient(a, q) => {
            // a/(b/c) -> a*c/b
            if let Quotient(b, c) = q.kind() {
                return (a * c) / b.clone();
            }
        }
        _ => {}
    }
    // (a/b)/c -> a/(b*c)
    if let Quotient(p, c) = x.kind()
        && let Quotient(a, b) = p.kind()
    {
        return a / &(b * c);
    }
    if let Product(a, q) = x.kind() {
        // a*(b/c) -> a*b/c
        if let Quotient(b, c) = q.kind() {
            return (a * b) / c.clone();
        }
    }
    if let Product(p, q) = x.kind() {
        // (c1*f)*c2, c2*(c1*f) -> (c1*c2)*f
        if let Product(c1, f) = p.kind()
            && f.is_function()
            && let (Some(c1), Some(c2)) = (c1.as_number(), q.as_number())
        {
            return lit(c1 * c2) * f.clone();
        }
        if let Product(c1, f) = q.kind()
            && f.is_function()
            && let (Some(c1), Some(c2)) = (c1.as_number(), p.as_number())
        {
            return lit(c1 * c2) * f.clone();
        }
        // (c1*f1)*(c2*f2) -> f1*f2*(c1*c2)
        if let (Product(c1, f1), Product(c2, f2)) = (p.kind(), q.kind())
            && f1.is_function()
            && f2.is_function()
            && let (Some(c1), Some(c2)) = (c1.as_number(), c2.as_number())
        {
            return (f1 * f2) * lit(c1 * c2);
        }
    }
    if let Sum(p, q) = x.kind() {
        // (f1+a)+f2 -> f1+f2+a
        if let Sum(f1, a) = p.kind()
            && f1.is_function()
            && q.is_function()
        {
            return (f1 + q) + a.clone();
        }
        // f2+(f1+a) -> f1+f2+a
        if let Sum(f1, a) = q.kind()
            && f1.is_function()
            && p.is_function()
        {
            return (f1 + p) + a.clone();
        }
    }
    // canonical operand order: literals lead products and trail sums
    match x.kind() {
        Product(v, c) if v.as_var().is_some() && c.as_number().is_some() => return c * v,
        Sum(c, v) if c.as_number().is_some() && v.as_var().is_some() => return v + c,
        Product(f, c) if f.is_function() && c.as_number().is_some() => return c * f,
        Sum(c, f) if c.as_number().is_some() && f.is_function() => return f + c,
        _ => {}
    }
    // c1*v ± c2*v -> (c1 ± c2)*v
    if let Sum(p, q) | Difference(p, q) = x.kind()
        && let (Product(c1, v1), Product(c2, v2)) = (p.kind(), q.kind())
        && v1.as_var().is_some()
        && v1 == v2
        && let (Some(c1), Some(c2)) = (c1.as_number(), c2.as_number())
    {
        let c = if let Sum(..) = x.kind() { c1 + c2 } else { c1 - c2 };
        return lit(c) * v1.clone();
    }
    match x.kind() {
        Sum(p, q) => {
            if let Some(factored) = factor_common_terms(x, &SUM_FACTOR_ORDER) {
                return factored;
            }
            // a + a/b -> a*(1 + 1/b), a/b + a -> a*(1/b + 1)
            if let Quotient(a, b) = q.kind()
                && a == p
                && !p.is_int(1)
            {
                return p * &(int(1) + int(1) / b.clone());
            }
            if let Quotient(a, b) = p.kind()
                && a == q
                && !q.is_int(1)
            {
                return q * &(int(1) / b.clone() + int(1));
            }
            // a + a -> 2*a
            if p == q {
                return int(2) * p.clone();
            }
        }
        Difference(p, q) => {
            if let Some(factored) = factor_common_terms(x, &SUM_FACTOR_ORDER) {
                return factored;
            }
            // a - a -> 0
            if p == q && p.is_finite() {
                return int(0);
            }
        }
        // a*a -> a^2
        Product(p, q) if p == q => return p.pow(&int(2)),
        _ => {}
    }
    if let Product(p, q) = x.kind() {
        // (c1*v)*c2, c2*(c1*v) -> (c1*c2)*v
        if let Product(c1, v) = p.kind()
            && v.as_var().is_some()
            && let (Some(c1), Some(c2)) = (c1.as_number(), q.as_number())
        {
            return lit(c1 * c2) * v.clone();
        }
        if let Product(c1, v) = q.kind()
            && v.as_var().is_some()
            && let (Some(c1), Some(c2)) = (c1.as_number(), p.as_number())
        {
            return lit(c1 * c2) * v.clone();
        }
    }
    if let Sum(p, q) = x.kind() {
        // (v+c1)+c2, c2+(v+c1) -> v+(c1+c2)
        if let Sum(v, c1) = p.kind()
            && v.as_var().is_some()
            && let (Some(c1), Some(c2)) = (c1.as_number(), q.as_number())
        {
            return v + &lit(c1 + c2);
        }
        if let Sum(v, c1) = q.kind()
            && v.as_var().is_some()
            && let (Some(c1), Some(c2)) = (c1.as_number(), p.as_number())
        {
            return v + &lit(c1 + c2);
        }
    }
    // a*(a*b), a*(b*a), (a*b)*a, (b*a)*a -> a^2*b
    if let Product(p, q) = x.kind() {
        if let Some(b) = cofactor(q, p) {
            return p.pow(&int(2)) * b;
        }
        if let Some(b) = cofactor(p, q) {
            return q.pow(&int(2)) * b;
        }
    }
    if let Sum(p, q) = x.kind() {
        // -1*a + b -> b - a
        if let Product(m, a) = p.kind()
            && m.is_int(-1)
        {
            return q - a;
        }
        // a + -1*b -> a - b
        if let Product(m, b) = q.kind()
            && m.is_int(-1)
        {
            return p - b;
        }
    }
    match x.kind() {
        // (v-a)*(v+a), (v+a)*(v-a) -> v^2 - a^2
        Product(p, q) => {
            let conjugate = match (p.kind(), q.kind()) {
                (Difference(v1, a1), Sum(v2, a2)) | (Sum(v1, a1), Difference(v2, a2)) => {
                    (v1.as_var().is_some() && v1 == v2 && a1 == a2).then(|| (v1, a1))
                }
                _ => None,
            };
            if let Some((v, a)) = conjugate {
                return v.pow(&int(2)) - a.pow(&int(2));
            }
        }
        Quotient(p, q) => {
            // a/a -> 1
            if p == q && p.is_finite() && !p.as_number().is_some_and(Number::is_zero) {
                return int(1);
            }
            // (a*b)/b, (b*a)/b -> a
            if let Some(a) = cofactor(p, q) {
                return a;
            }
            // (a*b)/(b*c) and the other orderings -> a/c
            if let Some((_, a, c)) = common_factor(p, q, &QUOTIENT_FACTOR_ORDER) {
                return a / c;
            }
            match (p.kind(), q.kind()) {
                // (a-b)/(b-a) -> -1
                (Difference(a, b), Difference(c, d)) if a == d && b == c => return int(-1),
                // (a+b)/(b+a) -> 1
                (Sum(a, b), Sum(c, d)) if a == d && b == c => return int(1),
                _ => {}
            }
            // c1/(c2*a), c1/(a*c2) -> (c1/c2)/a
            if let Some(c1) = p.as_number()
                && let Product(l, r) = q.kind()
            {
                if let Some(c2) = l.as_number() {
                    return lit(c1 / c2) / r.clone();
                }
                if let Some(c2) = r.as_number() {
                    return lit(c1 / c2) / l.clone();
                }
            }
        }
        _ => {}
    }
    // c1*(c2*a) -> (c1*c2)*a
    if let Product(p, q) = x.kind()
        && let Some(c1) = p.as_number()
        && let Product(c2, a) = q.kind()
        && let Some(c2) = c2.as_number()
    {
        return lit(c1 * c2) * a.clone();
    }
    // (a/b)*c -> a*c/b
    if let Product(p, c) = x.kind()
        && let Quotient(a, b) = p.kind()
    {
        return (a * c) / b.clone();
    }
    // (c1*a)/c2 -> (c1/c2)*a
    if let Quotient(p, c2) = x.kind()
        && let Some(c2) = c2.as_number()
        && let Product(c1, a) = p.kind()
        && let Some(c1) = c1.as_number()
    {
        return lit(c1 / c2) * a.clone();
    }
    x.clone()
}

//___________________________________COLLAPSE____________________________________

/// Difference-of-squares factoring, common-factor extraction and `a^n*c^n -> (a*c)^n`.
pub fn collapse_rules(x: &Entity) -> Entity {
    if let Difference(p, q) = x.kind() {
        // a^c1 - b^c2 -> (a^(c1/2) - b^(c2/2)) * (a^(c1/2) + b^(c2/2))
        if let (Power(a, c1), Power(b, c2)) = (p.kind(), q.kind())
            && let (Some(c1), Some(c2)) = (c1.as_number(), c2.as_number())
        {
            let two = Number::int(2);
            let left = a.pow(&lit(c1 / &two));
            let right = b.pow(&lit(c2 / &two));
            return (&left - &right) * (&left + &right);
        }
        // a^2 - c -> (a - c^(1/2)) * (a + c^(1/2))
        if let Some(a) = squared(p)
            && let Some(c) = q.as_number()
        {
            let root = literal_power(c, &Number::rational(1, 2));
            return (a - &root) * (a + &root);
        }
    }
    if let Some(factored) = factor_common_terms(x, &COLLAPSE_FACTOR_ORDER) {
        return factored;
    }
    if let Product(p, q) = x.kind()
        && let (Power(a, n), Power(c, m)) = (p.kind(), q.kind())
        && n == m
    {
        return (a * c).pow(n);
    }
    x.clone()
}

//___________________________________LONG DIVISION____________________________________

/// `n/d -> q + r/d` (or just `q` when `r` is zero) when neither side evaluates to a number
/// and the divider succeeds for one of the divisor's free variables.
pub fn long_division(x: &Entity, divider: &dyn PolynomialDivider) -> Entity {
    if let Quotient(n, d) = x.kind()
        && !n.can_be_evaluated()
        && !d.can_be_evaluated()
    {
        for var in d.free_variables() {
            if let Some((quotient, remainder)) = divider.divide(n, d, var) {
                return if remainder.as_number().is_some_and(Number::is_zero) {
                    quotient
                } else {
                    quotient + remainder / d.clone()
                };
            }
        }
    }
    x.clone()
}

//___________________________________SORT & OPTIMIZE____________________________________

type Join = fn(&Entity, &Entity) -> Entity;

// a flattened subtrahend `-1 * t` goes back to `a - t`
fn join_sum(a: &Entity, b: &Entity) -> Entity {
    match b.kind() {
        Product(c, t) if c.is_int(-1) && !matches!(t.kind(), Sum(..) | Difference(..)) => a - t,
        _ => a + b,
    }
}

// a flattened divisor `t ^ -1` goes back to `a / t`
fn join_product(a: &Entity, b: &Entity) -> Entity {
    match b.kind() {
        Power(t, n) if n.is_int(-1) && !matches!(t.kind(), Product(..) | Quotient(..)) => a / t,
        _ => a * b,
    }
}

fn linear_chain(x: &Entity) -> Option<(Vec<Entity>, Join)> {
    match x.kind() {
        Sum(..) | Difference(..) => Some((x.linear_summands(), join_sum as Join)),
        Product(..) | Quotient(..) => Some((x.linear_factors(), join_product as Join)),
        _ => None,
    }
}

/// Flattens a sum or product chain and groups terms with equal `level` keys. Each group is
/// rebuilt as its own left-leaning chain, then the group results are chained in the order of
/// their first member. Chains where no two terms share a key are left untouched.
pub fn canonical_sort(x: &Entity, level: SortLevel) -> Entity {
    let Some((terms, join)) = linear_chain(x) else {
        return x.clone();
    };
    let groups = groups_by_level(&terms, level);
    if groups.len() == terms.len() {
        return x.clone();
    }
    let grouped: Vec<Entity> = groups
        .iter()
        .filter_map(|group| multi_hang_linear(group, join))
        .collect();
    match multi_hang_linear(&grouped, join) {
        Some(sorted) if sorted != *x => sorted,
        _ => x.clone(),
    }
}

/// Rebuilds a sum or product chain as a balanced binary tree.
pub fn optimize(x: &Entity) -> Entity {
    let Some((terms, join)) = linear_chain(x) else {
        return x.clone();
    };
    if terms.len() < 3 {
        return x.clone();
    }
    match multi_hang_binary(&terms, &join) {
        Some(balanced) if balanced != *x => balanced,
        _ => x.clone(),
    }
}
