//! # Symbolic Engine Module
//!
//! The node model every other part of the crate is built on: an immutable expression tree
//! whose nodes are shared through cheap-to-clone [`Entity`] handles.
//!
//! ## Main Structures
//!
//! ### `EntityKind` Enum
//! The closed set of node variants:
//! - **Leaves**: `Num(Number)` numeric literal, `Var(String)` named variable
//! - **Operators**: `Sum`, `Difference`, `Product`, `Quotient`, `Power` with ordered children
//! - **Functions**: `Sin`, `Cos`, `Tan`, `Cot`, `Arcsin`, `Arccos`, `Arctan`, `Arccot`,
//!   `Factorial`, `Log(base, argument)`
//! - **Calculus**: `Derivative`, `Integral`, `Limit`; carried through rewriting, never evaluated
//! - **Tensor**: shape plus row-major elements
//!
//! ### `Entity`
//! An `Arc` around a node holding its kind together with lazily computed, permanently cached
//! properties: direct children, complexity (subtree node count), finiteness and the set of
//! free variables. The caches are `OnceLock` cells, so a tree can be shared between threads
//! and concurrent first reads are safe.
//!
//! ## Key Methods
//! - `Entity::int`, `rational`, `real`, `complex`, `number`, `var` - explicit leaf constructors
//! - `pow`, `sin`, ..., `factorial`, `log_base`, `ln` - builder methods
//! - `+ - * /` and unary `-` - operator overloading (`-a` builds `-1 * a`)
//! - `direct_children`, `complexity`, `is_finite`, `free_variables` - memoized properties
//!
//! Traversal and rewriting (`iter`, `replace`, `substitute`, `contains`) live in
//! `tree_analysis`; evaluation lives in `symbolic_compile`.

use crate::symbolic::constants::ConstantRegistry;
use crate::symbolic::numbers::Number;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};
use strum_macros::Display;

/// Side from which a limit approaches its destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum ApproachFrom {
    #[strum(serialize = "left")]
    Left,
    #[strum(serialize = "right")]
    Right,
    #[strum(serialize = "both")]
    BothSides,
}

/// Node variants. Structural equality compares the variant, its auxiliary fields and the
/// children in order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Num(Number),
    Var(String),
    Sum(Entity, Entity),
    Difference(Entity, Entity),
    Product(Entity, Entity),
    Quotient(Entity, Entity),
    Power(Entity, Entity),
    Sin(Entity),
    Cos(Entity),
    Tan(Entity),
    Cot(Entity),
    Arcsin(Entity),
    Arccos(Entity),
    Arctan(Entity),
    Arccot(Entity),
    Factorial(Entity),
    /// `Log(base, argument)`
    Log(Entity, Entity),
    /// `Derivative(expression, variable, order)`
    Derivative(Entity, Entity, usize),
    /// `Integral(expression, variable, order)`
    Integral(Entity, Entity, usize),
    /// `Limit(expression, variable, destination, approach)`
    Limit(Entity, Entity, Entity, ApproachFrom),
    Tensor {
        shape: Vec<usize>,
        elements: Vec<Entity>,
    },
}

pub struct Node {
    kind: EntityKind,
    children: OnceLock<Vec<Entity>>,
    complexity: OnceLock<usize>,
    finite: OnceLock<bool>,
    free_variables: OnceLock<BTreeSet<String>>,
}

/// Shared handle to an immutable expression node.
#[derive(Clone)]
pub struct Entity(Arc<Node>);

impl Entity {
    pub fn new(kind: EntityKind) -> Entity {
        Entity(Arc::new(Node {
            kind,
            children: OnceLock::new(),
            complexity: OnceLock::new(),
            finite: OnceLock::new(),
            free_variables: OnceLock::new(),
        }))
    }

    pub fn kind(&self) -> &EntityKind {
        &self.0.kind
    }

    /// true when both handles point at the very same node
    pub fn ptr_eq(&self, other: &Entity) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    //___________________________________LEAVES____________________________________

    pub fn int(value: i64) -> Entity {
        Entity::number(Number::int(value))
    }

    pub fn rational(numerator: i64, denominator: i64) -> Entity {
        Entity::number(Number::rational(numerator, denominator))
    }

    pub fn real(value: f64) -> Entity {
        Entity::number(Number::real(value))
    }

    pub fn complex(re: f64, im: f64) -> Entity {
        Entity::number(Number::complex(re, im))
    }

    pub fn number(value: Number) -> Entity {
        Entity::new(EntityKind::Num(value))
    }

    pub fn var(name: &str) -> Entity {
        Entity::new(EntityKind::Var(name.to_string()))
    }

    /// Creates multiple variables from a comma-separated string: `"x, y, z"`.
    pub fn vars(names: &str) -> Vec<Entity> {
        names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(Entity::var)
            .collect()
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self.kind() {
            EntityKind::Num(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<&str> {
        match self.kind() {
            EntityKind::Var(name) => Some(name),
            _ => None,
        }
    }

    /// Matches the `Integer` literal `value` exactly.
    pub fn is_int(&self, value: i64) -> bool {
        self.as_number() == Some(&Number::int(value))
    }

    /// Function class: elementary functions, `Log` and the calculus nodes.
    pub fn is_function(&self) -> bool {
        use EntityKind::*;
        matches!(
            self.kind(),
            Sin(_)
                | Cos(_)
                | Tan(_)
                | Cot(_)
                | Arcsin(_)
                | Arccos(_)
                | Arctan(_)
                | Arccot(_)
                | Factorial(_)
                | Log(_, _)
                | Derivative(..)
                | Integral(..)
                | Limit(..)
        )
    }

    //___________________________________BUILDERS____________________________________

    pub fn pow(&self, exponent: &Entity) -> Entity {
        Entity::new(EntityKind::Power(self.clone(), exponent.clone()))
    }

    pub fn sin(&self) -> Entity {
        Entity::new(EntityKind::Sin(self.clone()))
    }

    pub fn cos(&self) -> Entity {
        Entity::new(EntityKind::Cos(self.clone()))
    }

    pub fn tan(&self) -> Entity {
        Entity::new(EntityKind::Tan(self.clone()))
    }

    pub fn cot(&self) -> Entity {
        Entity::new(EntityKind::Cot(self.clone()))
    }

    pub fn arcsin(&self) -> Entity {
        Entity::new(EntityKind::Arcsin(self.clone()))
    }

    pub fn arccos(&self) -> Entity {
        Entity::new(EntityKind::Arccos(self.clone()))
    }

    pub fn arctan(&self) -> Entity {
        Entity::new(EntityKind::Arctan(self.clone()))
    }

    pub fn arccot(&self) -> Entity {
        Entity::new(EntityKind::Arccot(self.clone()))
    }

    pub fn factorial(&self) -> Entity {
        Entity::new(EntityKind::Factorial(self.clone()))
    }

    /// `log(base, self)`
    pub fn log_base(&self, base: &Entity) -> Entity {
        Entity::new(EntityKind::Log(base.clone(), self.clone()))
    }

    /// natural logarithm, `log(e, self)`
    pub fn ln(&self) -> Entity {
        self.log_base(&Entity::var("e"))
    }

    pub fn derivative(&self, var: &str, order: usize) -> Entity {
        Entity::new(EntityKind::Derivative(self.clone(), Entity::var(var), order))
    }

    pub fn integral(&self, var: &str, order: usize) -> Entity {
        Entity::new(EntityKind::Integral(self.clone(), Entity::var(var), order))
    }

    pub fn limit(&self, var: &str, destination: &Entity, approach: ApproachFrom) -> Entity {
        Entity::new(EntityKind::Limit(
            self.clone(),
            Entity::var(var),
            destination.clone(),
            approach,
        ))
    }

    /// Row-major tensor; `None` when the element count does not match the shape.
    pub fn tensor(shape: Vec<usize>, elements: Vec<Entity>) -> Option<Entity> {
        if shape.iter().product::<usize>() != elements.len() {
            return None;
        }
        Some(Entity::new(EntityKind::Tensor { shape, elements }))
    }

    //___________________________________MEMOIZED PROPERTIES____________________________________

    /// Immediate children in order; empty for leaves.
    pub fn direct_children(&self) -> &[Entity] {
        self.0.children.get_or_init(|| {
            use EntityKind::*;
            match self.kind() {
                Num(_) | Var(_) => Vec::new(),
                Sin(a) | Cos(a) | Tan(a) | Cot(a) | Arcsin(a) | Arccos(a) | Arctan(a)
                | Arccot(a) | Factorial(a) => vec![a.clone()],
                Sum(a, b)
                | Difference(a, b)
                | Product(a, b)
                | Quotient(a, b)
                | Power(a, b)
                | Log(a, b)
                | Derivative(a, b, _)
                | Integral(a, b, _) => vec![a.clone(), b.clone()],
                Limit(a, b, c, _) => vec![a.clone(), b.clone(), c.clone()],
                Tensor { elements, .. } => elements.clone(),
            }
        })
    }

    /// Rebuilds this node's variant (auxiliary fields included) around new children.
    /// `children` must have the length of `direct_children()`.
    pub fn with_children(&self, children: &[Entity]) -> Entity {
        use EntityKind::*;
        let c = |i: usize| children[i].clone();
        let kind = match self.kind() {
            Num(_) | Var(_) => return self.clone(),
            Sum(..) => Sum(c(0), c(1)),
            Difference(..) => Difference(c(0), c(1)),
            Product(..) => Product(c(0), c(1)),
            Quotient(..) => Quotient(c(0), c(1)),
            Power(..) => Power(c(0), c(1)),
            Sin(_) => Sin(c(0)),
            Cos(_) => Cos(c(0)),
            Tan(_) => Tan(c(0)),
            Cot(_) => Cot(c(0)),
            Arcsin(_) => Arcsin(c(0)),
            Arccos(_) => Arccos(c(0)),
            Arctan(_) => Arctan(c(0)),
            Arccot(_) => Arccot(c(0)),
            Factorial(_) => Factorial(c(0)),
            Log(..) => Log(c(0), c(1)),
            Derivative(_, _, order) => Derivative(c(0), c(1), *order),
            Integral(_, _, order) => Integral(c(0), c(1), *order),
            Limit(_, _, _, approach) => Limit(c(0), c(1), c(2), *approach),
            Tensor { shape, .. } => Tensor {
                shape: shape.clone(),
                elements: children.to_vec(),
            },
        };
        Entity::new(kind)
    }

    /// Number of nodes in the subtree.
    pub fn complexity(&self) -> usize {
        *self.0.complexity.get_or_init(|| {
            1 + self
                .direct_children()
                .iter()
                .map(Entity::complexity)
                .sum::<usize>()
        })
    }

    /// Own value finite and every child finite.
    pub fn is_finite(&self) -> bool {
        *self.0.finite.get_or_init(|| match self.kind() {
            EntityKind::Num(value) => value.is_finite(),
            _ => self.direct_children().iter().all(Entity::is_finite),
        })
    }

    /// Names of variables that are not reserved constants of the global registry.
    /// Built from the children's cached sets.
    pub fn free_variables(&self) -> &BTreeSet<String> {
        self.0.free_variables.get_or_init(|| match self.kind() {
            EntityKind::Var(name) if ConstantRegistry::global().is_reserved(name) => BTreeSet::new(),
            EntityKind::Var(name) => BTreeSet::from([name.clone()]),
            _ => self
                .direct_children()
                .iter()
                .flat_map(|child| child.free_variables().iter().cloned())
                .collect(),
        })
    }

    /// Free variables against an explicit registry. The global registry reads the cache,
    /// any other registry is computed on every call.
    pub fn free_variables_with(&self, registry: &ConstantRegistry) -> BTreeSet<String> {
        if std::ptr::eq(registry, ConstantRegistry::global()) {
            return self.free_variables().clone();
        }
        match self.kind() {
            EntityKind::Var(name) if registry.is_reserved(name) => BTreeSet::new(),
            EntityKind::Var(name) => BTreeSet::from([name.clone()]),
            _ => self
                .direct_children()
                .iter()
                .flat_map(|child| child.free_variables_with(registry))
                .collect(),
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.kind() == other.kind()
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
    }
}

/// Fully parenthesised debug rendering.
impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use EntityKind::*;
        match self.kind() {
            Num(value) if value.is_negative() || !value.is_real() => write!(f, "({})", value),
            Num(value) => write!(f, "{}", value),
            Var(name) => write!(f, "{}", name),
            Sum(a, b) => write!(f, "({} + {})", a, b),
            Difference(a, b) => write!(f, "({} - {})", a, b),
            Product(a, b) => write!(f, "({} * {})", a, b),
            Quotient(a, b) => write!(f, "({} / {})", a, b),
            Power(a, b) => write!(f, "({} ^ {})", a, b),
            Sin(a) => write!(f, "sin({})", a),
            Cos(a) => write!(f, "cos({})", a),
            Tan(a) => write!(f, "tan({})", a),
            Cot(a) => write!(f, "cot({})", a),
            Arcsin(a) => write!(f, "arcsin({})", a),
            Arccos(a) => write!(f, "arccos({})", a),
            Arctan(a) => write!(f, "arctan({})", a),
            Arccot(a) => write!(f, "arccot({})", a),
            Factorial(a) => write!(f, "({})!", a),
            Log(base, a) => write!(f, "log({}, {})", base, a),
            Derivative(a, var, order) => write!(f, "derivative({}, {}, {})", a, var, order),
            Integral(a, var, order) => write!(f, "integral({}, {}, {})", a, var, order),
            Limit(a, var, dest, approach) => {
                write!(f, "limit({}, {}, {}, {})", a, var, dest, approach)
            }
            Tensor { shape, elements } => {
                let shape: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
                let elements: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "tensor<{}>[{}]", shape.join("x"), elements.join(", "))
            }
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

macro_rules! entity_binary_op {
    ($trait:ident, $method:ident, $variant:ident) => {
        impl std::ops::$trait for Entity {
            type Output = Entity;

            fn $method(self, rhs: Entity) -> Entity {
                Entity::new(EntityKind::$variant(self, rhs))
            }
        }

        impl std::ops::$trait<&Entity> for &Entity {
            type Output = Entity;

            fn $method(self, rhs: &Entity) -> Entity {
                Entity::new(EntityKind::$variant(self.clone(), rhs.clone()))
            }
        }
    };
}

entity_binary_op!(Add, add, Sum);
entity_binary_op!(Sub, sub, Difference);
entity_binary_op!(Mul, mul, Product);
entity_binary_op!(Div, div, Quotient);

macro_rules! entity_assign_op {
    ($trait:ident, $method:ident, $variant:ident) => {
        impl std::ops::$trait for Entity {
            fn $method(&mut self, rhs: Entity) {
                *self = Entity::new(EntityKind::$variant(self.clone(), rhs));
            }
        }
    };
}

entity_assign_op!(AddAssign, add_assign, Sum);
entity_assign_op!(SubAssign, sub_assign, Difference);
entity_assign_op!(MulAssign, mul_assign, Product);
entity_assign_op!(DivAssign, div_assign, Quotient);

impl std::ops::Neg for Entity {
    type Output = Entity;

    fn neg(self) -> Entity {
        Entity::int(-1) * self
    }
}

impl std::ops::Neg for &Entity {
    type Output = Entity;

    fn neg(self) -> Entity {
        Entity::int(-1) * self.clone()
    }
}
