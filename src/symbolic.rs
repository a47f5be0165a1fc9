#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// # Numbers
/// exact integers and rationals, reals and complex numbers with widening arithmetic
/// ```
/// use RustedAlgebra::symbolic::numbers::Number;
/// let third = Number::rational(1, 3);
/// assert_eq!(&third + &third, Number::rational(2, 3));
/// assert_eq!(Number::rational(4, 2), Number::int(2));
/// ```
pub mod numbers;
/// reserved constant names (`pi`, `e`) and their values
pub mod constants;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// the node model: immutable shared expression trees with memoized properties
///# Example#
/// ```
/// use RustedAlgebra::symbolic::symbolic_engine::Entity;
/// let x = Entity::var("x");
/// let expr = (x.clone() + Entity::int(1)) * x.sin();
/// assert_eq!(expr.complexity(), 6);
/// assert_eq!(expr.to_string(), "((x + 1) * sin(x))");
/// ```
pub mod symbolic_engine;
/// traversal, bottom-up replace, substitute, contains, sort keys and chain flattening
pub mod tree_analysis;
/// error types of the compiler, the stack machine and settings documents
pub mod errors;
///____________________________________________________________________________________________________________________________
/// # Rewrite rules
/// root-level rewrite rules grouped in families (powers, trigonometry, factorials, common rules...)
pub mod patterns;
/// polynomial long division used by the long-division rule
pub mod polynomial_division;
/// named, ordered catalog of rewrite rules
pub mod rule_catalog;
///____________________________________________________________________________________________________________________________
/// # Simplification
/// drives the simplifying rules to a fixpoint and folds numeric literals
///# Example#
/// ```
/// use RustedAlgebra::symbolic::symbolic_engine::Entity;
/// let x = Entity::var("x");
/// let expr = x.pow(&Entity::int(2)) * x.pow(&Entity::int(3));
/// assert_eq!(expr.simplify(), x.pow(&Entity::int(5)));
/// ```
pub mod symbolic_simplify;
///____________________________________________________________________________________________________________________________
/// # Compiler
/// lowers a tree into a flat stack-machine program and runs it
///# Example#
/// ```
/// use RustedAlgebra::symbolic::numbers::Number;
/// use RustedAlgebra::symbolic::symbolic_engine::Entity;
/// let (x, y) = (Entity::var("x"), Entity::var("y"));
/// let f = (x.clone() * y.clone() + x).compile(&["x", "y"]).unwrap();
/// assert_eq!(f.call(&[Number::int(2), Number::int(3)]).unwrap(), Number::int(8));
/// ```
pub mod symbolic_compile;

mod patterns_tests;
