//! # Compiler & Stack Machine
//!
//! Lowers an [`Entity`] tree plus an ordered list of argument names into a flat instruction
//! sequence, executed by a small stack machine. Compiling once and calling many times is far
//! cheaper than substituting values into the tree and evaluating it again for every point.
//!
//! ## Instructions
//! - `PushConst(value)` - push a literal
//! - `PushVar(slot)` - push the argument bound to `slot`
//! - `CallOp(op, k)` - pop `k` operands, apply `op` to them in their original left-to-right
//!   order, push the result
//!
//! Children are emitted left to right before their operator (post-order), so a well formed
//! program always ends with exactly one value on the stack.
//!
//! ## Example
//! ```rust, ignore
//! let x = Entity::var("x");
//! let f = (&x * &x + Entity::int(1)).compile(&["x"])?;
//! assert_eq!(f.call(&[Number::int(3)])?, Number::int(10));
//! ```

use crate::symbolic::constants::ConstantRegistry;
use crate::symbolic::errors::{CallError, CompileError, EvalError};
use crate::symbolic::numbers::Number;
use crate::symbolic::symbolic_engine::{Entity, EntityKind};
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::Arc;
use strum_macros::{Display, EnumIter};

/// Operators the stack machine can apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum OpCode {
    Sum,
    Difference,
    Product,
    Quotient,
    Power,
    Sin,
    Cos,
    Tan,
    Cot,
    Arcsin,
    Arccos,
    Arctan,
    Arccot,
    Factorial,
    /// operands: base, argument
    Log,
}

impl OpCode {
    pub fn arity(self) -> usize {
        match self {
            OpCode::Sum
            | OpCode::Difference
            | OpCode::Product
            | OpCode::Quotient
            | OpCode::Power
            | OpCode::Log => 2,
            _ => 1,
        }
    }

    /// Applies the operator; `operands` holds exactly `arity()` values in tree order.
    pub fn apply(self, operands: &[Number]) -> Number {
        match self {
            OpCode::Sum => operands[0].add(&operands[1]),
            OpCode::Difference => operands[0].sub(&operands[1]),
            OpCode::Product => operands[0].mul(&operands[1]),
            OpCode::Quotient => operands[0].div(&operands[1]),
            OpCode::Power => operands[0].pow(&operands[1]),
            OpCode::Sin => operands[0].sin(),
            OpCode::Cos => operands[0].cos(),
            OpCode::Tan => operands[0].tan(),
            OpCode::Cot => operands[0].cot(),
            OpCode::Arcsin => operands[0].arcsin(),
            OpCode::Arccos => operands[0].arccos(),
            OpCode::Arctan => operands[0].arctan(),
            OpCode::Arccot => operands[0].arccot(),
            OpCode::Factorial => operands[0].factorial(),
            OpCode::Log => operands[1].log(&operands[0]),
        }
    }

    fn for_kind(kind: &EntityKind) -> Option<OpCode> {
        use EntityKind::*;
        let op = match kind {
            Sum(..) => OpCode::Sum,
            Difference(..) => OpCode::Difference,
            Product(..) => OpCode::Product,
            Quotient(..) => OpCode::Quotient,
            Power(..) => OpCode::Power,
            Sin(_) => OpCode::Sin,
            Cos(_) => OpCode::Cos,
            Tan(_) => OpCode::Tan,
            Cot(_) => OpCode::Cot,
            Arcsin(_) => OpCode::Arcsin,
            Arccos(_) => OpCode::Arccos,
            Arctan(_) => OpCode::Arctan,
            Arccot(_) => OpCode::Arccot,
            Factorial(_) => OpCode::Factorial,
            Log(..) => OpCode::Log,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    PushConst(Number),
    PushVar(usize),
    CallOp(OpCode, usize),
}

/// Turns trees into [`CompiledFunction`]s. Reserved constants that are not declared as
/// arguments are folded into literals using `constants`.
#[derive(Clone, Debug, Default)]
pub struct Compiler {
    constants: ConstantRegistry,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler::default()
    }

    pub fn with_constants(constants: ConstantRegistry) -> Self {
        Compiler { constants }
    }

    pub fn compile(&self, tree: &Entity, names: &[&str]) -> Result<CompiledFunction, CompileError> {
        let mut slots: HashMap<&str, usize> = HashMap::with_capacity(names.len());
        for (slot, name) in names.iter().enumerate() {
            if slots.insert(*name, slot).is_some() {
                return Err(CompileError::DuplicateVariable(name.to_string()));
            }
        }
        let mut instructions = Vec::with_capacity(tree.complexity());
        self.emit(tree, &slots, &mut instructions)?;
        let max_depth = max_stack_depth(&instructions);
        debug!(
            "compiled {} nodes into {} instructions over {} arguments",
            tree.complexity(),
            instructions.len(),
            names.len()
        );
        Ok(CompiledFunction {
            instructions: instructions.into(),
            arity: names.len(),
            max_depth,
        })
    }

    fn emit(
        &self,
        node: &Entity,
        slots: &HashMap<&str, usize>,
        out: &mut Vec<Instruction>,
    ) -> Result<(), CompileError> {
        match node.kind() {
            EntityKind::Num(value) => out.push(Instruction::PushConst(value.clone())),
            EntityKind::Var(name) => {
                let instruction = match (slots.get(name.as_str()), self.constants.value(name)) {
                    (Some(slot), _) => Instruction::PushVar(*slot),
                    (None, Some(value)) => Instruction::PushConst(value.clone()),
                    (None, None) => return Err(CompileError::UnboundVariable(name.clone())),
                };
                out.push(instruction);
            }
            kind => {
                let op = OpCode::for_kind(kind)
                    .ok_or_else(|| CompileError::UnsupportedNode(node_name(kind).to_string()))?;
                let children = node.direct_children();
                for child in children {
                    self.emit(child, slots, out)?;
                }
                out.push(Instruction::CallOp(op, children.len()));
            }
        }
        Ok(())
    }
}

fn node_name(kind: &EntityKind) -> &'static str {
    match kind {
        EntityKind::Derivative(..) => "derivative",
        EntityKind::Integral(..) => "integral",
        EntityKind::Limit(..) => "limit",
        EntityKind::Tensor { .. } => "tensor",
        _ => "expression",
    }
}

fn max_stack_depth(instructions: &[Instruction]) -> usize {
    let mut depth: usize = 0;
    let mut max = 0;
    for instruction in instructions {
        match instruction {
            Instruction::PushConst(_) | Instruction::PushVar(_) => depth += 1,
            Instruction::CallOp(_, k) => depth = depth.saturating_sub(*k) + 1,
        }
        max = max.max(depth);
    }
    max
}

/// An immutable instruction sequence plus its argument count. Cloning shares the
/// instructions; every call runs on its own stack, so one function can serve many threads.
#[derive(Clone, Debug)]
pub struct CompiledFunction {
    instructions: Arc<[Instruction]>,
    arity: usize,
    max_depth: usize,
}

impl CompiledFunction {
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn call(&self, args: &[Number]) -> Result<Number, CallError> {
        if args.len() != self.arity {
            return Err(CallError::Arity {
                expected: self.arity,
                found: args.len(),
            });
        }
        let mut stack: Vec<Number> = Vec::with_capacity(self.max_depth);
        for instruction in self.instructions.iter() {
            match instruction {
                Instruction::PushConst(value) => stack.push(value.clone()),
                Instruction::PushVar(slot) => stack.push(args[*slot].clone()),
                Instruction::CallOp(op, k) => {
                    if stack.len() < *k {
                        return Err(CallError::StackImbalance { depth: stack.len() });
                    }
                    let start = stack.len() - k;
                    let value = op.apply(&stack[start..]);
                    trace!("{} -> {}", op, value);
                    stack.truncate(start);
                    stack.push(value);
                }
            }
        }
        match (stack.pop(), stack.is_empty()) {
            (Some(result), true) => Ok(result),
            (popped, _) => Err(CallError::StackImbalance {
                depth: stack.len() + usize::from(popped.is_some()),
            }),
        }
    }

    /// Calls with real arguments; a complex result maps to NaN.
    pub fn call_f64(&self, args: &[f64]) -> Result<f64, CallError> {
        let args: Vec<Number> = args.iter().map(|x| Number::real(*x)).collect();
        let result = self.call(&args)?;
        Ok(result.to_f64().unwrap_or(f64::NAN))
    }

    /// Plain closure over `f64`; call errors and complex results map to NaN.
    pub fn as_closure(self) -> impl Fn(&[f64]) -> f64 + Send + Sync {
        move |args| self.call_f64(args).unwrap_or(f64::NAN)
    }
}

impl Entity {
    /// Compiles with the standard constants.
    pub fn compile(&self, names: &[&str]) -> Result<CompiledFunction, CompileError> {
        Compiler::new().compile(self, names)
    }

    /// Numeric value of a tree without free variables or calculus nodes.
    pub fn eval(&self) -> Result<Number, EvalError> {
        if !self.can_be_evaluated() {
            return Err(EvalError::NotEvaluable(self.to_string()));
        }
        Ok(self.compile(&[])?.call(&[])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;
    use strum::IntoEnumIterator;

    #[test]
    fn test_instruction_layout() {
        let x = Entity::var("x");
        let f = (&x - &Entity::int(1)).compile(&["x"]).unwrap();
        assert_eq!(
            f.instructions(),
            &[
                Instruction::PushVar(0),
                Instruction::PushConst(Number::int(1)),
                Instruction::CallOp(OpCode::Difference, 2),
            ]
        );
        assert_eq!(f.arity(), 1);
    }

    #[test]
    fn test_call_respects_operand_order() {
        let (x, y) = (Entity::var("x"), Entity::var("y"));
        let f = (&x / &y).compile(&["x", "y"]).unwrap();
        assert_eq!(
            f.call(&[Number::int(1), Number::int(4)]).unwrap(),
            Number::rational(1, 4)
        );
        let g = (&x / &y).compile(&["y", "x"]).unwrap();
        assert_eq!(
            g.call(&[Number::int(1), Number::int(4)]).unwrap(),
            Number::int(4)
        );
    }

    #[test]
    fn test_log_operands() {
        let x = Entity::var("x");
        let f = x.log_base(&Entity::int(2)).compile(&["x"]).unwrap();
        assert_relative_eq!(f.call_f64(&[8.0]).unwrap(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unbound_variable() {
        let expr = Entity::var("x") + Entity::var("y");
        assert_eq!(
            expr.compile(&["x"]).unwrap_err(),
            CompileError::UnboundVariable("y".to_string())
        );
    }

    #[test]
    fn test_duplicate_variable() {
        let expr = Entity::var("x");
        assert_eq!(
            expr.compile(&["x", "x"]).unwrap_err(),
            CompileError::DuplicateVariable("x".to_string())
        );
    }

    #[test]
    fn test_arity_mismatch() {
        let f = Entity::var("x").compile(&["x"]).unwrap();
        assert_eq!(
            f.call(&[]).unwrap_err(),
            CallError::Arity {
                expected: 1,
                found: 0
            }
        );
    }

    #[test]
    fn test_reserved_constants() {
        let pi = Entity::var("pi");
        let folded = pi.compile(&[]).unwrap();
        assert_eq!(folded.call(&[]).unwrap(), Number::real(PI));
        // a declared name wins over the registry
        let declared = pi.compile(&["pi"]).unwrap();
        assert_eq!(declared.call(&[Number::int(3)]).unwrap(), Number::int(3));
        let custom = Compiler::with_constants(ConstantRegistry::empty());
        assert!(matches!(
            custom.compile(&pi, &[]),
            Err(CompileError::UnboundVariable(_))
        ));
    }

    #[test]
    fn test_calculus_nodes_are_rejected() {
        let expr = Entity::var("x").derivative("x", 1);
        assert_eq!(
            expr.compile(&["x"]).unwrap_err(),
            CompileError::UnsupportedNode("derivative".to_string())
        );
    }

    #[test]
    fn test_eval() {
        let third = Entity::int(1) / Entity::int(3);
        assert_eq!((&third + &third).eval().unwrap(), Number::rational(2, 3));
        assert_eq!(Entity::int(0).sin().eval().unwrap(), Number::real(0.0));
        assert!(matches!(
            Entity::var("x").eval(),
            Err(EvalError::NotEvaluable(_))
        ));
        let pi_half = Entity::var("pi") / Entity::int(2);
        assert_relative_eq!(pi_half.sin().eval().unwrap().to_f64().unwrap(), 1.0);
    }

    #[test]
    fn test_compiled_matches_substitution() {
        let (x, y) = (Entity::var("x"), Entity::var("y"));
        let expr = x.sin() * y.pow(&Entity::int(2)) + x.arctan() / (&y + &Entity::int(1));
        let f = expr.compile(&["x", "y"]).unwrap();
        let grid = [
            (Number::int(0), Number::int(0)),
            (Number::real(0.5), Number::real(1.0)),
            (Number::real(-2.0), Number::rational(7, 2)),
            (Number::int(-3), Number::real(0.25)),
            (Number::complex(1.0, 2.0), Number::complex(-0.5, 0.5)),
        ];
        for (a, b) in grid {
            let substituted = expr
                .substitute(&x, &Entity::number(a.clone()))
                .substitute(&y, &Entity::number(b.clone()))
                .eval()
                .unwrap();
            let compiled = f.call(&[a, b]).unwrap();
            assert_eq!(compiled, substituted);
        }
    }

    #[test]
    fn test_closure_and_threads() {
        let x = Entity::var("x");
        let f = (&x * &x).compile(&["x"]).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let f = f.clone();
                std::thread::spawn(move || f.call_f64(&[i as f64]).unwrap())
            })
            .collect();
        let results: Vec<f64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results, vec![0.0, 1.0, 4.0, 9.0]);
        let closure = f.as_closure();
        assert_eq!(closure(&[3.0]), 9.0);
        assert!(closure(&[]).is_nan());
    }

    #[test]
    fn test_opcodes() {
        assert_eq!(OpCode::iter().count(), 15);
        assert_eq!(OpCode::Arcsin.to_string(), "arcsin");
        assert_eq!(OpCode::Log.arity(), 2);
        assert_eq!(OpCode::Factorial.arity(), 1);
    }
}
