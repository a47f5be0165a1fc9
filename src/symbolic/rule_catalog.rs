//! Named, ordered catalog of rewrite rules.
//!
//! A [`Rule`] wraps one root-level rewrite from `patterns` together with its name and its
//! [`RuleKind`]. Simplifying rules are the ones the simplificator drives to a fixpoint;
//! expanding rules grow or reshape trees (and several of them undo a simplifying rule), so they
//! are only applied on request.
use crate::symbolic::patterns;
use crate::symbolic::polynomial_division::{PolynomialDivider, UnivariateDivider};
use crate::symbolic::symbolic_engine::Entity;
use crate::symbolic::tree_analysis::SortLevel;
use std::fmt;
use std::sync::Arc;
use strum_macros::{Display, EnumIter};

pub const NEGATIVE_POWERS: &str = "invert_negative_powers";
pub const NEGATIVE_MULTIPLIERS: &str = "invert_negative_multipliers";
pub const FACTORIAL_COLLAPSE: &str = "collapse_factorial_multiplications";
pub const FACTORIAL_DIVISION: &str = "expand_factorial_divisions";
pub const DIVISION_PREPARATION: &str = "prepare_divisions";
pub const TRIGONOMETRIC: &str = "trigonometric";
pub const TRIGONOMETRIC_EXPANSION: &str = "expand_trigonometric";
pub const EXPONENTIAL_SUBSTITUTION: &str = "exponential_substitution";
pub const POWERS: &str = "powers";
pub const COMMON: &str = "common";
pub const ANGLE_SUM_EXPANSION: &str = "expand_angle_sums";
pub const COLLAPSE: &str = "collapse";
pub const LONG_DIVISION: &str = "long_division";
pub const CANONICAL_SORT: &str = "canonical_sort";
pub const OPTIMIZE: &str = "optimize";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum RuleKind {
    Simplifying,
    Expanding,
}

type RuleFn = Arc<dyn Fn(&Entity) -> Entity + Send + Sync>;

#[derive(Clone)]
pub struct Rule {
    name: String,
    kind: RuleKind,
    apply: RuleFn,
}

impl Rule {
    pub fn new(
        name: &str,
        kind: RuleKind,
        apply: impl Fn(&Entity) -> Entity + Send + Sync + 'static,
    ) -> Self {
        Rule {
            name: name.to_string(),
            kind,
            apply: Arc::new(apply),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// Rewrites the root only.
    pub fn apply(&self, x: &Entity) -> Entity {
        (self.apply)(x)
    }

    /// Rewrites every node, bottom-up.
    pub fn apply_everywhere(&self, tree: &Entity) -> Entity {
        tree.replace(|node| (self.apply)(node))
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Rule({}, {})", self.name, self.kind)
    }
}

#[derive(Clone, Debug, Default)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
}

impl RuleCatalog {
    pub fn empty() -> Self {
        RuleCatalog::default()
    }

    /// Every rule family in application order, with the default polynomial divider.
    pub fn standard(sort_level: SortLevel) -> Self {
        RuleCatalog::with_divider(sort_level, Arc::new(UnivariateDivider))
    }

    pub fn with_divider(sort_level: SortLevel, divider: Arc<dyn PolynomialDivider>) -> Self {
        use RuleKind::*;
        RuleCatalog::empty()
            .push(Rule::new(NEGATIVE_POWERS, Simplifying, patterns::invert_negative_powers))
            .push(Rule::new(
                NEGATIVE_MULTIPLIERS,
                Simplifying,
                patterns::invert_negative_multipliers,
            ))
            .push(Rule::new(
                FACTORIAL_COLLAPSE,
                Simplifying,
                patterns::collapse_factorial_multiplications,
            ))
            .push(Rule::new(
                FACTORIAL_DIVISION,
                Simplifying,
                patterns::expand_factorial_divisions,
            ))
            .push(Rule::new(
                DIVISION_PREPARATION,
                Expanding,
                patterns::division_preparing_rules,
            ))
            .push(Rule::new(TRIGONOMETRIC, Simplifying, patterns::trigonometric_rules))
            .push(Rule::new(
                TRIGONOMETRIC_EXPANSION,
                Expanding,
                patterns::expand_trigonometric_rules,
            ))
            .push(Rule::new(POWERS, Simplifying, patterns::power_rules))
            .push(Rule::new(COMMON, Simplifying, patterns::common_rules))
            .push(Rule::new(ANGLE_SUM_EXPANSION, Expanding, patterns::expand_rules))
            .push(Rule::new(COLLAPSE, Expanding, patterns::collapse_rules))
            .push(Rule::new(LONG_DIVISION, Simplifying, move |x: &Entity| {
                patterns::long_division(x, divider.as_ref())
            }))
            .push(Rule::new(CANONICAL_SORT, Simplifying, move |x: &Entity| {
                patterns::canonical_sort(x, sort_level)
            }))
            .push(Rule::new(OPTIMIZE, Expanding, patterns::optimize))
    }

    /// Appends the exponential substitution `sin`/`cos` of `a*from + b` over `to = e^(i*from)`.
    pub fn with_exponential_substitution(self, from: &str, to: &str) -> Self {
        let (from, to) = (Entity::var(from), Entity::var(to));
        self.push(Rule::new(
            EXPONENTIAL_SUBSTITUTION,
            RuleKind::Expanding,
            move |x: &Entity| patterns::exponential_substitution(x, &from, &to),
        ))
    }

    pub fn push(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Catalog without the rule called `name`.
    pub fn without(mut self, name: &str) -> Self {
        self.rules.retain(|rule| rule.name != name);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn of_kind(&self, kind: RuleKind) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |rule| rule.kind == kind)
    }

    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(Rule::name).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
