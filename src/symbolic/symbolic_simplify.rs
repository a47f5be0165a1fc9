//! # Simplification Orchestrator
//!
//! Drives the simplifying rules of a [`RuleCatalog`] over a tree until nothing changes.
//!
//! ## Pass structure
//!
//! 1. **Rules**: every simplifying rule of the catalog, in catalog order, is applied bottom-up
//!    over the whole tree (`Entity::replace`)
//! 2. **Numeric folding**: arithmetic on literal operands and neutral elements
//!    (`a + 0`, `1 * a`, `a ^ 1`, ...) are folded, `a + (-1)*b` becomes `a - b`
//!
//! Passes stop at a fixpoint, when a tree repeats (some rule pairs undo each other, e.g. the
//! canonical operand order and factoring), or after `max_passes`. The result is the least
//! complex tree seen, including the input itself; ties go to the later tree.
//!
//! ## Settings
//!
//! [`SimplifySettings`] can be built directly or read from a task document:
//! ```text
//! simplify
//!     max_passes: 30
//!     sort_level: shape
//!     long_division: false
//!     loglevel: info
//! ```
//! A `loglevel` other than `off`/`none` starts a terminal logger: `info` reports every run,
//! `debug` every pass, `trace` every rule that fired.

use crate::Utils::task_parser::{SectionMap, Value, parse_document_as, single_value, template_of};
use crate::symbolic::errors::SettingsError;
use crate::symbolic::numbers::Number;
use crate::symbolic::rule_catalog::{LONG_DIVISION, RuleCatalog, RuleKind};
use crate::symbolic::symbolic_engine::Entity;
use crate::symbolic::symbolic_engine::EntityKind::*;
use crate::symbolic::tree_analysis::SortLevel;
use log::{debug, info, trace, warn};
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode};
use std::collections::HashSet;
use std::str::FromStr;

pub const SETTINGS_SECTION: &str = "simplify";
const SETTINGS_KEYS: [&str; 4] = ["max_passes", "sort_level", "long_division", "loglevel"];

#[derive(Clone, Debug, PartialEq)]
pub struct SimplifySettings {
    pub max_passes: usize,
    pub sort_level: SortLevel,
    /// include the polynomial long-division rule
    pub long_division: bool,
    /// "off"/"none", "error", "warn", "info", "debug", "trace"; `None` leaves logging alone
    pub loglevel: Option<String>,
}

impl Default for SimplifySettings {
    fn default() -> Self {
        SimplifySettings {
            max_passes: 20,
            sort_level: SortLevel::Exact,
            long_division: true,
            loglevel: None,
        }
    }
}

impl SimplifySettings {
    /// Reads the `simplify` section of a task document. Keys that are absent keep their
    /// defaults.
    pub fn from_document(text: &str) -> Result<Self, SettingsError> {
        let template = template_of(&[(SETTINGS_SECTION, &SETTINGS_KEYS[..])]);
        let document = parse_document_as(text, Some(&template))?;
        match document.get(SETTINGS_SECTION) {
            Some(section) => SimplifySettings::from_section(section),
            None => Ok(SimplifySettings::default()),
        }
    }

    pub fn from_section(section: &SectionMap) -> Result<Self, SettingsError> {
        let invalid = |key: &str, value: &Value| SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let mut settings = SimplifySettings::default();
        if let Some(value) = single_value(section, "max_passes")? {
            settings.max_passes = value
                .as_integer()
                .and_then(|n| usize::try_from(n).ok())
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid("max_passes", value))?;
        }
        if let Some(value) = single_value(section, "sort_level")? {
            settings.sort_level = value
                .as_string()
                .and_then(|s| SortLevel::from_str(s).ok())
                .ok_or_else(|| invalid("sort_level", value))?;
        }
        if let Some(value) = single_value(section, "long_division")? {
            settings.long_division = value
                .as_boolean()
                .ok_or_else(|| invalid("long_division", value))?;
        }
        if let Some(value) = single_value(section, "loglevel")? {
            settings.loglevel = Some(value.to_string());
            settings.level_filter()?;
        }
        Ok(settings)
    }

    /// `Ok(None)` when logging should not be started.
    pub fn level_filter(&self) -> Result<Option<LevelFilter>, SettingsError> {
        let Some(level) = self.loglevel.as_ref() else {
            return Ok(None);
        };
        let filter = match level.to_ascii_lowercase().as_str() {
            "off" | "none" => return Ok(None),
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => {
                return Err(SettingsError::InvalidValue {
                    key: "loglevel".to_string(),
                    value: level.clone(),
                });
            }
        };
        Ok(Some(filter))
    }
}

pub struct Simplificator {
    settings: SimplifySettings,
    catalog: RuleCatalog,
}

impl Simplificator {
    pub fn new(settings: SimplifySettings) -> Self {
        let catalog = RuleCatalog::standard(settings.sort_level);
        let catalog = if settings.long_division {
            catalog
        } else {
            catalog.without(LONG_DIVISION)
        };
        Simplificator { settings, catalog }
    }

    pub fn with_catalog(settings: SimplifySettings, catalog: RuleCatalog) -> Self {
        Simplificator { settings, catalog }
    }

    pub fn settings(&self) -> &SimplifySettings {
        &self.settings
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    // wrapper around simplifier to start logging
    pub fn simplify(&self, expr: &Entity) -> Entity {
        match self.settings.level_filter() {
            Ok(Some(level)) => {
                // a logger installed earlier stays in place
                let _ = CombinedLogger::init(vec![TermLogger::new(
                    level,
                    Config::default(),
                    TerminalMode::Mixed,
                    ColorChoice::Auto,
                )]);
            }
            Ok(None) => {}
            Err(e) => warn!("{}, logging not started", e),
        }
        info!("simplifying {} (complexity {})", expr, expr.complexity());
        let result = self.simplifier(expr);
        info!("result {} (complexity {})", result, result.complexity());
        result
    }

    fn simplifier(&self, expr: &Entity) -> Entity {
        let mut seen: HashSet<Entity> = HashSet::from([expr.clone()]);
        let mut best = expr.clone();
        let mut current = expr.clone();
        for pass in 1..=self.settings.max_passes {
            let next = self.pass(&current);
            debug!("pass {}: {}", pass, next);
            if next == current {
                debug!("fixpoint after {} passes", pass);
                break;
            }
            if next.complexity() <= best.complexity() {
                best = next.clone();
            }
            if !seen.insert(next.clone()) {
                debug!("pass {} repeats an earlier tree", pass);
                break;
            }
            current = next;
        }
        best
    }

    /// One pass: every simplifying rule bottom-up, then numeric folding.
    pub fn pass(&self, tree: &Entity) -> Entity {
        let mut current = tree.clone();
        for rule in self.catalog.of_kind(RuleKind::Simplifying) {
            let next = rule.apply_everywhere(&current);
            if !next.ptr_eq(&current) && next != current {
                trace!("{}: {} -> {}", rule.name(), current, next);
            }
            current = next;
        }
        numeric_folding(&current)
    }
}

//___________________________________NUMERIC FOLDING____________________________________

/// Bottom-up folding of literal arithmetic and neutral elements. Division by zero and
/// operations that would turn finite literals into non-finite ones are left as they are;
/// powers are folded for integer exponents only, so exact values stay exact.
pub fn numeric_folding(tree: &Entity) -> Entity {
    tree.replace(fold_node)
}

fn fold_literals(x: &Entity) -> Option<Number> {
    let (a, b) = match x.kind() {
        Sum(a, b) | Difference(a, b) | Product(a, b) | Quotient(a, b) | Power(a, b) => (a, b),
        _ => return None,
    };
    let (a, b) = (a.as_number()?, b.as_number()?);
    let value = match x.kind() {
        Sum(..) => a + b,
        Difference(..) => a - b,
        Product(..) => a * b,
        Quotient(..) if b.is_zero() => return None,
        Quotient(..) => a / b,
        Power(..) if !b.is_integer() => return None,
        Power(..) => a.pow(b),
        _ => return None,
    };
    (value.is_finite() || !(a.is_finite() && b.is_finite())).then_some(value)
}

fn is_zero(x: &Entity) -> bool {
    x.as_number().is_some_and(Number::is_zero)
}

fn fold_node(x: &Entity) -> Entity {
    if let Some(value) = fold_literals(x) {
        return Entity::number(value);
    }
    match x.kind() {
        Sum(a, b) if is_zero(b) => a.clone(),
        Sum(a, b) if is_zero(a) => b.clone(),
        Sum(a, b) => match (a.kind(), b.kind()) {
            (_, Product(m, t)) if m.is_int(-1) => a - t,
            (Product(m, t), _) if m.is_int(-1) => b - t,
            _ => x.clone(),
        },
        Difference(a, b) if is_zero(b) => a.clone(),
        Difference(a, b) if is_zero(a) => -b,
        Difference(a, b) => match b.kind() {
            Product(m, t) if m.is_int(-1) => a + t,
            _ => x.clone(),
        },
        Product(a, b) if a.is_int(1) => b.clone(),
        Product(a, b) if b.is_int(1) => a.clone(),
        Product(a, b) if (is_zero(a) && b.is_finite()) || (is_zero(b) && a.is_finite()) => {
            Entity::int(0)
        }
        Quotient(a, b) if b.is_int(1) => a.clone(),
        Quotient(a, b) if is_zero(a) && b.is_finite() && b.as_number().is_none() => {
            Entity::int(0)
        }
        Power(a, b) if b.is_int(1) => a.clone(),
        Power(a, b) if b.is_int(0) && a.is_finite() => Entity::int(1),
        Power(a, b) if a.is_int(1) && b.is_finite() => Entity::int(1),
        _ => x.clone(),
    }
}

impl Entity {
    /// Simplifies with default settings.
    pub fn simplify(&self) -> Entity {
        Simplificator::new(SimplifySettings::default()).simplify(self)
    }
}
