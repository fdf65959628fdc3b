//! Smart defaults: initial per-breakpoint geometry derived from a widget's category.
//!
//! Classification goes through an explicit [`CategoryTable`], resolved once per
//! identity. The standard table reproduces the dashboard's naming conventions
//! (`pipe-system-…`, `valvula-X00`, `motor-enchimento-1`, …) but any table can be
//! injected. Generation is pure: same identity and overrides, same output.

use crate::breakpoint::Breakpoint;
use crate::config::{ConfigSet, PartialConfigSet, WidgetConfig};
use crate::identity::WidgetId;
use serde::{Deserialize, Serialize};

/// Widget category, in stacking order from back to front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Pipes, backdrops and other full-scene drawings.
    Background,
    /// Structural bases that valves and actuators sit on.
    Structural,
    /// Anything not recognised.
    Generic,
    /// Valves.
    Valve,
    /// Motors, pistons, cylinders.
    Actuator,
}

/// Loading priority tier; lower tiers become visible first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Normal, Priority::High];
}

/// Size template: geometry at `xs` plus growth per breakpoint step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeTemplate {
    pub origin: (f64, f64),
    pub size: (f64, f64),
    pub origin_step: (f64, f64),
    pub size_step: (f64, f64),
    pub scale: f64,
    pub scale_step: f64,
}

impl SizeTemplate {
    /// Config at `breakpoint` with the given stacking order.
    pub fn at(&self, breakpoint: Breakpoint, z_index: i32) -> WidgetConfig {
        let i = breakpoint.index() as f64;
        WidgetConfig {
            x: self.origin.0 + self.origin_step.0 * i,
            y: self.origin.1 + self.origin_step.1 * i,
            width: self.size.0 + self.size_step.0 * i,
            height: self.size.1 + self.size_step.1 * i,
            scale: (self.scale + self.scale_step * i).min(1.0),
            z_index,
            opacity: 1.0,
            rotation: 0.0,
        }
    }
}

impl Category {
    /// Constant stacking order of the category.
    pub fn z_index(self) -> i32 {
        match self {
            Category::Background => 1,
            Category::Structural => 10,
            Category::Generic => 1,
            Category::Valve => 15,
            Category::Actuator => 20,
        }
    }

    /// Loading tier of the category.
    pub fn priority(self) -> Priority {
        match self {
            Category::Background | Category::Structural => Priority::Low,
            Category::Generic => Priority::Normal,
            Category::Valve | Category::Actuator => Priority::High,
        }
    }

    pub fn template(self) -> SizeTemplate {
        match self {
            Category::Background => SizeTemplate {
                origin: (0.0, 0.0),
                size: (800.0, 600.0),
                origin_step: (0.0, 0.0),
                size_step: (200.0, 100.0),
                scale: 1.0,
                scale_step: 0.0,
            },
            Category::Structural => SizeTemplate {
                origin: (50.0, 100.0),
                size: (300.0, 200.0),
                origin_step: (50.0, 50.0),
                size_step: (50.0, 50.0),
                scale: 1.0,
                scale_step: 0.0,
            },
            Category::Generic => SizeTemplate {
                origin: (10.0, 70.0),
                size: (200.0, 100.0),
                origin_step: (20.0, 0.0),
                size_step: (50.0, 25.0),
                scale: 0.7,
                scale_step: 0.1,
            },
            Category::Valve => SizeTemplate {
                origin: (100.0, 100.0),
                size: (80.0, 80.0),
                origin_step: (50.0, 20.0),
                size_step: (10.0, 10.0),
                scale: 1.0,
                scale_step: 0.0,
            },
            Category::Actuator => SizeTemplate {
                origin: (150.0, 150.0),
                size: (160.0, 120.0),
                origin_step: (50.0, 50.0),
                size_step: (20.0, 20.0),
                scale: 1.0,
                scale_step: 0.0,
            },
        }
    }
}

/// How a [`CategoryRule`] pattern is compared with an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Match {
    Exact,
    Prefix,
    Contains,
}

/// One classification rule. Comparison is ASCII case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub pattern: String,
    pub matching: Match,
    pub category: Category,
}

impl CategoryRule {
    pub fn new(pattern: impl Into<String>, matching: Match, category: Category) -> Self {
        Self {
            pattern: pattern.into().to_ascii_lowercase(),
            matching,
            category,
        }
    }

    fn matches(&self, identity: &str) -> bool {
        match self.matching {
            Match::Exact => identity == self.pattern,
            Match::Prefix => identity.starts_with(&self.pattern),
            Match::Contains => identity.contains(&self.pattern),
        }
    }
}

/// Ordered rule list; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTable {
    rules: Vec<CategoryRule>,
    fallback: Category,
}

impl CategoryTable {
    /// Empty table classifying everything as `fallback`.
    pub fn new(fallback: Category) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    /// Append a rule.
    pub fn with_rule(mut self, pattern: impl Into<String>, matching: Match, category: Category) -> Self {
        self.rules.push(CategoryRule::new(pattern, matching, category));
        self
    }

    /// Rules used by the industrial dashboards.
    pub fn standard() -> Self {
        use Category::*;
        use Match::*;

        let mut table = Self::new(Generic);
        for pattern in ["background", "pipe", "tubulacao", "fundo"] {
            table = table.with_rule(pattern, Contains, Background);
        }
        table = table.with_rule("base", Contains, Structural);
        for pattern in ["valve", "valvula"] {
            table = table.with_rule(pattern, Contains, Valve);
        }
        for prefix in ["vf", "vd", "vg", "vh"] {
            table = table.with_rule(prefix, Prefix, Valve);
        }
        for pattern in ["motor", "pistao", "piston", "cilindro", "cylinder", "actuator"] {
            table = table.with_rule(pattern, Contains, Actuator);
        }
        table
    }

    /// Category of an identity.
    pub fn classify(&self, identity: &WidgetId) -> Category {
        let id = identity.as_str().to_ascii_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&id))
            .map(|rule| rule.category)
            .unwrap_or(self.fallback)
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Produces complete default config sets.
#[derive(Debug, Clone, Default)]
pub struct SmartDefaults {
    table: CategoryTable,
}

impl SmartDefaults {
    pub fn new(table: CategoryTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    pub fn category(&self, identity: &WidgetId) -> Category {
        self.table.classify(identity)
    }

    pub fn priority(&self, identity: &WidgetId) -> Priority {
        self.category(identity).priority()
    }

    /// One entry per breakpoint, caller overrides winning field by field.
    pub fn resolve(&self, identity: &WidgetId, overrides: Option<&PartialConfigSet>) -> ConfigSet {
        let category = self.category(identity);
        let template = category.template();
        let z_index = category.z_index();

        ConfigSet::from_entries(Breakpoint::ALL.iter().map(|&bp| {
            let generated = template.at(bp, z_index);
            let config = match overrides.and_then(|o| o.get(&bp)) {
                Some(partial) => partial.apply_to(generated),
                None => generated,
            };
            (bp, config)
        }))
    }
}
