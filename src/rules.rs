//! Rule registry: which certificate kinds supersede which others.
//!
//! Rules are declared as data ([`RuleDecl`]) in [`BUILTIN_RULES`] and turned
//! into an immutable [`RuleRegistry`] by [`RuleRegistry::from_table`], which
//! derives each kind's `superseded_by` set as the inverse of every other
//! kind's `supersedes`. The registry is built once and shared read-only.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::certificate::CertificateKind;
use crate::certificate::CertificateKind::*;

/// Slug of the synthesized tier that follows an Inactive member's history.
pub const INACTIVE_MEMBER_SLUG: &str = "inactive_member";

// ---------------------------------------------------------------------------
// Eligibility
// ---------------------------------------------------------------------------

/// A standing requirement checked at renewal time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Constraint {
    FirstAidCurrent,
    ProfessionalPracticeCurrent,
    ContinuingDevelopmentCurrent,
    ApprenticeTimeLimitNotExceeded,
    SkiAssessmentOnSkis,
}

/// What a holder can renew into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EligibleFor {
    Tier(CertificateKind),
    /// A plain account without a professional tier.
    AccountHolder,
}

/// One renewal transition: renew as `to`, keeping designation `with`, when
/// every constraint in `when` holds.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Eligibility {
    pub to: EligibleFor,
    pub with: Option<CertificateKind>,
    pub when: &'static [Constraint],
}

const CORE: &[Constraint] = &[
    Constraint::FirstAidCurrent,
    Constraint::ProfessionalPracticeCurrent,
    Constraint::ContinuingDevelopmentCurrent,
];
const APPRENTICE: &[Constraint] = &[
    Constraint::FirstAidCurrent,
    Constraint::ProfessionalPracticeCurrent,
    Constraint::ContinuingDevelopmentCurrent,
    Constraint::ApprenticeTimeLimitNotExceeded,
];
const FIRST_AID: &[Constraint] = &[Constraint::FirstAidCurrent];

macro_rules! renew {
    ($to:expr, $when:expr) => {
        Eligibility {
            to: EligibleFor::Tier($to),
            with: None,
            when: $when,
        }
    };
}

macro_rules! step_down {
    ($to:expr, $with:expr, $when:expr) => {
        Eligibility {
            to: EligibleFor::Tier($to),
            with: Some($with),
            when: $when,
        }
    };
}

macro_rules! account {
    ($with:expr) => {
        Eligibility {
            to: EligibleFor::AccountHolder,
            with: Some($with),
            when: FIRST_AID,
        }
    };
}

// ---------------------------------------------------------------------------
// Declared table
// ---------------------------------------------------------------------------

/// One declared row of the rule table.
#[derive(Debug, Clone, Copy)]
pub struct RuleDecl {
    pub kind: CertificateKind,
    /// English label of the membership.
    pub label: &'static str,
    /// Tier slug in the successor system.
    pub slug: &'static str,
    pub supervises: &'static [CertificateKind],
    pub supersedes: &'static [CertificateKind],
    pub eligible: &'static [Eligibility],
    /// Tier this one becomes once winter travel is acquired.
    pub winter_variant: Option<CertificateKind>,
    /// Tier whose slug replaces this deprecated one in the output.
    pub merged_into: Option<CertificateKind>,
}

impl RuleDecl {
    const fn new(kind: CertificateKind, label: &'static str, slug: &'static str) -> Self {
        Self {
            kind,
            label,
            slug,
            supervises: &[],
            supersedes: &[],
            eligible: &[],
            winter_variant: None,
            merged_into: None,
        }
    }

    const fn supervises(mut self, kinds: &'static [CertificateKind]) -> Self {
        self.supervises = kinds;
        self
    }

    const fn supersedes(mut self, kinds: &'static [CertificateKind]) -> Self {
        self.supersedes = kinds;
        self
    }

    const fn eligible(mut self, eligible: &'static [Eligibility]) -> Self {
        self.eligible = eligible;
        self
    }

    const fn winter_variant(mut self, kind: CertificateKind) -> Self {
        self.winter_variant = Some(kind);
        self
    }

    const fn merged_into(mut self, kind: CertificateKind) -> Self {
        self.merged_into = Some(kind);
        self
    }
}

/// The hand-curated rule table.
pub const BUILTIN_RULES: &[RuleDecl] = &[
    RuleDecl::new(Ifmga, "IFMGA Member", "ifmga")
        .supervises(&[Arg, Asg, Aag, Ahg, Trci])
        .eligible(&[renew!(Mg, &[Constraint::SkiAssessmentOnSkis])]),
    RuleDecl::new(Mg, "Mountain Guide Member", "mountain_guide")
        .supervises(&[Arg, Asg, Aag, Ahg, Trci])
        .supersedes(&[Rg, Ag, Sg, Hg, Aag, Arg, Asg, Ahg, Trci])
        .eligible(&[step_down!(Ag, Sg, CORE), step_down!(Sg, Ag, CORE), renew!(Mg, CORE)]),
    RuleDecl::new(Rg, "Rock Guide Member", "rock_guide")
        .supervises(&[Arg, Aag, Trci])
        .supersedes(&[Arg, Trci])
        .eligible(&[step_down!(Arg, Rg, CORE), renew!(Rg, CORE)]),
    RuleDecl::new(Sg, "Ski Guide Member", "ski_guide")
        .supervises(&[Asg, Ahgw])
        .supersedes(&[Asg])
        .eligible(&[step_down!(Asg, Sg, CORE), renew!(Sg, CORE)]),
    RuleDecl::new(Ag, "Alpine Guide Member", "alpine_guide")
        .supervises(&[Aag, Arg, Ahg, Trci])
        .supersedes(&[Aag, Arg, Ahg, Ahgw, Hg, Hgw, Dhg, Trci])
        .eligible(&[step_down!(Aag, Ag, CORE), renew!(Ag, CORE)]),
    RuleDecl::new(Hg, "Hiking Guide Member", "hiking_guide")
        .supervises(&[Ahg, Aag])
        .supersedes(&[Ahg, Dhg])
        .eligible(&[step_down!(Ahg, Hg, CORE), renew!(Hg, CORE)])
        .winter_variant(Hgw),
    // Legacy scope of practice; the designation is no longer awarded.
    RuleDecl::new(Dhg, "Day Hiking Guide Member", "day_hiking_guide")
        .eligible(&[renew!(Dhg, CORE)]),
    RuleDecl::new(Hgw, "Winter Hiking Guide Member", "hiking_guide_winter")
        .supervises(&[Ahgw, Aag])
        .supersedes(&[Ahg, Ahgw])
        .eligible(&[step_down!(Hg, WinterTravel, CORE), renew!(Hgw, CORE)]),
    RuleDecl::new(Arg, "Apprentice Rock Guide Member", "apprentice_rock_guide")
        .eligible(&[account!(Arg), renew!(Arg, APPRENTICE)]),
    RuleDecl::new(Aag, "Apprentice Alpine Guide Member", "apprentice_alpine_guide")
        .eligible(&[account!(Aag), renew!(Aag, APPRENTICE)]),
    RuleDecl::new(Asg, "Apprentice Ski Guide Member", "apprentice_ski_guide")
        .eligible(&[account!(Asg), renew!(Asg, APPRENTICE)]),
    RuleDecl::new(Ahg, "Apprentice Hiking Guide Member", "apprentice_hiking_guide")
        .eligible(&[account!(Ahg), renew!(Ahg, APPRENTICE)])
        .winter_variant(Ahgw),
    RuleDecl::new(Ahgw, "Apprentice Winter Hiking Guide Member", "apprentice_hiking_guide_winter")
        .eligible(&[step_down!(Ahg, WinterTravel, APPRENTICE), renew!(Ahgw, APPRENTICE)]),
    RuleDecl::new(Cgi1, "Climbing Gym Instructor Level 1 Member", "climbing_gym_instructor_level_1")
        .eligible(&[account!(Cgi1), renew!(Cgi1, CORE)]),
    RuleDecl::new(Cgi2, "Climbing Gym Instructor Level 2 Member", "climbing_gym_instructor_level_2")
        .supersedes(&[Cgi1])
        .eligible(&[step_down!(Cgi1, Cgi2, CORE), renew!(Cgi2, CORE)]),
    RuleDecl::new(Cgi3, "Climbing Gym Instructor Level 3 Member", "climbing_gym_instructor_level_3")
        .supersedes(&[Cgi1, Cgi2])
        .eligible(&[renew!(Cgi3, CORE)])
        .merged_into(Cgi2),
    RuleDecl::new(Trci, "Top Rope Climbing Instructor Member", "top_rope_climbing_instructor")
        .eligible(&[account!(Trci), renew!(Trci, CORE)]),
    RuleDecl::new(Vfg, "Via Ferrata Guide Member", "via_ferrata_guide")
        .eligible(&[account!(Vfg), renew!(Vfg, CORE)]),
];

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A resolved rule for one certificate kind.
#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    pub kind: CertificateKind,
    pub label: &'static str,
    pub slug: &'static str,
    pub supervises: BTreeSet<CertificateKind>,
    pub supersedes: BTreeSet<CertificateKind>,
    /// Every other kind whose `supersedes` contains this one.
    pub superseded_by: BTreeSet<CertificateKind>,
    pub eligible: Vec<Eligibility>,
    pub winter_variant: Option<CertificateKind>,
    pub merged_into: Option<CertificateKind>,
    /// Row index in the declared table; breaks ties between same-day certificates.
    pub position: usize,
}

/// Something wrong with a rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleProblem {
    /// A kind that maps to a membership has no rule.
    MissingRule(CertificateKind),
    /// The same kind is declared more than once; the last row wins.
    DuplicateRule(CertificateKind),
    /// Kinds that supersede each other, directly or transitively.
    SupersedenceCycle(Vec<CertificateKind>),
    /// A referenced winter variant or merge target has no rule.
    DanglingReference {
        from: CertificateKind,
        to: CertificateKind,
    },
}

impl std::fmt::Display for RuleProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRule(kind) => write!(f, "no rule declared for {kind}"),
            Self::DuplicateRule(kind) => write!(f, "rule for {kind} declared more than once"),
            Self::SupersedenceCycle(kinds) => {
                let names: Vec<_> = kinds.iter().map(|k| k.code()).collect();
                write!(f, "supersedence cycle: {}", names.join(" -> "))
            }
            Self::DanglingReference { from, to } => {
                write!(f, "rule for {from} references {to}, which has no rule")
            }
        }
    }
}

/// Immutable lookup table from certificate kind to its resolved [`Rule`].
#[derive(Debug, Clone, Serialize)]
pub struct RuleRegistry {
    rules: BTreeMap<CertificateKind, Rule>,
    #[serde(skip)]
    duplicates: Vec<CertificateKind>,
}

impl RuleRegistry {
    /// The registry built from [`BUILTIN_RULES`].
    pub fn builtin() -> Self {
        Self::from_table(BUILTIN_RULES)
    }

    /// Build a registry from declared rows, deriving every `superseded_by` set.
    pub fn from_table(table: &[RuleDecl]) -> Self {
        let mut duplicates = Vec::new();
        let mut rules = BTreeMap::new();

        for (position, decl) in table.iter().enumerate() {
            let superseded_by = table
                .iter()
                .filter(|other| other.kind != decl.kind && other.supersedes.contains(&decl.kind))
                .map(|other| other.kind)
                .collect();

            let rule = Rule {
                kind: decl.kind,
                label: decl.label,
                slug: decl.slug,
                supervises: decl.supervises.iter().copied().collect(),
                supersedes: decl.supersedes.iter().copied().collect(),
                superseded_by,
                eligible: decl.eligible.to_vec(),
                winter_variant: decl.winter_variant,
                merged_into: decl.merged_into,
                position,
            };
            if rules.insert(decl.kind, rule).is_some() {
                duplicates.push(decl.kind);
            }
        }

        Self { rules, duplicates }
    }

    /// Look up the rule for a kind.
    pub fn get(&self, kind: CertificateKind) -> Option<&Rule> {
        self.rules.get(&kind)
    }

    /// Tier slug for a kind, if it has a rule.
    pub fn slug(&self, kind: CertificateKind) -> Option<&'static str> {
        self.get(kind).map(|r| r.slug)
    }

    /// Table position of a kind's rule; kinds without a rule sort last.
    pub fn position(&self, kind: CertificateKind) -> usize {
        self.get(kind).map_or(usize::MAX, |r| r.position)
    }

    /// Find the kind whose tier uses `slug`.
    pub fn kind_for_slug(&self, slug: &str) -> Option<CertificateKind> {
        self.rules.values().find(|r| r.slug == slug).map(|r| r.kind)
    }

    /// Rule for a tier slug (`"rock_guide"`) or a certificate code (`"RG"`).
    pub fn lookup(&self, name: &str) -> Option<&Rule> {
        let kind = self.kind_for_slug(name).or_else(|| name.parse().ok())?;
        self.get(kind)
    }

    /// All rules in kind order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The supersedence relation as a directed graph (edge `a -> b` when `a`
    /// supersedes `b`), with a lookup from kind to node.
    pub fn supersedence_graph(
        &self,
    ) -> (DiGraph<CertificateKind, ()>, HashMap<CertificateKind, NodeIndex>) {
        let mut graph = DiGraph::new();
        let nodes: HashMap<CertificateKind, NodeIndex> = self
            .rules
            .keys()
            .map(|&kind| (kind, graph.add_node(kind)))
            .collect();

        for rule in self.rules.values() {
            for target in &rule.supersedes {
                if let Some(&to) = nodes.get(target) {
                    graph.add_edge(nodes[&rule.kind], to, ());
                }
            }
        }
        (graph, nodes)
    }

    /// Check the table for configuration errors. An empty result means the
    /// registry is internally consistent.
    pub fn audit(&self) -> Vec<RuleProblem> {
        let mut problems: Vec<RuleProblem> = CertificateKind::ALL
            .iter()
            .filter(|k| k.has_membership() && !self.rules.contains_key(k))
            .map(|&k| RuleProblem::MissingRule(k))
            .collect();

        problems.extend(self.duplicates.iter().map(|&k| RuleProblem::DuplicateRule(k)));

        for rule in self.rules.values() {
            for to in rule.winter_variant.into_iter().chain(rule.merged_into) {
                if !self.rules.contains_key(&to) {
                    problems.push(RuleProblem::DanglingReference {
                        from: rule.kind,
                        to,
                    });
                }
            }
        }

        let (graph, _) = self.supersedence_graph();
        for component in tarjan_scc(&graph) {
            let is_self_loop = component.len() == 1
                && graph.contains_edge(component[0], component[0]);
            if component.len() > 1 || is_self_loop {
                let mut kinds: Vec<_> = component.iter().map(|&n| graph[n]).collect();
                kinds.sort();
                problems.push(RuleProblem::SupersedenceCycle(kinds));
            }
        }

        problems
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
