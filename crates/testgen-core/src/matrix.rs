//! Matrix generation: structural filtering of an inventory.
//!
//! Every provider in the inventory becomes a [`Candidate`]; candidates that
//! belong to a selected provider class and satisfy every requirement path
//! form the [`EligibleSet`]. Exclusion is the expected outcome for providers
//! an administrator did not configure for a test, so it is logged and never
//! reported as an error.

use core::fmt;
use serde::Serialize;

use crate::capability::Resolution;
use crate::provider::{Inventory, ProviderRecord};
use crate::requirement::{RequirementPath, RequirementSet};
use crate::selector::ProviderSelector;

/// Why a candidate was left out of the eligible set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Exclusion {
    /// The provider's category or type was not selected
    ProviderClass,
    /// A requirement path did not resolve to a truthy value
    Unmet {
        /// The first path that failed
        path: RequirementPath,
        /// Human-readable cause
        detail: String,
    },
}

impl Exclusion {
    /// Builds an `Unmet` exclusion from a failed resolution.
    fn unmet(path: &RequirementPath, resolution: &Resolution<'_>) -> Self {
        let segments = path.segments();
        let detail = match resolution {
            Resolution::Missing { depth } => {
                format!("missing key '{}'", segments.get(*depth).map_or("", String::as_str))
            }
            Resolution::NotAMap { depth, found } => format!(
                "'{}' is a {found}, not a map",
                segments.get(*depth).map_or("", String::as_str)
            ),
            Resolution::Falsy(value) => format!("value is an empty or false {}", value.kind()),
            Resolution::Satisfied(_) => "satisfied".to_owned(),
        };
        Self::Unmet {
            path: path.clone(),
            detail,
        }
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderClass => formatter.write_str("provider class not selected"),
            Self::Unmet { path, detail } => write!(formatter, "{path}: {detail}"),
        }
    }
}

/// One inventory provider together with its eligibility verdict.
#[derive(Debug, Clone)]
pub struct Candidate<'inv> {
    /// Position in the inventory
    pub index: usize,
    /// The provider record
    pub provider: &'inv ProviderRecord,
    /// Why the provider was excluded, `None` if eligible
    pub exclusion: Option<Exclusion>,
}

impl Candidate<'_> {
    /// Whether the provider passed every check.
    pub fn satisfied(&self) -> bool {
        self.exclusion.is_none()
    }
}

/// Every inventory provider in inventory order, each exactly once.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet<'inv> {
    candidates: Vec<Candidate<'inv>>,
}

impl<'inv> CandidateSet<'inv> {
    /// All candidates in inventory order.
    pub fn candidates(&self) -> &[Candidate<'inv>] {
        &self.candidates
    }

    /// Number of candidates (equals the inventory size).
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether the inventory was empty.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates that were excluded.
    pub fn excluded(&self) -> impl Iterator<Item = &Candidate<'inv>> {
        self.candidates.iter().filter(|candidate| !candidate.satisfied())
    }

    /// The satisfied subset, order preserved.
    pub fn eligible(&self) -> EligibleSet<'inv> {
        EligibleSet {
            providers: self
                .candidates
                .iter()
                .filter(|candidate| candidate.satisfied())
                .map(|candidate| candidate.provider)
                .collect(),
        }
    }
}

/// Providers that satisfied every requirement, in inventory order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EligibleSet<'inv> {
    providers: Vec<&'inv ProviderRecord>,
}

impl<'inv> EligibleSet<'inv> {
    /// The eligible providers.
    pub fn providers(&self) -> &[&'inv ProviderRecord] {
        &self.providers
    }

    /// Number of eligible providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is eligible.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names in order.
    pub fn names(&self) -> Vec<&'inv str> {
        self.providers.iter().map(|provider| provider.name.as_str()).collect()
    }
}

/// Eligible providers with a parallel list of report identifiers.
///
/// The two lists always have the same length and are kept in step by every
/// operation on the matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix<'inv> {
    eligible: EligibleSet<'inv>,
    ids: Vec<String>,
}

impl<'inv> Matrix<'inv> {
    /// Builds a matrix whose identifiers are the provider names.
    pub fn from_eligible(eligible: EligibleSet<'inv>) -> Self {
        let ids = eligible
            .providers
            .iter()
            .map(|provider| provider.name.clone())
            .collect();
        Self { eligible, ids }
    }

    /// The eligible set.
    pub fn eligible(&self) -> &EligibleSet<'inv> {
        &self.eligible
    }

    /// Identifiers, parallel to [`Matrix::eligible`].
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterates `(provider, id)` rows.
    pub fn rows(&self) -> impl Iterator<Item = (&'inv ProviderRecord, &str)> {
        self.eligible
            .providers
            .iter()
            .copied()
            .zip(self.ids.iter().map(String::as_str))
    }

    /// Keeps only rows whose provider passes `keep`, preserving order.
    #[must_use]
    pub fn retain<F>(self, mut keep: F) -> Self
    where
        F: FnMut(&ProviderRecord) -> bool,
    {
        let (providers, ids) = self
            .eligible
            .providers
            .into_iter()
            .zip(self.ids)
            .filter(|(provider, _)| keep(provider))
            .unzip();
        Self {
            eligible: EligibleSet { providers },
            ids,
        }
    }
}

/// Cross-references an inventory against a provider selector and a set of
/// requirement paths.
#[derive(Debug, Clone, Default)]
pub struct MatrixGenerator {
    requirements: RequirementSet,
    selector: ProviderSelector,
}

impl MatrixGenerator {
    /// Creates a generator for the given requirements, selecting any class.
    pub fn new(requirements: RequirementSet) -> Self {
        Self {
            requirements,
            selector: ProviderSelector::any(),
        }
    }

    /// Restricts generation to the selected provider classes.
    #[must_use]
    pub fn with_selector(mut self, selector: ProviderSelector) -> Self {
        self.selector = selector;
        self
    }

    /// The requirement paths checked by this generator.
    pub fn requirements(&self) -> &RequirementSet {
        &self.requirements
    }

    /// Judges a single provider.
    pub fn judge(&self, provider: &ProviderRecord) -> Option<Exclusion> {
        if !self.selector.matches(provider) {
            return Some(Exclusion::ProviderClass);
        }
        self.requirements.paths().iter().find_map(|path| {
            provider
                .unmet(path)
                .map(|resolution| Exclusion::unmet(path, &resolution))
        })
    }

    /// Evaluates every provider of the inventory, in order.
    pub fn candidates<'inv>(&self, inventory: &'inv Inventory) -> CandidateSet<'inv> {
        let candidates = inventory
            .providers
            .iter()
            .enumerate()
            .map(|(index, provider)| {
                let exclusion = self.judge(provider);
                if let Some(reason) = &exclusion {
                    tracing::debug!(
                        provider = %provider.name,
                        index,
                        "excluding provider: {reason}"
                    );
                }
                Candidate {
                    index,
                    provider,
                    exclusion,
                }
            })
            .collect();
        CandidateSet { candidates }
    }

    /// Produces the eligible providers and their identifiers.
    pub fn generate<'inv>(&self, inventory: &'inv Inventory) -> Matrix<'inv> {
        let candidates = self.candidates(inventory);
        let matrix = Matrix::from_eligible(candidates.eligible());
        tracing::debug!(
            inventory = inventory.len(),
            eligible = matrix.len(),
            selector = %self.selector.description(),
            "generated provider matrix"
        );
        matrix
    }
}

/// Filters `inventory` down to providers satisfying every path in
/// `requirements`.
pub fn generate_matrix<'inv>(
    inventory: &'inv Inventory,
    requirements: &RequirementSet,
) -> Matrix<'inv> {
    MatrixGenerator::new(requirements.clone()).generate(inventory)
}
