use std::{
    collections::HashSet,
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUILTIN_ARCHETYPE_CATALOG: &str = include_str!("data/archetype_catalog.json");

/// Interest sets are stored as a 64-bit mask, which bounds catalog width.
pub const MAX_INTERESTS: usize = u64::BITS as usize;
/// Largest catalog addressable by [`ArchetypeId`].
pub const MAX_ARCHETYPES: usize = u16::MAX as usize + 1;

pub const DEFAULT_LADDER_BONUSES: [f64; 16] = [
    0.60, 0.56, 0.55, 0.54, 0.53, 0.52, 0.51, 0.50, 0.49, 0.48, 0.45, 0.43, 0.42, 0.41, 0.20, 0.05,
];

/// Dense index of an archetype in catalog declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchetypeId(pub u16);

impl ArchetypeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Set of interest indices packed into a single word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterestSet(u64);

impl InterestSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        let mut set = Self::empty();
        for idx in indices {
            set.insert(idx);
        }
        set
    }

    /// Builds a set from a 0/1 vector; any non-zero entry counts as owned.
    pub fn from_vector(vector: &[u8]) -> Self {
        Self::from_indices(
            vector
                .iter()
                .enumerate()
                .filter(|(_, bit)| **bit != 0)
                .map(|(idx, _)| idx),
        )
    }

    pub fn insert(&mut self, idx: usize) {
        if idx < MAX_INTERESTS {
            self.0 |= 1u64 << idx;
        }
    }

    pub fn contains(self, idx: usize) -> bool {
        idx < MAX_INTERESTS && self.0 & (1u64 << idx) != 0
    }

    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of interests owned by both sets.
    #[inline]
    pub fn shared_with(self, other: InterestSet) -> usize {
        (self.0 & other.0).count_ones() as usize
    }

    #[inline]
    pub fn union_len(self, other: InterestSet) -> usize {
        (self.0 | other.0).count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..MAX_INTERESTS).filter(move |idx| self.contains(*idx))
    }

    pub fn to_vector(self, width: usize) -> Vec<u8> {
        (0..width).map(|idx| u8::from(self.contains(idx))).collect()
    }
}

/// Rank-indexed multipliers applied to alignment percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LadderBonuses(Vec<f64>);

impl Default for LadderBonuses {
    fn default() -> Self {
        Self(DEFAULT_LADDER_BONUSES.to_vec())
    }
}

impl LadderBonuses {
    pub fn new(values: Vec<f64>) -> Result<Self, CatalogError> {
        if values.is_empty() {
            return Err(CatalogError::EmptyLadder);
        }
        if let Some((index, value)) = values
            .iter()
            .enumerate()
            .find(|(_, value)| !value.is_finite() || **value < 0.0)
        {
            return Err(CatalogError::InvalidBonus {
                index,
                value: *value,
            });
        }
        Ok(Self(values))
    }

    /// Bonus for a zero-based table index; indices past the end reuse the last entry.
    pub fn at_index(&self, index: usize) -> f64 {
        match self.0.get(index) {
            Some(value) => *value,
            None => self.0.last().copied().unwrap_or(0.0),
        }
    }

    /// Bonus for a 1-based rank.
    pub fn bonus_for_rank(&self, rank: usize) -> f64 {
        self.at_index(rank.saturating_sub(1))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchetypeDefinition {
    pub name: String,
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ArchetypeCatalogFile {
    interests: Vec<String>,
    archetypes: Vec<ArchetypeDefinition>,
    #[serde(default = "default_ladder_bonuses")]
    ladder_bonuses: Vec<f64>,
}

fn default_ladder_bonuses() -> Vec<f64> {
    DEFAULT_LADDER_BONUSES.to_vec()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Archetype {
    pub id: ArchetypeId,
    pub name: String,
    pub interests: InterestSet,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse archetype catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read archetype catalog from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("archetype catalog declares no interests")]
    NoInterests,
    #[error("archetype catalog declares {count} interests; at most {limit} are supported")]
    TooManyInterests { count: usize, limit: usize },
    #[error("interest `{0}` is declared more than once")]
    DuplicateInterest(String),
    #[error("archetype catalog declares no archetypes")]
    NoArchetypes,
    #[error("archetype catalog declares {count} archetypes; at most {limit} are supported")]
    TooManyArchetypes { count: usize, limit: usize },
    #[error("archetype `{0}` is declared more than once")]
    DuplicateArchetype(String),
    #[error("archetype `{archetype}` references unknown interest `{interest}`")]
    UnknownInterest { archetype: String, interest: String },
    #[error("ladder bonus table is empty")]
    EmptyLadder,
    #[error("ladder bonus at index {index} is invalid: {value}")]
    InvalidBonus { index: usize, value: f64 },
}

/// Immutable interest vocabulary, archetype vectors and ladder table.
///
/// Built once and shared as `Arc<ArchetypeCatalog>`; nothing mutates it after
/// validation.
#[derive(Debug, Clone)]
pub struct ArchetypeCatalog {
    interests: Vec<String>,
    archetypes: Vec<Archetype>,
    ladder: LadderBonuses,
}

impl ArchetypeCatalog {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            Self::from_json_str(BUILTIN_ARCHETYPE_CATALOG)
                .expect("builtin archetype catalog should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: ArchetypeCatalogFile = serde_json::from_str(json)?;
        Self::new(
            file.interests,
            file.archetypes,
            LadderBonuses::new(file.ladder_bonuses)?,
        )
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn new(
        interests: Vec<String>,
        definitions: Vec<ArchetypeDefinition>,
        ladder: LadderBonuses,
    ) -> Result<Self, CatalogError> {
        if interests.is_empty() {
            return Err(CatalogError::NoInterests);
        }
        if interests.len() > MAX_INTERESTS {
            return Err(CatalogError::TooManyInterests {
                count: interests.len(),
                limit: MAX_INTERESTS,
            });
        }
        let mut seen = HashSet::with_capacity(interests.len());
        for interest in &interests {
            if !seen.insert(interest.as_str()) {
                return Err(CatalogError::DuplicateInterest(interest.clone()));
            }
        }
        if definitions.is_empty() {
            return Err(CatalogError::NoArchetypes);
        }
        if definitions.len() > MAX_ARCHETYPES {
            return Err(CatalogError::TooManyArchetypes {
                count: definitions.len(),
                limit: MAX_ARCHETYPES,
            });
        }

        let mut names = HashSet::with_capacity(definitions.len());
        let mut archetypes = Vec::with_capacity(definitions.len());
        for (idx, definition) in definitions.into_iter().enumerate() {
            if !names.insert(definition.name.clone()) {
                return Err(CatalogError::DuplicateArchetype(definition.name));
            }
            let mut owned = InterestSet::empty();
            for interest in &definition.interests {
                let position = interests
                    .iter()
                    .position(|candidate| candidate == interest)
                    .ok_or_else(|| CatalogError::UnknownInterest {
                        archetype: definition.name.clone(),
                        interest: interest.clone(),
                    })?;
                owned.insert(position);
            }
            archetypes.push(Archetype {
                id: ArchetypeId(idx as u16),
                name: definition.name,
                interests: owned,
            });
        }

        Ok(Self {
            interests,
            archetypes,
            ladder,
        })
    }

    pub fn interests(&self) -> &[String] {
        &self.interests
    }

    pub fn interest_count(&self) -> usize {
        self.interests.len()
    }

    pub fn interest_index(&self, name: &str) -> Option<usize> {
        self.interests.iter().position(|interest| interest == name)
    }

    /// Resolves interest names into a set; unknown names are skipped.
    pub fn interest_set<'a, I>(&self, names: I) -> InterestSet
    where
        I: IntoIterator<Item = &'a str>,
    {
        InterestSet::from_indices(names.into_iter().filter_map(|name| self.interest_index(name)))
    }

    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    pub fn ids(&self) -> impl Iterator<Item = ArchetypeId> + '_ {
        self.archetypes.iter().map(|archetype| archetype.id)
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id.index())
    }

    pub fn name(&self, id: ArchetypeId) -> &str {
        self.archetype(id)
            .map_or("unknown", |archetype| archetype.name.as_str())
    }

    pub fn find(&self, name: &str) -> Option<ArchetypeId> {
        self.archetypes
            .iter()
            .find(|archetype| archetype.name == name)
            .map(|archetype| archetype.id)
    }

    pub fn ladder(&self) -> &LadderBonuses {
        &self.ladder
    }

    /// Returns a copy of the catalog using a different ladder table.
    pub fn with_ladder(&self, ladder: LadderBonuses) -> Self {
        Self {
            interests: self.interests.clone(),
            archetypes: self.archetypes.clone(),
            ladder,
        }
    }

    /// Jaccard similarity of two archetypes' interest sets.
    pub fn jaccard_similarity(&self, a: ArchetypeId, b: ArchetypeId) -> f64 {
        let (Some(left), Some(right)) = (self.archetype(a), self.archetype(b)) else {
            return 0.0;
        };
        let union = left.interests.union_len(right.interests);
        if union == 0 {
            return 0.0;
        }
        left.interests.shared_with(right.interests) as f64 / union as f64
    }

    pub fn similarity_matrix(&self) -> Vec<Vec<f64>> {
        self.ids()
            .map(|a| self.ids().map(|b| self.jaccard_similarity(a, b)).collect())
            .collect()
    }
}

pub fn load_archetype_catalog_from_env() -> Arc<ArchetypeCatalog> {
    let Some(path) = env::var("ARCHETYPE_CATALOG_PATH").ok().map(PathBuf::from) else {
        return ArchetypeCatalog::builtin();
    };

    match ArchetypeCatalog::from_file(&path) {
        Ok(catalog) => Arc::new(catalog),
        Err(err) => {
            tracing::warn!(
                target: "archetype_sim::catalog",
                path = %path.display(),
                error = %err,
                "archetype_catalog.load_failed"
            );
            ArchetypeCatalog::builtin()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(name: &str, interests: &[&str]) -> ArchetypeDefinition {
        ArchetypeDefinition {
            name: name.to_string(),
            interests: interests.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn builtin_catalog_has_expected_shape() {
        let catalog = ArchetypeCatalog::builtin();
        assert_eq!(catalog.interest_count(), 52);
        assert_eq!(catalog.len(), 16);
        assert_eq!(catalog.ladder().len(), 16);
        assert_eq!(catalog.ladder().as_slice(), &DEFAULT_LADDER_BONUSES);

        let captain = catalog.find("Grid Captain").expect("grid captain declared");
        assert_eq!(captain, ArchetypeId(2));
        let archetype = catalog.archetype(captain).unwrap();
        assert_eq!(archetype.interests.len(), 14);
        assert!(archetype
            .interests
            .contains(catalog.interest_index("entrepreneurship").unwrap()));
    }

    #[test]
    fn ladder_clamps_past_the_table() {
        let ladder = LadderBonuses::default();
        assert_eq!(ladder.bonus_for_rank(1), 0.60);
        assert_eq!(ladder.bonus_for_rank(16), 0.05);
        assert_eq!(ladder.bonus_for_rank(17), 0.05);
        assert_eq!(ladder.at_index(400), 0.05);
    }

    #[test]
    fn ladder_rejects_empty_and_negative_tables() {
        assert!(matches!(
            LadderBonuses::new(Vec::new()),
            Err(CatalogError::EmptyLadder)
        ));
        assert!(matches!(
            LadderBonuses::new(vec![0.5, -0.1]),
            Err(CatalogError::InvalidBonus { index: 1, .. })
        ));
    }

    #[test]
    fn malformed_catalogs_fail_validation() {
        let interests = vec!["a".to_string(), "b".to_string()];
        let unknown = ArchetypeCatalog::new(
            interests.clone(),
            vec![definition("First", &["a", "z"])],
            LadderBonuses::default(),
        );
        assert!(matches!(
            unknown,
            Err(CatalogError::UnknownInterest { ref interest, .. }) if interest == "z"
        ));

        let duplicate = ArchetypeCatalog::new(
            interests.clone(),
            vec![definition("First", &["a"]), definition("First", &["b"])],
            LadderBonuses::default(),
        );
        assert!(matches!(duplicate, Err(CatalogError::DuplicateArchetype(_))));

        let empty = ArchetypeCatalog::new(interests, Vec::new(), LadderBonuses::default());
        assert!(matches!(empty, Err(CatalogError::NoArchetypes)));

        let too_wide: Vec<String> = (0..65).map(|i| format!("interest_{i}")).collect();
        let wide = ArchetypeCatalog::new(
            too_wide,
            vec![definition("Solo", &[])],
            LadderBonuses::default(),
        );
        assert!(matches!(
            wide,
            Err(CatalogError::TooManyInterests { count: 65, .. })
        ));
    }

    #[test]
    fn archetype_count_is_bounded_by_id_width() {
        let interests = vec!["a".to_string()];
        let crowded: Vec<ArchetypeDefinition> = (0..=MAX_ARCHETYPES)
            .map(|idx| definition(&format!("Archetype {idx}"), &[]))
            .collect();
        let result = ArchetypeCatalog::new(interests.clone(), crowded, LadderBonuses::default());
        assert!(matches!(
            result,
            Err(CatalogError::TooManyArchetypes { count, limit: MAX_ARCHETYPES })
                if count == MAX_ARCHETYPES + 1
        ));

        let full: Vec<ArchetypeDefinition> = (0..MAX_ARCHETYPES)
            .map(|idx| definition(&format!("Archetype {idx}"), &["a"]))
            .collect();
        let catalog = ArchetypeCatalog::new(interests, full, LadderBonuses::default()).unwrap();
        assert_eq!(catalog.len(), MAX_ARCHETYPES);
        assert_eq!(catalog.ids().last(), Some(ArchetypeId(u16::MAX)));
    }

    #[test]
    fn ladder_override_keeps_vocabulary() {
        let catalog = ArchetypeCatalog::builtin();
        let flat = LadderBonuses::new(vec![1.0]).unwrap();
        let reweighted = catalog.with_ladder(flat);
        assert_eq!(reweighted.interests(), catalog.interests());
        assert_eq!(reweighted.len(), catalog.len());
        assert_eq!(reweighted.ladder().bonus_for_rank(1), 1.0);
        assert_eq!(reweighted.ladder().bonus_for_rank(16), 1.0);
        assert_eq!(catalog.ladder().bonus_for_rank(1), 0.60);
    }

    #[test]
    fn jaccard_similarity_is_reflexive_and_bounded() {
        let catalog = ArchetypeCatalog::builtin();
        let matrix = catalog.similarity_matrix();
        assert_eq!(matrix.len(), 16);
        for (idx, row) in matrix.iter().enumerate() {
            assert_eq!(row[idx], 1.0);
            assert!(row.iter().all(|value| (0.0..=1.0).contains(value)));
        }
        let weaver = catalog.find("System Weaver").unwrap();
        let drifter = catalog.find("Data Drifter").unwrap();
        // 8 shared interests out of 18 distinct ones.
        let similarity = catalog.jaccard_similarity(weaver, drifter);
        assert!((similarity - 8.0 / 18.0).abs() < 1e-12);
    }

    #[test]
    fn interest_set_round_trips_vectors() {
        let set = InterestSet::from_indices([0, 3, 51]);
        let vector = set.to_vector(52);
        assert_eq!(vector.len(), 52);
        assert_eq!(vector.iter().filter(|bit| **bit == 1).count(), 3);
        assert_eq!(InterestSet::from_vector(&vector), set);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 3, 51]);
    }
}
