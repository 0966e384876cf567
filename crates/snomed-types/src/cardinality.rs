//! Cardinality constraints for template attributes and attribute groups.
//!
//! Template cardinalities are written `[[min..max]]` in authoring templates,
//! where `max` may be `*` and either bound may carry a `~` marker flagging
//! the slot as replaceable. The marker carries no meaning for matching and is
//! stripped on parse.
//!
//! # Examples
//!
//! ```
//! use snomed_types::Cardinality;
//!
//! let unbounded = Cardinality::parse("0..*").unwrap();
//! assert!(unbounded.satisfies(0));
//! assert!(unbounded.satisfies(1_000_000));
//!
//! let exact = Cardinality::parse("~1..1").unwrap();
//! assert_eq!(exact, Cardinality::required());
//! ```

/// Error type for cardinality parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardinalityParseError {
    /// Invalid format - expected "min..max"
    InvalidFormat(String),
    /// Invalid minimum value
    InvalidMin(String),
    /// Invalid maximum value
    InvalidMax(String),
    /// Minimum exceeds maximum
    MinExceedsMax(String),
}

impl std::fmt::Display for CardinalityParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat(s) => write!(f, "invalid cardinality format: '{}' (expected min..max)", s),
            Self::InvalidMin(s) => write!(f, "invalid cardinality minimum: '{}'", s),
            Self::InvalidMax(s) => write!(f, "invalid cardinality maximum: '{}'", s),
            Self::MinExceedsMax(s) => write!(f, "cardinality minimum exceeds maximum: '{}'", s),
        }
    }
}

impl std::error::Error for CardinalityParseError {}

/// A `[min..max]` occurrence range. `max == None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cardinality {
    /// Minimum occurrences (inclusive).
    pub min: u32,
    /// Maximum occurrences (inclusive). None means unbounded (*).
    pub max: Option<u32>,
}

impl Default for Cardinality {
    /// Attributes without an explicit cardinality are `1..1`.
    fn default() -> Self {
        Self::required()
    }
}

impl Cardinality {
    /// Creates a new cardinality with explicit min and max.
    pub const fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Creates an unbounded cardinality (0..*).
    pub const fn unbounded() -> Self {
        Self { min: 0, max: None }
    }

    /// Creates an optional cardinality (0..1).
    pub const fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Creates a required single cardinality (1..1).
    pub const fn required() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Creates a required unbounded cardinality (1..*).
    pub const fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// Parses a cardinality from a string like `"0..*"`, `"~1..1"` or `"[[0..1]]"`.
    ///
    /// `~` markers and surrounding brackets are removed before the bounds are
    /// read. An empty bound parses as 0.
    ///
    /// ```
    /// use snomed_types::Cardinality;
    ///
    /// assert_eq!(Cardinality::parse("0..*").unwrap(), Cardinality::unbounded());
    /// assert_eq!(Cardinality::parse("[[~0..1]]").unwrap(), Cardinality::optional());
    /// assert_eq!(Cardinality::parse("..1").unwrap(), Cardinality::optional());
    /// ```
    pub fn parse(s: &str) -> Result<Self, CardinalityParseError> {
        let cleaned: String = s
            .chars()
            .filter(|c| !matches!(c, '~' | '[' | ']') && !c.is_whitespace())
            .collect();

        let Some((min_part, max_part)) = cleaned.split_once("..") else {
            return Err(CardinalityParseError::InvalidFormat(s.to_string()));
        };

        let min = match parse_bound(min_part) {
            Some(Some(min)) => min,
            _ => return Err(CardinalityParseError::InvalidMin(min_part.to_string())),
        };

        let max = parse_bound(max_part)
            .ok_or_else(|| CardinalityParseError::InvalidMax(max_part.to_string()))?;

        if max.is_some_and(|max| min > max) {
            return Err(CardinalityParseError::MinExceedsMax(s.to_string()));
        }

        Ok(Self { min, max })
    }

    /// Returns true iff `min <= count <= max`.
    ///
    /// ```
    /// use snomed_types::Cardinality;
    ///
    /// let card = Cardinality::parse("1..1").unwrap();
    /// assert!(!card.satisfies(0));
    /// assert!(card.satisfies(1));
    /// assert!(!card.satisfies(2));
    /// ```
    pub fn satisfies(&self, count: usize) -> bool {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }

    /// Returns true if this cardinality is unbounded (max = *).
    pub fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }

    /// Returns true if zero occurrences are acceptable.
    pub fn is_optional(&self) -> bool {
        self.min == 0
    }
}

/// `None` = unparseable, `Some(None)` = unbounded.
fn parse_bound(bound: &str) -> Option<Option<u32>> {
    match bound {
        "*" => Some(None),
        "" => Some(Some(0)),
        digits => digits.parse::<u32>().ok().map(Some),
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..*", self.min),
        }
    }
}
