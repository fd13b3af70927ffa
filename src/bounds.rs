//! Document categories and their pixel bounds.
//!
//! Every upload declares one of a fixed set of categories. Each category maps
//! to a bounding box the normalized image must fit:
//!
//! | Category | Minimum (w×h) | Maximum (w×h) |
//! |---|---|---|
//! | `portrait-photo` | 276×355 | 551×709 |
//! | `signature` | 354×108 | 945×287 |
//! | `company-logo` | 315×127 | 945×382 |
//!
//! The table is built once through [`BoundsTable::new`], which rejects any
//! entry whose minimum exceeds its maximum, and is read-only afterwards.

use crate::imaging::Dimensions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BoundsError {
    #[error("{category}: minimum {min} exceeds maximum {max}")]
    MinExceedsMax {
        category: Category,
        min: Dimensions,
        max: Dimensions,
    },
    #[error("{category}: bounds must be non-zero")]
    ZeroBound { category: Category },
    #[error("{category}: listed more than once")]
    Duplicate { category: Category },
    #[error("{category}: missing from bounds table")]
    Missing { category: Category },
}

/// A document class an upload can be normalized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    PortraitPhoto,
    Signature,
    CompanyLogo,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::PortraitPhoto,
        Category::Signature,
        Category::CompanyLogo,
    ];

    /// Canonical label, as accepted on the command line and shown in output.
    pub fn label(self) -> &'static str {
        match self {
            Category::PortraitPhoto => "portrait-photo",
            Category::Signature => "signature",
            Category::CompanyLogo => "company-logo",
        }
    }

    /// Label used on the Dutch application forms.
    pub fn dutch_label(self) -> &'static str {
        match self {
            Category::PortraitPhoto => "pasfoto",
            Category::Signature => "handtekening",
            Category::CompanyLogo => "bedrijfslogo",
        }
    }

    /// The fixed bounds for this category.
    pub const fn standard_bounds(self) -> BoundsSpec {
        match self {
            Category::PortraitPhoto => BoundsSpec::new((276, 355), (551, 709)),
            Category::Signature => BoundsSpec::new((354, 108), (945, 287)),
            Category::CompanyLogo => BoundsSpec::new((315, 127), (945, 382)),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a label names no known category.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Accepts the canonical label or the Dutch form label, ignoring case and
    /// surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| {
                needle.eq_ignore_ascii_case(c.label()) || needle.eq_ignore_ascii_case(c.dutch_label())
            })
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Minimum and maximum pixel dimensions for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundsSpec {
    pub min: Dimensions,
    pub max: Dimensions,
}

impl BoundsSpec {
    pub const fn new(min: (u32, u32), max: (u32, u32)) -> Self {
        Self {
            min: Dimensions::new(min.0, min.1),
            max: Dimensions::new(max.0, max.1),
        }
    }

    /// True when `dims` lies inside the box on both axes.
    pub fn contains(&self, dims: Dimensions) -> bool {
        self.meets_minimum(dims) && dims.width <= self.max.width && dims.height <= self.max.height
    }

    /// True when `dims` reaches the minimum on both axes.
    pub fn meets_minimum(&self, dims: Dimensions) -> bool {
        dims.width >= self.min.width && dims.height >= self.min.height
    }

    fn check(&self, category: Category) -> Result<(), BoundsError> {
        if self.min.width == 0 || self.min.height == 0 {
            return Err(BoundsError::ZeroBound { category });
        }
        if self.min.width > self.max.width || self.min.height > self.max.height {
            return Err(BoundsError::MinExceedsMax {
                category,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Immutable mapping from every [`Category`] to its [`BoundsSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundsTable {
    specs: [BoundsSpec; 3],
}

impl BoundsTable {
    /// Build a table, checking each entry once.
    ///
    /// Every category must appear exactly once with non-zero bounds and
    /// `min <= max` on both axes.
    pub fn new(entries: [(Category, BoundsSpec); 3]) -> Result<Self, BoundsError> {
        let mut slots: [Option<BoundsSpec>; 3] = [None; 3];
        for (category, spec) in entries {
            spec.check(category)?;
            let slot = &mut slots[category as usize];
            if slot.is_some() {
                return Err(BoundsError::Duplicate { category });
            }
            *slot = Some(spec);
        }

        let mut specs = [BoundsSpec::new((1, 1), (1, 1)); 3];
        for category in Category::ALL {
            specs[category as usize] =
                slots[category as usize].ok_or(BoundsError::Missing { category })?;
        }
        Ok(Self { specs })
    }

    /// The standard table used on the application forms.
    pub fn standard() -> Result<Self, BoundsError> {
        Self::new(Category::ALL.map(|c| (c, c.standard_bounds())))
    }

    pub fn get(&self, category: Category) -> BoundsSpec {
        self.specs[category as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, BoundsSpec)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_is_valid() {
        let table = BoundsTable::standard().unwrap();
        for (category, spec) in table.iter() {
            assert!(spec.min.width <= spec.max.width, "{category} width");
            assert!(spec.min.height <= spec.max.height, "{category} height");
        }
    }

    #[test]
    fn standard_table_values() {
        let table = BoundsTable::standard().unwrap();
        assert_eq!(
            table.get(Category::PortraitPhoto),
            BoundsSpec::new((276, 355), (551, 709))
        );
        assert_eq!(
            table.get(Category::Signature),
            BoundsSpec::new((354, 108), (945, 287))
        );
        assert_eq!(
            table.get(Category::CompanyLogo),
            BoundsSpec::new((315, 127), (945, 382))
        );
    }

    #[test]
    fn table_rejects_inverted_bounds() {
        let mut entries = Category::ALL.map(|c| (c, c.standard_bounds()));
        entries[1].1 = BoundsSpec::new((500, 100), (400, 200));
        let err = BoundsTable::new(entries).unwrap_err();
        assert!(matches!(
            err,
            BoundsError::MinExceedsMax {
                category: Category::Signature,
                ..
            }
        ));
    }

    #[test]
    fn table_rejects_zero_minimum() {
        let mut entries = Category::ALL.map(|c| (c, c.standard_bounds()));
        entries[0].1 = BoundsSpec::new((0, 355), (551, 709));
        assert_eq!(
            BoundsTable::new(entries).unwrap_err(),
            BoundsError::ZeroBound {
                category: Category::PortraitPhoto
            }
        );
    }

    #[test]
    fn table_rejects_duplicate_category() {
        let mut entries = Category::ALL.map(|c| (c, c.standard_bounds()));
        entries[2].0 = Category::Signature;
        assert_eq!(
            BoundsTable::new(entries).unwrap_err(),
            BoundsError::Duplicate {
                category: Category::Signature
            }
        );
    }

    #[test]
    fn parse_canonical_labels() {
        assert_eq!("portrait-photo".parse::<Category>(), Ok(Category::PortraitPhoto));
        assert_eq!("signature".parse::<Category>(), Ok(Category::Signature));
        assert_eq!("company-logo".parse::<Category>(), Ok(Category::CompanyLogo));
    }

    #[test]
    fn parse_dutch_labels_and_case() {
        assert_eq!("pasfoto".parse::<Category>(), Ok(Category::PortraitPhoto));
        assert_eq!(" Handtekening ".parse::<Category>(), Ok(Category::Signature));
        assert_eq!("BEDRIJFSLOGO".parse::<Category>(), Ok(Category::CompanyLogo));
    }

    #[test]
    fn parse_unknown_label_fails() {
        assert_eq!(
            "id-card".parse::<Category>(),
            Err(UnknownCategory("id-card".into()))
        );
    }

    #[test]
    fn display_matches_label() {
        for category in Category::ALL {
            assert_eq!(category.to_string(), category.label());
        }
    }

    #[test]
    fn contains_checks_both_ends() {
        let spec = Category::PortraitPhoto.standard_bounds();
        assert!(spec.contains(Dimensions::new(276, 355)));
        assert!(spec.contains(Dimensions::new(551, 709)));
        assert!(!spec.contains(Dimensions::new(275, 400)));
        assert!(!spec.contains(Dimensions::new(400, 710)));
    }
}
