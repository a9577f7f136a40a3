use serde::{Deserialize, Serialize};
use std::fmt;

/// Qualitative band of an ATMO grade, as shown on air-quality maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AtmoCategory {
    VeryGood, // 1-2
    Good,     // 3-4
    Moderate, // 5
    Poor,     // 6-7
    Bad,      // 8-9
    VeryBad,  // 10
}

impl AtmoCategory {
    pub const ALL: [AtmoCategory; 6] = [
        AtmoCategory::VeryGood,
        AtmoCategory::Good,
        AtmoCategory::Moderate,
        AtmoCategory::Poor,
        AtmoCategory::Bad,
        AtmoCategory::VeryBad,
    ];

    pub fn from_grade(grade: u8) -> Option<Self> {
        match grade {
            1 | 2 => Some(AtmoCategory::VeryGood),
            3 | 4 => Some(AtmoCategory::Good),
            5 => Some(AtmoCategory::Moderate),
            6 | 7 => Some(AtmoCategory::Poor),
            8 | 9 => Some(AtmoCategory::Bad),
            10 => Some(AtmoCategory::VeryBad),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AtmoCategory::VeryGood => "Very good",
            AtmoCategory::Good => "Good",
            AtmoCategory::Moderate => "Moderate",
            AtmoCategory::Poor => "Poor",
            AtmoCategory::Bad => "Bad",
            AtmoCategory::VeryBad => "Very bad",
        }
    }

    /// Map colour as a hex RGB string
    pub fn color(&self) -> &'static str {
        match self {
            AtmoCategory::VeryGood => "#50F0E6",
            AtmoCategory::Good => "#50CCAA",
            AtmoCategory::Moderate => "#F0E641",
            AtmoCategory::Poor => "#FF8000",
            AtmoCategory::Bad => "#FF0000",
            AtmoCategory::VeryBad => "#7D2181",
        }
    }
}

impl fmt::Display for AtmoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_bands() {
        let expected = [
            (1, AtmoCategory::VeryGood),
            (2, AtmoCategory::VeryGood),
            (3, AtmoCategory::Good),
            (4, AtmoCategory::Good),
            (5, AtmoCategory::Moderate),
            (6, AtmoCategory::Poor),
            (7, AtmoCategory::Poor),
            (8, AtmoCategory::Bad),
            (9, AtmoCategory::Bad),
            (10, AtmoCategory::VeryBad),
        ];
        for (grade, category) in expected {
            assert_eq!(AtmoCategory::from_grade(grade), Some(category), "grade {}", grade);
        }
    }

    #[test]
    fn test_out_of_range_grades() {
        assert_eq!(AtmoCategory::from_grade(0), None);
        assert_eq!(AtmoCategory::from_grade(11), None);
    }

    #[test]
    fn test_category_order_follows_severity() {
        assert!(AtmoCategory::VeryGood < AtmoCategory::VeryBad);
        assert_eq!(AtmoCategory::Poor.color(), "#FF8000");
    }
}
