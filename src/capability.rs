// 🔐 Capability Table - Rules as Data
// Which animal types a caller of a given age and gender may borrow.
//
// One row per gender. Each row splits at an age threshold into a "young"
// mask and an "adult" mask. The whole rule set lives in one constant table
// so it can be audited (and tested) as a single artifact.

use crate::animals::{AnimalType, Gender};
use crate::lending::LendingError;

// ============================================================================
// MASK CONSTANTS
// ============================================================================

pub const FISH: u8 = 1 << 0;
pub const CAT: u8 = 1 << 1;
pub const DOG: u8 = 1 << 2;
pub const RABBIT: u8 = 1 << 3;
pub const PARROT: u8 = 1 << 4;

/// Every borrowable animal type
pub const ALL: u8 = FISH | CAT | DOG | RABBIT | PARROT;

// ============================================================================
// CAPABILITY ROW
// ============================================================================

/// One gender's capability rule.
///
/// Ages below `adult_threshold` use `young_mask`; ages at or above it use
/// `adult_mask`.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityRow {
    pub gender: Gender,
    pub adult_threshold: u8,
    pub young_mask: u8,
    pub adult_mask: u8,
    /// Message surfaced when an animal is not in the permitted mask
    pub denial: &'static str,
}

/// The capability table.
///
/// The male row keeps its threshold at the maximum representable age, so in
/// practice male callers always resolve to the young mask. Both male masks
/// are {Fish, Dog}, which keeps the boundary age (255) consistent with every
/// other age.
pub const CAPABILITY_TABLE: [CapabilityRow; 2] = [
    CapabilityRow {
        gender: Gender::Male,
        adult_threshold: u8::MAX,
        young_mask: FISH | DOG,
        adult_mask: FISH | DOG,
        denial: "invalid animal for men",
    },
    CapabilityRow {
        gender: Gender::Female,
        adult_threshold: 40,
        young_mask: FISH | DOG | RABBIT | PARROT,
        adult_mask: ALL,
        denial: "invalid animal for women under 40",
    },
];

// ============================================================================
// LOOKUP
// ============================================================================

fn row_for(gender: Gender) -> &'static CapabilityRow {
    CAPABILITY_TABLE
        .iter()
        .find(|row| row.gender == gender)
        .expect("capability table covers every gender")
}

/// Bitmask of animal types a caller with this profile may borrow.
///
/// The None sentinel carries no bit, so it is never in any mask.
pub fn permitted_mask(gender: Gender, age: u8) -> u8 {
    let row = row_for(gender);
    if age < row.adult_threshold {
        row.young_mask
    } else {
        row.adult_mask
    }
}

/// Check that the requested animal is permitted for this profile.
///
/// No side effects. Fails with the row's gender-specific denial message.
pub fn validate(age: u8, gender: Gender, animal: AnimalType) -> Result<(), LendingError> {
    let row = row_for(gender);
    let mask = permitted_mask(gender, age);

    if mask & animal.bit() == 0 {
        return Err(LendingError::IneligibleAnimal { reason: row.denial });
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animals::ALL_ANIMALS;

    #[test]
    fn test_none_never_permitted() {
        for gender in [Gender::Male, Gender::Female] {
            for age in 1..=u8::MAX {
                let mask = permitted_mask(gender, age);
                assert_eq!(mask & AnimalType::None.bit(), 0);
                // Only known animal bits may be set
                assert_eq!(mask & !ALL, 0);
            }
        }
    }

    #[test]
    fn test_male_only_fish_and_dog_at_any_age() {
        for age in 1..=u8::MAX {
            assert_eq!(permitted_mask(Gender::Male, age), FISH | DOG, "age {}", age);
        }

        assert!(validate(25, Gender::Male, AnimalType::Fish).is_ok());
        assert!(validate(25, Gender::Male, AnimalType::Dog).is_ok());
        for animal in [AnimalType::Cat, AnimalType::Rabbit, AnimalType::Parrot] {
            let err = validate(25, Gender::Male, animal).unwrap_err();
            assert_eq!(
                err,
                LendingError::IneligibleAnimal {
                    reason: "invalid animal for men"
                }
            );
        }
    }

    #[test]
    fn test_female_under_40_everything_but_cat() {
        for age in 1..40 {
            let mask = permitted_mask(Gender::Female, age);
            assert_eq!(mask, FISH | DOG | RABBIT | PARROT, "age {}", age);
        }

        for animal in [
            AnimalType::Fish,
            AnimalType::Dog,
            AnimalType::Rabbit,
            AnimalType::Parrot,
        ] {
            assert!(validate(20, Gender::Female, animal).is_ok());
        }

        let err = validate(39, Gender::Female, AnimalType::Cat).unwrap_err();
        assert_eq!(
            err,
            LendingError::IneligibleAnimal {
                reason: "invalid animal for women under 40"
            }
        );
    }

    #[test]
    fn test_female_40_and_over_all_animals() {
        for age in 40..=u8::MAX {
            assert_eq!(permitted_mask(Gender::Female, age), ALL, "age {}", age);
        }

        for animal in ALL_ANIMALS {
            assert!(validate(40, Gender::Female, animal).is_ok());
            assert!(validate(45, Gender::Female, animal).is_ok());
        }
    }

    #[test]
    fn test_validate_rejects_none_sentinel() {
        assert!(validate(30, Gender::Male, AnimalType::None).is_err());
        assert!(validate(50, Gender::Female, AnimalType::None).is_err());
    }
}
