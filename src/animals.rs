// 🐾 Animal & Gender Types - Closed enumerations
// AnimalType::None is a sentinel meaning "not borrowing" and is never
// a valid stock or loan target.

use serde::{Deserialize, Serialize};

// ============================================================================
// ANIMAL TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimalType {
    /// Sentinel: no animal / not borrowing
    None,
    Fish,
    Cat,
    Dog,
    Rabbit,
    Parrot,
}

/// All borrowable animal types (excludes the None sentinel)
pub const ALL_ANIMALS: [AnimalType; 5] = [
    AnimalType::Fish,
    AnimalType::Cat,
    AnimalType::Dog,
    AnimalType::Rabbit,
    AnimalType::Parrot,
];

impl AnimalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimalType::None => "None",
            AnimalType::Fish => "Fish",
            AnimalType::Cat => "Cat",
            AnimalType::Dog => "Dog",
            AnimalType::Rabbit => "Rabbit",
            AnimalType::Parrot => "Parrot",
        }
    }

    /// Parse an animal name (case-insensitive)
    pub fn parse(s: &str) -> Option<AnimalType> {
        match s.trim().to_lowercase().as_str() {
            "none" => Some(AnimalType::None),
            "fish" => Some(AnimalType::Fish),
            "cat" => Some(AnimalType::Cat),
            "dog" => Some(AnimalType::Dog),
            "rabbit" => Some(AnimalType::Rabbit),
            "parrot" => Some(AnimalType::Parrot),
            _ => None,
        }
    }

    /// Bit assigned to this animal in capability masks.
    /// None carries no bit, so it can never appear in a permitted mask.
    pub fn bit(&self) -> u8 {
        match self {
            AnimalType::None => 0,
            AnimalType::Fish => 1 << 0,
            AnimalType::Cat => 1 << 1,
            AnimalType::Dog => 1 << 2,
            AnimalType::Rabbit => 1 << 3,
            AnimalType::Parrot => 1 << 4,
        }
    }

    /// True for every type except the None sentinel
    pub fn is_borrowable(&self) -> bool {
        *self != AnimalType::None
    }
}

impl std::fmt::Display for AnimalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// GENDER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    /// Parse a gender (case-insensitive, accepts "m"/"f" shorthands)
    pub fn parse(s: &str) -> Option<Gender> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Some(Gender::Male),
            "female" | "f" => Some(Gender::Female),
            _ => None,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TESTS
// ============================================================================
