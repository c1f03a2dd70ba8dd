// ⚖️ Lending Engine - Borrow/return state machine
// Composes the inventory ledger, profile registry, and loan book into
// atomic transitions. Every check runs before any mutation, so a rejected
// call leaves all state untouched.

use crate::animals::{AnimalType, Gender};
use crate::capability;
use crate::inventory::InventoryLedger;
use crate::loans::LoanBook;
use crate::registry::{ProfileRegistry, UserProfile};

// ============================================================================
// ERRORS
// ============================================================================

/// Rejection reasons for lending operations.
///
/// Every rejection is synchronous and leaves inventory, profiles, and loans
/// exactly as they were.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LendingError {
    /// Caller is not the administrator
    Unauthorized,
    /// The None sentinel was passed where a real animal is required
    InvalidAnimal,
    /// Age zero is not a valid profile
    InvalidAge,
    /// No stock left for the requested animal type
    OutOfStock { animal: AnimalType },
    /// The identity already holds a loan
    AlreadyBorrowing { animal: AnimalType },
    /// The presented (age, gender) differs from the bound profile
    ProfileMismatch,
    /// The capability table does not permit this animal for this profile
    IneligibleAnimal { reason: &'static str },
    /// Return requested with no outstanding loan
    NothingBorrowed,
}

impl std::fmt::Display for LendingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LendingError::Unauthorized => write!(f, "caller is not the administrator"),
            LendingError::InvalidAnimal => write!(f, "not a valid animal type"),
            LendingError::InvalidAge => write!(f, "age must be greater than zero"),
            LendingError::OutOfStock { animal } => write!(f, "no {} available", animal),
            LendingError::AlreadyBorrowing { animal } => {
                write!(f, "already borrowing a {}", animal)
            }
            LendingError::ProfileMismatch => {
                write!(f, "age or gender does not match the registered profile")
            }
            LendingError::IneligibleAnimal { reason } => write!(f, "{}", reason),
            LendingError::NothingBorrowed => write!(f, "no animal currently borrowed"),
        }
    }
}

impl std::error::Error for LendingError {}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

/// One notification per successful transition, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Added { animal: AnimalType, count: u64 },
    Borrowed { animal: AnimalType },
    Returned { animal: AnimalType },
}

impl Notification {
    pub fn event_type(&self) -> &'static str {
        match self {
            Notification::Added { .. } => "added",
            Notification::Borrowed { .. } => "borrowed",
            Notification::Returned { .. } => "returned",
        }
    }

    pub fn animal(&self) -> AnimalType {
        match self {
            Notification::Added { animal, .. }
            | Notification::Borrowed { animal }
            | Notification::Returned { animal } => *animal,
        }
    }
}

// ============================================================================
// LENDING ENGINE
// ============================================================================

/// The aggregate lending state: administrator identity plus the three
/// mutable sub-tables. The engine is the only writer of all three.
///
/// Each public transition is a single critical section. Callers that serve
/// concurrent requests must serialize whole calls (the CLI holds the
/// database exclusively; the server wraps the store in one mutex).
#[derive(Debug, Clone)]
pub struct LendingEngine {
    admin: String,
    inventory: InventoryLedger,
    profiles: ProfileRegistry,
    loans: LoanBook,
}

impl LendingEngine {
    /// Fresh engine with empty state. `admin` is the single fixed
    /// administrator identity, recorded once at creation.
    pub fn new(admin: impl Into<String>) -> Self {
        LendingEngine {
            admin: admin.into(),
            inventory: InventoryLedger::new(),
            profiles: ProfileRegistry::new(),
            loans: LoanBook::new(),
        }
    }

    /// Rehydrate an engine from stored state
    pub fn from_parts(
        admin: String,
        inventory: InventoryLedger,
        profiles: ProfileRegistry,
        loans: LoanBook,
    ) -> Self {
        LendingEngine {
            admin,
            inventory,
            profiles,
            loans,
        }
    }

    pub fn admin(&self) -> &str {
        &self.admin
    }

    pub fn inventory(&self) -> &InventoryLedger {
        &self.inventory
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    pub fn loans(&self) -> &LoanBook {
        &self.loans
    }

    /// Available stock for an animal type (None trivially 0)
    pub fn available_count(&self, animal: AnimalType) -> u64 {
        self.inventory.available(animal)
    }

    // ========================================================================
    // TRANSITIONS
    // ========================================================================

    /// Administrator stocking: increase an animal's count.
    ///
    /// Rejects non-administrator callers before anything else, then the
    /// None sentinel. No upper bound on counts.
    pub fn add(
        &mut self,
        caller: &str,
        animal: AnimalType,
        count: u64,
    ) -> Result<Notification, LendingError> {
        if caller != self.admin {
            return Err(LendingError::Unauthorized);
        }

        self.inventory.add(animal, count)?;
        Ok(Notification::Added { animal, count })
    }

    /// Borrow one animal for the calling identity.
    ///
    /// Check order is part of the observable contract:
    ///   1. animal is the None sentinel
    ///   2. age is zero
    ///   3. nothing in stock
    ///   4. identity already borrowing
    ///   5. presented profile differs from the bound one
    ///   6. capability table denies the animal
    /// Mutations (inventory decrement, loan record, first-borrow profile
    /// binding) happen only after every check has passed.
    pub fn borrow(
        &mut self,
        identity: &str,
        age: u8,
        gender: Gender,
        animal: AnimalType,
    ) -> Result<Notification, LendingError> {
        if animal == AnimalType::None {
            return Err(LendingError::InvalidAnimal);
        }
        if age == 0 {
            return Err(LendingError::InvalidAge);
        }
        if self.inventory.available(animal) == 0 {
            return Err(LendingError::OutOfStock { animal });
        }
        let current = self.loans.current_loan(identity);
        if current != AnimalType::None {
            return Err(LendingError::AlreadyBorrowing { animal: current });
        }

        let profile = UserProfile::new(age, gender);
        self.profiles.check(identity, profile)?;
        capability::validate(age, gender, animal)?;

        // Commit: all checks passed
        self.inventory.decrement(animal)?;
        self.loans.set_loan(identity, animal)?;
        self.profiles.bind(identity, profile);

        Ok(Notification::Borrowed { animal })
    }

    /// Return the calling identity's outstanding loan.
    pub fn return_animal(&mut self, identity: &str) -> Result<Notification, LendingError> {
        let animal = self.loans.clear_loan(identity)?;
        self.inventory.increment(animal);

        Ok(Notification::Returned { animal })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: &str = "admin";

    fn stocked_engine() -> LendingEngine {
        let mut engine = LendingEngine::new(ADMIN);
        engine.add(ADMIN, AnimalType::Dog, 2).unwrap();
        engine.add(ADMIN, AnimalType::Fish, 2).unwrap();
        engine.add(ADMIN, AnimalType::Cat, 1).unwrap();
        engine
    }

    #[test]
    fn test_add_emits_notification() {
        let mut engine = LendingEngine::new(ADMIN);
        let note = engine.add(ADMIN, AnimalType::Dog, 5).unwrap();
        assert_eq!(
            note,
            Notification::Added {
                animal: AnimalType::Dog,
                count: 5
            }
        );
        assert_eq!(engine.available_count(AnimalType::Dog), 5);
    }

    #[test]
    fn test_add_unauthorized_leaves_inventory_unchanged() {
        let mut engine = LendingEngine::new(ADMIN);
        let err = engine.add("mallory", AnimalType::Dog, 5).unwrap_err();
        assert_eq!(err, LendingError::Unauthorized);
        assert_eq!(engine.available_count(AnimalType::Dog), 0);
    }

    #[test]
    fn test_add_none_rejected() {
        let mut engine = LendingEngine::new(ADMIN);
        let err = engine.add(ADMIN, AnimalType::None, 1).unwrap_err();
        assert_eq!(err, LendingError::InvalidAnimal);
    }

    #[test]
    fn test_borrow_happy_path() {
        let mut engine = stocked_engine();
        let note = engine.borrow("u1", 25, Gender::Male, AnimalType::Dog).unwrap();
        assert_eq!(
            note,
            Notification::Borrowed {
                animal: AnimalType::Dog
            }
        );
        assert_eq!(engine.available_count(AnimalType::Dog), 1);
        assert_eq!(engine.loans().current_loan("u1"), AnimalType::Dog);
        assert_eq!(
            engine.profiles().get("u1"),
            Some(UserProfile::new(25, Gender::Male))
        );
    }

    #[test]
    fn test_borrow_none_rejected_first() {
        let mut engine = LendingEngine::new(ADMIN);
        // Age is also invalid; the sentinel check wins
        let err = engine
            .borrow("u1", 0, Gender::Male, AnimalType::None)
            .unwrap_err();
        assert_eq!(err, LendingError::InvalidAnimal);
    }

    #[test]
    fn test_borrow_zero_age_rejected_before_stock_check() {
        let mut engine = LendingEngine::new(ADMIN);
        // Nothing is stocked either; the age check comes first
        let err = engine
            .borrow("u1", 0, Gender::Male, AnimalType::Dog)
            .unwrap_err();
        assert_eq!(err, LendingError::InvalidAge);
    }

    #[test]
    fn test_borrow_out_of_stock() {
        let mut engine = stocked_engine();
        engine.borrow("u1", 20, Gender::Male, AnimalType::Dog).unwrap();
        engine.borrow("u2", 22, Gender::Male, AnimalType::Dog).unwrap();
        assert_eq!(engine.available_count(AnimalType::Dog), 0);

        let err = engine
            .borrow("u3", 24, Gender::Male, AnimalType::Dog)
            .unwrap_err();
        assert_eq!(
            err,
            LendingError::OutOfStock {
                animal: AnimalType::Dog
            }
        );
    }

    #[test]
    fn test_already_borrowing_checked_before_profile() {
        let mut engine = stocked_engine();
        engine.borrow("u1", 30, Gender::Male, AnimalType::Dog).unwrap();

        // Mismatched age AND outstanding loan: the loan check wins
        let err = engine
            .borrow("u1", 31, Gender::Male, AnimalType::Fish)
            .unwrap_err();
        assert_eq!(
            err,
            LendingError::AlreadyBorrowing {
                animal: AnimalType::Dog
            }
        );
    }

    #[test]
    fn test_profile_mismatch_after_return() {
        let mut engine = stocked_engine();
        engine.borrow("u1", 30, Gender::Male, AnimalType::Dog).unwrap();
        engine.return_animal("u1").unwrap();

        let err = engine
            .borrow("u1", 31, Gender::Male, AnimalType::Dog)
            .unwrap_err();
        assert_eq!(err, LendingError::ProfileMismatch);

        let err = engine
            .borrow("u1", 30, Gender::Female, AnimalType::Dog)
            .unwrap_err();
        assert_eq!(err, LendingError::ProfileMismatch);

        // The exact original pair still works
        assert!(engine.borrow("u1", 30, Gender::Male, AnimalType::Dog).is_ok());
    }

    #[test]
    fn test_eligibility_rejection_binds_no_profile() {
        let mut engine = stocked_engine();

        let err = engine
            .borrow("u1", 20, Gender::Female, AnimalType::Cat)
            .unwrap_err();
        assert_eq!(
            err,
            LendingError::IneligibleAnimal {
                reason: "invalid animal for women under 40"
            }
        );
        // Rejection left no profile behind, so a corrected age succeeds
        assert_eq!(engine.profiles().get("u1"), None);
        assert_eq!(engine.available_count(AnimalType::Cat), 1);

        assert!(engine.borrow("u1", 45, Gender::Female, AnimalType::Cat).is_ok());
        assert_eq!(engine.available_count(AnimalType::Cat), 0);
    }

    #[test]
    fn test_male_cannot_borrow_cat() {
        let mut engine = stocked_engine();
        let err = engine
            .borrow("u1", 50, Gender::Male, AnimalType::Cat)
            .unwrap_err();
        assert_eq!(
            err,
            LendingError::IneligibleAnimal {
                reason: "invalid animal for men"
            }
        );
    }

    #[test]
    fn test_borrow_return_roundtrip() {
        let mut engine = stocked_engine();
        let before = engine.available_count(AnimalType::Dog);

        engine.borrow("u1", 25, Gender::Male, AnimalType::Dog).unwrap();
        let note = engine.return_animal("u1").unwrap();
        assert_eq!(
            note,
            Notification::Returned {
                animal: AnimalType::Dog
            }
        );

        assert_eq!(engine.available_count(AnimalType::Dog), before);
        assert_eq!(engine.loans().current_loan("u1"), AnimalType::None);

        // The identity can borrow again
        assert!(engine.borrow("u1", 25, Gender::Male, AnimalType::Dog).is_ok());
    }

    #[test]
    fn test_return_without_loan_fails_cleanly() {
        let mut engine = stocked_engine();
        let before = engine.available_count(AnimalType::Dog);

        let err = engine.return_animal("u1").unwrap_err();
        assert_eq!(err, LendingError::NothingBorrowed);
        assert_eq!(engine.available_count(AnimalType::Dog), before);
    }

    #[test]
    fn test_available_count_none_is_zero() {
        let engine = stocked_engine();
        assert_eq!(engine.available_count(AnimalType::None), 0);
    }

    #[test]
    fn test_stock_one_two_borrowers() {
        let mut engine = LendingEngine::new(ADMIN);
        engine.add(ADMIN, AnimalType::Dog, 1).unwrap();

        engine.borrow("u", 20, Gender::Male, AnimalType::Dog).unwrap();
        assert_eq!(engine.available_count(AnimalType::Dog), 0);

        let err = engine
            .borrow("v", 22, Gender::Male, AnimalType::Dog)
            .unwrap_err();
        assert_eq!(
            err,
            LendingError::OutOfStock {
                animal: AnimalType::Dog
            }
        );
    }

    #[test]
    fn test_rejected_borrow_leaves_all_state_unchanged() {
        let mut engine = stocked_engine();
        engine.borrow("u1", 25, Gender::Male, AnimalType::Dog).unwrap();

        let inventory_before = engine.inventory().counts();
        let profiles_before = engine.profiles().profiles();
        let loans_before = engine.loans().loans();

        // Each rejection kind in turn
        assert!(engine.borrow("u2", 25, Gender::Male, AnimalType::None).is_err());
        assert!(engine.borrow("u2", 0, Gender::Male, AnimalType::Dog).is_err());
        assert!(engine.borrow("u2", 25, Gender::Male, AnimalType::Rabbit).is_err());
        assert!(engine.borrow("u1", 25, Gender::Male, AnimalType::Dog).is_err());
        assert!(engine.borrow("u2", 25, Gender::Male, AnimalType::Cat).is_err());
        assert!(engine.return_animal("u2").is_err());

        assert_eq!(engine.inventory().counts(), inventory_before);
        assert_eq!(engine.profiles().profiles(), profiles_before);
        assert_eq!(engine.loans().loans(), loans_before);
    }
}
