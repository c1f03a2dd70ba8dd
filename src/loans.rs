// 📖 Loan Tracker - At most one outstanding loan per identity
// A missing entry means "not borrowing". Loans are held until the same
// identity returns them voluntarily; there is no override or timeout.

use crate::animals::AnimalType;
use crate::lending::LendingError;
use std::collections::HashMap;

// ============================================================================
// LOAN BOOK
// ============================================================================

/// The currently borrowed animal per identity.
#[derive(Debug, Clone, Default)]
pub struct LoanBook {
    loans: HashMap<String, AnimalType>,
}

impl LoanBook {
    pub fn new() -> Self {
        LoanBook {
            loans: HashMap::new(),
        }
    }

    /// Rebuild a loan book from stored (identity, animal) rows
    pub fn from_loans(rows: impl IntoIterator<Item = (String, AnimalType)>) -> Self {
        LoanBook {
            loans: rows
                .into_iter()
                .filter(|(_, animal)| animal.is_borrowable())
                .collect(),
        }
    }

    /// The identity's outstanding loan (None if not borrowing)
    pub fn current_loan(&self, identity: &str) -> AnimalType {
        self.loans
            .get(identity)
            .copied()
            .unwrap_or(AnimalType::None)
    }

    /// Record a new loan. Fails if one is already outstanding.
    pub fn set_loan(&mut self, identity: &str, animal: AnimalType) -> Result<(), LendingError> {
        let current = self.current_loan(identity);
        if current != AnimalType::None {
            return Err(LendingError::AlreadyBorrowing { animal: current });
        }

        self.loans.insert(identity.to_string(), animal);
        Ok(())
    }

    /// Clear the identity's loan, returning the animal that was out.
    /// Fails if nothing is outstanding.
    pub fn clear_loan(&mut self, identity: &str) -> Result<AnimalType, LendingError> {
        match self.loans.remove(identity) {
            Some(animal) if animal.is_borrowable() => Ok(animal),
            _ => Err(LendingError::NothingBorrowed),
        }
    }

    /// Snapshot of all outstanding loans, sorted by identity
    pub fn loans(&self) -> Vec<(String, AnimalType)> {
        let mut rows: Vec<_> = self
            .loans
            .iter()
            .map(|(id, a)| (id.clone(), *a))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_loan_by_default() {
        let book = LoanBook::new();
        assert_eq!(book.current_loan("u1"), AnimalType::None);
    }

    #[test]
    fn test_set_and_clear_loan() {
        let mut book = LoanBook::new();
        book.set_loan("u1", AnimalType::Dog).unwrap();
        assert_eq!(book.current_loan("u1"), AnimalType::Dog);

        let cleared = book.clear_loan("u1").unwrap();
        assert_eq!(cleared, AnimalType::Dog);
        assert_eq!(book.current_loan("u1"), AnimalType::None);
    }

    #[test]
    fn test_second_loan_rejected() {
        let mut book = LoanBook::new();
        book.set_loan("u1", AnimalType::Dog).unwrap();

        let err = book.set_loan("u1", AnimalType::Fish).unwrap_err();
        assert_eq!(
            err,
            LendingError::AlreadyBorrowing {
                animal: AnimalType::Dog
            }
        );
        // Original loan untouched
        assert_eq!(book.current_loan("u1"), AnimalType::Dog);
    }

    #[test]
    fn test_clear_without_loan_fails() {
        let mut book = LoanBook::new();
        let err = book.clear_loan("u1").unwrap_err();
        assert_eq!(err, LendingError::NothingBorrowed);
    }

    #[test]
    fn test_loans_are_per_identity() {
        let mut book = LoanBook::new();
        book.set_loan("u1", AnimalType::Dog).unwrap();
        book.set_loan("u2", AnimalType::Fish).unwrap();

        assert_eq!(book.current_loan("u1"), AnimalType::Dog);
        assert_eq!(book.current_loan("u2"), AnimalType::Fish);

        book.clear_loan("u1").unwrap();
        assert_eq!(book.current_loan("u2"), AnimalType::Fish);
    }
}
