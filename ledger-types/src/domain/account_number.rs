//! Checksummed account number generation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::account::AccountType;
use crate::error::DomainError;

/// Total digits: 2 type-prefix digits + 18 random digits + 2 check digits.
pub const ACCOUNT_NUMBER_LEN: usize = 22;
const BASE_LEN: usize = 20;

/// A fixed-length numeric account identifier with embedded check digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Generates a new account number from the injected random source.
    ///
    /// Uniqueness against existing numbers is the store's concern; callers
    /// retry on collision.
    pub fn generate<R: Rng>(account_type: AccountType, rng: &mut R) -> Self {
        let mut digits = Vec::with_capacity(ACCOUNT_NUMBER_LEN);
        for b in account_type.number_prefix().bytes() {
            digits.push(b - b'0');
        }
        while digits.len() < BASE_LEN {
            digits.push(rng.random_range(0..10u8));
        }
        let check = check_digits(&digits);
        digits.extend_from_slice(&check);
        Self(digits.iter().map(|d| char::from(b'0' + d)).collect())
    }

    /// Validates length, digits, and both check digits.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        if s.len() != ACCOUNT_NUMBER_LEN || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::InvalidAccountNumber(s.to_string()));
        }
        let digits: Vec<u8> = s.bytes().map(|b| b - b'0').collect();
        let expected = check_digits(&digits[..BASE_LEN]);
        if [digits[BASE_LEN], digits[BASE_LEN + 1]] != expected {
            return Err(DomainError::InvalidAccountNumber(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountNumber> for String {
    fn from(value: AccountNumber) -> Self {
        value.0
    }
}

/// Two check digits over the 20 base digits.
///
/// The first is a Luhn check digit: every second digit from the right is
/// doubled, digits above 9 reduced by 9, and the check digit completes the
/// sum to a multiple of 10. The doubling map is a permutation of 0..=9, so
/// any single-digit substitution in the base changes this digit. The second
/// is a position-weighted sum mod 10 over the base, left to right.
fn check_digits(base: &[u8]) -> [u8; 2] {
    let mut luhn = 0u32;
    for (i, &d) in base.iter().rev().enumerate() {
        let mut v = u32::from(d);
        if i % 2 == 0 {
            v *= 2;
            if v > 9 {
                v -= 9;
            }
        }
        luhn += v;
    }
    let c1 = ((10 - luhn % 10) % 10) as u8;

    let weighted: u32 = base
        .iter()
        .enumerate()
        .map(|(i, &d)| (i as u32 + 1) * u32::from(d))
        .sum();
    [c1, (weighted % 10) as u8]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_generated_number_has_type_prefix() {
        let mut rng = StdRng::seed_from_u64(1);
        let checking = AccountNumber::generate(AccountType::Checking, &mut rng);
        let savings = AccountNumber::generate(AccountType::Savings, &mut rng);
        assert!(checking.as_str().starts_with("10"));
        assert!(savings.as_str().starts_with("20"));
        assert_eq!(checking.as_str().len(), ACCOUNT_NUMBER_LEN);
    }

    #[test]
    fn test_generation_is_deterministic_under_a_seed() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        assert_eq!(
            AccountNumber::generate(AccountType::Checking, &mut a),
            AccountNumber::generate(AccountType::Checking, &mut b)
        );
    }

    #[test]
    fn test_generated_numbers_parse_back() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let number = AccountNumber::generate(AccountType::Savings, &mut rng);
            assert_eq!(AccountNumber::parse(number.as_str()).unwrap(), number);
        }
    }

    #[test]
    fn test_every_single_digit_substitution_is_detected() {
        let mut rng = StdRng::seed_from_u64(3);
        let number = AccountNumber::generate(AccountType::Checking, &mut rng);
        let original = number.as_str().as_bytes();

        for pos in 0..ACCOUNT_NUMBER_LEN {
            for replacement in b'0'..=b'9' {
                if original[pos] == replacement {
                    continue;
                }
                let mut mutated = original.to_vec();
                mutated[pos] = replacement;
                let mutated = String::from_utf8(mutated).unwrap();
                assert!(
                    AccountNumber::parse(&mutated).is_err(),
                    "substitution at {pos} went undetected: {mutated}"
                );
            }
        }
    }

    #[test]
    fn test_malformed_numbers_rejected() {
        assert!(AccountNumber::parse("12345").is_err());
        assert!(AccountNumber::parse("10A4567890123456789012").is_err());
    }

    #[test]
    fn test_serde_validates_checksum() {
        let mut rng = StdRng::seed_from_u64(4);
        let number = AccountNumber::generate(AccountType::FixedDeposit, &mut rng);
        let json = serde_json::to_string(&number).unwrap();
        let back: AccountNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, number);
        assert!(serde_json::from_str::<AccountNumber>("\"1000000000000000000000\"").is_err());
    }
}
