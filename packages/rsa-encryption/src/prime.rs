use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, ToPrimitive};
use rand::thread_rng;

const FERMAT_ROUNDS: usize = 5;
const MILLER_RABIN_ROUNDS: usize = 25;

/// Returns `true` if the input unsigned integer is probably prime.
///
/// Composites are filtered in increasing order of cost: trial division by
/// every prime below 1000, then a few Fermat rounds, then Miller-Rabin.
///
/// # Examples
///
/// ```
/// # extern crate num_bigint;
/// # fn main() {
/// use num_bigint::BigUint;
/// use rsa_encryption::prime;
///
/// assert_eq!(prime::is_probably_prime(&BigUint::from(128usize)), false);
/// assert_eq!(prime::is_probably_prime(&BigUint::from(2969usize)), true);
/// # }
/// ```
pub fn is_probably_prime(n: &BigUint) -> bool {
    match n.to_usize() {
        Some(small) if small < 1000 => SMALL_PRIMES.contains(&small),
        _ => {
            if divides_by_small_prime(n) {
                false
            } else {
                fermat_primality_test(FERMAT_ROUNDS, n)
                    && miller_rabin_primality_test(MILLER_RABIN_ROUNDS, n)
            }
        }
    }
}

/// Returns `true` if a prime below 1000 divides `n` without being `n` itself.
fn divides_by_small_prime(n: &BigUint) -> bool {
    SMALL_PRIMES
        .iter()
        .map(|&prime| BigUint::from(prime))
        .filter(|prime| prime.lt(n))
        .any(|prime| n.is_multiple_of(&prime))
}

/// Fermat primality test.
///
/// # Assumptions
///
/// `n` is an odd integer `> 3` and `iterations > 0`.
///
/// # Reference
///
/// See algorithm 4.9 in "Handbook of Applied Cryptography" by Alfred J. Menezes et al.
fn fermat_primality_test(iterations: usize, n: &BigUint) -> bool {
    let mut rng = thread_rng();

    let low = BigUint::from(2usize);
    let high = n - BigUint::one();

    for _ in 0..iterations {
        let a = rng.gen_biguint_range(&low, &high);
        if !a.modpow(&high, n).is_one() {
            return false;
        }
    }

    true
}

/// Miller-Rabin probabilistic primality test.
///
/// Writes `n - 1 = 2^s * d` with `d` odd and checks each random base
/// against the square chain.
///
/// # Assumptions
///
/// `n` is an odd integer `> 3` and `iterations > 0`.
///
/// # Reference
///
/// See algorithm 4.24 in "Handbook of Applied Cryptography" by Alfred J. Menezes et al.
fn miller_rabin_primality_test(iterations: usize, n: &BigUint) -> bool {
    let mut rng = thread_rng();

    let one = BigUint::one();
    let two = BigUint::from(2usize);
    let n_minus_one = n - &one;

    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'witness: for _ in 0..iterations {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut y = a.modpow(&d, n);

        if y.is_one() || y == n_minus_one {
            continue;
        }

        for _ in 1..s {
            y = y.modpow(&two, n);
            if y == n_minus_one {
                continue 'witness;
            }
        }

        return false;
    }

    true
}

/// Generates a random prime number of the given bit size.
///
/// The candidate starts from a random odd number with its two most
/// significant bits set (so a product of two such primes keeps its full
/// width) and walks upward in steps of two.
///
/// # Assumptions
///
/// `bit_size > 1`.
///
/// # Panics
///
/// Panics if `bit_size < 2`.
pub fn generate_prime(bit_size: u64) -> BigUint {
    let two = BigUint::from(2usize);
    let mut candidate = generate_candidate(bit_size);

    if candidate.is_even() {
        candidate += BigUint::one();
    }

    while !is_probably_prime(&candidate) {
        candidate += &two;
    }

    candidate
}

/// Generates a random number of `bit_size` bits with the two most
/// significant bits set to 1.
fn generate_candidate(bit_size: u64) -> BigUint {
    let mut rng = thread_rng();

    let n = rng.gen_biguint(bit_size);
    let mask = BigUint::from(3usize) << (bit_size - 2);
    n | mask
}

const SMALL_PRIMES: [usize; 168] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199, 211, 223, 227, 229, 233, 239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293, 307,
    311, 313, 317, 331, 337, 347, 349, 353, 359, 367, 373, 379, 383, 389, 397, 401, 409, 419, 421,
    431, 433, 439, 443, 449, 457, 461, 463, 467, 479, 487, 491, 499, 503, 509, 521, 523, 541, 547,
    557, 563, 569, 571, 577, 587, 593, 599, 601, 607, 613, 617, 619, 631, 641, 643, 647, 653, 659,
    661, 673, 677, 683, 691, 701, 709, 719, 727, 733, 739, 743, 751, 757, 761, 769, 773, 787, 797,
    809, 811, 821, 823, 827, 829, 839, 853, 857, 859, 863, 877, 881, 883, 887, 907, 911, 919, 929,
    937, 941, 947, 953, 967, 971, 977, 983, 991, 997,
];

#[cfg(test)]
mod test {
    use super::*;
    use num_traits::Zero;
    use proptest::prelude::*;

    fn strategy_for_odd_integer(upper_bound: usize) -> impl Strategy<Value = (usize, bool)> {
        let sieve = primal::Sieve::new(upper_bound);
        (5..upper_bound)
            .prop_filter("is_odd", move |&n| n.is_odd())
            .prop_map(move |n| (n, sieve.is_prime(n)))
    }

    proptest! {
        #[test]
        fn test_is_probably_prime((n, is_prime) in strategy_for_odd_integer(1_000_000)) {
            prop_assert_eq!(is_probably_prime(&BigUint::from(n)), is_prime);
        }

        #[test]
        fn test_divides_by_small_prime(n in 3usize..1000) {
            prop_assert_eq!(divides_by_small_prime(&BigUint::from(n)), !SMALL_PRIMES.contains(&n));
        }

        #[test]
        fn test_miller_rabin_primality_test((n, is_prime) in strategy_for_odd_integer(1_000_000)) {
            prop_assert_eq!(miller_rabin_primality_test(25, &BigUint::from(n)), is_prime);
        }

        #[test]
        fn test_generate_prime(bit_size in 16u64..64) {
            let prime = generate_prime(bit_size);
            prop_assert_eq!(prime.bits(), bit_size);
            prop_assert_eq!(is_probably_prime(&prime), true);
        }

        #[test]
        fn test_generate_candidate(size in 5u64..512) {
            let shift = size - 2;
            let three = BigUint::from(3u64);
            let mask = &three << shift;

            let n = generate_candidate(size);
            let msb = (&n & &mask) >> shift;

            prop_assert_eq!(n.bits(), size);
            prop_assert_eq!(msb, three);
            prop_assert_eq!(n > BigUint::zero(), true);
        }
    }
}
