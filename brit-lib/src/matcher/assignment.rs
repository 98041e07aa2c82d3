//! Address pool assignment.

use sha2::{Digest, Sha256};

use super::MatcherError;
use crate::address::{BitcoinAddress, BitcoinNetwork};
use crate::identity::WalletIdentity;

const BUCKET_DOMAIN: &[u8] = b"brit-matcher-bucket-v1";

/// Smallest bucket the assigner will hand out when the pool allows it.
pub const MIN_BUCKET_SIZE: usize = 2;

/// Chooses the addresses a new identity is served.
pub trait AddressAssigner: Send + Sync {
    /// Addresses for `identity`. Must be non-empty and stable for the same
    /// identity while the assigner's configuration is unchanged.
    fn assign(&self, identity: &WalletIdentity) -> Result<Vec<BitcoinAddress>, MatcherError>;
}

/// Consistent hashing of identities into fixed buckets of a configured pool.
///
/// The pool is cut into `pool.len() / bucket_size` buckets; the last bucket
/// absorbs the remainder, so no bucket is smaller than `bucket_size` unless the
/// whole pool is.
///
/// # Example
///
/// ```
/// use brit_lib::matcher::{AddressAssigner, BucketAssigner};
/// use brit_lib::{BitcoinAddress, WalletIdentity};
///
/// let pool: Vec<BitcoinAddress> = [
///     "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
///     "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2",
///     "12c6DSiU4Rq3P4ZxziKxzrGxvLN6ZeN28",
///     "1dice8EMZmqKvrGE4Qc9bUFf9PX3xaYDp",
/// ]
/// .iter()
/// .map(|s| BitcoinAddress::parse_any(s).unwrap())
/// .collect();
///
/// let assigner = BucketAssigner::new(pool, 2).unwrap();
/// let identity = WalletIdentity::derive(b"seed").unwrap();
/// assert_eq!(assigner.assign(&identity).unwrap().len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct BucketAssigner {
    pool: Vec<BitcoinAddress>,
    bucket_size: usize,
}

impl BucketAssigner {
    pub fn new(pool: Vec<BitcoinAddress>, bucket_size: usize) -> Result<Self, MatcherError> {
        if pool.is_empty() {
            return Err(MatcherError::EmptyPool);
        }
        if bucket_size < MIN_BUCKET_SIZE {
            return Err(MatcherError::Config(format!(
                "bucket size {} is below {}",
                bucket_size, MIN_BUCKET_SIZE
            )));
        }
        Ok(Self { pool, bucket_size })
    }

    /// Parse one address per line, skipping blank lines and `#` comments.
    pub fn from_lines(
        text: &str,
        network: BitcoinNetwork,
        bucket_size: usize,
    ) -> Result<Self, MatcherError> {
        let pool = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                BitcoinAddress::parse(line, network)
                    .map_err(|e| MatcherError::Config(format!("pool address {}: {}", line, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(pool, bucket_size)
    }

    pub fn bucket_count(&self) -> usize {
        (self.pool.len() / self.bucket_size).max(1)
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    fn bucket_index(&self, identity: &WalletIdentity) -> usize {
        let mut hasher = Sha256::new();
        hasher.update(BUCKET_DOMAIN);
        hasher.update(identity.as_bytes());
        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(head) % self.bucket_count() as u64) as usize
    }
}

impl AddressAssigner for BucketAssigner {
    fn assign(&self, identity: &WalletIdentity) -> Result<Vec<BitcoinAddress>, MatcherError> {
        let buckets = self.bucket_count();
        let index = self.bucket_index(identity);
        let start = index * self.bucket_size;
        let end = if index + 1 == buckets {
            self.pool.len()
        } else {
            start + self.bucket_size
        };
        let bucket = self.pool.get(start..end).ok_or(MatcherError::EmptyPool)?;
        Ok(bucket.to_vec())
    }
}
