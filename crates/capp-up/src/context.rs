//! Execution context passed to every resolver and executor step

use crate::naming;
use capp_cloud::{ArmClient, SourceHost};
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Where the shared suffix of synthesized names comes from
#[derive(Debug)]
pub enum SuffixSource {
    /// Uniform in `[0, 9999)`
    Random,
    /// Values handed out in order, the last one repeating
    Sequence { values: Vec<u16>, next: AtomicUsize },
}

impl SuffixSource {
    pub fn fixed(value: u16) -> Self {
        Self::sequence(vec![value])
    }

    pub fn sequence(values: Vec<u16>) -> Self {
        SuffixSource::Sequence {
            values,
            next: AtomicUsize::new(0),
        }
    }

    pub fn next_suffix(&self) -> u16 {
        match self {
            SuffixSource::Random => rand::thread_rng().gen_range(0..9999),
            SuffixSource::Sequence { values, next } => {
                let i = next.fetch_add(1, Ordering::Relaxed);
                values
                    .get(i)
                    .or_else(|| values.last())
                    .copied()
                    .unwrap_or_default()
            }
        }
    }
}

pub struct UpContext {
    pub arm: Arc<dyn ArmClient>,
    pub source_host: Arc<dyn SourceHost>,
    pub subscription_id: String,
    /// Prefix for synthesized resource names
    pub user_name: String,
    /// Region for new resource groups when none is given
    pub default_location: Option<String>,
    pub suffixes: SuffixSource,
}

impl UpContext {
    pub fn new(
        arm: Arc<dyn ArmClient>,
        source_host: Arc<dyn SourceHost>,
        subscription_id: impl Into<String>,
        account_user: &str,
    ) -> Self {
        Self {
            arm,
            source_host,
            subscription_id: subscription_id.into(),
            user_name: naming::profile_user_name(account_user),
            default_location: None,
            suffixes: SuffixSource::Random,
        }
    }

    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = user_name.into();
        self
    }

    pub fn with_default_location(mut self, location: Option<String>) -> Self {
        self.default_location = location.map(|l| naming::format_location(&l));
        self
    }

    pub fn with_suffixes(mut self, suffixes: SuffixSource) -> Self {
        self.suffixes = suffixes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_repeats_last_value() {
        let source = SuffixSource::sequence(vec![1, 2]);
        assert_eq!(source.next_suffix(), 1);
        assert_eq!(source.next_suffix(), 2);
        assert_eq!(source.next_suffix(), 2);
    }

    #[test]
    fn test_random_suffix_in_range() {
        for _ in 0..100 {
            assert!(SuffixSource::Random.next_suffix() < 9999);
        }
    }
}
