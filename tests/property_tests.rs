use phashstore::fingerprint::codec::{decode, encode, IDENTIFIER_LEN};
use phashstore::index::DedupIndex;
use phashstore::sampler::{Sampler, SamplerConfig};
use phashstore::{Fingerprint, Identifier};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_codec_roundtrip(value in any::<u64>()) {
        prop_assert_eq!(decode(&encode(value)).unwrap(), value);
    }

    #[test]
    fn test_encode_fixed_width_printable(value in any::<u64>()) {
        let encoded = encode(value);
        prop_assert_eq!(encoded.chars().count(), IDENTIFIER_LEN);
        for c in encoded.chars() {
            prop_assert!(!c.is_control());
            prop_assert!(!c.is_whitespace());
            prop_assert!(!matches!(c, '/' | '\\' | '.' | ':'));
        }
    }

    #[test]
    fn test_encode_injective(a in any::<u64>(), b in any::<u64>()) {
        prop_assert_eq!(a == b, encode(a) == encode(b));
    }

    #[test]
    fn test_distance_symmetric(a in any::<u64>(), b in any::<u64>()) {
        let (fa, fb) = (Fingerprint::new(a), Fingerprint::new(b));
        prop_assert_eq!(fa.distance(fb), fb.distance(fa));
        prop_assert!(fa.distance(fb) <= 64);
    }

    #[test]
    fn test_exists_independent_of_insertion_order(
        values in prop::collection::vec(any::<u64>(), 1..30),
        candidate in any::<u64>(),
    ) {
        let forward = DedupIndex::new();
        let backward = DedupIndex::new();
        for v in &values {
            forward.insert(&Fingerprint::new(*v).to_identifier()).unwrap();
        }
        for v in values.iter().rev() {
            backward.insert(&Fingerprint::new(*v).to_identifier()).unwrap();
        }

        for v in values.iter().chain(std::iter::once(&candidate)) {
            let id = Fingerprint::new(*v).to_identifier();
            let first = forward.exists(id.as_str()).unwrap();
            prop_assert_eq!(first, backward.exists(id.as_str()).unwrap());
            // Repeated reads without writes agree
            prop_assert_eq!(first, forward.exists(id.as_str()).unwrap());
        }
    }

    #[test]
    fn test_pick_never_returns_excluded(
        total in 1usize..60,
        exclude_mask in prop::collection::vec(any::<bool>(), 60),
        ratio in 1usize..12,
        seed in any::<u64>(),
    ) {
        let all: Vec<Identifier> = (0..total as u64)
            .map(|v| Fingerprint::new(v << 8).to_identifier())
            .collect();
        let exclude: Vec<Identifier> = all
            .iter()
            .zip(&exclude_mask)
            .filter(|(_, &skip)| skip)
            .map(|(id, _)| id.clone())
            .collect();

        let sampler = Sampler::new(SamplerConfig {
            rejection_ratio: ratio,
            max_rejections: 16,
            seed: Some(seed),
        });
        let picked = sampler.pick_from(&all, &exclude);

        if exclude.len() >= all.len() {
            prop_assert!(picked.is_none());
        } else {
            let picked = picked.unwrap();
            prop_assert!(!exclude.contains(&picked));
            prop_assert!(all.contains(&picked));
        }
    }
}
