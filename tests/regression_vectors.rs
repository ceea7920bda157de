use gsecm6::cm6::{self, DecodeOptions, DigitBudget, EncodeOptions};

#[derive(Debug)]
struct Vector {
    name: String,
    differences: u32,
    samples: Vec<i32>,
    cm6: Vec<u8>,
    checksum: u32,
}

fn parse_samples(s: &str) -> Vec<i32> {
    let s = s.trim();
    if s.is_empty() {
        return Vec::new();
    }
    s.split(',').map(|v| v.trim().parse().unwrap()).collect()
}

fn load_vectors() -> Vec<Vector> {
    let manifest = include_str!("vectors/manifest.tsv");
    manifest
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|line| {
            let parts: Vec<_> = line.split('|').collect();
            assert_eq!(parts.len(), 5, "invalid vector row: {line}");
            Vector {
                name: parts[0].to_string(),
                differences: parts[1].parse().unwrap(),
                samples: parse_samples(parts[2]),
                cm6: parts[3].as_bytes().to_vec(),
                checksum: parts[4].parse().unwrap(),
            }
        })
        .collect()
}

fn encode_opts(differences: u32) -> EncodeOptions {
    EncodeOptions {
        differences,
        ..Default::default()
    }
}

fn decode_opts(differences: u32) -> DecodeOptions {
    DecodeOptions {
        differences,
        ..Default::default()
    }
}

#[test]
fn vector_database_is_non_empty() {
    let vectors = load_vectors();
    assert!(!vectors.is_empty());
}

#[test]
fn encode_matches_all_vectors() {
    for v in load_vectors() {
        let encoded = cm6::encode(&v.samples, &encode_opts(v.differences)).unwrap();
        assert_eq!(
            String::from_utf8_lossy(&encoded),
            String::from_utf8_lossy(&v.cm6),
            "vector {}",
            v.name
        );
    }
}

#[test]
fn decode_matches_all_vectors() {
    for v in load_vectors() {
        let decoded = cm6::decode(&v.cm6, &decode_opts(v.differences)).unwrap();
        assert!(decoded.is_clean(), "vector {}: {:?}", v.name, decoded.warnings);
        assert_eq!(decoded.samples, v.samples, "vector {}", v.name);
    }
}

#[test]
fn checksum_matches_all_vectors() {
    for v in load_vectors() {
        assert_eq!(cm6::checksum(&v.samples), v.checksum, "vector {}", v.name);
        assert_eq!(cm6::verify(&v.samples, v.checksum), Ok(v.checksum));
    }
}

#[test]
fn gse_budget_agrees_within_29_bits() {
    for v in load_vectors() {
        let mut residuals = v.samples.clone();
        cm6::diff::apply(&mut residuals, v.differences);
        let fits = residuals.iter().all(|r| r.unsigned_abs() < 1 << 29);

        let gse = cm6::encode(&v.samples, &EncodeOptions {
            differences: v.differences,
            budget: DigitBudget::Gse,
        });
        match gse {
            Ok(encoded) => {
                assert!(fits, "vector {}", v.name);
                assert_eq!(encoded, v.cm6, "vector {}", v.name);
            }
            Err(e) => {
                assert!(!fits, "vector {}: {e}", v.name);
                assert!(matches!(e, cm6::EncodeError::MagnitudeOverflow { .. }));
            }
        }
    }
}

#[test]
fn exact_count_stops_early() {
    for v in load_vectors().into_iter().filter(|v| v.samples.len() > 2) {
        let decoded = cm6::decode(&v.cm6, &DecodeOptions {
            differences: v.differences,
            count: cm6::SampleCount::Exactly(2),
            ..Default::default()
        })
        .unwrap();
        assert!(decoded.is_clean(), "vector {}", v.name);
        assert_eq!(decoded.samples, v.samples[..2], "vector {}", v.name);
    }
}
