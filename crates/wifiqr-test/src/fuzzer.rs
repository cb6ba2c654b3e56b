//! Payload Fuzzer - Seeded mutation of `WIFI:` payloads
//!
//! Checks on every generated input:
//! - Parsing never panics and is deterministic
//! - A parsed credential always has a non-empty SSID
//! - A secret, when present, is never empty
//! - Escaped values survive parsing unchanged

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use wifiqr_core::{parse_payload, Credential, PAYLOAD_PREFIX};

const SEED_CORPUS: &[&str] = &[
    "WIFI:S:Home;T:WPA;P:secret123;;",
    "WIFI:S:Cafe;T:nopass;;",
    "WIFI:T:WEP;P:abc;S:Lab;;",
    r"WIFI:S:My\;Net;T:WPA;P:p\:w\\d;;",
    "WIFI:S:Guest;;",
    "WIFI:S:;T:WPA;P:x;;",
    "WIFI:P:onlypass;;",
    "WIFI:S:Ünïcødé;T:SAE;P:пароль;;",
];

const ALPHABET: &[char] = &['S', 'T', 'P', ':', ';', '\\', 'a', 'Z', '0', ' ', 'é'];

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    pub iterations: usize,
    /// Mutations applied to each seed input
    pub max_mutations: usize,
    /// Longest generated field value, in chars
    pub max_value_len: usize,
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            iterations: 10_000,
            max_mutations: 6,
            max_value_len: 24,
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            iterations: 500,
            ..Default::default()
        }
    }
}

/// Fuzzing outcome
#[derive(Clone, Debug, Default)]
pub struct FuzzReport {
    pub iterations: usize,
    pub parsed: usize,
    pub rejected: usize,
    pub violations: Vec<String>,
}

impl FuzzReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Escape `;`, `:` and `\` for embedding in a payload field
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ';' | ':' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub struct PayloadFuzzer {
    config: FuzzerConfig,
    rng: StdRng,
}

impl PayloadFuzzer {
    pub fn new(config: FuzzerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        PayloadFuzzer { config, rng }
    }

    pub fn run(&mut self) -> FuzzReport {
        let mut report = FuzzReport::default();

        for i in 0..self.config.iterations {
            report.iterations += 1;

            // Alternate between free mutation and exact escaping checks
            if i % 4 == 3 {
                self.check_escaped(&mut report);
                continue;
            }

            let input = self.mutated_input();
            match self.check_parse(&input, &mut report) {
                Some(_) => report.parsed += 1,
                None => report.rejected += 1,
            }
        }

        report
    }

    fn check_parse(&mut self, input: &str, report: &mut FuzzReport) -> Option<Credential> {
        let first = parse_payload(input);
        if first != parse_payload(input) {
            report.violations.push(format!("non-deterministic parse of {input:?}"));
        }

        if let Some(credential) = &first {
            if credential.ssid().is_empty() {
                report.violations.push(format!("empty ssid from {input:?}"));
            }
            if credential.secret() == Some("") {
                report.violations.push(format!("empty secret from {input:?}"));
            }
        }
        if !input.starts_with(PAYLOAD_PREFIX) && first.is_some() {
            report.violations.push(format!("accepted unprefixed {input:?}"));
        }

        first
    }

    fn check_escaped(&mut self, report: &mut FuzzReport) {
        let ssid = self.random_value(1);
        let secret = self.random_value(1);
        let input = format!(
            "{PAYLOAD_PREFIX}S:{};T:WPA;P:{};;",
            escape_value(&ssid),
            escape_value(&secret)
        );

        match self.check_parse(&input, report) {
            Some(credential) => {
                report.parsed += 1;
                if credential.ssid() != ssid || credential.secret() != Some(secret.as_str()) {
                    report.violations.push(format!("escaped values altered in {input:?}"));
                }
            }
            None => {
                report.rejected += 1;
                report.violations.push(format!("rejected well-formed {input:?}"));
            }
        }
    }

    fn random_value(&mut self, min_len: usize) -> String {
        let len = self.rng.gen_range(min_len..=self.config.max_value_len.max(min_len));
        (0..len)
            .map(|_| ALPHABET[self.rng.gen_range(0..ALPHABET.len())])
            .collect()
    }

    fn mutated_input(&mut self) -> String {
        let seed = SEED_CORPUS[self.rng.gen_range(0..SEED_CORPUS.len())];
        let mut chars: Vec<char> = seed.chars().collect();
        let mutations = self.rng.gen_range(0..=self.config.max_mutations);

        for _ in 0..mutations {
            let at = self.rng.gen_range(0..=chars.len());
            match self.rng.gen_range(0..4) {
                0 => chars.insert(at, ALPHABET[self.rng.gen_range(0..ALPHABET.len())]),
                1 if at < chars.len() => {
                    chars.remove(at);
                }
                2 if at < chars.len() => {
                    let end = self.rng.gen_range(at..chars.len());
                    let slice: Vec<char> = chars[at..=end].to_vec();
                    let insert_at = self.rng.gen_range(0..=chars.len());
                    chars.splice(insert_at..insert_at, slice);
                }
                _ => chars.truncate(at),
            }
        }

        chars.into_iter().collect()
    }
}

/// Run the light fuzzing profile
pub fn fuzz_payloads_light() -> FuzzReport {
    PayloadFuzzer::new(FuzzerConfig::light()).run()
}
