use rand::{Rng, distr::Alphanumeric};

const GENERATED_LEN: usize = 16;

/// Random initial password handed out when an admin provisions an account without one.
pub fn generate() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_LEN)
        .map(char::from)
        .collect()
}
