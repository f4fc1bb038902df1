use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of share codes and payment ids.
pub const CODE_LENGTH: usize = 16;

/// Random alphanumeric identifier, used for share codes and payment ids.
pub fn random_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}
