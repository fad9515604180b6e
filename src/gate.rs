/// Fixed passphrase for the case-study pages. It only keeps casual visitors out.
const PASSPHRASE: &str = "folio-preview";

#[derive(Debug, Clone, Copy)]
pub struct AccessGate {
    passphrase: &'static str,
}

impl Default for AccessGate {
    fn default() -> Self {
        Self {
            passphrase: PASSPHRASE,
        }
    }
}

impl AccessGate {
    #[cfg(test)]
    pub(crate) fn with_passphrase(passphrase: &'static str) -> Self {
        Self { passphrase }
    }

    /// Exact comparison: no trimming, no case folding.
    pub fn matches(&self, input: &str) -> bool {
        input == self.passphrase
    }
}
