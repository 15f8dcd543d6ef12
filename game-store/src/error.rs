use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A transaction kept colliding with concurrent commits and gave up.
    #[error("transaction aborted after {attempts} contended attempts")]
    Contention { attempts: u32 },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
