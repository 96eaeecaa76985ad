//! Query-side access to projected data.

pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Entries currently held; 0 while a writer holds the model.
    fn count(&self) -> usize;
}
