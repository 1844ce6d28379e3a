use reltab::ReltabError;

pub type AggTreeResult<T> = Result<T, AggTreeError>;

#[derive(Debug, thiserror::Error)]
pub enum AggTreeError {
    #[error("path of length {path_len} is deeper than the {pivot_len} pivot column(s)")]
    InvalidPath { path_len: usize, pivot_len: usize },

    #[error(transparent)]
    Reltab(#[from] ReltabError),
}
