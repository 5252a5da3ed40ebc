#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error(transparent)]
    Reconcile(#[from] netns_mtu::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("lock error: {0}")]
    Lock(String),
}

pub type UpdateResult<T> = Result<T, UpdateError>;
