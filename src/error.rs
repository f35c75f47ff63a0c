pub type GlazeResult<T> = Result<T, GlazeError>;

#[derive(thiserror::Error, Debug)]
pub enum GlazeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("allocation error: {0}")]
    Allocation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GlazeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}
