use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("ingress error: {0}")]
    Ingress(String),
}
