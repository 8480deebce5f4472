use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `fishmonger`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum BotError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Commerce backend ────────────────────────────────────────────────
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    // ── Image cache ─────────────────────────────────────────────────────
    #[error("asset cache: {0}")]
    Cache(#[from] CacheError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Catalog Gateway errors ─────────────────────────────────────────────────

/// Hard failures talking to the commerce backend.
///
/// Expected business outcomes (e.g. insufficient stock on add-to-cart) are
/// NOT errors — they come back as [`crate::catalog::CartOutcome`] data.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("commerce API returned {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("product not found: {0}")]
    NotFound(String),

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
}

// ─── Asset Cache errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("image download failed with status {0}")]
    Download(u16),

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, BotError>;
