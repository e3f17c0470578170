pub mod client;
pub mod rate_limiter;
pub mod paginator;
pub mod request;
pub mod response;

pub use client::{MericoClient, PageFetcher};
pub use rate_limiter::RateLimiter;
pub use paginator::{Paginator, RepoPages};
pub use request::{AnalysisKind, Filter, RequestPayload, Sort, SortDirection};
pub use response::PageResponse;
