pub mod dataforseo;

pub use dataforseo::{
    DataForSeoClient, MetricsProvider, ProviderError, ProviderErrorKind, parse_response,
};
