pub mod headers;
pub mod images;
pub mod pattern;
pub mod policy;
pub mod redirects;

pub use headers::{HeaderPolicyResolver, HeaderRule};
pub use images::{ImageDecision, ImageFormat, ImageSourceValidator, RemotePattern};
pub use pattern::{HostPattern, PathPattern, PatternError, Protocol};
pub use policy::{BuildOptions, Decision, MonitoringSettings, PolicyEngine, PolicyError};
pub use redirects::{Redirect, RedirectResolver, RedirectRule};
