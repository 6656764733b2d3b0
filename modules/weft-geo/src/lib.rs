pub mod cache;
pub mod extract;
pub mod nominatim;
pub mod progressive;
pub mod resolver;

pub use cache::LocationCache;
pub use extract::extract_location;
pub use nominatim::{GeocodeHit, GeocodeProvider, NominatimClient, ReverseHit};
pub use progressive::ProgressiveGeocoder;
pub use resolver::{GeocodeResolver, ResolvedAddress};
