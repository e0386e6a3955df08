//! Airhaul collections
//!
//! A collection is a declared group of artifacts that expands into concrete
//! references only when its contents are first requested:
//!
//! - **Thick charts**: the chart package plus every image its rendered
//!   manifests reference, across several values passes
//! - **k3s**: executable, bootstrap script and release images for a version
//!   or release channel
//! - **Image lists**: images from a text file, filtered by source tags

pub mod channel;
pub mod collection;
pub mod discovery;
pub mod error;
pub mod imagetxt;
pub mod jsonpath;
pub mod k3s;
pub mod thick_chart;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::{ChannelRecord, ChannelResolver};
pub use collection::{Collection, CollectionContext, CollectionKind, Contents};
pub use discovery::{DEFAULT_IMAGE_PATHS, DiscoveredImages, ImageDiscovery, QueryDiagnostic, images_in_chart};
pub use error::{CollectionError, Result};
pub use imagetxt::{ImageTxt, SourceFilter};
pub use jsonpath::JsonPath;
pub use k3s::{K3s, ReleaseEndpoints};
pub use thick_chart::{ThickChart, ThickChartConfig, ValuesConfig, ValuesOverride};
